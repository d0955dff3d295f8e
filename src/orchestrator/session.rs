//! The aggregate state of one onboarding attempt.

use std::collections::BTreeMap;

use crate::form::Record;
use crate::form::value::record_summary_json;

/// One in-progress onboarding attempt.
///
/// `current_step_index` is always a valid index into the catalog the session
/// was built for; `step_data` keys are always known step keys. Only the
/// transition functions and the draft store construct sessions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSession {
    pub(crate) current_step_index: usize,
    pub(crate) step_data: BTreeMap<String, Record>,
}

impl FormSession {
    /// A fresh session at step 0 with no data.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn step_data(&self) -> &BTreeMap<String, Record> {
        &self.step_data
    }

    /// Data held for one step, if any.
    pub fn data_for(&self, step_key: &str) -> Option<&Record> {
        self.step_data.get(step_key)
    }

    /// The aggregate data as JSON for review screens.
    ///
    /// Attachments appear as metadata only.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.step_data
                .iter()
                .map(|(key, data)| (key.clone(), record_summary_json(data)))
                .collect(),
        )
    }
}
