//! Draft store: save and restore a whole [`FormSession`] in one slot.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, DraftError};
use crate::form::path;
use crate::form::{FieldValue, GroupEntry, Record};
use crate::orchestrator::FormSession;
use crate::steps::StepCatalog;

use super::storage::KeyValueStore;

/// Well-known key of the draft slot.
pub const DRAFT_KEY: &str = "multiStepFormData";

/// Current draft envelope format.
pub const DRAFT_FORMAT_VERSION: u32 = 1;

/// What `save` does with document attachments, which have no serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentPolicy {
    /// Drop attachment fields and report their paths; the user re-uploads on resume.
    #[default]
    Omit,
    /// Fail the whole save if any attachment is present.
    Reject,
}

impl std::fmt::Display for AttachmentPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Omit => write!(f, "omit"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

impl std::str::FromStr for AttachmentPolicy {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "omit" => Ok(Self::Omit),
            "reject" => Ok(Self::Reject),
            other => Err(ConfigError::InvalidValue {
                key: "attachment_policy".to_string(),
                message: format!("expected \"omit\" or \"reject\", got {other:?}"),
            }),
        }
    }
}

/// Outcome of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub saved_at: DateTime<Utc>,
    /// Attachment fields left out of the draft (`step.field.path`).
    pub omitted_attachments: Vec<String>,
}

impl SaveReport {
    /// Whether the user should be told some uploads were not kept.
    pub fn has_warnings(&self) -> bool {
        !self.omitted_attachments.is_empty()
    }
}

fn legacy_format_version() -> u32 {
    1
}

/// The JSON document stored in the slot.
#[derive(Debug, Serialize, Deserialize)]
struct DraftEnvelope {
    #[serde(default = "legacy_format_version")]
    format_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
    current_step_index: usize,
    #[serde(default)]
    step_data: BTreeMap<String, Record>,
}

/// Persists the in-progress session under a single key.
///
/// Nothing else in the crate touches the storage medium.
#[derive(Clone)]
pub struct DraftStore {
    storage: Arc<dyn KeyValueStore>,
    key: String,
    policy: AttachmentPolicy,
}

impl DraftStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            key: DRAFT_KEY.to_string(),
            policy: AttachmentPolicy::default(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_policy(mut self, policy: AttachmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn policy(&self) -> AttachmentPolicy {
        self.policy
    }

    /// Serialize the whole session, overwriting any previous draft.
    pub fn save(&self, session: &FormSession) -> Result<SaveReport, DraftError> {
        let mut omitted = Vec::new();
        let step_data: BTreeMap<String, Record> = session
            .step_data
            .iter()
            .map(|(step, data)| (step.clone(), strip_record(data, step, &mut omitted)))
            .collect();

        if self.policy == AttachmentPolicy::Reject
            && let Some(first) = omitted.first()
        {
            warn!(path = %first, "Draft save refused: attachment present");
            return Err(DraftError::Serialization {
                path: first.clone(),
                reason: "uploaded files cannot be stored in a draft".to_string(),
            });
        }

        let saved_at = Utc::now();
        let envelope = DraftEnvelope {
            format_version: DRAFT_FORMAT_VERSION,
            saved_at: Some(saved_at),
            current_step_index: session.current_step_index,
            step_data,
        };
        let value = serde_json::to_value(&envelope)?;
        self.storage.set(&self.key, &value)?;

        for path in &omitted {
            warn!(path = %path, "Attachment left out of draft; re-upload needed on resume");
        }
        info!(
            key = %self.key,
            step_index = session.current_step_index,
            steps = envelope.step_data.len(),
            omitted = omitted.len(),
            "Draft saved"
        );

        Ok(SaveReport {
            saved_at,
            omitted_attachments: omitted,
        })
    }

    /// Restore the saved session, or `None` when no draft exists.
    ///
    /// Steps the catalog no longer knows are dropped; an out-of-range step
    /// index or an unreadable envelope is an error.
    pub fn load(&self, catalog: &StepCatalog) -> Result<Option<FormSession>, DraftError> {
        let Some(value) = self.storage.get(&self.key)? else {
            debug!(key = %self.key, "No draft stored");
            return Ok(None);
        };

        let envelope: DraftEnvelope =
            serde_json::from_value(value).map_err(|e| DraftError::Corrupt(e.to_string()))?;

        if envelope.format_version != DRAFT_FORMAT_VERSION {
            return Err(DraftError::UnsupportedVersion {
                found: envelope.format_version,
                expected: DRAFT_FORMAT_VERSION,
            });
        }
        if envelope.current_step_index >= catalog.len() {
            return Err(DraftError::Corrupt(format!(
                "step index {} outside 0..{}",
                envelope.current_step_index,
                catalog.len()
            )));
        }

        let mut step_data = envelope.step_data;
        step_data.retain(|step, _| {
            let known = catalog.contains(step);
            if !known {
                warn!(step = %step, "Dropping draft data for unknown step");
            }
            known
        });

        info!(
            key = %self.key,
            step_index = envelope.current_step_index,
            steps = step_data.len(),
            saved_at = ?envelope.saved_at,
            "Draft restored"
        );

        Ok(Some(FormSession {
            current_step_index: envelope.current_step_index,
            step_data,
        }))
    }

    /// Delete the draft. Returns whether one existed.
    pub fn clear(&self) -> Result<bool, DraftError> {
        let removed = self.storage.remove(&self.key)?;
        info!(key = %self.key, removed, "Draft cleared");
        Ok(removed)
    }
}

/// Copy of `record` without attachment fields; their paths go to `omitted`.
fn strip_record(record: &Record, parent: &str, omitted: &mut Vec<String>) -> Record {
    record
        .iter()
        .filter_map(|(name, value)| {
            let field_path = path::child(parent, name);
            strip_value(value, &field_path, omitted).map(|v| (name.clone(), v))
        })
        .collect()
}

fn strip_value(value: &FieldValue, field_path: &str, omitted: &mut Vec<String>) -> Option<FieldValue> {
    match value {
        FieldValue::Document(_) => {
            omitted.push(field_path.to_string());
            None
        }
        FieldValue::Record(inner) => Some(FieldValue::Record(strip_record(inner, field_path, omitted))),
        FieldValue::Group(entries) => Some(FieldValue::Group(
            entries
                .iter()
                .enumerate()
                .map(|(index, entry)| GroupEntry {
                    id: entry.id,
                    fields: strip_record(&entry.fields, &path::indexed(field_path, index), omitted),
                })
                .collect(),
        )),
        other => Some(other.clone()),
    }
}
