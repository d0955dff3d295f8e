//! Pure state transitions over [`FormSession`].
//!
//! Each function takes the catalog and the current session and returns a new
//! session. Nothing here persists anything.

use tracing::{debug, info, warn};

use crate::error::EditError;
use crate::form::path::{self, Segment};
use crate::form::{EntryId, FieldValue, GroupEntry, Record};
use crate::group;
use crate::schema::ValidationResult;
use crate::steps::{StepCatalog, StepDefinition};

use super::session::FormSession;

/// What a submit or skip did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Payload was valid, merged, and the pointer moved.
    Advanced { from: usize, to: usize },
    /// Payload was invalid; nothing changed.
    Stayed(ValidationResult),
    /// Step skipped without validating or merging.
    Skipped { from: usize, to: usize },
    /// The current step may not be skipped.
    SkipRejected,
    /// The review step has no further transition.
    AtTerminal,
}

impl Outcome {
    pub fn moved(&self) -> bool {
        matches!(self, Self::Advanced { .. } | Self::Skipped { .. })
    }
}

/// A new session plus what happened.
#[derive(Debug, Clone)]
pub struct Transition {
    pub session: FormSession,
    pub outcome: Outcome,
}

/// The step the session points at.
pub fn current_step<'a>(catalog: &'a StepCatalog, session: &FormSession) -> &'a StepDefinition {
    catalog.clamped(session.current_step_index)
}

/// Current step's data, or its default payload when nothing is held yet.
pub fn working_copy(catalog: &StepCatalog, session: &FormSession) -> Record {
    let step = current_step(catalog, session);
    session
        .step_data
        .get(&step.key)
        .cloned()
        .unwrap_or_else(|| step.default_payload())
}

/// Validate `payload` for the current step; merge and advance when valid.
pub fn submit(catalog: &StepCatalog, session: &FormSession, payload: Record) -> Transition {
    let from = session.current_step_index;
    let step = current_step(catalog, session);

    if from >= catalog.last_index() {
        debug!(step = %step.key, "Submit on terminal step ignored");
        return unchanged(session, Outcome::AtTerminal);
    }

    let result = step.validate(&payload);
    if !result.is_valid() {
        info!(step = %step.key, errors = result.len(), "Step submission invalid, staying");
        return unchanged(session, Outcome::Stayed(result));
    }

    let mut next = session.clone();
    next.step_data.insert(step.key.clone(), payload);
    let to = from + 1;
    next.current_step_index = to;
    info!(step = %step.key, from, to, "Step submitted, advancing");

    Transition {
        session: next,
        outcome: Outcome::Advanced { from, to },
    }
}

/// Move past the current step without validating. Held data is kept as is.
pub fn skip(catalog: &StepCatalog, session: &FormSession) -> Transition {
    let from = session.current_step_index;
    let step = current_step(catalog, session);

    if from >= catalog.last_index() {
        debug!(step = %step.key, "Skip on terminal step ignored");
        return unchanged(session, Outcome::AtTerminal);
    }
    if !step.is_skippable {
        warn!(step = %step.key, "Skip rejected: step is not skippable");
        return unchanged(session, Outcome::SkipRejected);
    }

    let mut next = session.clone();
    let to = from + 1;
    next.current_step_index = to;
    info!(step = %step.key, from, to, "Step skipped");

    Transition {
        session: next,
        outcome: Outcome::Skipped { from, to },
    }
}

/// Replace the current step's held data with a partial, unvalidated payload.
pub fn stage(catalog: &StepCatalog, session: &FormSession, payload: Record) -> FormSession {
    let step = current_step(catalog, session);
    let mut next = session.clone();
    next.step_data.insert(step.key.clone(), payload);
    debug!(step = %step.key, "Working copy staged");
    next
}

/// Hold the default payload for the current step if it has a schema and no
/// data yet, so the group tokens a renderer binds to stay stable.
pub fn seed(catalog: &StepCatalog, session: &FormSession) -> FormSession {
    let step = current_step(catalog, session);
    if step.schema.is_none() || session.step_data.contains_key(&step.key) {
        return session.clone();
    }
    stage(catalog, session, step.default_payload())
}

/// Write one field of the current step's working copy.
///
/// Group entries are addressed by token: `certifications[<uuid>].issuingBody`.
/// A token that is no longer present is ignored. Non-finite numbers are
/// rejected since a draft could not store them.
pub fn set_field(
    catalog: &StepCatalog,
    session: &FormSession,
    field_path: &str,
    value: FieldValue,
) -> Result<FormSession, EditError> {
    let segments = path::parse(field_path)?;
    if !value.is_finite() {
        return Err(EditError::NonFiniteNumber {
            path: field_path.to_string(),
        });
    }
    let mut data = working_copy(catalog, session);
    write_field(&mut data, &segments, value, "")?;
    debug!(path = %field_path, "Working copy field set");
    Ok(with_current_data(catalog, session, data))
}

/// Append a default entry to the group at `group_path` in the working copy.
pub fn add_entry(
    catalog: &StepCatalog,
    session: &FormSession,
    group_path: &str,
) -> Result<(FormSession, EntryId), EditError> {
    let step = current_step(catalog, session);
    let defaults = group_defaults(step, group_path)?;
    let mut data = working_copy(catalog, session);

    let entries = group_slot(&mut data, group_path)?;
    let (updated, id) = group::add_entry(entries, &defaults);
    *entries = updated;

    Ok((with_current_data(catalog, session, data), id))
}

/// Remove the entry `id` from the group at `group_path`. Missing tokens are a no-op.
pub fn remove_entry(
    catalog: &StepCatalog,
    session: &FormSession,
    group_path: &str,
    id: EntryId,
) -> Result<FormSession, EditError> {
    let step = current_step(catalog, session);
    group_defaults(step, group_path)?;
    let mut data = working_copy(catalog, session);

    let entries = group_slot(&mut data, group_path)?;
    *entries = group::remove_entry(entries, id);

    Ok(with_current_data(catalog, session, data))
}

fn unchanged(session: &FormSession, outcome: Outcome) -> Transition {
    Transition {
        session: session.clone(),
        outcome,
    }
}

fn with_current_data(catalog: &StepCatalog, session: &FormSession, data: Record) -> FormSession {
    let key = current_step(catalog, session).key.clone();
    let mut next = session.clone();
    next.step_data.insert(key, data);
    next
}

fn group_defaults(step: &StepDefinition, group_path: &str) -> Result<Record, EditError> {
    step.schema
        .as_ref()
        .and_then(|schema| schema.group_entry_defaults(group_path))
        .ok_or_else(|| EditError::UnknownGroup {
            step: step.key.clone(),
            path: group_path.to_string(),
        })
}

/// Mutable entries of the group at a dotted path, created empty if absent.
fn group_slot<'a>(data: &'a mut Record, group_path: &str) -> Result<&'a mut Vec<GroupEntry>, EditError> {
    let (parents, name) = match group_path.rsplit_once('.') {
        Some((parents, name)) => (Some(parents), name),
        None => (None, group_path),
    };

    let mut record = data;
    let mut walked = String::new();
    if let Some(parents) = parents {
        for part in parents.split('.') {
            walked = path::child(&walked, part);
            record = descend(record, part, &walked)?;
        }
    }

    let slot = record.entry(name.to_string()).or_insert(FieldValue::Null);
    if slot.is_absent() {
        *slot = FieldValue::Group(Vec::new());
    }
    match slot {
        FieldValue::Group(entries) => Ok(entries),
        _ => Err(EditError::NotAGroup {
            path: group_path.to_string(),
        }),
    }
}

/// Child record `name`, created empty if absent.
fn descend<'a>(record: &'a mut Record, name: &str, walked: &str) -> Result<&'a mut Record, EditError> {
    let slot = record.entry(name.to_string()).or_insert(FieldValue::Null);
    if slot.is_absent() {
        *slot = FieldValue::Record(Record::new());
    }
    slot.as_record_mut().ok_or_else(|| EditError::NotARecord {
        path: walked.to_string(),
    })
}

fn write_field(
    record: &mut Record,
    segments: &[Segment],
    value: FieldValue,
    walked: &str,
) -> Result<(), EditError> {
    match segments {
        [] => Err(EditError::InvalidPath(walked.to_string())),
        [Segment::Field(name)] => {
            record.insert(name.clone(), value);
            Ok(())
        }
        [Segment::Field(name), rest @ ..] => {
            let here = path::child(walked, name);
            let inner = descend(record, name, &here)?;
            write_field(inner, rest, value, &here)
        }
        [Segment::Entry(name, _)] => Err(EditError::InvalidPath(format!(
            "{}[..]",
            path::child(walked, name)
        ))),
        [Segment::Entry(name, id), rest @ ..] => {
            let here = path::child(walked, name);
            let Some(FieldValue::Group(entries)) = record.get_mut(name) else {
                return Err(EditError::NotAGroup { path: here });
            };
            if let [Segment::Field(field)] = rest {
                *entries = group::update_entry(entries, *id, field, value);
                return Ok(());
            }
            match entries.iter_mut().find(|e| e.id == *id) {
                Some(entry) => write_field(&mut entry.fields, rest, value, &format!("{here}[{id}]")),
                None => {
                    debug!(path = %here, entry = %id, "Edit for removed entry ignored");
                    Ok(())
                }
            }
        }
    }
}
