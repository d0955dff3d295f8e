//! Repeatable group manager: add, remove, and edit entries by identity token.
//!
//! All operations are pure: they take the current entries and return the new
//! ones. Entries are never addressed by position.

use tracing::debug;

use crate::form::{EntryId, FieldValue, GroupEntry, Record};

/// Append an entry with a fresh token and a copy of `defaults`.
///
/// Returns the new entries and the minted token.
pub fn add_entry(group: &[GroupEntry], defaults: &Record) -> (Vec<GroupEntry>, EntryId) {
    let mut id = EntryId::new();
    while group.iter().any(|e| e.id == id) {
        id = EntryId::new();
    }
    let mut entries = group.to_vec();
    entries.push(GroupEntry {
        id,
        fields: defaults.clone(),
    });
    debug!(entry = %id, len = entries.len(), "Group entry added");
    (entries, id)
}

/// Remove the entry with `id`. A missing token is a no-op.
pub fn remove_entry(group: &[GroupEntry], id: EntryId) -> Vec<GroupEntry> {
    let entries: Vec<GroupEntry> = group.iter().filter(|e| e.id != id).cloned().collect();
    if entries.len() == group.len() {
        debug!(entry = %id, "Group entry not present, nothing removed");
    } else {
        debug!(entry = %id, len = entries.len(), "Group entry removed");
    }
    entries
}

/// Set one field of the entry with `id`. A missing token is a no-op.
pub fn update_entry(
    group: &[GroupEntry],
    id: EntryId,
    field: &str,
    value: FieldValue,
) -> Vec<GroupEntry> {
    group
        .iter()
        .map(|entry| {
            if entry.id != id {
                return entry.clone();
            }
            let mut updated = entry.clone();
            updated.fields.insert(field.to_string(), value.clone());
            updated
        })
        .collect()
}

/// Current position of the entry with `id`.
pub fn position(group: &[GroupEntry], id: EntryId) -> Option<usize> {
    group.iter().position(|e| e.id == id)
}

pub fn find(group: &[GroupEntry], id: EntryId) -> Option<&GroupEntry> {
    group.iter().find(|e| e.id == id)
}
