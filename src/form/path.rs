//! Field path addressing.
//!
//! Validation errors use positional paths (`certifications[2].issuingBody`)
//! because that is what a renderer binds error messages to. Edits address
//! repeatable-group entries by identity token instead
//! (`certifications[<uuid>].issuingBody`), never by position.

use crate::error::EditError;

use super::value::EntryId;

/// Join a child field name onto a parent path.
pub fn child(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

/// Positional path of a group entry.
pub fn indexed(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

/// One segment of an edit path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A record field.
    Field(String),
    /// A group entry, addressed by token, inside the named group field.
    Entry(String, EntryId),
}

/// Parse a dotted edit path such as `certifications[<uuid>].issuingBody`.
pub fn parse(path: &str) -> Result<Vec<Segment>, EditError> {
    let invalid = || EditError::InvalidPath(path.to_string());
    if path.is_empty() {
        return Err(invalid());
    }
    path.split('.')
        .map(|part| {
            if part.is_empty() {
                return Err(invalid());
            }
            match part.split_once('[') {
                None if part.contains(']') => Err(invalid()),
                None => Ok(Segment::Field(part.to_string())),
                Some((name, rest)) => {
                    let token = rest.strip_suffix(']').ok_or_else(invalid)?;
                    if name.is_empty() || token.contains(['[', ']']) {
                        return Err(invalid());
                    }
                    let id = token.parse::<EntryId>().map_err(|_| invalid())?;
                    Ok(Segment::Entry(name.to_string(), id))
                }
            }
        })
        .collect()
}
