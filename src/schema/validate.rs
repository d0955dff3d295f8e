//! The rule interpreter: checks a payload against a compiled schema.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use serde::Serialize;

use crate::form::path;
use crate::form::{EntryId, FieldValue, GroupEntry, Record};

use super::compile::{Check, CompiledField, CompiledKind, CompiledSchema};

/// Field path → error message. Empty means the payload is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationResult {
    errors: BTreeMap<String, String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Error at an exact path.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.errors.get(path).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    /// Errors for one group entry, addressed by identity token, keyed by
    /// the entry-relative field name.
    pub fn entry_errors(
        &self,
        group_path: &str,
        entries: &[GroupEntry],
        id: EntryId,
    ) -> BTreeMap<String, String> {
        let Some(index) = entries.iter().position(|e| e.id == id) else {
            return BTreeMap::new();
        };
        let prefix = format!("{}.", path::indexed(group_path, index));
        self.errors
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|rest| (rest.to_string(), v.clone())))
            .collect()
    }

    fn insert(&mut self, path: String, message: String) {
        self.errors.insert(path, message);
    }
}

impl CompiledSchema {
    /// Check `payload` against this schema. Unknown fields are ignored.
    pub fn validate(&self, payload: &Record) -> ValidationResult {
        let mut result = ValidationResult::default();
        validate_record(&self.fields, payload, "", &mut result);
        result
    }
}

fn validate_record(
    fields: &[CompiledField],
    record: &Record,
    parent: &str,
    result: &mut ValidationResult,
) {
    for field in fields {
        let field_path = path::child(parent, &field.name);
        let value = record.get(&field.name).unwrap_or(&FieldValue::Null);
        if let Some(message) = check_field(field, value) {
            result.insert(field_path, message);
            continue;
        }
        match (&field.kind, value) {
            (CompiledKind::Section(children), FieldValue::Record(inner)) => {
                validate_record(children, inner, &field_path, result);
            }
            // Absent optional section: its own required fields still apply.
            (CompiledKind::Section(children), _) => {
                validate_record(children, &Record::new(), &field_path, result);
            }
            (CompiledKind::Group(children), FieldValue::Group(entries)) => {
                for (index, entry) in entries.iter().enumerate() {
                    let entry_path = path::indexed(&field_path, index);
                    validate_record(children, &entry.fields, &entry_path, result);
                }
            }
            _ => {}
        }
    }
}

/// First failing condition for one field, if any.
fn check_field(field: &CompiledField, value: &FieldValue) -> Option<String> {
    if value.is_absent() {
        if field.required {
            return Some(format!("{} is required", capitalize(&field.label)));
        }
        // An absent group is an empty group for cardinality purposes.
        if matches!(field.kind, CompiledKind::Group(_)) {
            return field
                .checks
                .iter()
                .find_map(|check| run_check(field, check, &FieldValue::Group(Vec::new())));
        }
        return None;
    }

    let shape_ok = matches!(
        (&field.kind, value),
        (CompiledKind::Text | CompiledKind::Date, FieldValue::Text(_))
            | (CompiledKind::Document, FieldValue::Document(_))
            | (CompiledKind::Section(_), FieldValue::Record(_))
            | (CompiledKind::Group(_), FieldValue::Group(_))
    );
    if !shape_ok {
        return Some(format!("{} has an invalid value", capitalize(&field.label)));
    }

    field
        .checks
        .iter()
        .find_map(|check| run_check(field, check, value))
}

fn run_check(field: &CompiledField, check: &Check, value: &FieldValue) -> Option<String> {
    let label = &field.label;
    let failed = match (check, value) {
        (Check::Year(regex), FieldValue::Text(s)) => !regex.is_match(s),
        (Check::Pattern { regex, .. }, FieldValue::Text(s)) => !regex.is_match(s),
        (Check::DateParseable, FieldValue::Text(s)) => !is_parseable_date(s),
        (Check::OneOf(options), FieldValue::Text(s)) => !options.iter().any(|o| o == s),
        (Check::MaxSize(max), FieldValue::Document(doc)) => doc.size_bytes > *max,
        (Check::AllowedTypes(types), FieldValue::Document(doc)) => {
            !types.contains(&doc.mime_type)
        }
        (Check::MinEntries(min), FieldValue::Group(entries)) => entries.len() < *min,
        (Check::MaxEntries(max), FieldValue::Group(entries)) => entries.len() > *max,
        _ => false,
    };
    if !failed {
        return None;
    }
    let message = match check {
        Check::Year(_) => format!("{} must be a four-digit year", capitalize(label)),
        Check::Pattern { description, .. } => {
            format!("{} must be {}", capitalize(label), description)
        }
        Check::DateParseable => format!("Please enter a valid {}", label.to_lowercase()),
        Check::OneOf(options) => {
            format!("{} must be one of: {}", capitalize(label), options.join(", "))
        }
        Check::MaxSize(_) => "File is too large".to_string(),
        Check::AllowedTypes(_) => "Unsupported file format".to_string(),
        Check::MinEntries(n) => format!("Add at least {n} {}", label.to_lowercase()),
        Check::MaxEntries(n) => format!("At most {n} {} allowed", label.to_lowercase()),
    };
    Some(message)
}

fn is_parseable_date(s: &str) -> bool {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(s).is_ok()
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
