//! Field specifications: the uncompiled, declarative form of a step schema.

use crate::form::{FieldValue, GroupEntry, Record};

use super::rule::{DOCUMENT_MAX_BYTES, DOCUMENT_MIME_TYPES, Rule};

/// Shape of a field's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text or a selected option.
    Text,
    /// Date entered as text.
    Date,
    /// Uploaded file.
    Document,
    /// Nested record with its own fields.
    Section(Vec<FieldSpec>),
    /// Repeatable group of homogeneous entries.
    Group {
        fields: Vec<FieldSpec>,
        /// Entries present in a fresh (default) payload.
        initial_entries: usize,
    },
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Date => "date",
            Self::Document => "document",
            Self::Section(_) => "section",
            Self::Group { .. } => "group",
        }
    }
}

/// Declarative description of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    /// Human-readable label used in error messages.
    pub label: String,
    pub kind: FieldKind,
    pub rules: Vec<Rule>,
}

impl FieldSpec {
    fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            rules: Vec::new(),
        }
    }

    pub fn text(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn date(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Date)
    }

    pub fn document(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Document)
    }

    pub fn section(name: &str, label: &str, fields: Vec<FieldSpec>) -> Self {
        Self::new(name, label, FieldKind::Section(fields))
    }

    pub fn group(name: &str, label: &str, fields: Vec<FieldSpec>, initial_entries: usize) -> Self {
        Self::new(
            name,
            label,
            FieldKind::Group {
                fields,
                initial_entries,
            },
        )
    }

    /// Add a rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn required(self) -> Self {
        self.rule(Rule::Required)
    }

    /// Required document, at most 5 MiB, PDF/JPEG/PNG.
    pub fn supporting_document(name: &str, label: &str) -> Self {
        Self::document(name, label)
            .required()
            .rule(Rule::MaxSize(DOCUMENT_MAX_BYTES))
            .rule(Rule::allowed_types(DOCUMENT_MIME_TYPES))
    }

    pub fn has_rule(&self, rule: &Rule) -> bool {
        self.rules.contains(rule)
    }

    /// Value this field holds in a fresh payload.
    pub fn default_value(&self) -> FieldValue {
        match &self.kind {
            FieldKind::Text | FieldKind::Date => FieldValue::Text(String::new()),
            FieldKind::Document => FieldValue::Null,
            FieldKind::Section(fields) => FieldValue::Record(default_record(fields)),
            FieldKind::Group {
                fields,
                initial_entries,
            } => FieldValue::Group(
                (0..*initial_entries)
                    .map(|_| GroupEntry::new(default_record(fields)))
                    .collect(),
            ),
        }
    }
}

/// Fresh record for a field list.
pub fn default_record(fields: &[FieldSpec]) -> Record {
    fields
        .iter()
        .map(|f| (f.name.clone(), f.default_value()))
        .collect()
}
