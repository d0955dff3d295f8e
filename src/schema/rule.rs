//! Declarative per-field rules.
//!
//! Each rule is a tagged variant. A schema lists rules per field; compilation
//! checks they fit the field kind and fixes the order they run in.

use std::collections::BTreeSet;

use super::field::FieldKind;

/// Maximum upload size used by the onboarding documents (5 MiB).
pub const DOCUMENT_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// MIME types accepted for supporting documents.
pub const DOCUMENT_MIME_TYPES: &[&str] = &["application/pdf", "image/jpeg", "image/png"];

/// One validation rule attached to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Value must be present (not missing, null, or empty text).
    Required,
    /// Text must be a four-digit year, e.g. `"2020"`.
    YearFormat,
    /// Text must parse as `YYYY-MM-DD` or an RFC 3339 timestamp.
    DateParseable,
    /// Text must match a regular expression. `description` is shown to the user.
    Pattern { regex: String, description: String },
    /// Text must be one of the listed options.
    OneOf(Vec<String>),
    /// Document must be at most this many bytes.
    MaxSize(u64),
    /// Document MIME type must be in the set.
    AllowedTypes(BTreeSet<String>),
    /// Group must hold at least this many entries.
    MinEntries(usize),
    /// Group must hold at most this many entries.
    MaxEntries(usize),
}

impl Rule {
    /// `AllowedTypes` from string slices.
    pub fn allowed_types(types: &[&str]) -> Self {
        Self::AllowedTypes(types.iter().map(|t| t.to_string()).collect())
    }

    /// `OneOf` from string slices.
    pub fn one_of(options: &[&str]) -> Self {
        Self::OneOf(options.iter().map(|o| o.to_string()).collect())
    }

    /// Evaluation order within a field: presence, format, size, type, cardinality.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Required => 0,
            Self::YearFormat | Self::DateParseable | Self::Pattern { .. } | Self::OneOf(_) => 1,
            Self::MaxSize(_) => 2,
            Self::AllowedTypes(_) => 3,
            Self::MinEntries(_) | Self::MaxEntries(_) => 4,
        }
    }

    /// Whether this rule makes sense on a field of `kind`.
    pub fn applies_to(&self, kind: &FieldKind) -> bool {
        match self {
            Self::Required => true,
            Self::YearFormat | Self::Pattern { .. } | Self::OneOf(_) => {
                matches!(kind, FieldKind::Text)
            }
            Self::DateParseable => matches!(kind, FieldKind::Text | FieldKind::Date),
            Self::MaxSize(_) | Self::AllowedTypes(_) => matches!(kind, FieldKind::Document),
            Self::MinEntries(_) | Self::MaxEntries(_) => matches!(kind, FieldKind::Group { .. }),
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::YearFormat => write!(f, "year_format"),
            Self::DateParseable => write!(f, "date_parseable"),
            Self::Pattern { .. } => write!(f, "pattern"),
            Self::OneOf(_) => write!(f, "one_of"),
            Self::MaxSize(_) => write!(f, "max_size"),
            Self::AllowedTypes(_) => write!(f, "allowed_types"),
            Self::MinEntries(_) => write!(f, "min_entries"),
            Self::MaxEntries(_) => write!(f, "max_entries"),
        }
    }
}
