//! Schema compilation: turns [`FieldSpec`] lists into an executable schema.
//!
//! Every structural mistake in a schema is caught here, once, at startup.
//! A compiled schema cannot fail at validation time.

use std::collections::{BTreeSet, HashSet};

use regex::Regex;

use crate::error::ConfigError;
use crate::form::Record;
use crate::form::path;

use super::field::{FieldKind, FieldSpec, default_record};
use super::rule::Rule;

const YEAR_PATTERN: &str = r"^\d{4}$";

/// A rule after compilation: regexes built, presence split out.
#[derive(Debug, Clone)]
pub(crate) enum Check {
    Year(Regex),
    Pattern { regex: Regex, description: String },
    DateParseable,
    OneOf(Vec<String>),
    MaxSize(u64),
    AllowedTypes(BTreeSet<String>),
    MinEntries(usize),
    MaxEntries(usize),
}

/// Value shape of a compiled field.
#[derive(Debug, Clone)]
pub enum CompiledKind {
    Text,
    Date,
    Document,
    Section(Vec<CompiledField>),
    Group(Vec<CompiledField>),
}

/// One field ready for the validator.
#[derive(Debug, Clone)]
pub struct CompiledField {
    pub name: String,
    pub label: String,
    pub kind: CompiledKind,
    pub(crate) required: bool,
    /// Ordered by rule precedence.
    pub(crate) checks: Vec<Check>,
}

/// A validated, executable step schema.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    specs: Vec<FieldSpec>,
    pub(crate) fields: Vec<CompiledField>,
}

impl CompiledSchema {
    /// Compile a field list, rejecting malformed configuration.
    pub fn compile(specs: Vec<FieldSpec>) -> Result<Self, ConfigError> {
        let fields = compile_fields(&specs, "")?;
        Ok(Self { specs, fields })
    }

    /// The declarative field list this schema was built from.
    pub fn specs(&self) -> &[FieldSpec] {
        &self.specs
    }

    /// Fresh payload with every field at its default.
    pub fn default_payload(&self) -> Record {
        default_record(&self.specs)
    }

    /// Default fields for a new entry of the group at `group_path`
    /// (dotted field names, e.g. `certifications` or `section.items`).
    pub fn group_entry_defaults(&self, group_path: &str) -> Option<Record> {
        let mut specs = self.specs.as_slice();
        let mut names = group_path.split('.').peekable();
        while let Some(name) = names.next() {
            let spec = specs.iter().find(|s| s.name == name)?;
            match (&spec.kind, names.peek()) {
                (FieldKind::Group { fields, .. }, None) => return Some(default_record(fields)),
                (FieldKind::Section(children), Some(_)) => specs = children,
                _ => return None,
            }
        }
        None
    }
}

fn compile_fields(specs: &[FieldSpec], parent: &str) -> Result<Vec<CompiledField>, ConfigError> {
    let mut seen = HashSet::new();
    specs
        .iter()
        .map(|spec| {
            check_name(&spec.name)?;
            let field_path = path::child(parent, &spec.name);
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::DuplicateField { path: field_path });
            }
            compile_field(spec, &field_path)
        })
        .collect()
}

fn check_name(name: &str) -> Result<(), ConfigError> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains(['.', '[', ']']) {
        "name must not contain '.', '[' or ']'"
    } else {
        return Ok(());
    };
    Err(ConfigError::InvalidFieldName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

fn compile_field(spec: &FieldSpec, field_path: &str) -> Result<CompiledField, ConfigError> {
    let malformed = |rule: &Rule, reason: &str| ConfigError::MalformedRule {
        path: field_path.to_string(),
        rule: rule.to_string(),
        reason: reason.to_string(),
    };

    let mut rules: Vec<&Rule> = Vec::with_capacity(spec.rules.len());
    for rule in &spec.rules {
        if !rule.applies_to(&spec.kind) {
            return Err(ConfigError::RuleNotApplicable {
                path: field_path.to_string(),
                rule: rule.to_string(),
                kind: spec.kind.name().to_string(),
            });
        }
        if rules
            .iter()
            .any(|r| std::mem::discriminant(*r) == std::mem::discriminant(rule))
        {
            return Err(malformed(rule, "declared more than once"));
        }
        rules.push(rule);
    }
    rules.sort_by_key(|r| r.precedence());

    let mut required = false;
    let mut checks = Vec::new();
    let mut min_entries = None;
    let mut max_entries = None;
    for rule in rules {
        let check = match rule {
            Rule::Required => {
                required = true;
                continue;
            }
            Rule::YearFormat => Check::Year(
                Regex::new(YEAR_PATTERN).map_err(|e| malformed(rule, &e.to_string()))?,
            ),
            Rule::Pattern { regex, description } => Check::Pattern {
                regex: Regex::new(regex).map_err(|e| malformed(rule, &e.to_string()))?,
                description: description.clone(),
            },
            Rule::DateParseable => Check::DateParseable,
            Rule::OneOf(options) if options.is_empty() => {
                return Err(malformed(rule, "option list is empty"));
            }
            Rule::OneOf(options) => Check::OneOf(options.clone()),
            Rule::MaxSize(0) => return Err(malformed(rule, "size limit must be positive")),
            Rule::MaxSize(bytes) => Check::MaxSize(*bytes),
            Rule::AllowedTypes(types) if types.is_empty() => {
                return Err(malformed(rule, "MIME type set is empty"));
            }
            Rule::AllowedTypes(types) => Check::AllowedTypes(types.clone()),
            Rule::MinEntries(n) => {
                min_entries = Some(*n);
                Check::MinEntries(*n)
            }
            Rule::MaxEntries(n) => {
                max_entries = Some(*n);
                Check::MaxEntries(*n)
            }
        };
        checks.push(check);
    }
    if let (Some(min), Some(max)) = (min_entries, max_entries)
        && min > max
    {
        return Err(malformed(
            &Rule::MinEntries(min),
            &format!("minimum {min} exceeds maximum {max}"),
        ));
    }

    let kind = match &spec.kind {
        FieldKind::Text => CompiledKind::Text,
        FieldKind::Date => CompiledKind::Date,
        FieldKind::Document => CompiledKind::Document,
        FieldKind::Section(children) => {
            CompiledKind::Section(compile_fields(children, field_path)?)
        }
        FieldKind::Group { fields, .. } => {
            CompiledKind::Group(compile_fields(fields, &path::indexed(field_path, 0))?)
        }
    };

    Ok(CompiledField {
        name: spec.name.clone(),
        label: spec.label.clone(),
        kind,
        required,
        checks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(specs: Vec<FieldSpec>) -> ConfigError {
        CompiledSchema::compile(specs).unwrap_err()
    }

    #[test]
    fn compiles_nested_schema() {
        let schema = CompiledSchema::compile(vec![
            FieldSpec::section(
                "qualifications",
                "Qualifications",
                vec![FieldSpec::text("degreeType", "Degree type").required()],
            ),
            FieldSpec::group(
                "certifications",
                "certifications",
                vec![FieldSpec::text("issuingBody", "Issuing body").required()],
                1,
            ),
        ])
        .unwrap();
        assert_eq!(schema.fields.len(), 2);
        assert_eq!(schema.specs().len(), 2);
    }

    #[test]
    fn rules_are_ordered_by_precedence() {
        let schema = CompiledSchema::compile(vec![
            FieldSpec::document("doc", "Document")
                .rule(Rule::allowed_types(&["application/pdf"]))
                .rule(Rule::MaxSize(10))
                .required(),
        ])
        .unwrap();
        let field = &schema.fields[0];
        assert!(field.required);
        assert!(matches!(field.checks[0], Check::MaxSize(10)));
        assert!(matches!(field.checks[1], Check::AllowedTypes(_)));
    }

    #[test]
    fn rejects_bad_names() {
        assert!(matches!(
            err(vec![FieldSpec::text("", "Empty")]),
            ConfigError::InvalidFieldName { .. }
        ));
        assert!(matches!(
            err(vec![FieldSpec::text("a.b", "Dotted")]),
            ConfigError::InvalidFieldName { .. }
        ));
        assert!(matches!(
            err(vec![FieldSpec::text("a[0]", "Indexed")]),
            ConfigError::InvalidFieldName { .. }
        ));
    }

    #[test]
    fn rejects_duplicate_fields_with_path() {
        let e = err(vec![FieldSpec::section(
            "bar",
            "Bar",
            vec![FieldSpec::text("x", "X"), FieldSpec::text("x", "X again")],
        )]);
        match e {
            ConfigError::DuplicateField { path } => assert_eq!(path, "bar.x"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_inapplicable_rules() {
        assert!(matches!(
            err(vec![FieldSpec::text("name", "Name").rule(Rule::MaxSize(5))]),
            ConfigError::RuleNotApplicable { .. }
        ));
        assert!(matches!(
            err(vec![FieldSpec::document("doc", "Doc").rule(Rule::YearFormat)]),
            ConfigError::RuleNotApplicable { .. }
        ));
    }

    #[test]
    fn rejects_malformed_rules() {
        let cases = vec![
            FieldSpec::document("doc", "Doc").rule(Rule::MaxSize(0)),
            FieldSpec::document("doc", "Doc").rule(Rule::AllowedTypes(BTreeSet::new())),
            FieldSpec::text("t", "T").rule(Rule::OneOf(vec![])),
            FieldSpec::text("t", "T").required().required(),
            FieldSpec::text("t", "T").rule(Rule::Pattern {
                regex: "(".to_string(),
                description: "broken".to_string(),
            }),
            FieldSpec::group("g", "G", vec![], 0)
                .rule(Rule::MinEntries(3))
                .rule(Rule::MaxEntries(1)),
        ];
        for spec in cases {
            assert!(
                matches!(err(vec![spec.clone()]), ConfigError::MalformedRule { .. }),
                "expected malformed rule for {spec:?}"
            );
        }
    }

    #[test]
    fn group_entry_defaults_by_path() {
        let schema = CompiledSchema::compile(vec![
            FieldSpec::group("certifications", "c", vec![FieldSpec::text("a", "A")], 1),
            FieldSpec::section(
                "nested",
                "Nested",
                vec![FieldSpec::group("items", "i", vec![FieldSpec::document("d", "D")], 0)],
            ),
        ])
        .unwrap();

        let defaults = schema.group_entry_defaults("certifications").unwrap();
        assert!(defaults.contains_key("a"));
        let nested = schema.group_entry_defaults("nested.items").unwrap();
        assert!(nested.contains_key("d"));
        assert!(schema.group_entry_defaults("nested").is_none());
        assert!(schema.group_entry_defaults("missing").is_none());
        assert!(schema.group_entry_defaults("certifications.a").is_none());
    }

    #[test]
    fn default_payload_covers_every_field() {
        let schema = CompiledSchema::compile(vec![
            FieldSpec::text("a", "A"),
            FieldSpec::document("b", "B"),
        ])
        .unwrap();
        let payload = schema.default_payload();
        assert_eq!(payload.len(), 2);
    }
}
