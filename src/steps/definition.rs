//! Step definitions and the ordered step catalog.

use std::collections::HashSet;

use tracing::info;

use crate::error::ConfigError;
use crate::form::Record;
use crate::schema::{CompiledSchema, ValidationResult};

/// Static description of one wizard step.
#[derive(Debug, Clone)]
pub struct StepDefinition {
    pub key: String,
    pub title: String,
    pub description: Option<String>,
    /// Steps without a schema accept any payload.
    pub schema: Option<CompiledSchema>,
    pub is_skippable: bool,
}

impl StepDefinition {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            description: None,
            schema: None,
            is_skippable: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_schema(mut self, schema: CompiledSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn skippable(mut self, is_skippable: bool) -> Self {
        self.is_skippable = is_skippable;
        self
    }

    /// Fresh payload for this step (empty when there is no schema).
    pub fn default_payload(&self) -> Record {
        self.schema
            .as_ref()
            .map(CompiledSchema::default_payload)
            .unwrap_or_default()
    }

    /// Check a payload. Steps without a schema always pass.
    pub fn validate(&self, payload: &Record) -> ValidationResult {
        self.schema
            .as_ref()
            .map(|schema| schema.validate(payload))
            .unwrap_or_default()
    }
}

/// The ordered, immutable list of steps.
#[derive(Debug, Clone)]
pub struct StepCatalog {
    steps: Vec<StepDefinition>,
}

impl StepCatalog {
    /// Build a catalog. Fails on an empty list or malformed/duplicate keys.
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self, ConfigError> {
        if steps.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        let mut seen = HashSet::new();
        for step in &steps {
            if step.key.is_empty() || step.key.contains(['.', '[', ']']) {
                return Err(ConfigError::InvalidValue {
                    key: "step.key".to_string(),
                    message: format!("{:?} is not a valid step key", step.key),
                });
            }
            if !seen.insert(step.key.as_str()) {
                return Err(ConfigError::DuplicateStep {
                    key: step.key.clone(),
                });
            }
        }
        info!(
            steps = steps.len(),
            keys = %steps.iter().map(|s| s.key.as_str()).collect::<Vec<_>>().join(","),
            "Step catalog loaded"
        );
        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false: a catalog holds at least one step.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the terminal (review) step.
    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    /// Step at `index`, clamped to the terminal step.
    pub fn clamped(&self, index: usize) -> &StepDefinition {
        &self.steps[index.min(self.last_index())]
    }

    pub fn by_key(&self, key: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.key == key)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index_of(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepDefinition> {
        self.steps.iter()
    }

    /// Validate a payload for the step named `step_key`.
    ///
    /// Returns `None` for a key the catalog does not know.
    pub fn validate(&self, step_key: &str, payload: &Record) -> Option<ValidationResult> {
        self.by_key(step_key).map(|step| step.validate(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::record;
    use crate::schema::FieldSpec;

    fn schema() -> CompiledSchema {
        CompiledSchema::compile(vec![FieldSpec::text("name", "Name").required()]).unwrap()
    }

    #[test]
    fn rejects_empty_catalog() {
        assert!(matches!(
            StepCatalog::new(vec![]),
            Err(ConfigError::EmptyCatalog)
        ));
    }

    #[test]
    fn rejects_duplicate_keys() {
        let result = StepCatalog::new(vec![
            StepDefinition::new("a", "A"),
            StepDefinition::new("a", "A again"),
        ]);
        assert!(matches!(result, Err(ConfigError::DuplicateStep { key }) if key == "a"));
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(StepCatalog::new(vec![StepDefinition::new("", "Blank")]).is_err());
        assert!(StepCatalog::new(vec![StepDefinition::new("a.b", "Dotted")]).is_err());
    }

    #[test]
    fn lookup_and_validate_by_key() {
        let catalog = StepCatalog::new(vec![
            StepDefinition::new("intro", "Intro").skippable(true),
            StepDefinition::new("details", "Details").with_schema(schema()),
            StepDefinition::new("review", "Review"),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.last_index(), 2);
        assert_eq!(catalog.index_of("details"), Some(1));
        assert_eq!(catalog.clamped(1).key, "details");
        assert_eq!(catalog.clamped(99).key, "review");
        assert!(catalog.get(0).unwrap().is_skippable);

        let errors = catalog.validate("details", &Record::new()).unwrap();
        assert_eq!(errors.get("name"), Some("Name is required"));
        assert!(catalog.validate("details", &record([("name", "Asha")])).unwrap().is_valid());
        assert!(catalog.validate("intro", &Record::new()).unwrap().is_valid());
        assert!(catalog.validate("missing", &Record::new()).is_none());
    }

    #[test]
    fn default_payload_without_schema_is_empty() {
        assert!(StepDefinition::new("x", "X").default_payload().is_empty());
        let with = StepDefinition::new("y", "Y").with_schema(schema());
        assert_eq!(with.default_payload().len(), 1);
    }
}
