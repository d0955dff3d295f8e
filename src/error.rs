//! Error types for the onboarding form engine.
//!
//! Validation failures are not errors: they travel as a
//! [`ValidationResult`](crate::schema::ValidationResult) value. Everything in
//! this module is a failure the caller must handle explicitly.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Draft error: {0}")]
    Draft(#[from] DraftError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Edit error: {0}")]
    Edit(#[from] EditError),
}

/// Malformed step catalog, schema, or environment configuration.
///
/// Raised at startup, never at validation time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Invalid field name {name:?}: {reason}")]
    InvalidFieldName { name: String, reason: String },

    #[error("Duplicate field {path}")]
    DuplicateField { path: String },

    #[error("Rule {rule} cannot be applied to {kind} field {path}")]
    RuleNotApplicable {
        path: String,
        rule: String,
        kind: String,
    },

    #[error("Rule {rule} on {path} is malformed: {reason}")]
    MalformedRule {
        path: String,
        rule: String,
        reason: String,
    },

    #[error("Duplicate step key {key}")]
    DuplicateStep { key: String },

    #[error("Step catalog must contain at least one step")]
    EmptyCatalog,
}

/// Failures of the draft slot: the session could not be written or read back.
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("Cannot serialize field {path}: {reason}")]
    Serialization { path: String, reason: String },

    #[error("Stored draft is corrupt: {0}")]
    Corrupt(String),

    #[error("Unsupported draft format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Key-value storage medium errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid storage key {0:?}")]
    InvalidKey(String),

    #[error("Stored value for {key} is not valid JSON: {reason}")]
    Decode { key: String, reason: String },

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Misaddressed working-copy edits on the current step.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("Field path {0:?} is empty or malformed")]
    InvalidPath(String),

    #[error("Field {path} is not a record")]
    NotARecord { path: String },

    #[error("Field {path} is not a repeatable group")]
    NotAGroup { path: String },

    #[error("Field {path} cannot hold a NaN or infinite number")]
    NonFiniteNumber { path: String },

    #[error("Step {step} has no repeatable group {path}")]
    UnknownGroup { step: String, path: String },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
