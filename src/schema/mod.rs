//! Schema validator: declarative per-step schemas and the rule interpreter.
//!
//! A schema is a list of [`FieldSpec`]s, each carrying tagged [`Rule`]s.
//! [`CompiledSchema::compile`] rejects malformed schemas up front;
//! [`CompiledSchema::validate`] is a pure function from payload to
//! [`ValidationResult`].

pub mod compile;
pub mod field;
pub mod rule;
pub mod validate;

pub use compile::CompiledSchema;
pub use field::{FieldKind, FieldSpec};
pub use rule::{DOCUMENT_MAX_BYTES, DOCUMENT_MIME_TYPES, Rule};
pub use validate::ValidationResult;
