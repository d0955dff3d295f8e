//! Step catalog: the static, ordered list of wizard steps.

pub mod definition;
pub mod professional;

pub use definition::{StepCatalog, StepDefinition};
pub use professional::step_keys;
