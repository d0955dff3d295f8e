//! Session state, the pure transitions over it, and the stateful façade a
//! renderer drives.

pub mod manager;
pub mod session;
pub mod transition;

pub use manager::{FormOrchestrator, StepView};
pub use session::FormSession;
pub use transition::{Outcome, Transition};
