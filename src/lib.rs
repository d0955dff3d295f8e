//! Onboard Form: multi-step professional onboarding wizard engine.

pub mod config;
pub mod draft;
pub mod error;
pub mod form;
pub mod group;
pub mod orchestrator;
pub mod schema;
pub mod steps;
