//! Runtime configuration, read from the environment.

use std::path::PathBuf;
use std::sync::Arc;

use crate::draft::{AttachmentPolicy, DRAFT_KEY, DraftStore, FileStore};
use crate::error::ConfigError;

pub const ENV_DRAFT_DIR: &str = "ONBOARD_FORM_DRAFT_DIR";
pub const ENV_DRAFT_KEY: &str = "ONBOARD_FORM_DRAFT_KEY";
pub const ENV_ATTACHMENT_POLICY: &str = "ONBOARD_FORM_ATTACHMENT_POLICY";

/// Wizard configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardConfig {
    /// Directory the file-backed draft store writes into.
    pub draft_dir: PathBuf,
    /// Storage key of the single draft slot.
    pub draft_key: String,
    /// What a draft save does with document attachments.
    pub attachment_policy: AttachmentPolicy,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            draft_dir: PathBuf::from("./data/drafts"),
            draft_key: DRAFT_KEY.to_string(),
            attachment_policy: AttachmentPolicy::default(),
        }
    }
}

impl WizardConfig {
    /// Read the configuration from process environment variables.
    ///
    /// Unset variables fall back to defaults; set but malformed ones are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let draft_dir = non_empty(ENV_DRAFT_DIR)
            .map(PathBuf::from)
            .unwrap_or(defaults.draft_dir);

        let draft_key = non_empty(ENV_DRAFT_KEY).unwrap_or(defaults.draft_key);

        let attachment_policy = match non_empty(ENV_ATTACHMENT_POLICY) {
            Some(raw) => raw.parse()?,
            None => defaults.attachment_policy,
        };

        Ok(Self {
            draft_dir,
            draft_key,
            attachment_policy,
        })
    }

    /// File-backed draft store for this configuration.
    pub fn draft_store(&self) -> DraftStore {
        DraftStore::new(Arc::new(FileStore::new(&self.draft_dir)))
            .with_key(self.draft_key.clone())
            .with_policy(self.attachment_policy)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = WizardConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, WizardConfig::default());
        assert_eq!(config.draft_key, "multiStepFormData");
        assert_eq!(config.attachment_policy, AttachmentPolicy::Omit);
    }

    #[test]
    fn reads_overrides() {
        let config = WizardConfig::from_lookup(lookup(&[
            (ENV_DRAFT_DIR, "/tmp/drafts"),
            (ENV_DRAFT_KEY, "otherSlot"),
            (ENV_ATTACHMENT_POLICY, "reject"),
        ]))
        .unwrap();
        assert_eq!(config.draft_dir, PathBuf::from("/tmp/drafts"));
        assert_eq!(config.draft_key, "otherSlot");
        assert_eq!(config.attachment_policy, AttachmentPolicy::Reject);
    }

    #[test]
    fn blank_values_fall_back() {
        let config = WizardConfig::from_lookup(lookup(&[(ENV_DRAFT_KEY, "  ")])).unwrap();
        assert_eq!(config.draft_key, DRAFT_KEY);
    }

    #[test]
    fn draft_store_uses_configured_slot() {
        let config = WizardConfig::from_lookup(lookup(&[
            (ENV_DRAFT_KEY, "otherSlot"),
            (ENV_ATTACHMENT_POLICY, "reject"),
        ]))
        .unwrap();
        let store = config.draft_store();
        assert_eq!(store.key(), "otherSlot");
        assert_eq!(store.policy(), AttachmentPolicy::Reject);
    }

    #[test]
    fn invalid_policy_is_an_error() {
        let err = WizardConfig::from_lookup(lookup(&[(ENV_ATTACHMENT_POLICY, "keep")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
