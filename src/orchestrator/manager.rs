//! FormOrchestrator: owns the live session, applies transitions, and
//! persists drafts on request.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::WizardConfig;
use crate::draft::{DraftStore, SaveReport};
use crate::error::{self, DraftError, EditError};
use crate::form::{EntryId, FieldValue, Record};
use crate::schema::ValidationResult;
use crate::steps::{StepCatalog, StepDefinition, professional};

use super::session::FormSession;
use super::transition::{self, Outcome, Transition};

/// Everything a renderer needs to draw the current step.
#[derive(Debug, Clone)]
pub struct StepView<'a> {
    pub index: usize,
    pub step_count: usize,
    pub definition: &'a StepDefinition,
    /// Held data for this step, or its defaults.
    pub merged_data: Record,
    /// Errors for this step once a submit of it has been rejected, kept
    /// current as the working copy is edited. Empty before that.
    pub validation: ValidationResult,
    pub can_skip: bool,
    pub is_terminal: bool,
}

/// Coordinates one onboarding attempt: the session, its transitions, and the
/// draft slot.
///
/// Persistence happens only through [`save_draft`](Self::save_draft) and
/// [`load_draft`](Self::load_draft); transitions never write.
pub struct FormOrchestrator {
    catalog: Arc<StepCatalog>,
    drafts: DraftStore,
    session: FormSession,
    /// Step index of the last rejected submit and the errors of its working
    /// copy, re-checked after every edit.
    last_rejection: Option<(usize, ValidationResult)>,
}

impl FormOrchestrator {
    /// Start a fresh session at step 0.
    pub fn new(catalog: Arc<StepCatalog>, drafts: DraftStore) -> Self {
        let session = transition::seed(&catalog, &FormSession::new());
        Self {
            catalog,
            drafts,
            session,
            last_rejection: None,
        }
    }

    /// Start a session, restoring the stored draft when there is one.
    pub fn resume(catalog: Arc<StepCatalog>, drafts: DraftStore) -> Result<Self, DraftError> {
        let mut orchestrator = Self::new(catalog, drafts);
        orchestrator.load_draft()?;
        Ok(orchestrator)
    }

    /// The built-in onboarding catalog over the configured file store,
    /// resumed from its draft when one exists.
    pub fn from_config(config: &WizardConfig) -> error::Result<Self> {
        let catalog = Arc::new(professional::catalog()?);
        Ok(Self::resume(catalog, config.draft_store())?)
    }

    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }

    pub fn session(&self) -> &FormSession {
        &self.session
    }

    pub fn current_step(&self) -> &StepDefinition {
        transition::current_step(&self.catalog, &self.session)
    }

    /// View model for the current step.
    pub fn current_view(&self) -> StepView<'_> {
        let index = self.session.current_step_index();
        let definition = self.current_step();
        let validation = match &self.last_rejection {
            Some((at, result)) if *at == index => result.clone(),
            _ => ValidationResult::default(),
        };
        let is_terminal = index >= self.catalog.last_index();
        StepView {
            index,
            step_count: self.catalog.len(),
            definition,
            merged_data: transition::working_copy(&self.catalog, &self.session),
            validation,
            can_skip: definition.is_skippable && !is_terminal,
            is_terminal,
        }
    }

    /// Validate and submit the current step's payload.
    pub fn submit_step(&mut self, payload: Record) -> Outcome {
        let t = transition::submit(&self.catalog, &self.session, payload);
        self.apply(t)
    }

    /// Skip the current step if it allows it.
    pub fn skip_step(&mut self) -> Outcome {
        let t = transition::skip(&self.catalog, &self.session);
        self.apply(t)
    }

    /// Hold a partial payload for the current step without validating it.
    pub fn stage_step(&mut self, payload: Record) {
        self.session = transition::stage(&self.catalog, &self.session, payload);
        self.revalidate();
    }

    /// Set one field of the current step's working copy.
    pub fn set_field(&mut self, path: &str, value: FieldValue) -> Result<(), EditError> {
        self.session = transition::set_field(&self.catalog, &self.session, path, value)?;
        self.revalidate();
        Ok(())
    }

    /// Add a default entry to a repeatable group of the current step.
    pub fn add_entry(&mut self, group_path: &str) -> Result<EntryId, EditError> {
        let (session, id) = transition::add_entry(&self.catalog, &self.session, group_path)?;
        self.session = session;
        self.revalidate();
        Ok(id)
    }

    /// Remove an entry by token. Removing an absent token is a no-op.
    pub fn remove_entry(&mut self, group_path: &str, id: EntryId) -> Result<(), EditError> {
        self.session = transition::remove_entry(&self.catalog, &self.session, group_path, id)?;
        self.revalidate();
        Ok(())
    }

    /// Persist the whole session to the draft slot.
    pub fn save_draft(&self) -> Result<SaveReport, DraftError> {
        self.drafts.save(&self.session)
    }

    /// Replace the live session with the stored draft.
    ///
    /// Returns `false` (and keeps the current session) when no draft exists.
    pub fn load_draft(&mut self) -> Result<bool, DraftError> {
        match self.drafts.load(&self.catalog)? {
            Some(session) => {
                self.session = transition::seed(&self.catalog, &session);
                self.last_rejection = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete the stored draft, e.g. after final submission.
    pub fn discard_draft(&self) -> Result<bool, DraftError> {
        self.drafts.clear()
    }

    /// Aggregate data for the review step.
    pub fn summary(&self) -> serde_json::Value {
        self.session.summary()
    }

    /// After a rejected submit, edits re-run the step's checks on the working copy.
    fn revalidate(&mut self) {
        let index = self.session.current_step_index();
        if !matches!(self.last_rejection, Some((at, _)) if at == index) {
            return;
        }
        let data = transition::working_copy(&self.catalog, &self.session);
        let result = self.current_step().validate(&data);
        debug!(
            step = %self.current_step().key,
            errors = result.len(),
            "Working copy re-checked"
        );
        self.last_rejection = Some((index, result));
    }

    fn apply(&mut self, t: Transition) -> Outcome {
        let Transition { session, outcome } = t;
        if let Outcome::Stayed(result) = &outcome {
            self.last_rejection = Some((session.current_step_index(), result.clone()));
        }
        if outcome.moved() {
            self.last_rejection = None;
            self.session = transition::seed(&self.catalog, &session);
            info!(
                step = %self.current_step().key,
                index = self.session.current_step_index(),
                "Now on step"
            );
        } else {
            self.session = session;
        }
        outcome
    }
}
