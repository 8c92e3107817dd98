//! Company edit form lifecycle.
//!
//! `Idle -> Editing -> Validating -> Saving -> Idle | Error`. A failed
//! validation goes back to `Editing` carrying the reason; the draft is kept.

use serde::Serialize;

use super::CompanyScopeResolver;
use crate::errors::AppError;
use crate::models::CompanyRequest;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CompanyFormState {
    Idle,
    Editing {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Validating,
    Saving,
    Error {
        message: String,
    },
}

/// Draft being edited. `id` is `None` when creating.
#[derive(Debug, Clone)]
pub struct CompanyDraft {
    pub id: Option<i64>,
    pub request: CompanyRequest,
}

#[derive(Debug)]
pub struct CompanyForm {
    state: CompanyFormState,
    draft: Option<CompanyDraft>,
}

impl Default for CompanyForm {
    fn default() -> Self {
        Self::new()
    }
}

impl CompanyForm {
    pub fn new() -> Self {
        Self {
            state: CompanyFormState::Idle,
            draft: None,
        }
    }

    pub fn state(&self) -> &CompanyFormState {
        &self.state
    }

    pub fn draft(&self) -> Option<&CompanyDraft> {
        self.draft.as_ref()
    }

    /// Start editing an existing company (`Some(id)`) or a new one (`None`).
    pub fn open(&mut self, id: Option<i64>, request: CompanyRequest) -> Result<(), AppError> {
        match self.state {
            CompanyFormState::Idle | CompanyFormState::Error { .. } => {
                self.draft = Some(CompanyDraft {
                    id,
                    request: request.with_defaults(),
                });
                self.state = CompanyFormState::Editing { reason: None };
                Ok(())
            }
            _ => Err(self.invalid_transition("open")),
        }
    }

    /// Replace the draft's fields while editing.
    pub fn edit(&mut self, request: CompanyRequest) -> Result<(), AppError> {
        let editing = matches!(self.state, CompanyFormState::Editing { .. });
        match self.draft.as_mut() {
            Some(draft) if editing => draft.request = request.with_defaults(),
            _ => return Err(self.invalid_transition("edit")),
        }
        self.state = CompanyFormState::Editing { reason: None };
        Ok(())
    }

    /// Validate the draft. On success the form moves to `Saving` and the
    /// draft to send is returned; on failure it returns to `Editing`.
    pub fn submit(
        &mut self,
        resolver: &CompanyScopeResolver<'_>,
    ) -> Result<CompanyDraft, AppError> {
        let draft = match (&self.state, &self.draft) {
            (CompanyFormState::Editing { .. }, Some(draft)) => draft.clone(),
            _ => return Err(self.invalid_transition("submit")),
        };

        self.state = CompanyFormState::Validating;
        match resolver.validate_company(draft.id, &draft.request) {
            Ok(()) => {
                self.state = CompanyFormState::Saving;
                Ok(draft)
            }
            Err(err) => {
                tracing::debug!("Company form rejected: {}", err);
                self.state = CompanyFormState::Editing {
                    reason: Some(err.message()),
                };
                Err(err)
            }
        }
    }

    /// Record the outcome of the backend save.
    pub fn finish<T>(&mut self, outcome: Result<T, AppError>) -> Result<T, AppError> {
        if self.state != CompanyFormState::Saving {
            return Err(self.invalid_transition("finish"));
        }
        match outcome {
            Ok(value) => {
                self.state = CompanyFormState::Idle;
                self.draft = None;
                Ok(value)
            }
            Err(err) => {
                self.state = CompanyFormState::Error {
                    message: err.message(),
                };
                Err(err)
            }
        }
    }

    fn invalid_transition(&self, action: &str) -> AppError {
        AppError::Internal(format!(
            "Cannot {} a company form in state {:?}",
            action, self.state
        ))
    }
}
