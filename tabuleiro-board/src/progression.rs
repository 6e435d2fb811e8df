//! Progression controller
//!
//! Owns the board state machine: a learner may only answer the house their
//! progress pointer sits on, every attempt is logged, and approvals move the
//! pointer exactly one house forward.

use serde::Serialize;
use std::sync::Arc;
use tabuleiro_common::db::{ChatHistoryEntry, NewChatEntry, User, UserProgress};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::houses::{self, House, Stage};
use crate::mentor::{GradingOracle, GradingVerdict};
use crate::store::{ProgressStore, StoreError};

/// Controller errors
#[derive(Debug, Error)]
pub enum ProgressionError {
    #[error("Progresso não encontrado")]
    ProgressNotFound,

    #[error("Você deve completar a casa atual primeiro")]
    OutOfOrder { current: i64, submitted: i64 },

    #[error("Acesso não liberado. Conclua o pagamento para continuar.")]
    AccessDenied,

    /// Another submission for the same house advanced first
    #[error("Esta casa já foi concluída por outra submissão")]
    Conflict,

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ProgressionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProgressNotFound(_) => ProgressionError::ProgressNotFound,
            StoreError::Conflict { .. } => ProgressionError::Conflict,
            other => ProgressionError::Store(other),
        }
    }
}

pub type ProgressionResult<T> = std::result::Result<T, ProgressionError>;

/// Progress plus the full catalog, as rendered by the board
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardState {
    pub progress: UserProgress,
    pub houses: &'static [House],
}

impl BoardState {
    pub fn stage(&self) -> Stage {
        Stage::from_pointer(self.progress.current_house_id)
    }
}

pub struct ProgressionController {
    store: Arc<dyn ProgressStore>,
    oracle: Arc<dyn GradingOracle>,
}

impl ProgressionController {
    pub fn new(store: Arc<dyn ProgressStore>, oracle: Arc<dyn GradingOracle>) -> Self {
        Self { store, oracle }
    }

    fn ensure_active(user: &User) -> ProgressionResult<()> {
        if user.is_active {
            Ok(())
        } else {
            debug!(user_id = user.id, "Rejected request from inactive user");
            Err(ProgressionError::AccessDenied)
        }
    }

    /// Current progress, created on first access
    pub async fn get_progress(&self, user: &User) -> ProgressionResult<BoardState> {
        Self::ensure_active(user)?;

        let progress = match self.store.get_progress(user.id).await? {
            Some(progress) => progress,
            None => self.store.create_progress(user.id).await?,
        };

        Ok(BoardState {
            progress,
            houses: houses::all(),
        })
    }

    /// Grade an answer for the learner's current house
    ///
    /// Nothing is written until the oracle has replied; the chat entry and
    /// any advance are then committed together.
    pub async fn submit_answer(
        &self,
        user: &User,
        house_id: i64,
        answer: &str,
    ) -> ProgressionResult<GradingVerdict> {
        Self::ensure_active(user)?;

        let progress = self
            .store
            .get_progress(user.id)
            .await?
            .ok_or(ProgressionError::ProgressNotFound)?;

        let current = progress.current_house_id;
        match Stage::from_pointer(current) {
            Stage::InProgress(expected) if expected == house_id => {}
            _ => {
                info!(
                    user_id = user.id,
                    current_house_id = current,
                    house_id,
                    "Rejected out-of-order submission"
                );
                return Err(ProgressionError::OutOfOrder {
                    current,
                    submitted: house_id,
                });
            }
        }

        let verdict = self.oracle.grade(house_id, answer).await;

        let entry = NewChatEntry {
            user_id: user.id,
            house_id,
            user_message: answer.to_string(),
            mentor_response: verdict.feedback.clone(),
            approved: verdict.approved,
        };
        let xp_delta = verdict.approved.then_some(verdict.xp_gained.max(0));

        match self.store.record_attempt(entry, xp_delta).await {
            Ok(record) => {
                if let Some(progress) = record.progress {
                    info!(
                        user_id = user.id,
                        house_id,
                        current_house_id = progress.current_house_id,
                        xp_points = progress.xp_points,
                        completed = progress.completed_at.is_some(),
                        "Learner advanced"
                    );
                } else {
                    debug!(user_id = user.id, house_id, "Attempt recorded without advance");
                }
                Ok(verdict)
            }
            Err(e @ StoreError::Conflict { .. }) => {
                warn!(user_id = user.id, house_id, error = %e, "Concurrent submission already advanced");
                Err(e.into())
            }
            Err(e) => {
                tracing::error!(user_id = user.id, house_id, error = %e, "Failed to record attempt");
                Err(e.into())
            }
        }
    }

    /// Hint for any house; gated by access only, not by the progress pointer
    pub async fn get_hint(&self, user: &User, house_id: i64) -> ProgressionResult<String> {
        Self::ensure_active(user)?;
        Ok(self.oracle.hint(house_id).await)
    }

    /// Previous attempts for one house in creation order
    pub async fn get_chat_history(
        &self,
        user: &User,
        house_id: i64,
    ) -> ProgressionResult<Vec<ChatHistoryEntry>> {
        Self::ensure_active(user)?;
        Ok(self.store.chat_history(user.id, house_id).await?)
    }
}
