//! Grading oracle adapter ("Mentor Arthur")
//!
//! Turns a (house, answer) pair into a [`GradingVerdict`] by delegating the
//! judgment to an external text generator. Every oracle failure is
//! absorbed here and surfaces as a rejection or a fallback hint; nothing
//! in this module returns an error to the caller.

pub mod gemini;
pub mod prompt;
pub mod verdict;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::houses;

pub use gemini::GeminiClient;
pub use verdict::{parse_verdict, GradingVerdict, GRADING_ERROR_FEEDBACK, INVALID_HOUSE_FEEDBACK};

/// Hint returned for a house id that is not on the board
pub const INVALID_HOUSE_HINT: &str = "Casa inválida.";

/// Hint returned when the oracle fails
pub const HINT_UNAVAILABLE: &str = "Não foi possível obter uma dica no momento.";

/// Text generation errors
#[derive(Debug, Error)]
pub enum MentorError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty response from text generator")]
    EmptyResponse,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Text generator not configured")]
    NotConfigured,
}

/// External text-generation capability
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply to `content` under `system_instruction`
    async fn generate(&self, system_instruction: &str, content: &str) -> Result<String, MentorError>;
}

/// Stand-in used when no API key is configured; every call fails
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredGenerator;

#[async_trait]
impl TextGenerator for UnconfiguredGenerator {
    async fn generate(&self, _system_instruction: &str, _content: &str) -> Result<String, MentorError> {
        Err(MentorError::NotConfigured)
    }
}

/// Judge consulted by the progression controller
///
/// Infallible by contract: implementations degrade instead of erroring.
#[async_trait]
pub trait GradingOracle: Send + Sync {
    async fn grade(&self, house_id: i64, answer: &str) -> GradingVerdict;

    async fn hint(&self, house_id: i64) -> String;
}

/// [`GradingOracle`] backed by a [`TextGenerator`]
#[derive(Clone)]
pub struct Mentor {
    generator: Arc<dyn TextGenerator>,
    reward_xp: i64,
}

impl Mentor {
    pub fn new(generator: Arc<dyn TextGenerator>, reward_xp: i64) -> Self {
        Self {
            generator,
            reward_xp,
        }
    }
}

#[async_trait]
impl GradingOracle for Mentor {
    async fn grade(&self, house_id: i64, answer: &str) -> GradingVerdict {
        let Some(house) = houses::lookup(house_id) else {
            warn!(house_id, "Grading requested for unknown house");
            return GradingVerdict::rejected(INVALID_HOUSE_FEEDBACK);
        };

        let instruction = prompt::grading_instruction(house, self.reward_xp);

        debug!(house_id, answer_chars = answer.chars().count(), "Sending answer to mentor");

        match self.generator.generate(&instruction, answer).await {
            Ok(reply) => {
                let verdict = parse_verdict(&reply, self.reward_xp);
                info!(
                    house_id,
                    approved = verdict.approved,
                    xp_gained = verdict.xp_gained,
                    "Mentor graded answer"
                );
                verdict
            }
            Err(e) => {
                warn!(house_id, error = %e, "Mentor grading failed, treating as rejection");
                GradingVerdict::rejected(GRADING_ERROR_FEEDBACK)
            }
        }
    }

    async fn hint(&self, house_id: i64) -> String {
        let Some(house) = houses::lookup(house_id) else {
            return INVALID_HOUSE_HINT.to_string();
        };

        let instruction = prompt::hint_instruction(house);
        let request = prompt::hint_request(house);

        match self.generator.generate(&instruction, &request).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => {
                warn!(house_id, "Mentor returned an empty hint");
                HINT_UNAVAILABLE.to_string()
            }
            Err(e) => {
                warn!(house_id, error = %e, "Mentor hint failed");
                HINT_UNAVAILABLE.to_string()
            }
        }
    }
}
