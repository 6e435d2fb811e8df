//! Grading verdicts and parsing of free-text oracle replies
//!
//! The oracle is asked for a JSON object but answers in free text. Parsing
//! never fails: anything unusable becomes a rejection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Feedback for a house id that is not on the board
pub const INVALID_HOUSE_FEEDBACK: &str = "Casa inválida. Tente novamente.";

/// Feedback when the oracle could not be reached or produced nothing usable
pub const GRADING_ERROR_FEEDBACK: &str =
    "Erro ao processar sua resposta. Tente novamente em alguns instantes.";

/// Outcome of grading one answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingVerdict {
    pub approved: bool,
    pub feedback: String,
    /// Zero unless approved
    pub xp_gained: i64,
}

impl GradingVerdict {
    pub fn approved(feedback: impl Into<String>, xp_gained: i64) -> Self {
        Self {
            approved: true,
            feedback: feedback.into(),
            xp_gained,
        }
    }

    pub fn rejected(feedback: impl Into<String>) -> Self {
        Self {
            approved: false,
            feedback: feedback.into(),
            xp_gained: 0,
        }
    }
}

/// Parse an oracle reply into a verdict
///
/// Takes the substring from the first `{` to the last `}` and decodes it.
/// `reward_xp` is the configured reward: approved verdicts carry the
/// oracle's `xpGained` only when it lies in `1..=reward_xp`, otherwise the
/// reward itself.
pub fn parse_verdict(raw: &str, reward_xp: i64) -> GradingVerdict {
    let fallback_feedback = || {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            GRADING_ERROR_FEEDBACK.to_string()
        } else {
            trimmed.to_string()
        }
    };

    let Some(candidate) = extract_json_object(raw) else {
        tracing::debug!("Mentor reply contains no JSON object");
        return GradingVerdict::rejected(fallback_feedback());
    };

    let object = match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return GradingVerdict::rejected(fallback_feedback()),
        Err(e) => {
            tracing::debug!(error = %e, "Mentor reply JSON did not decode");
            return GradingVerdict::rejected(fallback_feedback());
        }
    };

    let approved = object.get("approved").and_then(Value::as_bool).unwrap_or(false);

    let feedback = object
        .get("feedback")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .unwrap_or_else(fallback_feedback);

    if !approved {
        return GradingVerdict::rejected(feedback);
    }

    let offered = object.get("xpGained").and_then(|v| {
        v.as_i64()
            .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
    });

    GradingVerdict::approved(feedback, resolve_reward(offered, reward_xp))
}

/// Clamp an oracle-offered reward to the configured ceiling
fn resolve_reward(offered: Option<i64>, reward_xp: i64) -> i64 {
    match offered {
        Some(xp) if (1..=reward_xp).contains(&xp) => xp,
        _ => reward_xp,
    }
}

/// Greedy match from the first `{` to the last `}`
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}
