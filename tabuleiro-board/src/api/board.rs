//! Board endpoints: progress, answers, hints, history

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tabuleiro_common::db::{ChatHistoryEntry, User, UserProgress};

use super::{ApiError, ApiResult, AuthUser};
use crate::houses::{self, House, FIRST_HOUSE_ID, HOUSE_COUNT};
use crate::mentor::GradingVerdict;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    pub house_id: i64,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseQuery {
    pub house_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub progress: UserProgress,
    pub user: User,
    pub houses: &'static [House],
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct HintResponse {
    pub hint: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<ChatHistoryEntry>,
}

pub fn validate_house_id(house_id: i64) -> ApiResult<()> {
    if houses::is_valid_house_id(house_id) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "houseId deve estar entre {} e {}",
            FIRST_HOUSE_ID, HOUSE_COUNT
        )))
    }
}

pub fn validate_answer(answer: &str, min_chars: usize) -> ApiResult<()> {
    if answer.chars().count() >= min_chars {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "A resposta deve ter pelo menos {} caracteres",
            min_chars
        )))
    }
}

fn house_query(query: Result<Query<HouseQuery>, QueryRejection>) -> ApiResult<i64> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    validate_house_id(query.house_id)?;
    Ok(query.house_id)
}

/// GET /api/auth/me
pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

/// GET /api/tabuleiro/progress
pub async fn get_progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<ProgressResponse>> {
    let board = state.controller.get_progress(&user).await?;
    let completed = board.stage().is_completed();

    Ok(Json(ProgressResponse {
        progress: board.progress,
        user,
        houses: board.houses,
        completed,
    }))
}

/// POST /api/tabuleiro/answer
pub async fn submit_answer(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Result<Json<SubmitAnswerRequest>, JsonRejection>,
) -> ApiResult<Json<GradingVerdict>> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    validate_house_id(request.house_id)?;
    validate_answer(&request.answer, state.settings.min_answer_chars)?;

    let verdict = state
        .controller
        .submit_answer(&user, request.house_id, &request.answer)
        .await?;

    Ok(Json(verdict))
}

/// GET /api/tabuleiro/hint?houseId=N
pub async fn get_hint(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<HouseQuery>, QueryRejection>,
) -> ApiResult<Json<HintResponse>> {
    let house_id = house_query(query)?;
    let hint = state.controller.get_hint(&user, house_id).await?;
    Ok(Json(HintResponse { hint }))
}

/// GET /api/tabuleiro/history?houseId=N
pub async fn get_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<HouseQuery>, QueryRejection>,
) -> ApiResult<Json<HistoryResponse>> {
    let house_id = house_query(query)?;
    let history = state.controller.get_chat_history(&user, house_id).await?;
    Ok(Json(HistoryResponse { history }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_house_id_bounds() {
        assert!(validate_house_id(1).is_ok());
        assert!(validate_house_id(20).is_ok());
        assert!(validate_house_id(0).is_err());
        assert!(validate_house_id(21).is_err());
    }

    #[test]
    fn test_answer_length_counts_characters() {
        assert!(validate_answer("x", 10).is_err());
        assert!(validate_answer("ação ação!", 10).is_ok());
        assert!(validate_answer("ação ação", 10).is_err());
    }
}
