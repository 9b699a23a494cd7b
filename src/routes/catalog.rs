use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::events::{GameEventSummary, QuestionSummary},
    error::AppError,
    state::SharedState,
};

/// Read-only catalog listing routes, ordered by (level, sort_order).
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/catalog/questions", get(list_questions))
        .route("/catalog/events", get(list_game_events))
}

/// Return the full question catalog in play order.
#[utoipa::path(
    get,
    path = "/catalog/questions",
    tag = "events",
    responses((status = 200, description = "The question catalog", body = [QuestionSummary]))
)]
pub async fn list_questions(
    State(state): State<SharedState>,
) -> Result<Json<Vec<QuestionSummary>>, AppError> {
    let rows = state.store().list_questions().await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Return the full bonus event catalog in play order.
#[utoipa::path(
    get,
    path = "/catalog/events",
    tag = "events",
    responses((status = 200, description = "The event catalog", body = [GameEventSummary]))
)]
pub async fn list_game_events(
    State(state): State<SharedState>,
) -> Result<Json<Vec<GameEventSummary>>, AppError> {
    let rows = state.store().list_game_events().await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}
