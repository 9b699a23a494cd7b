use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dao::models::AnswerEntity,
    dto::answers::{AnswerSummary, ListAnswersQuery, SubmitAnswerRequest},
    error::AppError,
    state::SharedState,
};

/// Routes handling answer rows. Duplicate-submission guarding is a client
/// concern; the relay stores whatever it is given.
pub fn router() -> Router<SharedState> {
    Router::new().route(
        "/rooms/{id}/answers",
        get(list_answers).post(submit_answer),
    )
}

/// Record one player's answer (or skip) for a question.
#[utoipa::path(
    post,
    path = "/rooms/{id}/answers",
    tag = "answers",
    params(("id" = Uuid, Path, description = "Room identifier")),
    request_body = SubmitAnswerRequest,
    responses((status = 200, description = "Stored answer", body = AnswerSummary))
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SubmitAnswerRequest>>,
) -> Result<Json<AnswerSummary>, AppError> {
    let answer = state
        .store()
        .insert_answer(AnswerEntity::new(
            id,
            payload.question_id,
            payload.player_name,
            payload.answer,
            payload.skipped,
        ))
        .await?;
    Ok(Json(answer.into()))
}

/// List the answers of one question, or the whole room journal when no
/// question is given.
#[utoipa::path(
    get,
    path = "/rooms/{id}/answers",
    tag = "answers",
    params(
        ("id" = Uuid, Path, description = "Room identifier"),
        ("question_id" = Option<Uuid>, Query, description = "Question to filter on")
    ),
    responses((status = 200, description = "Matching answers", body = [AnswerSummary]))
)]
pub async fn list_answers(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListAnswersQuery>,
) -> Result<Json<Vec<AnswerSummary>>, AppError> {
    let store = state.store();
    let rows = match query.question_id {
        Some(question_id) => store.list_answers(id, question_id).await?,
        None => store.list_room_answers(id).await?,
    };
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}
