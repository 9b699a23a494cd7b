use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dao::models::EventResponseEntity,
    dto::events::{EventResponseSummary, ListEventResponsesQuery, SubmitEventResponseRequest},
    error::AppError,
    state::SharedState,
};

/// Routes handling event response rows.
pub fn router() -> Router<SharedState> {
    Router::new().route(
        "/rooms/{id}/event-responses",
        get(list_event_responses).post(submit_event_response),
    )
}

/// Record or rewrite one player's response to a bonus event. Unlike answers
/// this is an upsert: a row already recorded for (event, player) is updated
/// in place, so re-entering an event after a reload does not duplicate it.
#[utoipa::path(
    post,
    path = "/rooms/{id}/event-responses",
    tag = "events",
    params(("id" = Uuid, Path, description = "Room identifier")),
    request_body = SubmitEventResponseRequest,
    responses((status = 200, description = "Stored response", body = EventResponseSummary))
)]
pub async fn submit_event_response(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SubmitEventResponseRequest>>,
) -> Result<Json<EventResponseSummary>, AppError> {
    let store = state.store();

    let existing = store
        .list_event_responses(id, payload.event_id)
        .await?
        .into_iter()
        .find(|row| row.player_name == payload.player_name);

    let stored = match existing {
        Some(row) => store
            .update_event_response(row.id, payload.response, payload.completed)
            .await?
            .ok_or_else(|| AppError::NotFound("event response disappeared".into()))?,
        None => {
            store
                .insert_event_response(EventResponseEntity::new(
                    id,
                    payload.event_id,
                    payload.player_name,
                    payload.response,
                    payload.completed,
                ))
                .await?
        }
    };

    Ok(Json(stored.into()))
}

/// List the responses recorded for one event occurrence.
#[utoipa::path(
    get,
    path = "/rooms/{id}/event-responses",
    tag = "events",
    params(
        ("id" = Uuid, Path, description = "Room identifier"),
        ("event_id" = Uuid, Query, description = "Event to filter on")
    ),
    responses((status = 200, description = "Matching responses", body = [EventResponseSummary]))
)]
pub async fn list_event_responses(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListEventResponsesQuery>,
) -> Result<Json<Vec<EventResponseSummary>>, AppError> {
    let rows = state
        .store()
        .list_event_responses(id, query.event_id)
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}
