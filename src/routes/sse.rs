use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{error::AppError, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/rooms/{id}/stream",
    tag = "sse",
    params(("id" = Uuid, Path, description = "Room identifier")),
    responses((status = 200, description = "Room change stream", content_type = "text/event-stream", body = String))
)]
/// Stream this room's row changes (room, answers, event responses) to a
/// connected client.
pub async fn room_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let receiver = state.store().subscribe().await?;
    info!(room = %id, "new room SSE connection");
    Ok(sse_service::to_sse_stream(receiver, id))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/rooms/{id}/stream", get(room_stream))
}
