use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::rooms::{
        CreateRoomRequest, JoinRoomRequest, LookupRoomsRequest, ResumeRoomRequest,
        RoomPatchRequest, RoomSummary,
    },
    error::AppError,
    services::room_service,
    state::SharedState,
};

/// Routes handling room lifecycle operations.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/join", post(join_room))
        .route("/rooms/lookup", post(lookup_rooms))
        .route("/rooms/{id}", get(get_room).patch(patch_room))
        .route("/rooms/{id}/resume", post(resume_room))
}

/// Create a room with a fresh collision-checked join code.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "Room created", body = RoomSummary),
        (status = 409, description = "Code allocation exhausted")
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateRoomRequest>>,
) -> Result<Json<RoomSummary>, AppError> {
    let store = state.store();
    let room = room_service::create_room(&store, payload.player_name, payload.room_name).await?;
    Ok(Json(room.into()))
}

/// Join (or reconnect to) a room by its code.
#[utoipa::path(
    post,
    path = "/rooms/join",
    tag = "rooms",
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Joined", body = RoomSummary),
        (status = 404, description = "No room matches that code"),
        (status = 409, description = "Room already has two players")
    )
)]
pub async fn join_room(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<JoinRoomRequest>>,
) -> Result<Json<RoomSummary>, AppError> {
    let store = state.store();
    let room = room_service::join_room(&store, &payload.room_code, &payload.player_name).await?;
    Ok(Json(room.into()))
}

/// Reconnect a returning player to a room by id.
#[utoipa::path(
    post,
    path = "/rooms/{id}/resume",
    tag = "rooms",
    params(("id" = Uuid, Path, description = "Identifier of the room to resume")),
    request_body = ResumeRoomRequest,
    responses(
        (status = 200, description = "Resumed", body = RoomSummary),
        (status = 404, description = "Room no longer exists")
    )
)]
pub async fn resume_room(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ResumeRoomRequest>>,
) -> Result<Json<RoomSummary>, AppError> {
    let store = state.store();
    let room = room_service::resume_room(&store, id, &payload.player_name).await?;
    Ok(Json(room.into()))
}

/// Fetch the still-existing rooms among the given ids.
#[utoipa::path(
    post,
    path = "/rooms/lookup",
    tag = "rooms",
    request_body = LookupRoomsRequest,
    responses((status = 200, description = "Matching rooms", body = [RoomSummary]))
)]
pub async fn lookup_rooms(
    State(state): State<SharedState>,
    Json(payload): Json<LookupRoomsRequest>,
) -> Result<Json<Vec<RoomSummary>>, AppError> {
    let store = state.store();
    let rooms = room_service::lookup_rooms(&store, payload.ids).await?;
    Ok(Json(rooms.into_iter().map(Into::into).collect()))
}

/// Fetch a room row by id.
#[utoipa::path(
    get,
    path = "/rooms/{id}",
    tag = "rooms",
    params(("id" = Uuid, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "The room", body = RoomSummary),
        (status = 404, description = "Room not found")
    )
)]
pub async fn get_room(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoomSummary>, AppError> {
    let room = state
        .store()
        .find_room(id)
        .await?
        .ok_or_else(|| AppError::NotFound("room not found".into()))?;
    Ok(Json(room.into()))
}

/// Apply a partial update to a room row.
#[utoipa::path(
    patch,
    path = "/rooms/{id}",
    tag = "rooms",
    params(("id" = Uuid, Path, description = "Room identifier")),
    request_body = RoomPatchRequest,
    responses(
        (status = 200, description = "Updated room", body = RoomSummary),
        (status = 404, description = "Room not found")
    )
)]
pub async fn patch_room(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoomPatchRequest>,
) -> Result<Json<RoomSummary>, AppError> {
    let room = state
        .store()
        .update_room(id, payload.into())
        .await?
        .ok_or_else(|| AppError::NotFound("room not found".into()))?;
    Ok(Json(room.into()))
}
