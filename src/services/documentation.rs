use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the duet relay.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::create_room,
        crate::routes::rooms::join_room,
        crate::routes::rooms::resume_room,
        crate::routes::rooms::lookup_rooms,
        crate::routes::rooms::get_room,
        crate::routes::rooms::patch_room,
        crate::routes::answers::submit_answer,
        crate::routes::answers::list_answers,
        crate::routes::events::submit_event_response,
        crate::routes::events::list_event_responses,
        crate::routes::catalog::list_questions,
        crate::routes::catalog::list_game_events,
        crate::routes::sse::room_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::rooms::CreateRoomRequest,
            crate::dto::rooms::JoinRoomRequest,
            crate::dto::rooms::ResumeRoomRequest,
            crate::dto::rooms::LookupRoomsRequest,
            crate::dto::rooms::RoomPatchRequest,
            crate::dto::rooms::RoomSummary,
            crate::dto::answers::SubmitAnswerRequest,
            crate::dto::answers::AnswerSummary,
            crate::dto::events::SubmitEventResponseRequest,
            crate::dto::events::EventResponseSummary,
            crate::dto::events::QuestionSummary,
            crate::dto::events::GameEventSummary,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room lifecycle operations"),
        (name = "answers", description = "Answer ledger rows"),
        (name = "events", description = "Event response rows and catalogs"),
        (name = "sse", description = "Per-room change streams"),
    )
)]
pub struct ApiDoc;
