use axum::Router;

use crate::state::SharedState;

/// Answer ledger routes.
pub mod answers;
/// Catalog listing routes.
pub mod catalog;
/// OpenAPI documentation routes.
pub mod docs;
/// Event response routes.
pub mod events;
/// Health check routes.
pub mod health;
/// Room lifecycle routes.
pub mod rooms;
/// Per-room SSE change streams.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(rooms::router())
        .merge(answers::router())
        .merge(events::router())
        .merge(catalog::router())
        .merge(sse::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
