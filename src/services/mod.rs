/// Per-question answer ledger.
pub mod answer_ledger;
/// OpenAPI documentation generation.
pub mod documentation;
/// Per-event response ledger.
pub mod event_ledger;
/// Bonus event trigger and selection.
pub mod event_picker;
/// Answered-question journal assembly.
pub mod history_service;
/// Room creation, joining, and resumption.
pub mod room_service;
/// Shared room row mirroring.
pub mod session_sync;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
