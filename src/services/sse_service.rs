use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info};
use uuid::Uuid;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::dao::models::RecordChange;
use crate::dto::sse::ServerEvent;

/// Convert the store-wide change feed into an SSE response scoped to one
/// room, forwarding matching changes until the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<RecordChange>,
    room_id: Uuid,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from the broadcast feed, filters to the room,
    // and pushes encoded events into the mpsc channel
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(change) => {
                            if change.room_id() != room_id {
                                continue;
                            }
                            let payload = match ServerEvent::from_change(change) {
                                Ok(payload) => payload,
                                Err(err) => {
                                    debug!(error = %err, "failed to encode change; skipping");
                                    continue;
                                }
                            };

                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }

                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive;
                            // clients repair through their own polling.
                            continue;
                        }
                    }
                }
            }
        }

        info!(room = %room_id, "room SSE stream disconnected");
    });

    // response stream reads from mpsc; when the client disconnects axum
    // drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
