//! Server-Sent Events support

use crate::state_machine::Snapshot;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert snapshot broadcasts to an SSE stream
///
/// Starts with an `init` event carrying `init`, then one `snapshot` event per
/// published state. A lagging client skips to the newest snapshots.
pub fn sse_stream(
    init: Snapshot,
    broadcast_rx: tokio::sync::broadcast::Receiver<Snapshot>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move { Ok(snapshot_event("init", &init)) });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(snapshot) => Some(Ok(snapshot_event("snapshot", &snapshot))),
        Err(_) => None, // Skip lagged messages
    });

    let combined = init.chain(broadcasts);

    Sse::new(combined).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn snapshot_event(event_type: &str, snapshot: &Snapshot) -> Event {
    let data = serde_json::to_string(snapshot).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(event_type).data(data)
}
