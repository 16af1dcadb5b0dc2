//! Server-Sent Events (SSE) streaming of fetch and NER progress.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_core::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::state::{AppEvent, SharedState};

/// Pipeline progress goes out as `status`, everything else as `notification`.
fn to_sse(event: &AppEvent) -> Option<Event> {
    let name = match event {
        AppEvent::PipelineStatus { .. } => "status",
        AppEvent::Notification { .. } => "notification",
    };
    let data = serde_json::to_string(event).ok()?;
    Some(Event::default().event(name).data(data))
}

/// GET /api/events
pub async fn sse_handler(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    // lagged receivers just skip the missed events
    let stream = BroadcastStream::new(rx)
        .filter_map(|result| result.ok().as_ref().and_then(to_sse).map(Ok));

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping"))
}
