//! Server-Sent Events stream for the CRM front end

use super::state::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use tracing::info;

/// `GET /api/telnyx/events`
///
/// The first frame is `connected` with the client id. The subscription is
/// dropped with the response body, which unregisters the client.
pub async fn events_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.broadcaster.subscribe();
    info!("API: SSE client {} subscribed", subscription.client_id());

    let stream = subscription.map(|frame| Ok::<_, Infallible>(Event::default().data(&*frame)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(state.sse_keep_alive)
            .text("keep-alive"),
    )
}
