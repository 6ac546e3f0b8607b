//! Server-Sent Events endpoints.
//!
//! Each connection registers a [`Subscription`] with the [`Hub`] and
//! streams its frames as `data:` events. When the client goes away axum
//! drops the stream, which drops the subscription and removes it from
//! its pool. When the hub closes, the stream ends and the response
//! completes.
//!
//! [`Hub`]: crate::hub::Hub

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures::stream::{self, Stream};

use crate::hub::{PoolKind, Subscription};
use crate::state::AppState;

/// `GET /api/elections/stream` -- bare summary frames.
pub async fn legacy_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    frames(state.hub.subscribe(PoolKind::Legacy))
}

/// `GET /api/elections/stream2` -- typed envelope frames.
pub async fn versioned_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    frames(state.hub.subscribe(PoolKind::Versioned))
}

fn frames(subscription: Subscription) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = stream::unfold(subscription, |mut sub| async move {
        let frame = sub.recv().await?;
        Some((Ok(Event::default().data(&*frame)), sub))
    });
    Sse::new(stream)
}
