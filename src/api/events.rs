//! Notification stream
//!
//! GET /api/v1/events streams session manager notifications as
//! server-sent events named `notification`.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::api::middleware::AppState;
use crate::models::Notification;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(stream_events))
}

async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(notification_stream(state.session_manager.notifications()))
        .keep_alive(KeepAlive::default())
}

/// Turn a notification receiver into a stream of SSE events.
///
/// Ends when the sender is gone. Lagging clients skip what they missed.
pub fn notification_stream(
    receiver: broadcast::Receiver<Notification>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(notification) => {
                    match Event::default().event("notification").json_data(&notification) {
                        Ok(event) => return Some((Ok(event), receiver)),
                        Err(e) => tracing::warn!("Failed to encode notification: {}", e),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event stream lagged, skipped {} notification(s)", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::build_router;
    use crate::api::testing::{setup_state, TEST_ORIGIN};
    use axum::{body::Body, http::{header, Request, StatusCode}};
    use futures::StreamExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_events_endpoint_is_event_stream() {
        let (state, _) = setup_state(true).await;
        let app = build_router(state, TEST_ORIGIN).unwrap();

        let response = app
            .oneshot(Request::builder().uri("/api/v1/events").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
    }

    #[tokio::test]
    async fn test_stream_yields_notifications_until_closed() {
        let (tx, rx) = broadcast::channel(4);
        let mut events = Box::pin(notification_stream(rx));

        tx.send(Notification::invalid_security_code()).unwrap();
        tx.send(Notification::security_code_taken()).unwrap();
        drop(tx);

        assert!(matches!(events.next().await, Some(Ok(_))));
        assert!(matches!(events.next().await, Some(Ok(_))));
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_lagged_stream_continues() {
        let (tx, rx) = broadcast::channel(1);
        let mut events = Box::pin(notification_stream(rx));

        tx.send(Notification::invalid_security_code()).unwrap();
        tx.send(Notification::security_code_taken()).unwrap();
        drop(tx);

        assert!(matches!(events.next().await, Some(Ok(_))));
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_events_endpoint_delivers_notification() {
        let (state, _) = setup_state(true).await;
        let manager = state.session_manager.clone();
        let app = build_router(state, TEST_ORIGIN).unwrap();

        let response = app
            .oneshot(Request::builder().uri("/api/v1/events").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let mut body = response.into_body().into_data_stream();

        manager.notify(Notification::invalid_security_code());

        let mut received = String::new();
        while !received.contains("\n\n") {
            let chunk = tokio::time::timeout(std::time::Duration::from_secs(2), body.next())
                .await
                .expect("event within timeout")
                .expect("stream open")
                .unwrap();
            received.push_str(std::str::from_utf8(&chunk).unwrap());
        }

        assert!(received.contains("event: notification"));
        let data = received
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .expect("data line");
        let notification: Notification = serde_json::from_str(data).unwrap();
        assert_eq!(notification, Notification::invalid_security_code());
    }
}
