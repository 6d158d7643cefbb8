//! SSE response construction for `tasks/sendSubscribe`.
//!
//! Each engine event becomes one `data:` frame carrying a JSON-RPC success
//! envelope that echoes the request id. The stream closes after the frame
//! with `final: true`; the engine guarantees exactly one, and that it is
//! last. Handler failures arrive here as ordinary `failed` status events;
//! an error envelope is never written onto the SSE channel.

use std::convert::Infallible;

use axum::http::header;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;

use super::EventStream;
use crate::types::{JsonRpcSuccessResponse, RequestId, TaskStreamEvent};

/// Serializes one stream event into its frame payload.
#[must_use]
pub fn event_frame(id: &RequestId, event: &TaskStreamEvent) -> String {
    let envelope = JsonRpcSuccessResponse::new(id.clone(), event);
    serde_json::to_string(&envelope).unwrap_or_default()
}

/// Builds the SSE response for an accepted subscription.
pub fn sse_response(id: RequestId, events: EventStream) -> Response {
    let frames = events.map(move |event| {
        Ok::<_, Infallible>(Event::default().data(event_frame(&id, &event)))
    });

    let mut response = Sse::new(frames).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, "no-cache".parse().expect("static header"));
    headers.insert(header::CONNECTION, "keep-alive".parse().expect("static header"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TaskStatus, TaskStatusUpdateEvent};

    fn status_event(is_final: bool) -> TaskStreamEvent {
        TaskStreamEvent::Status(TaskStatusUpdateEvent {
            id: "t-1".into(),
            status: TaskStatus::completed(),
            is_final,
        })
    }

    #[test]
    fn test_frame_is_success_envelope() {
        let frame = event_frame(&RequestId::String("r1".into()), &status_event(true));
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], "r1");
        assert_eq!(value["result"]["id"], "t-1");
        assert_eq!(value["result"]["final"], true);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_frame_single_line() {
        // SSE frames are written as a single `data:` line; the JSON must not
        // contain raw newlines.
        let frame = event_frame(&RequestId::Number(2), &status_event(false));
        assert!(!frame.contains('\n'));
    }

    #[test]
    fn test_sse_response_headers() {
        let events: EventStream = Box::pin(futures::stream::empty());
        let response = sse_response(RequestId::Null, events);

        let headers = response.headers();
        assert_eq!(
            headers.get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-cache");
        assert_eq!(headers.get(header::CONNECTION).unwrap(), "keep-alive");
    }
}
