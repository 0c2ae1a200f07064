//! Outbound stream assembly.
//!
//! The relay turns "retrieved documents + completion stream" into the
//! ordered event sequence a caller sees: one `citations` frame, then
//! completion deltas verbatim in arrival order, then exactly one
//! terminal frame (`done` on a clean end, `error` if the completion
//! fails or stalls mid-stream). Frames are a typed stream so the
//! ordering rules stay testable without an HTTP caller; [`into_sse`]
//! maps them onto the wire at the edge.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::Event;
use futures_util::stream::{self, Stream, StreamExt};

use crate::llm::chat_stream::CompletionStream;
use crate::models::DocumentRef;

/// How long the relay waits between completion chunks before giving up.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// One outbound frame, in the order the caller sees them.
#[derive(Debug)]
pub enum RelayFrame {
    /// Which documents informed the answer. Always the first frame,
    /// emitted before any completion text exists.
    Citations(Vec<DocumentRef>),
    /// One completion chunk, verbatim.
    Delta(String),
    /// Terminal failure after streaming began; nothing follows it.
    StreamError(String),
    /// Clean end of the completion; nothing follows it.
    Done,
}

enum RelaySource {
    Streaming(CompletionStream, Duration),
    Finished,
}

/// Build the frame stream for one answer. Dropping it drops the
/// completion subscription, which cancels the in-flight generation.
pub fn relay_frames(
    citations: Vec<DocumentRef>,
    completion: CompletionStream,
    idle_timeout: Duration,
) -> impl Stream<Item = RelayFrame> + Send + 'static {
    let deltas = stream::unfold(
        RelaySource::Streaming(completion, idle_timeout),
        |source| async move {
            let RelaySource::Streaming(mut completion, timeout) = source else {
                return None;
            };
            match tokio::time::timeout(timeout, completion.next()).await {
                Ok(Some(Ok(content))) => Some((
                    RelayFrame::Delta(content),
                    RelaySource::Streaming(completion, timeout),
                )),
                Ok(Some(Err(e))) => {
                    tracing::warn!(error = %e, "completion stream failed mid-answer");
                    Some((RelayFrame::StreamError(e.to_string()), RelaySource::Finished))
                }
                Ok(None) => Some((RelayFrame::Done, RelaySource::Finished)),
                Err(_) => {
                    tracing::warn!(
                        timeout_secs = timeout.as_secs(),
                        "no completion chunk before the idle timeout"
                    );
                    Some((
                        RelayFrame::StreamError("Completion timed out (idle)".to_string()),
                        RelaySource::Finished,
                    ))
                }
            }
        },
    );

    stream::once(async move { RelayFrame::Citations(citations) }).chain(deltas)
}

/// Map relay frames onto SSE events.
pub fn into_sse<S>(frames: S) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static
where
    S: Stream<Item = RelayFrame> + Send + 'static,
{
    frames.map(|frame| {
        let event = match frame {
            RelayFrame::Citations(documents) => Event::default()
                .event("citations")
                .json_data(serde_json::json!({ "documents": documents }))
                .unwrap(),
            RelayFrame::Delta(content) => Event::default()
                .event("delta")
                .json_data(serde_json::json!({ "content": content }))
                .unwrap(),
            RelayFrame::StreamError(message) => Event::default()
                .event("error")
                .json_data(serde_json::json!({ "message": message }))
                .unwrap(),
            RelayFrame::Done => Event::default()
                .event("done")
                .json_data(serde_json::json!({}))
                .unwrap(),
        };
        Ok(event)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion_of(chunks: Vec<anyhow::Result<String>>) -> CompletionStream {
        Box::pin(stream::iter(chunks))
    }

    fn refs(ids: &[i64]) -> Vec<DocumentRef> {
        ids.iter()
            .map(|&id| DocumentRef {
                id,
                name: format!("doc-{id}"),
                section: None,
                uri: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_citations_frame_comes_first() {
        let frames: Vec<RelayFrame> = relay_frames(
            refs(&[11, 12]),
            completion_of(vec![Ok("answer".into())]),
            IDLE_TIMEOUT,
        )
        .collect()
        .await;

        match &frames[0] {
            RelayFrame::Citations(documents) => {
                assert_eq!(documents.len(), 2);
                assert_eq!(documents[0].id, 11);
            }
            other => panic!("expected citations first, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deltas_arrive_verbatim_and_in_order() {
        let frames: Vec<RelayFrame> = relay_frames(
            refs(&[1]),
            completion_of(vec![Ok("Fever ".into()), Ok("usually ".into()), Ok("passes.".into())]),
            IDLE_TIMEOUT,
        )
        .collect()
        .await;

        let text: String = frames
            .iter()
            .filter_map(|f| match f {
                RelayFrame::Delta(content) => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Fever usually passes.");
        assert!(matches!(frames.last(), Some(RelayFrame::Done)));
    }

    #[tokio::test]
    async fn test_empty_completion_still_gets_citations_and_done() {
        let frames: Vec<RelayFrame> =
            relay_frames(Vec::new(), completion_of(Vec::new()), IDLE_TIMEOUT)
                .collect()
                .await;

        assert_eq!(frames.len(), 2);
        match &frames[0] {
            RelayFrame::Citations(documents) => assert!(documents.is_empty()),
            other => panic!("expected citations first, got {other:?}"),
        }
        assert!(matches!(frames[1], RelayFrame::Done));
    }

    #[tokio::test]
    async fn test_mid_stream_error_is_terminal() {
        let frames: Vec<RelayFrame> = relay_frames(
            refs(&[1]),
            completion_of(vec![
                Ok("partial ".into()),
                Err(anyhow::anyhow!("connection reset")),
                Ok("never delivered".into()),
            ]),
            IDLE_TIMEOUT,
        )
        .collect()
        .await;

        assert_eq!(frames.len(), 3, "nothing may follow the error frame");
        assert!(matches!(&frames[1], RelayFrame::Delta(c) if c == "partial "));
        match &frames[2] {
            RelayFrame::StreamError(message) => assert!(message.contains("connection reset")),
            other => panic!("expected a stream error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_completion_times_out_with_terminal_error() {
        let stalled: CompletionStream = Box::pin(stream::pending());
        let frames: Vec<RelayFrame> =
            relay_frames(refs(&[7]), stalled, Duration::from_secs(5))
                .collect()
                .await;

        assert_eq!(frames.len(), 2);
        match &frames[1] {
            RelayFrame::StreamError(message) => assert!(message.contains("timed out")),
            other => panic!("expected a timeout error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sse_mapping_is_infallible_and_one_to_one() {
        let frames = relay_frames(
            refs(&[1]),
            completion_of(vec![Ok("hi".into())]),
            IDLE_TIMEOUT,
        );
        let events: Vec<Result<Event, Infallible>> = into_sse(frames).collect().await;
        // citations + delta + done
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.is_ok()));
    }

    #[tokio::test]
    async fn test_error_and_done_frames_map_to_their_wire_events() {
        use axum::body::to_bytes;
        use axum::response::sse::Sse;
        use axum::response::IntoResponse;

        let frames = stream::iter(vec![
            RelayFrame::StreamError("connection reset".to_string()),
            RelayFrame::Done,
        ]);
        let response = Sse::new(into_sse(frames)).into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(
            text.contains("event: error\ndata: {\"message\":\"connection reset\"}"),
            "got: {text}"
        );
        assert!(text.contains("event: done\ndata: {}"), "got: {text}");
    }
}
