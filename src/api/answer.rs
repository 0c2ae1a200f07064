use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures_util::stream::Stream;

use crate::backend;
use crate::error::PipelineError;
use crate::llm;
use crate::models::{AnswerRequest, CitationRecord, DocumentRef};
use crate::prompt::{self, PromptTemplate};
use crate::query::extract_retrieval_query;
use crate::relay;
use crate::state::AppState;

/// Upper bounds on the inbound transcript. Oversized requests are
/// rejected, never silently truncated: a clipped transcript would change
/// the retrieval query behind the caller's back.
const MAX_TRANSCRIPT_TURNS: usize = 64;
const MAX_TURN_CHARS: usize = 8_192;

/// POST /api/answer — retrieval-augmented answer with SSE streaming.
///
/// Stages run strictly in order and any failure before the completion
/// stream opens aborts the whole request as JSON (no SSE bytes). Once
/// streaming starts, failures travel in-band as a terminal `error` event.
pub async fn answer(
    State(state): State<AppState>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, PipelineError> {
    // ── Step 1: Validate the request body ─────────────────
    let Json(req) = payload.map_err(|e| PipelineError::Validation(e.body_text()))?;
    validate_transcript(&req)?;

    // ── Step 2: Authenticate the caller ───────────────────
    let user = backend::auth::verify_user(&state.http, &state.config.backend, &req.jwt)
        .await
        .map_err(PipelineError::Auth)?;
    tracing::info!(
        user = %user.id,
        chat = %req.chat_id,
        turns = req.user_query.len(),
        "answer request accepted"
    );

    // ── Step 3: Derive the retrieval query ────────────────
    let retrieval_query = extract_retrieval_query(&req.user_query)?;

    // ── Step 4: Embed and search ──────────────────────────
    let embedding = llm::embeddings::embed_query(&state.http, &state.config.llm, &retrieval_query)
        .await
        .map_err(PipelineError::Retrieval)?;

    let documents = backend::search::hybrid_search(
        &state.http,
        &state.config.backend,
        &state.config.retrieval,
        &retrieval_query,
        &embedding,
    )
    .await
    .map_err(PipelineError::Retrieval)?;
    tracing::info!(
        documents = documents.len(),
        query_chars = retrieval_query.len(),
        "retrieval complete"
    );

    // ── Step 5: Assemble the prompt ───────────────────────
    let template = PromptTemplate::new(state.config.prompt_template.clone());
    let system_prompt = template.render(&documents, None);
    let messages = prompt::build_messages(system_prompt, &req.user_query);

    // ── Step 6: Open the completion stream ────────────────
    let completion =
        llm::chat_stream::stream_chat(&state.http, &state.config.llm, &state.config.decoding, messages)
            .await
            .map_err(PipelineError::Completion)?;

    // ── Step 7: Record citations off the hot path ─────────
    // The answer does not wait on this write, and a failed write only
    // logs: the caller still gets their stream.
    let record = CitationRecord::from_documents(req.chat_id, &documents);
    let persist = state.clone();
    tokio::spawn(async move {
        match backend::chats::record_citations(&persist.http, &persist.config.backend, &record).await
        {
            Ok(()) => tracing::info!(
                chat = %record.chat_id,
                documents = record.document_ids.len(),
                "citations recorded"
            ),
            Err(e) => tracing::warn!(
                chat = %record.chat_id,
                error = %PipelineError::Persistence(e),
                "citation write failed"
            ),
        }
    });

    // ── Step 8: Relay citations, then deltas ──────────────
    let citations: Vec<DocumentRef> = documents.iter().map(DocumentRef::from).collect();
    let frames = relay::relay_frames(citations, completion, relay::IDLE_TIMEOUT);
    Ok(Sse::new(relay::into_sse(frames)))
}

fn validate_transcript(req: &AnswerRequest) -> Result<(), PipelineError> {
    if req.user_query.len() > MAX_TRANSCRIPT_TURNS {
        return Err(PipelineError::Validation(format!(
            "transcript has {} turns, the maximum is {MAX_TRANSCRIPT_TURNS}",
            req.user_query.len()
        )));
    }
    if let Some(turn) = req
        .user_query
        .iter()
        .find(|t| t.content.len() > MAX_TURN_CHARS)
    {
        return Err(PipelineError::Validation(format!(
            "a {} turn exceeds {MAX_TURN_CHARS} bytes",
            turn.role.as_str()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatTurn, Role};
    use uuid::Uuid;

    fn request_with(turns: Vec<ChatTurn>) -> AnswerRequest {
        AnswerRequest {
            user_query: turns,
            jwt: "token".into(),
            chat_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_normal_transcript_passes_validation() {
        let req = request_with(vec![
            ChatTurn::new(Role::User, "my child has a fever"),
            ChatTurn::new(Role::Assistant, "How high is it?"),
        ]);
        assert!(validate_transcript(&req).is_ok());
    }

    #[test]
    fn test_empty_transcript_passes_validation() {
        // Emptiness is a query-extraction error, reported after auth.
        let req = request_with(Vec::new());
        assert!(validate_transcript(&req).is_ok());
    }

    #[test]
    fn test_too_many_turns_rejected() {
        let turns = (0..MAX_TRANSCRIPT_TURNS + 1)
            .map(|_| ChatTurn::new(Role::User, "hi"))
            .collect();
        let err = validate_transcript(&request_with(turns)).unwrap_err();
        assert!(err.to_string().contains("turns"));
    }

    #[test]
    fn test_oversized_turn_rejected() {
        let req = request_with(vec![ChatTurn::new(Role::User, "a".repeat(MAX_TURN_CHARS + 1))]);
        let err = validate_transcript(&req).unwrap_err();
        assert!(err.to_string().contains("user turn"));
    }
}
