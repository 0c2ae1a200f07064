//! Retrieval-query extraction from the conversation transcript.

use thiserror::Error;

use crate::models::{ChatTurn, Role};

/// The transcript contains nothing to search for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid request: transcript contains no user content to search with")]
pub struct EmptyQueryError;

/// Derive the retrieval query from a transcript: the contents of every
/// user turn, in transcript order, joined with single spaces. Assistant
/// and system turns never leak into retrieval, and turn contents are not
/// trimmed or rewritten.
pub fn extract_retrieval_query(turns: &[ChatTurn]) -> Result<String, EmptyQueryError> {
    let query = turns
        .iter()
        .filter(|turn| turn.role == Role::User)
        .map(|turn| turn.content.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    if query.trim().is_empty() {
        return Err(EmptyQueryError);
    }
    Ok(query)
}
