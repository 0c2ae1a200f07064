use anyhow::{Context, Result};
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::models::CitationRecord;

/// Write the cited document ids onto the chat row.
/// Runs after the answer has started streaming, so callers log failures
/// instead of surfacing them; a lost citation must never cost the caller
/// their answer.
pub async fn record_citations(
    client: &reqwest::Client,
    config: &BackendConfig,
    record: &CitationRecord,
) -> Result<()> {
    let url = chat_row_url(&config.base_url, record.chat_id);

    let resp = client
        .patch(&url)
        .header("apikey", &config.service_key)
        .header("Authorization", format!("Bearer {}", config.service_key))
        .header("Prefer", "return=minimal")
        .json(&serde_json::json!({ "documents": record.document_ids }))
        .send()
        .await
        .context("Failed to reach the chats store")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Citation write returned {status}: {body}");
    }
    Ok(())
}

/// Row-filtered PATCH target: `id=eq.<uuid>` updates exactly one chat.
fn chat_row_url(base_url: &str, chat_id: Uuid) -> String {
    format!(
        "{}/rest/v1/chats?id=eq.{chat_id}",
        base_url.trim_end_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_row_url_filters_on_the_chat_id() {
        let id: Uuid = "8e2f0a49-1a52-4f9e-92a5-5be25f1f38bd".parse().unwrap();
        assert_eq!(
            chat_row_url("http://backend.test", id),
            "http://backend.test/rest/v1/chats?id=eq.8e2f0a49-1a52-4f9e-92a5-5be25f1f38bd"
        );
    }

    #[test]
    fn test_chat_row_url_tolerates_trailing_slash() {
        let id = Uuid::nil();
        assert_eq!(
            chat_row_url("http://backend.test/", id),
            chat_row_url("http://backend.test", id)
        );
    }
}
