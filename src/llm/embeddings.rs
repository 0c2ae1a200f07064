use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

/// Maximum characters to send to the embedding API.
/// mistral-embed has an 8192-token context. Conversational prose
/// tokenises at roughly 1 token per 3-4 chars, so 8000 chars lands
/// around 2000-2700 tokens, well inside the window even for queries
/// stitched together from many turns.
const MAX_EMBED_CHARS: usize = 8_000;

/// Truncate `text` to at most `MAX_EMBED_CHARS`, splitting on a UTF-8 char boundary.
fn truncate_for_embedding(text: &str) -> &str {
    if text.len() <= MAX_EMBED_CHARS {
        return text;
    }
    // Find the last char boundary at or before the limit
    let mut end = MAX_EMBED_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

/// Embed the retrieval query with the configured embedding model.
pub async fn embed_query(
    client: &reqwest::Client,
    config: &LlmConfig,
    query: &str,
) -> Result<Vec<f32>> {
    let url = format!("{}/v1/embeddings", config.base_url.trim_end_matches('/'));

    let req = EmbedRequest {
        model: &config.embedding_model,
        input: vec![truncate_for_embedding(query)],
    };

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", config.api_key))
        .json(&req)
        .send()
        .await
        .context("Failed to call embeddings API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Embeddings API returned {status}: {body}");
    }

    let body: EmbedResponse = resp
        .json()
        .await
        .context("Failed to parse embeddings response")?;

    body.data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .context("Embeddings response contained no vectors")
}
