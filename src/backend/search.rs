use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{BackendConfig, RetrievalConfig};
use crate::models::{DocumentMetadata, RetrievedDocument};

/// Wire parameters of the backend's `hybrid_search` SQL function.
/// Ranking (reciprocal-rank fusion over full-text and semantic scores)
/// happens entirely inside the database; this client only passes the
/// weights through.
#[derive(Serialize)]
struct HybridSearchParams<'a> {
    query_text: &'a str,
    query_embedding: &'a [f32],
    match_count: usize,
    full_text_weight: f32,
    semantic_weight: f32,
    rrf_k: u32,
}

#[derive(Deserialize)]
struct DocumentRow {
    id: i64,
    content: String,
    metadata: DocumentMetadata,
}

/// Run the hybrid full-text + semantic search for one query.
/// Returned documents keep the function's ranking order and carry
/// 1-based ranks.
pub async fn hybrid_search(
    client: &reqwest::Client,
    config: &BackendConfig,
    retrieval: &RetrievalConfig,
    query: &str,
    embedding: &[f32],
) -> Result<Vec<RetrievedDocument>> {
    let url = format!(
        "{}/rest/v1/rpc/hybrid_search",
        config.base_url.trim_end_matches('/')
    );

    let params = HybridSearchParams {
        query_text: query,
        query_embedding: embedding,
        match_count: retrieval.top_k,
        full_text_weight: retrieval.full_text_weight,
        semantic_weight: retrieval.semantic_weight,
        rrf_k: retrieval.rrf_k,
    };

    let resp = client
        .post(&url)
        .header("apikey", &config.service_key)
        .header("Authorization", format!("Bearer {}", config.service_key))
        .json(&params)
        .send()
        .await
        .context("Failed to call the hybrid search function")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Hybrid search returned {status}: {body}");
    }

    let rows: Vec<DocumentRow> = resp
        .json()
        .await
        .context("Failed to parse hybrid search response")?;

    Ok(rows_into_documents(rows, retrieval.top_k))
}

/// Assign 1-based ranks in arrival order and enforce the top-k bound.
/// The function's ordering is authoritative; nothing is re-sorted here.
fn rows_into_documents(rows: Vec<DocumentRow>, top_k: usize) -> Vec<RetrievedDocument> {
    rows.into_iter()
        .take(top_k)
        .enumerate()
        .map(|(i, row)| RetrievedDocument {
            id: row.id,
            content: row.content,
            metadata: row.metadata,
            rank: i + 1,
        })
        .collect()
}
