use anyhow::{Context, Result};
use futures_util::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;

use crate::config::{DecodingConfig, LlmConfig};
use crate::models::ChatTurn;

/// Stream of content deltas (one per token/chunk) from the completion API.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Open a streaming chat completion and return the delta stream.
/// The request itself is lazy: nothing is sent to the completion API
/// until this is called, and dropping the returned stream cancels the
/// in-flight generation.
pub async fn stream_chat(
    client: &reqwest::Client,
    config: &LlmConfig,
    decoding: &DecodingConfig,
    messages: Vec<ChatTurn>,
) -> Result<CompletionStream> {
    let url = format!("{}/v1/chat/completions", config.base_url.trim_end_matches('/'));

    let req = ChatStreamRequest {
        model: &config.chat_model,
        messages,
        temperature: decoding.temperature,
        top_p: decoding.top_p,
        max_tokens: decoding.max_tokens,
        random_seed: decoding.random_seed,
        safe_prompt: decoding.safe_prompt,
        stream: true,
    };

    let resp = client
        .post(&url)
        .timeout(Duration::from_secs(300))
        .header("Authorization", format!("Bearer {}", config.api_key))
        .json(&req)
        .send()
        .await
        .context("Failed to connect to the chat completions API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Chat completions API returned {status}: {body}");
    }

    let stream = stream_lines(resp.bytes_stream()).filter_map(|line_result| async move {
        match line_result {
            Ok(line) => parse_stream_line(&line),
            Err(e) => Some(Err(e)),
        }
    });

    Ok(Box::pin(stream))
}

#[derive(Serialize)]
struct ChatStreamRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    random_seed: u64,
    safe_prompt: bool,
    stream: bool,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Parse a single SSE line from the completion stream. Returns:
/// - Some(Ok(content)) for content deltas
/// - Some(Err(e)) for parse errors
/// - None to skip (empty lines, [DONE], role-only chunks)
fn parse_stream_line(line: &str) -> Option<Result<String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let data = if let Some(d) = line.strip_prefix("data: ") {
        d.trim()
    } else {
        return None;
    };

    if data == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => {
            let content = chunk
                .choices
                .first()
                .and_then(|c| c.delta.content.clone())
                .unwrap_or_default();
            if content.is_empty() {
                return None;
            }
            Some(Ok(content))
        }
        Err(e) => Some(Err(anyhow::anyhow!("Failed to parse completion chunk: {e}"))),
    }
}

// ─── Line buffering ──────────────────────────────────────

/// Convert a byte stream into a stream of complete lines. Chunk
/// boundaries from the network line up with neither SSE lines nor UTF-8
/// character boundaries, so the carry-over buffer holds raw bytes and
/// text conversion happens per complete line, never per chunk.
fn stream_lines(
    byte_stream: impl Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static,
) -> impl Stream<Item = Result<String>> + Send {
    futures_util::stream::unfold(
        (Box::pin(byte_stream), Vec::<u8>::new()),
        |(mut stream, mut buffer)| async move {
            loop {
                // First, try to extract a complete line from the buffer
                if let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let remainder = buffer.split_off(newline_pos + 1);
                    let line = String::from_utf8_lossy(&buffer[..newline_pos]).into_owned();
                    buffer = remainder;
                    if !line.trim().is_empty() {
                        return Some((Ok(line), (stream, buffer)));
                    }
                    continue;
                }

                // Buffer has no complete line — read more bytes
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        buffer.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        return Some((
                            Err(anyhow::anyhow!("Stream read error: {e}")),
                            (stream, buffer),
                        ));
                    }
                    None => {
                        // Stream ended — emit remaining buffer if non-empty
                        let remaining = String::from_utf8_lossy(&buffer).into_owned();
                        buffer.clear();
                        if !remaining.trim().is_empty() {
                            return Some((Ok(remaining), (stream, buffer)));
                        }
                        return None;
                    }
                }
            }
        },
    )
}
