//! # doc-answer
//!
//! A retrieval-augmented answering backend. Callers POST a conversation
//! transcript; the service retrieves matching reference documents from a
//! hosted search backend, grounds an LLM completion on them, and streams
//! the answer back over SSE with the citations announced before the
//! first token.
//!
//! ## Pipeline
//!
//! Every request runs the same straight line, stage by stage:
//!
//! ```text
//!   ┌────────────┐      ┌───────────────┐      ┌──────────────────┐
//!   │ Transcript  │ ──▶ │ Session check │ ──▶  │ Query extraction │
//!   └────────────┘      │ (identity API)│      │ (user turns only)│
//!                       └───────────────┘      └────────┬─────────┘
//!                                                       │
//!                       ┌───────────────┐      ┌────────▼─────────┐
//!                       │ hybrid_search │ ◀──  │  Query embedding │
//!                       │ (SQL function)│      │  (embeddings API)│
//!                       └──────┬────────┘      └──────────────────┘
//!                              │ top-k documents, ranked
//!                              ▼
//!                       ┌───────────────┐      ┌──────────────────┐
//!                       │Prompt assembly│ ──▶  │ Chat completion  │
//!                       │ {documents}   │      │ (streamed)       │
//!                       └───────────────┘      └────────┬─────────┘
//!                                                       │ deltas
//!        caller ◀── SSE: citations, delta*, done ───────┤
//!                                                       ▼
//!                                              ┌──────────────────┐
//!                                              │ Citation write   │
//!                                              │ (chats row)      │
//!                                              └──────────────────┘
//! ```
//!
//! The `citations` event always precedes the first `delta`, so clients
//! can show sources while the answer is still being generated. The
//! citation write runs off the hot path: its failure is logged, never
//! streamed.
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration; required values fail at startup
//! - [`models`] - Shared data types: transcript turns, documents, citations
//! - [`error`] - The pipeline error taxonomy and its HTTP mapping
//! - [`query`] - Retrieval-query extraction from the transcript
//! - [`backend`] - Backend REST clients: identity, hybrid search, chat rows
//! - [`llm`] - Embeddings and streamed chat completions (OpenAI-compatible wire)
//! - [`prompt`] - Template rendering and outbound message assembly
//! - [`relay`] - Ordered frame stream (citations first) and its SSE mapping
//! - [`api`] - Axum router and the `/api/answer` handler
//! - [`state`] - Shared application state: config plus one HTTP client

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod query;
pub mod relay;
pub mod state;
