//! Clients for the hosted LLM API: query embeddings and streamed chat
//! completions over the OpenAI-compatible wire format (with the Mistral
//! decoding extensions).

pub mod chat_stream;
pub mod embeddings;
