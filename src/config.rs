use crate::error::PipelineError;
use crate::prompt;

#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// Comma-separated allowed CORS origins (unset = any origin)
    pub cors_origins: Option<String>,
    /// Auth + document storage backend
    pub backend: BackendConfig,
    /// Embedding and completion provider
    pub llm: LlmConfig,
    /// Hybrid-search knobs, passed through to the backend verbatim
    pub retrieval: RetrievalConfig,
    /// Decoding parameters for completion requests
    pub decoding: DecodingConfig,
    /// System-prompt template with `{documents}` and `{history}` slots
    pub prompt_template: String,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the backend (identity, search function, chat rows)
    pub base_url: String,
    /// Service key sent as `apikey` and bearer token on backend calls
    pub service_key: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL for the embeddings + chat completions API
    pub base_url: String,
    pub api_key: String,
    pub chat_model: String,
    pub embedding_model: String,
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// How many documents the search function may return
    pub top_k: usize,
    pub full_text_weight: f32,
    pub semantic_weight: f32,
    /// Smoothing constant for the backend's reciprocal-rank fusion
    pub rrf_k: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 6,
            full_text_weight: 1.0,
            semantic_weight: 1.0,
            rrf_k: 50,
        }
    }
}

/// Near-greedy decoding with a pinned seed: answers should track the
/// documents, not the sampler.
#[derive(Debug, Clone)]
pub struct DecodingConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub random_seed: u64,
    pub safe_prompt: bool,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.001,
            top_p: 0.1,
            max_tokens: 1024,
            random_seed: 1337,
            safe_prompt: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; `from_env` passes the process
    /// environment. Missing required values fail here, before the server
    /// binds or any request is accepted.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = BackendConfig {
            base_url: require(&lookup, "BACKEND_URL")?,
            service_key: require(&lookup, "BACKEND_SERVICE_KEY")?,
        };

        let llm = LlmConfig {
            base_url: lookup("LLM_BASE_URL")
                .unwrap_or_else(|| "https://api.mistral.ai".to_string()),
            api_key: require(&lookup, "LLM_API_KEY")?,
            chat_model: lookup("LLM_CHAT_MODEL")
                .unwrap_or_else(|| "open-mixtral-8x7b".to_string()),
            embedding_model: lookup("LLM_EMBEDDING_MODEL")
                .unwrap_or_else(|| "mistral-embed".to_string()),
        };

        let mut retrieval = RetrievalConfig::default();
        if let Some(v) = parse(&lookup, "RETRIEVAL_TOP_K") {
            retrieval.top_k = v;
        }
        if let Some(v) = parse(&lookup, "RETRIEVAL_FULL_TEXT_WEIGHT") {
            retrieval.full_text_weight = v;
        }
        if let Some(v) = parse(&lookup, "RETRIEVAL_SEMANTIC_WEIGHT") {
            retrieval.semantic_weight = v;
        }
        if let Some(v) = parse(&lookup, "RETRIEVAL_RRF_K") {
            retrieval.rrf_k = v;
        }

        let mut decoding = DecodingConfig::default();
        if let Some(v) = parse(&lookup, "LLM_TEMPERATURE") {
            decoding.temperature = v;
        }
        if let Some(v) = parse(&lookup, "LLM_TOP_P") {
            decoding.top_p = v;
        }
        if let Some(v) = parse(&lookup, "LLM_MAX_TOKENS") {
            decoding.max_tokens = v;
        }
        if let Some(v) = parse(&lookup, "LLM_RANDOM_SEED") {
            decoding.random_seed = v;
        }
        if let Some(v) = lookup("LLM_SAFE_PROMPT") {
            decoding.safe_prompt = v == "1" || v.eq_ignore_ascii_case("true");
        }

        Ok(Self {
            bind_addr: lookup("DOC_ANSWER_BIND_ADDR")
                .unwrap_or_else(|| "127.0.0.1:8000".to_string()),
            cors_origins: lookup("DOC_ANSWER_CORS_ORIGINS"),
            backend,
            llm,
            retrieval,
            decoding,
            prompt_template: lookup("PROMPT_TEMPLATE").unwrap_or_else(prompt::default_template),
        })
    }
}

fn require<F>(lookup: &F, key: &str) -> Result<String, PipelineError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PipelineError::Config(format!("required environment value {key} is not set")))
}

fn parse<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.parse().ok())
}
