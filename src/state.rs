use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;

/// Shared application state. Immutable after startup: request handling
/// never takes a lock.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        Ok(Self {
            config: Arc::new(config),
            // The 120s ceiling covers the non-streaming calls; the
            // completion request overrides it per-request.
            http: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(120))
                .build()?,
        })
    }
}
