use anyhow::{Context, Result};
use reqwest::StatusCode;

use crate::config::BackendConfig;
use crate::models::AuthUser;

/// Verify a caller's session token against the identity service and
/// return the authenticated user. Fails for absent, expired or forged
/// tokens; no other pipeline stage runs until this has passed.
pub async fn verify_user(
    client: &reqwest::Client,
    config: &BackendConfig,
    jwt: &str,
) -> Result<AuthUser> {
    if jwt.trim().is_empty() {
        anyhow::bail!("No session token supplied");
    }

    let url = format!("{}/auth/v1/user", config.base_url.trim_end_matches('/'));

    let resp = client
        .get(&url)
        .header("apikey", &config.service_key)
        .header("Authorization", format!("Bearer {jwt}"))
        .send()
        .await
        .context("Failed to reach the identity service")?;

    if resp.status() == StatusCode::UNAUTHORIZED || resp.status() == StatusCode::FORBIDDEN {
        anyhow::bail!("Session token rejected");
    }
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Identity service returned {status}: {body}");
    }

    resp.json::<AuthUser>()
        .await
        .context("Failed to parse identity response")
}
