//! Token resolution and validation against the identity service.

use keyring::Entry;
use std::env;

use crate::config::Settings;
use crate::{Error, Result};

/// Keyring service name under which a stored token is looked up.
pub const KEYRING_SERVICE: &str = "inference-client";
const KEYRING_USER: &str = "auth-token";
const ENV_AUTH_TOKEN: &str = "INFERENCE_AUTH_TOKEN";

/// Resolve and validate an auth token.
///
/// An explicit token is validated as-is; otherwise the OS keyring and the
/// `INFERENCE_AUTH_TOKEN` environment variable are consulted in that order.
/// Validation failures are never retried.
pub async fn login(token: Option<&str>, settings: &Settings) -> Result<String> {
    let token = match token {
        Some(token) => token.to_string(),
        None => stored_token().ok_or_else(|| {
            Error::auth(format!(
                "no auth token available; pass one explicitly, store one in the OS keyring \
                 (service `{KEYRING_SERVICE}`), or set {ENV_AUTH_TOKEN}"
            ))
        })?,
    };
    validate_token(&token, settings).await?;
    tracing::info!(token = %redact(&token), "token validated");
    Ok(token)
}

/// Look up a stored token: keyring first, then the environment.
fn stored_token() -> Option<String> {
    if let Ok(entry) = Entry::new(KEYRING_SERVICE, KEYRING_USER) {
        if let Ok(token) = entry.get_password() {
            return Some(token);
        }
    }
    env::var(ENV_AUTH_TOKEN).ok().filter(|t| !t.is_empty())
}

async fn validate_token(token: &str, settings: &Settings) -> Result<()> {
    let url = format!(
        "{}/token/validate",
        settings.api_endpoint.trim_end_matches('/')
    );
    let client = reqwest::Client::builder()
        .timeout(settings.http_timeout)
        .build()?;
    let response = client
        .get(&url)
        .header(reqwest::header::AUTHORIZATION, token)
        .send()
        .await?;
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(Error::auth(
            "invalid or expired auth token. Please re-enter your token and try again.",
        ));
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(Error::Remote {
            status: status.as_u16(),
            message,
        });
    }
    Ok(())
}

/// Keep only a short suffix of the token for logging.
fn redact(token: &str) -> String {
    let suffix: String = token
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("…{suffix}")
}
