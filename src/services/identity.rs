//! Identity provider client
//!
//! Exchanges a bearer token for a verified identity via the provider's
//! lookup-by-token endpoint. Token validation failures are terminal for the
//! request and are never retried here; transient provider failures surface
//! as a distinct error so the UI does not log users out over an outage.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::IdentityConfig;
use crate::models::Identity;
use crate::utils::error::AppError;

/// User payload returned by the identity provider
#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: Uuid,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Identity provider API client
#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl IdentityClient {
    /// Create a new identity client with the configured short timeout
    pub fn new(config: &IdentityConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .use_rustls_tls()
            .build()
            .context("Failed to create identity HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Verify a bearer token, returning the identity behind it.
    ///
    /// The caller has already rejected empty/garbled tokens; everything that
    /// reaches the provider and comes back 401/403 is `InvalidToken`, and
    /// every transport or server-side failure is `AuthServiceUnavailable`.
    pub async fn verify(&self, bearer_token: &str) -> Result<Identity, AppError> {
        let url = format!("{}/v1/user", self.base_url);

        let mut request = self.client.get(&url).bearer_auth(bearer_token);
        if let Some(ref api_key) = self.api_key {
            request = request.header("apikey", api_key.as_str());
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Identity provider request failed");
            AppError::AuthServiceUnavailable(if e.is_timeout() {
                "identity provider timed out".to_string()
            } else if e.is_connect() {
                "failed to connect to identity provider".to_string()
            } else {
                e.to_string()
            })
        })?;

        match response.status() {
            status if status.is_success() => {
                let user: ProviderUser = response.json().await.map_err(|e| {
                    warn!(error = %e, "Identity provider returned an unparseable user");
                    AppError::AuthServiceUnavailable("malformed identity response".to_string())
                })?;
                debug!(user_id = %user.id, "Token verified");
                Ok(Identity {
                    id: user.id,
                    email: user.email,
                    display_name: user.display_name,
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::InvalidToken),
            status => {
                warn!(%status, "Identity provider returned an unexpected status");
                Err(AppError::AuthServiceUnavailable(format!(
                    "identity provider returned {}",
                    status
                )))
            }
        }
    }
}
