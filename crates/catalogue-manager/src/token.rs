//! Bearer tokens for calls to the catalogue service.
//!
//! Either a fixed token from configuration or an OAuth2 client-credentials
//! grant. Granted tokens are cached and fetched again shortly before
//! `expires_in` runs out.

use std::time::{Duration, Instant};

use catalogue_core::{CatalogueAuth, ClientCredentials};
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::client::ClientError;

/// Tokens are refreshed this long before the server says they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(30);
/// Cache lifetime when the token response has no `expires_in`.
const DEFAULT_LIFETIME: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug)]
struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

pub(crate) enum TokenSource {
    Static(String),
    ClientCredentials {
        token_url: Url,
        credentials: ClientCredentials,
        cached: Mutex<Option<CachedToken>>,
    },
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSource::Static(_) => f.write_str("Static([redacted])"),
            TokenSource::ClientCredentials { credentials, .. } => f
                .debug_struct("ClientCredentials")
                .field("credentials", credentials)
                .finish_non_exhaustive(),
        }
    }
}

impl TokenSource {
    pub(crate) fn from_auth(auth: &CatalogueAuth) -> Result<Self, ClientError> {
        match auth {
            CatalogueAuth::Token(token) => Ok(TokenSource::Static(token.clone())),
            CatalogueAuth::ClientCredentials(credentials) => {
                let token_url =
                    Url::parse(&credentials.token_url).map_err(|e| ClientError::InvalidBaseUrl {
                        url: credentials.token_url.clone(),
                        reason: e.to_string(),
                    })?;
                Ok(TokenSource::ClientCredentials {
                    token_url,
                    credentials: credentials.clone(),
                    cached: Mutex::new(None),
                })
            }
        }
    }

    /// Current access token, fetching a new one when the cache is empty or
    /// about to expire.
    pub(crate) async fn bearer(&self, client: &Client) -> Result<String, ClientError> {
        let (token_url, credentials, cached) = match self {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::ClientCredentials {
                token_url,
                credentials,
                cached,
            } => (token_url, credentials, cached),
        };

        // Held across the fetch so concurrent callers wait for one grant.
        let mut cached = cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(token.access_token.clone());
        }

        let token = request_token(client, token_url, credentials).await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }
}

async fn request_token(
    client: &Client,
    token_url: &Url,
    credentials: &ClientCredentials,
) -> Result<CachedToken, ClientError> {
    let mut form = vec![("grant_type", "client_credentials")];
    if let Some(scope) = credentials.scope.as_deref() {
        form.push(("scope", scope));
    }

    let requested_at = Instant::now();
    let response = client
        .post(token_url.clone())
        .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
        .form(&form)
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::UnexpectedStatus {
            status: status.as_u16(),
            url: token_url.to_string(),
        });
    }

    let body = response.text().await?;
    let token: TokenResponse =
        serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
            context: format!("token response from {token_url}"),
            source: e,
        })?;

    let lifetime = token
        .expires_in
        .map_or(DEFAULT_LIFETIME, Duration::from_secs);
    tracing::debug!(
        expires_in_secs = lifetime.as_secs(),
        "obtained catalogue access token"
    );
    Ok(CachedToken {
        access_token: token.access_token,
        refresh_at: requested_at + lifetime.saturating_sub(REFRESH_MARGIN),
    })
}
