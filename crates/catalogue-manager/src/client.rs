//! HTTP client for the catalogue REST API.
//!
//! Every call carries a bearer token, either fixed or obtained through a
//! client-credentials grant. Error statuses are mapped onto [`ClientError`]:
//! 400 bodies are parsed as problem details so the validation messages reach
//! the form, 404 becomes [`ClientError::NotFound`].

use std::time::Duration;

use catalogue_core::{CatalogueAuth, Locale, Product, ProductId, ProductPayload};
use reqwest::{header, Client, Response, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;

use crate::token::TokenSource;

/// Errors returned by [`CatalogueClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The catalogue rejected the payload; `errors` are already localized.
    #[error("catalogue rejected the request: {}", errors.join("; "))]
    BadRequest { errors: Vec<String> },

    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

#[derive(Debug, Deserialize)]
struct ProblemBody {
    #[serde(default)]
    errors: Option<Vec<String>>,
    #[serde(default)]
    detail: Option<String>,
}

/// Client for the catalogue service's `/catalogue-api/products` resource.
pub struct CatalogueClient {
    client: Client,
    base_url: Url,
    tokens: TokenSource,
}

impl std::fmt::Debug for CatalogueClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogueClient")
            .field("base_url", &self.base_url.as_str())
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl CatalogueClient {
    /// Creates a client rooted at `base_url` (the catalogue's origin) that
    /// sends a fixed bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`ClientError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        base_url: &str,
        token: &str,
        timeout_secs: u64,
    ) -> Result<Self, ClientError> {
        Self::with_auth(base_url, &CatalogueAuth::Token(token.to_owned()), timeout_secs)
    }

    /// Creates a client rooted at `base_url` that authenticates as `auth`
    /// describes.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`ClientError::InvalidBaseUrl`] if `base_url` or the token
    /// URL does not parse.
    pub fn with_auth(
        base_url: &str,
        auth: &CatalogueAuth,
        timeout_secs: u64,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("catalogue-manager/0.1")
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ClientError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            tokens: TokenSource::from_auth(auth)?,
        })
    }

    /// Lists products, optionally filtered by a title substring.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] other than `BadRequest`/`NotFound` on a healthy
    /// catalogue.
    pub async fn find_all_products(
        &self,
        filter: Option<&str>,
    ) -> Result<Vec<Product>, ClientError> {
        let mut url = self.url("catalogue-api/products")?;
        if let Some(filter) = filter {
            url.query_pairs_mut().append_pair("filter", filter);
        }
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(self.tokens.bearer(&self.client).await?)
            .send()
            .await?;
        let response = Self::check_status(response, &url).await?;
        Self::parse_json(response, &url).await
    }

    /// Fetches one product.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotFound`] when the id does not exist.
    pub async fn find_product(&self, id: ProductId) -> Result<Product, ClientError> {
        let url = self.url(&format!("catalogue-api/products/{id}"))?;
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(self.tokens.bearer(&self.client).await?)
            .send()
            .await?;
        let response = Self::check_status(response, &url).await?;
        Self::parse_json(response, &url).await
    }

    /// Creates a product; validation messages come back in `locale`.
    ///
    /// # Errors
    ///
    /// [`ClientError::BadRequest`] carrying the localized violations.
    pub async fn create_product(
        &self,
        payload: &ProductPayload,
        locale: Locale,
    ) -> Result<Product, ClientError> {
        let url = self.url("catalogue-api/products")?;
        let response = self
            .client
            .post(url.clone())
            .bearer_auth(self.tokens.bearer(&self.client).await?)
            .header(header::ACCEPT_LANGUAGE, locale.as_str())
            .json(payload)
            .send()
            .await?;
        let response = Self::check_status(response, &url).await?;
        Self::parse_json(response, &url).await
    }

    /// Replaces a product's title and details.
    ///
    /// # Errors
    ///
    /// [`ClientError::BadRequest`] on validation failure,
    /// [`ClientError::NotFound`] when the id does not exist.
    pub async fn update_product(
        &self,
        id: ProductId,
        payload: &ProductPayload,
        locale: Locale,
    ) -> Result<(), ClientError> {
        let url = self.url(&format!("catalogue-api/products/{id}"))?;
        let response = self
            .client
            .patch(url.clone())
            .bearer_auth(self.tokens.bearer(&self.client).await?)
            .header(header::ACCEPT_LANGUAGE, locale.as_str())
            .json(payload)
            .send()
            .await?;
        Self::check_status(response, &url).await?;
        Ok(())
    }

    /// Deletes a product.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotFound`] when the id does not exist.
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ClientError> {
        let url = self.url(&format!("catalogue-api/products/{id}"))?;
        let response = self
            .client
            .delete(url.clone())
            .bearer_auth(self.tokens.bearer(&self.client).await?)
            .send()
            .await?;
        Self::check_status(response, &url).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Maps non-2xx statuses onto [`ClientError`] variants.
    async fn check_status(response: Response, url: &Url) -> Result<Response, ClientError> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound {
                url: url.to_string(),
            }),
            StatusCode::BAD_REQUEST => {
                let body = response.text().await?;
                let problem: ProblemBody =
                    serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
                        context: format!("problem details from {url}"),
                        source: e,
                    })?;
                let errors = problem
                    .errors
                    .or_else(|| problem.detail.map(|d| vec![d]))
                    .unwrap_or_default();
                Err(ClientError::BadRequest { errors })
            }
            status => Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    async fn parse_json<T: serde::de::DeserializeOwned>(
        response: Response,
        url: &Url,
    ) -> Result<T, ClientError> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }
}
