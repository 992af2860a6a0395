//! Bearer JWT verification and scope-to-authority mapping.

use std::collections::HashSet;

use catalogue_core::EndpointPermission;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

/// `scope` is a space-separated string per RFC 8693; some issuers send an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScopeClaim {
    Joined(String),
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    scope: Option<ScopeClaim>,
    #[serde(default)]
    scp: Option<ScopeClaim>,
}

/// Authenticated caller, stored as a request extension.
#[derive(Debug, Clone)]
pub struct Principal {
    pub subject: Option<String>,
    authorities: HashSet<String>,
}

impl Principal {
    #[must_use]
    pub fn has(&self, permission: EndpointPermission) -> bool {
        self.authorities.contains(permission.authority())
    }

    /// Token subject for log lines, `-` when the token has none.
    #[must_use]
    pub fn display_subject(&self) -> &str {
        self.subject.as_deref().unwrap_or("-")
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        let scopes = claims.scope.or(claims.scp);
        let authorities = match scopes {
            Some(ScopeClaim::Joined(joined)) => joined
                .split_whitespace()
                .map(|s| format!("SCOPE_{s}"))
                .collect(),
            Some(ScopeClaim::List(list)) => list
                .iter()
                .map(|s| format!("SCOPE_{}", s.trim()))
                .collect(),
            None => HashSet::new(),
        };
        Self {
            subject: claims.sub,
            authorities,
        }
    }
}

/// Validates HS256 tokens issued by the configured authorization server.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("key", &"[redacted]")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtVerifier {
    #[must_use]
    pub fn new(secret: &str, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Decode and validate `token`, returning the caller's authorities.
    ///
    /// # Errors
    ///
    /// Returns the `jsonwebtoken` error for bad signatures, expired tokens,
    /// issuer mismatches and malformed tokens.
    pub fn verify(&self, token: &str) -> Result<Principal, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(Principal::from(data.claims))
    }
}
