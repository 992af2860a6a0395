use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use catalogue_core::{EndpointPermission, Locale};

use crate::api::{resolve_locale, ApiError};
use crate::auth::JwtVerifier;

/// Bearer JWT settings used by [`authorize`].
#[derive(Debug, Clone)]
pub struct AuthState {
    verifier: Arc<JwtVerifier>,
    default_locale: Locale,
}

impl AuthState {
    #[must_use]
    pub fn new(verifier: JwtVerifier, default_locale: Locale) -> Self {
        Self {
            verifier: Arc::new(verifier),
            default_locale,
        }
    }
}

/// Scope a request needs, or `None` when the route is denied to everyone.
///
/// Rules are checked in order: collection `POST` and item `PATCH`/`DELETE`
/// need `edit_catalogue`, any `GET` needs `view_catalogue`.
fn required_permission(method: &Method, path: &str) -> Option<EndpointPermission> {
    const COLLECTION: &str = "/catalogue-api/products";

    let item_id = path
        .strip_prefix(COLLECTION)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()));

    if *method == Method::POST && path == COLLECTION {
        return Some(EndpointPermission::EditCatalogue);
    }
    if (*method == Method::PATCH || *method == Method::DELETE) && item_id.is_some() {
        return Some(EndpointPermission::EditCatalogue);
    }
    if *method == Method::GET {
        return Some(EndpointPermission::ViewCatalogue);
    }
    None
}

/// Middleware enforcing bearer JWT authentication and per-route scopes.
///
/// Missing or invalid tokens get 401; authenticated callers without the
/// needed scope, or on a denied route, get 403.
pub async fn authorize(State(auth): State<AuthState>, mut req: Request, next: Next) -> Response {
    let locale = resolve_locale(req.headers(), auth.default_locale);

    let Some(token) = extract_bearer_token(req.headers().get(AUTHORIZATION)) else {
        return ApiError::unauthorized(locale).into_response();
    };

    let principal = match auth.verifier.verify(token) {
        Ok(principal) => principal,
        Err(e) => {
            tracing::debug!(error = %e, "rejected bearer token");
            return ApiError::unauthorized(locale).into_response();
        }
    };

    let allowed = required_permission(req.method(), req.uri().path())
        .is_some_and(|permission| principal.has(permission));
    if !allowed {
        tracing::info!(
            method = %req.method(),
            path = req.uri().path(),
            subject = principal.display_subject(),
            "access denied"
        );
        return ApiError::forbidden(locale).into_response();
    }

    req.extensions_mut().insert(principal);
    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    #[test]
    fn writes_need_edit_scope() {
        assert_eq!(
            required_permission(&Method::POST, "/catalogue-api/products"),
            Some(EndpointPermission::EditCatalogue)
        );
        assert_eq!(
            required_permission(&Method::PATCH, "/catalogue-api/products/12"),
            Some(EndpointPermission::EditCatalogue)
        );
        assert_eq!(
            required_permission(&Method::DELETE, "/catalogue-api/products/1"),
            Some(EndpointPermission::EditCatalogue)
        );
    }

    #[test]
    fn reads_need_view_scope() {
        assert_eq!(
            required_permission(&Method::GET, "/catalogue-api/products"),
            Some(EndpointPermission::ViewCatalogue)
        );
        assert_eq!(
            required_permission(&Method::GET, "/catalogue-api/products/7"),
            Some(EndpointPermission::ViewCatalogue)
        );
    }

    #[test]
    fn unmatched_routes_are_denied() {
        assert_eq!(
            required_permission(&Method::PUT, "/catalogue-api/products/1"),
            None
        );
        assert_eq!(
            required_permission(&Method::POST, "/catalogue-api/products/1"),
            None
        );
        assert_eq!(
            required_permission(&Method::DELETE, "/catalogue-api/products"),
            None
        );
        assert_eq!(
            required_permission(&Method::PATCH, "/catalogue-api/products/abc"),
            None
        );
    }
}
