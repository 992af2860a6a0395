mod products;

use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use catalogue_core::request_id::request_id;
use catalogue_core::{message, FieldViolation, Locale, PRODUCT_NOT_FOUND};
use serde::Serialize;
use std::convert::Infallible;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{authorize, AuthState};
use crate::service::{ProductService, ServiceError};

#[derive(Clone)]
pub struct AppState {
    pub products: ProductService,
    pub default_locale: Locale,
}

/// Locale negotiated from `Accept-Language`, falling back to the configured
/// default.
#[derive(Debug, Clone, Copy)]
pub struct RequestLocale(pub Locale);

pub(crate) fn resolve_locale(headers: &HeaderMap, default: Locale) -> Locale {
    headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(Locale::from_accept_language)
        .unwrap_or(default)
}

impl FromRequestParts<AppState> for RequestLocale {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve_locale(&parts.headers, state.default_locale)))
    }
}

/// RFC 7807 problem details body.
#[derive(Debug, Serialize)]
struct ProblemDetail {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'static str,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
}

/// Error responses of the catalogue API, already localized.
#[derive(Debug)]
pub enum ApiError {
    Validation(Vec<String>),
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Internal(String),
}

impl ApiError {
    pub fn validation(violations: &[FieldViolation], locale: Locale) -> Self {
        Self::Validation(
            violations
                .iter()
                .map(|v| message(&v.message_key, locale).to_owned())
                .collect(),
        )
    }

    pub fn not_found(locale: Locale) -> Self {
        Self::NotFound(message(PRODUCT_NOT_FOUND, locale).to_owned())
    }

    pub fn malformed(locale: Locale, cause: &str) -> Self {
        Self::BadRequest(format!(
            "{}: {cause}",
            message("errors.request.malformed", locale)
        ))
    }

    pub fn unauthorized(locale: Locale) -> Self {
        Self::Unauthorized(message("errors.access_denied", locale).to_owned())
    }

    pub fn forbidden(locale: Locale) -> Self {
        Self::Forbidden(message("errors.access_denied", locale).to_owned())
    }

    pub fn from_service(error: ServiceError, locale: Locale) -> Self {
        match error {
            ServiceError::NotFound(_) => Self::not_found(locale),
            ServiceError::Db(e) => {
                tracing::error!(error = %e, "database query failed");
                Self::Internal(message("errors.internal", locale).to_owned())
            }
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let unauthorized = matches!(self, Self::Unauthorized(_));
        let (detail, errors) = match self {
            Self::Validation(errors) => (None, Some(errors)),
            Self::NotFound(detail)
            | Self::BadRequest(detail)
            | Self::Unauthorized(detail)
            | Self::Forbidden(detail)
            | Self::Internal(detail) => (Some(detail), None),
        };
        let body = ProblemDetail {
            kind: "about:blank",
            title: status.canonical_reason().unwrap_or("Error"),
            status: status.as_u16(),
            detail,
            errors,
        };

        let mut res = (status, Json(body)).into_response();
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        if unauthorized {
            res.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        res
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT_LANGUAGE,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route(
            "/catalogue-api/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/catalogue-api/products/{product_id}",
            get(products::get_product)
                .patch(products::update_product)
                .delete(products::delete_product),
        )
        .layer(axum::middleware::from_fn_with_state(auth, authorize))
}

pub fn build_app(state: AppState, auth: AuthState) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.products.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthData {
                status: "ok",
                database: "ok",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthData {
                    status: "degraded",
                    database: "unavailable",
                }),
            )
        }
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
