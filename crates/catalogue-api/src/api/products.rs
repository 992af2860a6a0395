use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use catalogue_core::request_id::RequestId;
use catalogue_core::{PayloadKind, Product, ProductId, ProductPayload};
use serde::Deserialize;

use super::{ApiError, AppState, RequestLocale};
use crate::auth::Principal;
use crate::service::Actor;

const COLLECTION_PATH: &str = "/catalogue-api/products";

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    pub filter: Option<String>,
}

pub(super) async fn list_products(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::malformed(locale, &e.body_text()))?;
    let products = state
        .products
        .find_all(query.filter.as_deref())
        .await
        .map_err(|e| ApiError::from_service(e, locale))?;
    Ok(Json(products))
}

pub(super) async fn get_product(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    id: Result<Path<ProductId>, PathRejection>,
) -> Result<Json<Product>, ApiError> {
    let Path(id) = id.map_err(|_| ApiError::not_found(locale))?;
    let product = state
        .products
        .find(id)
        .await
        .map_err(|e| ApiError::from_service(e, locale))?;
    Ok(Json(product))
}

pub(super) async fn create_product(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Extension(principal): Extension<Principal>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    payload: Result<Json<ProductPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::malformed(locale, &e.body_text()))?;
    let valid = payload
        .validate(PayloadKind::Create)
        .map_err(|violations| ApiError::validation(&violations, locale))?;

    let product = state
        .products
        .create(valid, actor(&principal, &req_id))
        .await
        .map_err(|e| ApiError::from_service(e, locale))?;

    let mut res = (StatusCode::CREATED, Json(&product)).into_response();
    if let Ok(location) = HeaderValue::from_str(&location_for(&headers, product.id)) {
        res.headers_mut().insert(header::LOCATION, location);
    }
    Ok(res)
}

pub(super) async fn update_product(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Extension(principal): Extension<Principal>,
    Extension(req_id): Extension<RequestId>,
    id: Result<Path<ProductId>, PathRejection>,
    payload: Result<Json<ProductPayload>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id.map_err(|_| ApiError::not_found(locale))?;
    let Json(payload) = payload.map_err(|e| ApiError::malformed(locale, &e.body_text()))?;
    let valid = payload
        .validate(PayloadKind::Update)
        .map_err(|violations| ApiError::validation(&violations, locale))?;

    state
        .products
        .update(id, valid, actor(&principal, &req_id))
        .await
        .map_err(|e| ApiError::from_service(e, locale))?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn delete_product(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Extension(principal): Extension<Principal>,
    Extension(req_id): Extension<RequestId>,
    id: Result<Path<ProductId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id.map_err(|_| ApiError::not_found(locale))?;
    state
        .products
        .delete(id, actor(&principal, &req_id))
        .await
        .map_err(|e| ApiError::from_service(e, locale))?;
    Ok(StatusCode::NO_CONTENT)
}

fn actor<'a>(principal: &'a Principal, req_id: &'a RequestId) -> Actor<'a> {
    Actor {
        subject: principal.display_subject(),
        request_id: &req_id.0,
    }
}

/// Absolute URL of a created product built from the request's `Host`
/// (and `X-Forwarded-Proto`), or a path when the host is unknown.
fn location_for(headers: &HeaderMap, id: ProductId) -> String {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    match header_str(header::HOST.as_str()) {
        Some(host) => {
            let scheme = header_str("x-forwarded-proto").unwrap_or("http");
            format!("{scheme}://{host}{COLLECTION_PATH}/{id}")
        }
        None => format!("{COLLECTION_PATH}/{id}"),
    }
}
