use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    http::HeaderMap,
    response::Response,
    Extension, Form,
};
use catalogue_core::{ProductId, ProductPayload};
use serde::Deserialize;

use super::{respond, WebState};
use crate::session::Session;
use crate::views::{
    create_outcome, delete_outcome, forbidden_view, list_outcome, new_product_view,
    not_found_view, product_outcome, update_outcome, Page, EDIT_TEMPLATE, PRODUCT_TEMPLATE,
};

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    pub filter: Option<String>,
}

/// Submitted create/edit form.
#[derive(Debug, Deserialize)]
pub(super) struct ProductForm {
    pub title: Option<String>,
    pub details: Option<String>,
    #[serde(rename = "_csrf")]
    pub csrf: Option<String>,
}

impl ProductForm {
    /// An empty details box means "no details".
    fn into_payload(self) -> ProductPayload {
        ProductPayload {
            title: self.title,
            details: self.details.filter(|d| !d.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CsrfForm {
    #[serde(rename = "_csrf")]
    pub csrf: Option<String>,
}

pub(super) async fn list_products(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response {
    let locale = state.locale(&headers);
    let filter = query.filter.as_deref().filter(|f| !f.is_empty());
    let outcome = state.client.find_all_products(filter).await;
    let view = list_outcome(outcome, query.filter, locale);
    respond(Page::Render(view), locale, Some(&session))
}

pub(super) async fn new_product_page(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
) -> Response {
    let locale = state.locale(&headers);
    respond(Page::Render(new_product_view()), locale, Some(&session))
}

pub(super) async fn create_product(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Form(form): Form<ProductForm>,
) -> Response {
    let locale = state.locale(&headers);
    if !session.csrf_matches(form.csrf.as_deref()) {
        return respond(Page::Render(forbidden_view(locale)), locale, Some(&session));
    }

    let payload = form.into_payload();
    let outcome = state.client.create_product(&payload, locale).await;
    if let Ok(product) = &outcome {
        tracing::info!(product_id = product.id, username = %session.username, "product created");
    }
    respond(create_outcome(outcome, payload, locale), locale, Some(&session))
}

pub(super) async fn product_page(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    id: Result<Path<ProductId>, PathRejection>,
) -> Response {
    let locale = state.locale(&headers);
    let Ok(Path(id)) = id else {
        return respond(Page::Render(not_found_view(locale)), locale, Some(&session));
    };
    let outcome = state.client.find_product(id).await;
    respond(
        Page::Render(product_outcome(PRODUCT_TEMPLATE, outcome, locale)),
        locale,
        Some(&session),
    )
}

pub(super) async fn edit_page(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    id: Result<Path<ProductId>, PathRejection>,
) -> Response {
    let locale = state.locale(&headers);
    let Ok(Path(id)) = id else {
        return respond(Page::Render(not_found_view(locale)), locale, Some(&session));
    };
    let outcome = state.client.find_product(id).await;
    respond(
        Page::Render(product_outcome(EDIT_TEMPLATE, outcome, locale)),
        locale,
        Some(&session),
    )
}

/// Loads the product first so a rejected edit can re-render the form
/// around the current values.
pub(super) async fn update_product(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    id: Result<Path<ProductId>, PathRejection>,
    Form(form): Form<ProductForm>,
) -> Response {
    let locale = state.locale(&headers);
    if !session.csrf_matches(form.csrf.as_deref()) {
        return respond(Page::Render(forbidden_view(locale)), locale, Some(&session));
    }
    let Ok(Path(id)) = id else {
        return respond(Page::Render(not_found_view(locale)), locale, Some(&session));
    };

    let product = match state.client.find_product(id).await {
        Ok(product) => product,
        Err(e) => {
            let view = product_outcome(EDIT_TEMPLATE, Err(e), locale);
            return respond(Page::Render(view), locale, Some(&session));
        }
    };

    let payload = form.into_payload();
    let outcome = state.client.update_product(id, &payload, locale).await;
    if outcome.is_ok() {
        tracing::info!(product_id = id, username = %session.username, "product updated");
    }
    respond(
        update_outcome(product, outcome, payload, locale),
        locale,
        Some(&session),
    )
}

pub(super) async fn delete_product(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    id: Result<Path<ProductId>, PathRejection>,
    Form(form): Form<CsrfForm>,
) -> Response {
    let locale = state.locale(&headers);
    if !session.csrf_matches(form.csrf.as_deref()) {
        return respond(Page::Render(forbidden_view(locale)), locale, Some(&session));
    }
    let Ok(Path(id)) = id else {
        return respond(Page::Render(not_found_view(locale)), locale, Some(&session));
    };

    let outcome = state.client.delete_product(id).await;
    if outcome.is_ok() {
        tracing::info!(product_id = id, username = %session.username, "product deleted");
    }
    respond(delete_outcome(outcome, locale), locale, Some(&session))
}
