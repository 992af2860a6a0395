//! View selection and HTML rendering for the manager pages.
//!
//! Handlers turn a catalogue client outcome into a [`Page`]: either a
//! redirect or a [`View`] naming a template, a status and the model to render.
//! Selection only depends on its arguments, so it is tested without HTTP.

use axum::http::StatusCode;
use catalogue_core::{message, Locale, Product, ProductId, ProductPayload, PRODUCT_NOT_FOUND};

use crate::client::ClientError;

pub const LIST_TEMPLATE: &str = "catalogue/products/list";
pub const NEW_PRODUCT_TEMPLATE: &str = "catalogue/products/new_product";
pub const PRODUCT_TEMPLATE: &str = "catalogue/products/product";
pub const EDIT_TEMPLATE: &str = "catalogue/products/edit";
pub const LOGIN_TEMPLATE: &str = "login";
pub const NOT_FOUND_TEMPLATE: &str = "errors/404";
pub const FORBIDDEN_TEMPLATE: &str = "errors/403";
pub const UPSTREAM_TEMPLATE: &str = "errors/502";

/// Data a template renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Model {
    ProductList {
        products: Vec<Product>,
        filter: Option<String>,
    },
    NewProduct {
        payload: ProductPayload,
        errors: Vec<String>,
    },
    Product {
        product: Product,
    },
    EditProduct {
        product: Product,
        payload: Option<ProductPayload>,
        errors: Vec<String>,
    },
    Login {
        error: Option<String>,
    },
    Error {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub template: &'static str,
    pub status: StatusCode,
    pub model: Model,
}

impl View {
    fn ok(template: &'static str, model: Model) -> Self {
        Self {
            template,
            status: StatusCode::OK,
            model,
        }
    }
}

/// Result of a page handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Render(View),
    /// `303 See Other` to the given path.
    Redirect(String),
}

#[must_use]
pub fn product_path(id: ProductId) -> String {
    format!("/catalogue/products/{id}")
}

#[must_use]
pub fn list_view(products: Vec<Product>, filter: Option<String>) -> View {
    View::ok(LIST_TEMPLATE, Model::ProductList { products, filter })
}

#[must_use]
pub fn new_product_view() -> View {
    View::ok(
        NEW_PRODUCT_TEMPLATE,
        Model::NewProduct {
            payload: ProductPayload::default(),
            errors: Vec::new(),
        },
    )
}

#[must_use]
pub fn login_view(error: Option<String>) -> View {
    let status = if error.is_some() {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::OK
    };
    View {
        template: LOGIN_TEMPLATE,
        status,
        model: Model::Login { error },
    }
}

#[must_use]
pub fn not_found_view(locale: Locale) -> View {
    View {
        template: NOT_FOUND_TEMPLATE,
        status: StatusCode::NOT_FOUND,
        model: Model::Error {
            error: message(PRODUCT_NOT_FOUND, locale).to_owned(),
        },
    }
}

#[must_use]
pub fn forbidden_view(locale: Locale) -> View {
    View {
        template: FORBIDDEN_TEMPLATE,
        status: StatusCode::FORBIDDEN,
        model: Model::Error {
            error: message("errors.access_denied", locale).to_owned(),
        },
    }
}

/// Error page for client failures the pages cannot recover from. Logs the
/// cause.
#[must_use]
pub fn upstream_error_view(error: &ClientError, locale: Locale) -> View {
    tracing::error!(error = %error, "catalogue call failed");
    View {
        template: UPSTREAM_TEMPLATE,
        status: StatusCode::BAD_GATEWAY,
        model: Model::Error {
            error: message("errors.upstream.unavailable", locale).to_owned(),
        },
    }
}

/// Shared fallback: 404 page for `NotFound`, 502 page for the rest.
fn failure_view(error: &ClientError, locale: Locale) -> View {
    match error {
        ClientError::NotFound { .. } => not_found_view(locale),
        other => upstream_error_view(other, locale),
    }
}

#[must_use]
pub fn list_outcome(
    outcome: Result<Vec<Product>, ClientError>,
    filter: Option<String>,
    locale: Locale,
) -> View {
    match outcome {
        Ok(products) => list_view(products, filter),
        Err(e) => upstream_error_view(&e, locale),
    }
}

/// Product page or edit form for a fetched product.
#[must_use]
pub fn product_outcome(
    template: &'static str,
    outcome: Result<Product, ClientError>,
    locale: Locale,
) -> View {
    match outcome {
        Ok(product) if template == EDIT_TEMPLATE => View::ok(
            EDIT_TEMPLATE,
            Model::EditProduct {
                product,
                payload: None,
                errors: Vec::new(),
            },
        ),
        Ok(product) => View::ok(template, Model::Product { product }),
        Err(e) => failure_view(&e, locale),
    }
}

#[must_use]
pub fn create_outcome(
    outcome: Result<Product, ClientError>,
    payload: ProductPayload,
    locale: Locale,
) -> Page {
    match outcome {
        Ok(product) => Page::Redirect(product_path(product.id)),
        Err(ClientError::BadRequest { errors }) => Page::Render(View {
            template: NEW_PRODUCT_TEMPLATE,
            status: StatusCode::BAD_REQUEST,
            model: Model::NewProduct { payload, errors },
        }),
        Err(e) => Page::Render(upstream_error_view(&e, locale)),
    }
}

#[must_use]
pub fn update_outcome(
    product: Product,
    outcome: Result<(), ClientError>,
    payload: ProductPayload,
    locale: Locale,
) -> Page {
    match outcome {
        Ok(()) => Page::Redirect(product_path(product.id)),
        Err(ClientError::BadRequest { errors }) => Page::Render(View {
            template: EDIT_TEMPLATE,
            status: StatusCode::BAD_REQUEST,
            model: Model::EditProduct {
                product,
                payload: Some(payload),
                errors,
            },
        }),
        Err(e) => Page::Render(failure_view(&e, locale)),
    }
}

#[must_use]
pub fn delete_outcome(outcome: Result<(), ClientError>, locale: Locale) -> Page {
    match outcome {
        Ok(()) => Page::Redirect("/catalogue/products/list".to_owned()),
        Err(e) => Page::Render(failure_view(&e, locale)),
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Per-request values every page needs besides its model.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub locale: Locale,
    pub csrf_token: Option<&'a str>,
    pub username: Option<&'a str>,
}

/// Escape text for HTML element content and double-quoted attributes.
#[must_use]
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn csrf_field(ctx: &RenderContext<'_>) -> String {
    ctx.csrf_token.map_or_else(String::new, |token| {
        format!(
            r#"<input type="hidden" name="_csrf" value="{}">"#,
            escape(token)
        )
    })
}

fn error_list(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>", escape(e)))
        .collect();
    format!(r#"<div class="errors"><ul>{items}</ul></div>"#)
}

/// Escaped page label for the context's locale.
fn label(key: &str, ctx: &RenderContext<'_>) -> String {
    escape(message(key, ctx.locale))
}

fn product_form(
    action: &str,
    title: &str,
    details: &str,
    submit_key: &str,
    ctx: &RenderContext<'_>,
) -> String {
    format!(
        concat!(
            r#"<form method="post" action="{action}">"#,
            "{csrf}",
            r#"<label>{title_label} <input type="text" name="title" value="{title}"></label>"#,
            r#"<label>{details_label} <textarea name="details">{details}</textarea></label>"#,
            r#"<button type="submit">{submit}</button>"#,
            "</form>"
        ),
        action = escape(action),
        csrf = csrf_field(ctx),
        title_label = label("manager.products.form.title", ctx),
        title = escape(title),
        details_label = label("manager.products.form.details", ctx),
        details = escape(details),
        submit = label(submit_key, ctx),
    )
}

fn back_to_list(ctx: &RenderContext<'_>) -> String {
    format!(
        r#"<p><a href="/catalogue/products/list">{}</a></p>"#,
        label("manager.nav.back_to_list", ctx)
    )
}

/// Page title (unescaped) and body markup for `view`.
fn body_for(view: &View, ctx: &RenderContext<'_>) -> (String, String) {
    match &view.model {
        Model::ProductList { products, filter } => {
            let rows: String = products
                .iter()
                .map(|p| {
                    format!(
                        r#"<li><a href="{href}">{id}. {title}</a></li>"#,
                        href = product_path(p.id),
                        id = p.id,
                        title = escape(&p.title),
                    )
                })
                .collect();
            let heading = message("manager.products.list.title", ctx.locale);
            let body = format!(
                concat!(
                    "<h1>{heading}</h1>",
                    r#"<form method="get" action="/catalogue/products/list">"#,
                    r#"<input type="search" name="filter" value="{filter}">"#,
                    r#"<button type="submit">{search}</button></form>"#,
                    r#"<p><a href="/catalogue/products/create">{new}</a></p>"#,
                    "<ul>{rows}</ul>"
                ),
                heading = escape(heading),
                filter = escape(filter.as_deref().unwrap_or_default()),
                search = label("manager.products.list.search", ctx),
                new = label("manager.products.list.new", ctx),
                rows = rows,
            );
            (heading.to_owned(), body)
        }
        Model::NewProduct { payload, errors } => {
            let heading = message("manager.products.new.title", ctx.locale);
            let body = format!(
                "<h1>{}</h1>{}{}",
                escape(heading),
                error_list(errors),
                product_form(
                    "/catalogue/products/create",
                    payload.title.as_deref().unwrap_or_default(),
                    payload.details.as_deref().unwrap_or_default(),
                    "manager.products.form.create",
                    ctx,
                )
            );
            (heading.to_owned(), body)
        }
        Model::Product { product } => {
            let body = format!(
                concat!(
                    "<h1>{title}</h1>",
                    "<p>{details}</p>",
                    r#"<p><a href="{path}/edit">{edit}</a></p>"#,
                    r#"<form method="post" action="{path}/delete">{csrf}"#,
                    r#"<button type="submit">{delete}</button></form>"#,
                    "{back}"
                ),
                title = escape(&product.title),
                details = escape(product.details.as_deref().unwrap_or_default()),
                path = product_path(product.id),
                edit = label("manager.products.product.edit", ctx),
                csrf = csrf_field(ctx),
                delete = label("manager.products.product.delete", ctx),
                back = back_to_list(ctx),
            );
            (product.title.clone(), body)
        }
        Model::EditProduct {
            product,
            payload,
            errors,
        } => {
            let title = payload
                .as_ref()
                .and_then(|p| p.title.as_deref())
                .unwrap_or(product.title.as_str());
            let details = payload
                .as_ref()
                .map_or(product.details.as_deref(), |p| p.details.as_deref())
                .unwrap_or_default();
            let heading = format!(
                "{}: {}",
                message("manager.products.edit.title", ctx.locale),
                product.title
            );
            let body = format!(
                "<h1>{}</h1>{}{}",
                escape(&heading),
                error_list(errors),
                product_form(
                    &format!("{}/edit", product_path(product.id)),
                    title,
                    details,
                    "manager.products.form.save",
                    ctx,
                )
            );
            (heading, body)
        }
        Model::Login { error } => {
            let error = error
                .as_deref()
                .map(|e| format!(r#"<p class="error">{}</p>"#, escape(e)))
                .unwrap_or_default();
            let heading = message("manager.login.title", ctx.locale);
            let body = format!(
                concat!(
                    "<h1>{heading}</h1>{error}",
                    r#"<form method="post" action="/login">{csrf}"#,
                    r#"<label>{username} <input type="text" name="username"></label>"#,
                    r#"<label>{password} <input type="password" name="password"></label>"#,
                    r#"<button type="submit">{submit}</button></form>"#
                ),
                heading = escape(heading),
                error = error,
                csrf = csrf_field(ctx),
                username = label("manager.login.username", ctx),
                password = label("manager.login.password", ctx),
                submit = label("manager.login.submit", ctx),
            );
            (heading.to_owned(), body)
        }
        Model::Error { error } => {
            let body = format!(
                r#"<h1>{status}</h1><p class="error">{error}</p>{back}"#,
                status = view.status.as_u16(),
                error = escape(error),
                back = back_to_list(ctx),
            );
            (view.status.to_string(), body)
        }
    }
}

/// Render `view` to a complete HTML document.
#[must_use]
pub fn render(view: &View, ctx: &RenderContext<'_>) -> String {
    let (title, body) = body_for(view, ctx);
    let user = ctx.username.map_or_else(String::new, |name| {
        format!(
            r#"<nav>{name} <form method="post" action="/logout">{csrf}<button type="submit">{sign_out}</button></form></nav>"#,
            name = escape(name),
            csrf = csrf_field(ctx),
            sign_out = label("manager.nav.sign_out", ctx),
        )
    });
    format!(
        concat!(
            "<!DOCTYPE html>\n",
            r#"<html lang="{lang}"><head><meta charset="utf-8">"#,
            "<title>{title}</title></head>",
            r#"<body data-template="{template}">{user}{body}</body></html>"#
        ),
        lang = ctx.locale.as_str(),
        title = escape(&title),
        template = view.template,
        user = user,
        body = body,
    )
}
