mod products;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use catalogue_core::request_id::request_id;
use catalogue_core::{message, Locale, ManagerUser};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::client::CatalogueClient;
use crate::session::{
    authenticate, cookie_value, expired_login_csrf_cookie, expired_session_cookie,
    login_csrf_cookie, new_csrf_token, session_cookie, session_id, tokens_match, Session,
    SessionStore, LOGIN_CSRF_COOKIE, MANAGER_ROLE,
};
use crate::views::{forbidden_view, login_view, render, Page, RenderContext, View};

const LOGIN_PATH: &str = "/login";
const HOME_PATH: &str = "/catalogue/products/list";

#[derive(Clone)]
pub struct WebState {
    pub client: Arc<CatalogueClient>,
    pub sessions: SessionStore,
    pub users: Arc<[ManagerUser]>,
    pub default_locale: Locale,
}

impl WebState {
    #[must_use]
    pub fn new(
        client: CatalogueClient,
        users: Vec<ManagerUser>,
        default_locale: Locale,
        session_ttl: Duration,
    ) -> Self {
        Self {
            client: Arc::new(client),
            sessions: SessionStore::new(session_ttl),
            users: users.into(),
            default_locale,
        }
    }

    fn locale(&self, headers: &HeaderMap) -> Locale {
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .and_then(Locale::from_accept_language)
            .unwrap_or(self.default_locale)
    }
}

/// Turn a [`Page`] into a response: `303` for redirects, HTML otherwise.
pub(crate) fn respond(page: Page, locale: Locale, session: Option<&Session>) -> Response {
    match page {
        Page::Redirect(to) => Redirect::to(&to).into_response(),
        Page::Render(view) => render_view(&view, locale, session),
    }
}

fn render_view(view: &View, locale: Locale, session: Option<&Session>) -> Response {
    let ctx = RenderContext {
        locale,
        csrf_token: session.map(|s| s.csrf_token.as_str()),
        username: session.map(|s| s.username.as_str()),
    };
    (view.status, Html(render(view, &ctx))).into_response()
}

/// Login page carrying `csrf_token` in both the form and its cookie.
fn render_login(view: &View, locale: Locale, csrf_token: &str) -> Response {
    let ctx = RenderContext {
        locale,
        csrf_token: Some(csrf_token),
        username: None,
    };
    let mut res = (view.status, Html(render(view, &ctx))).into_response();
    if let Some(cookie) = login_csrf_cookie(csrf_token) {
        res.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    res
}

/// Middleware admitting only signed-in users with the `MANAGER` role.
///
/// Without a session the browser is sent to the login page; a session lacking
/// the role gets a 403 page.
pub async fn require_manager(State(state): State<WebState>, mut req: Request, next: Next) -> Response {
    let locale = state.locale(req.headers());
    let session = match session_id(req.headers()) {
        Some(id) => state.sessions.get(id).await,
        None => None,
    };

    let Some(session) = session else {
        return Redirect::to(LOGIN_PATH).into_response();
    };
    if !session.has_role(MANAGER_ROLE) {
        tracing::info!(username = %session.username, path = req.uri().path(), "access denied");
        return render_view(&forbidden_view(locale), locale, Some(&session));
    }

    req.extensions_mut().insert(session);
    next.run(req).await
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
    #[serde(rename = "_csrf")]
    csrf: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LogoutForm {
    #[serde(rename = "_csrf")]
    csrf: Option<String>,
}

async fn login_page(State(state): State<WebState>, headers: HeaderMap) -> Response {
    let token = cookie_value(&headers, LOGIN_CSRF_COOKIE).map_or_else(new_csrf_token, String::from);
    render_login(&login_view(None), state.locale(&headers), &token)
}

async fn login(
    State(state): State<WebState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let locale = state.locale(&headers);
    let Some(csrf_token) = cookie_value(&headers, LOGIN_CSRF_COOKIE)
        .filter(|token| tokens_match(token, form.csrf.as_deref()))
    else {
        tracing::warn!(username = %form.username, "sign-in without a valid login token");
        return render_view(&forbidden_view(locale), locale, None);
    };

    let users = Arc::clone(&state.users);
    let username = form.username.clone();
    let verified = tokio::task::spawn_blocking(move || {
        authenticate(&users, &form.username, &form.password).cloned()
    })
    .await;
    let user = match verified {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!(username = %username, "failed sign-in");
            let error = message("errors.login.invalid_credentials", locale).to_owned();
            return render_login(&login_view(Some(error)), locale, csrf_token);
        }
        Err(e) => {
            tracing::error!(error = %e, "password check did not complete");
            let error = message("errors.internal", locale).to_owned();
            return render_login(&login_view(Some(error)), locale, csrf_token);
        }
    };

    let id = state.sessions.create(&user).await;
    tracing::info!(username = %user.username, "signed in");

    let mut res = Redirect::to(HOME_PATH).into_response();
    if let Some(cookie) = session_cookie(&id) {
        res.headers_mut().append(header::SET_COOKIE, cookie);
    }
    res.headers_mut()
        .append(header::SET_COOKIE, expired_login_csrf_cookie());
    res
}

async fn logout(
    State(state): State<WebState>,
    headers: HeaderMap,
    Form(form): Form<LogoutForm>,
) -> Response {
    let locale = state.locale(&headers);
    if let Some(id) = session_id(&headers) {
        if let Some(session) = state.sessions.get(id).await {
            if !session.csrf_matches(form.csrf.as_deref()) {
                return render_view(&forbidden_view(locale), locale, Some(&session));
            }
            state.sessions.remove(id).await;
            tracing::info!(username = %session.username, "signed out");
        }
    }

    let mut res = Redirect::to(LOGIN_PATH).into_response();
    res.headers_mut()
        .insert(header::SET_COOKIE, expired_session_cookie());
    res
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
}

async fn health() -> Json<HealthData> {
    Json(HealthData { status: "ok" })
}

fn protected_router(state: WebState) -> Router<WebState> {
    Router::new()
        .route("/catalogue/products/list", get(products::list_products))
        .route(
            "/catalogue/products/create",
            get(products::new_product_page).post(products::create_product),
        )
        .route("/catalogue/products/{product_id}", get(products::product_page))
        .route(
            "/catalogue/products/{product_id}/edit",
            get(products::edit_page).post(products::update_product),
        )
        .route(
            "/catalogue/products/{product_id}/delete",
            post(products::delete_product),
        )
        .layer(axum::middleware::from_fn_with_state(state, require_manager))
}

pub fn build_app(state: WebState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route(LOGIN_PATH, get(login_page).post(login))
        .route("/logout", post(logout));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
