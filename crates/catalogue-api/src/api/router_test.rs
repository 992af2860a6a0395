use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use catalogue_core::Locale;
use jsonwebtoken::get_current_timestamp;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::*;
use crate::auth::testing::{sign, token_with_scope, SECRET};
use crate::auth::JwtVerifier;
use crate::test_support::InMemoryProductRepository;

const SEEDED: [&str; 5] = [
    "Название товара 1",
    "Молоко",
    "Хлеб",
    "Название товара 4",
    "Название товара 5",
];

fn app_with(repo: Arc<InMemoryProductRepository>) -> Router {
    let state = AppState {
        products: ProductService::new(repo),
        default_locale: Locale::En,
    };
    let auth = AuthState::new(JwtVerifier::new(SECRET, None), Locale::En);
    build_app(state, auth)
}

fn seeded() -> Arc<InMemoryProductRepository> {
    Arc::new(InMemoryProductRepository::with_titles(&SEEDED))
}

fn request(method: &str, uri: &str, scope: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "localhost");
    if let Some(scope) = scope {
        builder = builder.header(
            header::AUTHORIZATION,
            format!("Bearer {}", token_with_scope(scope)),
        );
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

async fn json_body(res: Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn content_type(res: &Response) -> &str {
    res.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn health_is_public() {
    let res = app_with(seeded())
        .oneshot(request("GET", "/health", None, None))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await, json!({"status": "ok", "database": "ok"}));
}

#[tokio::test]
async fn list_filters_case_insensitively_in_storage_order() {
    let res = app_with(seeded())
        .oneshot(request(
            "GET",
            "/catalogue-api/products?filter=%D0%A2%D0%9E%D0%92%D0%90%D0%A0%D0%90",
            Some("view_catalogue"),
            None,
        ))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        json_body(res).await,
        json!([
            {"id": 1, "title": "Название товара 1", "details": "Описание Название товара 1"},
            {"id": 4, "title": "Название товара 4", "details": "Описание Название товара 4"},
            {"id": 5, "title": "Название товара 5", "details": "Описание Название товара 5"},
        ])
    );
}

#[tokio::test]
async fn list_without_filter_returns_everything() {
    let res = app_with(seeded())
        .oneshot(request(
            "GET",
            "/catalogue-api/products",
            Some("view_catalogue"),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await.as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn list_without_view_scope_is_forbidden() {
    let res = app_with(seeded())
        .oneshot(request(
            "GET",
            "/catalogue-api/products?filter=x",
            Some("openid"),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let res = app_with(seeded())
        .oneshot(request("GET", "/catalogue-api/products", None, None))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        res.headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok()),
        Some("Bearer")
    );
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let req = Request::builder()
        .uri("/catalogue-api/products")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .expect("request");
    let res = app_with(seeded()).oneshot(req).await.expect("response");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn get_existing_product_returns_it() {
    let res = app_with(seeded())
        .oneshot(request(
            "GET",
            "/catalogue-api/products/1",
            Some("view_catalogue"),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        json_body(res).await,
        json!({"id": 1, "title": "Название товара 1", "details": "Описание Название товара 1"})
    );
}

#[tokio::test]
async fn get_unknown_product_is_localized_not_found() {
    let mut req = request(
        "GET",
        "/catalogue-api/products/21312",
        Some("view_catalogue"),
        None,
    );
    req.headers_mut()
        .insert(header::ACCEPT_LANGUAGE, "ru".parse().expect("header"));
    let res = app_with(seeded()).oneshot(req).await.expect("response");

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(content_type(&res), "application/problem+json");
    let body = json_body(res).await;
    assert_eq!(body["status"], 404);
    assert_eq!(body["detail"], "Товар не найден");
}

#[tokio::test]
async fn non_numeric_id_is_not_found() {
    let res = app_with(seeded())
        .oneshot(request(
            "GET",
            "/catalogue-api/products/abc",
            Some("view_catalogue"),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_returns_created_with_location() {
    let repo = Arc::new(InMemoryProductRepository::default());
    let res = app_with(Arc::clone(&repo))
        .oneshot(request(
            "POST",
            "/catalogue-api/products",
            Some("edit_catalogue"),
            Some(json!({"title": "new product", "details": "product_details"})),
        ))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(
        res.headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost/catalogue-api/products/1")
    );
    assert_eq!(
        json_body(res).await,
        json!({"id": 1, "title": "new product", "details": "product_details"})
    );
    assert_eq!(repo.snapshot().await.len(), 1);
}

#[tokio::test]
async fn create_with_blank_title_returns_localized_problem_and_persists_nothing() {
    let repo = Arc::new(InMemoryProductRepository::default());
    let mut req = request(
        "POST",
        "/catalogue-api/products",
        Some("edit_catalogue"),
        Some(json!({"title": "  ", "details": null})),
    );
    req.headers_mut()
        .insert(header::ACCEPT_LANGUAGE, "ru".parse().expect("header"));
    let res = app_with(Arc::clone(&repo))
        .oneshot(req)
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(content_type(&res), "application/problem+json");
    let body = json_body(res).await;
    assert_eq!(body["errors"], json!(["Название товара не может быть пустым"]));
    assert!(repo.snapshot().await.is_empty());
}

#[tokio::test]
async fn create_with_short_or_long_title_is_rejected() {
    for title in ["ab".to_string(), "x".repeat(51)] {
        let repo = Arc::new(InMemoryProductRepository::default());
        let res = app_with(Arc::clone(&repo))
            .oneshot(request(
                "POST",
                "/catalogue-api/products",
                Some("edit_catalogue"),
                Some(json!({ "title": title })),
            ))
            .await
            .expect("response");

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(res).await["errors"],
            json!(["Product title must be between 3 and 50 characters"])
        );
        assert!(repo.snapshot().await.is_empty());
    }
}

#[tokio::test]
async fn title_with_trailing_spaces_counts_every_char() {
    let repo = Arc::new(InMemoryProductRepository::default());
    let res = app_with(Arc::clone(&repo))
        .oneshot(request(
            "POST",
            "/catalogue-api/products",
            Some("edit_catalogue"),
            Some(json!({"title": "ab "})),
        ))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(json_body(res).await["title"], json!("ab "));
    assert_eq!(repo.snapshot().await.len(), 1);
}

#[tokio::test]
async fn create_with_malformed_json_is_bad_request() {
    let req = Request::builder()
        .method("POST")
        .uri("/catalogue-api/products")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", token_with_scope("edit_catalogue")),
        )
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": "))
        .expect("request");
    let res = app_with(seeded()).oneshot(req).await.expect("response");

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = json_body(res).await;
    assert!(body["detail"]
        .as_str()
        .is_some_and(|d| d.starts_with("The request body could not be read")));
}

#[tokio::test]
async fn create_with_view_scope_only_is_forbidden() {
    let repo = Arc::new(InMemoryProductRepository::default());
    let res = app_with(Arc::clone(&repo))
        .oneshot(request(
            "POST",
            "/catalogue-api/products",
            Some("view_catalogue"),
            Some(json!({"title": "new product"})),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(repo.snapshot().await.is_empty());
}

#[tokio::test]
async fn update_existing_product_returns_no_content() {
    let repo = seeded();
    let res = app_with(Arc::clone(&repo))
        .oneshot(request(
            "PATCH",
            "/catalogue-api/products/1",
            Some("edit_catalogue"),
            Some(json!({"title": "Молоко", "details": "Молоко вкусное"})),
        ))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let updated = &repo.snapshot().await[0];
    assert_eq!(updated.title, "Молоко");
    assert_eq!(updated.details.as_deref(), Some("Молоко вкусное"));
}

#[tokio::test]
async fn update_with_blank_title_is_bad_request() {
    let repo = seeded();
    let mut req = request(
        "PATCH",
        "/catalogue-api/products/1",
        Some("edit_catalogue"),
        Some(json!({"title": "   ", "details": null})),
    );
    req.headers_mut()
        .insert(header::ACCEPT_LANGUAGE, "ru".parse().expect("header"));
    let res = app_with(Arc::clone(&repo))
        .oneshot(req)
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(res).await["errors"],
        json!(["Название товара не может быть пустым"])
    );
    assert_eq!(repo.snapshot().await[0].title, "Название товара 1");
}

#[tokio::test]
async fn update_unknown_product_is_not_found() {
    let repo = Arc::new(InMemoryProductRepository::default());
    let res = app_with(Arc::clone(&repo))
        .oneshot(request(
            "PATCH",
            "/catalogue-api/products/1",
            Some("edit_catalogue"),
            Some(json!({"title": "Молоко", "details": "Молоко вкусное"})),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(repo.snapshot().await.is_empty());
}

#[tokio::test]
async fn update_without_edit_scope_is_forbidden() {
    let repo = seeded();
    let res = app_with(Arc::clone(&repo))
        .oneshot(request(
            "PATCH",
            "/catalogue-api/products/1",
            Some("view_catalogue"),
            Some(json!({"title": "Молоко"})),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(repo.snapshot().await[0].title, "Название товара 1");
}

#[tokio::test]
async fn delete_existing_product_returns_no_content() {
    let repo = seeded();
    let res = app_with(Arc::clone(&repo))
        .oneshot(request(
            "DELETE",
            "/catalogue-api/products/1",
            Some("edit_catalogue"),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(repo.snapshot().await.len(), 4);
}

#[tokio::test]
async fn delete_unknown_product_is_not_found() {
    let repo = seeded();
    let res = app_with(Arc::clone(&repo))
        .oneshot(request(
            "DELETE",
            "/catalogue-api/products/99",
            Some("edit_catalogue"),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(repo.snapshot().await.len(), 5);
}

#[tokio::test]
async fn delete_without_edit_scope_is_forbidden() {
    let repo = seeded();
    let res = app_with(Arc::clone(&repo))
        .oneshot(request(
            "DELETE",
            "/catalogue-api/products/1",
            Some("view_catalogue"),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(repo.snapshot().await.len(), 5);
}

#[tokio::test]
async fn unmapped_method_is_denied_even_with_all_scopes() {
    let res = app_with(seeded())
        .oneshot(request(
            "PUT",
            "/catalogue-api/products/1",
            Some("view_catalogue edit_catalogue"),
            Some(json!({"title": "Молоко"})),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_then_fetch_round_trips() {
    let app = app_with(Arc::new(InMemoryProductRepository::default()));
    let created = app
        .clone()
        .oneshot(request(
            "POST",
            "/catalogue-api/products",
            Some("edit_catalogue"),
            Some(json!({"title": "X product", "details": "Y"})),
        ))
        .await
        .expect("response");
    let id = json_body(created).await["id"].as_i64().expect("id");

    let fetched = app
        .oneshot(request(
            "GET",
            &format!("/catalogue-api/products/{id}"),
            Some("view_catalogue"),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(
        json_body(fetched).await,
        json!({"id": id, "title": "X product", "details": "Y"})
    );
}

#[tokio::test]
async fn responses_carry_request_id() {
    let res = app_with(seeded())
        .oneshot(request("GET", "/health", None, None))
        .await
        .expect("response");
    assert!(res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn mutation_without_token_subject_keeps_caller_request_id() {
    let repo = seeded();
    let token = sign(&json!({
        "scope": "edit_catalogue",
        "exp": get_current_timestamp() + 3600,
    }));
    let req = Request::builder()
        .method("DELETE")
        .uri("/catalogue-api/products/2")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header("x-request-id", "req-7")
        .body(Body::empty())
        .expect("request");

    let res = app_with(Arc::clone(&repo))
        .oneshot(req)
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        res.headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-7")
    );
    assert!(repo.snapshot().await.iter().all(|p| p.id != 2));
}
