// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::FromRequest,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::API_KEY_HEADER,
    deposits::{DepositSession, DepositStatus},
    error::{ApiError, LedgerError},
    ledger::{TransferResult, WalletBalance},
    models::{Permission, TransactionStatus, TransactionType},
    state::AppState,
};

pub mod health;
pub mod keys;
pub mod wallet;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/keys", get(keys::list_keys))
        .route("/keys/active", get(keys::list_active_keys))
        .route("/keys/create", post(keys::create_key))
        .route("/keys/revoke", post(keys::revoke_key))
        .route("/keys/rollover", post(keys::rollover_key))
        .route("/wallet/deposit", post(wallet::create_deposit))
        .route(
            "/wallet/deposit/{reference}/status",
            get(wallet::deposit_status),
        )
        .route("/wallet/transfer", post(wallet::transfer))
        .route("/wallet/balance", get(wallet::balance))
        .route("/wallet/transactions", get(wallet::transactions))
        .route("/wallet/paystack/webhook", post(wallet::paystack_webhook))
        .with_state(state);

    routes
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// JSON body whose rejections render as a 400 in the ledger's error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Run storage or hashing work off the async executor.
pub(crate) async fn run_blocking<T, F>(task: F) -> Result<T, LedgerError>
where
    F: FnOnce() -> Result<T, LedgerError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| LedgerError::Internal(format!("blocking task failed: {e}")))?
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        keys::create_key,
        keys::list_keys,
        keys::list_active_keys,
        keys::revoke_key,
        keys::rollover_key,
        wallet::create_deposit,
        wallet::deposit_status,
        wallet::transfer,
        wallet::balance,
        wallet::transactions,
        wallet::paystack_webhook
    ),
    components(
        schemas(
            health::HealthResponse,
            health::HealthChecks,
            keys::CreateKeyRequest,
            keys::CreateKeyResponse,
            keys::ApiKeyView,
            keys::RevokeKeyRequest,
            keys::RevokeKeyResponse,
            keys::RolloverKeyRequest,
            wallet::DepositRequest,
            wallet::TransferRequest,
            wallet::TransferResponse,
            wallet::TransactionItem,
            wallet::WebhookAck,
            DepositSession,
            DepositStatus,
            TransferResult,
            WalletBalance,
            Permission,
            TransactionStatus,
            TransactionType
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and storage checks"),
        (name = "Keys", description = "API key lifecycle"),
        (name = "Wallet", description = "Deposits, transfers, balance and history")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::tests::{mint, TEST_SECRET};
    use crate::config::{LedgerConfig, PAYSTACK_SECRET_KEY_ENV, SESSION_TOKEN_SECRET_ENV};
    use crate::credentials::HashingParams;
    use crate::deposits::tests::{webhook_body, StubProvider, WEBHOOK_SECRET};
    use crate::deposits::{WebhookVerifier, SIGNATURE_HEADER};
    use crate::storage::database::temp_db;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_config() -> LedgerConfig {
        let mut config = LedgerConfig::from_lookup(|name| match name {
            SESSION_TOKEN_SECRET_ENV => Some("session-secret-for-tests".to_string()),
            PAYSTACK_SECRET_KEY_ENV => Some("sk_test_webhook".to_string()),
            _ => None,
        })
        .unwrap();
        config.hashing = HashingParams::fast_insecure();
        config
    }

    fn test_app() -> (Router, tempfile::TempDir) {
        let (db, dir) = temp_db();
        let state = AppState::new(
            Arc::new(db),
            Arc::new(StubProvider::default()),
            &test_config(),
        );
        (router(state), dir)
    }

    enum Caller<'a> {
        Anonymous,
        Session(&'a str),
        Key(&'a str),
    }

    fn session(user_id: &str) -> String {
        let email = format!("{user_id}@example.com");
        mint(TEST_SECRET, user_id, Some(email.as_str()), 3600)
    }

    fn request(method: Method, uri: &str, caller: Caller<'_>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        builder = match caller {
            Caller::Anonymous => builder,
            Caller::Session(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
            Caller::Key(key) => builder.header(API_KEY_HEADER, key),
        };
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    fn webhook(body: Vec<u8>, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/wallet/paystack/webhook")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn create_key(app: &Router, token: &str, permissions: &[&str]) -> String {
        let (status, body) = send(
            app,
            request(
                Method::POST,
                "/keys/create",
                Caller::Session(token),
                Some(json!({ "name": "ci", "permissions": permissions, "expiry": "1D" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["api_key"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _dir) = test_app();
        let (status, body) = send(&app, request(Method::GET, "/health", Caller::Anonymous, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["checks"]["database"], "ok");
    }

    #[tokio::test]
    async fn protected_routes_require_credentials() {
        let (app, _dir) = test_app();
        for uri in ["/wallet/balance", "/wallet/transactions", "/keys"] {
            let (status, body) = send(&app, request(Method::GET, uri, Caller::Anonymous, None)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert!(body["error_code"].is_string());
        }

        let (status, _) = send(
            &app,
            request(Method::GET, "/wallet/balance", Caller::Key("sk_test_nope_nope"), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn api_key_deposit_is_credited_once_by_webhook() {
        let (app, _dir) = test_app();
        let token = session("alice");
        let api_key = create_key(&app, &token, &["deposit", "read"]).await;

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/wallet/deposit",
                Caller::Key(&api_key),
                Some(json!({ "amount": 500 })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let reference = body["reference"].as_str().unwrap().to_string();
        assert!(reference.starts_with("dep_"));
        assert!(body["authorization_url"].as_str().unwrap().contains(&reference));

        let status_uri = format!("/wallet/deposit/{reference}/status");
        let (_, body) = send(&app, request(Method::GET, &status_uri, Caller::Key(&api_key), None)).await;
        assert_eq!(body["status"], "pending");

        let payload = webhook_body(&reference, "success");
        let signature = WebhookVerifier::new(WEBHOOK_SECRET).sign(&payload);
        for _ in 0..2 {
            let (status, body) = send(&app, webhook(payload.clone(), Some(signature.clone()))).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({ "status": true }));
        }

        let (status, body) = send(
            &app,
            request(Method::GET, "/wallet/balance", Caller::Key(&api_key), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balance"], 500);

        let (_, body) = send(&app, request(Method::GET, &status_uri, Caller::Key(&api_key), None)).await;
        assert_eq!(body["status"], "success");

        let (_, body) = send(
            &app,
            request(Method::GET, "/wallet/transactions", Caller::Session(&token), None),
        )
        .await;
        let history = body.as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["type"], "deposit");
        assert_eq!(history[0]["amount"], 500);
    }

    #[tokio::test]
    async fn permissions_are_enforced_per_route() {
        let (app, _dir) = test_app();
        let token = session("bob");
        let read_only = create_key(&app, &token, &["read"]).await;

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/wallet/transfer",
                Caller::Key(&read_only),
                Some(json!({ "wallet_number": "whatever", "amount": 1 })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Missing permission: transfer");

        let (status, _) = send(&app, request(Method::GET, "/keys", Caller::Key(&read_only), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            request(
                Method::POST,
                "/keys/create",
                Caller::Key(&read_only),
                Some(json!({ "name": "x", "permissions": ["read"], "expiry": "1D" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            request(Method::GET, "/wallet/balance", Caller::Key(&read_only), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn key_listing_and_revocation() {
        let (app, _dir) = test_app();
        let token = session("carol");
        let first = create_key(&app, &token, &["read"]).await;
        create_key(&app, &token, &["deposit"]).await;

        let (_, body) = send(&app, request(Method::GET, "/keys", Caller::Session(&token), None)).await;
        let keys = body.as_array().unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| k["api_key"].as_str().unwrap().contains("***")));
        assert!(keys.iter().all(|k| k.get("key_hash").is_none()));

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/keys/revoke",
                Caller::Session(&token),
                Some(json!({ "api_key": first })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["key"]["revoked"], true);

        let (_, body) = send(
            &app,
            request(Method::GET, "/keys/active", Caller::Session(&token), None),
        )
        .await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, body) = send(
            &app,
            request(Method::GET, "/wallet/balance", Caller::Key(&first), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "api_key_revoked");

        let (status, _) = send(
            &app,
            request(
                Method::POST,
                "/keys/rollover",
                Caller::Session(&token),
                Some(json!({ "expired_key_id": first, "expiry": "1D" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn webhook_requires_a_valid_signature() {
        let (app, _dir) = test_app();
        let payload = webhook_body("dep_unknown", "success");

        let (status, _) = send(&app, webhook(payload.clone(), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, webhook(payload.clone(), Some("00ff".to_string()))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let signature = WebhookVerifier::new(WEBHOOK_SECRET).sign(&payload);
        let (status, body) = send(&app, webhook(payload, Some(signature))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": true }));
    }

    #[tokio::test]
    async fn transfer_input_errors() {
        let (app, _dir) = test_app();
        let token = session("dave");

        let (_, body) = send(
            &app,
            request(Method::GET, "/wallet/balance", Caller::Session(&token), None),
        )
        .await;
        let own_number = body["wallet_number"].as_str().unwrap().to_string();
        assert_eq!(body["balance"], 0);

        let cases = [
            (json!({ "wallet_number": own_number, "amount": -5 }), StatusCode::BAD_REQUEST),
            (json!({ "wallet_number": own_number, "amount": 0 }), StatusCode::BAD_REQUEST),
            (json!({ "wallet_number": own_number }), StatusCode::BAD_REQUEST),
            (json!({ "wallet_number": own_number, "amount": 1 }), StatusCode::CONFLICT),
            (json!({ "wallet_number": "missing", "amount": 1 }), StatusCode::NOT_FOUND),
        ];
        for (body, expected) in cases {
            let (status, response) = send(
                &app,
                request(Method::POST, "/wallet/transfer", Caller::Session(&token), Some(body)),
            )
            .await;
            assert_eq!(status, expected, "{response}");
        }
    }

    #[tokio::test]
    async fn openapi_document_lists_routes() {
        let (app, _dir) = test_app();
        let (status, body) = send(
            &app,
            request(Method::GET, "/api-doc/openapi.json", Caller::Anonymous, None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/wallet/transfer"].is_object());
        assert!(body["paths"]["/keys/rollover"].is_object());
        assert!(body["components"]["securitySchemes"]["api_key"].is_object());
    }
}
