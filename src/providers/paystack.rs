// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Paystack integration for card and bank deposits.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::info;
use url::Url;

use super::{ChargeRequest, ChargeSession, PaymentProvider, ProviderError};
use crate::storage::SettlementOutcome;

pub const DEFAULT_BASE_URL: &str = "https://api.paystack.co";
const INITIALIZE_PATH: &str = "transaction/initialize";

/// Paystack amounts are in the minor unit (kobo).
const MINOR_UNITS_PER_UNIT: u64 = 100;

#[derive(Debug, Clone)]
pub struct PaystackClient {
    base_url: Url,
    secret_key: String,
    timeout: Duration,
    http: Client,
}

impl PaystackClient {
    pub fn new(base_url: &str, secret_key: &str, timeout: Duration) -> Result<Self, ProviderError> {
        if secret_key.trim().is_empty() {
            return Err(ProviderError::Config("secret key is empty".to_string()));
        }
        // Trailing slash so `join` appends rather than replaces the last segment.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| ProviderError::Config(format!("invalid base URL `{base_url}`: {e}")))?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            secret_key: secret_key.to_string(),
            timeout,
            http,
        })
    }

    async fn post_json(
        &self,
        path: &str,
        payload: &Value,
    ) -> Result<(StatusCode, Value), ProviderError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ProviderError::Config(format!("invalid path {path}: {e}")))?;

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.secret_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Request(format!("POST /{path} failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response.json::<Value>().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("POST /{path} invalid JSON: {e}"))
        })?;
        Ok((status, body))
    }
}

#[async_trait]
impl PaymentProvider for PaystackClient {
    async fn initialize_charge(
        &self,
        request: &ChargeRequest,
    ) -> Result<ChargeSession, ProviderError> {
        let amount_minor = request
            .amount
            .checked_mul(MINOR_UNITS_PER_UNIT)
            .ok_or_else(|| {
                ProviderError::InvalidRequest(format!("amount {} too large", request.amount))
            })?;

        let payload = json!({
            "amount": amount_minor,
            "email": request.email,
            "reference": request.reference,
        });

        let call = self.post_json(INITIALIZE_PATH, &payload);
        let (status, body) = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| ProviderError::Timeout)??;

        let session = parse_initialize_envelope(status, &body)?;
        info!(reference = %request.reference, "Paystack charge session opened");
        Ok(session)
    }
}

/// Interpret the `transaction/initialize` envelope.
///
/// Success requires HTTP 200, `status: true` and `data.authorization_url`.
pub fn parse_initialize_envelope(
    status: StatusCode,
    body: &Value,
) -> Result<ChargeSession, ProviderError> {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("no message");

    if status != StatusCode::OK || body.get("status").and_then(Value::as_bool) != Some(true) {
        return Err(ProviderError::Rejected(format!("HTTP {status}: {message}")));
    }

    let data = body
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| ProviderError::InvalidResponse("missing data object".to_string()))?;
    let authorization_url = data
        .get("authorization_url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ProviderError::InvalidResponse("missing authorization_url".to_string()))?;

    Ok(ChargeSession {
        authorization_url: authorization_url.to_string(),
        payload: data.clone(),
    })
}

/// Map a Paystack charge status onto a settlement outcome.
pub fn map_charge_status(raw_status: &str) -> SettlementOutcome {
    let status = raw_status.trim().to_ascii_lowercase();
    match status.as_str() {
        "success" => SettlementOutcome::Succeeded,
        "failed" | "abandoned" => SettlementOutcome::Failed,
        _ => SettlementOutcome::StillPending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};

    fn request(amount: u64) -> ChargeRequest {
        ChargeRequest {
            reference: "dep_abc".to_string(),
            amount,
            email: "payer@example.com".to_string(),
        }
    }

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn envelope_success() {
        let body = json!({
            "status": true,
            "message": "Authorization URL created",
            "data": {
                "authorization_url": "https://checkout.paystack.com/xyz",
                "access_code": "xyz",
                "reference": "dep_abc"
            }
        });
        let session = parse_initialize_envelope(StatusCode::OK, &body).unwrap();
        assert_eq!(session.authorization_url, "https://checkout.paystack.com/xyz");
        assert_eq!(session.payload["access_code"], "xyz");
    }

    #[test]
    fn envelope_failures() {
        let rejected = json!({ "status": false, "message": "Invalid key" });
        assert!(matches!(
            parse_initialize_envelope(StatusCode::OK, &rejected),
            Err(ProviderError::Rejected(msg)) if msg.contains("Invalid key")
        ));

        let ok_body = json!({ "status": true, "data": { "authorization_url": "u" } });
        assert!(matches!(
            parse_initialize_envelope(StatusCode::BAD_REQUEST, &ok_body),
            Err(ProviderError::Rejected(_))
        ));

        let no_url = json!({ "status": true, "data": {} });
        assert!(matches!(
            parse_initialize_envelope(StatusCode::OK, &no_url),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn charge_status_mapping() {
        assert_eq!(map_charge_status("success"), SettlementOutcome::Succeeded);
        assert_eq!(map_charge_status("Failed"), SettlementOutcome::Failed);
        assert_eq!(map_charge_status("abandoned"), SettlementOutcome::Failed);
        assert_eq!(map_charge_status("ongoing"), SettlementOutcome::StillPending);
        assert_eq!(map_charge_status(""), SettlementOutcome::StillPending);
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(matches!(
            PaystackClient::new("not a url", "sk", Duration::from_secs(1)),
            Err(ProviderError::Config(_))
        ));
        assert!(matches!(
            PaystackClient::new(DEFAULT_BASE_URL, " ", Duration::from_secs(1)),
            Err(ProviderError::Config(_))
        ));
    }

    #[tokio::test]
    async fn initialize_sends_minor_units_with_bearer_auth() {
        let router = Router::new().route(
            "/transaction/initialize",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(
                    headers.get("authorization").unwrap().to_str().unwrap(),
                    "Bearer sk_test_provider"
                );
                assert_eq!(body["amount"], 50_000);
                assert_eq!(body["email"], "payer@example.com");
                Json(json!({
                    "status": true,
                    "message": "ok",
                    "data": {
                        "authorization_url": "https://checkout.example/abc",
                        "reference": body["reference"].clone()
                    }
                }))
            }),
        );
        let base = serve(router).await;

        let client =
            PaystackClient::new(&base, "sk_test_provider", Duration::from_secs(5)).unwrap();
        let session = client.initialize_charge(&request(500)).await.unwrap();
        assert_eq!(session.authorization_url, "https://checkout.example/abc");
        assert_eq!(session.payload["reference"], "dep_abc");
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let router = Router::new().route(
            "/transaction/initialize",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "status": true }))
            }),
        );
        let base = serve(router).await;

        let client = PaystackClient::new(&base, "sk", Duration::from_millis(100)).unwrap();
        assert!(matches!(
            client.initialize_charge(&request(1)).await,
            Err(ProviderError::Timeout)
        ));
    }
}
