// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Webhook authentication and payload extraction.
//!
//! The signature is lowercase hex HMAC-SHA512 over the exact request bytes.
//! It must be checked against the raw body; re-serialized JSON will not match.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha512;

use crate::models::Metadata;

type HmacSha512 = Hmac<Sha512>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: secret.to_vec(),
        }
    }

    fn mac(&self) -> Option<HmacSha512> {
        HmacSha512::new_from_slice(&self.key).ok()
    }

    /// Constant-time check of `signature_hex` against the body.
    pub fn verify(&self, raw_body: &[u8], signature_hex: &str) -> bool {
        let Ok(signature) = hex::decode(signature_hex.trim()) else {
            return false;
        };
        let Some(mut mac) = self.mac() else {
            return false;
        };
        mac.update(raw_body);
        mac.verify_slice(&signature).is_ok()
    }

    /// Signature the provider would send for `raw_body`.
    pub fn sign(&self, raw_body: &[u8]) -> String {
        match self.mac() {
            Some(mut mac) => {
                mac.update(raw_body);
                hex::encode(mac.finalize().into_bytes())
            }
            None => String::new(),
        }
    }
}

/// The parts of a webhook event the ledger acts on.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    pub event: Option<String>,
    pub reference: Option<String>,
    pub status: Option<String>,
    /// Whole payload, stored verbatim on the transaction
    pub payload: Metadata,
}

/// Parse a verified body. `None` if it is not a JSON object.
pub fn parse_event(raw_body: &[u8]) -> Option<WebhookEvent> {
    let Value::Object(payload) = serde_json::from_slice::<Value>(raw_body).ok()? else {
        return None;
    };

    let text = |value: Option<&Value>| {
        value
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let data = payload.get("data");

    Some(WebhookEvent {
        event: text(payload.get("event")),
        reference: text(data.and_then(|d| d.get("reference"))),
        status: text(data.and_then(|d| d.get("status"))),
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"event":"charge.success","data":{"reference":"dep_1","status":"success"}}"#;

    #[test]
    fn accepts_only_matching_signature() {
        let verifier = WebhookVerifier::new(b"sk_test_secret");
        let signature = verifier.sign(BODY);
        assert_eq!(signature.len(), 128);

        assert!(verifier.verify(BODY, &signature));
        assert!(!verifier.verify(BODY, &signature[..126]));
        assert!(!verifier.verify(BODY, "zz"));
        assert!(!verifier.verify(b"{}", &signature));
        assert!(!WebhookVerifier::new(b"other").verify(BODY, &signature));
    }

    #[test]
    fn reserialized_body_does_not_verify() {
        let verifier = WebhookVerifier::new(b"sk_test_secret");
        let spaced = br#"{ "event": "charge.success", "data": { "reference": "dep_1", "status": "success" } }"#;
        let signature = verifier.sign(spaced);
        assert!(!verifier.verify(BODY, &signature));
    }

    #[test]
    fn known_vector() {
        // HMAC-SHA512 of "" with key "key".
        let verifier = WebhookVerifier::new(b"key");
        assert_eq!(
            verifier.sign(b""),
            "84fa5aa0279bbc473267d05a53ea03310a987cecc4c1535ff29b6d76b8f1444a\
             728df3aadb89d4a9a6709e1998f373566e8f824a8ca93b1821f0b69bc2a2f65e"
        );
    }

    #[test]
    fn extracts_reference_and_status() {
        let event = parse_event(BODY).unwrap();
        assert_eq!(event.event.as_deref(), Some("charge.success"));
        assert_eq!(event.reference.as_deref(), Some("dep_1"));
        assert_eq!(event.status.as_deref(), Some("success"));
        assert_eq!(event.payload["data"]["reference"], "dep_1");

        let bare = parse_event(br#"{"event":"transfer.success"}"#).unwrap();
        assert!(bare.reference.is_none());
        assert!(parse_event(b"[1,2]").is_none());
        assert!(parse_event(b"not json").is_none());
    }
}
