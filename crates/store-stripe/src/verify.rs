//! # Stripe Payment Verification
//!
//! Retrieves a Checkout Session by id and converts it into a
//! trustworthy statement of what was purchased. Pure read against the
//! Stripe API; a failed or slow call leaves nothing behind.

use crate::checkout::{StripeCheckout, StripeErrorResponse};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use store_core::{
    Currency, PaymentVerification, PaymentVerifier, Price, StoreError, StoreResult,
};
use tracing::{debug, error, instrument, warn};

/// Session payload fields the verifier cares about
#[derive(Debug, Deserialize)]
struct StripeSessionRetrieved {
    #[allow(dead_code)]
    id: String,
    payment_status: String,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl StripeCheckout {
    /// Retrieve a Checkout Session from Stripe
    async fn retrieve_session(&self, session_id: &str) -> StoreResult<StripeSessionRetrieved> {
        let url = format!(
            "{}/v1/checkout/sessions/{}",
            self.config.api_base_url, session_id
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .send()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

        if status.as_u16() == 404 {
            warn!(%session_id, "payment session unknown to provider");
            return Err(StoreError::PaymentNotFound {
                reference: session_id.to_string(),
            });
        }

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(StoreError::ProviderError {
                    provider: "stripe".to_string(),
                    message: error_response.error.message,
                });
            }

            return Err(StoreError::ProviderError {
                provider: "stripe".to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            StoreError::Serialization(format!("Failed to parse Stripe session: {}", e))
        })
    }
}

fn parse_currency(code: Option<&str>) -> Currency {
    match code.map(|c| c.to_ascii_lowercase()).as_deref() {
        Some("eur") => Currency::EUR,
        Some("gbp") => Currency::GBP,
        _ => Currency::USD,
    }
}

#[async_trait]
impl PaymentVerifier for StripeCheckout {
    #[instrument(skip(self), fields(reference = %reference))]
    async fn verify_payment(&self, reference: &str) -> StoreResult<PaymentVerification> {
        let session = self.retrieve_session(reference).await?;

        if session.payment_status != "paid" {
            warn!(status = %session.payment_status, "payment not captured");
            return Err(StoreError::PaymentIncomplete {
                status: session.payment_status,
            });
        }

        // Comma-joined ids attached at session-creation time
        let product_ids: Vec<String> = session
            .metadata
            .get("productIds")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        if product_ids.is_empty() {
            // missing metadata is an error, never "zero items delivered"
            warn!("paid session carries no product metadata");
            return Err(StoreError::NoProductsInPurchase);
        }

        let amount_total = Price::from_cents(
            session.amount_total.unwrap_or(0),
            parse_currency(session.currency.as_deref()),
        );

        debug!(
            products = product_ids.len(),
            amount = amount_total.amount,
            "payment verified"
        );

        Ok(PaymentVerification {
            product_ids,
            amount_total,
        })
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StripeConfig;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn verifier_for(server: &MockServer) -> StripeCheckout {
        StripeCheckout::new(StripeConfig::new("sk_test_abc").with_api_base_url(server.uri()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_paid_session_yields_verification() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/sess_123"))
            .and(header("Authorization", "Bearer sk_test_abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "sess_123",
                "payment_status": "paid",
                "amount_total": 944,
                "currency": "usd",
                "metadata": { "productIds": "elementor-pro,wp-rocket-premium" }
            })))
            .mount(&server)
            .await;

        let verification = verifier_for(&server)
            .await
            .verify_payment("sess_123")
            .await
            .unwrap();

        assert_eq!(
            verification.product_ids,
            vec!["elementor-pro".to_string(), "wp-rocket-premium".to_string()]
        );
        assert_eq!(verification.amount_total.amount, 944);
        assert_eq!(verification.amount_total.as_decimal(), 9.44);
    }

    #[tokio::test]
    async fn test_metadata_entries_are_trimmed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/sess_ws"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "sess_ws",
                "payment_status": "paid",
                "amount_total": 5900,
                "currency": "usd",
                "metadata": { "productIds": " rank-math-pro , ,wp-rocket-premium " }
            })))
            .mount(&server)
            .await;

        let verification = verifier_for(&server)
            .await
            .verify_payment("sess_ws")
            .await
            .unwrap();

        assert_eq!(
            verification.product_ids,
            vec!["rank-math-pro".to_string(), "wp-rocket-premium".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unpaid_session_is_incomplete() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/sess_unpaid"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "sess_unpaid",
                "payment_status": "unpaid",
                "amount_total": 4999,
                "currency": "usd",
                "metadata": { "productIds": "elementor-pro" }
            })))
            .mount(&server)
            .await;

        let err = verifier_for(&server)
            .await
            .verify_payment("sess_unpaid")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::PaymentIncomplete { ref status } if status == "unpaid"
        ));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/sess_ghost"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "message": "No such checkout.session: 'sess_ghost'" }
            })))
            .mount(&server)
            .await;

        let err = verifier_for(&server)
            .await
            .verify_payment("sess_ghost")
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::PaymentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_product_metadata_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/sess_nometa"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "sess_nometa",
                "payment_status": "paid",
                "amount_total": 4999,
                "currency": "usd",
                "metadata": {}
            })))
            .mount(&server)
            .await;

        let err = verifier_for(&server)
            .await
            .verify_payment("sess_nometa")
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NoProductsInPurchase));
    }

    #[tokio::test]
    async fn test_malformed_provider_response_stays_generic() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/sess_bad"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = verifier_for(&server)
            .await
            .verify_payment("sess_bad")
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Serialization(_)));
        assert_eq!(err.public_message(), "Could not verify payment with provider");
    }
}
