//! # Stripe Checkout Sessions
//!
//! Creation of hosted Checkout Sessions. The purchased product ids
//! are attached as comma-joined `metadata[productIds]` so the
//! verification step can read back what was bought.

use crate::config::StripeConfig;
use reqwest::Client;
use serde::Deserialize;
use store_core::{Product, StoreError, StoreResult};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Stripe client for checkout creation and payment verification
pub struct StripeCheckout {
    pub(crate) config: StripeConfig,
    pub(crate) client: Client,
}

/// A created hosted-checkout session
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    /// Provider's session id — the payment reference the client
    /// brings back for verification
    pub session_id: String,

    /// URL to redirect the buyer to for payment
    pub checkout_url: String,
}

impl StripeCheckout {
    /// Create a new Stripe client
    pub fn new(config: StripeConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> StoreResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    /// Create a hosted Checkout Session for a cart.
    ///
    /// `items` pairs catalog products with quantities. Product ids are
    /// comma-joined into session metadata for later verification.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn create_checkout_session(
        &self,
        items: &[(Product, u32)],
        success_url: &str,
        cancel_url: &str,
    ) -> StoreResult<CheckoutSession> {
        if items.is_empty() {
            return Err(StoreError::InvalidRequest("Cart is empty".to_string()));
        }

        let mut form_params: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
        ];

        for (i, (product, quantity)) in items.iter().enumerate() {
            form_params.push((
                format!("line_items[{}][price_data][currency]", i),
                product.price.currency.as_str().to_string(),
            ));
            form_params.push((
                format!("line_items[{}][price_data][unit_amount]", i),
                product.price.amount.to_string(),
            ));
            form_params.push((
                format!("line_items[{}][price_data][product_data][name]", i),
                product.name.clone(),
            ));
            if !product.description.is_empty() {
                form_params.push((
                    format!("line_items[{}][price_data][product_data][description]", i),
                    product.description.clone(),
                ));
            }
            if let Some(ref image) = product.image_url {
                form_params.push((
                    format!("line_items[{}][price_data][product_data][images][0]", i),
                    image.clone(),
                ));
            }
            form_params.push((format!("line_items[{}][quantity]", i), quantity.to_string()));
        }

        let product_ids: Vec<&str> = items.iter().map(|(p, _)| p.id.as_str()).collect();
        form_params.push((
            "metadata[productIds]".to_string(),
            product_ids.join(","),
        ));

        debug!(products = ?product_ids, "creating Stripe checkout session");

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let idempotency_key = Uuid::new_v4().to_string();

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", &idempotency_key)
            .form(&form_params)
            .send()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

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

        let session: StripeSessionCreated = serde_json::from_str(&body).map_err(|e| {
            StoreError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })?;

        info!(session_id = %session.id, "created Stripe checkout session");

        Ok(CheckoutSession {
            session_id: session.id,
            checkout_url: session.url,
        })
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeSessionCreated {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeErrorResponse {
    pub(crate) error: StripeApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeApiError {
    pub(crate) message: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub(crate) code: Option<String>,
}
