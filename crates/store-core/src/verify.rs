//! # Payment Verifier Trait
//!
//! Seam between the fulfillment engine and the external payment
//! provider. The Stripe implementation lives in `store-stripe`; tests
//! substitute an in-memory fake.

use crate::error::StoreResult;
use crate::product::Price;
use async_trait::async_trait;
use std::sync::Arc;

/// Trustworthy statement of "what was purchased and how much was
/// paid", derived once per verification call and never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentVerification {
    /// Ordered purchased product identifiers
    pub product_ids: Vec<String>,

    /// Total amount actually captured by the provider
    pub amount_total: Price,
}

/// Converts an opaque client-supplied payment reference into a
/// [`PaymentVerification`]. Pure read against the provider; a failed
/// or slow call has no side effects.
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    /// Verify a completed payment by its provider reference
    /// (a checkout session id or equivalent).
    async fn verify_payment(&self, reference: &str) -> StoreResult<PaymentVerification>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared payment verifier (dynamic dispatch)
pub type BoxedPaymentVerifier = Arc<dyn PaymentVerifier>;
