//! # store-stripe
//!
//! Stripe integration for plugmart-rs.
//!
//! One client type, `StripeCheckout`, covers both sides of the flow:
//!
//! 1. **Checkout creation** — builds a hosted Checkout Session from
//!    catalog products and attaches the purchased product ids as
//!    comma-joined `metadata[productIds]`.
//! 2. **Payment verification** — implements
//!    [`store_core::PaymentVerifier`] by retrieving the session and
//!    reading back the payment status, captured total, and product
//!    metadata.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use store_stripe::StripeCheckout;
//! use store_core::PaymentVerifier;
//!
//! let stripe = StripeCheckout::from_env()?;
//!
//! // Create a session and redirect the buyer to session.checkout_url
//! let session = stripe
//!     .create_checkout_session(&items, &success_url, &cancel_url)
//!     .await?;
//!
//! // After payment, the client brings the session id back:
//! let verification = stripe.verify_payment(&session.session_id).await?;
//! ```

pub mod checkout;
pub mod config;
pub mod verify;

// Re-exports
pub use checkout::{CheckoutSession, StripeCheckout};
pub use config::StripeConfig;
