//! # store-core
//!
//! Core types and fulfillment engine for plugmart-rs.
//!
//! This crate provides:
//! - `TokenStore` and `InMemoryTokenStore` for outstanding download tokens
//! - `PaymentVerifier` trait for payment-provider verification
//! - `TokenIssuer` for minting single-use, time-limited download links
//! - `DownloadResolver` for redeeming a token into a file or redirect
//! - `Product` and `ProductCatalog` for the product catalog
//! - `StoreError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use store_core::{DownloadResolver, TokenIssuer, InMemoryTokenStore, SystemClock};
//!
//! // Verify the payment with the provider
//! let verification = verifier.verify_payment("cs_test_123").await?;
//!
//! // Mint one single-use link per purchased product
//! let links = issuer.issue(&verification.product_ids)?;
//!
//! // Later: redeem a token for the actual deliverable
//! match resolver.resolve(&token).await? {
//!     Delivery::Redirect { url } => redirect_to(url),
//!     Delivery::Attachment { filename, bytes } => serve_zip(filename, bytes),
//! }
//! ```

pub mod clock;
pub mod error;
pub mod issuer;
pub mod product;
pub mod resolver;
pub mod token;
pub mod verify;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{StoreError, StoreResult};
pub use issuer::{DownloadLink, TokenIssuer, DOWNLOAD_TOKEN_TTL_SECS};
pub use product::{Currency, DownloadKind, Price, Product, ProductCatalog};
pub use resolver::{attachment_filename, Delivery, DownloadResolver};
pub use token::{generate_token, InMemoryTokenStore, RedemptionRecord, TokenStore};
pub use verify::{BoxedPaymentVerifier, PaymentVerification, PaymentVerifier};
