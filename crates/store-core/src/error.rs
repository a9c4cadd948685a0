//! # Fulfillment Error Types
//!
//! Typed error handling for the plugmart fulfillment engine.
//! All fulfillment operations return `Result<T, StoreError>`.

use thiserror::Error;

/// Core error type for all fulfillment operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The payment reference is unknown to the provider
    #[error("Payment session not found: {reference}")]
    PaymentNotFound { reference: String },

    /// The provider reports a non-success payment status
    #[error("Payment not successful (status: {status})")]
    PaymentIncomplete { status: String },

    /// The verified session carried no product metadata
    #[error("No products found in order")]
    NoProductsInPurchase,

    /// None of the purchased identifiers matched a catalog product
    #[error("No downloadable products in order")]
    NoDownloadableProducts,

    /// Token absent from the store (never issued, redeemed, or swept)
    #[error("Invalid or expired download link")]
    InvalidOrExpiredToken,

    /// Token found but past its expiry
    #[error("This download link has expired")]
    LinkExpired,

    /// Token references a product missing from the catalog
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Protected file missing on disk (token preserved for retry)
    #[error("File not found at {path}")]
    FileNotFound { path: String },

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Configuration(_) => 500,
            StoreError::InvalidRequest(_) => 400,
            StoreError::PaymentNotFound { .. } => 404,
            StoreError::PaymentIncomplete { .. } => 402,
            StoreError::NoProductsInPurchase => 400,
            StoreError::NoDownloadableProducts => 500,
            StoreError::InvalidOrExpiredToken => 404,
            StoreError::LinkExpired => 410,
            StoreError::ProductNotFound { .. } => 404,
            StoreError::FileNotFound { .. } => 500,
            StoreError::ProviderError { .. } => 500,
            StoreError::NetworkError(_) => 500,
            StoreError::Serialization(_) => 500,
            StoreError::Internal(_) => 500,
        }
    }

    /// Message safe to show to API clients.
    ///
    /// Provider-side failures collapse to a generic message; the full
    /// error stays in the server logs.
    pub fn public_message(&self) -> String {
        match self {
            StoreError::ProviderError { .. }
            | StoreError::NetworkError(_)
            | StoreError::Serialization(_) => {
                "Could not verify payment with provider".to_string()
            }
            StoreError::NoProductsInPurchase | StoreError::NoDownloadableProducts => {
                "Could not generate download links".to_string()
            }
            StoreError::FileNotFound { .. } => {
                "File not found. Please contact support".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias for fulfillment operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(StoreError::InvalidRequest("test".into()).status_code(), 400);
        assert_eq!(
            StoreError::PaymentIncomplete {
                status: "unpaid".into()
            }
            .status_code(),
            402
        );
        assert_eq!(StoreError::InvalidOrExpiredToken.status_code(), 404);
        assert_eq!(StoreError::LinkExpired.status_code(), 410);
        assert_eq!(
            StoreError::FileNotFound {
                path: "/tmp/x.zip".into()
            }
            .status_code(),
            500
        );
    }

    #[test]
    fn test_provider_errors_do_not_leak() {
        let err = StoreError::ProviderError {
            provider: "stripe".into(),
            message: "secret internal detail".into(),
        };
        assert!(!err.public_message().contains("secret"));

        let err = StoreError::NetworkError("connection refused to 10.0.0.3".into());
        assert_eq!(err.public_message(), "Could not verify payment with provider");
    }

    #[test]
    fn test_file_not_found_hides_path() {
        let err = StoreError::FileNotFound {
            path: "/srv/protected/elementor-pro.zip".into(),
        };
        assert!(!err.public_message().contains("/srv"));
        // the Display form keeps the path for logging
        assert!(err.to_string().contains("/srv/protected/elementor-pro.zip"));
    }
}
