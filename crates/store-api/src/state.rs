//! # Application State
//!
//! Shared state for the axum application: configuration, catalog,
//! token store, and the fulfillment engine built on top of them.

use std::path::PathBuf;
use std::sync::Arc;
use store_core::{
    BoxedPaymentVerifier, Clock, DownloadResolver, InMemoryTokenStore, ProductCatalog,
    SystemClock, TokenIssuer, TokenStore,
};
use store_stripe::StripeCheckout;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Public base URL embedded in download links
    pub public_base_url: String,
    /// Directory protected zip files are served from
    pub files_dir: PathBuf,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Allow `/api/verify` with a caller-supplied product list instead
    /// of a payment reference. This bypasses payment verification and
    /// trusts the client; it exists for local development only.
    pub allow_unverified_product_list: bool,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            files_dir: std::env::var("PROTECTED_FILES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("protected_files")),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            allow_unverified_product_list: std::env::var("ALLOW_UNVERIFIED_PRODUCT_LIST")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Stripe success URL; Stripe substitutes the session id itself
    pub fn checkout_success_url(&self) -> String {
        format!(
            "{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}",
            self.public_base_url.trim_end_matches('/')
        )
    }

    /// Stripe cancel URL (back to the cart)
    pub fn checkout_cancel_url(&self) -> String {
        format!("{}/checkout", self.public_base_url.trim_end_matches('/'))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: Arc<AppConfig>,
    /// Product catalog
    pub catalog: Arc<ProductCatalog>,
    /// Outstanding download tokens
    pub tokens: Arc<dyn TokenStore>,
    /// Payment verification (Stripe in production, fakes in tests)
    pub verifier: BoxedPaymentVerifier,
    /// Checkout session creation
    pub checkout: Arc<StripeCheckout>,
    /// Token minting
    pub issuer: Arc<TokenIssuer>,
    /// Token redemption
    pub resolver: Arc<DownloadResolver>,
}

impl AppState {
    /// Create production state: Stripe from env, in-memory tokens
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let catalog = load_product_catalog()?;

        let stripe = Arc::new(
            StripeCheckout::from_env()
                .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?,
        );
        let verifier: BoxedPaymentVerifier = Arc::clone(&stripe) as BoxedPaymentVerifier;

        Ok(Self::assemble(
            config,
            catalog,
            Arc::new(InMemoryTokenStore::new()),
            Arc::new(SystemClock),
            verifier,
            stripe,
        ))
    }

    /// Wire the fulfillment engine from injected parts.
    ///
    /// Tests use this to substitute an in-memory verifier, a manual
    /// clock, and a temp files directory.
    pub fn assemble(
        config: AppConfig,
        catalog: ProductCatalog,
        tokens: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
        verifier: BoxedPaymentVerifier,
        checkout: Arc<StripeCheckout>,
    ) -> Self {
        let config = Arc::new(config);
        let catalog = Arc::new(catalog);

        let issuer = Arc::new(TokenIssuer::new(
            Arc::clone(&catalog),
            Arc::clone(&tokens),
            Arc::clone(&clock),
            config.public_base_url.clone(),
        ));
        let resolver = Arc::new(DownloadResolver::new(
            Arc::clone(&catalog),
            Arc::clone(&tokens),
            clock,
            config.files_dir.clone(),
        ));

        Self {
            config,
            catalog,
            tokens,
            verifier,
            checkout,
            issuer,
            resolver,
        }
    }
}

/// Load product catalog from config file
fn load_product_catalog() -> anyhow::Result<ProductCatalog> {
    let config_paths = [
        "config/products.toml",
        "../config/products.toml",
        "../../config/products.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = ProductCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded {} products from {}", catalog.products.len(), path);
            return Ok(catalog);
        }
    }

    tracing::warn!("No product catalog found, using empty catalog");
    Ok(ProductCatalog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            public_base_url: "https://plugmart.store".to_string(),
            files_dir: PathBuf::from("protected_files"),
            environment: "test".to_string(),
            allow_unverified_product_list: false,
        }
    }

    #[test]
    fn test_socket_addr() {
        let mut config = test_config();
        config.host = "0.0.0.0".to_string();
        config.port = 3000;
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_checkout_urls() {
        let config = test_config();
        assert_eq!(
            config.checkout_success_url(),
            "https://plugmart.store/checkout/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(config.checkout_cancel_url(), "https://plugmart.store/checkout");
    }
}
