//! # PlugMart RS
//!
//! Digital-goods storefront fulfillment service.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_SECRET_KEY=sk_test_...
//! export PUBLIC_BASE_URL=https://plugmart.store
//! export PROTECTED_FILES_DIR=protected_files
//!
//! # Run the server
//! plugmart
//! ```

use store_api::{routes, state::AppState};
use store_core::PaymentVerifier;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Products loaded: {}", state.catalog.products.len());
    info!("Protected files dir: {}", state.config.files_dir.display());
    info!("Payment provider: {}", state.verifier.provider_name());

    if state.config.allow_unverified_product_list {
        warn!("ALLOW_UNVERIFIED_PRODUCT_LIST is enabled — /api/verify will trust client-supplied product lists");
    }

    // Outstanding tokens are in-memory only; a restart drops them
    if is_prod {
        info!("Note: download tokens do not survive restarts");
    }

    let app = routes::create_router(state);

    info!("PlugMart starting on http://{}", addr);
    if !is_prod {
        info!("Checkout: POST http://{}/api/checkout", addr);
        info!("Verify:   POST http://{}/api/verify", addr);
        info!("Download: GET  http://{}/api/download/{{token}}", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
