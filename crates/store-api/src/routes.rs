//! # Routes
//!
//! Axum router configuration for the storefront fulfillment API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - GET  /health - Health check
/// - GET  /api/products - List active products
/// - GET  /api/products/{product_id} - Get product by id
/// - POST /api/checkout - Create hosted checkout session
/// - POST /api/verify - Verify payment, mint download links
/// - GET  /api/download/{token} - Redeem a download token
pub fn create_router(state: AppState) -> Router {
    // Storefront pages are served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/products", get(handlers::list_products))
        .route("/products/{product_id}", get(handlers::get_product))
        .route("/checkout", post(handlers::create_checkout))
        .route("/verify", post(handlers::verify_payment))
        .route("/download/{token}", get(handlers::download));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
