//! # store-api
//!
//! HTTP API layer for plugmart-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for checkout, payment verification, and downloads
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/products` | List products |
//! | GET | `/api/products/{id}` | Get product |
//! | POST | `/api/checkout` | Create checkout session |
//! | POST | `/api/verify` | Verify payment, mint download links |
//! | GET | `/api/download/{token}` | Redeem a download token |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
