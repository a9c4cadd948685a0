//! # Request Handlers
//!
//! Axum request handlers for the storefront fulfillment API:
//! checkout creation, payment verification, and token redemption.

use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use store_core::{
    Currency, Delivery, DownloadLink, PaymentVerification, Price, Product, StoreError,
};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Verify-payment request.
///
/// `sessionReference` is the normal path. `productIds` is a legacy
/// fallback that trusts the caller and is disabled unless explicitly
/// configured on.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default)]
    pub session_reference: Option<String>,
    #[serde(default)]
    pub product_ids: Option<Vec<String>>,
}

/// Verify-payment response: one single-use link per purchased product
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub download_urls: Vec<DownloadLink>,
    /// Total captured, in decimal currency units
    pub total: f64,
}

/// Create checkout request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    /// Items to purchase
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
    /// Convenience: single productId (alternative to items array)
    #[serde(default)]
    pub product_id: Option<String>,
}

/// Item in checkout request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Create checkout response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutResponse {
    /// Session id — the payment reference for `/api/verify`
    pub session_id: String,
    /// Hosted checkout URL (redirect the buyer here)
    pub checkout_url: String,
}

/// Catalog entry as exposed to clients. Download descriptors stay
/// server-side; buyers only ever see minted download URLs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    /// Decimal currency units
    pub price: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            description: product.description.clone(),
            price: product.price.as_decimal(),
            currency: product.price.currency.as_str().to_string(),
            image_url: product.image_url.clone(),
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    if code >= 500 {
        error!(%err, "request failed");
    } else {
        warn!(%err, "request rejected");
    }
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(ErrorResponse::new(err.public_message(), code)),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "plugmart",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Get products list
pub async fn list_products(State(state): State<AppState>) -> impl IntoResponse {
    let products: Vec<ProductView> = state.catalog.active_products().map(Into::into).collect();
    Json(serde_json::json!({
        "products": products,
        "count": products.len()
    }))
}

/// Get single product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<ProductView>, (StatusCode, Json<ErrorResponse>)> {
    let product = state.catalog.get(&product_id).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                format!("Product not found: {}", product_id),
                404,
            )),
        )
    })?;

    Ok(Json(product.into()))
}

/// Create a hosted checkout session for a cart
#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>, (StatusCode, Json<ErrorResponse>)> {
    // Single productId shorthand for one-click purchase
    let items = if !request.items.is_empty() {
        request.items
    } else if let Some(pid) = request.product_id {
        vec![CheckoutItem {
            product_id: pid,
            quantity: 1,
        }]
    } else {
        return Err(store_error_to_response(StoreError::InvalidRequest(
            "Cart is empty (provide 'items' array or 'productId')".to_string(),
        )));
    };

    let mut cart: Vec<(Product, u32)> = Vec::with_capacity(items.len());
    for item in &items {
        if item.quantity == 0 {
            return Err(store_error_to_response(StoreError::InvalidRequest(
                format!("Invalid quantity for product: {}", item.product_id),
            )));
        }

        let product = state.catalog.get(&item.product_id).ok_or_else(|| {
            store_error_to_response(StoreError::ProductNotFound {
                product_id: item.product_id.clone(),
            })
        })?;

        if !product.active {
            return Err(store_error_to_response(StoreError::InvalidRequest(
                format!("Product is not available: {}", item.product_id),
            )));
        }

        cart.push((product.clone(), item.quantity));
    }

    let session = state
        .checkout
        .create_checkout_session(
            &cart,
            &state.config.checkout_success_url(),
            &state.config.checkout_cancel_url(),
        )
        .await
        .map_err(store_error_to_response)?;

    info!(session_id = %session.session_id, "created checkout session");

    Ok(Json(CreateCheckoutResponse {
        session_id: session.session_id,
        checkout_url: session.checkout_url,
    }))
}

/// Verify a completed payment and mint download links.
///
/// Issuance begins only after verification fully succeeds, so a
/// failed or slow provider call leaves no partially-issued token.
#[instrument(skip(state, request))]
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, (StatusCode, Json<ErrorResponse>)> {
    let reference = request
        .session_reference
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let verification = match (reference, request.product_ids) {
        (Some(reference), _) => state
            .verifier
            .verify_payment(reference)
            .await
            .map_err(store_error_to_response)?,

        (None, Some(ids)) if !ids.is_empty() => {
            if !state.config.allow_unverified_product_list {
                return Err(store_error_to_response(StoreError::InvalidRequest(
                    "sessionReference is required".to_string(),
                )));
            }
            // Trust-boundary exception: nothing confirms these ids
            // were ever paid for. Kept for local development behind an
            // explicit opt-in flag.
            warn!(
                count = ids.len(),
                "issuing download links from an UNVERIFIED client-supplied product list"
            );
            let amount: i64 = ids
                .iter()
                .filter_map(|id| state.catalog.get(id))
                .map(|p| p.price.amount)
                .sum();
            PaymentVerification {
                product_ids: ids,
                amount_total: Price::from_cents(amount, Currency::USD),
            }
        }

        _ => {
            return Err(store_error_to_response(StoreError::InvalidRequest(
                "Missing sessionReference".to_string(),
            )));
        }
    };

    let links = state
        .issuer
        .issue(&verification.product_ids)
        .map_err(store_error_to_response)?;

    info!(links = links.len(), "minted download links");

    Ok(Json(VerifyResponse {
        download_urls: links,
        total: verification.amount_total.as_decimal(),
    }))
}

/// Redeem a download token for a file or a redirect
#[instrument(skip(state))]
pub async fn download(State(state): State<AppState>, Path(token): Path<String>) -> Response {
    match state.resolver.resolve(&token).await {
        Ok(Delivery::Redirect { url }) => Redirect::temporary(&url).into_response(),
        Ok(Delivery::Attachment { filename, bytes }) => (
            [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                ),
                (header::CONTENT_LENGTH, bytes.len().to_string()),
            ],
            bytes,
        )
            .into_response(),
        Err(err) => store_error_to_response(err).into_response(),
    }
}
