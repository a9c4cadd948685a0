//! # Token Issuer
//!
//! Turns a verified purchase into deliverable links: one fresh token
//! per purchased product, stored with a fixed TTL.

use crate::clock::Clock;
use crate::error::{StoreError, StoreResult};
use crate::product::ProductCatalog;
use crate::token::{generate_token, RedemptionRecord, TokenStore};
use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fixed token lifetime; not configurable per request
pub const DOWNLOAD_TOKEN_TTL_SECS: i64 = 15 * 60;

/// A client-facing download link for one purchased product
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DownloadLink {
    /// Product display name
    pub name: String,
    /// Single-use download URL
    pub url: String,
}

/// Mints download tokens for verified purchases
pub struct TokenIssuer {
    catalog: Arc<ProductCatalog>,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    public_base_url: String,
}

impl TokenIssuer {
    pub fn new(
        catalog: Arc<ProductCatalog>,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
        public_base_url: impl Into<String>,
    ) -> Self {
        let public_base_url: String = public_base_url.into();
        Self {
            catalog,
            store,
            clock,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Mint one token per purchased product identifier.
    ///
    /// Identifiers with no catalog match are skipped (logged, not
    /// surfaced — a caller cannot distinguish a partially bad list
    /// from a fully good one). An entirely empty result is an error.
    pub fn issue(&self, product_ids: &[String]) -> StoreResult<Vec<DownloadLink>> {
        let mut links = Vec::with_capacity(product_ids.len());

        for id in product_ids {
            let Some(product) = self.catalog.get(id) else {
                warn!(product_id = %id, "skipping purchased id with no catalog match");
                continue;
            };

            let token = generate_token();
            let expires_at = self.clock.now() + Duration::seconds(DOWNLOAD_TOKEN_TTL_SECS);
            // One product per token: each link is redeemed independently
            self.store.put(RedemptionRecord::new(
                token.clone(),
                vec![product.id.clone()],
                expires_at,
            ))?;

            debug!(product_id = %product.id, %expires_at, "issued download token");

            links.push(DownloadLink {
                name: product.name.clone(),
                url: format!("{}/api/download/{}", self.public_base_url, token),
            });
        }

        if links.is_empty() {
            return Err(StoreError::NoDownloadableProducts);
        }

        Ok(links)
    }
}
