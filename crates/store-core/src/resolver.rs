//! # Download Resolver
//!
//! Redeems exactly one token for exactly one file delivery.
//!
//! Per-token state machine: Active -> Redeemed (record deleted) or
//! Expired (record deleted on first post-expiry access). Deletion
//! happens strictly after the deliverable is determined, never
//! before, so an abandoned request cannot burn a token.

use crate::clock::Clock;
use crate::error::{StoreError, StoreResult};
use crate::product::{DownloadKind, ProductCatalog};
use crate::token::TokenStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What the client receives for a redeemed token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Redirect to a vendor-hosted URL
    Redirect { url: String },
    /// File bytes served as a zip attachment
    Attachment { filename: String, bytes: Vec<u8> },
}

/// Attachment filename derived from the product display name
pub fn attachment_filename(product_name: &str) -> String {
    let hyphenated: Vec<&str> = product_name.split_whitespace().collect();
    format!("{}.zip", hyphenated.join("-"))
}

/// Resolves download tokens to deliverables and invalidates them
pub struct DownloadResolver {
    catalog: Arc<ProductCatalog>,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    files_dir: PathBuf,
}

impl DownloadResolver {
    pub fn new(
        catalog: Arc<ProductCatalog>,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
        files_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            store,
            clock,
            files_dir: files_dir.into(),
        }
    }

    /// Redeem a token.
    ///
    /// At most one call ever succeeds per token. A missing protected
    /// file does NOT consume the token: the link was valid, and a
    /// storage hiccup should not burn the buyer's one-time download.
    pub async fn resolve(&self, token: &str) -> StoreResult<Delivery> {
        let Some(record) = self.store.get(token) else {
            return Err(StoreError::InvalidOrExpiredToken);
        };

        if record.is_expired(self.clock.now()) {
            // lazy sweep: first post-expiry access removes the record
            self.store.delete(token);
            info!(%token, "expired download token swept");
            return Err(StoreError::LinkExpired);
        }

        let product_id = record
            .product_ids
            .first()
            .ok_or_else(|| StoreError::Internal("redemption record with no product".into()))?;

        let Some(product) = self.catalog.get(product_id) else {
            // catalog/token desync is our bug, not the buyer's
            error!(%product_id, "token references product missing from catalog");
            return Err(StoreError::ProductNotFound {
                product_id: product_id.clone(),
            });
        };

        match &product.download {
            DownloadKind::Remote { url } => {
                // deliverable determined; invalidate before handing out
                // the redirect. A lost race means another request
                // already redeemed this token.
                if !self.store.delete(token) {
                    return Err(StoreError::InvalidOrExpiredToken);
                }
                info!(product_id = %product.id, "redeemed token for remote download");
                Ok(Delivery::Redirect { url: url.clone() })
            }
            DownloadKind::File { file } => {
                let path = self.files_dir.join(file);
                let bytes = match tokio::fs::read(&path).await {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!(path = %path.display(), %err, "protected file missing, token preserved");
                        return Err(StoreError::FileNotFound {
                            path: path.display().to_string(),
                        });
                    }
                };

                // invalidate only after the buffer is fully in hand
                if !self.store.delete(token) {
                    return Err(StoreError::InvalidOrExpiredToken);
                }
                info!(product_id = %product.id, size = bytes.len(), "redeemed token for file download");
                Ok(Delivery::Attachment {
                    filename: attachment_filename(&product.name),
                    bytes,
                })
            }
        }
    }

    /// Directory protected files are served from
    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::issuer::TokenIssuer;
    use crate::product::{Currency, Price, Product};
    use crate::token::{InMemoryTokenStore, RedemptionRecord};
    use chrono::{Duration, Utc};

    struct Fixture {
        store: Arc<InMemoryTokenStore>,
        clock: Arc<ManualClock>,
        issuer: TokenIssuer,
        resolver: DownloadResolver,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("elementor-pro.zip"), b"PK\x03\x04elementor").unwrap();

        let catalog = Arc::new(
            ProductCatalog::new()
                .with_product(Product::file(
                    "elementor-pro",
                    "Elementor Pro",
                    Price::new(49.99, Currency::USD),
                    "elementor-pro.zip",
                ))
                .with_product(Product::remote(
                    "wp-rocket-premium",
                    "WP Rocket Premium",
                    Price::new(59.00, Currency::USD),
                    "https://vendor.example/wp-rocket.zip",
                ))
                .with_product(Product::file(
                    "rank-math-pro",
                    "Rank Math Pro",
                    Price::new(59.99, Currency::USD),
                    "rank-math-pro.zip", // intentionally not on disk
                )),
        );

        let store = Arc::new(InMemoryTokenStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));

        let issuer = TokenIssuer::new(
            Arc::clone(&catalog),
            Arc::clone(&store) as Arc<dyn TokenStore>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            "https://plugmart.store",
        );
        let resolver = DownloadResolver::new(
            catalog,
            Arc::clone(&store) as Arc<dyn TokenStore>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            dir.path(),
        );

        Fixture {
            store,
            clock,
            issuer,
            resolver,
            _dir: dir,
        }
    }

    fn issued_token(fx: &Fixture, product_id: &str) -> String {
        let links = fx.issuer.issue(&[product_id.to_string()]).unwrap();
        links[0].url.rsplit('/').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_unknown_token_is_invalid() {
        let fx = fixture();
        let err = fx.resolver.resolve("deadbeef").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn test_remote_product_redeems_once() {
        let fx = fixture();
        let token = issued_token(&fx, "wp-rocket-premium");

        let delivery = fx.resolver.resolve(&token).await.unwrap();
        assert_eq!(
            delivery,
            Delivery::Redirect {
                url: "https://vendor.example/wp-rocket.zip".into()
            }
        );
        // deleted after resolution, so the second attempt fails
        assert!(fx.store.get(&token).is_none());

        let err = fx.resolver.resolve(&token).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn test_file_product_serves_zip_attachment() {
        let fx = fixture();
        let token = issued_token(&fx, "elementor-pro");

        match fx.resolver.resolve(&token).await.unwrap() {
            Delivery::Attachment { filename, bytes } => {
                assert_eq!(filename, "Elementor-Pro.zip");
                assert_eq!(bytes, b"PK\x03\x04elementor");
            }
            other => panic!("expected attachment, got {:?}", other),
        }

        let err = fx.resolver.resolve(&token).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn test_expired_token_gives_gone_then_not_found() {
        let fx = fixture();
        let token = issued_token(&fx, "elementor-pro");

        fx.clock.advance(Duration::minutes(16));

        let err = fx.resolver.resolve(&token).await.unwrap_err();
        assert!(matches!(err, StoreError::LinkExpired));
        // record deleted on first post-expiry access
        assert!(fx.store.get(&token).is_none());

        let err = fx.resolver.resolve(&token).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn test_missing_file_preserves_token_for_retry() {
        let fx = fixture();
        let token = issued_token(&fx, "rank-math-pro");

        let err = fx.resolver.resolve(&token).await.unwrap_err();
        assert!(matches!(err, StoreError::FileNotFound { .. }));
        // token still present: retry allowed after the file appears
        assert!(fx.store.get(&token).is_some());

        std::fs::write(fx.resolver.files_dir().join("rank-math-pro.zip"), b"PK\x03\x04rank").unwrap();
        let delivery = fx.resolver.resolve(&token).await.unwrap();
        assert!(matches!(delivery, Delivery::Attachment { .. }));
        assert!(fx.store.get(&token).is_none());
    }

    #[tokio::test]
    async fn test_catalog_desync_surfaces_product_not_found() {
        let fx = fixture();
        fx.store
            .put(RedemptionRecord::new(
                "orphan",
                vec!["discontinued-plugin".to_string()],
                fx.clock.now() + Duration::minutes(15),
            ))
            .unwrap();

        let err = fx.resolver.resolve("orphan").await.unwrap_err();
        assert!(matches!(err, StoreError::ProductNotFound { .. }));
        // record is left in place: this is a data bug, not a redemption
        assert!(fx.store.get("orphan").is_some());
    }

    #[tokio::test]
    async fn test_issue_two_resolve_each_exactly_once() {
        let fx = fixture();
        std::fs::write(fx.resolver.files_dir().join("rank-math-pro.zip"), b"PK\x03\x04rank").unwrap();

        let links = fx
            .issuer
            .issue(&["elementor-pro".to_string(), "rank-math-pro".to_string()])
            .unwrap();
        let tokens: Vec<String> = links
            .iter()
            .map(|l| l.url.rsplit('/').next().unwrap().to_string())
            .collect();

        // resolution order does not matter
        for token in tokens.iter().rev() {
            assert!(fx.resolver.resolve(token).await.is_ok());
        }
        for token in &tokens {
            assert!(matches!(
                fx.resolver.resolve(token).await.unwrap_err(),
                StoreError::InvalidOrExpiredToken
            ));
        }
    }

    #[test]
    fn test_attachment_filename() {
        assert_eq!(attachment_filename("Elementor Pro"), "Elementor-Pro.zip");
        assert_eq!(
            attachment_filename("WP  Rocket   Premium"),
            "WP-Rocket-Premium.zip"
        );
        assert_eq!(attachment_filename("Single"), "Single.zip");
    }
}
