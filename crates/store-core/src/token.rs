//! # Download Token Store
//!
//! Process-lifetime registry of outstanding redemption tokens.
//! Tokens live in memory only; a restart discards all outstanding
//! links. This is a known operational limitation, not a bug — a
//! durable TTL-capable store can be swapped in behind `TokenStore`.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Mutex;

/// Bytes of entropy per download token (hex-encoded to 40 chars)
const TOKEN_BYTES: usize = 20;

/// Generate a fresh unguessable download token (160 bits, hex)
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// A single outstanding download entitlement.
///
/// Records are created once and deleted once; they are never mutated
/// in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionRecord {
    /// Opaque unguessable key, unique per issuance, never reused
    pub token: String,

    /// Product identifiers this token entitles (currently always one)
    pub product_ids: Vec<String>,

    /// Absolute expiry, fixed at creation
    pub expires_at: DateTime<Utc>,
}

impl RedemptionRecord {
    pub fn new(
        token: impl Into<String>,
        product_ids: Vec<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token: token.into(),
            product_ids,
            expires_at,
        }
    }

    /// Whether the record is past its expiry at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Authoritative registry of outstanding redemption tokens.
///
/// `get` is a pure lookup: expiry enforcement is the caller's job,
/// so an expired record stays visible until something observes it.
/// `delete` returns whether a record was actually removed — under
/// concurrent redemption of the same token exactly one caller wins.
pub trait TokenStore: Send + Sync {
    /// Insert a new record. Fails on a duplicate token, which must
    /// not occur given random generation.
    fn put(&self, record: RedemptionRecord) -> StoreResult<()>;

    /// Pure lookup, no side effects
    fn get(&self, token: &str) -> Option<RedemptionRecord>;

    /// Idempotent removal; true if a record was present
    fn delete(&self, token: &str) -> bool;
}

/// In-memory token store, lifetime = process lifetime
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    records: Mutex<HashMap<String, RedemptionRecord>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding tokens (diagnostics)
    pub fn len(&self) -> usize {
        self.records.lock().expect("token store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TokenStore for InMemoryTokenStore {
    fn put(&self, record: RedemptionRecord) -> StoreResult<()> {
        let mut records = self.records.lock().expect("token store mutex poisoned");
        if records.contains_key(&record.token) {
            return Err(StoreError::Internal(format!(
                "duplicate download token: {}",
                record.token
            )));
        }
        records.insert(record.token.clone(), record);
        Ok(())
    }

    fn get(&self, token: &str) -> Option<RedemptionRecord> {
        self.records
            .lock()
            .expect("token store mutex poisoned")
            .get(token)
            .cloned()
    }

    fn delete(&self, token: &str) -> bool {
        self.records
            .lock()
            .expect("token store mutex poisoned")
            .remove(token)
            .is_some()
    }
}
