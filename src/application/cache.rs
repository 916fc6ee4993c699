//! Typed read-through cache for goods on top of a byte-level backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;

use crate::domain::entities::GoodRecord;

pub const METRIC_CACHE_HIT: &str = "goods_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "goods_cache_miss_total";
pub const METRIC_CACHE_ERROR: &str = "goods_cache_error_total";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache entry `{key}` not found")]
    NotFound { key: String },
    #[error("cache transport error: {0}")]
    Transport(String),
    #[error("cache encode error: {0}")]
    Encode(String),
    #[error("cache decode error: {0}")]
    Decode(String),
}

impl CacheError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Byte-level key/value store with per-entry expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// `Ok(None)` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Overwrites any existing value under `key`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}

#[derive(Clone)]
pub struct GoodsCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl GoodsCache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub fn key(id: i32) -> String {
        id.to_string()
    }

    pub async fn put(&self, good: &GoodRecord) -> Result<(), CacheError> {
        let payload =
            serde_json::to_vec(good).map_err(|err| CacheError::Encode(err.to_string()))?;
        self.backend
            .set(&Self::key(good.id), &payload, self.ttl)
            .await
            .inspect_err(|_| counter!(METRIC_CACHE_ERROR).increment(1))
    }

    pub async fn get(&self, id: i32) -> Result<GoodRecord, CacheError> {
        let key = Self::key(id);
        let payload = match self.backend.get(&key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                counter!(METRIC_CACHE_MISS).increment(1);
                return Err(CacheError::NotFound { key });
            }
            Err(err) => {
                counter!(METRIC_CACHE_ERROR).increment(1);
                return Err(err);
            }
        };

        match serde_json::from_slice::<GoodRecord>(&payload) {
            Ok(good) => {
                counter!(METRIC_CACHE_HIT).increment(1);
                Ok(good)
            }
            Err(err) => {
                counter!(METRIC_CACHE_ERROR).increment(1);
                Err(CacheError::Decode(err.to_string()))
            }
        }
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        self.backend.ping().await
    }
}
