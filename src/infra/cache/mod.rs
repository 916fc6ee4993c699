//! Cache backends behind [`CacheBackend`].

mod lock;
mod memory;
mod redis_impl;

pub use memory::MemoryCache;
pub use redis_impl::RedisCache;

use std::sync::Arc;

use tracing::info;

use crate::application::cache::{CacheBackend, CacheError};
use crate::config::{CacheBackendKind, CacheSettings};

/// Open the configured backend and verify it answers.
pub async fn connect(settings: &CacheSettings) -> Result<Arc<dyn CacheBackend>, CacheError> {
    let backend: Arc<dyn CacheBackend> = match settings.backend {
        CacheBackendKind::Redis => Arc::new(RedisCache::connect(settings).await?),
        CacheBackendKind::Memory => {
            info!(
                target = "goods::infra::cache",
                capacity = settings.memory_capacity.get(),
                "Using in-memory cache backend"
            );
            Arc::new(MemoryCache::new(settings.memory_capacity))
        }
    };
    backend.ping().await?;
    Ok(backend)
}
