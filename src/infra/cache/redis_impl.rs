//! Redis cache backend.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use tracing::info;
use url::Url;

use crate::application::cache::{CacheBackend, CacheError};
use crate::config::CacheSettings;

/// Redis backend over a reconnecting connection manager.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(settings: &CacheSettings) -> Result<Self, CacheError> {
        let url = connection_url(settings)?;
        let client = redis::Client::open(url.as_str()).map_err(CacheError::transport)?;
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(settings.max_retries)
            .set_connection_timeout(settings.dial_timeout)
            .set_response_timeout(settings.timeout);
        let conn = ConnectionManager::new_with_config(client, config)
            .await
            .map_err(CacheError::transport)?;

        info!(
            target = "goods::infra::cache::redis",
            addr = %settings.addr,
            db = settings.db,
            "Connected to Redis"
        );
        Ok(Self { conn })
    }
}

/// `redis://[user[:password]@]host:port/db`
fn connection_url(settings: &CacheSettings) -> Result<Url, CacheError> {
    let invalid = |reason: &str| {
        CacheError::Transport(format!("invalid redis address `{}`: {reason}", settings.addr))
    };

    let mut url = Url::parse(&format!("redis://{}", settings.addr))
        .map_err(|err| invalid(&err.to_string()))?;
    if let Some(user) = settings.user.as_deref() {
        url.set_username(user)
            .map_err(|()| invalid("username not accepted"))?;
    }
    if let Some(password) = settings.password.as_deref() {
        url.set_password(Some(password))
            .map_err(|()| invalid("password not accepted"))?;
    }
    url.set_path(&format!("/{}", settings.db));
    Ok(url)
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(CacheError::transport)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(CacheError::transport)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::transport)?;
        Ok(())
    }
}
