//! Redis backend tests. Skipped when no server answers at `REDIS_ADDR`
//! (default `localhost:6379`).

use std::time::Duration;

use time::OffsetDateTime;
use uuid::Uuid;

use goods_service::application::cache::{CacheBackend, CacheError, GoodsCache};
use goods_service::config::CacheSettings;
use goods_service::domain::entities::GoodRecord;
use goods_service::infra::cache::RedisCache;

fn settings() -> CacheSettings {
    CacheSettings {
        addr: std::env::var("REDIS_ADDR").unwrap_or_else(|_| "localhost:6379".to_string()),
        max_retries: 0,
        dial_timeout: Duration::from_secs(1),
        timeout: Duration::from_secs(1),
        ..CacheSettings::default()
    }
}

async fn get_test_cache() -> Option<RedisCache> {
    let cache = RedisCache::connect(&settings()).await.ok()?;
    cache.ping().await.ok()?;
    Some(cache)
}

#[tokio::test]
async fn set_then_get_round_trips_bytes() {
    let Some(cache) = get_test_cache().await else {
        eprintln!("Skipping test: Redis not available");
        return;
    };

    let key = format!("test:goods:{}", Uuid::new_v4());
    cache
        .set(&key, b"payload", Duration::from_secs(30))
        .await
        .expect("set");

    assert_eq!(cache.get(&key).await.expect("get"), Some(b"payload".to_vec()));
}

#[tokio::test]
async fn absent_key_reads_as_none() {
    let Some(cache) = get_test_cache().await else {
        eprintln!("Skipping test: Redis not available");
        return;
    };

    let key = format!("test:goods:{}", Uuid::new_v4());
    assert_eq!(cache.get(&key).await.expect("get"), None);
}

#[tokio::test]
async fn entries_expire_after_ttl() {
    let Some(cache) = get_test_cache().await else {
        eprintln!("Skipping test: Redis not available");
        return;
    };

    let key = format!("test:goods:{}", Uuid::new_v4());
    cache
        .set(&key, b"short lived", Duration::from_secs(1))
        .await
        .expect("set");
    tokio::time::sleep(Duration::from_millis(2100)).await;

    assert_eq!(cache.get(&key).await.expect("get"), None);
}

#[tokio::test]
async fn goods_cache_overwrites_by_id() {
    let Some(cache) = get_test_cache().await else {
        eprintln!("Skipping test: Redis not available");
        return;
    };

    // Ids far from anything a dev database would use.
    let id = i32::MAX - (Uuid::new_v4().as_u128() % 1_000_000) as i32;
    let goods = GoodsCache::new(std::sync::Arc::new(cache), Duration::from_secs(30));
    let mut good = GoodRecord {
        id,
        project_id: 1,
        name: "Widget".to_string(),
        description: String::new(),
        priority: 0,
        removed: false,
        created_at: OffsetDateTime::now_utc(),
    };
    goods.put(&good).await.expect("put");
    good.removed = true;
    goods.put(&good).await.expect("overwrite");

    let cached = goods.get(id).await.expect("cached good");
    assert!(cached.removed);
}

#[tokio::test]
async fn unreachable_server_fails_to_connect() {
    let settings = CacheSettings {
        addr: "127.0.0.1:1".to_string(),
        max_retries: 0,
        dial_timeout: Duration::from_millis(200),
        ..CacheSettings::default()
    };

    let result = RedisCache::connect(&settings).await;
    assert!(matches!(result, Err(CacheError::Transport(_))));
}
