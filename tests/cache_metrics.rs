use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use time::OffsetDateTime;

use goods_service::application::cache::{
    CacheBackend, GoodsCache, METRIC_CACHE_ERROR, METRIC_CACHE_HIT, METRIC_CACHE_MISS,
};
use goods_service::domain::entities::GoodRecord;
use goods_service::infra::cache::MemoryCache;
use goods_service::infra::telemetry;

fn sample_good(id: i32) -> GoodRecord {
    GoodRecord {
        id,
        project_id: 1,
        name: "Metrics Widget".to_string(),
        description: String::new(),
        priority: 0,
        removed: false,
        created_at: OffsetDateTime::now_utc(),
    }
}

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let backend = Arc::new(MemoryCache::new(
        NonZeroUsize::new(16).expect("non-zero capacity"),
    ));
    let cache = GoodsCache::new(backend.clone(), Duration::from_secs(60));

    // miss, then hit after a write
    assert!(cache.get(1).await.is_err());
    cache.put(&sample_good(1)).await.expect("put");
    assert!(cache.get(1).await.is_ok());

    // undecodable payload
    backend
        .set("2", b"not json", Duration::from_secs(60))
        .await
        .expect("raw set");
    assert!(cache.get(2).await.is_err());

    let counters: HashMap<String, u64> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| match value {
            DebugValue::Counter(count) => Some((composite_key.key().name().to_string(), count)),
            _ => None,
        })
        .collect();

    let names: HashSet<&str> = counters.keys().map(String::as_str).collect();
    for expected in [METRIC_CACHE_HIT, METRIC_CACHE_MISS, METRIC_CACHE_ERROR] {
        assert!(names.contains(expected), "missing metric {expected}");
    }
    assert_eq!(counters[METRIC_CACHE_HIT], 1);
    assert_eq!(counters[METRIC_CACHE_MISS], 1);
    assert_eq!(counters[METRIC_CACHE_ERROR], 1);
}
