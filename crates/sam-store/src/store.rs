//! The latest-value store.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::path::{PathToken, resolve};

/// Reserved key holding the epoch-millisecond time of the latest frame.
pub const LIVENESS_KEY: &str = "lastMessageTimestamp";

/// Latest decoded payload per metric name.
///
/// Cloning yields another handle to the same store. Every write replaces one
/// whole entry under the lock, so readers see either the previous or the new
/// payload of a metric, never a mix. Entries are never removed.
#[derive(Clone, Debug, Default)]
pub struct ValueStore {
    inner: Arc<RwLock<Map<String, Value>>>,
}

impl ValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the value of `metric` wholesale.
    pub fn set(&self, metric: impl Into<String>, value: Value) {
        let _ = self.inner.write().insert(metric.into(), value);
    }

    /// Record that a frame arrived at `now_ms`.
    pub fn touch(&self, now_ms: i64) {
        self.set(LIVENESS_KEY, Value::from(now_ms));
    }

    /// Time of the latest frame, if any has arrived.
    pub fn liveness(&self) -> Option<i64> {
        self.inner.read().get(LIVENESS_KEY).and_then(Value::as_i64)
    }

    /// Resolve `path` from the store root.
    ///
    /// The first token names the metric; the rest walk into its payload.
    /// Only the addressed fragment is cloned.
    pub fn get(&self, path: &[PathToken]) -> Option<Value> {
        let guard = self.inner.read();
        let (first, rest) = path.split_first()?;
        let entry = match first {
            PathToken::Key(key) => guard.get(key)?,
            PathToken::Index(index) => guard.get(&index.to_string())?,
            PathToken::Find { .. } => return None,
        };
        resolve(entry, rest).cloned()
    }

    /// Whole-store copy, e.g. for the JSON snapshot endpoint.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.inner.read().clone())
    }

    /// Number of stored keys, the liveness key included.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::path;

    #[test]
    fn new_store_is_empty() {
        let store = ValueStore::new();
        assert!(store.is_empty());
        assert_eq!(store.snapshot(), json!({}));
        assert_eq!(store.liveness(), None);
    }

    #[test]
    fn set_replaces_wholesale() {
        let store = ValueStore::new();
        store.set("hull/currentState", json!({"pressure": 7.0, "flow": 3.0}));
        store.set("hull/currentState", json!({"pressure": 7.5}));
        assert_eq!(store.get(&path!["hull/currentState", "pressure"]), Some(json!(7.5)));
        assert_eq!(store.get(&path!["hull/currentState", "flow"]), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn touch_updates_liveness() {
        let store = ValueStore::new();
        store.touch(1_000);
        store.touch(2_000);
        assert_eq!(store.liveness(), Some(2_000));
        assert_eq!(store.get(&path![LIVENESS_KEY]), Some(json!(2_000)));
    }

    #[test]
    fn get_missing_metric_is_absent() {
        let store = ValueStore::new();
        assert_eq!(store.get(&path!["no/such/key"]), None);
        assert_eq!(store.get(&[]), None);
    }

    #[test]
    fn get_with_find_on_root_is_absent() {
        let store = ValueStore::new();
        store.set("a", json!(1));
        assert_eq!(store.get(&[PathToken::find("a", "1")]), None);
    }

    #[test]
    fn clones_share_state() {
        let store = ValueStore::new();
        let reader = store.clone();
        store.set("m", json!("v"));
        assert_eq!(reader.get(&path!["m"]), Some(json!("v")));
    }

    #[test]
    fn snapshot_contains_everything() {
        let store = ValueStore::new();
        store.set("a", json!(1));
        store.touch(5);
        assert_eq!(store.snapshot(), json!({"a": 1, LIVENESS_KEY: 5}));
    }

    #[tokio::test]
    async fn concurrent_readers_see_whole_values() {
        let store = ValueStore::new();
        let writer = store.clone();
        let handle = tokio::spawn(async move {
            for i in 0..500 {
                writer.set("m", json!({"a": i, "b": i}));
                tokio::task::yield_now().await;
            }
        });
        for _ in 0..500 {
            if let Some(v) = store.get(&path!["m"]) {
                assert_eq!(v["a"], v["b"]);
            }
            tokio::task::yield_now().await;
        }
        handle.await.unwrap();
    }
}
