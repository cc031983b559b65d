//! Integration tests for the resolution engine.
//!
//! These exercise the full resolve → fallback → expand pipeline against
//! an in-memory store, plus fault-injecting store doubles for the
//! failure-path guarantees.

use async_trait::async_trait;
use confserve::error::{ResolveError, StoreError, StoreResult};
use confserve::resolve::Engine;
use confserve::store::{MemoryStore, Store};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// Helper to build an engine over a seeded in-memory store.
fn engine_with(entries: &[(&str, Value)]) -> Engine {
    let store = MemoryStore::new();
    for (path, value) in entries {
        store.seed(path, value.clone());
    }
    Engine::new(Arc::new(store))
}

/// Store double that fails lookups for selected paths and delegates the
/// rest.
struct FailingStore {
    inner: MemoryStore,
    fail_paths: Vec<String>,
}

impl FailingStore {
    fn new(fail_paths: &[&str]) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_paths: fail_paths.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Store for FailingStore {
    async fn get_value(&self, path: &str) -> StoreResult<Option<Value>> {
        if self.fail_paths.iter().any(|p| p == path) {
            return Err(StoreError::Backend("injected failure".to_string()));
        }
        self.inner.get_value(path).await
    }

    async fn set_value(&self, path: &str, value: &Value) -> StoreResult<()> {
        self.inner.set_value(path, value).await
    }

    async fn delete_value(&self, path: &str) -> StoreResult<bool> {
        self.inner.delete_value(path).await
    }

    async fn is_authorized(&self, key: &str) -> StoreResult<bool> {
        self.inner.is_authorized(key).await
    }

    async fn create_key(&self, key: &str) -> StoreResult<()> {
        self.inner.create_key(key).await
    }

    async fn delete_key(&self, key: &str) -> StoreResult<bool> {
        self.inner.delete_key(key).await
    }
}

/// Store double that delays every lookup.
struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

#[async_trait]
impl Store for SlowStore {
    async fn get_value(&self, path: &str) -> StoreResult<Option<Value>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_value(path).await
    }

    async fn set_value(&self, path: &str, value: &Value) -> StoreResult<()> {
        self.inner.set_value(path, value).await
    }

    async fn delete_value(&self, path: &str) -> StoreResult<bool> {
        self.inner.delete_value(path).await
    }

    async fn is_authorized(&self, key: &str) -> StoreResult<bool> {
        self.inner.is_authorized(key).await
    }

    async fn create_key(&self, key: &str) -> StoreResult<()> {
        self.inner.create_key(key).await
    }

    async fn delete_key(&self, key: &str) -> StoreResult<bool> {
        self.inner.delete_key(key).await
    }
}

mod lookup {
    use super::*;

    #[tokio::test]
    async fn scalar_documents_pass_through_unchanged() {
        let engine = engine_with(&[(".prod.answer", json!(42))]);

        let resolved = engine.get_config("answer", "prod").await.unwrap();

        assert_eq!(resolved, Some(json!(42)));
    }

    #[tokio::test]
    async fn missing_path_resolves_to_none() {
        let engine = engine_with(&[]);

        let resolved = engine.get_config("nowhere", "prod").await.unwrap();

        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn absolute_paths_ignore_the_request_environment() {
        let engine = engine_with(&[(".staging.db", json!({"host": "s1"}))]);

        let resolved = engine.get_config(".staging.db", "prod").await.unwrap();

        assert_eq!(resolved, Some(json!({"host": "s1"})));
    }

    #[tokio::test]
    async fn fresh_context_per_top_level_call() {
        let engine = engine_with(&[(".prod.db", json!({"host": "db1"}))]);

        // The visited set must not leak between calls: the second read of
        // the same path succeeds rather than tripping the cycle guard.
        let first = engine.get_config("db", "prod").await.unwrap();
        let second = engine.get_config("db", "prod").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second, Some(json!({"host": "db1"})));
    }
}

mod wildcard {
    use super::*;

    #[tokio::test]
    async fn falls_back_to_catch_all_when_exact_is_absent() {
        let engine = engine_with(&[(".*.service.x", json!({"pool": 4}))]);

        let resolved = engine.get_config("service.x", "prod").await.unwrap();

        assert_eq!(resolved, Some(json!({"pool": 4})));
    }

    #[tokio::test]
    async fn exact_path_wins_over_catch_all() {
        let engine = engine_with(&[
            (".prod.service.x", json!({"pool": 16})),
            (".*.service.x", json!({"pool": 4})),
        ]);

        let resolved = engine.get_config("service.x", "prod").await.unwrap();

        assert_eq!(resolved, Some(json!({"pool": 16})));
    }

    #[tokio::test]
    async fn wildcard_requests_do_not_fall_back_to_themselves() {
        let engine = engine_with(&[]);

        let resolved = engine.get_config("service.x", "*").await.unwrap();

        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn store_failure_on_exact_path_skips_the_fallback() {
        let store = FailingStore::new(&[".prod.service.x"]);
        store.inner.seed(".*.service.x", json!({"pool": 4}));
        let engine = Engine::new(Arc::new(store));

        let result = engine.get_config("service.x", "prod").await;

        // Failure is not absence: the catch-all value must not be served.
        assert!(matches!(
            result,
            Err(ResolveError::Store(StoreError::Backend(_)))
        ));
    }
}

mod extends {
    use super::*;

    #[tokio::test]
    async fn end_to_end_extend_with_override() {
        let engine = engine_with(&[
            (".prod.db", json!({"host": "h1"})),
            (
                ".prod.app",
                json!({"__extend": "db", "__override": {"port": 5432}}),
            ),
        ]);

        let resolved = engine.get_config("app", "prod").await.unwrap();

        assert_eq!(resolved, Some(json!({"host": "h1", "port": 5432})));
    }

    #[tokio::test]
    async fn override_keys_win_over_target_keys() {
        let engine = engine_with(&[
            (".prod.base", json!({"a": 1, "b": 2})),
            (
                ".prod.derived",
                json!({"__extend": "base", "__override": {"b": 3, "c": 4}}),
            ),
        ]);

        let resolved = engine.get_config("derived", "prod").await.unwrap();

        assert_eq!(resolved, Some(json!({"a": 1, "b": 3, "c": 4})));
    }

    #[tokio::test]
    async fn override_applies_after_the_target_is_fully_expanded() {
        let engine = engine_with(&[
            (".prod.leaf", json!({"x": 1, "y": 2})),
            (".prod.mid", json!({"__extend": "leaf"})),
            (
                ".prod.top",
                json!({"__extend": "mid", "__override": {"y": 9}}),
            ),
        ]);

        let resolved = engine.get_config("top", "prod").await.unwrap();

        assert_eq!(resolved, Some(json!({"x": 1, "y": 9})));
    }

    #[tokio::test]
    async fn nested_directives_resolve_in_place() {
        let engine = engine_with(&[
            (".prod.creds", json!({"user": "svc"})),
            (
                ".prod.app",
                json!({
                    "name": "app",
                    "db": {"__extend": "creds"},
                    "list": [1, {"__extend": "creds"}]
                }),
            ),
        ]);

        let resolved = engine.get_config("app", "prod").await.unwrap();

        assert_eq!(
            resolved,
            Some(json!({
                "name": "app",
                "db": {"user": "svc"},
                "list": [1, {"user": "svc"}]
            }))
        );
    }

    #[tokio::test]
    async fn relative_targets_resolve_in_the_top_level_environment() {
        // `.staging.b` extends the relative path "c". Relative paths bind
        // to the environment of the in-flight request (prod), not to the
        // environment of the document that mentions them (staging).
        let engine = engine_with(&[
            (".prod.a", json!({"__extend": ".staging.b"})),
            (".staging.b", json!({"inner": {"__extend": "c"}})),
            (".prod.c", json!("from-prod")),
            (".staging.c", json!("from-staging")),
        ]);

        let resolved = engine.get_config("a", "prod").await.unwrap();

        assert_eq!(resolved, Some(json!({"inner": "from-prod"})));
    }

    #[tokio::test]
    async fn extend_target_found_via_wildcard_fallback() {
        let engine = engine_with(&[
            (".*.defaults", json!({"retries": 3})),
            (".prod.app", json!({"__extend": "defaults"})),
        ]);

        let resolved = engine.get_config("app", "prod").await.unwrap();

        assert_eq!(resolved, Some(json!({"retries": 3})));
    }

    #[tokio::test]
    async fn missing_extend_target_becomes_null() {
        let engine = engine_with(&[(
            ".prod.app",
            json!({"keep": true, "gone": {"__extend": "absent"}}),
        )]);

        let resolved = engine.get_config("app", "prod").await.unwrap();

        assert_eq!(resolved, Some(json!({"keep": true, "gone": null})));
    }

    #[tokio::test]
    async fn failing_extend_target_fails_the_whole_document() {
        let store = FailingStore::new(&[".prod.bad"]);
        store.inner.seed(
            ".prod.app",
            json!({"ok": {"__extend": "good"}, "broken": {"__extend": "bad"}}),
        );
        store.inner.seed(".prod.good", json!(1));
        let engine = Engine::new(Arc::new(store));

        let result = engine.get_config("app", "prod").await;

        assert!(matches!(result, Err(ResolveError::Store(_))));
    }

    #[tokio::test]
    async fn already_expanded_documents_are_returned_unchanged() {
        let doc = json!({
            "host": "db1",
            "ports": [5432, 5433],
            "nested": {"flag": true, "label": null}
        });
        let engine = engine_with(&[(".prod.app", doc.clone())]);

        let resolved = engine.get_config("app", "prod").await.unwrap();

        assert_eq!(resolved, Some(doc));
    }
}

mod cycles {
    use super::*;

    #[tokio::test]
    async fn mutual_extend_terminates_with_one_side_absent() {
        let engine = engine_with(&[
            (".prod.a", json!({"__extend": "b"})),
            (".prod.b", json!({"__extend": "a"})),
        ]);

        // Must not hang; the inner re-reference resolves to absent.
        let resolved = engine.get_config("a", "prod").await.unwrap();

        assert_eq!(resolved, Some(json!(null)));
    }

    #[tokio::test]
    async fn self_reference_resolves_the_rest_of_the_document() {
        let engine = engine_with(&[(
            ".prod.x",
            json!({"name": "x", "loop": {"__extend": "x"}}),
        )]);

        let resolved = engine.get_config("x", "prod").await.unwrap();

        assert_eq!(resolved, Some(json!({"name": "x", "loop": null})));
    }

    #[tokio::test]
    async fn shared_target_is_resolved_once_per_request() {
        // Two siblings extending the same path race on the visited set;
        // exactly one wins, the other resolves to absent. Either way the
        // call terminates and the winning side carries the value.
        let engine = engine_with(&[
            (".prod.shared", json!({"v": 1})),
            (
                ".prod.app",
                json!({"a": {"__extend": "shared"}, "b": {"__extend": "shared"}}),
            ),
        ]);

        let resolved = engine.get_config("app", "prod").await.unwrap().unwrap();

        let a = &resolved["a"];
        let b = &resolved["b"];
        let winners = [a, b]
            .into_iter()
            .filter(|v| **v == json!({"v": 1}))
            .count();
        let absents = [a, b].into_iter().filter(|v| **v == json!(null)).count();
        assert_eq!((winners, absents), (1, 1));
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn sibling_fan_out_is_deterministic_regardless_of_completion_order() {
        let engine = engine_with(&[
            (".prod.left", json!({"side": "left"})),
            (".prod.right", json!({"side": "right"})),
            (
                ".prod.app",
                json!({"l": {"__extend": "left"}, "r": {"__extend": "right"}}),
            ),
        ]);

        let expected = json!({"l": {"side": "left"}, "r": {"side": "right"}});
        for _ in 0..20 {
            let resolved = engine.get_config("app", "prod").await.unwrap();
            assert_eq!(resolved, Some(expected.clone()));
        }
    }

    #[tokio::test]
    async fn slow_store_trips_the_deadline() {
        let store = SlowStore {
            inner: MemoryStore::new(),
            delay: Duration::from_millis(200),
        };
        store.inner.seed(".prod.db", json!({"host": "db1"}));
        let engine = Engine::new(Arc::new(store)).with_deadline(Duration::from_millis(20));

        let result = engine.get_config("db", "prod").await;

        assert!(matches!(result, Err(ResolveError::Timeout)));
    }

    #[tokio::test]
    async fn deadline_covers_nested_sub_resolutions() {
        let store = SlowStore {
            inner: MemoryStore::new(),
            delay: Duration::from_millis(60),
        };
        store.inner.seed(".prod.a", json!({"__extend": "b"}));
        store.inner.seed(".prod.b", json!({"__extend": "c"}));
        store.inner.seed(".prod.c", json!(1));
        // Each hop pays the delay; three hops cannot fit in the budget.
        let engine = Engine::new(Arc::new(store)).with_deadline(Duration::from_millis(100));

        let result = engine.get_config("a", "prod").await;

        assert!(matches!(result, Err(ResolveError::Timeout)));
    }
}
