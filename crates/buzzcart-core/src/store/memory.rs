//! In-process document store.
//!
//! Holds the whole tree in memory behind a mutex. Paths can be denied to
//! simulate backend rule failures, which is how the follow protocol's
//! partial-failure behaviour is exercised in tests.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::debug;
use ulid::Generator;

use super::tree;
use super::watch::Watchers;
use super::{RemoteStore, StoreEvent, StorePath, Subscription, SubscriptionId, TransactionOutcome};
use crate::error::{BuzzError, BuzzResult};

struct Inner {
    root: Mutex<Value>,
    keys: Mutex<Generator>,
    denied: Mutex<Vec<StorePath>>,
    watchers: Watchers,
}

/// In-memory [`RemoteStore`]
///
/// Cloning yields another handle onto the same tree.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                root: Mutex::new(Value::Object(Map::new())),
                keys: Mutex::new(Generator::new()),
                denied: Mutex::new(Vec::new()),
                watchers: Watchers::default(),
            }),
        }
    }

    /// Write a value synchronously, bypassing denials. For fixtures.
    pub fn seed(&self, path: &str, value: Value) -> BuzzResult<()> {
        let path = StorePath::parse(path)?;
        tree::set(&mut self.inner.root.lock(), path.segments(), value);
        self.notify(&path);
        Ok(())
    }

    /// Read a value synchronously, bypassing denials. For assertions.
    pub fn snapshot(&self, path: &str) -> BuzzResult<Option<Value>> {
        let path = StorePath::parse(path)?;
        Ok(self.read_now(&path))
    }

    /// Make every operation on `path` or below fail with `PermissionDenied`
    pub fn deny(&self, path: &str) -> BuzzResult<()> {
        let path = StorePath::parse(path)?;
        self.inner.denied.lock().push(path);
        Ok(())
    }

    /// Lift all denials
    pub fn allow_all(&self) {
        self.inner.denied.lock().clear();
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.inner.watchers.count()
    }

    fn check(&self, path: &StorePath) -> BuzzResult<()> {
        if self.inner.denied.lock().iter().any(|d| d.is_prefix_of(path)) {
            debug!(%path, "Denied store operation");
            return Err(BuzzError::PermissionDenied(path.to_string()));
        }
        Ok(())
    }

    fn read_now(&self, path: &StorePath) -> Option<Value> {
        tree::get(&self.inner.root.lock(), path.segments()).cloned()
    }

    fn notify(&self, path: &StorePath) {
        self.inner
            .watchers
            .notify(path, |watched| StoreEvent::Changed(self.read_now(watched)));
    }

    fn next_key(&self) -> String {
        let mut keys = self.inner.keys.lock();
        match keys.generate() {
            Ok(ulid) => ulid.to_string(),
            // Generator overflowed within one millisecond
            Err(_) => ulid::Ulid::new().to_string(),
        }
    }
}

impl RemoteStore for MemoryStore {
    async fn read_once(&self, path: &StorePath) -> BuzzResult<Option<Value>> {
        self.check(path)?;
        Ok(self.read_now(path))
    }

    async fn write(&self, path: &StorePath, value: Value) -> BuzzResult<()> {
        self.check(path)?;
        tree::set(&mut self.inner.root.lock(), path.segments(), value);
        self.notify(path);
        Ok(())
    }

    async fn append_child(&self, path: &StorePath, value: Value) -> BuzzResult<String> {
        self.check(path)?;
        let key = self.next_key();
        let child = path.child(&key)?;
        tree::set(&mut self.inner.root.lock(), child.segments(), value);
        self.notify(&child);
        Ok(key)
    }

    async fn remove_child<F>(&self, path: &StorePath, matches: F) -> BuzzResult<bool>
    where
        F: Fn(&Value) -> bool + Send,
    {
        self.check(path)?;
        let removed = {
            let mut root = self.inner.root.lock();
            match tree::find_child(tree::get(&root, path.segments()), &matches) {
                Some(key) => {
                    let child = path.child(&key)?;
                    tree::set(&mut root, child.segments(), Value::Null);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.notify(path);
        }
        Ok(removed)
    }

    async fn transact_number<F>(&self, path: &StorePath, update: F) -> BuzzResult<TransactionOutcome>
    where
        F: FnOnce(i64) -> i64 + Send,
    {
        self.check(path)?;
        let outcome = {
            let mut root = self.inner.root.lock();
            match tree::as_counter(tree::get(&root, path.segments())) {
                Some(current) => {
                    let next = update(current);
                    tree::set(&mut root, path.segments(), Value::from(next));
                    TransactionOutcome::Committed(next)
                }
                None => TransactionOutcome::Aborted,
            }
        };
        if let TransactionOutcome::Committed(_) = outcome {
            self.notify(path);
        }
        Ok(outcome)
    }

    fn subscribe(&self, path: &StorePath) -> BuzzResult<Subscription> {
        let initial = match self.check(path) {
            Ok(()) => StoreEvent::Changed(self.read_now(path)),
            Err(e) => StoreEvent::Cancelled(e.to_string()),
        };
        Ok(self.inner.watchers.register(path.clone(), initial))
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.watchers.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> StorePath {
        StorePath::parse(p).unwrap()
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let store = MemoryStore::new();
        store.write(&path("users/u1/fullName"), json!("Alice")).await.unwrap();
        let value = store.read_once(&path("users/u1")).await.unwrap();
        assert_eq!(value, Some(json!({"fullName": "Alice"})));
        assert_eq!(store.read_once(&path("users/u2")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_append_child_keys_are_ordered() {
        let store = MemoryStore::new();
        let list = path("users/u1/following");
        let k1 = store.append_child(&list, json!("a")).await.unwrap();
        let k2 = store.append_child(&list, json!("b")).await.unwrap();
        assert!(k1 < k2);

        let value = store.read_once(&list).await.unwrap().unwrap();
        assert_eq!(value.as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_child_removes_first_match_only() {
        let store = MemoryStore::new();
        store
            .seed("users/u1/followers", json!({"k1": "u2", "k2": "u3", "k3": "u2"}))
            .unwrap();

        let removed = store
            .remove_child(&path("users/u1/followers"), |v| v.as_str() == Some("u2"))
            .await
            .unwrap();
        assert!(removed);
        assert_eq!(
            store.snapshot("users/u1/followers").unwrap(),
            Some(json!({"k2": "u3", "k3": "u2"}))
        );

        let removed = store
            .remove_child(&path("users/u1/followers"), |v| v.as_str() == Some("u9"))
            .await
            .unwrap();
        assert!(!removed);
    }

    #[tokio::test]
    async fn test_transact_number_defaults_to_zero() {
        let store = MemoryStore::new();
        let count = path("users/u1/followersCount");
        let outcome = store.transact_number(&count, |n| n + 1).await.unwrap();
        assert_eq!(outcome, TransactionOutcome::Committed(1));
        assert_eq!(store.snapshot("users/u1/followersCount").unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_transact_number_aborts_on_non_number() {
        let store = MemoryStore::new();
        store.seed("users/u1/followersCount", json!("lots")).unwrap();
        let outcome = store
            .transact_number(&path("users/u1/followersCount"), |n| n + 1)
            .await
            .unwrap();
        assert_eq!(outcome, TransactionOutcome::Aborted);
    }

    #[tokio::test]
    async fn test_transact_number_aborts_past_i64_range() {
        let store = MemoryStore::new();
        store.seed("users/u1/followersCount", json!(u64::MAX)).unwrap();
        let outcome = store
            .transact_number(&path("users/u1/followersCount"), |n| n + 1)
            .await
            .unwrap();
        assert_eq!(outcome, TransactionOutcome::Aborted);
        assert_eq!(store.snapshot("users/u1/followersCount").unwrap(), Some(json!(u64::MAX)));
    }

    #[tokio::test]
    async fn test_denied_paths_fail() {
        let store = MemoryStore::new();
        store.deny("users/u1/followersCount").unwrap();

        let result = store
            .transact_number(&path("users/u1/followersCount"), |n| n + 1)
            .await;
        assert!(matches!(result, Err(BuzzError::PermissionDenied(_))));

        // Siblings are unaffected
        store.write(&path("users/u1/fullName"), json!("A")).await.unwrap();

        store.allow_all();
        assert!(store
            .transact_number(&path("users/u1/followersCount"), |n| n + 1)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_subscribe_receives_initial_and_changes() {
        let store = MemoryStore::new();
        store.seed("users/u1/fullName", json!("Alice")).unwrap();

        let mut sub = store.subscribe(&path("users")).unwrap();
        assert_eq!(
            sub.next().await,
            Some(StoreEvent::Changed(Some(json!({"u1": {"fullName": "Alice"}}))))
        );

        store.write(&path("users/u2/fullName"), json!("Bob")).await.unwrap();
        match sub.next().await {
            Some(StoreEvent::Changed(Some(v))) => assert!(v.get("u2").is_some()),
            other => panic!("unexpected event: {:?}", other),
        }

        assert_eq!(store.subscriber_count(), 1);
        assert!(store.unsubscribe(sub.id()));
        assert_eq!(store.subscriber_count(), 0);
        assert!(!store.unsubscribe(sub.id()));
    }

    #[tokio::test]
    async fn test_subscribe_to_denied_path_is_cancelled() {
        let store = MemoryStore::new();
        store.deny("users").unwrap();
        let mut sub = store.subscribe(&path("users")).unwrap();
        assert!(matches!(sub.next().await, Some(StoreEvent::Cancelled(_))));
        assert_eq!(store.subscriber_count(), 0);
    }
}
