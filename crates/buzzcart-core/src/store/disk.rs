//! redb-backed document store.
//!
//! The tree is split into documents keyed `collection/id` (e.g. `users/u1`),
//! each stored as a JSON blob. Every mutation runs inside one redb write
//! transaction, which serializes writers and makes `transact_number` atomic.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use redb::{Database, ReadableTable, Table, TableDefinition};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use ulid::Generator;

use super::tree;
use super::watch::Watchers;
use super::{RemoteStore, StoreEvent, StorePath, Subscription, SubscriptionId, TransactionOutcome};
use crate::error::{BuzzError, BuzzResult};

/// Table for documents (key: `collection/id`, value: JSON bytes)
const DOCUMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

/// The unit a path is loaded and saved through
#[derive(Debug)]
enum Scope {
    Root,
    Collection(String),
    Document(String),
}

impl Scope {
    /// Split a path into the scope that holds it and the remainder inside it
    fn of(path: &StorePath) -> (Scope, &[String]) {
        let segments = path.segments();
        match segments {
            [] => (Scope::Root, segments),
            [collection] => (Scope::Collection(collection.clone()), &segments[1..]),
            [collection, id, rest @ ..] => (Scope::Document(format!("{}/{}", collection, id)), rest),
        }
    }
}

/// Persistent [`RemoteStore`] on top of redb
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
    keys: Arc<Mutex<Generator>>,
    watchers: Arc<Watchers>,
}

impl RedbStore {
    /// Open or create a store file at `path`
    pub fn open(path: impl AsRef<Path>) -> BuzzResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_database(Arc::new(Database::create(path)?))
    }

    /// Volatile store, for tests
    pub fn in_memory() -> BuzzResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::with_database(Arc::new(db))
    }

    /// Use an already opened database (shared with `LocalAuth`)
    pub fn with_database(db: Arc<Database>) -> BuzzResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(DOCUMENTS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db,
            keys: Arc::new(Mutex::new(Generator::new())),
            watchers: Arc::new(Watchers::default()),
        })
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.watchers.count()
    }

    fn read_now(&self, path: &StorePath) -> BuzzResult<Option<Value>> {
        let (scope, rest) = Scope::of(path);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DOCUMENTS_TABLE)?;
        let scoped = load_scope(&table, &scope)?;
        // An empty object is how an absent document or collection loads
        Ok(tree::get(&scoped, rest)
            .filter(|v| !v.as_object().is_some_and(Map::is_empty))
            .cloned())
    }

    /// Load the scope holding `path`, let `apply` edit it, save it back and
    /// commit. An error from `apply` aborts the transaction.
    fn mutate<R, F>(&self, path: &StorePath, apply: F) -> BuzzResult<R>
    where
        F: FnOnce(&mut Value, &[String]) -> BuzzResult<R>,
    {
        let (scope, rest) = Scope::of(path);
        let write_txn = self.db.begin_write()?;
        let result = {
            let mut table = write_txn.open_table(DOCUMENTS_TABLE)?;
            let mut scoped = load_scope(&table, &scope)?;
            let result = apply(&mut scoped, rest)?;
            save_scope(&mut table, &scope, &scoped)?;
            result
        };
        write_txn.commit()?;
        Ok(result)
    }

    fn notify(&self, path: &StorePath) {
        self.watchers.notify(path, |watched| match self.read_now(watched) {
            Ok(value) => StoreEvent::Changed(value),
            Err(e) => {
                warn!(path = %watched, error = %e, "Failed to read watched path, cancelling");
                StoreEvent::Cancelled(e.to_string())
            }
        });
    }

    fn next_key(&self) -> String {
        match self.keys.lock().generate() {
            Ok(ulid) => ulid.to_string(),
            Err(_) => ulid::Ulid::new().to_string(),
        }
    }
}

fn decode(bytes: &[u8]) -> BuzzResult<Value> {
    Ok(serde_json::from_slice(bytes)?)
}

fn load_scope<T>(table: &T, scope: &Scope) -> BuzzResult<Value>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    match scope {
        Scope::Document(key) => match table.get(key.as_str())? {
            Some(bytes) => decode(bytes.value()),
            None => Ok(Value::Object(Map::new())),
        },
        Scope::Collection(name) => {
            let prefix = format!("{}/", name);
            let mut docs = Map::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                if let Some(id) = key.value().strip_prefix(&prefix) {
                    docs.insert(id.to_string(), decode(value.value())?);
                }
            }
            Ok(Value::Object(docs))
        }
        Scope::Root => {
            let mut root = Value::Object(Map::new());
            for entry in table.iter()? {
                let (key, value) = entry?;
                let segments: Vec<String> = key.value().splitn(2, '/').map(String::from).collect();
                tree::set(&mut root, &segments, decode(value.value())?);
            }
            Ok(root)
        }
    }
}

fn save_scope(
    table: &mut Table<&'static str, &'static [u8]>,
    scope: &Scope,
    scoped: &Value,
) -> BuzzResult<()> {
    match scope {
        Scope::Document(key) => save_document(table, key, scoped),
        Scope::Collection(name) => {
            remove_prefixed(table, &format!("{}/", name))?;
            save_collection(table, name, scoped)
        }
        Scope::Root => {
            remove_prefixed(table, "")?;
            if let Some(collections) = scoped.as_object() {
                for (name, docs) in collections {
                    save_collection(table, name, docs)?;
                }
            }
            Ok(())
        }
    }
}

fn save_collection(
    table: &mut Table<&'static str, &'static [u8]>,
    name: &str,
    docs: &Value,
) -> BuzzResult<()> {
    match docs {
        Value::Object(docs) => {
            for (id, doc) in docs {
                save_document(table, &format!("{}/{}", name, id), doc)?;
            }
            Ok(())
        }
        Value::Null => Ok(()),
        // Scalars cannot live directly under a collection
        _ => Err(BuzzError::InvalidPath(name.to_string())),
    }
}

fn save_document(
    table: &mut Table<&'static str, &'static [u8]>,
    key: &str,
    doc: &Value,
) -> BuzzResult<()> {
    let empty = doc.is_null() || doc.as_object().is_some_and(Map::is_empty);
    if empty {
        table.remove(key)?;
    } else {
        let bytes = serde_json::to_vec(doc)?;
        table.insert(key, bytes.as_slice())?;
    }
    Ok(())
}

fn remove_prefixed(table: &mut Table<&'static str, &'static [u8]>, prefix: &str) -> BuzzResult<()> {
    let mut doomed = Vec::new();
    for entry in table.iter()? {
        let (key, _) = entry?;
        if key.value().starts_with(prefix) {
            doomed.push(key.value().to_string());
        }
    }
    for key in doomed {
        table.remove(key.as_str())?;
    }
    Ok(())
}

impl RemoteStore for RedbStore {
    async fn read_once(&self, path: &StorePath) -> BuzzResult<Option<Value>> {
        self.read_now(path)
    }

    async fn write(&self, path: &StorePath, value: Value) -> BuzzResult<()> {
        self.mutate(path, |scoped, rest| {
            tree::set(scoped, rest, value);
            Ok(())
        })?;
        debug!(%path, "Wrote document");
        self.notify(path);
        Ok(())
    }

    async fn append_child(&self, path: &StorePath, value: Value) -> BuzzResult<String> {
        let key = self.next_key();
        let child = path.child(&key)?;
        self.mutate(&child, |scoped, rest| {
            tree::set(scoped, rest, value);
            Ok(())
        })?;
        self.notify(&child);
        Ok(key)
    }

    async fn remove_child<F>(&self, path: &StorePath, matches: F) -> BuzzResult<bool>
    where
        F: Fn(&Value) -> bool + Send,
    {
        let removed = self.mutate(path, |scoped, rest| {
            match tree::find_child(tree::get(scoped, rest), &matches) {
                Some(key) => {
                    let mut child = rest.to_vec();
                    child.push(key);
                    tree::set(scoped, &child, Value::Null);
                    Ok(true)
                }
                None => Ok(false),
            }
        })?;
        if removed {
            self.notify(path);
        }
        Ok(removed)
    }

    async fn transact_number<F>(&self, path: &StorePath, update: F) -> BuzzResult<TransactionOutcome>
    where
        F: FnOnce(i64) -> i64 + Send,
    {
        let outcome = self.mutate(path, |scoped, rest| {
            Ok(match tree::as_counter(tree::get(scoped, rest)) {
                Some(current) => {
                    let next = update(current);
                    tree::set(scoped, rest, Value::from(next));
                    TransactionOutcome::Committed(next)
                }
                None => TransactionOutcome::Aborted,
            })
        })?;
        if let TransactionOutcome::Committed(_) = outcome {
            self.notify(path);
        }
        Ok(outcome)
    }

    fn subscribe(&self, path: &StorePath) -> BuzzResult<Subscription> {
        let initial = match self.read_now(path) {
            Ok(value) => StoreEvent::Changed(value),
            Err(e) => StoreEvent::Cancelled(e.to_string()),
        };
        Ok(self.watchers.register(path.clone(), initial))
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.watchers.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn path(p: &str) -> StorePath {
        StorePath::parse(p).unwrap()
    }

    #[tokio::test]
    async fn test_document_round_trip() {
        let store = RedbStore::in_memory().unwrap();
        store
            .write(&path("users/u1"), json!({"fullName": "Alice", "followersCount": 2}))
            .await
            .unwrap();

        assert_eq!(
            store.read_once(&path("users/u1/fullName")).await.unwrap(),
            Some(json!("Alice"))
        );
        assert_eq!(
            store.read_once(&path("users")).await.unwrap(),
            Some(json!({"u1": {"fullName": "Alice", "followersCount": 2}}))
        );
        assert_eq!(store.read_once(&path("carts")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_root_read_assembles_collections() {
        let store = RedbStore::in_memory().unwrap();
        store.write(&path("users/u1/email"), json!("a@x.io")).await.unwrap();
        store
            .write(&path("userInteractions/u1/interactions/u2"), json!(3))
            .await
            .unwrap();

        let root = store.read_once(&StorePath::root()).await.unwrap().unwrap();
        assert_eq!(root["users"]["u1"]["email"], json!("a@x.io"));
        assert_eq!(root["userInteractions"]["u1"]["interactions"]["u2"], json!(3));
    }

    #[tokio::test]
    async fn test_collection_write_replaces_documents() {
        let store = RedbStore::in_memory().unwrap();
        store.write(&path("users/u1/email"), json!("a")).await.unwrap();
        store
            .write(&path("users"), json!({"u2": {"email": "b"}}))
            .await
            .unwrap();

        assert_eq!(store.read_once(&path("users/u1")).await.unwrap(), None);
        assert_eq!(
            store.read_once(&path("users/u2/email")).await.unwrap(),
            Some(json!("b"))
        );
    }

    #[tokio::test]
    async fn test_scalar_under_collection_is_rejected() {
        let store = RedbStore::in_memory().unwrap();
        let result = store.write(&path("users"), json!(5)).await;
        assert!(matches!(result, Err(BuzzError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_counter_and_list_operations() {
        let store = RedbStore::in_memory().unwrap();
        let count = path("users/u1/followersCount");

        let outcome = store.transact_number(&count, |n| n + 1).await.unwrap();
        assert_eq!(outcome, TransactionOutcome::Committed(1));
        let outcome = store
            .transact_number(&count, |n| (n - 1).max(0))
            .await
            .unwrap();
        assert_eq!(outcome, TransactionOutcome::Committed(0));
        let outcome = store
            .transact_number(&count, |n| (n - 1).max(0))
            .await
            .unwrap();
        assert_eq!(outcome, TransactionOutcome::Committed(0));

        let list = path("users/u1/followers");
        store.append_child(&list, json!("u2")).await.unwrap();
        store.append_child(&list, json!("u3")).await.unwrap();
        assert!(store
            .remove_child(&list, |v| v.as_str() == Some("u2"))
            .await
            .unwrap());
        let remaining = store.read_once(&list).await.unwrap().unwrap();
        assert_eq!(remaining.as_object().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested/store.redb");

        {
            let store = RedbStore::open(&db_path).unwrap();
            store.write(&path("users/u1/fullName"), json!("Alice")).await.unwrap();
        }

        let store = RedbStore::open(&db_path).unwrap();
        assert_eq!(
            store.read_once(&path("users/u1/fullName")).await.unwrap(),
            Some(json!("Alice"))
        );
    }

    #[tokio::test]
    async fn test_subscription_sees_counter_change() {
        let store = RedbStore::in_memory().unwrap();
        let mut sub = store.subscribe(&path("users/u1")).unwrap();
        assert_eq!(sub.next().await, Some(StoreEvent::Changed(None)));

        store
            .transact_number(&path("users/u1/followingCount"), |n| n + 1)
            .await
            .unwrap();
        assert_eq!(
            sub.next().await,
            Some(StoreEvent::Changed(Some(json!({"followingCount": 1}))))
        );
        assert_eq!(store.subscriber_count(), 1);
    }
}
