//! Remote document store collaborator.
//!
//! Screens read and write a path-addressed JSON tree (`users/{id}/followers`,
//! `userInteractions/{id}/interactions/{target}`) through [`RemoteStore`].
//! The navigation layer never touches the store.
//!
//! Two implementations ship with the crate:
//! - [`MemoryStore`]: in-process tree with fault injection, used by tests
//! - [`RedbStore`]: redb-backed tree, used by the shell and the CLI

use std::fmt;
use std::future::Future;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{BuzzError, BuzzResult};

mod disk;
mod memory;
pub(crate) mod tree;
mod watch;

pub use disk::RedbStore;
pub use memory::MemoryStore;

/// Characters the backend refuses inside a path segment
const RESERVED_CHARS: [char; 5] = ['.', '#', '$', '[', ']'];

/// Slash-separated location in the document tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StorePath(Vec<String>);

impl StorePath {
    /// The root of the tree
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse `a/b/c`. Leading, trailing and doubled slashes are ignored.
    pub fn parse(path: &str) -> BuzzResult<Self> {
        let mut segments = Vec::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            Self::check_segment(segment, path)?;
            segments.push(segment.to_string());
        }
        Ok(Self(segments))
    }

    fn check_segment(segment: &str, whole: &str) -> BuzzResult<()> {
        if segment.contains(&RESERVED_CHARS[..]) {
            return Err(BuzzError::InvalidPath(whole.to_string()));
        }
        Ok(())
    }

    /// Append one segment. Reserved characters are rejected.
    pub fn child(&self, segment: impl AsRef<str>) -> BuzzResult<Self> {
        let segment = segment.as_ref();
        if segment.is_empty() || segment.contains('/') {
            return Err(BuzzError::InvalidPath(format!("{}/{}", self, segment)));
        }
        Self::check_segment(segment, segment)?;
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Last segment, if any
    pub fn key(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// True if `self` equals `other` or is one of its ancestors
    pub fn is_prefix_of(&self, other: &StorePath) -> bool {
        self.0.len() <= other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a == b)
    }

    /// True if a change at one path can alter the value at the other
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Result of [`RemoteStore::transact_number`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// The update was applied; carries the stored value
    Committed(i64),
    /// The current value was not a number; nothing was written
    Aborted,
}

impl TransactionOutcome {
    /// Turn an abort into an error naming the path
    pub fn committed(self, path: &StorePath) -> BuzzResult<i64> {
        match self {
            TransactionOutcome::Committed(value) => Ok(value),
            TransactionOutcome::Aborted => Err(BuzzError::TransactionAborted(path.to_string())),
        }
    }
}

/// Identifier of a live subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Notification delivered to a subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// Current value at the subscribed path (`None` when absent)
    Changed(Option<Value>),
    /// The store could not serve the subscription; no more events follow
    Cancelled(String),
}

/// Receiving half of a subscription
///
/// Events stop once [`RemoteStore::unsubscribe`] is called with this id or
/// the store is dropped.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<StoreEvent>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, rx: mpsc::UnboundedReceiver<StoreEvent>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next event
    pub async fn next(&mut self) -> Option<StoreEvent> {
        self.rx.recv().await
    }

    /// Take an already delivered event without waiting
    pub fn try_next(&mut self) -> Option<StoreEvent> {
        self.rx.try_recv().ok()
    }
}

/// Path-addressed document store
///
/// Every call is independent: there is no cross-call transaction. Only
/// `transact_number` is atomic, and only for the single path it touches.
pub trait RemoteStore: Send + Sync {
    /// Read the value at `path` once
    fn read_once(&self, path: &StorePath) -> impl Future<Output = BuzzResult<Option<Value>>> + Send;

    /// Replace the value at `path`. Writing `Value::Null` deletes it.
    fn write(&self, path: &StorePath, value: Value) -> impl Future<Output = BuzzResult<()>> + Send;

    /// Store `value` under a new time-ordered child key and return the key
    fn append_child(
        &self,
        path: &StorePath,
        value: Value,
    ) -> impl Future<Output = BuzzResult<String>> + Send;

    /// Remove the first child of `path` whose value satisfies `matches`.
    /// Returns whether a child was removed.
    fn remove_child<F>(
        &self,
        path: &StorePath,
        matches: F,
    ) -> impl Future<Output = BuzzResult<bool>> + Send
    where
        F: Fn(&Value) -> bool + Send;

    /// Apply `update` to the number at `path` (absent counts as 0) and store
    /// the result atomically.
    fn transact_number<F>(
        &self,
        path: &StorePath,
        update: F,
    ) -> impl Future<Output = BuzzResult<TransactionOutcome>> + Send
    where
        F: FnOnce(i64) -> i64 + Send;

    /// Watch `path`. The current value is delivered immediately, then every
    /// change that overlaps the path.
    fn subscribe(&self, path: &StorePath) -> BuzzResult<Subscription>;

    /// Stop a subscription. Returns false if it was not live.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// Well-known paths in the BuzzCart tree
pub mod paths {
    use super::StorePath;
    use crate::error::BuzzResult;
    use crate::types::UserId;

    pub const USERS: &str = "users";
    pub const USER_INTERACTIONS: &str = "userInteractions";

    pub fn users() -> StorePath {
        StorePath(vec![USERS.to_string()])
    }

    pub fn user(id: &UserId) -> BuzzResult<StorePath> {
        users().child(id.as_str())
    }

    pub fn followers(id: &UserId) -> BuzzResult<StorePath> {
        user(id)?.child("followers")
    }

    pub fn following(id: &UserId) -> BuzzResult<StorePath> {
        user(id)?.child("following")
    }

    pub fn followers_count(id: &UserId) -> BuzzResult<StorePath> {
        user(id)?.child("followersCount")
    }

    pub fn following_count(id: &UserId) -> BuzzResult<StorePath> {
        user(id)?.child("followingCount")
    }

    pub fn interactions_root(id: &UserId) -> BuzzResult<StorePath> {
        StorePath(vec![USER_INTERACTIONS.to_string()]).child(id.as_str())
    }

    pub fn interaction(id: &UserId, target: &UserId) -> BuzzResult<StorePath> {
        interactions_root(id)?.child("interactions")?.child(target.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;

    #[test]
    fn test_parse_ignores_extra_slashes() {
        let path = StorePath::parse("/users//abc/").unwrap();
        assert_eq!(path.segments(), &["users".to_string(), "abc".to_string()]);
        assert_eq!(path.to_string(), "users/abc");
        assert_eq!(path.key(), Some("abc"));
    }

    #[test]
    fn test_parse_rejects_reserved_characters() {
        assert!(matches!(
            StorePath::parse("users/a.b"),
            Err(BuzzError::InvalidPath(_))
        ));
        assert!(StorePath::root().child("x#y").is_err());
        assert!(StorePath::root().child("").is_err());
    }

    #[test]
    fn test_overlap() {
        let users = StorePath::parse("users").unwrap();
        let count = StorePath::parse("users/u1/followersCount").unwrap();
        let other = StorePath::parse("userInteractions/u1").unwrap();

        assert!(users.is_prefix_of(&count));
        assert!(!count.is_prefix_of(&users));
        assert!(users.overlaps(&count));
        assert!(count.overlaps(&users));
        assert!(!users.overlaps(&other));
        assert!(StorePath::root().overlaps(&other));
    }

    #[test]
    fn test_well_known_paths() {
        let id = UserId::from("u1");
        assert_eq!(paths::followers(&id).unwrap().to_string(), "users/u1/followers");
        assert_eq!(
            paths::interaction(&id, &"u2".into()).unwrap().to_string(),
            "userInteractions/u1/interactions/u2"
        );
    }

    #[test]
    fn test_transaction_outcome_committed() {
        let path = StorePath::parse("a/b").unwrap();
        assert_eq!(TransactionOutcome::Committed(3).committed(&path).unwrap(), 3);
        assert!(matches!(
            TransactionOutcome::Aborted.committed(&path),
            Err(BuzzError::TransactionAborted(p)) if p == "a/b"
        ));
    }
}
