//! Account search
//!
//! The whole `users` collection is watched and filtered client-side. Only
//! the accounts filter is live; the other filters are placeholders that
//! always report no results.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::BuzzError;
use crate::store::{paths, RemoteStore, StoreEvent, Subscription};
use crate::types::{pluralize_results, UserId, UserRecord};

/// Queries shorter than this (in characters) are not searched
pub const MIN_QUERY_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchFilter {
    #[default]
    Accounts,
    Sellers,
    Reels,
    Products,
}

impl SearchFilter {
    pub const ALL: [SearchFilter; 4] = [
        SearchFilter::Accounts,
        SearchFilter::Sellers,
        SearchFilter::Reels,
        SearchFilter::Products,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SearchFilter::Accounts => "accounts",
            SearchFilter::Sellers => "sellers",
            SearchFilter::Reels => "reels",
            SearchFilter::Products => "products",
        }
    }

    /// Heading used in the results title
    pub fn label(self) -> &'static str {
        match self {
            SearchFilter::Accounts => "Accounts",
            SearchFilter::Sellers => "Sellers",
            SearchFilter::Reels => "Reels",
            SearchFilter::Products => "Products",
        }
    }

    fn empty_prompt(self) -> &'static str {
        match self {
            SearchFilter::Accounts => {
                "Start typing to search for accounts by full name...\n\nResults will show people using this app."
            }
            SearchFilter::Sellers => "Search for sellers and stores...",
            SearchFilter::Reels => "Search for reels and videos...",
            SearchFilter::Products => "Search for products and deals...",
        }
    }

    fn short_prompt(self) -> &'static str {
        match self {
            SearchFilter::Accounts => "Type at least 2 characters to search...",
            _ => "Type at least 2 characters...",
        }
    }
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SearchFilter {
    type Err = BuzzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        SearchFilter::ALL
            .into_iter()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| BuzzError::UnknownFilter(s.to_string()))
    }
}

/// Saved filter and query of the search screen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchState {
    pub filter: SearchFilter,
    pub query: String,
}

fn is_searchable(query: &str) -> bool {
    query.chars().count() >= MIN_QUERY_LEN
}

/// Filter and order the `users` collection for `query`
///
/// Nodes without both `fullName` and `email` are skipped. A hit's
/// `fullNameLower` must contain the lowercased query. Names starting with
/// the query come first, then everything sorts by name.
pub fn rank_accounts(users: Option<&Value>, query: &str) -> Vec<UserRecord> {
    if !is_searchable(query) {
        return Vec::new();
    }
    let Some(users) = users.and_then(Value::as_object) else {
        return Vec::new();
    };
    let needle = query.to_lowercase();

    let mut hits: Vec<(String, UserRecord)> = users
        .iter()
        .filter_map(|(key, node)| {
            let has = |field: &str| node.get(field).is_some_and(|v| !v.is_null());
            if !has("fullName") || !has("email") {
                trace!(key, "Skipping non-user node");
                return None;
            }
            let record = match UserRecord::from_value(UserId::from(key.as_str()), node.clone()) {
                Ok(record) => record,
                Err(e) => {
                    warn!(key, error = %e, "Skipping malformed user node");
                    return None;
                }
            };
            let name = record.full_name_lower.to_lowercase();
            (!name.is_empty() && name.contains(&needle)).then_some((name, record))
        })
        .collect();

    hits.sort_by(|(a, _), (b, _)| {
        b.starts_with(&needle)
            .cmp(&a.starts_with(&needle))
            .then_with(|| a.cmp(b))
    });
    hits.into_iter().map(|(_, record)| record).collect()
}

/// What the search screen should display
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub filter: SearchFilter,
    pub query: String,
    pub results: Vec<UserRecord>,
    pub error: Option<String>,
}

impl SearchOutcome {
    fn empty(state: &SearchState) -> Self {
        Self {
            filter: state.filter,
            query: state.query.clone(),
            results: Vec::new(),
            error: None,
        }
    }

    fn failed(state: &SearchState, reason: &str) -> Self {
        Self {
            error: Some(format!("Search failed: {}", reason)),
            ..Self::empty(state)
        }
    }

    /// e.g. `Accounts - 2 results`
    pub fn title(&self) -> String {
        format!("{} - {}", self.filter.label(), pluralize_results(self.results.len()))
    }

    /// Status line under the title
    pub fn message(&self) -> String {
        if let Some(ref error) = self.error {
            return error.clone();
        }
        let count = self.results.len();
        if self.query.is_empty() {
            self.filter.empty_prompt().to_string()
        } else if !is_searchable(&self.query) {
            self.filter.short_prompt().to_string()
        } else if count == 0 {
            format!("No {} found for \"{}\"", self.filter.name(), self.query)
        } else {
            format!("Found {} matching \"{}\"", pluralize_results(count), self.query)
        }
    }
}

/// Live search behind the search screen
///
/// Holds at most one subscription to `users`, replaced on every query or
/// filter change and dropped when the query is too short.
pub struct SearchSession<S: RemoteStore> {
    store: Arc<S>,
    state: SearchState,
    subscription: Option<Subscription>,
    pending: Option<SearchOutcome>,
}

impl<S: RemoteStore> SearchSession<S> {
    /// Start a session and run `state` straight away
    pub fn new(store: Arc<S>, state: SearchState) -> Self {
        let mut session = Self {
            store,
            state,
            subscription: None,
            pending: None,
        };
        session.refresh();
        session
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Whether a store subscription is open
    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.state.query = query.into();
        self.refresh();
    }

    pub fn set_filter(&mut self, filter: SearchFilter) {
        self.state.filter = filter;
        self.refresh();
    }

    /// Next thing to display. Resolves immediately after a query or filter
    /// change, then on every change to `users` while the query is live.
    /// `None` once nothing more will arrive.
    pub async fn next_update(&mut self) -> Option<SearchOutcome> {
        if let Some(outcome) = self.pending.take() {
            return Some(outcome);
        }
        let Some(event) = self.subscription.as_mut()?.next().await else {
            self.close();
            return None;
        };
        Some(self.handle(event))
    }

    fn handle(&mut self, event: StoreEvent) -> SearchOutcome {
        match event {
            StoreEvent::Changed(users) => {
                let results = rank_accounts(users.as_ref(), &self.state.query);
                debug!(query = %self.state.query, results = results.len(), "Account search updated");
                SearchOutcome {
                    results,
                    ..SearchOutcome::empty(&self.state)
                }
            }
            StoreEvent::Cancelled(reason) => {
                warn!(query = %self.state.query, %reason, "Search cancelled");
                self.close();
                SearchOutcome::failed(&self.state, &reason)
            }
        }
    }

    fn refresh(&mut self) {
        self.close();
        self.pending = None;

        if self.state.filter != SearchFilter::Accounts || !is_searchable(&self.state.query) {
            self.pending = Some(SearchOutcome::empty(&self.state));
            return;
        }
        match self.store.subscribe(&paths::users()) {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(e) => {
                warn!(error = %e, "Search subscription failed");
                self.pending = Some(SearchOutcome::failed(&self.state, &e.to_string()));
            }
        }
    }

    /// Drop the subscription
    pub fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.store.unsubscribe(subscription.id());
        }
    }
}

impl<S: RemoteStore> Drop for SearchSession<S> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn user(name: &str) -> Value {
        json!({
            "fullName": name,
            "fullNameLower": name.to_lowercase(),
            "email": format!("{}@example.com", name.to_lowercase()),
        })
    }

    fn names(results: &[UserRecord]) -> Vec<&str> {
        results.iter().map(|r| r.full_name.as_str()).collect()
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.seed("users/u1", user("alice")).unwrap();
        store.seed("users/u2", user("albert")).unwrap();
        store.seed("users/u3", user("carl")).unwrap();
        store.seed("users/u4", user("Sal")).unwrap();
        Arc::new(store)
    }

    #[test]
    fn test_rank_puts_prefix_matches_first() {
        let users = json!({
            "u1": user("alice"),
            "u2": user("albert"),
            "u3": user("carl"),
            "u4": user("Sal"),
        });
        let results = rank_accounts(Some(&users), "Al");
        assert_eq!(names(&results), vec!["albert", "alice", "Sal"]);
        assert_eq!(results[0].user_id, UserId::from("u2"));
    }

    #[test]
    fn test_rank_skips_non_user_nodes() {
        let users = json!({
            "u1": user("alice"),
            "u2": {"fullName": "alan"},
            "u3": 42,
            "u4": {"fullName": "alfred", "email": "a@b.c", "fullNameLower": ""},
        });
        let results = rank_accounts(Some(&users), "al");
        assert_eq!(names(&results), vec!["alice"]);
    }

    #[test]
    fn test_rank_short_query_is_empty() {
        let users = json!({"u1": user("alice")});
        assert!(rank_accounts(Some(&users), "a").is_empty());
        assert!(rank_accounts(None, "alice").is_empty());
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!("Reels".parse::<SearchFilter>().unwrap(), SearchFilter::Reels);
        assert!(matches!(
            "people".parse::<SearchFilter>(),
            Err(BuzzError::UnknownFilter(_))
        ));
    }

    #[test]
    fn test_outcome_messages() {
        let mut state = SearchState::default();
        let outcome = SearchOutcome::empty(&state);
        assert_eq!(outcome.title(), "Accounts - 0 results");
        assert!(outcome.message().starts_with("Start typing to search for accounts"));

        state.query = "a".into();
        assert_eq!(
            SearchOutcome::empty(&state).message(),
            "Type at least 2 characters to search..."
        );

        state.query = "zz".into();
        assert_eq!(SearchOutcome::empty(&state).message(), "No accounts found for \"zz\"");

        state.filter = SearchFilter::Products;
        assert_eq!(SearchOutcome::empty(&state).message(), "No products found for \"zz\"");
        assert_eq!(
            SearchOutcome::failed(&state, "denied").message(),
            "Search failed: denied"
        );
    }

    #[tokio::test]
    async fn test_session_live_results() {
        let store = seeded_store();
        let mut session = SearchSession::new(store.clone(), SearchState::default());
        assert!(!session.is_live());
        let idle = session.next_update().await.unwrap();
        assert!(idle.results.is_empty());

        session.set_query("al");
        assert!(session.is_live());
        let outcome = session.next_update().await.unwrap();
        assert_eq!(names(&outcome.results), vec!["albert", "alice", "Sal"]);
        assert_eq!(outcome.title(), "Accounts - 3 results");
        assert_eq!(outcome.message(), "Found 3 results matching \"al\"");

        store.seed("users/u5", user("alina")).unwrap();
        let outcome = session.next_update().await.unwrap();
        assert_eq!(names(&outcome.results), vec!["albert", "alice", "alina", "Sal"]);
    }

    #[tokio::test]
    async fn test_session_short_query_drops_subscription() {
        let store = seeded_store();
        let mut session = SearchSession::new(store.clone(), SearchState::default());
        session.set_query("al");
        assert_eq!(store.subscriber_count(), 1);

        session.set_query("a");
        assert!(!session.is_live());
        assert_eq!(store.subscriber_count(), 0);
        let outcome = session.next_update().await.unwrap();
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.message(), "Type at least 2 characters to search...");
        assert_eq!(session.next_update().await, None);
    }

    #[tokio::test]
    async fn test_session_replaces_subscription_per_query() {
        let store = seeded_store();
        let mut session = SearchSession::new(store.clone(), SearchState::default());
        session.set_query("al");
        session.set_query("car");
        assert_eq!(store.subscriber_count(), 1);
        let outcome = session.next_update().await.unwrap();
        assert_eq!(names(&outcome.results), vec!["carl"]);

        session.set_filter(SearchFilter::Sellers);
        assert_eq!(store.subscriber_count(), 0);
        let outcome = session.next_update().await.unwrap();
        assert_eq!(outcome.title(), "Sellers - 0 results");

        drop(session);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_session_reports_denied_search() {
        let store = seeded_store();
        store.deny("users").unwrap();
        let mut session = SearchSession::new(
            store.clone(),
            SearchState {
                filter: SearchFilter::Accounts,
                query: "al".into(),
            },
        );
        let outcome = session.next_update().await.unwrap();
        assert!(outcome.message().starts_with("Search failed: Permission denied"));
        assert!(!session.is_live());
    }
}
