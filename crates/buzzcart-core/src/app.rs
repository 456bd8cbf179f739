//! BuzzCartApp - the entry point front ends drive
//!
//! Owns the auth session, the store, the navigation controller and the
//! session cache. Every screen action goes through here so that navigation
//! and the store calls behind a screen stay in step.
//!
//! Three subscriptions can be open while signed in: the search screen's
//! query, the signed-in user's document and the visited profile's document.
//! [`BuzzCartApp::next_live_update`] waits on all of them.
//!
//! # Example
//!
//! ```ignore
//! use buzzcart_core::{BuzzCartApp, BuzzConfig, TabId};
//!
//! let mut app = BuzzCartApp::open(&BuzzConfig::new("~/.buzzcart/data"))?;
//! app.sign_in("alice@example.com", "secret1").await?;
//!
//! app.open_search();
//! let outcome = app.search("al").await?;
//! let first = outcome.and_then(|o| o.results.into_iter().next());
//! if let Some(user) = first {
//!     app.open_user_profile(&user.user_id).await?;
//!     app.toggle_follow().await?;
//! }
//! app.select_tab(TabId::Cart);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{AuthSession, Identity, LocalAuth};
use crate::config::BuzzConfig;
use crate::error::{BuzzError, BuzzResult};
use crate::nav::{BackOutcome, NavSnapshot, NavigationController, Overlay, TabId, ViewKind, ViewTag};
use crate::session::SessionCache;
use crate::social::account::{self, load_session_profile, track_interaction, validate_login};
use crate::social::{
    FollowAttempt, FollowToggle, ProfileWatch, SearchFilter, SearchOutcome, SearchSession, SignupForm,
};
use crate::store::{paths, RedbStore, RemoteStore};
use crate::types::{UserId, UserRecord};

/// State saved across process restarts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSnapshot {
    pub nav: NavSnapshot,
    pub followers_count: i64,
    pub following_count: i64,
}

/// A store change behind one of the open screens
#[derive(Debug, Clone, PartialEq)]
pub enum LiveUpdate {
    /// New result set for the search screen
    Search(SearchOutcome),
    /// The signed-in user's document changed. Already applied to the
    /// session cache and the visited profile's follow button.
    OwnProfile(UserRecord),
    /// The visited profile's document changed
    VisitedProfile(UserRecord),
}

pub struct BuzzCartApp<A: AuthSession, S: RemoteStore> {
    auth: A,
    store: Arc<S>,
    nav: NavigationController,
    session: SessionCache,
    search: Option<SearchSession<S>>,
    own_profile: Option<ProfileWatch<S>>,
    /// Watch on the user profile view with this tag
    visited: Option<(ViewTag, ProfileWatch<S>)>,
}

impl BuzzCartApp<LocalAuth, RedbStore> {
    /// Open the local backend in `config`'s data directory
    pub fn open(config: &BuzzConfig) -> BuzzResult<Self> {
        let (auth, store) = config.open_backend()?;
        Ok(Self::new(auth, store))
    }
}

impl<A: AuthSession, S: RemoteStore> BuzzCartApp<A, S> {
    pub fn new(auth: A, store: S) -> Self {
        Self {
            auth,
            store: Arc::new(store),
            nav: NavigationController::new(),
            session: SessionCache::new(),
            search: None,
            own_profile: None,
            visited: None,
        }
    }

    pub fn auth(&self) -> &A {
        &self.auth
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn nav(&self) -> &NavigationController {
        &self.nav
    }

    pub fn session(&self) -> &SessionCache {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionCache {
        &mut self.session
    }

    pub fn identity(&self) -> Option<Identity> {
        self.auth.current_identity()
    }

    fn require_identity(&self) -> BuzzResult<Identity> {
        self.identity().ok_or(BuzzError::NotSignedIn)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Session lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Load the session profile and show the first screen
    ///
    /// Fails only when nobody is signed in; a missing or unreadable profile
    /// falls back to defaults.
    pub async fn start(&mut self) -> BuzzResult<()> {
        let identity = self.require_identity()?;
        let profile = load_session_profile(self.store.as_ref(), &identity).await;
        self.session.set_loaded(profile);
        self.own_profile = Some(ProfileWatch::open(self.store.clone(), identity.user_id.clone()));
        if self.nav.active_tag().is_none() {
            self.nav.switch_tab(self.nav.active_tab());
        }
        info!(user = %identity.user_id, "Session started");
        Ok(())
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> BuzzResult<Identity> {
        validate_login(email, password)?;
        let identity = self.auth.sign_in(email.trim(), password.trim()).await?;
        self.start().await?;
        Ok(identity)
    }

    pub async fn sign_up(&mut self, form: &SignupForm) -> BuzzResult<UserRecord> {
        let record = account::sign_up(&self.auth, self.store.as_ref(), form).await?;
        self.start().await?;
        Ok(record)
    }

    /// Drop all screens and cached data, then end the session
    pub fn sign_out(&mut self) -> BuzzResult<()> {
        self.search = None;
        self.own_profile = None;
        self.visited = None;
        self.nav.clear();
        self.session.clear();
        self.auth.sign_out()
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            nav: self.nav.snapshot(),
            followers_count: self.session.followers_count(),
            following_count: self.session.following_count(),
        }
    }

    /// Restore saved state and show the saved tab
    ///
    /// A restored search screen reruns its saved filter and query.
    pub fn restore(&mut self, snapshot: AppSnapshot) {
        self.search = None;
        self.visited = None;
        self.nav.restore(snapshot.nav);
        self.session
            .update_cached_counts(snapshot.followers_count, snapshot.following_count);
        if self.nav.cached(&ViewTag::Search).is_some() {
            debug!(query = %self.nav.search_state().query, "Resuming restored search");
            self.search = Some(SearchSession::new(
                self.store.clone(),
                self.nav.search_state().clone(),
            ));
        }
    }

    /// Re-read the signed-in user's counters
    pub async fn refresh_profile(&mut self) -> BuzzResult<()> {
        let identity = self.require_identity()?;
        let profile = load_session_profile(self.store.as_ref(), &identity).await;
        self.session
            .update_cached_counts(profile.followers_count, profile.following_count);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Navigation
    // ═══════════════════════════════════════════════════════════════════════

    pub fn select_tab(&mut self, tab: TabId) {
        self.nav.select_tab(tab);
        self.sync_live();
    }

    pub fn back(&mut self) -> BackOutcome {
        let outcome = self.nav.resolve_back_press();
        self.sync_live();
        outcome
    }

    pub fn open_menu(&mut self) {
        self.nav.enter_overlay_mode(TabId::Profile, Overlay::Menu);
    }

    pub fn close_menu(&mut self) {
        self.nav.exit_overlay_mode(TabId::Profile);
    }

    /// Drop the search session and the visited-profile watch once their
    /// views are gone
    fn sync_live(&mut self) {
        if self.nav.cached(&ViewTag::Search).is_none() && self.search.take().is_some() {
            debug!("Search view evicted, closing search session");
        }
        let home = self.nav.stack(TabId::Home);
        if self.visited.as_ref().is_some_and(|(tag, _)| !home.contains(tag)) {
            debug!("User profile left the home stack, closing profile watch");
            self.visited = None;
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Search
    // ═══════════════════════════════════════════════════════════════════════

    /// Show a fresh search screen over home
    pub fn open_search(&mut self) {
        self.nav.enter_overlay_mode(TabId::Home, Overlay::Search);
        self.search = Some(SearchSession::new(
            self.store.clone(),
            self.nav.search_state().clone(),
        ));
    }

    pub fn close_search(&mut self) {
        self.nav.exit_overlay_mode(TabId::Home);
        self.sync_live();
    }

    fn search_session(&mut self) -> BuzzResult<&mut SearchSession<S>> {
        if self.nav.active_tag() != Some(&ViewTag::Search) {
            return Err(BuzzError::WrongScreen("search".into()));
        }
        let store = &self.store;
        let state = self.nav.search_state().clone();
        Ok(self
            .search
            .get_or_insert_with(|| SearchSession::new(store.clone(), state)))
    }

    /// Mirror the session's state into the controller and the visible view
    fn save_search_state(&mut self) {
        let Some(state) = self.search.as_ref().map(|s| s.state().clone()) else {
            return;
        };
        if let Some(view) = self.nav.active_view_mut() {
            if let ViewKind::Search { filter, query } = view.kind_mut() {
                *filter = state.filter;
                query.clone_from(&state.query);
            }
        }
        self.nav.save_search_state(state);
    }

    /// Run `query` on the search screen and return the first result set
    pub async fn search(&mut self, query: &str) -> BuzzResult<Option<SearchOutcome>> {
        self.search_session()?.set_query(query);
        self.save_search_state();
        self.next_search_update().await
    }

    pub async fn set_search_filter(&mut self, filter: SearchFilter) -> BuzzResult<Option<SearchOutcome>> {
        self.search_session()?.set_filter(filter);
        self.save_search_state();
        self.next_search_update().await
    }

    /// Whether the search screen is showing and has a live query to wait on
    pub fn search_is_live(&self) -> bool {
        self.nav.active_tag() == Some(&ViewTag::Search)
            && self.search.as_ref().is_some_and(|s| s.is_live())
    }

    /// Wait for the next live result set
    pub async fn next_search_update(&mut self) -> BuzzResult<Option<SearchOutcome>> {
        Ok(self.search_session()?.next_update().await)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Profiles
    // ═══════════════════════════════════════════════════════════════════════

    /// Read a user's record
    pub async fn user_record(&self, user_id: &UserId) -> BuzzResult<UserRecord> {
        match self.store.read_once(&paths::user(user_id)?).await? {
            Some(value) => Ok(UserRecord::from_value(user_id.clone(), value)?),
            None => Err(BuzzError::UserNotFound(user_id.to_string())),
        }
    }

    /// Open another user's profile on the home tab
    pub async fn open_user_profile(&mut self, user_id: &UserId) -> BuzzResult<UserRecord> {
        let me = self.require_identity()?;
        let record = self.user_record(user_id).await?;

        if let Err(e) = track_interaction(self.store.as_ref(), &me.user_id, user_id, "profile_view").await {
            warn!(target = %user_id, error = %e, "Failed to track interaction");
        }

        let toggle = FollowToggle::default();
        if let Err(e) = toggle.refresh(self.store.as_ref(), &me.user_id, user_id).await {
            warn!(target = %user_id, error = %e, "Failed to check follow state");
        }

        let tag = self.nav.user_profile_tag(user_id);
        let user = user_id.clone();
        self.nav.push_dynamic(TabId::Home, tag.clone(), move || ViewKind::UserProfile {
            user,
            follow_toggle: toggle,
        });
        self.visited = Some((tag, ProfileWatch::open(self.store.clone(), user_id.clone())));
        self.sync_live();
        Ok(record)
    }

    /// The user and follow button of the visible profile screen
    pub fn visible_profile(&self) -> Option<(&UserId, &FollowToggle)> {
        match self.nav.active_view().map(|v| v.kind()) {
            Some(ViewKind::UserProfile { user, follow_toggle }) => Some((user, follow_toggle)),
            _ => None,
        }
    }

    /// Press the follow button on the visible profile
    pub async fn toggle_follow(&mut self) -> BuzzResult<FollowAttempt> {
        let me = self.require_identity()?;
        let (user, toggle) = match self.visible_profile() {
            Some((user, toggle)) => (user.clone(), toggle.clone()),
            None => return Err(BuzzError::WrongScreen("user profile".into())),
        };

        let attempt = toggle.toggle(self.store.as_ref(), &me.user_id, &user).await?;
        if let FollowAttempt::Completed(_) = attempt {
            self.refresh_profile().await?;
        }
        Ok(attempt)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Live updates
    // ═══════════════════════════════════════════════════════════════════════

    /// Whether [`Self::next_live_update`] has anything to wait on
    pub fn has_live_updates(&self) -> bool {
        self.search_is_live()
            || self.own_profile.as_ref().is_some_and(ProfileWatch::is_live)
            || self.visited.as_ref().is_some_and(|(_, watch)| watch.is_live())
    }

    /// Wait for the next change behind the open screens. `None` when
    /// nothing is live.
    pub async fn next_live_update(&mut self) -> Option<LiveUpdate> {
        let search_live = self.search_is_live();
        let search = &mut self.search;
        let own = self.own_profile.as_mut();
        let visited = self.visited.as_mut().map(|(_, watch)| watch);

        let update = tokio::select! {
            Some(outcome) = next_search(search, search_live) => LiveUpdate::Search(outcome),
            Some(record) = next_record(own) => LiveUpdate::OwnProfile(record),
            Some(record) = next_record(visited) => LiveUpdate::VisitedProfile(record),
            else => return None,
        };

        if let LiveUpdate::OwnProfile(ref record) = update {
            self.apply_own_record(record);
        }
        Some(update)
    }

    fn apply_own_record(&mut self, record: &UserRecord) {
        debug!(
            followers = record.followers_count,
            following = record.following_count,
            "Own profile changed"
        );
        self.session
            .update_cached_counts(record.followers_count, record.following_count);

        let Some((tag, _)) = self.visited.as_ref() else {
            return;
        };
        if let Some(ViewKind::UserProfile { user, follow_toggle }) = self.nav.cached(tag).map(|v| v.kind()) {
            if !follow_toggle.is_in_progress() {
                follow_toggle.set_following(record.is_following(user));
            }
        }
    }
}

async fn next_search<S: RemoteStore>(
    session: &mut Option<SearchSession<S>>,
    live: bool,
) -> Option<SearchOutcome> {
    if !live {
        return None;
    }
    session.as_mut()?.next_update().await
}

async fn next_record<S: RemoteStore>(watch: Option<&mut ProfileWatch<S>>) -> Option<UserRecord> {
    watch?.next_record().await
}
