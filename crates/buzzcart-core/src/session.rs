//! Signed-in user's display data
//!
//! Loaded once after sign-in. Screens that ask before the load finishes
//! register a callback and are called back when it does.

use tracing::debug;

use crate::social::SessionProfile;
use crate::types::format_count;

type ReadyCallback = Box<dyn FnOnce(&SessionProfile) + Send>;

/// Display name shown before the profile loads
pub const DEFAULT_DISPLAY_NAME: &str = "User";

#[derive(Default)]
pub struct SessionCache {
    profile: Option<SessionProfile>,
    followers_count: i64,
    following_count: i64,
    waiting: Vec<ReadyCallback>,
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("profile", &self.profile)
            .field("followers_count", &self.followers_count)
            .field("following_count", &self.following_count)
            .field("waiting", &self.waiting.len())
            .finish()
    }
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.profile.is_some()
    }

    pub fn full_name(&self) -> &str {
        self.profile
            .as_ref()
            .map(|p| p.full_name.as_str())
            .unwrap_or(DEFAULT_DISPLAY_NAME)
    }

    pub fn followers_count(&self) -> i64 {
        self.followers_count
    }

    pub fn following_count(&self) -> i64 {
        self.following_count
    }

    /// `(followers, following)` formatted for display
    pub fn formatted_counts(&self) -> (String, String) {
        (format_count(self.followers_count), format_count(self.following_count))
    }

    /// Run `callback` once the profile is loaded, or now if it already is
    pub fn on_ready<F>(&mut self, callback: F)
    where
        F: FnOnce(&SessionProfile) + Send + 'static,
    {
        match self.profile {
            Some(ref profile) => callback(profile),
            None => self.waiting.push(Box::new(callback)),
        }
    }

    /// Store the loaded profile and release waiting callbacks
    pub fn set_loaded(&mut self, profile: SessionProfile) {
        debug!(name = %profile.full_name, waiting = self.waiting.len(), "Session profile loaded");
        self.followers_count = profile.followers_count;
        self.following_count = profile.following_count;
        for callback in self.waiting.drain(..) {
            callback(&profile);
        }
        self.profile = Some(profile);
    }

    /// Refresh the cached counters, e.g. from a live profile listener
    pub fn update_cached_counts(&mut self, followers: i64, following: i64) {
        self.followers_count = followers;
        self.following_count = following;
        if let Some(ref mut profile) = self.profile {
            profile.followers_count = followers;
            profile.following_count = following;
        }
    }

    /// Forget everything (sign-out). Pending callbacks are dropped uncalled.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
