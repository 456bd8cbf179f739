//! Follow / unfollow
//!
//! A follow touches four places: the follower's `following` list, the
//! followee's `followers` list and both counters. The four requests are
//! issued together and joined; one [`FollowReport`] is produced after all of
//! them settle. Nothing is rolled back when a step fails.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::BuzzResult;
use crate::store::{paths, RemoteStore, TransactionOutcome};
use crate::types::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowAction {
    Follow,
    Unfollow,
}

impl fmt::Display for FollowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowAction::Follow => f.write_str("follow"),
            FollowAction::Unfollow => f.write_str("unfollow"),
        }
    }
}

/// One of the four writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowStep {
    /// `users/{me}/following`
    FollowingList,
    /// `users/{target}/followers`
    FollowersList,
    /// `users/{me}/followingCount`
    FollowingCount,
    /// `users/{target}/followersCount`
    FollowersCount,
}

impl fmt::Display for FollowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowStep::FollowingList => f.write_str("following list"),
            FollowStep::FollowersList => f.write_str("followers list"),
            FollowStep::FollowingCount => f.write_str("following count"),
            FollowStep::FollowersCount => f.write_str("followers count"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub step: FollowStep,
    pub reason: String,
}

/// Outcome of all four steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowReport {
    pub action: FollowAction,
    pub failures: Vec<StepFailure>,
    /// Non-fatal oddities, e.g. an unfollow whose list entry was already gone
    pub warnings: Vec<String>,
}

impl FollowReport {
    fn new(action: FollowAction) -> Self {
        Self {
            action,
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Whether `step` settled successfully
    pub fn succeeded(&self, step: FollowStep) -> bool {
        !self.failures.iter().any(|f| f.step == step)
    }

    /// User-facing message, `None` when everything went through
    pub fn message(&self) -> Option<&'static str> {
        self.has_errors().then_some("Some operations failed")
    }

    fn fail(&mut self, step: FollowStep, reason: impl Into<String>) {
        let reason = reason.into();
        error!(action = %self.action, %step, %reason, "Follow step failed");
        self.failures.push(StepFailure { step, reason });
    }

    fn record_list(&mut self, step: FollowStep, result: BuzzResult<()>) {
        match result {
            Ok(()) => debug!(action = %self.action, %step, "Follow step done"),
            Err(e) => self.fail(step, e.to_string()),
        }
    }

    fn record_removal(&mut self, step: FollowStep, result: BuzzResult<bool>) {
        match result {
            Ok(true) => debug!(action = %self.action, %step, "Follow step done"),
            Ok(false) => {
                warn!(%step, "Entry not found during unfollow");
                self.warnings.push(format!("User not found in {}", step));
            }
            Err(e) => self.fail(step, e.to_string()),
        }
    }

    fn record_count(&mut self, step: FollowStep, result: BuzzResult<TransactionOutcome>) {
        match result {
            Ok(TransactionOutcome::Committed(n)) => {
                debug!(action = %self.action, %step, value = n, "Counter updated")
            }
            Ok(TransactionOutcome::Aborted) => self.fail(step, "transaction aborted"),
            Err(e) => self.fail(step, e.to_string()),
        }
    }
}

/// Make `me` follow `target`
///
/// Returns `Err` only when the paths cannot be formed; store failures are
/// collected in the report.
pub async fn follow<S: RemoteStore>(store: &S, me: &UserId, target: &UserId) -> BuzzResult<FollowReport> {
    let following = paths::following(me)?;
    let followers = paths::followers(target)?;
    let following_count = paths::following_count(me)?;
    let followers_count = paths::followers_count(target)?;

    let (following_res, followers_res, following_count_res, followers_count_res) = futures::join!(
        store.append_child(&following, Value::from(target.as_str())),
        store.append_child(&followers, Value::from(me.as_str())),
        store.transact_number(&following_count, |n| n.saturating_add(1)),
        store.transact_number(&followers_count, |n| n.saturating_add(1)),
    );

    let mut report = FollowReport::new(FollowAction::Follow);
    report.record_list(FollowStep::FollowingList, following_res.map(|_| ()));
    report.record_list(FollowStep::FollowersList, followers_res.map(|_| ()));
    report.record_count(FollowStep::FollowingCount, following_count_res);
    report.record_count(FollowStep::FollowersCount, followers_count_res);

    info!(%me, %target, errors = report.failures.len(), "Follow settled");
    Ok(report)
}

/// Make `me` stop following `target`
///
/// Counters never go below zero. A list entry that is already missing is a
/// warning, not a failure.
pub async fn unfollow<S: RemoteStore>(store: &S, me: &UserId, target: &UserId) -> BuzzResult<FollowReport> {
    let following = paths::following(me)?;
    let followers = paths::followers(target)?;
    let following_count = paths::following_count(me)?;
    let followers_count = paths::followers_count(target)?;

    let target_str = target.as_str();
    let me_str = me.as_str();

    let (following_res, followers_res, following_count_res, followers_count_res) = futures::join!(
        store.remove_child(&following, move |v| v.as_str() == Some(target_str)),
        store.remove_child(&followers, move |v| v.as_str() == Some(me_str)),
        store.transact_number(&following_count, decrement),
        store.transact_number(&followers_count, decrement),
    );

    let mut report = FollowReport::new(FollowAction::Unfollow);
    report.record_removal(FollowStep::FollowingList, following_res);
    report.record_removal(FollowStep::FollowersList, followers_res);
    report.record_count(FollowStep::FollowingCount, following_count_res);
    report.record_count(FollowStep::FollowersCount, followers_count_res);

    info!(%me, %target, errors = report.failures.len(), "Unfollow settled");
    Ok(report)
}

fn decrement(n: i64) -> i64 {
    n.saturating_sub(1).max(0)
}

/// Whether `me`'s following list contains `target`
pub async fn is_following<S: RemoteStore>(store: &S, me: &UserId, target: &UserId) -> BuzzResult<bool> {
    let list = store.read_once(&paths::following(me)?).await?;
    Ok(list
        .as_ref()
        .and_then(Value::as_object)
        .is_some_and(|m| m.values().any(|v| v.as_str() == Some(target.as_str()))))
}

/// Result of pressing the follow button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowAttempt {
    Completed(FollowReport),
    /// A previous press is still settling
    AlreadyInProgress,
    /// The profile belongs to the signed-in user
    OwnProfile,
}

#[derive(Debug, Default)]
struct ToggleState {
    in_progress: AtomicBool,
    following: AtomicBool,
}

/// Follow button state for one visited-profile screen
///
/// Clones share state, so the screen and an in-flight request see the same
/// flags.
#[derive(Debug, Clone, Default)]
pub struct FollowToggle {
    state: Arc<ToggleState>,
}

/// Clears the in-progress flag when the request settles or is dropped
struct InProgress<'a>(&'a AtomicBool);

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl FollowToggle {
    pub fn new(following: bool) -> Self {
        let toggle = Self::default();
        toggle.set_following(following);
        toggle
    }

    pub fn is_following(&self) -> bool {
        self.state.following.load(Ordering::Acquire)
    }

    pub fn set_following(&self, following: bool) {
        self.state.following.store(following, Ordering::Release);
    }

    pub fn is_in_progress(&self) -> bool {
        self.state.in_progress.load(Ordering::Acquire)
    }

    /// Button text
    pub fn label(&self) -> &'static str {
        match (self.is_in_progress(), self.is_following()) {
            (true, false) => "Following...",
            (true, true) => "Unfollowing...",
            (false, true) => "Unfollow",
            (false, false) => "Follow",
        }
    }

    /// Re-read the follow state from the store
    pub async fn refresh<S: RemoteStore>(&self, store: &S, me: &UserId, target: &UserId) -> BuzzResult<bool> {
        let following = is_following(store, me, target).await?;
        self.set_following(following);
        Ok(following)
    }

    /// Follow or unfollow depending on the current state
    pub async fn toggle<S: RemoteStore>(
        &self,
        store: &S,
        me: &UserId,
        target: &UserId,
    ) -> BuzzResult<FollowAttempt> {
        if me == target {
            return Ok(FollowAttempt::OwnProfile);
        }
        if self
            .state
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(%target, "Follow already in progress");
            return Ok(FollowAttempt::AlreadyInProgress);
        }
        let _guard = InProgress(&self.state.in_progress);

        let report = if self.is_following() {
            unfollow(store, me, target).await?
        } else {
            follow(store, me, target).await?
        };

        // The list entry on our side decides what the button shows next
        if report.succeeded(FollowStep::FollowingList) {
            self.set_following(report.action == FollowAction::Follow);
        }
        Ok(FollowAttempt::Completed(report))
    }
}
