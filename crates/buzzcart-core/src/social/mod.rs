//! Social features over the remote store
//!
//! - [`follow`]/[`unfollow`]: four independent writes joined into one report
//! - [`FollowToggle`]: per-screen guard against double taps
//! - [`SearchSession`]: live account search with client-side ranking
//! - [`ProfileWatch`]: live user document for counters and follow state
//! - [`account`]: sign-up bootstrap, session profile, interaction tracking

pub mod account;
mod follow;
mod live;
mod search;

pub use account::{SessionProfile, SignupForm};
pub use follow::{
    follow, is_following, unfollow, FollowAction, FollowAttempt, FollowReport, FollowStep,
    FollowToggle, StepFailure,
};
pub use live::ProfileWatch;
pub use search::{
    rank_accounts, SearchFilter, SearchOutcome, SearchSession, SearchState, MIN_QUERY_LEN,
};
