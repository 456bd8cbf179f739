//! Authentication session collaborator.
//!
//! The app only needs to know who is signed in and to sign people in, up and
//! out. [`LocalAuth`] keeps accounts in the same redb file as [`RedbStore`]
//! so that separate CLI invocations share one login.
//!
//! [`RedbStore`]: crate::store::RedbStore

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::BuzzResult;
use crate::types::UserId;

mod local;

pub use local::LocalAuth;

/// Minimum password length accepted at sign-up
pub const MIN_PASSWORD_LEN: usize = 6;

/// The signed-in account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
}

impl Identity {
    /// Part of the email before `@`, used as a display name fallback
    pub fn email_local_part(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

/// Session provider
///
/// Failures carry a user-presentable reason; callers surface it and do not
/// retry.
pub trait AuthSession: Send + Sync {
    /// The signed-in identity, if any
    fn current_identity(&self) -> Option<Identity>;

    /// Sign in with an existing account
    fn sign_in(&self, email: &str, password: &str) -> impl Future<Output = BuzzResult<Identity>> + Send;

    /// Create an account and sign it in
    fn sign_up(&self, email: &str, password: &str) -> impl Future<Output = BuzzResult<Identity>> + Send;

    /// Forget the current session
    fn sign_out(&self) -> BuzzResult<()>;
}
