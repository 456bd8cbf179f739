//! Account bootstrap and the signed-in user's profile

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::auth::{AuthSession, Identity, MIN_PASSWORD_LEN};
use crate::error::{BuzzError, BuzzResult};
use crate::store::{paths, RemoteStore};
use crate::types::{UserId, UserRecord};

/// Sign-up screen input
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    /// Trimmed copy of the form
    pub fn trimmed(&self) -> Self {
        Self {
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.trim().to_string(),
            confirm_password: self.confirm_password.trim().to_string(),
        }
    }

    /// Check the form before anything is sent. Expects a trimmed form.
    pub fn validate(&self) -> BuzzResult<()> {
        if self.full_name.is_empty()
            || self.email.is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
        {
            return Err(BuzzError::Validation("Please fill all fields".into()));
        }
        if self.password != self.confirm_password {
            return Err(BuzzError::Validation("Passwords do not match".into()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BuzzError::WeakPassword(MIN_PASSWORD_LEN));
        }
        Ok(())
    }
}

/// Check login input. Both fields are required after trimming.
pub fn validate_login(email: &str, password: &str) -> BuzzResult<()> {
    if email.trim().is_empty() || password.trim().is_empty() {
        return Err(BuzzError::Validation("Please enter all fields".into()));
    }
    Ok(())
}

/// Empty interaction bookkeeping for a new account
fn interactions_node() -> Value {
    json!({
        "searchHistory": {},
        "profileVisits": {},
        "interactions": {},
        "preferences": {},
    })
}

/// Write the documents a fresh account starts with
pub async fn create_user_record<S: RemoteStore>(
    store: &S,
    user_id: &UserId,
    full_name: &str,
    email: &str,
) -> BuzzResult<UserRecord> {
    let record = UserRecord::new(user_id.clone(), full_name, email);
    store
        .write(&paths::user(user_id)?, serde_json::to_value(&record)?)
        .await?;
    debug!(user = %user_id, "User data saved");

    // The account is usable without it
    if let Err(e) = store
        .write(&paths::interactions_root(user_id)?, interactions_node())
        .await
    {
        error!(user = %user_id, error = %e, "Failed to create interactions node");
    }
    Ok(record)
}

/// Validate, create the auth account, then the user record
pub async fn sign_up<A, S>(auth: &A, store: &S, form: &SignupForm) -> BuzzResult<UserRecord>
where
    A: AuthSession,
    S: RemoteStore,
{
    let form = form.trimmed();
    form.validate()?;

    let identity = auth.sign_up(&form.email, &form.password).await?;
    let record = create_user_record(store, &identity.user_id, &form.full_name, &identity.email).await?;
    info!(user = %identity.user_id, "Registration successful");
    Ok(record)
}

/// The signed-in user's display data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProfile {
    pub full_name: String,
    pub followers_count: i64,
    pub following_count: i64,
}

impl SessionProfile {
    /// Profile used when the user's record cannot be read
    pub fn fallback(identity: &Identity) -> Self {
        Self {
            full_name: identity.email_local_part().to_string(),
            followers_count: 0,
            following_count: 0,
        }
    }

    fn from_record(identity: &Identity, record: &Value) -> Self {
        let full_name = record
            .get("fullName")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| identity.email_local_part().to_string());
        let count = |field: &str| record.get(field).and_then(Value::as_i64).unwrap_or(0);
        Self {
            full_name,
            followers_count: count("followersCount"),
            following_count: count("followingCount"),
        }
    }
}

/// Read `users/{id}` once. Never fails: read errors log and fall back to
/// the email's local part with zero counts.
pub async fn load_session_profile<S: RemoteStore>(store: &S, identity: &Identity) -> SessionProfile {
    let path = match paths::user(&identity.user_id) {
        Ok(path) => path,
        Err(e) => {
            warn!(error = %e, "Unusable user id, using fallback profile");
            return SessionProfile::fallback(identity);
        }
    };
    match store.read_once(&path).await {
        Ok(Some(record)) => SessionProfile::from_record(identity, &record),
        Ok(None) => {
            debug!(user = %identity.user_id, "No user record, using fallback profile");
            SessionProfile::fallback(identity)
        }
        Err(e) => {
            error!(user = %identity.user_id, error = %e, "Failed to load user data");
            SessionProfile::fallback(identity)
        }
    }
}

/// Count one more interaction of `me` with `target`
pub async fn track_interaction<S: RemoteStore>(
    store: &S,
    me: &UserId,
    target: &UserId,
    kind: &str,
) -> BuzzResult<i64> {
    let path = paths::interaction(me, target)?;
    let count = store
        .transact_number(&path, |n| n.saturating_add(1))
        .await?
        .committed(&path)?;
    debug!(%me, %target, kind, count, "Tracked interaction");
    Ok(count)
}
