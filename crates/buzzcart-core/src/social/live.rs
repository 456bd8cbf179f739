//! Live user documents
//!
//! A [`ProfileWatch`] keeps one subscription on `users/{id}` and decodes
//! every change into a [`UserRecord`]. The app holds one for the signed-in
//! user, which keeps the cached counters and follow buttons current, and one
//! for the visited profile, which keeps its stats current.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::store::{paths, RemoteStore, StoreEvent, Subscription};
use crate::types::{UserId, UserRecord};

pub struct ProfileWatch<S: RemoteStore> {
    store: Arc<S>,
    user_id: UserId,
    subscription: Option<Subscription>,
}

impl<S: RemoteStore> ProfileWatch<S> {
    /// Subscribe to `user_id`'s document
    ///
    /// The value current at subscription time is skipped; callers have just
    /// read it. A failed subscription leaves the watch closed.
    pub fn open(store: Arc<S>, user_id: UserId) -> Self {
        let subscription = match paths::user(&user_id).and_then(|path| store.subscribe(&path)) {
            Ok(mut subscription) => match subscription.try_next() {
                Some(StoreEvent::Cancelled(reason)) => {
                    warn!(user = %user_id, %reason, "Profile subscription refused");
                    None
                }
                _ => Some(subscription),
            },
            Err(e) => {
                warn!(user = %user_id, error = %e, "Profile subscription failed");
                None
            }
        };
        debug!(user = %user_id, live = subscription.is_some(), "Watching profile");
        Self {
            store,
            user_id,
            subscription,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    /// Next version of the document. `None` once the subscription ends.
    ///
    /// Removed or undecodable documents are skipped.
    pub async fn next_record(&mut self) -> Option<UserRecord> {
        loop {
            let Some(event) = self.subscription.as_mut()?.next().await else {
                self.close();
                return None;
            };
            match event {
                StoreEvent::Changed(Some(value)) => {
                    match UserRecord::from_value(self.user_id.clone(), value) {
                        Ok(record) => return Some(record),
                        Err(e) => warn!(user = %self.user_id, error = %e, "Skipping malformed profile"),
                    }
                }
                StoreEvent::Changed(None) => debug!(user = %self.user_id, "Watched profile is gone"),
                StoreEvent::Cancelled(reason) => {
                    warn!(user = %self.user_id, %reason, "Profile subscription cancelled");
                    self.close();
                    return None;
                }
            }
        }
    }

    pub fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.store.unsubscribe(subscription.id());
        }
    }
}

impl<S: RemoteStore> Drop for ProfileWatch<S> {
    fn drop(&mut self) {
        self.close();
    }
}
