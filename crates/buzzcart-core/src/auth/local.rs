//! Local account store - credentials and the current session in redb.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use rand::RngCore;
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::{AuthSession, Identity, MIN_PASSWORD_LEN};
use crate::error::{BuzzError, BuzzResult};
use crate::types::UserId;

/// Table for credentials (key: lowercased email, value: postcard Credential)
const CREDENTIALS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("credentials");

/// Table for the current session (single key)
const SESSION_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("session");

const SESSION_KEY: &str = "current";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Credential {
    user_id: UserId,
    email: String,
    salt: [u8; 16],
    digest: [u8; 32],
    created_at: i64,
}

impl Credential {
    fn new(email: &str, password: &str) -> Self {
        let mut salt = [0u8; 16];
        rand::rng().fill_bytes(&mut salt);
        Self {
            user_id: UserId::new(),
            email: email.to_string(),
            digest: digest(&salt, password),
            salt,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    fn verify(&self, password: &str) -> bool {
        digest(&self.salt, password) == self.digest
    }

    fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
        }
    }
}

fn digest(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

fn validate_email(email: &str) -> BuzzResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(BuzzError::InvalidEmail(email.to_string())),
    }
}

/// [`AuthSession`] backed by redb
#[derive(Clone)]
pub struct LocalAuth {
    db: Arc<Database>,
    current: Arc<RwLock<Option<Identity>>>,
}

impl LocalAuth {
    /// Open or create an account file at `path`
    pub fn open(path: impl AsRef<Path>) -> BuzzResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_database(Arc::new(Database::create(path)?))
    }

    /// Volatile account store, for tests
    pub fn in_memory() -> BuzzResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::with_database(Arc::new(db))
    }

    /// Use an already opened database and restore any persisted session
    pub fn with_database(db: Arc<Database>) -> BuzzResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CREDENTIALS_TABLE)?;
            let _ = write_txn.open_table(SESSION_TABLE)?;
        }
        write_txn.commit()?;

        let current = {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(SESSION_TABLE)?;
            match table.get(SESSION_KEY)? {
                Some(bytes) => Some(postcard::from_bytes::<Identity>(bytes.value())?),
                None => None,
            }
        };
        if let Some(ref identity) = current {
            debug!(user = %identity.user_id, "Restored session");
        }

        Ok(Self {
            db,
            current: Arc::new(RwLock::new(current)),
        })
    }

    fn load_credential(&self, email: &str) -> BuzzResult<Option<Credential>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CREDENTIALS_TABLE)?;
        match table.get(email.to_lowercase().as_str())? {
            Some(bytes) => Ok(Some(postcard::from_bytes(bytes.value())?)),
            None => Ok(None),
        }
    }

    /// Insert a credential unless the email is taken (checked inside the
    /// write transaction)
    fn insert_credential(&self, credential: &Credential) -> BuzzResult<()> {
        let key = credential.email.to_lowercase();
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CREDENTIALS_TABLE)?;
            if table.get(key.as_str())?.is_some() {
                return Err(BuzzError::EmailInUse(credential.email.clone()));
            }
            let bytes = postcard::to_allocvec(credential)?;
            table.insert(key.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn persist_session(&self, identity: Option<&Identity>) -> BuzzResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSION_TABLE)?;
            match identity {
                Some(identity) => {
                    let bytes = postcard::to_allocvec(identity)?;
                    table.insert(SESSION_KEY, bytes.as_slice())?;
                }
                None => {
                    table.remove(SESSION_KEY)?;
                }
            }
        }
        write_txn.commit()?;
        *self.current.write() = identity.cloned();
        Ok(())
    }
}

impl AuthSession for LocalAuth {
    fn current_identity(&self) -> Option<Identity> {
        self.current.read().clone()
    }

    async fn sign_in(&self, email: &str, password: &str) -> BuzzResult<Identity> {
        let email = email.trim();
        let credential = match self.load_credential(email)? {
            Some(c) if c.verify(password) => c,
            _ => {
                warn!(email, "Sign-in failed");
                return Err(BuzzError::InvalidCredentials);
            }
        };
        let identity = credential.identity();
        self.persist_session(Some(&identity))?;
        info!(user = %identity.user_id, "Signed in");
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> BuzzResult<Identity> {
        let email = email.trim();
        validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BuzzError::WeakPassword(MIN_PASSWORD_LEN));
        }

        let credential = Credential::new(email, password);
        self.insert_credential(&credential)?;

        let identity = credential.identity();
        self.persist_session(Some(&identity))?;
        info!(user = %identity.user_id, "Account created");
        Ok(identity)
    }

    fn sign_out(&self) -> BuzzResult<()> {
        if let Some(identity) = self.current_identity() {
            info!(user = %identity.user_id, "Signed out");
        }
        self.persist_session(None)
    }
}
