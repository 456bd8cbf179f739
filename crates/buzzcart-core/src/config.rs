//! Data directory layout

use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::Database;
use tracing::info;

use crate::auth::LocalAuth;
use crate::error::BuzzResult;
use crate::store::RedbStore;

/// Database file inside the data directory
pub const DB_FILE: &str = "buzzcart.redb";

/// Saved navigation/session state inside the data directory
pub const SNAPSHOT_FILE: &str = "session.json";

/// Per-device JSONL logs inside the data directory
pub const LOG_DIR: &str = "logs";

/// Where the local backend keeps its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuzzConfig {
    data_dir: PathBuf,
}

impl BuzzConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join(LOG_DIR)
    }

    /// Create the data directory and open the shared database
    pub fn open_database(&self) -> BuzzResult<Arc<Database>> {
        std::fs::create_dir_all(&self.data_dir)?;
        let db_path = self.db_path();
        info!(?db_path, "Opening database");
        Ok(Arc::new(Database::create(&db_path)?))
    }

    /// Auth and store backed by one database file
    pub fn open_backend(&self) -> BuzzResult<(LocalAuth, RedbStore)> {
        let db = self.open_database()?;
        let auth = LocalAuth::with_database(db.clone())?;
        let store = RedbStore::with_database(db)?;
        Ok((auth, store))
    }
}
