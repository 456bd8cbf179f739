//! Error types for BuzzCart

use thiserror::Error;

/// Main error type for BuzzCart operations
#[derive(Error, Debug)]
pub enum BuzzError {
    /// No user is signed in
    #[error("Not signed in")]
    NotSignedIn,

    /// No record exists for this user id
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// The operation needs a different screen to be active
    #[error("Not available on this screen: {0}")]
    WrongScreen(String),

    /// Email/password pair did not match a known account
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists
    #[error("Email already in use: {0}")]
    EmailInUse(String),

    /// Email address is malformed
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Password does not meet the minimum length
    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    /// User-facing form validation failed
    #[error("{0}")]
    Validation(String),

    /// Store path is malformed (empty segment or reserved character)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Store rejected the operation on this path
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Numeric transaction did not commit
    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    /// Tab name did not match a known tab
    #[error("Unknown tab: {0}")]
    UnknownTab(String),

    /// Search filter name did not match a known filter
    #[error("Unknown search filter: {0}")]
    UnknownFilter(String),

    /// Error during storage operations (redb)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database creation/opening error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage operation error
    #[error("Storage operation error: {0}")]
    StorageOp(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for BuzzError {
    fn from(err: serde_json::Error) -> Self {
        BuzzError::Serialization(err.to_string())
    }
}

impl From<postcard::Error> for BuzzError {
    fn from(err: postcard::Error) -> Self {
        BuzzError::Serialization(err.to_string())
    }
}

/// Result type alias using BuzzError
pub type BuzzResult<T> = Result<T, BuzzError>;
