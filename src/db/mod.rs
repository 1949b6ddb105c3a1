//! Persistence for users and tweets.
//!
//! Every backend implements [`Store`] with the same observable behaviour:
//! email uniqueness, tweets requiring an existing author, and deleting a user
//! deleting the user's tweets.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

mod json_file;
mod memory;
mod records;
mod sqlite;

pub use json_file::JsonFileStore;
pub use memory::InMemoryStore;
pub use records::{TweetChanges, TweetRecord, UserChanges, UserRecord};
pub use sqlite::{SqlitePool, SqliteStore};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt data file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

impl StoreError {
    pub(crate) fn user_not_found(id: Uuid) -> Self {
        StoreError::NotFound(format!("user {}", id))
    }

    pub(crate) fn tweet_not_found(id: Uuid) -> Self {
        StoreError::NotFound(format!("tweet {}", id))
    }

    pub(crate) fn duplicate_user(id: Uuid) -> Self {
        StoreError::Conflict(format!("user {} already exists", id))
    }

    pub(crate) fn duplicate_email(email: &str) -> Self {
        StoreError::Conflict(format!("email {} is already registered", email))
    }

    pub(crate) fn duplicate_tweet(id: Uuid) -> Self {
        StoreError::Conflict(format!("tweet {} already exists", id))
    }

    pub(crate) fn missing_author(user_id: Uuid) -> Self {
        StoreError::Conflict(format!("user {} does not exist", user_id))
    }
}

/// Blocking persistence contract shared by all backends.
///
/// Calls may block on disk or database I/O; async callers should run them on
/// a blocking pool.
pub trait Store: Send + Sync {
    fn create_user(&self, user: UserRecord) -> Result<UserRecord, StoreError>;
    fn get_user(&self, id: Uuid) -> Result<UserRecord, StoreError>;
    fn find_user_by_email(&self, email: &str) -> Result<UserRecord, StoreError>;
    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError>;
    /// Removes the user together with every tweet the user posted.
    fn delete_user(&self, id: Uuid) -> Result<(), StoreError>;
    fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<UserRecord, StoreError>;

    /// Fails with `Conflict` when `tweet.user_id` does not name a stored user.
    fn create_tweet(&self, tweet: TweetRecord) -> Result<TweetRecord, StoreError>;
    fn get_tweet(&self, id: Uuid) -> Result<TweetRecord, StoreError>;
    fn list_tweets(&self) -> Result<Vec<TweetRecord>, StoreError>;
    fn delete_tweet(&self, id: Uuid) -> Result<(), StoreError>;
    fn update_tweet(&self, id: Uuid, changes: TweetChanges) -> Result<TweetRecord, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    JsonFile,
    Memory,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Sqlite => "sqlite",
            Backend::JsonFile => "json",
            Backend::Memory => "memory",
        })
    }
}

/// Opens the backend selected by `config`.
pub fn open(config: &Config) -> Result<Arc<dyn Store>, StoreError> {
    let store: Arc<dyn Store> = match config.backend {
        Backend::Sqlite => Arc::new(SqliteStore::open(
            &config.database_path,
            config.max_connections,
        )?),
        Backend::JsonFile => Arc::new(JsonFileStore::open(&config.data_dir)?),
        Backend::Memory => Arc::new(InMemoryStore::new()),
    };
    Ok(store)
}
