use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use log::info;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::ffi::{
    SQLITE_CONSTRAINT_FOREIGNKEY, SQLITE_CONSTRAINT_PRIMARYKEY, SQLITE_CONSTRAINT_UNIQUE,
};
use rusqlite::types::Type;
use rusqlite::{params, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use uuid::Uuid;

use super::records::{TweetChanges, TweetRecord, UserChanges, UserRecord};
use super::{Store, StoreError};

pub type SqlitePool = r2d2::Pool<SqliteConnectionManager>;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id              TEXT PRIMARY KEY NOT NULL,
    email           TEXT NOT NULL UNIQUE,
    first_name      TEXT NOT NULL,
    last_name       TEXT NOT NULL,
    birth_date      TEXT,
    hashed_password TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tweets (
    id         TEXT PRIMARY KEY NOT NULL,
    content    TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT,
    user_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_tweets_user_id ON tweets(user_id);
"#;

const USER_COLUMNS: &str = "id, email, first_name, last_name, birth_date, hashed_password";
const TWEET_COLUMNS: &str = "id, content, created_at, updated_at, user_id";

/// Relational store on SQLite. Each operation checks a connection out of the
/// pool and returns it when the operation ends.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>, max_connections: u32) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(path.as_ref()).with_init(|conn| {
            conn.busy_timeout(Duration::from_secs(5))?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        });
        let pool = r2d2::Pool::builder()
            .max_size(max_connections)
            .build(manager)?;
        let store = Self { pool };
        store.migrate()?;
        info!("SQLite store ready at {}", path.as_ref().display());
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.pool.get()?.execute_batch(SCHEMA)?;
        Ok(())
    }
}

fn constraint_code(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            Some(e.extended_code)
        }
        _ => None,
    }
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: uuid_column(row, 0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        birth_date: row.get(4)?,
        hashed_password: row.get(5)?,
    })
}

fn tweet_from_row(row: &Row<'_>) -> rusqlite::Result<TweetRecord> {
    Ok(TweetRecord {
        id: uuid_column(row, 0)?,
        content: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
        user_id: uuid_column(row, 4)?,
    })
}

impl Store for SqliteStore {
    fn create_user(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        let conn = self.pool.get()?;
        let result = conn.execute(
            &format!("INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)", USER_COLUMNS),
            params![
                user.id.to_string(),
                user.email,
                user.first_name,
                user.last_name,
                user.birth_date,
                user.hashed_password,
            ],
        );
        match result {
            Ok(_) => Ok(user),
            Err(err) => Err(match constraint_code(&err) {
                Some(SQLITE_CONSTRAINT_PRIMARYKEY) => StoreError::duplicate_user(user.id),
                Some(SQLITE_CONSTRAINT_UNIQUE) => StoreError::duplicate_email(&user.email),
                _ => err.into(),
            }),
        }
    }

    fn get_user(&self, id: Uuid) -> Result<UserRecord, StoreError> {
        let conn = self.pool.get()?;
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            params![id.to_string()],
            user_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::user_not_found(id))
    }

    fn find_user_by_email(&self, email: &str) -> Result<UserRecord, StoreError> {
        let conn = self.pool.get()?;
        conn.query_row(
            &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
            params![email],
            user_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("user with email {}", email)))
    }

    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY rowid", USER_COLUMNS))?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        match conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])? {
            0 => Err(StoreError::user_not_found(id)),
            _ => Ok(()),
        }
    }

    fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<UserRecord, StoreError> {
        let conn = self.pool.get()?;
        let updated = conn.execute(
            "UPDATE users
             SET hashed_password = COALESCE(?1, hashed_password),
                 birth_date = COALESCE(?2, birth_date)
             WHERE id = ?3",
            params![changes.hashed_password, changes.birth_date, id.to_string()],
        )?;
        if updated == 0 {
            return Err(StoreError::user_not_found(id));
        }
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            params![id.to_string()],
            user_from_row,
        )
        .map_err(Into::into)
    }

    fn create_tweet(&self, tweet: TweetRecord) -> Result<TweetRecord, StoreError> {
        let conn = self.pool.get()?;
        let result = conn.execute(
            &format!("INSERT INTO tweets ({}) VALUES (?1, ?2, ?3, ?4, ?5)", TWEET_COLUMNS),
            params![
                tweet.id.to_string(),
                tweet.content,
                tweet.created_at,
                tweet.updated_at,
                tweet.user_id.to_string(),
            ],
        );
        match result {
            Ok(_) => Ok(tweet),
            Err(err) => Err(match constraint_code(&err) {
                Some(SQLITE_CONSTRAINT_FOREIGNKEY) => StoreError::missing_author(tweet.user_id),
                Some(SQLITE_CONSTRAINT_PRIMARYKEY) => StoreError::duplicate_tweet(tweet.id),
                _ => err.into(),
            }),
        }
    }

    fn get_tweet(&self, id: Uuid) -> Result<TweetRecord, StoreError> {
        let conn = self.pool.get()?;
        conn.query_row(
            &format!("SELECT {} FROM tweets WHERE id = ?1", TWEET_COLUMNS),
            params![id.to_string()],
            tweet_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::tweet_not_found(id))
    }

    fn list_tweets(&self) -> Result<Vec<TweetRecord>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM tweets ORDER BY rowid", TWEET_COLUMNS))?;
        let tweets = stmt
            .query_map([], tweet_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tweets)
    }

    fn delete_tweet(&self, id: Uuid) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        match conn.execute("DELETE FROM tweets WHERE id = ?1", params![id.to_string()])? {
            0 => Err(StoreError::tweet_not_found(id)),
            _ => Ok(()),
        }
    }

    fn update_tweet(&self, id: Uuid, changes: TweetChanges) -> Result<TweetRecord, StoreError> {
        let mut conn = self.pool.get()?;
        // Take the write lock up front so concurrent editors wait on the busy timeout.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut tweet = tx
            .query_row(
                &format!("SELECT {} FROM tweets WHERE id = ?1", TWEET_COLUMNS),
                params![id.to_string()],
                tweet_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::tweet_not_found(id))?;
        tweet.revise(changes, Utc::now());
        tx.execute(
            "UPDATE tweets SET content = ?1, updated_at = ?2 WHERE id = ?3",
            params![tweet.content, tweet.updated_at, id.to_string()],
        )?;
        tx.commit()?;
        Ok(tweet)
    }
}
