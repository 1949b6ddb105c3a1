use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::records::{self, TweetChanges, TweetRecord, UserChanges, UserRecord};
use super::{Store, StoreError};

pub const USERS_FILE: &str = "users.json";
pub const TWEETS_FILE: &str = "tweets.json";

/// One JSON array file guarded by its own lock.
struct Collection {
    path: PathBuf,
    lock: Mutex<()>,
}

/// Exclusive access to a collection file for the lifetime of the guard.
struct Locked<'a> {
    path: &'a Path,
    _guard: MutexGuard<'a, ()>,
}

impl Collection {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> Result<Locked<'_>, StoreError> {
        let guard = self
            .lock
            .lock()
            .map_err(|_| StoreError::Poisoned(self.path.display().to_string()))?;
        Ok(Locked {
            path: &self.path,
            _guard: guard,
        })
    }
}

impl Locked<'_> {
    fn read_all<T: DeserializeOwned>(&self) -> Result<Vec<T>, StoreError> {
        match fs::read(self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Replaces the whole file. The new content is written beside it first and
    /// renamed into place.
    fn write_all<T: Serialize>(&self, items: &[T]) -> Result<(), StoreError> {
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec_pretty(items)?)?;
        fs::rename(&staging, self.path)?;
        debug!("Wrote {} records to {}", items.len(), self.path.display());
        Ok(())
    }
}

/// Flat-file store keeping `users.json` and `tweets.json` in one directory.
///
/// Locks are always taken users first, then tweets.
pub struct JsonFileStore {
    users: Collection,
    tweets: Collection,
}

impl JsonFileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            users: Collection::new(dir.join(USERS_FILE)),
            tweets: Collection::new(dir.join(TWEETS_FILE)),
        })
    }
}

impl Store for JsonFileStore {
    fn create_user(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        let file = self.users.lock()?;
        let mut users: Vec<UserRecord> = file.read_all()?;
        let user = records::insert_user(&mut users, user)?;
        file.write_all(&users)?;
        Ok(user)
    }

    fn get_user(&self, id: Uuid) -> Result<UserRecord, StoreError> {
        let users: Vec<UserRecord> = self.users.lock()?.read_all()?;
        records::find_user(&users, id).cloned()
    }

    fn find_user_by_email(&self, email: &str) -> Result<UserRecord, StoreError> {
        let users: Vec<UserRecord> = self.users.lock()?.read_all()?;
        records::find_user_by_email(&users, email).cloned()
    }

    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.users.lock()?.read_all()
    }

    fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        let users_file = self.users.lock()?;
        let tweets_file = self.tweets.lock()?;
        let mut users: Vec<UserRecord> = users_file.read_all()?;
        records::remove_user(&mut users, id)?;

        let mut tweets: Vec<TweetRecord> = tweets_file.read_all()?;
        users_file.write_all(&users)?;

        let before = tweets.len();
        tweets.retain(|t| t.user_id != id);
        if tweets.len() != before {
            tweets_file.write_all(&tweets)?;
        }
        Ok(())
    }

    fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<UserRecord, StoreError> {
        let file = self.users.lock()?;
        let mut users: Vec<UserRecord> = file.read_all()?;
        let user = records::find_user_mut(&mut users, id)?;
        user.apply(changes);
        let user = user.clone();
        file.write_all(&users)?;
        Ok(user)
    }

    fn create_tweet(&self, tweet: TweetRecord) -> Result<TweetRecord, StoreError> {
        let users_file = self.users.lock()?;
        let tweets_file = self.tweets.lock()?;
        let users: Vec<UserRecord> = users_file.read_all()?;
        let mut tweets: Vec<TweetRecord> = tweets_file.read_all()?;
        let tweet = records::insert_tweet(&users, &mut tweets, tweet)?;
        tweets_file.write_all(&tweets)?;
        Ok(tweet)
    }

    fn get_tweet(&self, id: Uuid) -> Result<TweetRecord, StoreError> {
        let tweets: Vec<TweetRecord> = self.tweets.lock()?.read_all()?;
        records::find_tweet(&tweets, id).cloned()
    }

    fn list_tweets(&self) -> Result<Vec<TweetRecord>, StoreError> {
        self.tweets.lock()?.read_all()
    }

    fn delete_tweet(&self, id: Uuid) -> Result<(), StoreError> {
        let file = self.tweets.lock()?;
        let mut tweets: Vec<TweetRecord> = file.read_all()?;
        records::remove_tweet(&mut tweets, id)?;
        file.write_all(&tweets)
    }

    fn update_tweet(&self, id: Uuid, changes: TweetChanges) -> Result<TweetRecord, StoreError> {
        let file = self.tweets.lock()?;
        let mut tweets: Vec<TweetRecord> = file.read_all()?;
        let tweet = records::find_tweet_mut(&mut tweets, id)?;
        tweet.revise(changes, Utc::now());
        let tweet = tweet.clone();
        file.write_all(&tweets)?;
        Ok(tweet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn user(n: usize) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            email: format!("user{}@example.com", n),
            first_name: "Ana".into(),
            last_name: "Li".into(),
            birth_date: None,
            hashed_password: "hash".into(),
        }
    }

    #[test]
    fn missing_and_empty_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(store.list_users().unwrap().is_empty());

        fs::write(dir.path().join(TWEETS_FILE), "  \n").unwrap();
        assert!(store.list_tweets().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(USERS_FILE), "{not json").unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(matches!(store.list_users(), Err(StoreError::Json(_))));
    }

    #[test]
    fn values_are_stored_as_strings() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let mut record = user(0);
        record.birth_date = chrono::NaiveDate::from_ymd_opt(1990, 4, 1);
        store.create_user(record.clone()).unwrap();

        let raw = fs::read_to_string(dir.path().join(USERS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["id"], record.id.to_string());
        assert_eq!(value[0]["birth_date"], "1990-04-01");
        assert!(!dir.path().join("users.json.tmp").exists());
    }

    #[test]
    fn failed_user_write_keeps_their_tweets() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let author = store.create_user(user(0)).unwrap();
        let tweet = store
            .create_tweet(TweetRecord {
                id: Uuid::new_v4(),
                content: "still here".into(),
                created_at: Utc::now(),
                updated_at: None,
                user_id: author.id,
            })
            .unwrap();

        // a directory where the staging file should go makes the users write fail
        fs::create_dir(dir.path().join("users.json.tmp")).unwrap();
        assert!(matches!(store.delete_user(author.id), Err(StoreError::Io(_))));

        assert_eq!(store.get_user(author.id).unwrap(), author);
        assert_eq!(store.list_tweets().unwrap(), vec![tweet]);
    }

    #[test]
    fn concurrent_writers_do_not_lose_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.create_user(user(n)).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.list_users().unwrap().len(), 8);
    }
}
