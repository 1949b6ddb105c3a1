use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use uuid::Uuid;

use super::records::{self, TweetChanges, TweetRecord, UserChanges, UserRecord};
use super::{Store, StoreError};

#[derive(Default)]
struct Tables {
    users: Vec<UserRecord>,
    tweets: Vec<TweetRecord>,
}

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Poisoned("in-memory tables".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Poisoned("in-memory tables".into()))
    }
}

impl Store for InMemoryStore {
    fn create_user(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        records::insert_user(&mut self.write()?.users, user)
    }

    fn get_user(&self, id: Uuid) -> Result<UserRecord, StoreError> {
        records::find_user(&self.read()?.users, id).cloned()
    }

    fn find_user_by_email(&self, email: &str) -> Result<UserRecord, StoreError> {
        records::find_user_by_email(&self.read()?.users, email).cloned()
    }

    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.read()?.users.clone())
    }

    fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        records::remove_user(&mut tables.users, id)?;
        tables.tweets.retain(|t| t.user_id != id);
        Ok(())
    }

    fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<UserRecord, StoreError> {
        let mut tables = self.write()?;
        let user = records::find_user_mut(&mut tables.users, id)?;
        user.apply(changes);
        Ok(user.clone())
    }

    fn create_tweet(&self, tweet: TweetRecord) -> Result<TweetRecord, StoreError> {
        let mut tables = self.write()?;
        let Tables { users, tweets } = &mut *tables;
        records::insert_tweet(users, tweets, tweet)
    }

    fn get_tweet(&self, id: Uuid) -> Result<TweetRecord, StoreError> {
        records::find_tweet(&self.read()?.tweets, id).cloned()
    }

    fn list_tweets(&self) -> Result<Vec<TweetRecord>, StoreError> {
        Ok(self.read()?.tweets.clone())
    }

    fn delete_tweet(&self, id: Uuid) -> Result<(), StoreError> {
        records::remove_tweet(&mut self.write()?.tweets, id)
    }

    fn update_tweet(&self, id: Uuid, changes: TweetChanges) -> Result<TweetRecord, StoreError> {
        let mut tables = self.write()?;
        let tweet = records::find_tweet_mut(&mut tables.tweets, id)?;
        tweet.revise(changes, Utc::now());
        Ok(tweet.clone())
    }
}
