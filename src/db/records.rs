use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StoreError;

/// A stored user. `hashed_password` is whatever the configured hasher produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub hashed_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetRecord {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub user_id: Uuid,
}

/// Fields a user may change after signup. `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub hashed_password: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweetChanges {
    pub content: String,
}

impl UserRecord {
    pub fn apply(&mut self, changes: UserChanges) {
        if let Some(hashed_password) = changes.hashed_password {
            self.hashed_password = hashed_password;
        }
        if let Some(birth_date) = changes.birth_date {
            self.birth_date = Some(birth_date);
        }
    }
}

impl TweetRecord {
    /// Replaces the content and stamps `updated_at`, never earlier than `created_at`.
    pub fn revise(&mut self, changes: TweetChanges, now: DateTime<Utc>) {
        self.content = changes.content;
        self.updated_at = Some(now.max(self.created_at));
    }
}

// Collection helpers shared by the backends that keep whole collections in a Vec.

pub(super) fn insert_user(
    users: &mut Vec<UserRecord>,
    user: UserRecord,
) -> Result<UserRecord, StoreError> {
    if users.iter().any(|u| u.id == user.id) {
        return Err(StoreError::duplicate_user(user.id));
    }
    if users.iter().any(|u| u.email == user.email) {
        return Err(StoreError::duplicate_email(&user.email));
    }
    users.push(user.clone());
    Ok(user)
}

pub(super) fn find_user(users: &[UserRecord], id: Uuid) -> Result<&UserRecord, StoreError> {
    users
        .iter()
        .find(|u| u.id == id)
        .ok_or_else(|| StoreError::user_not_found(id))
}

pub(super) fn find_user_mut(
    users: &mut [UserRecord],
    id: Uuid,
) -> Result<&mut UserRecord, StoreError> {
    users
        .iter_mut()
        .find(|u| u.id == id)
        .ok_or_else(|| StoreError::user_not_found(id))
}

pub(super) fn find_user_by_email<'a>(
    users: &'a [UserRecord],
    email: &str,
) -> Result<&'a UserRecord, StoreError> {
    users
        .iter()
        .find(|u| u.email == email)
        .ok_or_else(|| StoreError::NotFound(format!("user with email {}", email)))
}

pub(super) fn remove_user(users: &mut Vec<UserRecord>, id: Uuid) -> Result<(), StoreError> {
    let index = users
        .iter()
        .position(|u| u.id == id)
        .ok_or_else(|| StoreError::user_not_found(id))?;
    users.remove(index);
    Ok(())
}

pub(super) fn insert_tweet(
    users: &[UserRecord],
    tweets: &mut Vec<TweetRecord>,
    tweet: TweetRecord,
) -> Result<TweetRecord, StoreError> {
    if !users.iter().any(|u| u.id == tweet.user_id) {
        return Err(StoreError::missing_author(tweet.user_id));
    }
    if tweets.iter().any(|t| t.id == tweet.id) {
        return Err(StoreError::duplicate_tweet(tweet.id));
    }
    tweets.push(tweet.clone());
    Ok(tweet)
}

pub(super) fn find_tweet(tweets: &[TweetRecord], id: Uuid) -> Result<&TweetRecord, StoreError> {
    tweets
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| StoreError::tweet_not_found(id))
}

pub(super) fn find_tweet_mut(
    tweets: &mut [TweetRecord],
    id: Uuid,
) -> Result<&mut TweetRecord, StoreError> {
    tweets
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| StoreError::tweet_not_found(id))
}

pub(super) fn remove_tweet(tweets: &mut Vec<TweetRecord>, id: Uuid) -> Result<(), StoreError> {
    let index = tweets
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| StoreError::tweet_not_found(id))?;
    tweets.remove(index);
    Ok(())
}
