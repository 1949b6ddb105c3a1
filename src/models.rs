use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::db::{TweetRecord, UserRecord};

/// Textual length of a hyphenated UUID, the only id form accepted on the wire.
pub const ID_LENGTH: usize = 36;

pub fn parse_record_id(raw: &str) -> Result<Uuid, String> {
    if raw.len() != ID_LENGTH {
        return Err(format!(
            "id must be {} characters long, got {}",
            ID_LENGTH,
            raw.len()
        ));
    }
    Uuid::parse_str(raw).map_err(|e| format!("invalid id {:?}: {}", raw, e))
}

fn record_id<'de, D>(deserializer: D) -> Result<Uuid, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_record_id(&raw).map_err(serde::de::Error::custom)
}

fn optional_record_id<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse_record_id(&raw).map_err(serde::de::Error::custom))
        .transpose()
}

#[derive(Debug, Deserialize)]
pub struct UserPath {
    #[serde(deserialize_with = "record_id")]
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct TweetPath {
    #[serde(deserialize_with = "record_id")]
    pub tweet_id: Uuid,
}

/// Signup payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserRegister {
    #[serde(alias = "user_id", deserialize_with = "record_id")]
    pub id: Uuid,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 50))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50))]
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[validate(length(min = 8, max = 64))]
    pub password: String,
}

/// Login payload, accepted as a JSON body or as form fields.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserLogin {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 64))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserUpdate {
    #[serde(default)]
    #[validate(length(min = 8, max = 64))]
    pub password: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

/// Public view of a user. The stored password never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            first_name: record.first_name,
            last_name: record.last_name,
            birth_date: record.birth_date,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_tweet_times"))]
pub struct TweetPost {
    #[serde(default, alias = "tweet_id", deserialize_with = "optional_record_id")]
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 256))]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "record_id")]
    pub user_id: Uuid,
}

fn validate_tweet_times(tweet: &TweetPost) -> Result<(), ValidationError> {
    match (tweet.created_at, tweet.updated_at) {
        (Some(created), Some(updated)) if updated < created => {
            let mut error = ValidationError::new("updated_before_created");
            error.message = Some("updated_at must not precede created_at".into());
            Err(error)
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TweetUpdate {
    #[validate(length(min = 1, max = 256))]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub user_id: Uuid,
}

impl From<TweetRecord> for Tweet {
    fn from(record: TweetRecord) -> Self {
        Self {
            id: record.id,
            content: record.content,
            created_at: record.created_at,
            updated_at: record.updated_at,
            user_id: record.user_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeleted {
    #[serde(rename = "user id deleted")]
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetDeleted {
    #[serde(rename = "tweet id deleted")]
    pub id: Uuid,
}
