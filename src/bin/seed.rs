use std::error::Error;

use chrono::{NaiveDate, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::{FirstName, LastName};
use fake::{Dummy, Fake, Faker};
use uuid::Uuid;

use microblog::auth::{BcryptHasher, CredentialHasher};
use microblog::config::Config;
use microblog::db::{self, Store, StoreError, TweetRecord, UserRecord};

#[derive(Debug, Dummy)]
struct FakeUser {
    #[dummy(faker = "SafeEmail()")]
    email: String,
    #[dummy(faker = "FirstName()")]
    first_name: String,
    #[dummy(faker = "LastName()")]
    last_name: String,
    #[dummy(faker = "1950..2006")]
    birth_year: i32,
    #[dummy(faker = "1..13")]
    birth_month: u32,
    #[dummy(faker = "1..29")]
    birth_day: u32,
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("Starting data seeding...");

    let config = Config::try_parse()?;
    let store = db::open(&config)?;
    let hasher = BcryptHasher::new(config.bcrypt_cost);

    // Configuration
    let num_users = 100;
    let tweets_per_user = 20;

    let users = seed_users(store.as_ref(), &hasher, num_users)?;
    seed_tweets(store.as_ref(), &users, tweets_per_user)?;

    println!("Seeding completed!");
    Ok(())
}

fn seed_users(
    store: &dyn Store,
    hasher: &dyn CredentialHasher,
    count: usize,
) -> Result<Vec<Uuid>, Box<dyn Error>> {
    println!("Creating {} users...", count);
    let mut users = Vec::new();
    let password_hash = hasher.hash("password123")?;

    for i in 0..count {
        let fake: FakeUser = Faker.fake();
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: fake.email.to_lowercase(),
            first_name: fake.first_name,
            last_name: fake.last_name,
            birth_date: NaiveDate::from_ymd_opt(fake.birth_year, fake.birth_month, fake.birth_day),
            hashed_password: password_hash.clone(),
        };

        match store.create_user(record) {
            Ok(user) => {
                println!(
                    "Created user {}/{}: {} ({})",
                    i + 1,
                    count,
                    user.email,
                    user.id
                );
                users.push(user.id);
            }
            Err(StoreError::Conflict(reason)) => {
                println!("Skipped user {}/{}: {}", i + 1, count, reason);
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(users)
}

fn seed_tweets(
    store: &dyn Store,
    users: &[Uuid],
    tweets_per_user: usize,
) -> Result<(), Box<dyn Error>> {
    println!("Creating {} tweets per user...", tweets_per_user);
    let total_tweets = users.len() * tweets_per_user;
    let mut current_tweet = 0;

    for &user_id in users {
        for _ in 0..tweets_per_user {
            let content: String = Sentence(3..10).fake();
            store.create_tweet(TweetRecord {
                id: Uuid::new_v4(),
                content,
                created_at: Utc::now(),
                updated_at: None,
                user_id,
            })?;

            current_tweet += 1;
            if current_tweet % 100 == 0 {
                println!("Created {}/{} tweets", current_tweet, total_tweets);
            }
        }
    }

    Ok(())
}
