use actix_web::{delete, get, post, put, web, Either, HttpResponse};
use chrono::Utc;
use log::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::db::{StoreError, TweetChanges, TweetRecord, UserChanges, UserRecord};
use crate::error::ApiError;
use crate::models::{
    Tweet, TweetDeleted, TweetPath, TweetPost, TweetUpdate, User, UserDeleted, UserLogin,
    UserPath, UserRegister, UserUpdate,
};
use crate::AppState;

/// Runs store and hashing work on the blocking pool.
async fn blocking<F, T>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    web::block(work).await?
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// Users

#[post("/signup")]
pub async fn signup(
    state: web::Data<AppState>,
    payload: web::Json<UserRegister>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    payload.validate()?;

    let state = state.into_inner();
    let user = blocking(move || {
        let hashed_password = state.hasher.hash(&payload.password)?;
        let record = UserRecord {
            id: payload.id,
            email: normalize_email(&payload.email),
            first_name: payload.first_name,
            last_name: payload.last_name,
            birth_date: payload.birth_date,
            hashed_password,
        };
        Ok(state.store.create_user(record)?)
    })
    .await?;

    info!("User registered: {}", user.id);
    Ok(HttpResponse::Created().json(User::from(user)))
}

#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    payload: Either<web::Json<UserLogin>, web::Form<UserLogin>>,
) -> Result<HttpResponse, ApiError> {
    let credentials = match payload {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    };
    credentials.validate()?;

    let state = state.into_inner();
    let user = blocking(move || {
        let user = match state
            .store
            .find_user_by_email(&normalize_email(&credentials.email))
        {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => return Err(ApiError::AuthenticationDenied),
            Err(e) => return Err(e.into()),
        };
        if state
            .hasher
            .verify(&credentials.password, &user.hashed_password)?
        {
            Ok(user)
        } else {
            Err(ApiError::AuthenticationDenied)
        }
    })
    .await?;

    info!("User logged in: {}", user.id);
    Ok(HttpResponse::Ok().json(User::from(user)))
}

#[get("/users")]
pub async fn show_all_users(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let state = state.into_inner();
    let users = blocking(move || Ok(state.store.list_users()?)).await?;
    debug!("Found {} users", users.len());
    let users: Vec<User> = users.into_iter().map(User::from).collect();
    Ok(HttpResponse::Ok().json(users))
}

#[get("/users/{user_id}")]
pub async fn show_user(
    state: web::Data<AppState>,
    path: web::Path<UserPath>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner().user_id;
    let state = state.into_inner();
    let user = blocking(move || Ok(state.store.get_user(user_id)?)).await?;
    Ok(HttpResponse::Ok().json(User::from(user)))
}

#[delete("/users/{user_id}/delete")]
pub async fn delete_user(
    state: web::Data<AppState>,
    path: web::Path<UserPath>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner().user_id;
    let state = state.into_inner();
    blocking(move || Ok(state.store.delete_user(user_id)?)).await?;
    info!("User deleted: {}", user_id);
    Ok(HttpResponse::Ok().json(UserDeleted { id: user_id }))
}

#[put("/users/{user_id}/update")]
pub async fn update_user(
    state: web::Data<AppState>,
    path: web::Path<UserPath>,
    payload: web::Json<UserUpdate>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner().user_id;
    let payload = payload.into_inner();
    payload.validate()?;

    let state = state.into_inner();
    let user = blocking(move || {
        let hashed_password = payload
            .password
            .as_deref()
            .map(|password| state.hasher.hash(password))
            .transpose()?;
        let changes = UserChanges {
            hashed_password,
            birth_date: payload.birth_date,
        };
        Ok(state.store.update_user(user_id, changes)?)
    })
    .await?;

    info!("User updated: {}", user_id);
    Ok(HttpResponse::Ok().json(User::from(user)))
}

// Tweets

#[get("/")]
pub async fn home(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let state = state.into_inner();
    let tweets = blocking(move || Ok(state.store.list_tweets()?)).await?;
    debug!("Found {} tweets", tweets.len());
    let tweets: Vec<Tweet> = tweets.into_iter().map(Tweet::from).collect();
    Ok(HttpResponse::Ok().json(tweets))
}

#[post("/post")]
pub async fn post_tweet(
    state: web::Data<AppState>,
    payload: web::Json<TweetPost>,
) -> Result<HttpResponse, ApiError> {
    let mut payload = payload.into_inner();
    // updated_at is checked against the creation time actually stored
    let created_at = *payload.created_at.get_or_insert_with(Utc::now);
    payload.validate()?;

    let record = TweetRecord {
        id: payload.id.unwrap_or_else(Uuid::new_v4),
        content: payload.content,
        created_at,
        updated_at: payload.updated_at,
        user_id: payload.user_id,
    };
    let state = state.into_inner();
    let tweet = blocking(move || Ok(state.store.create_tweet(record)?)).await?;

    info!("Tweet created successfully: {}", tweet.id);
    Ok(HttpResponse::Created().json(Tweet::from(tweet)))
}

#[get("/tweets/{tweet_id}")]
pub async fn show_tweet(
    state: web::Data<AppState>,
    path: web::Path<TweetPath>,
) -> Result<HttpResponse, ApiError> {
    let tweet_id = path.into_inner().tweet_id;
    let state = state.into_inner();
    let tweet = blocking(move || Ok(state.store.get_tweet(tweet_id)?)).await?;
    Ok(HttpResponse::Ok().json(Tweet::from(tweet)))
}

#[delete("/tweets/{tweet_id}/delete")]
pub async fn delete_tweet(
    state: web::Data<AppState>,
    path: web::Path<TweetPath>,
) -> Result<HttpResponse, ApiError> {
    let tweet_id = path.into_inner().tweet_id;
    let state = state.into_inner();
    blocking(move || Ok(state.store.delete_tweet(tweet_id)?)).await?;
    info!("Tweet deleted: {}", tweet_id);
    Ok(HttpResponse::Ok().json(TweetDeleted { id: tweet_id }))
}

#[put("/tweets/{tweet_id}/update")]
pub async fn update_tweet(
    state: web::Data<AppState>,
    path: web::Path<TweetPath>,
    payload: web::Json<TweetUpdate>,
) -> Result<HttpResponse, ApiError> {
    let tweet_id = path.into_inner().tweet_id;
    let payload = payload.into_inner();
    payload.validate()?;

    let state = state.into_inner();
    let changes = TweetChanges {
        content: payload.content,
    };
    let tweet = blocking(move || Ok(state.store.update_tweet(tweet_id, changes)?)).await?;

    info!("Tweet updated: {}", tweet_id);
    Ok(HttpResponse::Ok().json(Tweet::from(tweet)))
}
