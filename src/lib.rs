//! Micro-blogging backend: users sign up and post tweets over HTTP, persisted
//! in SQLite, flat JSON files or memory.

use std::sync::Arc;

use actix_web::web;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;

use crate::auth::CredentialHasher;
use crate::db::Store;
use crate::error::ApiError;

/// Shared by every worker; cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub hasher: Arc<dyn CredentialHasher>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }
}

/// Registers every route together with extractor settings that report
/// malformed bodies and ids as validation errors.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::FormConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .service(handlers::signup)
    .service(handlers::login)
    .service(handlers::show_all_users)
    .service(handlers::show_user)
    .service(handlers::delete_user)
    .service(handlers::update_user)
    .service(handlers::home)
    .service(handlers::post_tweet)
    .service(handlers::show_tweet)
    .service(handlers::delete_tweet)
    .service(handlers::update_tweet);
}
