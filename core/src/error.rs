use thiserror::Error;

use crate::auth::AuthError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Login required")]
    NotLoggedIn,
}

pub type Result<T> = std::result::Result<T, Error>;
