//! Email/password accounts.
//!
//! Accounts live in the local database. Passwords are stored as the
//! SHA-256 digest of a per-account salt followed by the password.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::{Account, Session};
use crate::storage::AccountRepository;
use crate::{Error, Result};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_FAILED_ATTEMPTS: u32 = 5;
pub const LOCKOUT_MINUTES: i64 = 5;

/// Known authentication failure codes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("auth/email-already-in-use")]
    EmailAlreadyInUse,
    #[error("auth/invalid-email")]
    InvalidEmail,
    #[error("auth/weak-password")]
    WeakPassword,
    #[error("auth/user-not-found")]
    UserNotFound,
    #[error("auth/wrong-password")]
    WrongPassword,
    #[error("auth/too-many-requests")]
    TooManyRequests,
    #[error("auth/{0}")]
    Other(String),
}

/// Which form the user was filling in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    SignUp,
    LogIn,
}

impl AuthError {
    /// Short message suitable for the status line.
    /// Codes that don't belong to the flow get its generic message.
    pub fn user_message(&self, flow: AuthFlow) -> &'static str {
        match (flow, self) {
            (AuthFlow::SignUp, AuthError::EmailAlreadyInUse) => "This email is already in use.",
            (AuthFlow::SignUp, AuthError::InvalidEmail) => "Invalid email address.",
            (AuthFlow::SignUp, AuthError::WeakPassword) => "Password is too weak.",
            (AuthFlow::SignUp, _) => "Something went wrong while signing up.",
            (AuthFlow::LogIn, AuthError::UserNotFound | AuthError::WrongPassword) => {
                "Incorrect email or password."
            }
            (AuthFlow::LogIn, AuthError::TooManyRequests) => "Too many login attempts. Try again later.",
            (AuthFlow::LogIn, _) => "Something went wrong while logging in.",
        }
    }
}

impl AuthFlow {
    /// User-facing message for any error raised during this flow
    pub fn message_for(&self, err: &Error) -> &'static str {
        match err {
            Error::Auth(auth) => auth.user_message(*self),
            _ => AuthError::Other(String::new()).user_message(*self),
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct AuthService<'a> {
    conn: &'a Connection,
}

impl<'a> AuthService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn signup(&self, email: &str, password: &str, nickname: Option<&str>) -> Result<Session> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail.into());
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword.into());
        }
        if AccountRepository::get_by_email(self.conn, email)?.is_some() {
            return Err(AuthError::EmailAlreadyInUse.into());
        }

        let display_name = nickname.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
        let salt = uuid::Uuid::new_v4().simple().to_string();
        let account = Account::new(email.to_string(), display_name, hash_password(&salt, password), salt);
        AccountRepository::create(self.conn, &account)?;

        tracing::info!(uid = %account.uid, "account created");
        Ok(Session::from(&account))
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Session> {
        self.login_at(email, password, Utc::now())
    }

    /// Log in as of `now`; used directly by tests to step past a lockout
    pub fn login_at(&self, email: &str, password: &str, now: DateTime<Utc>) -> Result<Session> {
        let account = AccountRepository::get_by_email(self.conn, email.trim())?.ok_or(AuthError::UserNotFound)?;

        if account.is_locked(now) {
            return Err(AuthError::TooManyRequests.into());
        }

        if hash_password(&account.salt, password) != account.password_hash {
            let attempts = account.failed_attempts + 1;
            if attempts >= MAX_FAILED_ATTEMPTS {
                let until = now + Duration::minutes(LOCKOUT_MINUTES);
                AccountRepository::record_failure(self.conn, &account.uid, 0, Some(until))?;
                tracing::warn!(uid = %account.uid, "account locked after repeated failures");
                return Err(AuthError::TooManyRequests.into());
            }
            AccountRepository::record_failure(self.conn, &account.uid, attempts, None)?;
            return Err(AuthError::WrongPassword.into());
        }

        if account.failed_attempts > 0 || account.locked_until.is_some() {
            AccountRepository::reset_failures(self.conn, &account.uid)?;
        }
        tracing::info!(uid = %account.uid, "logged in");
        Ok(Session::from(&account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use tempfile::tempdir;

    fn auth_err(result: Result<Session>) -> AuthError {
        match result {
            Err(Error::Auth(e)) => e,
            other => panic!("expected auth error, got {:?}", other),
        }
    }

    #[test]
    fn test_signup_then_login() {
        let dir = tempdir().unwrap();
        let conn = Database::new(dir.path().join("test.db")).open().unwrap();
        let auth = AuthService::new(&conn);

        let created = auth.signup("ann@example.com", "secret1", Some(" Ann ")).unwrap();
        assert_eq!(created.display(), "Ann");

        let session = auth.login("ANN@example.com", "secret1").unwrap();
        assert_eq!(session.uid, created.uid);
    }

    #[test]
    fn test_signup_validation() {
        let dir = tempdir().unwrap();
        let conn = Database::new(dir.path().join("test.db")).open().unwrap();
        let auth = AuthService::new(&conn);

        assert_eq!(auth_err(auth.signup("not-an-email", "secret1", None)), AuthError::InvalidEmail);
        assert_eq!(auth_err(auth.signup("a@@b", "secret1", None)), AuthError::InvalidEmail);
        assert_eq!(auth_err(auth.signup("a@b.c", "12345", None)), AuthError::WeakPassword);

        auth.signup("a@b.c", "123456", None).unwrap();
        assert_eq!(auth_err(auth.signup("A@B.C", "123456", None)), AuthError::EmailAlreadyInUse);
    }

    #[test]
    fn test_login_failures() {
        let dir = tempdir().unwrap();
        let conn = Database::new(dir.path().join("test.db")).open().unwrap();
        let auth = AuthService::new(&conn);
        auth.signup("a@b.c", "123456", None).unwrap();

        assert_eq!(auth_err(auth.login("x@b.c", "123456")), AuthError::UserNotFound);
        assert_eq!(auth_err(auth.login("a@b.c", "wrong!")), AuthError::WrongPassword);
    }

    #[test]
    fn test_lockout_after_repeated_failures() {
        let dir = tempdir().unwrap();
        let conn = Database::new(dir.path().join("test.db")).open().unwrap();
        let auth = AuthService::new(&conn);
        auth.signup("a@b.c", "123456", None).unwrap();
        let now = Utc::now();

        for _ in 0..MAX_FAILED_ATTEMPTS - 1 {
            assert_eq!(auth_err(auth.login_at("a@b.c", "nope", now)), AuthError::WrongPassword);
        }
        assert_eq!(auth_err(auth.login_at("a@b.c", "nope", now)), AuthError::TooManyRequests);
        // Correct password is refused while locked
        assert_eq!(auth_err(auth.login_at("a@b.c", "123456", now)), AuthError::TooManyRequests);

        let later = now + Duration::minutes(LOCKOUT_MINUTES + 1);
        assert!(auth.login_at("a@b.c", "123456", later).is_ok());
        let account = AccountRepository::get_by_email(&conn, "a@b.c").unwrap().unwrap();
        assert_eq!(account.failed_attempts, 0);
        assert_eq!(account.locked_until, None);
    }

    #[test]
    fn test_user_messages_depend_on_flow() {
        assert_eq!(AuthError::WeakPassword.user_message(AuthFlow::SignUp), "Password is too weak.");
        assert_eq!(
            AuthError::WeakPassword.user_message(AuthFlow::LogIn),
            "Something went wrong while logging in."
        );
        assert_eq!(
            AuthError::UserNotFound.user_message(AuthFlow::LogIn),
            AuthError::WrongPassword.user_message(AuthFlow::LogIn)
        );
        assert_eq!(
            AuthFlow::SignUp.message_for(&Error::Remote("offline".to_string())),
            "Something went wrong while signing up."
        );
    }

    #[test]
    fn test_hash_is_salted() {
        assert_ne!(hash_password("s1", "pw"), hash_password("s2", "pw"));
        assert_eq!(hash_password("s1", "pw").len(), 64);
    }
}
