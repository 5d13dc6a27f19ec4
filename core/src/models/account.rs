use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A locally registered account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub password_hash: String,
    pub salt: String,
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(email: String, display_name: Option<String>, password_hash: String, salt: String) -> Self {
        Self {
            uid: uuid::Uuid::new_v4().to_string(),
            email,
            display_name,
            password_hash,
            salt,
            failed_attempts: 0,
            locked_until: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.map(|until| until > now).unwrap_or(false)
    }
}

/// The signed-in user as seen by the rest of the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl Session {
    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

impl From<&Account> for Session {
    fn from(account: &Account) -> Self {
        Self {
            uid: account.uid.clone(),
            email: account.email.clone(),
            display_name: account.display_name.clone(),
        }
    }
}
