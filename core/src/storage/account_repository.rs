use crate::models::{datetime_to_millis, millis_to_datetime, Account};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

pub struct AccountRepository;

impl AccountRepository {
    /// Register a new account
    pub fn create(conn: &Connection, account: &Account) -> Result<()> {
        conn.execute(
            "INSERT INTO accounts (uid, email, display_name, password_hash, salt, failed_attempts,
             locked_until, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                account.uid,
                account.email,
                account.display_name,
                account.password_hash,
                account.salt,
                account.failed_attempts,
                account.locked_until.as_ref().map(datetime_to_millis),
                datetime_to_millis(&account.created_at),
            ],
        )?;
        Ok(())
    }

    /// Look up an account by email (case-insensitive)
    pub fn get_by_email(conn: &Connection, email: &str) -> Result<Option<Account>> {
        let account = conn
            .query_row(
                "SELECT uid, email, display_name, password_hash, salt, failed_attempts, locked_until,
                 created_at FROM accounts WHERE email = ?1",
                params![email],
                |row| {
                    Ok(Account {
                        uid: row.get(0)?,
                        email: row.get(1)?,
                        display_name: row.get(2)?,
                        password_hash: row.get(3)?,
                        salt: row.get(4)?,
                        failed_attempts: row.get(5)?,
                        locked_until: row.get::<_, Option<i64>>(6)?.map(millis_to_datetime),
                        created_at: millis_to_datetime(row.get(7)?),
                    })
                },
            )
            .optional()?;
        Ok(account)
    }

    /// Persist the failed-attempt counter and lock deadline
    pub fn record_failure(
        conn: &Connection,
        uid: &str,
        failed_attempts: u32,
        locked_until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let rows_affected = conn.execute(
            "UPDATE accounts SET failed_attempts = ?1, locked_until = ?2 WHERE uid = ?3",
            params![failed_attempts, locked_until.as_ref().map(datetime_to_millis), uid],
        )?;

        if rows_affected == 0 {
            return Err(Error::NotFound(format!("Account not found: {}", uid)));
        }
        Ok(())
    }

    /// Clear the failed-attempt counter after a successful login
    pub fn reset_failures(conn: &Connection, uid: &str) -> Result<()> {
        Self::record_failure(conn, uid, 0, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use tempfile::tempdir;

    fn setup_test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db"));
        let conn = db.open().unwrap();
        (dir, conn)
    }

    #[test]
    fn test_create_and_lookup_case_insensitive() {
        let (_dir, conn) = setup_test_db();
        let account = Account::new("Ana@Example.com".to_string(), Some("Ana".to_string()), "h".to_string(), "s".to_string());
        AccountRepository::create(&conn, &account).unwrap();

        let found = AccountRepository::get_by_email(&conn, "ana@example.com").unwrap().unwrap();
        assert_eq!(found.uid, account.uid);
        assert_eq!(found.display_name.as_deref(), Some("Ana"));
        assert!(AccountRepository::get_by_email(&conn, "bob@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_fails() {
        let (_dir, conn) = setup_test_db();
        let a = Account::new("a@b.c".to_string(), None, "h".to_string(), "s".to_string());
        let b = Account::new("A@B.C".to_string(), None, "h".to_string(), "s".to_string());
        AccountRepository::create(&conn, &a).unwrap();
        assert!(matches!(AccountRepository::create(&conn, &b), Err(Error::Database(_))));
    }

    #[test]
    fn test_failure_counter() {
        let (_dir, conn) = setup_test_db();
        let account = Account::new("a@b.c".to_string(), None, "h".to_string(), "s".to_string());
        AccountRepository::create(&conn, &account).unwrap();

        let until = Utc::now();
        AccountRepository::record_failure(&conn, &account.uid, 5, Some(until)).unwrap();
        let found = AccountRepository::get_by_email(&conn, "a@b.c").unwrap().unwrap();
        assert_eq!(found.failed_attempts, 5);
        assert_eq!(found.locked_until.map(|d| d.timestamp_millis()), Some(until.timestamp_millis()));

        AccountRepository::reset_failures(&conn, &account.uid).unwrap();
        let found = AccountRepository::get_by_email(&conn, "a@b.c").unwrap().unwrap();
        assert_eq!(found.failed_attempts, 0);
        assert_eq!(found.locked_until, None);
    }
}
