//! Username/password gate that decides whose ledger rows a session sees.
//!
//! Passwords are kept as a salted SHA-256 digest. This only avoids storing them
//! in the clear; it is not a hardened credential scheme.

use crate::db;
use crate::error::IdentityError;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
}

pub struct UserDirectory {
    conn: Connection,
}

impl UserDirectory {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &Path) -> Result<Self, IdentityError> {
        Ok(Self::new(db::open_db(path)?))
    }

    pub fn open_in_memory() -> Result<Self, IdentityError> {
        Ok(Self::new(db::open_in_memory()?))
    }

    pub fn register(&self, username: &str, password: &str) -> Result<User, IdentityError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(IdentityError::EmptyUsername);
        }
        if password.is_empty() {
            return Err(IdentityError::EmptyPassword);
        }

        let salt = Uuid::new_v4().simple().to_string();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO users (username, password_hash, salt, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                username,
                hash_password(&salt, password),
                salt,
                chrono::Utc::now().timestamp_millis()
            ],
        )?;
        if inserted == 0 {
            return Err(IdentityError::UsernameTaken(username.to_string()));
        }
        log::info!("registered user {}", username);
        Ok(User {
            username: username.to_string(),
        })
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Result<User, IdentityError> {
        let username = username.trim();
        let stored: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT password_hash, salt FROM users WHERE username = ?1",
                params![username],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match stored {
            Some((expected, salt)) if hash_password(&salt, password) == expected => Ok(User {
                username: username.to_string(),
            }),
            _ => {
                log::warn!("failed login for {}", username);
                Err(IdentityError::BadCredentials)
            }
        }
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let result = hasher.finalize();
    result.iter().map(|byte| format!("{:02x}", byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_authenticate() {
        let users = UserDirectory::open_in_memory().expect("directory");
        users.register(" ana ", "hunter2").expect("register");

        let user = users.authenticate("ana", "hunter2").expect("login");
        assert_eq!(user.username, "ana");
    }

    #[test]
    fn wrong_password_and_unknown_user_look_the_same() {
        let users = UserDirectory::open_in_memory().expect("directory");
        users.register("ana", "hunter2").expect("register");

        assert!(matches!(
            users.authenticate("ana", "hunter3"),
            Err(IdentityError::BadCredentials)
        ));
        assert!(matches!(
            users.authenticate("ben", "hunter2"),
            Err(IdentityError::BadCredentials)
        ));
    }

    #[test]
    fn duplicate_and_blank_registrations_are_rejected() {
        let users = UserDirectory::open_in_memory().expect("directory");
        users.register("ana", "hunter2").expect("register");

        assert!(matches!(
            users.register("ana", "other"),
            Err(IdentityError::UsernameTaken(_))
        ));
        assert!(matches!(users.register("  ", "pw"), Err(IdentityError::EmptyUsername)));
        assert!(matches!(users.register("ben", ""), Err(IdentityError::EmptyPassword)));
    }

    #[test]
    fn passwords_are_not_stored_in_plaintext() {
        let users = UserDirectory::open_in_memory().expect("directory");
        users.register("ana", "hunter2").expect("register");

        let stored: String = users
            .conn
            .query_row(
                "SELECT password_hash FROM users WHERE username = 'ana'",
                [],
                |row| row.get(0),
            )
            .expect("stored hash");
        assert_ne!(stored, "hunter2");
        assert_eq!(stored.len(), 64);
    }
}
