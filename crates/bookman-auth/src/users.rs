//! User accounts

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;

use bookman_storage::{parse_timestamp, Database};

use crate::error::AuthError;
use crate::password::{verify_password, PasswordPolicy};
use crate::Result;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Exact, case-sensitive match.
    pub fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.db.with_connection(|conn| {
            let user = conn
                .query_row(
                    "SELECT id, username, password, email, created_at
                     FROM users WHERE username = ?1 LIMIT 1",
                    [username],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })?)
    }

    pub fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.db.with_connection(|conn| {
            let user = conn
                .query_row(
                    "SELECT id, username, password, email, created_at FROM users WHERE id = ?1",
                    [id],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })?)
    }

    pub fn exists(&self, username: &str) -> Result<bool> {
        Ok(self.find_by_username(username)?.is_some())
    }

    pub fn create(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
        policy: &PasswordPolicy,
    ) -> Result<i64> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        if self.exists(username)? {
            return Err(AuthError::DuplicateUsername(username.to_string()));
        }

        let hash = policy.hash(password)?;
        let id = self.db.with_connection(|conn| {
            Ok(insert_user(conn, username, &hash, email, Utc::now())?)
        })?;

        tracing::info!(user_id = id, username = %username, "Created user");
        Ok(id)
    }

    /// Look the user up and check the password.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        match self.find_by_username(username)? {
            Some(user) if verify_password(password, &user.password_hash) => Ok(user),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

impl Clone for UserRepository {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

/// Insert on an existing connection, with an already-hashed password.
pub fn insert_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    email: Option<&str>,
    created_at: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (username, password, email, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![username, password_hash, email, created_at.to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let created_str: String = row.get(4)?;

    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        email: row.get(3)?,
        created_at: parse_timestamp(&created_str),
    })
}
