//! First-run setup: admin account and optional sample books.

use chrono::Utc;
use rusqlite::OptionalExtension;

use bookman_auth::{insert_user, AuthError, PasswordPolicy};
use bookman_catalog::{insert_book, BookDraft};
use bookman_storage::Database;

use crate::Result;

#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub admin_username: String,
    pub admin_password: String,
    pub admin_email: Option<String>,
    pub with_samples: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            admin_username: "admin".to_string(),
            admin_password: String::new(),
            admin_email: None,
            with_samples: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub created_admin: bool,
    pub samples_added: usize,
}

fn sample_books() -> [BookDraft; 3] {
    let draft = |title: &str, author: &str, year: i32, genre: &str| BookDraft {
        title: title.to_string(),
        author: author.to_string(),
        year: Some(year),
        genre: Some(genre.to_string()),
    };

    [
        draft("Cien años de soledad", "Gabriel García Márquez", 1967, "Realismo mágico"),
        draft("El principito", "Antoine de Saint-Exupéry", 1943, "Infantil"),
        draft("Clean Code", "Robert C. Martin", 2008, "Programación"),
    ]
}

/// Seed the admin user (unless that username exists) and, when asked, the
/// sample books (only into an empty catalog). Safe to run repeatedly.
pub fn install(db: &Database, options: &InstallOptions, policy: &PasswordPolicy) -> Result<InstallReport> {
    let username = options.admin_username.trim();
    if username.is_empty() || options.admin_password.is_empty() {
        return Err(AuthError::MissingCredentials.into());
    }

    let hash = policy.hash(&options.admin_password)?;
    let email = options
        .admin_email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());
    let now = Utc::now();

    let report = db.transaction(|conn| {
        let mut report = InstallReport::default();

        let existing: Option<i64> = conn
            .query_row("SELECT id FROM users WHERE username = ?1", [username], |row| {
                row.get(0)
            })
            .optional()?;
        if existing.is_none() {
            insert_user(conn, username, &hash, email, now)?;
            report.created_admin = true;
        }

        if options.with_samples {
            let books: i64 = conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
            if books == 0 {
                for draft in sample_books() {
                    insert_book(conn, &draft, now)?;
                    report.samples_added += 1;
                }
            }
        }

        Ok(report)
    })?;

    tracing::info!(
        username = %username,
        created_admin = report.created_admin,
        samples_added = report.samples_added,
        "Installation complete"
    );
    Ok(report)
}
