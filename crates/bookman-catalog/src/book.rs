//! Book data structures

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, ValidationErrors};
use crate::schema::{check_year, AUTHOR, GENRE, TITLE};

/// A stored book row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Raw add/edit form submission. Every field arrives as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub year: String,
    pub genre: String,
}

impl BookForm {
    /// Validate against the current calendar year.
    pub fn validate(&self) -> crate::Result<BookDraft> {
        BookDraft::parse(self, Utc::now().year()).map_err(CatalogError::Validation)
    }
}

impl From<&Book> for BookForm {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            year: book.year.map(|y| y.to_string()).unwrap_or_default(),
            genre: book.genre.clone().unwrap_or_default(),
        }
    }
}

/// Validated field values, ready for insert or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub genre: Option<String>,
}

impl BookDraft {
    /// Check every field and collect all failures.
    pub fn parse(form: &BookForm, current_year: i32) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = TITLE.check(&form.title, &mut errors);
        let author = AUTHOR.check(&form.author, &mut errors);
        let year = check_year(&form.year, current_year, &mut errors);
        let genre = GENRE.check(&form.genre, &mut errors);

        match (title, author) {
            (Some(title), Some(author)) if errors.is_empty() => Ok(Self {
                title,
                author,
                year,
                genre,
            }),
            _ => Err(errors),
        }
    }
}
