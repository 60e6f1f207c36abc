//! Book repository
//!
//! CRUD over the `books` table.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use bookman_storage::{parse_timestamp, Database};

use crate::book::{Book, BookDraft};
use crate::pagination::{clamp_page, total_pages, Page};
use crate::Result;

const BOOK_COLUMNS: &str = "id, title, author, year, genre, created_at";

pub struct BookRepository {
    db: Database,
}

impl BookRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a validated book and return its new id.
    pub fn create(&self, draft: &BookDraft) -> Result<i64> {
        let id = self
            .db
            .with_connection(|conn| Ok(insert_book(conn, draft, Utc::now())?))?;

        tracing::info!(book_id = id, title = %draft.title, "Created book");
        Ok(id)
    }

    pub fn get_by_id(&self, id: i64) -> Result<Option<Book>> {
        Ok(self.db.with_connection(|conn| {
            let book = conn
                .query_row(
                    &format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"),
                    [id],
                    book_from_row,
                )
                .optional()?;
            Ok(book)
        })?)
    }

    /// Newest first; rows created in the same instant fall back to id order.
    pub fn get_all(&self, limit: u32, offset: u64) -> Result<Vec<Book>> {
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);

        Ok(self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BOOK_COLUMNS} FROM books
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1 OFFSET ?2"
            ))?;

            let books = stmt
                .query_map(rusqlite::params![i64::from(limit), offset], book_from_row)?
                .collect::<rusqlite::Result<Vec<Book>>>()?;

            Ok(books)
        })?)
    }

    /// Replace every editable field. Returns false when no row has this id.
    pub fn update(&self, id: i64, draft: &BookDraft) -> Result<bool> {
        let changed = self.db.with_connection(|conn| {
            Ok(conn.execute(
                "UPDATE books SET title = ?1, author = ?2, year = ?3, genre = ?4 WHERE id = ?5",
                rusqlite::params![draft.title, draft.author, draft.year, draft.genre, id],
            )?)
        })?;

        if changed > 0 {
            tracing::info!(book_id = id, "Updated book");
        }
        Ok(changed > 0)
    }

    /// Returns false when the id was already absent.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let removed = self.db.with_connection(|conn| {
            Ok(conn.execute("DELETE FROM books WHERE id = ?1", [id])?)
        })?;

        if removed > 0 {
            tracing::info!(book_id = id, "Deleted book");
        }
        Ok(removed > 0)
    }

    pub fn count_all(&self) -> Result<u64> {
        let count: i64 = self.db.with_connection(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?)
        })?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Serve the requested page, clamped into the valid range.
    pub fn page(&self, requested: i64, page_size: u32) -> Result<Page<Book>> {
        let page_size = page_size.max(1);
        let total_items = self.count_all()?;
        let number = clamp_page(requested, total_items, page_size);
        let offset = (number - 1) * u64::from(page_size);
        let items = self.get_all(page_size, offset)?;

        Ok(Page {
            items,
            number,
            page_size,
            total_items,
            total_pages: total_pages(total_items, page_size),
        })
    }
}

impl Clone for BookRepository {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

/// Insert on an existing connection, so the installer can seed inside its
/// own transaction.
pub fn insert_book(
    conn: &Connection,
    draft: &BookDraft,
    created_at: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO books (title, author, year, genre, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            draft.title,
            draft.author,
            draft.year,
            draft.genre,
            created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    let created_str: String = row.get(5)?;

    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        year: row.get(3)?,
        genre: row.get(4)?,
        created_at: parse_timestamp(&created_str),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::BookForm;

    fn repo() -> BookRepository {
        BookRepository::new(Database::open_in_memory().unwrap())
    }

    fn draft(title: &str, author: &str, year: Option<i32>, genre: Option<&str>) -> BookDraft {
        BookDraft {
            title: title.to_string(),
            author: author.to_string(),
            year,
            genre: genre.map(str::to_string),
        }
    }

    #[test]
    fn test_create_then_get_returns_same_fields() {
        let repo = repo();
        let form = BookForm {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            year: "1965".to_string(),
            genre: "Sci-Fi".to_string(),
        };
        let draft = form.validate().unwrap();

        let id = repo.create(&draft).unwrap();
        let book = repo.get_by_id(id).unwrap().unwrap();

        assert_eq!(book.id, id);
        assert_eq!(book.title, "Dune");
        assert_eq!(book.author, "Frank Herbert");
        assert_eq!(book.year, Some(1965));
        assert_eq!(book.genre.as_deref(), Some("Sci-Fi"));

        let second = repo.create(&draft).unwrap();
        assert_ne!(second, id);
    }

    #[test]
    fn test_get_missing_book() {
        assert!(repo().get_by_id(42).unwrap().is_none());
    }

    #[test]
    fn test_update_replaces_fields() {
        let repo = repo();
        let id = repo
            .create(&draft("Dune", "Frank Herbert", Some(1965), Some("Sci-Fi")))
            .unwrap();
        let other = repo
            .create(&draft("Clean Code", "Robert C. Martin", Some(2008), None))
            .unwrap();

        let changed = repo
            .update(id, &draft("Dune Messiah", "Frank Herbert", None, Some("Space Opera")))
            .unwrap();
        assert!(changed);

        let book = repo.get_by_id(id).unwrap().unwrap();
        assert_eq!(book.title, "Dune Messiah");
        assert_eq!(book.year, None);
        assert_eq!(book.genre.as_deref(), Some("Space Opera"));

        let untouched = repo.get_by_id(other).unwrap().unwrap();
        assert_eq!(untouched.title, "Clean Code");
        assert_eq!(untouched.year, Some(2008));
    }

    #[test]
    fn test_update_missing_book() {
        let changed = repo()
            .update(99, &draft("Nothing", "Nobody", None, None))
            .unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let repo = repo();
        let keep = repo.create(&draft("Keep", "Someone", None, None)).unwrap();
        let id = repo.create(&draft("Drop", "Someone", None, None)).unwrap();

        assert!(repo.delete(id).unwrap());
        assert!(repo.get_by_id(id).unwrap().is_none());
        assert_eq!(repo.count_all().unwrap(), 1);
        assert!(repo.get_all(10, 0).unwrap().iter().all(|b| b.id != id));

        // Second delete reports not found and leaves other rows alone
        assert!(!repo.delete(id).unwrap());
        assert_eq!(repo.count_all().unwrap(), 1);
        assert!(repo.get_by_id(keep).unwrap().is_some());
    }

    #[test]
    fn test_get_all_newest_first() {
        let repo = repo();
        let first = repo.create(&draft("First", "A", None, None)).unwrap();
        let second = repo.create(&draft("Second", "B", None, None)).unwrap();
        let third = repo.create(&draft("Third", "C", None, None)).unwrap();

        let ids: Vec<i64> = repo.get_all(10, 0).unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![third, second, first]);

        let ids: Vec<i64> = repo.get_all(1, 1).unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![second]);
    }

    #[test]
    fn test_pages_cover_every_book() {
        let repo = repo();
        for i in 0..13 {
            repo.create(&draft(&format!("Book {i}"), "Author", None, None))
                .unwrap();
        }

        let first = repo.page(1, 6).unwrap();
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.items.len(), 6);

        let mut seen = 0;
        for n in 1..=first.total_pages {
            seen += repo.page(n as i64, 6).unwrap().items.len() as u64;
        }
        assert_eq!(seen, repo.count_all().unwrap());
    }

    #[test]
    fn test_page_clamps_out_of_range() {
        let repo = repo();
        for i in 0..8 {
            repo.create(&draft(&format!("Book {i}"), "Author", None, None))
                .unwrap();
        }

        let low = repo.page(0, 6).unwrap();
        assert_eq!(low.number, 1);
        let negative = repo.page(-3, 6).unwrap();
        assert_eq!(negative.number, 1);

        let high = repo.page(50, 6).unwrap();
        assert_eq!(high.number, 2);
        assert_eq!(high.items.len(), 2);
    }

    #[test]
    fn test_page_of_empty_table() {
        let page = repo().page(4, 6).unwrap();
        assert_eq!(page.number, 1);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
        assert!(!page.has_next());
    }
}
