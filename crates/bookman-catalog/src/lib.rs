//! Bookman Catalog
//!
//! The `books` table: records, the validation schema shared by the add and
//! edit paths, CRUD operations and offset pagination (newest first).

mod book;
mod error;
mod pagination;
mod repository;
mod schema;

pub use book::{Book, BookDraft, BookForm};
pub use error::{CatalogError, FieldError, ValidationErrors};
pub use pagination::{clamp_page, parse_page_param, total_pages, Page, DEFAULT_PAGE_SIZE};
pub use repository::{insert_book, BookRepository};
pub use schema::{max_year, MIN_YEAR};

pub type Result<T> = std::result::Result<T, CatalogError>;
