//! Data access for the books table.
//!
//! Every operation acquires the connection for its own scope and issues
//! single statements; the FTS index is maintained by triggers, so no write
//! spans multiple statements. The list operation runs its data and count
//! queries independently, with no transactional snapshot between them.

use time::OffsetDateTime;

use shelf_db::rusqlite::types::{Type, Value};
use shelf_db::rusqlite::{self, params, params_from_iter, Row};
use shelf_db::{Db, StoreError};

use super::models::{Book, Lifecycle, NewBook};

const BOOK_COLUMNS: &str =
    "id, cover_url, isbn, title, author, publication_year, created_at, updated_at, deleted_at";

/// Store for book records. Cheap to clone; all clones share the database
/// handle.
#[derive(Clone)]
pub struct BookStore {
    db: Db,
}

impl BookStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Insert a new book with the caller-supplied id and the current UTC
    /// creation timestamp. Uniqueness is enforced solely by the primary key.
    pub async fn create(&self, book: NewBook) -> Result<(), StoreError> {
        let created_at = OffsetDateTime::now_utc().unix_timestamp();

        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO books (id, cover_url, isbn, title, author, publication_year, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        book.id,
                        book.cover_url,
                        book.isbn,
                        book.title,
                        book.author,
                        book.publication_year,
                        created_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// List non-deleted books, paginated and optionally filtered by a
    /// full-text search term. Returns the page of books and the total count
    /// of matching rows; a zero total is reported as `NotFound`.
    pub async fn list(
        &self,
        page: u32,
        page_size: u32,
        search: Option<String>,
    ) -> Result<(Vec<Book>, i64), StoreError> {
        self.db
            .call(move |conn| {
                let mut clause = String::from(" FROM books WHERE deleted_at IS NULL");
                let mut filter_args: Vec<Value> = Vec::new();
                let mut arg_index = 1;

                if let Some(term) = search {
                    clause.push_str(&format!(
                        " AND id IN (SELECT book_id FROM books_fts WHERE books_fts MATCH ?{arg_index})"
                    ));
                    filter_args.push(Value::from(term));
                    arg_index += 1;
                }

                let count_sql = format!("SELECT count(*){clause}");
                let total: i64 = conn.query_row(
                    &count_sql,
                    params_from_iter(filter_args.iter()),
                    |row| row.get(0),
                )?;

                if total == 0 {
                    return Err(StoreError::NotFound);
                }

                let data_sql = format!(
                    "SELECT {BOOK_COLUMNS}{clause} LIMIT ?{arg_index} OFFSET ?{}",
                    arg_index + 1
                );

                let mut data_args = filter_args;
                data_args.push(Value::from(i64::from(page_size)));
                // Widen before multiplying; u32::MAX * page_size overflows u32.
                let offset = (i64::from(page) - 1).max(0) * i64::from(page_size);
                data_args.push(Value::from(offset));

                let mut stmt = conn.prepare(&data_sql)?;
                let books = stmt
                    .query_map(params_from_iter(data_args.iter()), book_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok((books, total))
            })
            .await
    }

    /// Fetch one non-deleted book by id.
    pub async fn get(&self, id: String) -> Result<Book, StoreError> {
        self.db
            .call(move |conn| {
                conn.query_row(
                    &format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1 AND deleted_at IS NULL"),
                    params![id],
                    book_from_row,
                )
                .map_err(StoreError::from)
            })
            .await
    }

    /// Update title, author, and publication year of a non-deleted book.
    /// `cover_url` and `isbn` are immutable after creation and are not part
    /// of the write set. Zero affected rows means the book does not exist or
    /// is already deleted.
    pub async fn update(
        &self,
        id: String,
        title: String,
        author: String,
        publication_year: String,
    ) -> Result<(), StoreError> {
        let updated_at = OffsetDateTime::now_utc().unix_timestamp();

        self.db
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE books
                     SET title = ?1, author = ?2, publication_year = ?3, updated_at = ?4
                     WHERE id = ?5 AND deleted_at IS NULL",
                    params![title, author, publication_year, updated_at, id],
                )?;

                if changed == 0 {
                    return Err(StoreError::NotFound);
                }

                Ok(())
            })
            .await
    }

    /// Soft-delete a non-deleted book by stamping `deleted_at`. The row is
    /// never physically removed.
    pub async fn soft_delete(&self, id: String) -> Result<(), StoreError> {
        let deleted_at = OffsetDateTime::now_utc().unix_timestamp();

        self.db
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE books SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
                    params![deleted_at, id],
                )?;

                if changed == 0 {
                    return Err(StoreError::NotFound);
                }

                Ok(())
            })
            .await
    }
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    let created_at = timestamp(row.get(6)?, 6)?;
    let updated_at = row
        .get::<_, Option<i64>>(7)?
        .map(|seconds| timestamp(seconds, 7))
        .transpose()?;
    let deleted_at = row
        .get::<_, Option<i64>>(8)?
        .map(|seconds| timestamp(seconds, 8))
        .transpose()?;

    Ok(Book {
        id: row.get(0)?,
        cover_url: row.get(1)?,
        isbn: row.get(2)?,
        title: row.get(3)?,
        author: row.get(4)?,
        publication_year: row.get(5)?,
        created_at,
        updated_at,
        lifecycle: Lifecycle::from_deleted_at(deleted_at),
    })
}

fn timestamp(seconds: i64, column: usize) -> rusqlite::Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(seconds)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(column, Type::Integer, Box::new(err)))
}
