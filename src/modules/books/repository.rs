//! Persistence for [`Book`] rows.
//!
//! Functions take a connection so the service can run them inside a
//! transaction (`&mut *tx`) or on a pooled connection.

use sqlx::SqliteConnection;
use thiserror::Error;

use super::models::Book;

#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The conditional update matched no row at the expected version.
    #[error("book {id} is no longer at version {version}")]
    StaleVersion { id: i64, version: i64 },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub(crate) const MIGRATION_CREATE_BOOK: &str = "
CREATE TABLE IF NOT EXISTS book (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL CHECK (length(title) <= 30),
    author TEXT NOT NULL CHECK (length(author) <= 20),
    created_user TEXT NOT NULL,
    created_date_time TEXT NOT NULL,
    updated_user TEXT NOT NULL,
    updated_date_time TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 0
);
";

pub async fn find_all(conn: &mut SqliteConnection) -> Result<Vec<Book>, sqlx::Error> {
    sqlx::query_as::<_, Book>(
        "SELECT id, title, author, created_user, created_date_time, updated_user, updated_date_time, version
         FROM book ORDER BY id",
    )
    .fetch_all(conn)
    .await
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Book>, sqlx::Error> {
    sqlx::query_as::<_, Book>(
        "SELECT id, title, author, created_user, created_date_time, updated_user, updated_date_time, version
         FROM book WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn exists_by_id(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book WHERE id = ?")
        .bind(id)
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

/// Insert a book without an id, or update one with an id.
///
/// An update only applies when the stored version still equals
/// `book.version`; it then bumps the version by one. Either way the stored
/// row is returned.
pub async fn save(conn: &mut SqliteConnection, book: &Book) -> Result<Book, RepositoryError> {
    match book.id {
        None => Ok(insert(conn, book).await?),
        Some(id) => update(conn, id, book).await,
    }
}

async fn insert(conn: &mut SqliteConnection, book: &Book) -> Result<Book, sqlx::Error> {
    sqlx::query_as::<_, Book>(
        "INSERT INTO book (title, author, created_user, created_date_time, updated_user, updated_date_time, version)
         VALUES (?, ?, ?, ?, ?, ?, 0)
         RETURNING id, title, author, created_user, created_date_time, updated_user, updated_date_time, version",
    )
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.created_user)
    .bind(book.created_date_time)
    .bind(&book.updated_user)
    .bind(book.updated_date_time)
    .fetch_one(conn)
    .await
}

async fn update(conn: &mut SqliteConnection, id: i64, book: &Book) -> Result<Book, RepositoryError> {
    sqlx::query_as::<_, Book>(
        "UPDATE book
         SET title = ?, author = ?, updated_user = ?, updated_date_time = ?, version = version + 1
         WHERE id = ? AND version = ?
         RETURNING id, title, author, created_user, created_date_time, updated_user, updated_date_time, version",
    )
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.updated_user)
    .bind(book.updated_date_time)
    .bind(id)
    .bind(book.version)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::StaleVersion {
        id,
        version: book.version,
    })
}

/// Delete by id; a missing row is not an error.
pub async fn delete_by_id(conn: &mut SqliteConnection, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM book WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}
