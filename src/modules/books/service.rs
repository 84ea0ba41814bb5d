use shelf_authz::Principal;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use time::OffsetDateTime;
use tracing::instrument;

use super::error::BookError;
use super::models::{Book, BookForm};
use super::repository;

/// Takes the write lock up front, so a pre-check and its write see no
/// interleaved writer.
const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

/// Book use cases. Writes run in one transaction each.
#[derive(Clone, Debug)]
pub struct BookService {
    pool: SqlitePool,
}

impl BookService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Blank new-book form with the full listing.
    #[instrument(skip(self))]
    pub async fn init_form(&self) -> Result<BookForm, BookError> {
        let mut conn = self.pool.acquire().await?;
        let books = repository::find_all(&mut conn).await?;
        Ok(BookForm::new_book(books))
    }

    /// Edit form for `id` with the full listing.
    #[instrument(skip(self))]
    pub async fn read_one_book(&self, id: i64) -> Result<BookForm, BookError> {
        let mut conn = self.pool.acquire().await?;
        let book = repository::find_by_id(&mut conn, id)
            .await?
            .ok_or(BookError::NotFound { id })?;
        let books = repository::find_all(&mut conn).await?;
        Ok(BookForm::from_book(&book, books))
    }

    /// Apply the form to book `id` if `form.version` is still current.
    #[instrument(skip(self, principal, form), fields(user = %principal.username, version = form.version))]
    pub async fn update_book(
        &self,
        principal: &Principal,
        id: i64,
        form: &BookForm,
    ) -> Result<Book, BookError> {
        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;
        let outcome = apply_update(&mut tx, principal, id, form).await;
        let saved = finish(tx, outcome).await?;

        tracing::info!(version = saved.version, "book updated");
        Ok(saved)
    }

    #[instrument(skip(self, principal, form), fields(user = %principal.username))]
    pub async fn create_book(&self, principal: &Principal, form: &BookForm) -> Result<Book, BookError> {
        let mut book = form.to_draft();
        book.stamp_created(&principal.username, OffsetDateTime::now_utc());

        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;
        let outcome = repository::save(&mut tx, &book).await.map_err(BookError::from);
        let saved = finish(tx, outcome).await?;

        tracing::info!(id = ?saved.id, "book created");
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn delete_book(&self, id: i64) -> Result<(), BookError> {
        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;
        let outcome = apply_delete(&mut tx, id).await;
        finish(tx, outcome).await?;

        tracing::info!("book deleted");
        Ok(())
    }

    /// Service-level existence check, backed by `repository::exists_by_id`.
    pub async fn exists(&self, id: i64) -> Result<bool, BookError> {
        let mut conn = self.pool.acquire().await?;
        Ok(repository::exists_by_id(&mut conn, id).await?)
    }
}

async fn apply_update(
    conn: &mut SqliteConnection,
    principal: &Principal,
    id: i64,
    form: &BookForm,
) -> Result<Book, BookError> {
    let mut book = repository::find_by_id(conn, id)
        .await?
        .ok_or(BookError::NotFound { id })?;
    if book.version != form.version {
        return Err(BookError::OptimisticLock { id });
    }

    form.apply_to(&mut book);
    book.stamp_updated(&principal.username, OffsetDateTime::now_utc());
    Ok(repository::save(conn, &book).await?)
}

async fn apply_delete(conn: &mut SqliteConnection, id: i64) -> Result<(), BookError> {
    if !repository::exists_by_id(conn, id).await? {
        return Err(BookError::NotFound { id });
    }
    Ok(repository::delete_by_id(conn, id).await?)
}

/// Commit on success; roll back right away on failure so the write lock is
/// not held by a pooled connection.
async fn finish<T>(
    tx: Transaction<'static, Sqlite>,
    outcome: Result<T, BookError>,
) -> Result<T, BookError> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(error) => {
            tx.rollback().await?;
            Err(error)
        }
    }
}
