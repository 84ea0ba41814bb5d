use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A catalog entry as stored in the `book` table.
///
/// `id` is `None` only for a book that has not been saved yet; the store
/// assigns it on insert.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Option<i64>,
    pub title: String,
    pub author: String,
    pub created_user: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_date_time: OffsetDateTime,
    pub updated_user: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_date_time: OffsetDateTime,
    pub version: i64,
}

impl Book {
    /// An unsaved book; audit fields are filled by [`Book::stamp_created`].
    pub fn draft(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            author: author.into(),
            created_user: String::new(),
            created_date_time: OffsetDateTime::UNIX_EPOCH,
            updated_user: String::new(),
            updated_date_time: OffsetDateTime::UNIX_EPOCH,
            version: 0,
        }
    }

    pub fn stamp_created(&mut self, username: &str, at: OffsetDateTime) {
        self.created_user = username.to_string();
        self.created_date_time = at;
        self.stamp_updated(username, at);
    }

    pub fn stamp_updated(&mut self, username: &str, at: OffsetDateTime) {
        self.updated_user = username.to_string();
        self.updated_date_time = at;
    }
}

/// Form object shuttled between the listing page and the service.
///
/// Only `title`, `author`, `newBook` and `version` are read from a request;
/// `books` is filled server-side for rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub new_book: bool,
    pub version: i64,
    #[serde(skip_deserializing)]
    pub books: Vec<Book>,
}

impl BookForm {
    /// Empty form for adding a book, alongside the current listing.
    pub fn new_book(books: Vec<Book>) -> Self {
        Self {
            new_book: true,
            books,
            ..Self::default()
        }
    }

    /// Form pre-filled from a stored book, alongside the current listing.
    pub fn from_book(book: &Book, books: Vec<Book>) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            new_book: false,
            version: book.version,
            books,
        }
    }

    /// Copy the editable fields onto `book`. Id, version and audit fields
    /// are left alone.
    pub fn apply_to(&self, book: &mut Book) {
        book.title = self.title.clone();
        book.author = self.author.clone();
    }

    /// Unsaved book built from the editable fields; a submitted version is ignored.
    pub fn to_draft(&self) -> Book {
        Book::draft(self.title.clone(), self.author.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn stored() -> Book {
        let mut book = Book::draft("Dune", "Herbert");
        book.id = Some(7);
        book.version = 3;
        book.stamp_created("admin", datetime!(2024-01-02 03:04:05 UTC));
        book
    }

    #[test]
    fn stamping_created_sets_both_audit_pairs() {
        let book = stored();
        assert_eq!(book.created_user, "admin");
        assert_eq!(book.updated_user, "admin");
        assert_eq!(book.created_date_time, book.updated_date_time);
    }

    #[test]
    fn stamping_updated_leaves_creation_alone() {
        let mut book = stored();
        let later = datetime!(2024-02-01 00:00:00 UTC);
        book.stamp_updated("user", later);

        assert_eq!(book.created_user, "admin");
        assert_eq!(book.created_date_time, datetime!(2024-01-02 03:04:05 UTC));
        assert_eq!(book.updated_user, "user");
        assert_eq!(book.updated_date_time, later);
    }

    #[test]
    fn form_from_book_carries_editable_fields_and_version() {
        let book = stored();
        let form = BookForm::from_book(&book, vec![book.clone()]);

        assert_eq!(form.title, "Dune");
        assert_eq!(form.author, "Herbert");
        assert_eq!(form.version, 3);
        assert!(!form.new_book);
        assert_eq!(form.books.len(), 1);
    }

    #[test]
    fn new_book_form_is_blank() {
        let form = BookForm::new_book(Vec::new());
        assert!(form.new_book);
        assert!(form.title.is_empty());
        assert!(form.author.is_empty());
        assert_eq!(form.version, 0);
    }

    #[test]
    fn apply_to_only_touches_title_and_author() {
        let mut book = stored();
        let form = BookForm {
            title: "Children of Dune".to_string(),
            author: "F. Herbert".to_string(),
            version: 99,
            ..BookForm::default()
        };
        form.apply_to(&mut book);

        assert_eq!(book.title, "Children of Dune");
        assert_eq!(book.author, "F. Herbert");
        assert_eq!(book.version, 3);
        assert_eq!(book.id, Some(7));
    }

    #[test]
    fn draft_ignores_submitted_version() {
        let form = BookForm {
            title: "Emma".to_string(),
            author: "Austen".to_string(),
            version: 5,
            ..BookForm::default()
        };
        let draft = form.to_draft();
        assert_eq!(draft.id, None);
        assert_eq!(draft.version, 0);
    }

    #[test]
    fn form_deserializes_from_camel_case_fields() {
        let form: BookForm = serde_json::from_value(serde_json::json!({
            "title": "t",
            "author": "a",
            "newBook": false,
            "version": 2,
            "books": [{"ignored": true}]
        }))
        .unwrap();
        assert!(!form.new_book);
        assert_eq!(form.version, 2);
        assert!(form.books.is_empty());
    }
}
