//! HTML endpoints of the catalog.
//!
//! Successful writes redirect to the listing; business failures re-render
//! it with a message, the submitted input and a fresh list of books.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use shelf_authz::Principal;
use shelf_http::{AppError, CurrentUser, Renderer, View};

use super::error::{BookError, FieldError};
use super::models::BookForm;
use super::service::BookService;
use super::validation::validate;
use crate::utils::messages::{message, message_with, Locale};
use crate::views::{ADMIN_VIEW, BOOKS_VIEW};

const BOOKS_PATH: &str = "/books";

#[derive(Clone)]
pub struct BooksState {
    pub service: BookService,
    pub renderer: Arc<Renderer>,
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(root))
        .route(BOOKS_PATH, get(read_books).post(create_book))
        .route(
            "/books/{id}",
            get(read_one_book).put(update_book).delete(delete_book),
        )
        .route("/admin", get(admin))
        .with_state(state)
}

type BookId = WithRejection<Path<i64>, AppError>;
type SubmittedForm = WithRejection<Form<BookForm>, AppError>;

async fn root() -> Redirect {
    Redirect::to(BOOKS_PATH)
}

/// `GET /books`
async fn read_books(
    State(state): State<BooksState>,
    CurrentUser(principal): CurrentUser,
    locale: Locale,
) -> Result<Response, AppError> {
    let form = state.service.init_form().await.map_err(unexpected)?;
    state.renderer.render(&listing(&principal, locale, &form))
}

/// `GET /admin`
async fn admin(
    State(state): State<BooksState>,
    CurrentUser(principal): CurrentUser,
    locale: Locale,
) -> Result<Response, AppError> {
    let form = state.service.init_form().await.map_err(unexpected)?;
    state
        .renderer
        .render(&listing(&principal, locale, &form).rename(ADMIN_VIEW))
}

/// `GET /books/{id}`
async fn read_one_book(
    State(state): State<BooksState>,
    CurrentUser(principal): CurrentUser,
    locale: Locale,
    WithRejection(Path(id), _): BookId,
) -> Result<Response, AppError> {
    match state.service.read_one_book(id).await {
        Ok(form) => state
            .renderer
            .render(&listing(&principal, locale, &form).with("bookId", id)),
        Err(error) => {
            render_failure(&state, &principal, locale, BookForm::new_book(Vec::new()), error, None)
                .await
        }
    }
}

/// `POST /books`
async fn create_book(
    State(state): State<BooksState>,
    CurrentUser(principal): CurrentUser,
    locale: Locale,
    WithRejection(Form(form), _): SubmittedForm,
) -> Result<Response, AppError> {
    let outcome = match validate(&form) {
        Ok(()) => state.service.create_book(&principal, &form).await.map(drop),
        Err(errors) => Err(BookError::Validation(errors)),
    };

    match outcome {
        Ok(()) => Ok(Redirect::to(BOOKS_PATH).into_response()),
        Err(error) => render_failure(&state, &principal, locale, form, error, None).await,
    }
}

/// `PUT /books/{id}`
async fn update_book(
    State(state): State<BooksState>,
    CurrentUser(principal): CurrentUser,
    locale: Locale,
    WithRejection(Path(id), _): BookId,
    WithRejection(Form(form), _): SubmittedForm,
) -> Result<Response, AppError> {
    let outcome = match validate(&form) {
        Ok(()) => state.service.update_book(&principal, id, &form).await.map(drop),
        Err(errors) => Err(BookError::Validation(errors)),
    };

    match outcome {
        Ok(()) => Ok(Redirect::to(BOOKS_PATH).into_response()),
        Err(error) => render_failure(&state, &principal, locale, form, error, Some(id)).await,
    }
}

/// `DELETE /books/{id}`
async fn delete_book(
    State(state): State<BooksState>,
    CurrentUser(principal): CurrentUser,
    locale: Locale,
    WithRejection(Path(id), _): BookId,
) -> Result<Response, AppError> {
    match state.service.delete_book(id).await {
        Ok(()) => Ok(Redirect::to(BOOKS_PATH).into_response()),
        Err(error) => {
            render_failure(&state, &principal, locale, BookForm::new_book(Vec::new()), error, None)
                .await
        }
    }
}

#[derive(Serialize)]
struct FieldMessage {
    field: &'static str,
    label: String,
    message: String,
}

fn listing(principal: &Principal, locale: Locale, form: &BookForm) -> View {
    View::new(BOOKS_VIEW)
        .with("form", form)
        .with("userName", &principal.username)
        .with("isAdmin", principal.is_admin())
        .with("lang", locale.code())
}

/// Re-render the listing for a business failure; anything else is a 500.
async fn render_failure(
    state: &BooksState,
    principal: &Principal,
    locale: Locale,
    mut form: BookForm,
    error: BookError,
    book_id: Option<i64>,
) -> Result<Response, AppError> {
    let Some(key) = error.message_key() else {
        return Err(unexpected(error));
    };
    tracing::warn!(%error, user = %principal.username, "book request rejected");

    form.books = state.service.init_form().await.map_err(unexpected)?.books;

    let mut view = listing(principal, locale, &form).with("errorMessage", message(locale, key));
    if let BookError::Validation(errors) = &error {
        view = view.with("fieldErrors", field_messages(locale, errors));
    }
    if let Some(id) = book_id {
        view = view.with("bookId", id);
    }
    state.renderer.render(&view)
}

fn field_messages(locale: Locale, errors: &[FieldError]) -> Vec<FieldMessage> {
    errors
        .iter()
        .map(|error| {
            let args = error
                .max
                .map(|max| vec![("max", max.to_string())])
                .unwrap_or_default();
            FieldMessage {
                field: error.field,
                label: message(locale, &format!("field.{}", error.field)),
                message: message_with(locale, error.code, &args),
            }
        })
        .collect()
}

fn unexpected(error: BookError) -> AppError {
    AppError::Internal(error.into())
}
