//! Error handling for the shelf HTTP layer

use axum::{
    extract::rejection::{FormRejection, PathRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use minijinja::Environment;
use once_cell::sync::Lazy;
use serde::Serialize;
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

const ERROR_TEMPLATE: &str = "error.html";

static ERROR_PAGES: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    if let Err(error) = env.add_template(ERROR_TEMPLATE, include_str!("../templates/error.html")) {
        tracing::error!(%error, "error page template is invalid");
    }
    env
});

/// Model handed to the error page
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
    pub code: String,
    pub trace_id: String,
    pub timestamp: String,
}

/// Errors that escape a handler and end up on the generic error page
#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {message}")]
    NotFound { message: String, code: String },

    #[error("forbidden: {message}")]
    Forbidden { message: String, code: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: "not_found".to_string(),
        }
    }

    /// Create a forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
            code: "forbidden".to_string(),
        }
    }

    /// Create an internal error from a plain message
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(anyhow::anyhow!(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::internal(format!("malformed path: {}", rejection.body_text()))
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        Self::internal(format!("malformed form: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        let status = self.status();

        let (error_code, message) = match self {
            AppError::NotFound { message, code } | AppError::Forbidden { message, code } => {
                tracing::warn!(
                    error_id = %error_id,
                    error_code = %code,
                    status_code = %status.as_u16(),
                    %message,
                    "Request rejected"
                );
                (code, message)
            }
            AppError::Internal(e) => {
                tracing::error!(
                    error_id = %error_id,
                    status_code = %status.as_u16(),
                    error = ?e,
                    "Request failed"
                );
                // Internal details stay in the log
                (
                    "internal_error".to_string(),
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            status: status.as_u16(),
            message,
            code: error_code,
            trace_id: error_id.to_string(),
            timestamp,
        };

        let page = ERROR_PAGES
            .get_template(ERROR_TEMPLATE)
            .and_then(|template| template.render(&body))
            .unwrap_or_else(|error| {
                tracing::error!(%error, "failed to render error page");
                format!("{} {}", body.status, body.message)
            });

        (status, Html(page)).into_response()
    }
}
