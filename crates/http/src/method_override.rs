//! Hidden HTTP method support for HTML forms.
//!
//! Browsers only submit GET and POST, so forms carry the intended verb in a
//! `_method` field (`put`, `patch`, `delete`). The override has to happen
//! before routing, which is why this is a plain tower service wrapped around
//! the finished router rather than a route layer.

use std::{
    convert::Infallible,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, HeaderMap, Method},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};

use crate::error::AppError;

pub const METHOD_FIELD: &str = "_method";
const MAX_FORM_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct MethodOverrideLayer;

impl<S> Layer<S> for MethodOverrideLayer {
    type Service = MethodOverride<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MethodOverride { inner }
    }
}

#[derive(Debug, Clone)]
pub struct MethodOverride<S> {
    inner: S,
}

impl<S> Service<Request> for MethodOverride<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // The clone is not necessarily ready; keep the one that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match apply_override(request).await {
                Ok(request) => inner.call(request).await,
                Err(error) => Ok(error.into_response()),
            }
        })
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

/// Method named by the `_method` field of a url-encoded body, if any.
pub fn override_method(body: &[u8]) -> Option<Method> {
    let (_, value) = url::form_urlencoded::parse(body).find(|(key, _)| key == METHOD_FIELD)?;
    match value.to_ascii_uppercase().as_str() {
        "PUT" => Some(Method::PUT),
        "PATCH" => Some(Method::PATCH),
        "DELETE" => Some(Method::DELETE),
        _ => None,
    }
}

async fn apply_override(request: Request) -> Result<Request, AppError> {
    if request.method() != Method::POST || !is_form(request.headers()) {
        return Ok(request);
    }

    let (mut parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|error| AppError::Internal(anyhow::Error::new(error).context("unreadable form body")))?;

    if let Some(method) = override_method(&bytes) {
        tracing::debug!(%method, path = %parts.uri.path(), "form method override");
        parts.method = method;
    }

    Ok(Request::from_parts(parts, Body::from(bytes)))
}
