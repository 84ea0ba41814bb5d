//! Session gate and form-login endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use shelf_authz::{AccessPolicy, CredentialStore, Decision, Principal, SessionStore};
use shelf_kernel::settings::AuthSettings;

use crate::error::AppError;

pub const LOGIN_PATH: &str = "/login";
pub const LOGIN_FAILURE_PATH: &str = "/loginfailure";
pub const LOGOUT_SUCCESS_PATH: &str = "/logoutsuccess";
pub const INVALID_SESSION_PATH: &str = "/invalidsession";
pub const USER_HOME_PATH: &str = "/books";
pub const ADMIN_HOME_PATH: &str = "/admin";

struct AuthInner {
    policy: AccessPolicy,
    sessions: SessionStore,
    credentials: CredentialStore,
    cookie_name: String,
    secure_cookie: bool,
}

/// Shared state of the session gate.
#[derive(Clone)]
pub struct AuthState {
    inner: Arc<AuthInner>,
}

impl AuthState {
    pub fn new(settings: &AuthSettings, policy: AccessPolicy, credentials: CredentialStore) -> Self {
        Self {
            inner: Arc::new(AuthInner {
                policy,
                sessions: SessionStore::new(Duration::from_secs(settings.session_timeout_secs)),
                credentials,
                cookie_name: settings.cookie_name.clone(),
                secure_cookie: settings.secure_cookie,
            }),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    pub fn cookie_name(&self) -> &str {
        &self.inner.cookie_name
    }

    fn session_cookie(&self, id: String) -> Cookie<'static> {
        Cookie::build((self.inner.cookie_name.clone(), id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.inner.secure_cookie)
            .build()
    }

    fn expired_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.inner.cookie_name.clone(), ""))
            .path("/")
            .build()
    }

    fn session_id(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.inner.cookie_name)
            .map(|cookie| cookie.value().to_owned())
    }
}

/// Middleware evaluated before every handler.
///
/// Resolves the session cookie to a [`Principal`], applies the access
/// policy, and attaches the principal to the request extensions.
pub async fn session_gate(
    State(auth): State<AuthState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let session_id = auth.session_id(&jar);
    let principal = session_id
        .as_deref()
        .and_then(|id| auth.sessions().touch(id));

    match auth.inner.policy.decide(&path, principal.as_ref()) {
        Decision::Allow => {}
        Decision::Unauthenticated if session_id.is_some() => {
            tracing::info!(%path, "request carried an invalid session");
            return (
                jar.remove(auth.expired_cookie()),
                Redirect::to(INVALID_SESSION_PATH),
            )
                .into_response();
        }
        Decision::Unauthenticated => {
            tracing::debug!(%path, "unauthenticated request redirected to login");
            return Redirect::to(LOGIN_PATH).into_response();
        }
        Decision::Forbidden => {
            return AppError::forbidden(format!("Access to {} is denied", path)).into_response();
        }
    }

    if let Some(principal) = principal {
        request.extensions_mut().insert(principal);
    }
    next.run(request).await
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// `POST /authenticate`
async fn authenticate(
    State(auth): State<AuthState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let verifier = auth.clone();
    let LoginForm { username, password } = form;
    let attempted = username.clone();
    let principal = tokio::task::spawn_blocking(move || {
        verifier.inner.credentials.authenticate(&username, &password)
    })
    .await
    .map_err(|error| AppError::Internal(error.into()))?;

    let Some(principal) = principal else {
        tracing::warn!(username = %attempted, "login failed");
        return Ok(Redirect::to(LOGIN_FAILURE_PATH).into_response());
    };

    // A fresh id on every login; the previous session is dropped.
    if let Some(previous) = auth.session_id(&jar) {
        auth.sessions().invalidate(&previous);
    }

    let target = if principal.is_admin() {
        ADMIN_HOME_PATH
    } else {
        USER_HOME_PATH
    };
    tracing::info!(username = %principal.username, role = principal.role.authority(), "login succeeded");

    let id = auth.sessions().create(principal);
    Ok((jar.add(auth.session_cookie(id)), Redirect::to(target)).into_response())
}

/// `GET|POST /logout`
async fn logout(State(auth): State<AuthState>, jar: CookieJar) -> Response {
    if let Some(id) = auth.session_id(&jar) {
        if auth.sessions().invalidate(&id) {
            tracing::info!("logout");
        }
    }
    (
        jar.remove(auth.expired_cookie()),
        Redirect::to(LOGOUT_SUCCESS_PATH),
    )
        .into_response()
}

/// Login processing and logout routes.
pub fn routes(auth: AuthState) -> Router {
    Router::new()
        .route("/authenticate", post(authenticate))
        .route("/logout", get(logout).post(logout))
        .with_state(auth)
}

/// Extractor for the principal attached by [`session_gate`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Principal);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::internal("no principal attached to a protected request"))
    }
}
