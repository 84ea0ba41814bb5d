//! Login pages and the stylesheet. All paths here are public.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use once_cell::sync::OnceCell;
use serde_json::json;
use shelf_http::{AppError, Renderer, View};
use shelf_kernel::{InitCtx, Module};

use crate::utils::messages::{message, Locale};
use crate::views::LOGIN_VIEW;

const STYLESHEET: &str = include_str!("../../../static/shelf.css");

/// Which notice the login page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Notice {
    None,
    LoginFailure,
    Logout,
    SessionInvalid,
}

impl Notice {
    fn message_key(self) -> Option<&'static str> {
        match self {
            Notice::None => None,
            Notice::LoginFailure => Some("login.failure"),
            Notice::Logout => Some("login.logout"),
            Notice::SessionInvalid => Some("login.session-invalid"),
        }
    }
}

#[derive(Default)]
pub struct LoginModule {
    renderer: OnceCell<Arc<Renderer>>,
}

impl LoginModule {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Module for LoginModule {
    fn name(&self) -> &'static str {
        "login"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.renderer
            .set(Arc::new(crate::views::renderer()?))
            .map_err(|_| anyhow!("login module initialized twice"))?;
        Ok(())
    }

    fn routes(&self) -> anyhow::Result<Router> {
        let renderer = self
            .renderer
            .get()
            .cloned()
            .context("login module routes requested before init")?;

        Ok(Router::new()
            .route("/login", get(login))
            .route("/loginfailure", get(login_failure))
            .route("/logoutsuccess", get(logout_success))
            .route("/invalidsession", get(invalid_session))
            .route("/css/shelf.css", get(stylesheet))
            .with_state(renderer))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let page = |summary: &str| {
            json!({
                "get": {
                    "summary": summary,
                    "tags": ["Login"],
                    "responses": {
                        "200": {
                            "description": "Login page",
                            "content": { "text/html": { "schema": { "type": "string" } } }
                        }
                    }
                }
            })
        };
        Some(json!({
            "paths": {
                "/login": page("Login form"),
                "/loginfailure": page("Login form after a failed attempt"),
                "/logoutsuccess": page("Login form after logout"),
                "/invalidsession": page("Login form after the session expired"),
                "/authenticate": {
                    "post": {
                        "summary": "Verify credentials and start a session",
                        "tags": ["Login"],
                        "requestBody": {
                            "content": {
                                "application/x-www-form-urlencoded": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "username": { "type": "string" },
                                            "password": { "type": "string" }
                                        }
                                    }
                                }
                            }
                        },
                        "responses": {
                            "303": { "description": "Redirect to the role home page or to /loginfailure" }
                        }
                    }
                },
                "/logout": {
                    "post": {
                        "summary": "End the session",
                        "tags": ["Login"],
                        "responses": { "303": { "description": "Redirect to /logoutsuccess" } }
                    }
                }
            }
        }))
    }
}

fn render_login(renderer: &Renderer, locale: Locale, notice: Notice) -> Result<Response, AppError> {
    renderer.render(
        &View::new(LOGIN_VIEW)
            .with("lang", locale.code())
            .with("loginFailure", notice == Notice::LoginFailure)
            .with("logout", notice == Notice::Logout)
            .with("sessionInvalid", notice == Notice::SessionInvalid)
            .with("notice", notice.message_key().map(|key| message(locale, key))),
    )
}

async fn login(State(renderer): State<Arc<Renderer>>, locale: Locale) -> Result<Response, AppError> {
    render_login(&renderer, locale, Notice::None)
}

async fn login_failure(
    State(renderer): State<Arc<Renderer>>,
    locale: Locale,
) -> Result<Response, AppError> {
    render_login(&renderer, locale, Notice::LoginFailure)
}

async fn logout_success(
    State(renderer): State<Arc<Renderer>>,
    locale: Locale,
) -> Result<Response, AppError> {
    render_login(&renderer, locale, Notice::Logout)
}

async fn invalid_session(
    State(renderer): State<Arc<Renderer>>,
    locale: Locale,
) -> Result<Response, AppError> {
    render_login(&renderer, locale, Notice::SessionInvalid)
}

async fn stylesheet() -> Response {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET).into_response()
}
