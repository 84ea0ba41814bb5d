#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use shelf_http::{method_override::MethodOverride, MethodOverrideLayer};
use shelf_kernel::settings::Settings;
use shelf_kernel::ModuleRegistry;
use sqlx::SqlitePool;
use tower::{Layer, ServiceExt};

/// Fresh in-memory database with every module migration applied.
pub async fn pool() -> SqlitePool {
    let settings = Settings::for_tests();
    let pool = shelf_db::connect(&settings.database).await.unwrap();
    let mut registry = ModuleRegistry::new();
    shelf_app::modules::register_all(&mut registry);
    shelf_db::migrate(&pool, &registry.collect_migrations())
        .await
        .unwrap();
    pool
}

/// File-backed database with several connections, for tests that need
/// real concurrent writers. Remove the files with [`remove_database`].
pub async fn file_pool(name: &str) -> (SqlitePool, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!("shelf-{name}-{}.db", std::process::id()));
    remove_database(&path);

    let mut settings = Settings::for_tests();
    settings.database.url = format!("sqlite://{}", path.display());
    settings.database.max_connections = 5;

    let pool = shelf_db::connect(&settings.database).await.unwrap();
    let mut registry = ModuleRegistry::new();
    shelf_app::modules::register_all(&mut registry);
    shelf_db::migrate(&pool, &registry.collect_migrations())
        .await
        .unwrap();
    (pool, path)
}

pub fn remove_database(path: &std::path::Path) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

/// The whole application as served, method override included.
pub struct TestApp {
    service: MethodOverride<Router>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let app = shelf_app::bootstrap(&Settings::for_tests()).await.unwrap();
        Self {
            service: MethodOverrideLayer.layer(app.router),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.service.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, cookie: Option<&str>, body: &str) -> Response {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Log in and return the `name=value` session cookie.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post_form(
                "/authenticate",
                None,
                &format!("username={username}&password={password}"),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        session_cookie(&response).expect("login sets a session cookie")
    }
}

pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("SHELFSESSION="))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
