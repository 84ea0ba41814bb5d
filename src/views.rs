//! Page templates shipped with the application.

use anyhow::Context;
use shelf_http::Renderer;

pub const BOOKS_VIEW: &str = "books.html";
pub const ADMIN_VIEW: &str = "admin.html";
pub const LOGIN_VIEW: &str = "login.html";

const TEMPLATES: [(&str, &str); 4] = [
    ("layout.html", include_str!("../templates/layout.html")),
    (BOOKS_VIEW, include_str!("../templates/books.html")),
    (ADMIN_VIEW, include_str!("../templates/admin.html")),
    (LOGIN_VIEW, include_str!("../templates/login.html")),
];

/// A renderer with every page template registered.
pub fn renderer() -> anyhow::Result<Renderer> {
    TEMPLATES
        .into_iter()
        .try_fold(Renderer::new(), |renderer, (name, source)| {
            renderer
                .with_template(name, source)
                .with_context(|| format!("template '{name}' does not compile"))
        })
}
