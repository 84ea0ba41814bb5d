//! Server-side views: a template name plus the model handed to it.

use std::collections::BTreeMap;

use axum::response::{Html, IntoResponse, Response};
use minijinja::{Environment, Value};
use serde::Serialize;

use crate::error::AppError;

/// A template to render with its model.
#[derive(Debug, Clone)]
pub struct View {
    template: &'static str,
    model: BTreeMap<&'static str, Value>,
}

impl View {
    pub fn new(template: &'static str) -> Self {
        Self {
            template,
            model: BTreeMap::new(),
        }
    }

    /// Add an entry to the model.
    pub fn with(mut self, key: &'static str, value: impl Serialize) -> Self {
        self.model.insert(key, Value::from_serialize(&value));
        self
    }

    /// Swap the template while keeping the model.
    pub fn rename(mut self, template: &'static str) -> Self {
        self.template = template;
        self
    }
}

/// Template registry. HTML templates are auto-escaped.
#[derive(Debug)]
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    pub fn with_template(
        mut self,
        name: &'static str,
        source: &'static str,
    ) -> Result<Self, minijinja::Error> {
        self.env.add_template(name, source)?;
        Ok(self)
    }

    pub fn render_to_string(&self, view: &View) -> Result<String, AppError> {
        self.env
            .get_template(view.template)
            .and_then(|template| template.render(&view.model))
            .map_err(|error| {
                AppError::Internal(
                    anyhow::Error::new(error)
                        .context(format!("failed to render view '{}'", view.template)),
                )
            })
    }

    pub fn render(&self, view: &View) -> Result<Response, AppError> {
        let html = self.render_to_string(view)?;
        Ok(Html(html).into_response())
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
