use std::sync::Arc;

use axum::response::Html;
use badgus_core::Data;
use tera::Context;

use crate::error::WebError;
use crate::extract::Viewer;
use crate::render::Renderer;

#[derive(Clone)]
pub struct AppState {
    pub data: Data,
    pub renderer: Arc<Renderer>,
}

impl AppState {
    pub fn new(data: Data) -> anyhow::Result<Self> {
        let renderer = Renderer::new(&data.settings.uploads_url)?;
        Ok(Self {
            data,
            renderer: Arc::new(renderer),
        })
    }

    /// Template context every page starts from.
    pub fn context(&self, viewer: &Viewer) -> Context {
        let mut ctx = Context::new();
        ctx.insert("viewer", &viewer.summary());
        ctx
    }

    pub fn render(&self, template: &str, ctx: &Context) -> Result<Html<String>, WebError> {
        Ok(Html(self.renderer.render(template, ctx)?))
    }
}
