use std::{collections::HashMap, path::PathBuf, sync::Arc, time::SystemTime};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

pub const HEADER_TEMPLATE: &str = "_header.html.liquid";
pub const FOOTER_TEMPLATE: &str = "_footer.html.liquid";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to read template {name}: {source}")]
    Io {
        name: String,
        source: std::io::Error,
    },

    #[error("Template error: {0}")]
    Liquid(#[from] liquid::Error),
}

pub struct TemplateEngine {
    template_dir: PathBuf,
    cache: Arc<RwLock<HashMap<String, CachedTemplate>>>,
}

struct CachedTemplate {
    content: String,
    modified: SystemTime,
}

impl TemplateEngine {
    pub fn new(template_dir: PathBuf) -> Self {
        Self {
            template_dir,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn load_template(&self, name: &str) -> Result<String, TemplateError> {
        let template_path = self.template_dir.join(name);
        let io_error = |source| TemplateError::Io {
            name: name.to_string(),
            source,
        };

        let modified = tokio::fs::metadata(&template_path)
            .await
            .and_then(|metadata| metadata.modified())
            .map_err(io_error)?;

        let mut cache = self.cache.write().await;

        if let Some(cached) = cache.get(name)
            && cached.modified >= modified
        {
            debug!("Using cached template for {}", name);
            return Ok(cached.content.clone());
        }

        info!("Loading template: {}", name);

        let content = tokio::fs::read_to_string(&template_path)
            .await
            .map_err(io_error)?;

        cache.insert(
            name.to_string(),
            CachedTemplate {
                content: content.clone(),
                modified,
            },
        );

        Ok(content)
    }

    async fn render_source(
        &self,
        name: &str,
        globals: &liquid::Object,
    ) -> Result<String, TemplateError> {
        let source = self.load_template(name).await?;
        let parser = liquid::ParserBuilder::with_stdlib().build()?;
        let template = parser.parse(&source)?;
        Ok(template.render(globals)?)
    }

    /// Partials are optional; a missing or broken one renders as nothing.
    async fn render_partial(&self, name: &str, globals: &liquid::Object) -> String {
        self.render_source(name, globals)
            .await
            .unwrap_or_else(|e| {
                error!("Failed to render partial {}: {}", name, e);
                String::new()
            })
    }

    /// Renders `template_name` with `globals`, exposing the rendered header and
    /// footer partials as `header` and `footer`.
    pub async fn render_template(
        &self,
        template_name: &str,
        globals: liquid::Object,
    ) -> Result<String, TemplateError> {
        let header = self.render_partial(HEADER_TEMPLATE, &globals).await;
        let footer = self.render_partial(FOOTER_TEMPLATE, &globals).await;

        let mut full_globals = globals;
        full_globals.insert(
            "header".into(),
            liquid::model::Value::Scalar(header.into()),
        );
        full_globals.insert(
            "footer".into(),
            liquid::model::Value::Scalar(footer.into()),
        );

        self.render_source(template_name, &full_globals).await
    }
}
