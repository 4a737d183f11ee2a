//! Logical view names to template files.

use axum::response::Html;
use std::path::PathBuf;
use tracing::debug;

use crate::config::ViewSettings;
use crate::error::WardenError;

/// Pure prefix/suffix mapping from a view name to a template path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewResolver {
    prefix: String,
    suffix: String,
}

impl ViewResolver {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn resolve(&self, view: &str) -> String {
        format!("{}{}{}", self.prefix, view, self.suffix)
    }
}

/// Loads resolved templates from below a web root and fills `{{key}}`
/// placeholders with HTML-escaped values.
#[derive(Debug, Clone)]
pub struct ViewRenderer {
    resolver: ViewResolver,
    root: PathBuf,
}

impl ViewRenderer {
    pub fn new(settings: &ViewSettings) -> Self {
        Self {
            resolver: ViewResolver::new(&settings.prefix, &settings.suffix),
            root: settings.root.clone(),
        }
    }

    pub fn resolver(&self) -> &ViewResolver {
        &self.resolver
    }

    pub async fn render(
        &self,
        view: &str,
        model: &[(&str, String)],
    ) -> Result<Html<String>, WardenError> {
        let resolved = self.resolver.resolve(view);
        let path = self.root.join(resolved.trim_start_matches('/'));
        debug!(view, template = %path.display(), "rendering view");

        let template =
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| WardenError::Template {
                    view: view.to_string(),
                    path: resolved.clone(),
                    source,
                })?;

        Ok(Html(fill(&template, model)))
    }
}

/// Substitute `{{key}}` placeholders in one pass over the template. Inserted
/// values are never rescanned; unknown placeholders stay as written.
fn fill(template: &str, model: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };
        let key = &after[..close];
        match model.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(&escape_html(value)),
            None => out.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
