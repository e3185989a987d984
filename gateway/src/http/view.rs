//! Template rendering seam.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use crate::content::Content;
use crate::envelope::Fault;
use crate::requester::Requester;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*(>\s*)?([^}\s]+)\s*\}\}").expect("placeholder pattern is valid")
});

/// Produces a view body from a template.
///
/// `model` is a JSON object; the requester lets a template pull sub-data by
/// invoking other resources through [`Requester::build`].
#[async_trait]
pub trait Render: Send + Sync {
    /// Renders `template` (a path relative to the template root).
    ///
    /// # Errors
    ///
    /// Returns a fault if the template is missing or a sub-invocation fails.
    async fn render(&self, template: &str, requester: &Requester, model: &Value) -> Result<String, Fault>;
}

/// Minimal file-based renderer.
///
/// `{{name}}` is replaced by the model field `name` and `{{> uri}}` by the
/// text result of invoking `uri` with the current parameters. Unknown fields
/// render as empty text.
#[derive(Debug, Clone)]
pub struct PlaceholderRender {
    root: PathBuf,
}

impl PlaceholderRender {
    /// Loads templates from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, template: &str) -> Result<PathBuf, Fault> {
        let relative = Path::new(template.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(Fault::RequestHandling(format!(
                "template outside the template root: {template}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Render for PlaceholderRender {
    async fn render(&self, template: &str, requester: &Requester, model: &Value) -> Result<String, Fault> {
        let path = self.resolve(template)?;
        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Fault::RequestHandling(format!("template {template}: {e}")))?;

        let mut out = String::with_capacity(source.len());
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(&source) {
            let (Some(whole), Some(key)) = (caps.get(0), caps.get(2)) else {
                continue;
            };
            out.push_str(&source[last..whole.start()]);
            if caps.get(1).is_some() {
                let content = requester
                    .build(key.as_str(), requester.params().clone())
                    .execute()
                    .await?;
                out.push_str(&as_text(content));
            } else {
                out.push_str(&value_text(model.get(key.as_str()).unwrap_or(&Value::Null)));
            }
            last = whole.end();
        }
        out.push_str(&source[last..]);
        Ok(out)
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_text(content: Content) -> String {
    match content {
        Content::Bytes { data, .. } => String::from_utf8_lossy(&data).into_owned(),
        other => value_text(&other.into_json()),
    }
}
