//! View rendering seam.
//!
//! Template engines live outside this crate; the dispatcher only needs
//! something that turns a template name plus JSON data into HTML. Brisk
//! `render` routes and production status pages go through [`ViewRenderer`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::HttpError;

/// Renders a named template.
#[async_trait]
pub trait ViewRenderer: Send + Sync {
    async fn render(&self, template: &str, data: &Value) -> Result<String, HttpError>;
}

/// In-memory templates with `{{ path.to.value }}` placeholders.
///
/// Enough for status pages and small sites; values are HTML escaped.
#[derive(Debug, Default, Clone)]
pub struct StaticViews {
    templates: HashMap<String, String>,
}

impl StaticViews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn template(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.templates.insert(name.into(), source.into());
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }
}

#[async_trait]
impl ViewRenderer for StaticViews {
    async fn render(&self, template: &str, data: &Value) -> Result<String, HttpError> {
        let source = self
            .templates
            .get(template)
            .ok_or_else(|| HttpError::new(format!("Template `{}` does not exist", template)))?;
        Ok(interpolate(source, data))
    }
}

fn interpolate(source: &str, data: &Value) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let Some(end) = rest[start..].find("}}") else {
            rest = &rest[start..];
            break;
        };
        let key = rest[start + 2..start + end].trim();
        let value = key
            .split('.')
            .try_fold(data, |node, part| node.get(part))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .unwrap_or_default();
        out.push_str(&escape_html(&value));
        rest = &rest[start + end + 2..];
    }

    out.push_str(rest);
    out
}

/// Escape text for inclusion in HTML.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_interpolation() {
        let views = StaticViews::new().template("user", "<p>{{ params.id }} / {{ missing }}</p>");
        let html = views
            .render("user", &json!({ "params": { "id": "<7>" } }))
            .await
            .unwrap();
        assert_eq!(html, "<p>&lt;7&gt; / </p>");
    }

    #[tokio::test]
    async fn test_unknown_template() {
        let views = StaticViews::new();
        assert!(views.render("nope", &json!({})).await.is_err());
    }
}
