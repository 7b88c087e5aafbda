//! Renderer – fills registered templates with data to produce HTML
//! correspondence.
//!
//! Template syntax is MiniJinja (`{{ name }}`, `{% for item in items %}`).
//! Substituted values are HTML-escaped. Rendering failures never propagate;
//! they are recorded in the caller's [`Protocol`].

use minijinja::{AutoEscape, Environment};
use serde_json::{Map, Value};

use crate::document::{Document, DocumentPatch, DocumentType, Protocol};
use crate::registry::Registry;

pub struct Renderer {
    env: Environment<'static>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        // Marker-free templates must come back byte for byte.
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        Self { env }
    }

    /// Render `template_body` with `data`.
    ///
    /// `data` must be a JSON object; `null` counts as an empty object and any
    /// other value is replaced by an empty object after logging
    /// `Error - data is not an object.` On an engine failure one
    /// `Error: <message>` entry is appended and `""` is returned.
    pub fn fill_template(&self, data: &Value, template_body: &str, protocol: &mut Protocol) -> String {
        self.render(data, template_body, protocol).unwrap_or_default()
    }

    /// `None` only when the engine failed.
    fn render(
        &self,
        data: &Value,
        template_body: &str,
        protocol: &mut Protocol,
    ) -> Option<String> {
        let empty = Value::Object(Map::new());
        let context = match data {
            Value::Object(_) => data,
            Value::Null => &empty,
            _ => {
                protocol.push("Error - data is not an object.");
                &empty
            }
        };

        match self.env.render_str(template_body, context) {
            Ok(html) => Some(html),
            Err(e) => {
                log::warn!("Template rendering failed: {e}");
                protocol.error(&e);
                None
            }
        }
    }

    /// Build an HTML document from template `template_name` filled with
    /// `data`.
    ///
    /// Always returns a document. On failure its body is empty and the
    /// reason is in its protocol; on success the protocol ends with
    /// `Correspondence created.`
    pub async fn create_correspondence(
        &self,
        registry: &Registry,
        template_name: &str,
        data: &Value,
    ) -> Document {
        let mut doc = Document::new(
            DocumentPatch {
                subject: Some(format!("Correspondence of template {template_name}")),
                template: Some(template_name.to_string()),
                task: Some("Create_Correspondence".to_string()),
                data: Some(data.clone()),
                ..DocumentPatch::default()
            },
            registry.settings(),
        );
        doc.protocol
            .push(format!("Start correspondence with template {template_name}"));

        let template = match registry.template_body(template_name).await {
            Ok(template) if !template.body.is_empty() => template,
            Ok(_) => {
                doc.protocol.error("No template data found");
                return doc;
            }
            Err(e) => {
                log::warn!("Correspondence for '{template_name}' failed: {e}");
                doc.protocol.error(e);
                return doc;
            }
        };

        let rendered = self.render(data, &template.body, &mut doc.protocol);
        doc.root_of = template.id;
        doc.format = template.format;
        doc.landscape = template.landscape;
        doc.doc_type = DocumentType::Html;

        if let Some(body) = rendered {
            doc.body = body;
            doc.protocol.push("Correspondence created.");
            log::info!("Correspondence created from template '{template_name}'");
        }
        doc
    }
}

/// [`Renderer::fill_template`] with a default renderer.
pub fn fill_template(data: &Value, template_body: &str, protocol: &mut Protocol) -> String {
    Renderer::new().fill_template(data, template_body, protocol)
}
