//! Registry – the in-memory store of template documents together with the
//! process settings.
//!
//! The registry is an explicit value owned by the caller and passed by
//! reference to the renderer and the documents that register themselves.
//! Entries are only ever appended, or replaced in place by an explicit
//! overwrite; there is no removal.

use std::path::Path;

use crate::document::{Document, DocumentPatch, DocumentType};
use crate::error::RegistryError;
use crate::settings::{Settings, SettingsPatch};

#[derive(Debug, Clone, Default)]
pub struct Registry {
    templates: Vec<Document>,
    settings: Settings,
}

impl Registry {
    pub fn new(settings: Settings) -> Self {
        Self {
            templates: Vec::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the settings fields present in `patch`.
    pub fn configure(&mut self, patch: SettingsPatch) {
        self.settings.apply(patch);
        log::debug!("Registry settings now {:?}", self.settings);
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Registered templates in registration order.
    pub fn templates(&self) -> &[Document] {
        &self.templates
    }

    /// Register the HTML file at `source` as template `name`.
    ///
    /// The new document uses `name` both as subject and template name and is
    /// always of type HTML. Its body is loaded lazily by
    /// [`Registry::template_body`].
    pub fn register(
        &mut self,
        name: &str,
        source: impl AsRef<Path>,
    ) -> Result<Document, RegistryError> {
        let source = source.as_ref();
        if name.is_empty() {
            return Err(RegistryError::MissingName);
        }
        if source.as_os_str().is_empty() {
            return Err(RegistryError::MissingSource);
        }
        if DocumentType::from_path(source) != DocumentType::Html {
            return Err(RegistryError::NotHtml(source.to_path_buf()));
        }

        let mut doc = Document::new(
            DocumentPatch {
                subject: Some(name.to_string()),
                template: Some(name.to_string()),
                filename: Some(source.to_path_buf()),
                doc_type: Some(DocumentType::Html),
                task: Some("HTML_from_File".to_string()),
                ..DocumentPatch::default()
            },
            &self.settings,
        );
        doc.protocol
            .push(format!("Start template registration with name {name}"));

        if self
            .position(&doc.subject, Some(&doc.doc_type), Some(doc.template.as_str()))
            .is_some()
        {
            return Err(RegistryError::Duplicate(name.to_string()));
        }

        self.templates.push(doc.clone());
        log::info!("Registered template '{name}' from '{}'", source.display());
        Ok(doc)
    }

    /// First template matching `subject` and every supplied, non-empty
    /// filter. Returns a copy; mutating it leaves the registry untouched.
    pub fn find_by_subject(
        &self,
        subject: &str,
        doc_type: Option<&DocumentType>,
        template: Option<&str>,
    ) -> Option<Document> {
        self.position(subject, doc_type, template)
            .map(|index| self.templates[index].clone())
    }

    pub(crate) fn position(
        &self,
        subject: &str,
        doc_type: Option<&DocumentType>,
        template: Option<&str>,
    ) -> Option<usize> {
        let doc_type = doc_type.filter(|t| !t.is_unspecified());
        let template = template.filter(|t| !t.is_empty());

        self.templates.iter().position(|doc| {
            doc.subject == subject
                && doc_type.map_or(true, |t| doc.doc_type == *t)
                && template.map_or(true, |t| doc.template == t)
        })
    }

    pub(crate) fn push(&mut self, doc: Document) {
        self.templates.push(doc);
    }

    pub(crate) fn replace(&mut self, index: usize, doc: Document) {
        self.templates[index] = doc;
    }

    /// Template `name` (looked up as subject `name`, type HTML, template
    /// `name`) with its body loaded.
    ///
    /// An empty body is read from the template's file as UTF-8. The loaded
    /// body lives on the returned copy only.
    pub async fn template_body(&self, name: &str) -> Result<Document, RegistryError> {
        let mut doc = self
            .find_by_subject(name, Some(&DocumentType::Html), Some(name))
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        if doc.body.is_empty() {
            let Some(path) = doc.filename.as_deref() else {
                return Err(RegistryError::Unloadable(name.to_string()));
            };
            doc.body = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| RegistryError::Io {
                    name: name.to_string(),
                    source,
                })?;
            log::debug!("Loaded template '{name}' from '{}'", path.display());
        }
        Ok(doc)
    }
}
