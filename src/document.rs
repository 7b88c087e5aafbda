//! Document – the single record type for templates, rendered HTML and
//! produced PDFs.
//!
//! A document carries its payload either as text (`body`), as an embedded
//! base64 string (`base64`), as a file on disk (`filename`), or as both of
//! the latter. [`Document::check_in`] moves a file into the embedded payload,
//! [`Document::check_out`] materialises the payload as a file again.
//!
//! Failures of document operations never propagate: they are appended to the
//! document's [`Protocol`] as `Error: <message>` and the operation reports
//! `false`.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::codec;
use crate::error::RegistryError;
use crate::registry::Registry;
use crate::settings::Settings;

// ---------------------------------------------------------------------------
// Document type
// ---------------------------------------------------------------------------

/// Content kind of a document. Tags are always stored uppercase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentType {
    /// No explicit type and no file extension to derive one from.
    #[default]
    Unspecified,
    Html,
    Pdf,
    /// Any other kind, e.g. `TXT` or `PNG`.
    Other(String),
}

impl DocumentType {
    /// Parse a type tag or a file extension (`"pdf"`, `".Html"`, `"TXT"`).
    pub fn parse(tag: &str) -> Self {
        let tag = tag.trim().replace('.', "").to_uppercase();
        match tag.as_str() {
            "" => Self::Unspecified,
            "HTML" => Self::Html,
            "PDF" => Self::Pdf,
            _ => Self::Other(tag),
        }
    }

    /// Type implied by the extension of `path`.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::parse)
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Unspecified => "",
            Self::Html => "HTML",
            Self::Pdf => "PDF",
            Self::Other(tag) => tag,
        }
    }

    pub fn is_unspecified(&self) -> bool {
        matches!(self, Self::Unspecified)
    }

    /// Lowercase file extension for this type, if any.
    pub fn extension(&self) -> Option<String> {
        match self {
            Self::Unspecified => None,
            other => Some(other.as_str().to_lowercase()),
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for DocumentType {
    fn from(tag: &str) -> Self {
        Self::parse(tag)
    }
}

impl From<String> for DocumentType {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl From<DocumentType> for String {
    fn from(t: DocumentType) -> Self {
        t.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

/// Append-only, ordered log of human-readable events and errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Protocol(Vec<String>);

impl Protocol {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.0.push(entry.into());
    }

    /// Record a failure as `Error: <message>`.
    pub fn error(&mut self, err: impl fmt::Display) {
        self.0.push(format!("Error: {err}"));
    }

    /// Append every entry of `other`, in order.
    pub fn extend_from(&mut self, other: &Protocol) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Whether any entry equals `entry` exactly.
    pub fn contains(&self, entry: &str) -> bool {
        self.0.iter().any(|e| e == entry)
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .map(String::as_str)
            .filter(|e| e.starts_with("Error"))
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}

impl<'a> IntoIterator for &'a Protocol {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Where a document's binary payload currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadState {
    Empty,
    InMemory,
    OnDisk,
    Both,
}

/// Missing fields take the values of [`Document::default`] when
/// deserialised, so partial JSON objects are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub id: String,
    pub date: DateTime<Utc>,
    /// Human label, primary lookup key in the registry.
    pub subject: String,
    pub status: String,
    /// Provenance label, e.g. `Create_Correspondence`.
    pub task: String,
    pub in_use: String,
    /// Path of the on-disk representation, if one is materialised.
    #[serde(deserialize_with = "non_empty_path")]
    pub filename: Option<PathBuf>,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    /// Id of the document this one was derived from.
    pub root_of: String,
    /// Name under which the document is registered as a template.
    pub template: String,
    /// Input used to fill a template.
    pub data: Value,
    pub info: Map<String, Value>,
    pub metadata: Map<String, Value>,
    pub category: Vec<String>,
    pub input_path: String,
    pub language: String,
    pub num_pages: u32,
    /// Page size name, e.g. `A4` or `Letter`.
    pub format: String,
    pub landscape: bool,
    /// Text payload (HTML source).
    pub body: String,
    /// Embedded binary payload.
    pub base64: String,
    pub protocol: Protocol,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DocumentPatch::default(), &Settings::default())
    }
}

/// `""` and `null` both mean "no file".
fn non_empty_path<'de, D: Deserializer<'de>>(de: D) -> Result<Option<PathBuf>, D::Error> {
    let path = Option::<PathBuf>::deserialize(de)?;
    Ok(path.filter(|p| !p.as_os_str().is_empty()))
}

/// Partial document update. Every `Some` field overwrites the current value,
/// including empty strings and `false`; `None` keeps it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentPatch {
    pub id: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub subject: Option<String>,
    pub status: Option<String>,
    pub task: Option<String>,
    pub in_use: Option<String>,
    pub filename: Option<PathBuf>,
    pub doc_type: Option<DocumentType>,
    pub root_of: Option<String>,
    pub template: Option<String>,
    pub data: Option<Value>,
    pub info: Option<Map<String, Value>>,
    pub metadata: Option<Map<String, Value>>,
    pub category: Option<Vec<String>>,
    pub input_path: Option<String>,
    pub language: Option<String>,
    pub num_pages: Option<u32>,
    pub format: Option<String>,
    pub landscape: Option<bool>,
    pub body: Option<String>,
    pub base64: Option<String>,
}

impl Document {
    /// Create a document from `patch`, filling unset fields with defaults
    /// taken from `settings`.
    ///
    /// Without an explicit type, the type is derived from the extension of
    /// `filename`.
    pub fn new(patch: DocumentPatch, settings: &Settings) -> Self {
        let mut doc = Self {
            id: Uuid::new_v4().to_string(),
            date: Utc::now(),
            subject: String::new(),
            status: settings.initial_status(),
            task: "create".to_string(),
            in_use: "completed".to_string(),
            filename: None,
            doc_type: DocumentType::Unspecified,
            root_of: String::new(),
            template: String::new(),
            data: Value::Object(Map::new()),
            info: Map::new(),
            metadata: Map::new(),
            category: Vec::new(),
            input_path: String::new(),
            language: settings.default_language.clone(),
            num_pages: 0,
            format: "A4".to_string(),
            landscape: false,
            body: String::new(),
            base64: String::new(),
            protocol: Protocol::new(),
        };
        doc.apply(patch);
        doc
    }

    /// Merge `patch` into this document.
    pub fn apply(&mut self, patch: DocumentPatch) {
        let DocumentPatch {
            id,
            date,
            subject,
            status,
            task,
            in_use,
            filename,
            doc_type,
            root_of,
            template,
            data,
            info,
            metadata,
            category,
            input_path,
            language,
            num_pages,
            format,
            landscape,
            body,
            base64,
        } = patch;

        if let Some(v) = id {
            self.id = v;
        }
        if let Some(v) = date {
            self.date = v;
        }
        if let Some(v) = subject {
            self.subject = v;
        }
        if let Some(v) = status {
            self.status = v;
        }
        if let Some(v) = task {
            self.task = v;
        }
        if let Some(v) = in_use {
            self.in_use = v;
        }
        if let Some(v) = doc_type {
            self.doc_type = v;
        }
        if let Some(v) = root_of {
            self.root_of = v;
        }
        if let Some(v) = template {
            self.template = v;
        }
        if let Some(v) = data {
            self.data = v;
        }
        if let Some(v) = info {
            self.info = v;
        }
        if let Some(v) = metadata {
            self.metadata = v;
        }
        if let Some(v) = category {
            self.category = v;
        }
        if let Some(v) = input_path {
            self.input_path = v;
        }
        if let Some(v) = language {
            self.language = v;
        }
        if let Some(v) = num_pages {
            self.num_pages = v;
        }
        if let Some(v) = format {
            self.format = v;
        }
        if let Some(v) = landscape {
            self.landscape = v;
        }
        if let Some(v) = body {
            self.body = v;
        }
        if let Some(v) = base64 {
            self.base64 = v;
        }
        if let Some(path) = filename {
            self.filename = (!path.as_os_str().is_empty()).then_some(path);
        }
        self.derive_type();
    }

    fn derive_type(&mut self) {
        if self.doc_type.is_unspecified() {
            if let Some(path) = &self.filename {
                self.doc_type = DocumentType::from_path(path);
            }
        }
    }

    /// Lowercased extension of `filename` including the dot, or `""`.
    pub fn file_extension(&self) -> String {
        self.filename
            .as_deref()
            .and_then(Path::extension)
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_lowercase()))
            .unwrap_or_default()
    }

    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// A document is usable as a template iff it is named and of type HTML.
    pub fn is_template(&self) -> bool {
        !self.template.is_empty() && self.doc_type == DocumentType::Html
    }

    pub fn payload_state(&self) -> PayloadState {
        match (!self.base64.is_empty(), self.is_file()) {
            (false, false) => PayloadState::Empty,
            (true, false) => PayloadState::InMemory,
            (false, true) => PayloadState::OnDisk,
            (true, true) => PayloadState::Both,
        }
    }

    /// Move the on-disk payload into `base64`.
    ///
    /// If `base64` is already set it is kept as is. Unless `keep_file` is
    /// set, the file is then deleted and `filename` cleared.
    pub async fn check_in(&mut self, keep_file: bool, settings: &Settings) -> bool {
        if self.doc_type.is_unspecified() {
            self.record_failure("Type of document not defined.");
            return false;
        }

        if self.base64.is_empty() {
            let Some(path) = self.filename.clone() else {
                self.record_failure("CheckIn requires either base64 or a file (filename).");
                return false;
            };
            match codec::encode_file(&path, settings.buffer_size).await {
                Ok(text) => self.base64 = text,
                Err(e) => {
                    self.record_failure(e);
                    return false;
                }
            }
        }

        if !keep_file {
            if let Some(path) = &self.filename {
                match tokio::fs::remove_file(path).await {
                    Ok(()) => log::debug!("Removed checked-in file '{}'", path.display()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        log::warn!("Cannot remove '{}': {e}", path.display());
                        let entry = format!("Warning: file '{}' not removed: {e}", path.display());
                        self.protocol.push(entry);
                        return true;
                    }
                }
                self.filename = None;
            }
        }
        true
    }

    /// Write the embedded payload to `filename`, or to a new file in the
    /// configured directory when no filename is set.
    pub async fn check_out(&mut self, settings: &Settings) -> bool {
        let target = match &self.filename {
            Some(path) => path.clone(),
            None => {
                let ext = self.doc_type.extension().unwrap_or_else(|| "pdf".to_string());
                codec::temp_path(&settings.directory, &ext)
            }
        };

        match codec::decode_to_file(&self.base64, Some(&target), &settings.directory).await {
            Ok(path) => {
                self.filename = Some(path);
                true
            }
            Err(e) => {
                self.record_failure(e);
                false
            }
        }
    }

    /// Store this document in `registry` as a template.
    ///
    /// An existing template with the same subject, type and name is replaced
    /// only if `allow_overwrite` is set.
    pub fn register_as_template(&mut self, registry: &mut Registry, allow_overwrite: bool) -> bool {
        if let Err(reason) = self.template_precondition() {
            self.record_failure(reason);
            return false;
        }

        match registry.position(&self.subject, Some(&self.doc_type), Some(self.template.as_str())) {
            Some(_) if !allow_overwrite => {
                self.record_failure(RegistryError::Duplicate(self.template.clone()));
                false
            }
            Some(index) => {
                self.protocol.push("Template replaced.");
                registry.replace(index, self.clone());
                log::info!("Template '{}' replaced", self.template);
                true
            }
            None => {
                self.protocol.push("Document saved as template.");
                registry.push(self.clone());
                log::info!("Template '{}' registered", self.template);
                true
            }
        }
    }

    fn template_precondition(&self) -> Result<(), String> {
        if self.template.is_empty() {
            return Err("No template name found.".to_string());
        }
        if self.doc_type != DocumentType::Html {
            return Err(format!("Wrong type {}", self.doc_type));
        }
        if self.subject.is_empty() {
            return Err("Subject is missing.".to_string());
        }
        Ok(())
    }

    fn record_failure(&mut self, err: impl fmt::Display) {
        log::warn!("Document {}: {err}", self.id);
        self.protocol.error(err);
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let mut doc: Self = serde_json::from_str(json).map_err(|e| e.to_string())?;
        doc.derive_type();
        Ok(doc)
    }
}
