//! # doc-forge – template registry and HTML → PDF correspondence
//!
//! This crate manages in-memory documents (templates, rendered HTML and
//! produced PDFs) and converts between them. The stages are:
//!
//! 1. **Register** – HTML template files are registered by name ([`registry`])
//! 2. **Render** – a template is filled with JSON data ([`renderer`])
//! 3. **Rasterize** – the HTML is printed to PDF by a headless browser ([`pipeline`])
//! 4. **Check in** – the PDF bytes are embedded as base64 ([`document`], [`codec`])
//!
//! Document operations record failures in the document's protocol instead
//! of returning errors; codec, registry and pipeline operations return
//! [`error`] types.

pub mod codec;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod renderer;
pub mod settings;
pub mod templates;

// Re-exports for convenience
pub use document::{Document, DocumentPatch, DocumentType, Protocol};
pub use pipeline::{ConversionPipeline, PageOptions, Rasterizer};
pub use registry::Registry;
pub use renderer::Renderer;
pub use settings::{Settings, SettingsPatch};
