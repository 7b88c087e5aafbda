//! Error types returned by the codec, registry and conversion pipeline.
//!
//! Document-level operations never return these directly; they record the
//! message in the document's protocol instead.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("No filename specified.")]
    MissingPath,

    #[error("Base64 data must be provided.")]
    EmptyPayload,

    #[error("Invalid base64 data: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CodecError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("The name of the template or the subject must be specified.")]
    MissingName,

    #[error("A file name must be specified.")]
    MissingSource,

    #[error("The filename must be HTML for a template: '{0}'")]
    NotHtml(PathBuf),

    #[error("There is already a template with this name {0}.")]
    Duplicate(String),

    #[error("Template {0} not found.")]
    NotFound(String),

    #[error("Template {0} cannot be loaded.")]
    Unloadable(String),

    #[error("Template {name} cannot be read: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure reported by a [`crate::pipeline::Rasterizer`] implementation.
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation to '{url}' failed: {message}")]
    Navigation { url: String, message: String },

    #[error("PDF rendering failed: {0}")]
    Render(String),
}

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error("Cannot express '{0}' as a file URL")]
    FileUrl(PathBuf),

    #[error("Rasterizer did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Rasterizer produced an empty PDF")]
    EmptyOutput,
}

impl ConversionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
