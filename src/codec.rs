//! Codec – base64 text encoding of binary payloads and the file ⇄ text
//! conversions used by check-in and check-out.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use tokio::io::{AsyncReadExt, BufReader};
use uuid::Uuid;

use crate::error::CodecError;

/// Encode raw bytes as standard, padded base64.
pub fn encode(bytes: &[u8]) -> String {
    BASE64_STD.encode(bytes)
}

/// Decode base64 text. Surrounding whitespace is ignored.
pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CodecError::EmptyPayload);
    }
    Ok(BASE64_STD.decode(text)?)
}

/// A fresh, unique file path `<directory>/<uuid>.<extension>`.
pub fn temp_path(directory: &Path, extension: &str) -> PathBuf {
    directory.join(format!(
        "{}.{}",
        Uuid::new_v4(),
        extension.trim_start_matches('.')
    ))
}

/// Read the whole file at `path` and return its base64 encoding.
pub async fn encode_file(path: &Path, buffer_size: usize) -> Result<String, CodecError> {
    let result = read_file(path, buffer_size).await.map(|bytes| encode(&bytes));
    if let Err(e) = &result {
        log::warn!("Cannot encode '{}': {e}", path.display());
    }
    result
}

async fn read_file(path: &Path, buffer_size: usize) -> Result<Vec<u8>, CodecError> {
    if path.as_os_str().is_empty() {
        return Err(CodecError::MissingPath);
    }
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| CodecError::io(path, e))?;
    let mut reader = BufReader::with_capacity(buffer_size.max(1), file);
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| CodecError::io(path, e))?;
    Ok(bytes)
}

/// Decode `text` and write the bytes to `path`.
///
/// When `path` is `None` (or empty) a unique `.pdf` file inside `directory`
/// is used. Missing parent directories are created. Returns the path that
/// was written.
pub async fn decode_to_file(
    text: &str,
    path: Option<&Path>,
    directory: &Path,
) -> Result<PathBuf, CodecError> {
    let bytes = decode(text).inspect_err(|e| log::warn!("Cannot decode payload: {e}"))?;

    let target = match path {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => temp_path(directory, "pdf"),
    };

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CodecError::io(parent, e))?;
        }
    }

    tokio::fs::write(&target, &bytes)
        .await
        .map_err(|e| CodecError::io(&target, e))?;
    log::debug!("Wrote {} bytes to '{}'", bytes.len(), target.display());
    Ok(target)
}
