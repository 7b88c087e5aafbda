//! Pipeline – HTML document → temp file → rasterizer → PDF document.
//!
//! The rasterizer is an external collaborator behind the [`Rasterizer`]
//! trait. Every call is bounded by the configured timeout. Temp files are
//! named `<uuid>.html` / `<uuid>.pdf` inside the settings directory and are
//! removed (awaited) unless the caller asks to keep them.

use std::future::Future;
use std::path::{Path, PathBuf};

use url::Url;

use crate::codec;
use crate::document::{Document, DocumentPatch, DocumentType};
use crate::error::{ConversionError, RasterError};
use crate::settings::Settings;

#[cfg(feature = "chromium")]
mod chromium;
#[cfg(feature = "chromium")]
pub use chromium::ChromiumRasterizer;

/// Page setup handed to the rasterizer.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOptions {
    /// Paper format name, e.g. `A4`, `Letter`.
    pub format: String,
    pub landscape: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            format: "A4".to_string(),
            landscape: false,
        }
    }
}

impl PageOptions {
    /// Portrait paper size in inches for `format`. Unknown formats fall
    /// back to A4.
    pub fn paper_size_inches(&self) -> (f64, f64) {
        match self.format.trim().to_ascii_lowercase().as_str() {
            "letter" => (8.5, 11.0),
            "legal" => (8.5, 14.0),
            "tabloid" => (11.0, 17.0),
            "ledger" => (17.0, 11.0),
            "a0" => (33.1, 46.8),
            "a1" => (23.4, 33.1),
            "a2" => (16.54, 23.4),
            "a3" => (11.7, 16.54),
            "a4" => (8.27, 11.7),
            "a5" => (5.83, 8.27),
            "a6" => (4.13, 5.83),
            other => {
                log::warn!("Unknown paper format '{other}', using A4");
                (8.27, 11.7)
            }
        }
    }
}

/// Renders the page at `source_url` (a `file://` URL) into PDF bytes.
///
/// Implementations own the whole browser-page lifecycle of one call and
/// must release it before returning, also on failure.
pub trait Rasterizer {
    fn render_pdf(
        &self,
        source_url: &str,
        options: &PageOptions,
    ) -> impl Future<Output = Result<Vec<u8>, RasterError>> + Send;
}

/// Output of [`ConversionPipeline::render_to_pdf_bytes`].
#[derive(Debug, Clone)]
pub struct Conversion {
    pub bytes: Vec<u8>,
    /// Kept HTML temp file, `None` when the files were removed.
    pub html_path: Option<PathBuf>,
    /// Kept PDF temp file, `None` when the files were removed.
    pub pdf_path: Option<PathBuf>,
}

pub struct ConversionPipeline<R> {
    rasterizer: R,
    settings: Settings,
}

impl<R: Rasterizer> ConversionPipeline<R> {
    pub fn new(rasterizer: R, settings: &Settings) -> Self {
        Self {
            rasterizer,
            settings: settings.clone(),
        }
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// Rasterize `html` into PDF bytes via temp files.
    ///
    /// With `keep_files` both temp paths are returned; otherwise both files
    /// are deleted and the paths are `None`. On failure every temp file
    /// created so far is removed.
    pub async fn render_to_pdf_bytes(
        &self,
        html: &str,
        format: &str,
        landscape: bool,
        keep_files: bool,
    ) -> Result<Conversion, ConversionError> {
        let directory = &self.settings.directory;
        tokio::fs::create_dir_all(directory)
            .await
            .map_err(|e| ConversionError::io(directory, e))?;

        let html_path = codec::temp_path(directory, "html");
        let pdf_path = html_path.with_extension("pdf");

        let options = PageOptions {
            format: if format.is_empty() { "A4" } else { format }.to_string(),
            landscape,
        };

        match self.rasterize_via(&html_path, &pdf_path, html, &options).await {
            Ok(bytes) if keep_files => Ok(Conversion {
                bytes,
                html_path: Some(html_path),
                pdf_path: Some(pdf_path),
            }),
            Ok(bytes) => {
                remove_temp_files(&[&html_path, &pdf_path]).await;
                Ok(Conversion {
                    bytes,
                    html_path: None,
                    pdf_path: None,
                })
            }
            Err(e) => {
                log::warn!("PDF conversion failed: {e}");
                remove_temp_files(&[&html_path, &pdf_path]).await;
                Err(e)
            }
        }
    }

    async fn rasterize_via(
        &self,
        html_path: &Path,
        pdf_path: &Path,
        html: &str,
        options: &PageOptions,
    ) -> Result<Vec<u8>, ConversionError> {
        tokio::fs::write(html_path, html)
            .await
            .map_err(|e| ConversionError::io(html_path, e))?;

        let absolute = tokio::fs::canonicalize(html_path)
            .await
            .map_err(|e| ConversionError::io(html_path, e))?;
        let url = Url::from_file_path(&absolute)
            .map_err(|()| ConversionError::FileUrl(absolute.clone()))?;
        log::debug!("Rasterizing {url} ({options:?})");

        let timeout = self.settings.rasterizer_timeout();
        let bytes = tokio::time::timeout(timeout, self.rasterizer.render_pdf(url.as_str(), options))
            .await
            .map_err(|_| ConversionError::Timeout(timeout))??;
        if bytes.is_empty() {
            return Err(ConversionError::EmptyOutput);
        }

        tokio::fs::write(pdf_path, &bytes)
            .await
            .map_err(|e| ConversionError::io(pdf_path, e))?;
        Ok(bytes)
    }

    /// Convert an HTML document into a new, checked-in PDF document.
    ///
    /// The result carries the source's protocol. If the source has no body
    /// or is not HTML, the result has neither file nor payload and the
    /// rasterizer is not called. On success the HTML temp path (if kept) is
    /// written back to `html_doc.filename`.
    pub async fn convert_document(&self, html_doc: &mut Document, keep_files: bool) -> Document {
        let mut pdf = Document::new(
            DocumentPatch {
                subject: Some(html_doc.subject.clone()),
                template: Some(html_doc.template.clone()),
                task: Some("HTML_to_PDF".to_string()),
                root_of: Some(html_doc.id.clone()),
                language: Some(html_doc.language.clone()),
                status: Some(html_doc.status.clone()),
                format: Some(html_doc.format.clone()),
                landscape: Some(html_doc.landscape),
                doc_type: Some(DocumentType::Pdf),
                ..DocumentPatch::default()
            },
            &self.settings,
        );
        pdf.protocol.extend_from(&html_doc.protocol);
        pdf.protocol
            .push(format!("Start PDF conversion of '{}'", html_doc.subject));

        if html_doc.body.is_empty() {
            pdf.protocol.error("Document has no HTML body.");
            return pdf;
        }
        match html_doc.doc_type {
            DocumentType::Html => {}
            DocumentType::Pdf | DocumentType::Other(_) | DocumentType::Unspecified => {
                pdf.protocol.error("Document is not of type HTML");
                return pdf;
            }
        }

        let conversion = match self
            .render_to_pdf_bytes(&html_doc.body, &html_doc.format, html_doc.landscape, keep_files)
            .await
        {
            Ok(conversion) => conversion,
            Err(e) => {
                pdf.protocol.error(e);
                return pdf;
            }
        };

        html_doc.filename = conversion.html_path;
        pdf.base64 = codec::encode(&conversion.bytes);
        pdf.filename = conversion.pdf_path;
        pdf.protocol.push("PDF created.");
        log::info!(
            "Converted '{}' to PDF ({} bytes)",
            html_doc.subject,
            conversion.bytes.len()
        );

        pdf.check_in(keep_files, &self.settings).await;
        pdf
    }
}

async fn remove_temp_files(paths: &[&Path]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => log::debug!("Removed temp file '{}'", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Cannot remove temp file '{}': {e}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Echoes the page source back as a fake PDF.
    #[derive(Default)]
    struct EchoRasterizer {
        calls: AtomicUsize,
    }

    impl Rasterizer for EchoRasterizer {
        async fn render_pdf(
            &self,
            source_url: &str,
            options: &PageOptions,
        ) -> Result<Vec<u8>, RasterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let path = Url::parse(source_url)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .ok_or_else(|| RasterError::Navigation {
                    url: source_url.to_string(),
                    message: "not a file URL".into(),
                })?;
            let html = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| RasterError::Navigation {
                    url: source_url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(format!("%PDF-1.7 {} {} {html}", options.format, options.landscape).into_bytes())
        }
    }

    struct FailingRasterizer;

    impl Rasterizer for FailingRasterizer {
        async fn render_pdf(&self, _: &str, _: &PageOptions) -> Result<Vec<u8>, RasterError> {
            Err(RasterError::Render("printer on fire".into()))
        }
    }

    struct StalledRasterizer;

    impl Rasterizer for StalledRasterizer {
        async fn render_pdf(&self, _: &str, _: &PageOptions) -> Result<Vec<u8>, RasterError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    fn settings_in(dir: &Path) -> Settings {
        Settings {
            directory: dir.join("tmp"),
            ..Settings::default()
        }
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn paper_sizes() {
        let opts = |format: &str| PageOptions {
            format: format.into(),
            landscape: false,
        };
        assert_eq!(opts("A4").paper_size_inches(), (8.27, 11.7));
        assert_eq!(opts("letter").paper_size_inches(), (8.5, 11.0));
        assert_eq!(opts("B7").paper_size_inches(), (8.27, 11.7));
        assert_eq!(PageOptions::default().format, "A4");
    }

    #[tokio::test]
    async fn directory_with_url_metacharacters() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            directory: dir.path().join("job #1 50%?"),
            ..Settings::default()
        };
        let pipeline = ConversionPipeline::new(EchoRasterizer::default(), &settings);

        let out = pipeline
            .render_to_pdf_bytes("<p>hash</p>", "A5", false, false)
            .await
            .unwrap();

        assert_eq!(out.bytes, b"%PDF-1.7 A5 false <p>hash</p>");
        assert_eq!(file_count(&settings.directory), 0);
    }

    #[tokio::test]
    async fn bytes_without_keeping_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let pipeline = ConversionPipeline::new(EchoRasterizer::default(), &settings);

        let out = pipeline
            .render_to_pdf_bytes("<p>x</p>", "", true, false)
            .await
            .unwrap();

        assert_eq!(out.bytes, b"%PDF-1.7 A4 true <p>x</p>");
        assert!(out.html_path.is_none());
        assert!(out.pdf_path.is_none());
        assert_eq!(file_count(&settings.directory), 0);
    }

    #[tokio::test]
    async fn bytes_keeping_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let pipeline = ConversionPipeline::new(EchoRasterizer::default(), &settings);

        let out = pipeline
            .render_to_pdf_bytes("<p>kept</p>", "Letter", false, true)
            .await
            .unwrap();

        let html_path = out.html_path.unwrap();
        let pdf_path = out.pdf_path.unwrap();
        assert_eq!(html_path.extension().unwrap(), "html");
        assert_eq!(pdf_path.file_stem(), html_path.file_stem());
        assert_eq!(std::fs::read_to_string(&html_path).unwrap(), "<p>kept</p>");
        assert_eq!(std::fs::read(&pdf_path).unwrap(), out.bytes);
    }

    #[tokio::test]
    async fn rasterizer_failure_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let pipeline = ConversionPipeline::new(FailingRasterizer, &settings);

        let err = pipeline
            .render_to_pdf_bytes("<p>x</p>", "A4", false, true)
            .await
            .unwrap_err();

        assert!(matches!(err, ConversionError::Raster(RasterError::Render(_))));
        assert_eq!(file_count(&settings.directory), 0);
    }

    #[tokio::test]
    async fn stalled_rasterizer_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(dir.path());
        settings.rasterizer_timeout_secs = 1;
        let pipeline = ConversionPipeline::new(StalledRasterizer, &settings);

        let err = pipeline
            .render_to_pdf_bytes("<p>x</p>", "A4", false, false)
            .await
            .unwrap_err();

        assert!(matches!(err, ConversionError::Timeout(d) if d == Duration::from_secs(1)));
        assert_eq!(file_count(&settings.directory), 0);
    }

    fn html_document(body: &str) -> Document {
        Document::new(
            DocumentPatch {
                subject: Some("Quote".into()),
                template: Some("quote".into()),
                doc_type: Some(DocumentType::Html),
                body: Some(body.into()),
                ..DocumentPatch::default()
            },
            &Settings::default(),
        )
    }

    #[tokio::test]
    async fn convert_rejects_non_html_without_rasterizing() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ConversionPipeline::new(EchoRasterizer::default(), &settings_in(dir.path()));

        let mut source = html_document("<p>x</p>");
        source.doc_type = DocumentType::Other("TXT".into());
        let pdf = pipeline.convert_document(&mut source, false).await;

        assert!(pdf.filename.is_none());
        assert!(pdf.base64.is_empty());
        assert_eq!(pdf.protocol.last(), Some("Error: Document is not of type HTML"));
        assert_eq!(pipeline.rasterizer().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn convert_rejects_empty_body() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ConversionPipeline::new(EchoRasterizer::default(), &settings_in(dir.path()));

        let mut source = html_document("");
        let pdf = pipeline.convert_document(&mut source, false).await;

        assert!(pdf.base64.is_empty());
        assert_eq!(pdf.protocol.last(), Some("Error: Document has no HTML body."));
        assert_eq!(pipeline.rasterizer().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn convert_carries_protocol_and_checks_in() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let pipeline = ConversionPipeline::new(EchoRasterizer::default(), &settings);

        let mut source = html_document("<h1>Quote</h1>");
        source.protocol.push("Correspondence created.");
        let pdf = pipeline.convert_document(&mut source, false).await;

        assert_eq!(pdf.doc_type, DocumentType::Pdf);
        assert_eq!(pdf.task, "HTML_to_PDF");
        assert_eq!(pdf.root_of, source.id);
        assert_eq!(
            codec::decode(&pdf.base64).unwrap(),
            b"%PDF-1.7 A4 false <h1>Quote</h1>"
        );
        assert!(pdf.filename.is_none());
        assert!(source.filename.is_none());
        assert_eq!(
            pdf.protocol.entries(),
            [
                "Correspondence created.",
                "Start PDF conversion of 'Quote'",
                "PDF created."
            ]
        );
        assert_eq!(file_count(&settings.directory), 0);
    }

    #[tokio::test]
    async fn convert_keeping_files_links_both_documents() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let pipeline = ConversionPipeline::new(EchoRasterizer::default(), &settings);

        let mut source = html_document("<p>keep</p>");
        let pdf = pipeline.convert_document(&mut source, true).await;

        let html_path = source.filename.clone().unwrap();
        let pdf_path = pdf.filename.clone().unwrap();
        assert!(html_path.exists());
        assert!(pdf_path.exists());
        assert_eq!(pdf.file_extension(), ".pdf");
        assert!(!pdf.base64.is_empty());
    }

    #[tokio::test]
    async fn convert_records_rasterizer_failure() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ConversionPipeline::new(FailingRasterizer, &settings_in(dir.path()));

        let mut source = html_document("<p>x</p>");
        let pdf = pipeline.convert_document(&mut source, true).await;

        assert!(pdf.base64.is_empty());
        assert!(pdf.filename.is_none());
        assert_eq!(
            pdf.protocol.last(),
            Some("Error: PDF rendering failed: printer on fire")
        );
    }
}
