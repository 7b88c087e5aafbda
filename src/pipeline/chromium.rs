//! Headless Chromium rasterizer built on `chromiumoxide`.
//!
//! Each call launches its own browser, opens one page, prints it and shuts
//! the browser down again, whether printing succeeded or not.

use std::path::PathBuf;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::{PageOptions, Rasterizer};
use crate::error::RasterError;

#[derive(Debug, Clone, Default)]
pub struct ChromiumRasterizer {
    executable: Option<PathBuf>,
    no_sandbox: bool,
}

impl ChromiumRasterizer {
    /// Use the auto-detected Chrome/Chromium installation.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Disable the Chromium sandbox (required when running as root in
    /// containers).
    pub fn without_sandbox(mut self) -> Self {
        self.no_sandbox = true;
        self
    }

    fn config(&self) -> Result<BrowserConfig, RasterError> {
        let mut builder = BrowserConfig::builder();
        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }
        if self.no_sandbox {
            builder = builder.no_sandbox();
        }
        builder.build().map_err(RasterError::Launch)
    }
}

impl Rasterizer for ChromiumRasterizer {
    async fn render_pdf(
        &self,
        source_url: &str,
        options: &PageOptions,
    ) -> Result<Vec<u8>, RasterError> {
        let (mut browser, mut handler) = Browser::launch(self.config()?)
            .await
            .map_err(|e| RasterError::Launch(e.to_string()))?;

        let _events = HandlerTask(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::debug!("Browser handler stopped: {e:?}");
                    break;
                }
            }
        }));

        let result = print_page(&browser, source_url, options).await;

        if let Err(e) = browser.close().await {
            log::warn!("Browser close failed: {e}");
        }
        if let Err(e) = browser.wait().await {
            log::warn!("Browser did not exit cleanly: {e}");
        }

        result
    }
}

/// Aborts the CDP event loop when dropped, also when the caller's timeout
/// cancels `render_pdf` before the browser was closed. The browser process
/// itself is killed by `Browser`'s own drop in that case.
struct HandlerTask(JoinHandle<()>);

impl Drop for HandlerTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn print_page(
    browser: &Browser,
    url: &str,
    options: &PageOptions,
) -> Result<Vec<u8>, RasterError> {
    let navigation = |e: chromiumoxide::error::CdpError| RasterError::Navigation {
        url: url.to_string(),
        message: e.to_string(),
    };

    let page = browser.new_page(url).await.map_err(navigation)?;
    page.wait_for_navigation().await.map_err(navigation)?;

    let (width, height) = options.paper_size_inches();
    let params = PrintToPdfParams {
        landscape: Some(options.landscape),
        paper_width: Some(width),
        paper_height: Some(height),
        print_background: Some(true),
        ..Default::default()
    };
    let pdf = page
        .pdf(params)
        .await
        .map_err(|e| RasterError::Render(e.to_string()));

    if let Err(e) = page.close().await {
        log::debug!("Page close failed: {e}");
    }
    pdf
}
