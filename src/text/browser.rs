use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use image::RgbaImage;

use crate::foundation::core::Rgb;
use crate::foundation::error::{PosterError, PosterResult};
use crate::text::fonts::FontSource;
use crate::text::markdown;
use crate::text::{MarkdownRasterizer, RasterRequest, TextLayer};

/// Viewport height of the capture; content below this is cut off.
pub const VIEWPORT_HEIGHT: u32 = 4096;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Renders the markdown as an HTML page with a headless Chromium and crops the screenshot.
#[derive(Debug)]
pub struct BrowserRasterizer {
    executable: PathBuf,
    timeout: Duration,
    font: Option<FontSource>,
}

impl BrowserRasterizer {
    pub fn new(executable: PathBuf, timeout: Duration, font: Option<FontSource>) -> Self {
        Self {
            executable,
            timeout,
            font,
        }
    }

    fn capture(&self, html_path: &Path, shot_path: &Path, width: u32) -> PosterResult<()> {
        let mut cmd = Command::new(&self.executable);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .args([
                "--headless",
                "--disable-gpu",
                "--no-sandbox",
                "--hide-scrollbars",
                "--default-background-color=00000000",
            ])
            .arg(format!("--window-size={width},{VIEWPORT_HEIGHT}"))
            .arg(format!("--screenshot={}", shot_path.display()))
            .arg(format!("file://{}", html_path.display()));

        let child = cmd.spawn().map_err(|e| {
            PosterError::rasterization(format!(
                "failed to launch browser '{}': {e}",
                self.executable.display()
            ))
        })?;
        let mut guard = ChildGuard(Some(child));
        let status = guard.wait_with_timeout(self.timeout)?;
        if !status.success() {
            return Err(PosterError::rasterization(format!(
                "browser exited with status {status}"
            )));
        }
        Ok(())
    }
}

impl MarkdownRasterizer for BrowserRasterizer {
    #[tracing::instrument(skip(self, req), fields(width = req.width))]
    fn rasterize(&self, req: &RasterRequest) -> PosterResult<TextLayer> {
        let font_url = self.font.as_ref().and_then(FontSource::file_url);
        let html = markdown::html_document(
            &req.markdown,
            req.width,
            req.text_color,
            req.background,
            font_url.as_deref(),
        );

        let dir = tempfile::tempdir()
            .map_err(|e| PosterError::io(std::env::temp_dir(), e))?;
        let html_path = dir.path().join("text.html");
        std::fs::write(&html_path, html).map_err(|e| PosterError::io(&html_path, e))?;
        let shot_path = dir.path().join("text.png");

        self.capture(&html_path, &shot_path, req.width)?;

        let shot = image::open(&shot_path)
            .map_err(|e| {
                PosterError::rasterization(format!("unreadable browser screenshot: {e}"))
            })?
            .into_rgba8();
        let image = crop_to_content(&shot, req.width)?;
        if image.height() >= VIEWPORT_HEIGHT {
            tracing::warn!("text fills the whole browser viewport, output may be cropped");
        }
        tracing::debug!(height = image.height(), "browser text layer ready");
        Ok(TextLayer { image })
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}

/// Kills and reaps the child if it is still running when dropped.
struct ChildGuard(Option<Child>);

impl ChildGuard {
    fn wait_with_timeout(&mut self, timeout: Duration) -> PosterResult<ExitStatus> {
        let deadline = Instant::now() + timeout;
        loop {
            let Some(child) = self.0.as_mut() else {
                return Err(PosterError::rasterization("browser process already reaped"));
            };
            match child.try_wait() {
                Ok(Some(status)) => {
                    self.0 = None;
                    return Ok(status);
                }
                Ok(None) if Instant::now() >= deadline => {
                    self.kill();
                    return Err(PosterError::rasterization(format!(
                        "browser timed out after {} ms",
                        timeout.as_millis()
                    )));
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(PosterError::rasterization(format!(
                        "failed to poll browser process: {e}"
                    )));
                }
            }
        }
    }

    fn kill(&mut self) {
        if let Some(mut child) = self.0.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Keep rows down to the last one with any coverage and premultiply.
fn crop_to_content(shot: &RgbaImage, width: u32) -> PosterResult<RgbaImage> {
    if shot.width() < width {
        return Err(PosterError::rasterization(format!(
            "browser screenshot is {} px wide, expected {width}",
            shot.width()
        )));
    }
    let natural_height = (0..shot.height())
        .rev()
        .find(|&y| (0..width).any(|x| shot.get_pixel(x, y).0[3] != 0))
        .map_or(0, |y| y + 1);
    if natural_height == 0 {
        return Err(PosterError::rasterization("browser screenshot is empty"));
    }

    let mut out = RgbaImage::new(width, natural_height);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let [r, g, b, a] = shot.get_pixel(x, y).0;
        px.0 = Rgb::new(r, g, b).to_premul_rgba(a);
    }
    Ok(out)
}
