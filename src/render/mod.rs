use crate::model::{ContentSelection, RenderedImages};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use uuid::Uuid;

pub mod theme;

/// Renders the three themed cards for one rotation. Implementations must
/// release whatever engine resources they hold on every exit path.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, selection: &ContentSelection) -> Result<RenderedImages>;
}

/// Ensure the configured browser binary is available by invoking `--version`.
pub async fn ensure_browser_available(browser_bin: &str) -> Result<()> {
    let status = Command::new(browser_bin)
        .arg("--version")
        .kill_on_drop(true)
        .status()
        .await;
    match status {
        Ok(s) if s.success() => Ok(()),
        Ok(s) => Err(anyhow!("{} not available (exit status {})", browser_bin, s)),
        Err(e) => Err(anyhow!("{} not available: {}", browser_bin, e)),
    }
}

/// Real renderer: writes each card's HTML to a scratch file and screenshots
/// it with a short-lived headless browser process. The process is reaped by
/// exit or `kill_on_drop`, and scratch files are deleted on every exit path.
pub struct BrowserRenderer {
    browser_bin: String,
    scratch_dir: PathBuf,
}

impl BrowserRenderer {
    pub fn new(browser_bin: &str, data_dir: &str) -> Self {
        Self {
            browser_bin: browser_bin.to_string(),
            scratch_dir: Path::new(data_dir).join("render"),
        }
    }

    async fn screenshot(&self, html_path: &Path, png_path: &Path) -> Result<()> {
        let html_abs = tokio::fs::canonicalize(html_path)
            .await
            .with_context(|| format!("failed to resolve {}", html_path.display()))?;
        let status = Command::new(&self.browser_bin)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--hide-scrollbars")
            .arg(format!(
                "--window-size={},{}",
                theme::CARD_SIZE,
                theme::CARD_SIZE
            ))
            .arg(format!("--screenshot={}", png_path.display()))
            .arg(format!("file://{}", html_abs.display()))
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("failed to spawn {}", self.browser_bin))?;
        if !status.success() {
            return Err(anyhow!(
                "{} exited with status {} for {}",
                self.browser_bin,
                status,
                html_path.display()
            ));
        }
        Ok(())
    }

    async fn render_card(&self, html: &str) -> Result<Vec<u8>> {
        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .with_context(|| {
                format!(
                    "failed to create scratch dir: {}",
                    self.scratch_dir.display()
                )
            })?;
        let stem = Uuid::new_v4();
        let html_path = self.scratch_dir.join(format!("{}.html", stem));
        let png_path = self.scratch_dir.join(format!("{}.png", stem));

        tokio::fs::write(&html_path, html)
            .await
            .with_context(|| format!("failed to write {}", html_path.display()))?;

        let bytes = match self.screenshot(&html_path, &png_path).await {
            Ok(()) => tokio::fs::read(&png_path)
                .await
                .with_context(|| format!("failed to read {}", png_path.display())),
            Err(e) => Err(e),
        };

        // Scratch files go away whether the screenshot worked or not.
        let _ = tokio::fs::remove_file(&html_path).await;
        let _ = tokio::fs::remove_file(&png_path).await;

        bytes
    }
}

#[async_trait]
impl Renderer for BrowserRenderer {
    async fn render(&self, selection: &ContentSelection) -> Result<RenderedImages> {
        let quote_card = self
            .render_card(&theme::quote_card_html(&selection.quote))
            .await
            .context("failed to render quote card")?;
        let value_name_card = self
            .render_card(&theme::value_name_card_html(&selection.value))
            .await
            .context("failed to render value name card")?;
        let value_description_card = self
            .render_card(&theme::value_description_card_html(&selection.value))
            .await
            .context("failed to render value description card")?;
        Ok(RenderedImages {
            quote_card,
            value_name_card,
            value_description_card,
        })
    }
}
