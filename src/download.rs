use crate::config::PipelineConfig;
use anyhow::{bail, Context, Result};
use reqwest::Client;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Fetches image bytes and stores them under the public image directory
pub struct ImageDownloader {
    client: Client,
    image_dir: PathBuf,
    public_prefix: String,
}

impl ImageDownloader {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.download_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            image_dir: config.image_dir.clone(),
            public_prefix: config.public_prefix.trim_end_matches('/').to_string(),
        })
    }

    /// Download `url` into `<image_dir>/<filename>`.
    ///
    /// Returns the path relative to the public root, or `None` when the fetch
    /// or the write fails.
    pub async fn download_image(&self, url: &str, filename: &str) -> Option<String> {
        match self.try_download(url, filename).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(url, filename, error = %format!("{:#}", e), "Image download failed");
                None
            }
        }
    }

    async fn try_download(&self, url: &str, filename: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            bail!("Image host returned status: {}", response.status());
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read image body")?;

        tokio::fs::create_dir_all(&self.image_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.image_dir.display()))?;

        let target = self.image_dir.join(filename);
        tokio::fs::write(&target, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;

        debug!(path = %target.display(), bytes = bytes.len(), "Saved image");
        Ok(format!("{}/{}", self.public_prefix, filename))
    }
}
