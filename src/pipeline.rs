use crate::config::PipelineConfig;
use crate::download::ImageDownloader;
use crate::models::{slugify, CandidateImage, Listing, ListingImages};
use crate::scrapers::traits::{BrowserBackend, BrowserSession, PageContext, SiteScraper};
use crate::scrapers::types::SearchParams;
use crate::scrapers::{MamikosScraper, Rumah123Scraper};
use crate::throttle::{FixedDelay, Throttle};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Turns listing identities into locally stored image paths.
///
/// The browser session is owned here and must be opened with
/// [`initialize`](Self::initialize) before any site can be searched. Every
/// failure below session start degrades to an empty or partial result.
pub struct ImagePipeline {
    backend: Box<dyn BrowserBackend>,
    session: Option<Box<dyn BrowserSession>>,
    /// Queried in order; earlier sites have priority
    scrapers: Vec<Box<dyn SiteScraper>>,
    downloader: ImageDownloader,
    throttle: Box<dyn Throttle>,
    config: PipelineConfig,
}

impl ImagePipeline {
    /// Pipeline over Mamikos then Rumah123, paced by the configured delay
    pub fn new(backend: Box<dyn BrowserBackend>, config: PipelineConfig) -> Result<Self> {
        let downloader = ImageDownloader::new(&config)?;
        Ok(Self {
            backend,
            session: None,
            scrapers: vec![Box::new(MamikosScraper), Box::new(Rumah123Scraper)],
            downloader,
            throttle: Box::new(FixedDelay::new(config.batch_delay)),
            config,
        })
    }

    pub fn with_throttle(mut self, throttle: impl Throttle + 'static) -> Self {
        self.throttle = Box::new(throttle);
        self
    }

    #[cfg(test)]
    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Start the browser session. No-op when one is already running.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.session.is_some() {
            debug!("Browser session already running");
            return Ok(());
        }

        let session = self
            .backend
            .launch()
            .await
            .context("Failed to start browser session")?;
        self.session = Some(session);
        info!("🌐 Browser session ready");
        Ok(())
    }

    /// Release the browser session, if any
    pub async fn shutdown(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        match session.close().await {
            Ok(()) => info!("Browser session closed"),
            Err(e) => warn!(error = %e, "Failed to close browser session cleanly"),
        }
    }

    /// Query one site for listing photos.
    ///
    /// Navigation, timeout and extraction failures are logged and yield an
    /// empty list. The page is closed on every path.
    pub async fn search_site(&self, scraper: &dyn SiteScraper, params: &SearchParams) -> Vec<CandidateImage> {
        let site = scraper.site();
        let Some(session) = self.session.as_ref() else {
            warn!(%site, "Browser session not initialized, skipping search");
            return Vec::new();
        };

        let mut page = match session.new_page().await {
            Ok(page) => page,
            Err(e) => {
                warn!(%site, error = %e, "Failed to open page");
                return Vec::new();
            }
        };

        let outcome = self.run_search(page.as_mut(), scraper, params).await;

        if let Err(e) = page.close().await {
            debug!(%site, error = %e, "Failed to close page");
        }

        match outcome {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(%site, query = %params.query, error = %format!("{:#}", e), "Site search failed");
                Vec::new()
            }
        }
    }

    async fn run_search(
        &self,
        page: &mut dyn PageContext,
        scraper: &dyn SiteScraper,
        params: &SearchParams,
    ) -> Result<Vec<CandidateImage>> {
        let url = scraper.search_url(params);
        debug!("Fetching URL: {}", url);

        page.set_user_agent(&self.config.user_agent).await?;
        page.navigate(&url, self.config.navigation_timeout).await?;
        page.wait_for_selector("img", self.config.selector_timeout).await?;
        let html = page.content().await?;

        if let Some(dir) = &self.config.debug_dir {
            let file = dir.join(format!(
                "{}-{}-{}.html",
                scraper.site().to_string().to_lowercase(),
                slugify(&params.query),
                params.location_segment()
            ));
            save_debug_page(dir, &file, &html).await;
        }

        let candidates = scraper.extract(&html, &url, params.max_results);
        debug!(site = %scraper.site(), found = candidates.len(), "Extracted candidates");
        Ok(candidates)
    }

    /// Collect up to `max_candidates` unique, downloadable image URLs.
    ///
    /// Sites are queried in priority order until `early_stop_threshold`
    /// usable candidates have accumulated.
    pub async fn aggregate_for_listing(&self, listing: &Listing) -> Vec<CandidateImage> {
        let params = SearchParams::for_listing(listing, self.config.per_site_max_results);
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for scraper in &self.scrapers {
            let found = self.search_site(scraper.as_ref(), &params).await;
            info!(site = %scraper.site(), listing = %listing.name, found = found.len(), "Site query finished");

            for candidate in found {
                if is_downloadable(&candidate.url) && seen.insert(candidate.url.clone()) {
                    candidates.push(candidate);
                }
            }

            if candidates.len() >= self.config.early_stop_threshold {
                debug!(site = %scraper.site(), "Enough candidates, skipping remaining sites");
                break;
            }
        }

        candidates.truncate(self.config.max_candidates);
        candidates
    }

    /// Download one image; `None` on any failure
    pub async fn download_image(&self, url: &str, filename: &str) -> Option<String> {
        self.downloader.download_image(url, filename).await
    }

    /// Find and download images for a listing. Never fails; problems shrink
    /// the returned list instead.
    pub async fn acquire_for_listing(&self, listing: &Listing) -> Vec<String> {
        match self.try_acquire(listing).await {
            Ok(paths) => paths,
            Err(e) => {
                warn!(listing = %listing.name, error = %format!("{:#}", e), "Image acquisition failed");
                Vec::new()
            }
        }
    }

    async fn try_acquire(&self, listing: &Listing) -> Result<Vec<String>> {
        let slug = listing.slug();
        if slug.is_empty() {
            bail!("Listing name {:?} yields an empty filename slug", listing.name);
        }
        if slug.contains(|c: char| c == '/' || c == '\\') || slug.contains("..") {
            bail!("Listing name {:?} is not safe to use as a filename", listing.name);
        }

        let candidates = self.aggregate_for_listing(listing).await;
        if candidates.is_empty() {
            info!("No images found for {} ({})", listing.name, listing.city);
            return Ok(Vec::new());
        }

        let mut stored = Vec::with_capacity(candidates.len());
        for (idx, candidate) in candidates.iter().take(self.config.max_candidates).enumerate() {
            let filename = format!("{}-{}.{}", slug, idx + 1, self.config.image_extension);
            if let Some(path) = self.download_image(&candidate.url, &filename).await {
                stored.push(path);
            }
        }

        info!(
            "📸 Stored {}/{} images for {}",
            stored.len(),
            candidates.len(),
            listing.name
        );
        Ok(stored)
    }

    /// Process listings one at a time on a single browser session.
    ///
    /// Only a failure to start the session is returned; a listing that fails
    /// maps to an empty image list. The session is shut down once at the end.
    pub async fn acquire_for_listings(&mut self, listings: &[Listing]) -> Result<Vec<ListingImages>> {
        self.initialize().await?;

        let mut results = Vec::with_capacity(listings.len());
        for (idx, listing) in listings.iter().enumerate() {
            if idx > 0 {
                self.throttle.pause().await;
            }

            info!("[{}/{}] {} ({})", idx + 1, listings.len(), listing.name, listing.city);
            let images = match self.try_acquire(listing).await {
                Ok(images) => images,
                Err(e) => {
                    warn!(listing = %listing.name, error = %format!("{:#}", e), "Skipping listing");
                    Vec::new()
                }
            };

            results.push(ListingImages {
                name: listing.name.clone(),
                city: listing.city.clone(),
                images,
                acquired_at: Utc::now(),
            });
        }

        self.shutdown().await;
        Ok(results)
    }
}

fn is_downloadable(url: &str) -> bool {
    (url.starts_with("http://") || url.starts_with("https://")) && !url.contains("data:")
}

async fn save_debug_page(dir: &std::path::Path, file: &std::path::Path, html: &str) {
    let saved = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(file, html).await
    }
    .await;

    match saved {
        Ok(()) => info!("Saved page HTML to {} ({} bytes)", file.display(), html.len()),
        Err(e) => warn!(path = %file.display(), error = %e, "Failed to save debug HTML"),
    }
}
