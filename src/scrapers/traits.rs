use crate::models::{CandidateImage, Site};
use crate::scrapers::extract::image_sources;
use crate::scrapers::types::SearchParams;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Browser automation engine able to start a session
#[async_trait]
pub trait BrowserBackend: Send + Sync {
    /// Launch a new browser session
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// A running browser, shared by every site query of a batch
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Open a fresh page context (tab)
    async fn new_page(&self) -> Result<Box<dyn PageContext>>;

    /// Release the browser
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A single page context used for one site query
#[async_trait]
pub trait PageContext: Send {
    async fn set_user_agent(&mut self, user_agent: &str) -> Result<()>;

    /// Navigate and wait for the load to finish, bounded by `timeout`
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Wait until an element matching `selector` exists
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// Rendered HTML of the current document
    async fn content(&mut self) -> Result<String>;

    async fn close(self: Box<Self>) -> Result<()>;
}

/// Common trait for all listing sites searched for images
/// New sources only need a search URL and an acceptance heuristic
pub trait SiteScraper: Send + Sync {
    fn site(&self) -> Site;

    /// Search page URL for the query, scoped by location
    fn search_url(&self, params: &SearchParams) -> String;

    /// Whether an image URL looks like listing content for this site
    fn accepts(&self, url: &str) -> bool;

    /// Pick the accepted images out of a rendered search page served from `page_url`
    fn extract(&self, html: &str, page_url: &str, max_results: usize) -> Vec<CandidateImage> {
        image_sources(html, page_url)
            .into_iter()
            .filter(|source| self.accepts(&source.url))
            .take(max_results)
            .map(|source| CandidateImage {
                url: source.url,
                alt_text: source.alt,
                source_site: self.site(),
            })
            .collect()
    }
}

/// Lowercase substring check shared by the site heuristics
pub(crate) fn is_branding(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.contains("logo") || lower.contains("icon")
}
