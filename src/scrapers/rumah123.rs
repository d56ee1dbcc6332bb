use crate::models::Site;
use crate::scrapers::traits::{is_branding, SiteScraper};
use crate::scrapers::types::SearchParams;

/// Rumah123 rental listings, searched when Mamikos comes up short
pub struct Rumah123Scraper;

impl SiteScraper for Rumah123Scraper {
    fn site(&self) -> Site {
        Site::Rumah123
    }

    fn search_url(&self, params: &SearchParams) -> String {
        format!(
            "https://www.rumah123.com/sewa/{}/kost/?q={}",
            params.location_segment(),
            params.encoded_query()
        )
    }

    fn accepts(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        (lower.contains("rumah123") || lower.contains("property")) && !is_branding(url)
    }
}
