use crate::models::Site;
use crate::scrapers::traits::{is_branding, SiteScraper};
use crate::scrapers::types::SearchParams;

/// Mamikos, the primary kos aggregator
pub struct MamikosScraper;

impl SiteScraper for MamikosScraper {
    fn site(&self) -> Site {
        Site::Mamikos
    }

    fn search_url(&self, params: &SearchParams) -> String {
        format!(
            "https://mamikos.com/cari/{}/all/bulanan/0-15000000?keyword={}",
            params.location_segment(),
            params.encoded_query()
        )
    }

    fn accepts(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        (lower.contains("mamikos") || lower.contains("kost")) && !is_branding(url)
    }
}
