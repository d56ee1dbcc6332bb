use crate::models::{slugify, Listing};
use url::form_urlencoded;

/// Search parameters for one site query
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Free-text query, usually the listing name
    pub query: String,
    /// City or area the search is scoped to
    pub location: String,
    /// Maximum number of candidates to keep from the page
    pub max_results: usize,
}

impl SearchParams {
    pub fn for_listing(listing: &Listing, max_results: usize) -> Self {
        Self {
            query: listing.name.clone(),
            location: listing.city.clone(),
            max_results,
        }
    }

    /// Query string, form-encoded for use in a URL
    pub fn encoded_query(&self) -> String {
        form_urlencoded::byte_serialize(self.query.trim().as_bytes()).collect()
    }

    /// Location as a URL path segment, e.g. "Kota Bandung" -> "kota-bandung"
    pub fn location_segment(&self) -> String {
        let slug = slugify(&self.location);
        form_urlencoded::byte_serialize(slug.as_bytes()).collect()
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: String::new(),
            location: "Tasikmalaya".to_string(),
            max_results: 5,
        }
    }
}
