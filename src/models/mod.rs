use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Listing site an image was discovered on, in priority order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Site {
    Mamikos,
    Rumah123,
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Mamikos => write!(f, "Mamikos"),
            Site::Rumah123 => write!(f, "Rumah123"),
        }
    }
}

/// Boarding-house identity used as the query key for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub name: String,
    pub city: String,
}

impl Listing {
    pub fn new(name: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            city: city.into(),
        }
    }

    /// Lowercase name with whitespace runs collapsed into single hyphens
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

pub fn slugify(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Image URL discovered during a site query, not yet downloaded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateImage {
    pub url: String,
    pub alt_text: String,
    pub source_site: Site,
}

/// Stored image paths for one listing of a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingImages {
    pub name: String,
    pub city: String,
    pub images: Vec<String>,
    pub acquired_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_lowercases_and_hyphenates() {
        assert_eq!(Listing::new("Kost Melati", "tasikmalaya").slug(), "kost-melati");
    }

    #[test]
    fn test_slug_collapses_whitespace() {
        assert_eq!(slugify("  Kos   Putri\tAnggrek "), "kos-putri-anggrek");
    }

    #[test]
    fn test_slug_of_blank_name_is_empty() {
        assert!(slugify("   ").is_empty());
    }

    #[test]
    fn test_site_display() {
        assert_eq!(Site::Mamikos.to_string(), "Mamikos");
        assert_eq!(Site::Rumah123.to_string(), "Rumah123");
    }
}
