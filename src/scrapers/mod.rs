pub mod browser;
pub mod extract;
pub mod mamikos;
pub mod rumah123;
pub mod traits;
pub mod types;

#[cfg(test)]
pub mod fake;

pub use browser::HeadlessChromeBackend;
pub use mamikos::MamikosScraper;
pub use rumah123::Rumah123Scraper;
