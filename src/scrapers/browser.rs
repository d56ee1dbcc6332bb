use crate::config::PipelineConfig;
use crate::scrapers::traits::{BrowserBackend, BrowserSession, PageContext};
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tracing::{debug, info};

/// Browser backend driving a local Chrome through headless_chrome.
///
/// headless_chrome is blocking, so every call hops onto tokio's blocking pool.
pub struct HeadlessChromeBackend {
    headless: bool,
    idle_timeout: Duration,
}

impl HeadlessChromeBackend {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            headless: config.headless,
            idle_timeout: config.session_idle_timeout(),
        }
    }

    fn launch_options(&self) -> Result<LaunchOptions<'static>> {
        LaunchOptions::default_builder()
            .headless(self.headless)
            .idle_browser_timeout(self.idle_timeout)
            .build()
            .context("Failed to build launch options")
    }
}

#[async_trait]
impl BrowserBackend for HeadlessChromeBackend {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        info!(
            headless = self.headless,
            idle_timeout_secs = self.idle_timeout.as_secs(),
            "Launching Chrome..."
        );

        let options = self.launch_options()?;

        let browser = task::spawn_blocking(move || Browser::new(options))
            .await
            .context("Chrome launch task failed")?
            .context("Failed to launch Chrome browser")?;

        Ok(Box::new(ChromeSession {
            browser: Arc::new(browser),
        }))
    }
}

struct ChromeSession {
    browser: Arc<Browser>,
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn new_page(&self) -> Result<Box<dyn PageContext>> {
        let browser = Arc::clone(&self.browser);
        let tab = task::spawn_blocking(move || browser.new_tab())
            .await
            .context("New tab task failed")?
            .context("Failed to open tab")?;

        Ok(Box::new(ChromePage { tab }))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        // Chrome is killed once the last handle to the browser is dropped
        let browser = self.browser;
        task::spawn_blocking(move || drop(browser))
            .await
            .context("Chrome shutdown task failed")?;
        debug!("Chrome process released");
        Ok(())
    }
}

struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        task::spawn_blocking(move || op(&*tab))
            .await
            .context("Browser task failed")?
    }
}

#[async_trait]
impl PageContext for ChromePage {
    async fn set_user_agent(&mut self, user_agent: &str) -> Result<()> {
        let user_agent = user_agent.to_string();
        self.blocking(move |tab| {
            tab.set_user_agent(&user_agent, Some("id-ID,id;q=0.9,en;q=0.8"), None)
                .context("Failed to set user agent")
        })
        .await
    }

    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let url = url.to_string();
        self.blocking(move |tab| {
            tab.set_default_timeout(timeout);
            tab.navigate_to(&url)
                .with_context(|| format!("Failed to navigate to {}", url))?;
            tab.wait_until_navigated()
                .with_context(|| format!("Timed out loading {}", url))?;
            Ok(())
        })
        .await
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        let selector = selector.to_string();
        self.blocking(move |tab| {
            tab.wait_for_element_with_custom_timeout(&selector, timeout)
                .with_context(|| format!("No element matched '{}' within {:?}", selector, timeout))?;
            Ok(())
        })
        .await
    }

    async fn content(&mut self) -> Result<String> {
        self.blocking(|tab| tab.get_content().context("Failed to read page HTML"))
            .await
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.blocking(|tab| {
            tab.close(true).context("Failed to close tab")?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options_carry_session_idle_timeout() {
        let config = PipelineConfig {
            download_timeout: Duration::from_secs(20),
            browser_idle_timeout: Duration::from_secs(30),
            headless: false,
            ..PipelineConfig::default()
        };

        let options = HeadlessChromeBackend::from_config(&config).launch_options().unwrap();
        assert_eq!(options.idle_browser_timeout, Duration::from_secs(132));
        assert!(!options.headless);
    }

    #[test]
    fn test_default_idle_timeout_outlasts_default_thirty_seconds() {
        let options = HeadlessChromeBackend::from_config(&PipelineConfig::default())
            .launch_options()
            .unwrap();
        assert!(options.idle_browser_timeout > Duration::from_secs(30));
    }
}
