//! In-memory browser backend for exercising the pipeline without Chrome.

use crate::scrapers::traits::{BrowserBackend, BrowserSession, PageContext};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
pub struct FakeState {
    /// (url substring, html served for matching navigations)
    routes: Vec<(String, String)>,
    /// url substrings whose navigation fails
    failing: Vec<String>,
    fail_launch: bool,
    pub launches: AtomicUsize,
    pub session_closes: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub user_agents: Mutex<Vec<String>>,
    pub navigations: Mutex<Vec<String>>,
}

impl FakeState {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn navigated(&self, needle: &str) -> bool {
        self.navigations
            .lock()
            .unwrap()
            .iter()
            .any(|url| url.contains(needle))
    }

    fn page_for(&self, url: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|(needle, _)| url.contains(needle.as_str()))
            .map(|(_, html)| html.as_str())
    }
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    pub state: Arc<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, needle: &str, html: impl Into<String>) -> Self {
        self.state_mut().routes.push((needle.to_string(), html.into()));
        self
    }

    pub fn fail_navigation(mut self, needle: &str) -> Self {
        self.state_mut().failing.push(needle.to_string());
        self
    }

    pub fn fail_launch(mut self) -> Self {
        self.state_mut().fail_launch = true;
        self
    }

    fn state_mut(&mut self) -> &mut FakeState {
        Arc::get_mut(&mut self.state).expect("configure the fake before sharing it")
    }
}

#[async_trait]
impl BrowserBackend for FakeBackend {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        if self.state.fail_launch {
            bail!("Chrome binary not found");
        }
        self.state.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSession {
    state: Arc<FakeState>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn new_page(&self) -> Result<Box<dyn PageContext>> {
        self.state.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            state: Arc::clone(&self.state),
            current: None,
        }))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.session_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakePage {
    state: Arc<FakeState>,
    current: Option<String>,
}

#[async_trait]
impl PageContext for FakePage {
    async fn set_user_agent(&mut self, user_agent: &str) -> Result<()> {
        self.state.user_agents.lock().unwrap().push(user_agent.to_string());
        Ok(())
    }

    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        self.state.navigations.lock().unwrap().push(url.to_string());
        if self.state.failing.iter().any(|needle| url.contains(needle.as_str())) {
            bail!("Timed out loading {}", url);
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, _timeout: Duration) -> Result<()> {
        let html = self.content().await?;
        if html.contains(&format!("<{}", selector)) {
            Ok(())
        } else {
            Err(anyhow!("No element matched '{}'", selector))
        }
    }

    async fn content(&mut self) -> Result<String> {
        let url = self.current.as_deref().unwrap_or("about:blank");
        Ok(self.state.page_for(url).unwrap_or("<html></html>").to_string())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
