//! Browser automation driver seam
//!
//! The capture pipeline talks to the browser through these traits so the
//! production Chromium driver and the test stubs are interchangeable. One
//! [`BrowserSession`] is one exclusively-owned browser process; it is never
//! shared between captures.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::CaptureError;
use crate::payload::{ColorScheme, Viewport};

/// Options for launching a browser process.
///
/// Built by the orchestrator (`headless` is always true there) and handed
/// to the `prepare_browser` hook for mutation before the process starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchOptions {
    pub headless: bool,
    pub args: Vec<String>,
    pub executable: Option<String>,
}

/// Per-session page environment, applied before any hook runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextOptions {
    pub user_agent: Option<String>,
    pub viewport: Option<Viewport>,
    pub color_scheme: Option<ColorScheme>,
}

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Launch a browser process and hand back its session.
    async fn launch(
        &self,
        options: &LaunchOptions,
    ) -> Result<Box<dyn BrowserSession>, CaptureError>;
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Open a page with the given environment applied.
    async fn new_page(&self, options: &ContextOptions) -> Result<Box<dyn PageHandle>, CaptureError>;

    /// Terminate the browser process. Runs exactly once per session.
    async fn close(&mut self) -> Result<(), CaptureError>;
}

#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Navigate and wait for the load event, bounded by `timeout`.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), CaptureError>;

    /// Wait until an element matching `selector` exists, bounded by `timeout`.
    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), CaptureError>;

    /// Capture a PNG screenshot scoped to the element matching `selector`.
    async fn screenshot_element(&self, selector: &str) -> Result<Vec<u8>, CaptureError>;

    /// Evaluate a JavaScript expression on the page.
    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value, CaptureError>;
}
