//! Chromium implementation of the browser driver seam
//!
//! Wraps chromiumoxide: launches one headless Chromium process per
//! session, runs its CDP event stream on a background task, applies the
//! per-request page environment through emulation overrides, and scopes
//! the screenshot to a single element.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    MediaFeature, SetDeviceMetricsOverrideParams, SetEmulatedMediaParams,
    SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::debug;

use crate::config;
use crate::driver::{BrowserDriver, BrowserSession, ContextOptions, LaunchOptions, PageHandle};
use crate::error::CaptureError;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Launches disposable Chromium processes.
pub struct ChromiumDriver {
    chrome_path: Option<String>,
}

impl ChromiumDriver {
    pub fn new(chrome_path: Option<String>) -> Self {
        Self { chrome_path }
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn launch(
        &self,
        options: &LaunchOptions,
    ) -> Result<Box<dyn BrowserSession>, CaptureError> {
        let mut args = config::default_chrome_args();
        args.extend(options.args.iter().cloned());

        let mut builder = BrowserConfig::builder().args(args);
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = options.executable.as_ref().or(self.chrome_path.as_ref()) {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(CaptureError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CaptureError::LaunchFailed(e.to_string()))?;

        // The handler stream must be polled for the CDP connection to make
        // progress; it ends when the browser goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(error) = event {
                    debug!(%error, "cdp event stream error");
                    break;
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            handler: handler_task,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(
        &self,
        options: &ContextOptions,
    ) -> Result<Box<dyn PageHandle>, CaptureError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::Page(e.to_string()))?;

        if let Some(viewport) = &options.viewport {
            let params = SetDeviceMetricsOverrideParams::builder()
                .width(i64::from(viewport.width))
                .height(i64::from(viewport.height))
                .device_scale_factor(1.0)
                .mobile(false)
                .build()
                .map_err(CaptureError::Page)?;
            page.execute(params)
                .await
                .map_err(|e| CaptureError::Page(e.to_string()))?;
        }

        if let Some(user_agent) = &options.user_agent {
            let params = SetUserAgentOverrideParams::builder()
                .user_agent(user_agent.as_str())
                .build()
                .map_err(CaptureError::Page)?;
            page.execute(params)
                .await
                .map_err(|e| CaptureError::Page(e.to_string()))?;
        }

        if let Some(scheme) = options.color_scheme {
            let params = SetEmulatedMediaParams::builder()
                .features(vec![MediaFeature {
                    name: "prefers-color-scheme".to_string(),
                    value: scheme.as_str().to_string(),
                }])
                .build();
            page.execute(params)
                .await
                .map_err(|e| CaptureError::Page(e.to_string()))?;
        }

        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(&mut self) -> Result<(), CaptureError> {
        let result = self.browser.close().await;
        self.handler.abort();
        result
            .map(|_| ())
            .map_err(|e| CaptureError::Browser(e.to_string()))
    }
}

struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn goto(&self, url: &str, deadline: Duration) -> Result<(), CaptureError> {
        let navigation = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| CaptureError::Navigation(e.to_string()))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| CaptureError::Navigation(e.to_string()))?;
            Ok(())
        };
        match timeout(deadline, navigation).await {
            Ok(result) => result,
            Err(_) => Err(CaptureError::Timeout(deadline)),
        }
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        deadline: Duration,
    ) -> Result<(), CaptureError> {
        let started = Instant::now();
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if started.elapsed() >= deadline {
                return Err(CaptureError::Timeout(deadline));
            }
            sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn screenshot_element(&self, selector: &str) -> Result<Vec<u8>, CaptureError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| CaptureError::SelectorNotFound(selector.to_string()))?;

        element
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))
    }

    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value, CaptureError> {
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| CaptureError::Page(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| CaptureError::Page(e.to_string()))
    }
}
