//! Capture orchestration
//!
//! [`Capturer`] owns the browser driver and the service-level hook set.
//! One `capture()` call is one disposable browser session: launch, page
//! setup, navigation, selector wait, screenshot, teardown. An abort check
//! runs after every externally visible step; once the caller has lost
//! interest no further browser side effect is initiated, and the session
//! close step runs no matter how the call exits.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::driver::{BrowserDriver, BrowserSession, ContextOptions, LaunchOptions};
use crate::error::CaptureError;
use crate::hooks::{HookSet, ResolvedHooks};
use crate::payload::CaptureRequest;

/// Session timeout applied when the request does not carry one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Cooperative cancellation predicate, polled between steps.
pub type AbortCheck = Arc<dyn Fn() -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct CaptureOptions {
    /// Bound for navigation and selector waits. Takes precedence over the
    /// request's own timeout; [`DEFAULT_TIMEOUT`] when both are absent.
    pub timeout: Option<Duration>,
    /// Checked after every step; a panicking predicate counts as "abort".
    pub should_abort: Option<AbortCheck>,
}

/// The selector actually captured: trimmed request selector, else `body`.
pub fn effective_selector(request: &CaptureRequest) -> &str {
    let trimmed = request.selector.trim();
    if trimmed.is_empty() {
        "body"
    } else {
        trimmed
    }
}

fn aborted(check: &Option<AbortCheck>) -> bool {
    match check {
        Some(check) => catch_unwind(AssertUnwindSafe(|| check())).unwrap_or(true),
        None => false,
    }
}

/// Drives disposable browser sessions through the capture sequence.
pub struct Capturer {
    driver: Arc<dyn BrowserDriver>,
    base_hooks: HookSet,
}

impl Capturer {
    pub fn new(driver: Arc<dyn BrowserDriver>, base_hooks: HookSet) -> Self {
        Self { driver, base_hooks }
    }

    /// Capture one element screenshot.
    ///
    /// `Ok(None)` means the abort predicate tripped mid-flight: the caller
    /// already lost interest, the session was torn down, and no error is
    /// raised. Runtime hooks overlay the service-level hooks per field.
    pub async fn capture(
        &self,
        request: &CaptureRequest,
        options: CaptureOptions,
        runtime_hooks: Option<&HookSet>,
    ) -> Result<Option<Vec<u8>>, CaptureError> {
        let timeout = options
            .timeout
            .or(request.timeout)
            .unwrap_or(DEFAULT_TIMEOUT);
        let should_abort = options.should_abort.clone();
        let hooks = match runtime_hooks {
            Some(overlay) => self.base_hooks.overlay(overlay).resolve(),
            None => self.base_hooks.resolve(),
        };

        let mut launch = LaunchOptions {
            headless: true,
            args: request.args.clone().unwrap_or_default(),
            executable: None,
        };
        (hooks.prepare_browser)(&mut launch, request).await?;
        if aborted(&should_abort) {
            return Ok(None);
        }

        let mut session = self.driver.launch(&launch).await?;
        let result = self
            .drive_session(session.as_ref(), request, timeout, &should_abort, &hooks)
            .await;
        // Close failures must never mask the primary outcome.
        if let Err(error) = session.close().await {
            debug!(%error, "browser close failed");
        }
        result
    }

    async fn drive_session(
        &self,
        session: &dyn BrowserSession,
        request: &CaptureRequest,
        timeout: Duration,
        should_abort: &Option<AbortCheck>,
        hooks: &ResolvedHooks,
    ) -> Result<Option<Vec<u8>>, CaptureError> {
        if aborted(should_abort) {
            return Ok(None);
        }

        let context = ContextOptions {
            user_agent: request.user_agent.clone(),
            viewport: request.viewport.clone(),
            color_scheme: request.color_scheme,
        };
        let page = session.new_page(&context).await?;

        (hooks.prepare_page)(page.as_ref(), request, timeout).await?;
        if aborted(should_abort) {
            return Ok(None);
        }

        (hooks.before_capture)(page.as_ref(), request, timeout).await?;
        if aborted(should_abort) {
            return Ok(None);
        }

        let selector = effective_selector(request);
        // Wait failures surface uniformly as "not found", never as a raw
        // driver timeout.
        if page.wait_for_selector(selector, timeout).await.is_err() {
            return Err(CaptureError::SelectorNotFound(selector.to_string()));
        }
        if aborted(should_abort) {
            return Ok(None);
        }

        let buffer = page.screenshot_element(selector).await?;
        let buffer = match (hooks.after_capture)(page.as_ref(), request, &buffer).await? {
            Some(replacement) => replacement,
            None => buffer,
        };
        Ok(Some(buffer))
    }
}
