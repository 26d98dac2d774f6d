//! Capture lifecycle hooks
//!
//! Four extension points, each independently overridable, merged
//! left-to-right so a later hook set wins per field and an absent hook
//! falls back to the built-in default. Merging is a pure function over
//! optional fields; there is no shared mutable default state. The default
//! `prepare_page` performs the navigation (and the optional `waitFor`
//! wait); the other defaults are identity.

use futures::future::BoxFuture;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::driver::{LaunchOptions, PageHandle};
use crate::error::CaptureError;
use crate::payload::CaptureRequest;

pub type HookResult<T = ()> = Result<T, CaptureError>;

/// Mutates launch options before the browser process starts.
pub type PrepareBrowserHook = Arc<
    dyn for<'a> Fn(&'a mut LaunchOptions, &'a CaptureRequest) -> BoxFuture<'a, HookResult>
        + Send
        + Sync,
>;

/// Runs against the live page (`prepare_page`, `before_capture`).
pub type PageHook = Arc<
    dyn for<'a> Fn(&'a dyn PageHandle, &'a CaptureRequest, Duration) -> BoxFuture<'a, HookResult>
        + Send
        + Sync,
>;

/// Inspects the captured bytes; may return a replacement buffer.
pub type AfterCaptureHook = Arc<
    dyn for<'a> Fn(
            &'a dyn PageHandle,
            &'a CaptureRequest,
            &'a [u8],
        ) -> BoxFuture<'a, HookResult<Option<Vec<u8>>>>
        + Send
        + Sync,
>;

/// A partial set of lifecycle hooks. Absent fields fall back to the next
/// layer down, ultimately to the built-in defaults.
#[derive(Clone, Default)]
pub struct HookSet {
    pub prepare_browser: Option<PrepareBrowserHook>,
    pub prepare_page: Option<PageHook>,
    pub before_capture: Option<PageHook>,
    pub after_capture: Option<AfterCaptureHook>,
}

impl HookSet {
    /// Per-field overlay: fields set in `later` win, the rest keep `self`.
    pub fn overlay(&self, later: &HookSet) -> HookSet {
        HookSet {
            prepare_browser: later
                .prepare_browser
                .clone()
                .or_else(|| self.prepare_browser.clone()),
            prepare_page: later
                .prepare_page
                .clone()
                .or_else(|| self.prepare_page.clone()),
            before_capture: later
                .before_capture
                .clone()
                .or_else(|| self.before_capture.clone()),
            after_capture: later
                .after_capture
                .clone()
                .or_else(|| self.after_capture.clone()),
        }
    }

    /// Merge layers left-to-right; later layers override per field.
    pub fn merge<'a>(layers: impl IntoIterator<Item = &'a HookSet>) -> HookSet {
        layers
            .into_iter()
            .fold(HookSet::default(), |merged, layer| merged.overlay(layer))
    }

    /// Fill every absent field with the built-in default.
    pub fn resolve(&self) -> ResolvedHooks {
        ResolvedHooks {
            prepare_browser: self
                .prepare_browser
                .clone()
                .unwrap_or_else(default_prepare_browser),
            prepare_page: self.prepare_page.clone().unwrap_or_else(default_prepare_page),
            before_capture: self
                .before_capture
                .clone()
                .unwrap_or_else(default_before_capture),
            after_capture: self
                .after_capture
                .clone()
                .unwrap_or_else(default_after_capture),
        }
    }
}

/// A fully-resolved hook set; every capture runs with one of these.
#[derive(Clone)]
pub struct ResolvedHooks {
    pub prepare_browser: PrepareBrowserHook,
    pub prepare_page: PageHook,
    pub before_capture: PageHook,
    pub after_capture: AfterCaptureHook,
}

fn noop_prepare_browser<'a>(
    _options: &'a mut LaunchOptions,
    _request: &'a CaptureRequest,
) -> BoxFuture<'a, HookResult> {
    Box::pin(async { Ok(()) })
}

fn navigate_prepare_page<'a>(
    page: &'a dyn PageHandle,
    request: &'a CaptureRequest,
    timeout: Duration,
) -> BoxFuture<'a, HookResult> {
    Box::pin(async move {
        page.goto(&request.url, timeout).await?;
        if let Some(wait_for) = request.wait_for.as_deref() {
            let wait_for = wait_for.trim();
            if !wait_for.is_empty() {
                page.wait_for_selector(wait_for, timeout).await?;
            }
        }
        Ok(())
    })
}

fn noop_before_capture<'a>(
    _page: &'a dyn PageHandle,
    _request: &'a CaptureRequest,
    _timeout: Duration,
) -> BoxFuture<'a, HookResult> {
    Box::pin(async { Ok(()) })
}

fn keep_buffer_after_capture<'a>(
    _page: &'a dyn PageHandle,
    _request: &'a CaptureRequest,
    _buffer: &'a [u8],
) -> BoxFuture<'a, HookResult<Option<Vec<u8>>>> {
    Box::pin(async { Ok(None) })
}

// Defaults are process-stable Arcs so hook identity survives resolve();
// callers can compare a resolved field against the default with ptr_eq.

pub fn default_prepare_browser() -> PrepareBrowserHook {
    static HOOK: OnceLock<PrepareBrowserHook> = OnceLock::new();
    HOOK.get_or_init(|| Arc::new(noop_prepare_browser)).clone()
}

pub fn default_prepare_page() -> PageHook {
    static HOOK: OnceLock<PageHook> = OnceLock::new();
    HOOK.get_or_init(|| Arc::new(navigate_prepare_page)).clone()
}

pub fn default_before_capture() -> PageHook {
    static HOOK: OnceLock<PageHook> = OnceLock::new();
    HOOK.get_or_init(|| Arc::new(noop_before_capture)).clone()
}

pub fn default_after_capture() -> AfterCaptureHook {
    static HOOK: OnceLock<AfterCaptureHook> = OnceLock::new();
    HOOK.get_or_init(|| Arc::new(keep_buffer_after_capture)).clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker_page_hook<'a>(
        _page: &'a dyn PageHandle,
        _request: &'a CaptureRequest,
        _timeout: Duration,
    ) -> BoxFuture<'a, HookResult> {
        Box::pin(async { Ok(()) })
    }

    fn other_marker_page_hook<'a>(
        _page: &'a dyn PageHandle,
        _request: &'a CaptureRequest,
        _timeout: Duration,
    ) -> BoxFuture<'a, HookResult> {
        Box::pin(async { Ok(()) })
    }

    #[test]
    fn test_merge_keeps_supplied_hooks_and_defaults_the_rest() {
        let prepare_page: PageHook = Arc::new(marker_page_hook);
        let before_capture: PageHook = Arc::new(other_marker_page_hook);

        let first = HookSet {
            prepare_page: Some(prepare_page.clone()),
            ..HookSet::default()
        };
        let second = HookSet {
            before_capture: Some(before_capture.clone()),
            ..HookSet::default()
        };

        let resolved = HookSet::merge([&first, &second]).resolve();

        assert!(Arc::ptr_eq(&resolved.prepare_page, &prepare_page));
        assert!(Arc::ptr_eq(&resolved.before_capture, &before_capture));
        assert!(Arc::ptr_eq(
            &resolved.prepare_browser,
            &default_prepare_browser()
        ));
        assert!(Arc::ptr_eq(
            &resolved.after_capture,
            &default_after_capture()
        ));
    }

    #[test]
    fn test_later_layers_override_per_field_not_wholesale() {
        let base_page: PageHook = Arc::new(marker_page_hook);
        let base_before: PageHook = Arc::new(other_marker_page_hook);
        let override_page: PageHook = Arc::new(other_marker_page_hook);

        let base = HookSet {
            prepare_page: Some(base_page),
            before_capture: Some(base_before.clone()),
            ..HookSet::default()
        };
        let per_request = HookSet {
            prepare_page: Some(override_page.clone()),
            ..HookSet::default()
        };

        let merged = base.overlay(&per_request);

        // prepare_page was replaced, before_capture survived the merge.
        assert!(Arc::ptr_eq(merged.prepare_page.as_ref().unwrap(), &override_page));
        assert!(Arc::ptr_eq(merged.before_capture.as_ref().unwrap(), &base_before));
    }

    #[test]
    fn test_empty_merge_resolves_to_defaults() {
        let resolved = HookSet::default().resolve();
        assert!(Arc::ptr_eq(&resolved.prepare_page, &default_prepare_page()));
        assert!(Arc::ptr_eq(
            &resolved.before_capture,
            &default_before_capture()
        ));
    }
}
