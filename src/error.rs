//! Error types and driver-failure normalization
//!
//! Capture failures carry an explicit discriminant instead of relying on
//! string sniffing of driver exceptions: the selector-not-found and timeout
//! outcomes are their own variants. [`normalize`] converts any capture
//! failure into a sanitized `{message, stack, is_timeout}` triple fit to
//! cross the process boundary: ANSI escape sequences the driver may embed
//! in its messages never reach a client.

use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("Selector not found: {0}")]
    SelectorNotFound(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Page error: {0}")]
    Page(String),

    #[error("Screenshot capture failed: {0}")]
    CaptureFailed(String),

    #[error("Browser error: {0}")]
    Browser(String),
}

impl CaptureError {
    pub fn is_selector_not_found(&self) -> bool {
        matches!(self, CaptureError::SelectorNotFound(_))
    }
}

/// A capture failure reduced to what may leave the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedError {
    pub message: String,
    pub stack: Option<String>,
    pub is_timeout: bool,
}

// Matches the escape sequences terminal-coloring libraries emit.
const ANSI_PATTERN: &str = "[\\x1b\\x{9b}][\\[\\]()#;?]*(?:(?:[0-9]{1,4}(?:;[0-9]{0,4})*)?\
[0-9A-ORZcf-nqry=><~]|(?:[a-zA-Z\\d]*(?:;[a-zA-Z\\d]*)*)?\\x07)";

fn ansi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(ANSI_PATTERN).expect("ANSI pattern compiles"))
}

fn timed_out_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)timed?\s*out").expect("timeout pattern compiles"))
}

/// Remove ANSI escape sequences from a driver-supplied string.
pub fn strip_ansi(value: &str) -> String {
    ansi_pattern().replace_all(value, "").into_owned()
}

/// Normalize a capture failure for the response envelope.
///
/// `is_timeout` is true iff the error is the timeout variant itself or its
/// message reads like one ("timeout", "timed out", ...). The source chain,
/// when present, becomes the `stack` with one frame per line.
pub fn normalize(error: &CaptureError) -> NormalizedError {
    let message = strip_ansi(&error.to_string());

    let mut frames = Vec::new();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        frames.push(strip_ansi(&cause.to_string()));
        source = cause.source();
    }
    let stack = if frames.is_empty() {
        None
    } else {
        Some(frames.join("\n"))
    };

    let is_timeout =
        matches!(error, CaptureError::Timeout(_)) || timed_out_pattern().is_match(&message);

    NormalizedError {
        message,
        stack,
        is_timeout,
    }
}
