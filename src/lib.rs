//! # Screenshot API
//!
//! An on-demand element-screenshot capture service. One HTTP request drives
//! one disposable headless Chromium session through a fixed sequence
//! (launch, page setup, navigation, selector wait, element screenshot,
//! teardown) and answers with raw PNG bytes or a structured JSON error
//! envelope. Sessions are never pooled or reused; every capture is fully
//! isolated.
//!
//! The capture pipeline is customizable through four lifecycle hooks
//! (`prepare_browser`, `prepare_page`, `before_capture`, `after_capture`),
//! merged per field over built-in defaults. Cancellation is cooperative:
//! a shared abort flag, tripped by client disconnect or the session
//! deadline, is checked after every step, and the browser process is torn
//! down on every exit path.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use screenshot_api::{
//!     CaptureOptions, CaptureRequest, Capturer, ChromiumDriver, HookSet,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let driver = Arc::new(ChromiumDriver::new(None));
//!     let capturer = Capturer::new(driver, HookSet::default());
//!
//!     let mut request = CaptureRequest::for_url("https://example.com");
//!     request.selector = "h1".to_string();
//!
//!     if let Some(png) = capturer
//!         .capture(&request, CaptureOptions::default(), None)
//!         .await?
//!     {
//!         println!("captured {} bytes", png.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## HTTP Usage
//!
//! ```bash
//! screenshot-api serve --port 8080
//! curl -X POST localhost:8080/api/screenshot \
//!   -d '{"url":"https://example.com","selector":"h1"}' -o shot.png
//! ```

/// Capture orchestration: one disposable browser session per request
pub mod capture;

/// Chromium implementation of the browser driver seam
pub mod chromium;

/// Command-line interface implementation
pub mod cli;

/// Configuration and settings for the capture service
pub mod config;

/// Browser automation driver traits
pub mod driver;

/// Error types and driver-failure normalization
pub mod error;

/// Lifecycle hook pipeline
pub mod hooks;

/// Performance metrics collection
pub mod metrics;

/// Request payload parsing and validation
pub mod payload;

/// HTTP surface: routing, request handling, response envelopes
pub mod server;


pub use capture::*;
pub use chromium::*;
pub use cli::{setup_logging, Cli, CliRunner, Commands};
pub use config::*;
pub use driver::*;
pub use error::*;
pub use hooks::*;
pub use payload::*;
pub use server::*;
