//! HTTP surface for the capture service
//!
//! One route, `POST /api/screenshot`: read body, parse, capture, respond.
//! Success is raw PNG bytes; every failure is a JSON envelope with a code
//! from a closed set. A client that disconnects mid-capture gets nothing;
//! the capture task notices the shared cancel flag at its next step
//! boundary and tears the browser down on its own.

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::capture::{AbortCheck, CaptureOptions, Capturer};
use crate::config::ServiceConfig;
use crate::error::{normalize, strip_ansi};
use crate::metrics;
use crate::payload::{self, CaptureRequest};

pub const ROUTE_PATH: &str = "/api/screenshot";

/// Wall-clock headroom on top of the session timeout. Step-local bounds
/// (navigation, selector wait) fire first so their outcomes keep their own
/// codes; this backstop only catches a session that hangs outside them.
const SESSION_GRACE: Duration = Duration::from_secs(5);

/// Responses to a vanished client use the nginx 499 convention; the peer
/// never observes them.
const STATUS_CLIENT_CLOSED_REQUEST: u16 = 499;

/// Closed set of envelope error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MethodNotAllowed,
    InvalidPayload,
    SelectorNotFound,
    Timeout,
    InternalError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorCode::InvalidPayload => StatusCode::BAD_REQUEST,
            ErrorCode::SelectorNotFound => StatusCode::NOT_FOUND,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MethodNotAllowed => "method_not_allowed",
            ErrorCode::InvalidPayload => "invalid_payload",
            ErrorCode::SelectorNotFound => "selector_not_found",
            ErrorCode::Timeout => "timeout",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

/// JSON envelope used for every non-image response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub code: ErrorCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

fn error_response(
    code: ErrorCode,
    error: &str,
    message: Option<String>,
    stack: Option<String>,
) -> Response {
    let body = ErrorBody {
        ok: false,
        code,
        error: error.to_string(),
        message,
        stack,
    };
    (code.status(), Json(body)).into_response()
}

fn png_response(buffer: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        buffer,
    )
        .into_response()
}

fn suppressed_response() -> Response {
    StatusCode::from_u16(STATUS_CLIENT_CLOSED_REQUEST)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        .into_response()
}

const CANCEL_NONE: u8 = 0;
const CANCEL_CLIENT_GONE: u8 = 1;
const CANCEL_DEADLINE: u8 = 2;

/// Shared cancellation state for one request. Both termination sources
/// (client disconnect and the session deadline) converge here, but remain
/// distinguishable so the handler can pick the timeout envelope over the
/// silent return.
#[derive(Clone)]
pub struct CancelFlag(Arc<AtomicU8>);

impl CancelFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(CANCEL_NONE)))
    }

    pub fn client_gone(&self) {
        let _ = self.0.compare_exchange(
            CANCEL_NONE,
            CANCEL_CLIENT_GONE,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    pub fn deadline_exceeded(&self) {
        let _ = self.0.compare_exchange(
            CANCEL_NONE,
            CANCEL_DEADLINE,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst) != CANCEL_NONE
    }

    pub fn abort_check(&self) -> AbortCheck {
        let flag = self.clone();
        Arc::new(move || flag.is_cancelled())
    }
}

impl Default for CancelFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Trips the cancel flag if the handler future is dropped before it
/// reached a response decision; hyper drops the future the moment the
/// client connection goes away.
pub struct DisconnectGuard {
    flag: CancelFlag,
    armed: bool,
}

impl DisconnectGuard {
    pub fn new(flag: CancelFlag) -> Self {
        Self { flag, armed: true }
    }

    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if self.armed {
            self.flag.client_gone();
        }
    }
}

/// Shared state behind the router.
pub struct AppState {
    pub capturer: Capturer,
    pub default_timeout: Duration,
    pub max_body_bytes: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(ROUTE_PATH, any(screenshot_handler))
        .route("/healthz", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> Response {
    Json(serde_json::json!({ "status": "ok" })).into_response()
}

async fn screenshot_handler(State(state): State<Arc<AppState>>, request: Request) -> Response {
    if request.method() != Method::POST {
        return error_response(ErrorCode::MethodNotAllowed, "Use POST", None, None);
    }

    let body = match to_bytes(request.into_body(), state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(error) => {
            // Aborted or broken body stream: the client is gone.
            debug!(%error, "failed to read request body");
            return suppressed_response();
        }
    };

    let raw = String::from_utf8_lossy(&body);
    let capture_request = match payload::parse(&raw) {
        Ok(parsed) => parsed,
        Err(message) => {
            return error_response(
                ErrorCode::InvalidPayload,
                "Invalid payload",
                Some(message),
                None,
            )
        }
    };

    let request_id = Uuid::new_v4();
    let span = info_span!("capture", id = %request_id, url = %capture_request.url);
    handle_capture(state, capture_request).instrument(span).await
}

async fn handle_capture(state: Arc<AppState>, request: CaptureRequest) -> Response {
    let timeout = request.timeout.unwrap_or(state.default_timeout);
    let flag = CancelFlag::new();
    let guard = DisconnectGuard::new(flag.clone());
    let started = Instant::now();

    debug!(selector = %request.selector, ?timeout, "starting capture session");

    // The capture runs detached so its teardown always completes, even if
    // this handler future is dropped mid-flight.
    let task = {
        let state = state.clone();
        let options = CaptureOptions {
            timeout: Some(timeout),
            should_abort: Some(flag.abort_check()),
        };
        let request = request.clone();
        tokio::spawn(async move { state.capturer.capture(&request, options, None).await })
    };

    let outcome = match tokio::time::timeout(timeout + SESSION_GRACE, task).await {
        Ok(Ok(outcome)) => {
            guard.disarm();
            outcome
        }
        Ok(Err(join_error)) => {
            guard.disarm();
            error!(error = %join_error, "capture task died");
            let message = strip_ansi(&join_failure_message(join_error));
            metrics::record_capture_failure(ErrorCode::InternalError.as_str());
            return error_response(ErrorCode::InternalError, "Internal error", Some(message), None);
        }
        Err(_) => {
            // Backstop deadline: tell the capture task to stop, answer now.
            flag.deadline_exceeded();
            guard.disarm();
            metrics::record_capture_failure(ErrorCode::Timeout.as_str());
            return error_response(
                ErrorCode::Timeout,
                "Timeout",
                Some(format!("Session did not finish within {timeout:?}")),
                None,
            );
        }
    };

    match outcome {
        Ok(Some(buffer)) => {
            metrics::record_capture_success(started.elapsed());
            png_response(buffer)
        }
        Ok(None) => {
            debug!("capture aborted, response suppressed");
            metrics::record_capture_aborted();
            suppressed_response()
        }
        Err(capture_error) if capture_error.is_selector_not_found() => {
            metrics::record_capture_failure(ErrorCode::SelectorNotFound.as_str());
            error_response(
                ErrorCode::SelectorNotFound,
                &capture_error.to_string(),
                None,
                None,
            )
        }
        Err(capture_error) => {
            let normalized = normalize(&capture_error);
            if normalized.is_timeout {
                metrics::record_capture_failure(ErrorCode::Timeout.as_str());
                error_response(
                    ErrorCode::Timeout,
                    "Timeout",
                    Some(normalized.message),
                    normalized.stack,
                )
            } else {
                error!(error = %normalized.message, "capture failed");
                metrics::record_capture_failure(ErrorCode::InternalError.as_str());
                error_response(
                    ErrorCode::InternalError,
                    "Internal error",
                    Some(normalized.message),
                    normalized.stack,
                )
            }
        }
    }
}

fn join_failure_message(join_error: tokio::task::JoinError) -> String {
    if join_error.is_panic() {
        match join_error.into_panic().downcast::<String>() {
            Ok(text) => *text,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(text) => (*text).to_string(),
                Err(_) => "capture task panicked".to_string(),
            },
        }
    } else {
        join_error.to_string()
    }
}

/// Bind and run the HTTP endpoint until a shutdown signal arrives.
pub async fn serve(config: &ServiceConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("screenshot service listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("Failed to create SIGINT handler");
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("Failed to create SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT"),
        _ = sigterm.recv() => info!("Received SIGTERM"),
    }
}
