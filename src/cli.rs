use crate::capture::{CaptureOptions, Capturer};
use crate::chromium::ChromiumDriver;
use crate::config::ServiceConfig;
use crate::hooks::HookSet;
use crate::payload::{CaptureRequest, Viewport};
use crate::server::{self, AppState};
use crate::metrics;
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "screenshot-api")]
#[command(about = "On-demand element screenshot capture service")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, help = "Configuration file path (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Default session timeout in milliseconds")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Chromium executable path")]
    pub chrome_path: Option<String>,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP capture endpoint
    Serve {
        #[arg(short, long, help = "Server port")]
        port: Option<u16>,

        #[arg(long, help = "Bind address")]
        bind: Option<String>,

        #[arg(long, help = "Prometheus exporter port")]
        metrics_port: Option<u16>,
    },

    /// Capture a single element screenshot to a file
    Single {
        #[arg(short, long, help = "URL to capture")]
        url: String,

        #[arg(short, long, help = "Output file path")]
        output: PathBuf,

        #[arg(long, default_value = "body", help = "CSS selector to capture")]
        selector: String,

        #[arg(long, help = "Viewport width")]
        width: Option<u32>,

        #[arg(long, help = "Viewport height")]
        height: Option<u32>,

        #[arg(long, help = "Extra selector to await before capture")]
        wait_for: Option<String>,
    },
}

/// Load the config file (if any) and apply CLI overrides.
pub async fn load_config(args: &Cli) -> anyhow::Result<ServiceConfig> {
    let mut config = if let Some(path) = &args.config {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&content).context("parsing config file")?
    } else {
        ServiceConfig::default()
    };

    if let Some(timeout) = args.timeout {
        config.default_timeout_ms = timeout;
    }
    if let Some(chrome_path) = &args.chrome_path {
        config.chrome_path = Some(chrome_path.clone());
    }

    config.validate().map_err(|message| anyhow!(message))?;
    Ok(config)
}

pub struct CliRunner {
    config: ServiceConfig,
    capturer: Arc<Capturer>,
}

impl CliRunner {
    pub fn new(config: ServiceConfig) -> Self {
        let driver = Arc::new(ChromiumDriver::new(config.chrome_path.clone()));
        let capturer = Arc::new(Capturer::new(driver, HookSet::default()));
        Self { config, capturer }
    }

    pub async fn run(self, command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::Serve {
                port,
                bind,
                metrics_port,
            } => self.run_serve(port, bind, metrics_port).await,
            Commands::Single {
                url,
                output,
                selector,
                width,
                height,
                wait_for,
            } => {
                self.run_single(url, output, selector, width, height, wait_for)
                    .await
            }
        }
    }

    async fn run_serve(
        self,
        port: Option<u16>,
        bind: Option<String>,
        metrics_port: Option<u16>,
    ) -> anyhow::Result<()> {
        let mut config = self.config;
        if let Some(port) = port {
            config.port = port;
        }
        if let Some(bind) = bind {
            config.bind_address = bind;
        }
        if let Some(metrics_port) = metrics_port.or(config.metrics_port) {
            metrics::install_prometheus(metrics_port)?;
        }

        let driver = Arc::new(ChromiumDriver::new(config.chrome_path.clone()));
        let state = Arc::new(AppState {
            capturer: Capturer::new(driver, HookSet::default()),
            default_timeout: config.default_timeout(),
            max_body_bytes: config.max_body_bytes,
        });

        server::serve(&config, state).await
    }

    async fn run_single(
        self,
        url: String,
        output: PathBuf,
        selector: String,
        width: Option<u32>,
        height: Option<u32>,
        wait_for: Option<String>,
    ) -> anyhow::Result<()> {
        validate_url(&url)?;
        info!("Capturing {url}");

        let mut request = CaptureRequest::for_url(url);
        request.selector = selector;
        request.wait_for = wait_for;
        request.timeout = Some(self.config.default_timeout());
        if let (Some(width), Some(height)) = (width, height) {
            request.viewport = Some(Viewport { width, height });
        }

        let options = CaptureOptions {
            timeout: Some(self.config.default_timeout()),
            should_abort: None,
        };
        match self.capturer.capture(&request, options, None).await? {
            Some(buffer) => {
                if let Some(parent) = output.parent() {
                    fs::create_dir_all(parent).await?;
                }
                fs::write(&output, &buffer).await?;
                info!("Screenshot saved to {}", output.display());
                Ok(())
            }
            None => {
                // No abort source is wired up here, so this never fires.
                warn!("capture aborted before completion");
                Ok(())
            }
        }
    }
}

fn validate_url(url: &str) -> anyhow::Result<()> {
    let parsed = url::Url::parse(url).with_context(|| format!("invalid URL: {url}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(anyhow!("unsupported URL scheme: {other}")),
    }
}

pub fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    Ok(())
}
