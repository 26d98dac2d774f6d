use clap::Parser;
use screenshot_api::{setup_logging, Cli, CliRunner};
use screenshot_api::cli::load_config;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    setup_logging(args.verbose)?;

    info!("Starting screenshot-api v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args).await?;
    info!("Default session timeout: {:?}", config.default_timeout());

    let runner = CliRunner::new(config);
    runner.run(args.command).await
}
