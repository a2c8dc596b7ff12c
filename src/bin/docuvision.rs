//! CLI binary for the docuvision service.
//!
//! A thin shim over the library crate: maps flags to `ServiceConfig`,
//! loads the engine once, and runs the server until it exits.

use anyhow::{Context, Result};
use clap::Parser;
use docuvision::{load_engine, serve, ServiceConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "docuvision",
    version,
    about = "Document transcription server: adaptive PDF/image OCR through a vision-language model"
)]
struct Cli {
    /// Directory holding the engine bundle (model.onnx + vocab.json)
    #[arg(long, env = "DOCUVISION_MODEL_DIR", default_value = "models")]
    model_dir: PathBuf,

    /// Bind address
    #[arg(long, env = "DOCUVISION_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Bind port
    #[arg(long, env = "DOCUVISION_PORT", default_value_t = 8000)]
    port: u16,

    /// Minimum native-text length for a PDF's text layer to be trusted
    #[arg(long, default_value_t = 100)]
    native_text_threshold: usize,

    /// PDF rasterisation resolution in DPI
    #[arg(long, default_value_t = 300)]
    render_dpi: u32,

    /// Command invoked to render exports
    #[arg(long, env = "DOCUVISION_RENDERER", default_value = "docuvision-render")]
    renderer_command: String,

    /// Upper bound on one render process run, in seconds
    #[arg(long, default_value_t = 120)]
    render_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = ServiceConfig::builder()
        .model_dir(cli.model_dir)
        .host(cli.host)
        .port(cli.port)
        .native_text_threshold(cli.native_text_threshold)
        .render_dpi(cli.render_dpi)
        .renderer_command(cli.renderer_command)
        .render_timeout_secs(cli.render_timeout_secs)
        .build()
        .context("invalid configuration")?;

    tracing::info!(?config, "Starting docuvision");

    let engine = load_engine(&config).context("failed to load the vision engine")?;

    serve(config, engine).await.context("server error")?;
    Ok(())
}
