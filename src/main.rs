use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod enhancement;
mod error;
mod server;

#[derive(Parser, Debug)]
#[command(name = "image-enhancer-server")]
#[command(about = "Image upscaling and enhancement server (Lanczos, CLAHE, unsharp mask)")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "ENHANCER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "ENHANCER_PORT", default_value = "9393")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 50MB)
    #[arg(long, env = "ENHANCER_MAX_FILE_SIZE", default_value = "52428800")]
    pub max_file_size: usize,

    /// Maximum enhanced image size in pixels (width x height after upscaling)
    #[arg(
        long,
        env = "ENHANCER_MAX_OUTPUT_PIXELS",
        default_value_t = enhancement::pipeline::DEFAULT_MAX_OUTPUT_PIXELS
    )]
    pub max_output_pixels: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from(args);

    tracing::info!(
        "Starting image-enhancer-server v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Binding to {}:{}", config.host, config.port);

    server::run(config).await
}
