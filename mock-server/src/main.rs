use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// In-memory stand-in for the remote cities resource.
#[derive(Debug, Parser)]
#[command(name = "mock-server")]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3600)]
    port: u16,

    /// JSON file with initial cities (an array, or `{"cities": [...]}`).
    #[arg(long)]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let seed = match &args.seed {
        Some(path) => mock_server::load_seed(&std::fs::read_to_string(path)?)?,
        None => Vec::new(),
    };

    let addr = format!("127.0.0.1:{}", args.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, cities = seed.len(), "listening");
    mock_server::serve(listener, seed).await?;
    Ok(())
}
