use anyhow::Result;
use catalogapi_gateway::{CatalogServer, ServerConfig};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "REST API over the Catalogues table", long_about = None)]
struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    bind_address: String,

    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = if let Some(config_path) = args.config {
        ServerConfig::from_file(&config_path).await?
    } else {
        ServerConfig {
            bind_address: args.bind_address,
            port: args.port,
            log_level: args.log_level,
        }
    };

    CatalogServer::new(config).run().await
}
