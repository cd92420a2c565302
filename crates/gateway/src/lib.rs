use anyhow::{Context, Result};
use catalogapi_api::{create_router, AppState};
use catalogapi_catalog::{CatalogRepository, ConnectionManager, DatabaseSettings};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid config file")
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.bind_address, self.port))
    }
}

pub struct CatalogServer {
    config: ServerConfig,
}

impl CatalogServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        self.setup_tracing()?;

        tracing::info!("Starting catalog api server...");
        tracing::info!("Configuration: {:?}", self.config);

        let settings = DatabaseSettings::from_env()?;
        let connections = Arc::new(ConnectionManager::new(settings));

        // Connectivity is established before serving; later failures are per request.
        if let Err(err) = connections.connect().await {
            tracing::error!("Could not connect to database at startup: {}", err);
            return Err(err).context("database connectivity check failed");
        }

        let repository = CatalogRepository::new(connections.clone());
        let app = create_router().with_state(AppState::new(Arc::new(repository)));

        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Catalog api listening on http://{}", addr);
        tracing::info!("Health check available at: http://{}/health", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        connections.close().await;
        tracing::info!("Catalog api stopped");
        Ok(())
    }

    fn setup_tracing(&self) -> Result<()> {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&self.config.log_level));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_on_8080() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().unwrap(), "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ServerConfig::from_toml("port = 9090\nlog_level = \"debug\"").unwrap();
        assert_eq!(
            config,
            ServerConfig {
                port: 9090,
                log_level: "debug".to_string(),
                ..ServerConfig::default()
            }
        );
    }

    #[test]
    fn rejects_bad_bind_address() {
        let config = ServerConfig {
            bind_address: "not an address".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn rejects_wrongly_typed_toml() {
        assert!(ServerConfig::from_toml("port = \"eighty\"").is_err());
    }
}
