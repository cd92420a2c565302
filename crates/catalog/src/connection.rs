//! Connection management for the catalog database.
//!
//! A [`ConnectionManager`] owns at most one pool at a time. It is either
//! uninitialized (no pool) or live. Callers go through
//! [`ConnectionManager::ensure_live`], which opens the pool on first use and
//! probes it before handing it out. A failed probe drops the pool so the next
//! caller opens a fresh one; the failing call itself still returns an error.

use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Connection};
use tokio::sync::Mutex;

use crate::error::{CatalogError, CatalogResult};

pub const DB_SERVER_VAR: &str = "SECRET_DB_SERVER";
pub const DB_USERNAME_VAR: &str = "SECRET_USERNAME";
pub const DB_PASSWORD_VAR: &str = "SECRET_PASSWORD";
pub const DATABASE_URL_VAR: &str = "CATALOG_DATABASE_URL";

pub const DB_PORT: u16 = 5432;
pub const DB_NAME: &str = "CatalogueDb";

#[derive(Clone)]
pub struct DatabaseSettings {
    url: String,
    target: String,
}

impl DatabaseSettings {
    /// Uses `url` verbatim.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let target = url.split(':').next().unwrap_or("database").to_string();
        Self { url, target }
    }

    /// Composes the connection URL from the server host and credentials,
    /// with the fixed port and database name.
    pub fn from_credentials(server: &str, username: &str, password: &str) -> Self {
        let url = format!(
            "postgres://{}:{}@{}:{}/{}",
            urlencoding::encode(username),
            urlencoding::encode(password),
            server,
            DB_PORT,
            DB_NAME
        );
        Self {
            url,
            target: format!("{}:{}/{}", server, DB_PORT, DB_NAME),
        }
    }

    pub fn from_env() -> CatalogResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves settings through `lookup`. `CATALOG_DATABASE_URL` wins over
    /// the individual credential variables.
    pub fn from_lookup<F>(lookup: F) -> CatalogResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(DATABASE_URL_VAR).filter(|url| !url.is_empty()) {
            return Ok(Self::from_url(url));
        }

        let required = |name: &str| {
            lookup(name).ok_or_else(|| {
                CatalogError::Config(format!("environment variable {} is not set", name))
            })
        };

        let server = required(DB_SERVER_VAR)?;
        let username = required(DB_USERNAME_VAR)?;
        let password = required(DB_PASSWORD_VAR)?;

        Ok(Self::from_credentials(&server, &username, &password))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Loggable description of where the settings point, without credentials.
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

struct LivePool {
    generation: u64,
    pool: AnyPool,
}

struct State {
    live: Option<LivePool>,
    generation: u64,
}

pub struct ConnectionManager {
    settings: DatabaseSettings,
    state: Mutex<State>,
}

impl ConnectionManager {
    pub fn new(settings: DatabaseSettings) -> Self {
        sqlx::any::install_default_drivers();
        Self {
            settings,
            state: Mutex::new(State {
                live: None,
                generation: 0,
            }),
        }
    }

    /// Returns the current pool, opening and validating one if none is held.
    ///
    /// The lock is held while opening so concurrent first callers share a
    /// single initialization.
    pub async fn connect(&self) -> CatalogResult<AnyPool> {
        self.connect_tagged().await.map(|(_, pool)| pool)
    }

    /// Returns a pool that has just answered a liveness probe.
    pub async fn ensure_live(&self) -> CatalogResult<AnyPool> {
        let (generation, pool) = self.connect_tagged().await?;

        if let Err(err) = probe(&pool).await {
            tracing::warn!(
                db = %self.settings.target,
                error = %err,
                "Database liveness probe failed, discarding pool"
            );
            self.discard(generation).await;
            return Err(CatalogError::Connectivity(err));
        }

        Ok(pool)
    }

    #[cfg(any(test, feature = "testing"))]
    pub async fn is_live(&self) -> bool {
        self.state.lock().await.live.is_some()
    }

    /// The currently held pool, if any, without opening or probing.
    #[cfg(any(test, feature = "testing"))]
    pub async fn current_pool(&self) -> Option<AnyPool> {
        self.state
            .lock()
            .await
            .live
            .as_ref()
            .map(|live| live.pool.clone())
    }

    pub async fn close(&self) {
        let live = self.state.lock().await.live.take();
        if let Some(live) = live {
            live.pool.close().await;
            tracing::info!(db = %self.settings.target, "Database pool closed");
        }
    }

    async fn connect_tagged(&self) -> CatalogResult<(u64, AnyPool)> {
        let mut state = self.state.lock().await;
        if let Some(live) = state.live.as_ref() {
            return Ok((live.generation, live.pool.clone()));
        }

        let pool = self.open().await?;
        state.generation += 1;
        let generation = state.generation;
        state.live = Some(LivePool {
            generation,
            pool: pool.clone(),
        });

        Ok((generation, pool))
    }

    async fn open(&self) -> CatalogResult<AnyPool> {
        tracing::info!(db = %self.settings.target, "Opening database pool");

        let pool = AnyPoolOptions::new()
            .connect(&self.settings.url)
            .await
            .map_err(|err| {
                tracing::error!(
                    db = %self.settings.target,
                    error = %err,
                    "Failed to open database pool"
                );
                CatalogError::Connectivity(err)
            })?;

        if let Err(err) = probe(&pool).await {
            tracing::error!(
                db = %self.settings.target,
                error = %err,
                "New database pool failed liveness probe"
            );
            pool.close().await;
            return Err(CatalogError::Connectivity(err));
        }

        tracing::info!(db = %self.settings.target, "Database connected");
        Ok(pool)
    }

    // A newer pool installed by another caller is left alone.
    async fn discard(&self, generation: u64) {
        let stale = {
            let mut state = self.state.lock().await;
            let current = state
                .live
                .as_ref()
                .is_some_and(|live| live.generation == generation);
            if current { state.live.take() } else { None }
        };

        if let Some(stale) = stale {
            stale.pool.close().await;
        }
    }
}

async fn probe(pool: &AnyPool) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    conn.ping().await
}
