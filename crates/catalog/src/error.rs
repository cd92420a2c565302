use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Database connectivity error: {0}")]
    Connectivity(#[source] sqlx::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Insert did not return an identity value")]
    MissingIdentity,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CatalogError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, CatalogError::Connectivity(_))
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
