use sqlx::AnyPool;

use crate::error::CatalogResult;

/// Creates the `Catalogues` table on a SQLite database for local runs and
/// tests. Production databases own their schema.
pub async fn create_sqlite_catalogues_table(pool: &AnyPool) -> CatalogResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS Catalogues (
            Id INTEGER PRIMARY KEY AUTOINCREMENT,
            Name TEXT NOT NULL,
            Description TEXT NOT NULL,
            ReleasedDate TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Catalogues table ready");
    Ok(())
}
