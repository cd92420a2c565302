use std::sync::Arc;

use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::Row;

use crate::connection::ConnectionManager;
use crate::error::{CatalogError, CatalogResult};
use crate::models::Catalog;
use crate::CatalogStore;

const SELECT_ALL: &str =
    "SELECT Id, Name, Description, ReleasedDate FROM Catalogues ORDER BY Id";
const SELECT_BY_ID: &str =
    "SELECT Id, Name, Description, ReleasedDate FROM Catalogues WHERE Id = $1";

/// SQL-backed [`CatalogStore`]. Cloning shares the underlying connection
/// manager.
#[derive(Clone)]
pub struct CatalogRepository {
    connections: Arc<ConnectionManager>,
}

impl CatalogRepository {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    async fn create(&self, catalog: &Catalog) -> CatalogResult<i64> {
        let pool = self.connections.ensure_live().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO Catalogues (Name, Description, ReleasedDate)
            VALUES ($1, $2, $3)
            RETURNING Id
            "#,
        )
        .bind(&catalog.name)
        .bind(&catalog.description)
        .bind(&catalog.released_date)
        .fetch_optional(&pool)
        .await?;

        let id = match row {
            Some(row) => row.try_get::<i64, _>(0)?,
            None => return Err(CatalogError::MissingIdentity),
        };

        tracing::debug!(id, "Inserted catalog");
        Ok(id)
    }

    async fn read_all(&self) -> CatalogResult<Vec<Catalog>> {
        let pool = self.connections.ensure_live().await?;

        let rows = sqlx::query(SELECT_ALL).fetch_all(&pool).await?;

        let mut catalogs = Vec::with_capacity(rows.len());
        for row in rows {
            let catalog = catalog_from_row(&row)?;
            tracing::debug!(
                id = catalog.id,
                name = %catalog.name,
                description = %catalog.description,
                released_date = %catalog.released_date,
                "Read catalog row"
            );
            catalogs.push(catalog);
        }

        Ok(catalogs)
    }

    async fn find(&self, id: i64) -> CatalogResult<Option<Catalog>> {
        let pool = self.connections.ensure_live().await?;

        let row = sqlx::query(SELECT_BY_ID)
            .bind(id)
            .fetch_optional(&pool)
            .await?;

        Ok(row.as_ref().map(catalog_from_row).transpose()?)
    }

    async fn update(&self, catalog: &Catalog) -> CatalogResult<u64> {
        let pool = self.connections.ensure_live().await?;

        let result = sqlx::query(
            "UPDATE Catalogues SET Name = $1, Description = $2, ReleasedDate = $3 WHERE Id = $4",
        )
        .bind(&catalog.name)
        .bind(&catalog.description)
        .bind(&catalog.released_date)
        .bind(catalog.id)
        .execute(&pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: i64) -> CatalogResult<u64> {
        let pool = self.connections.ensure_live().await?;

        let result = sqlx::query("DELETE FROM Catalogues WHERE Id = $1")
            .bind(id)
            .execute(&pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> CatalogResult<()> {
        self.connections.ensure_live().await.map(|_| ())
    }
}

fn catalog_from_row(row: &AnyRow) -> Result<Catalog, sqlx::Error> {
    Ok(Catalog {
        id: row.try_get(0)?,
        name: row.try_get(1)?,
        description: row.try_get(2)?,
        released_date: row.try_get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::DatabaseSettings;
    use crate::schema::create_sqlite_catalogues_table;

    struct Fixture {
        repo: CatalogRepository,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalogues.db");
        let settings = DatabaseSettings::from_url(format!("sqlite://{}?mode=rwc", path.display()));
        let connections = Arc::new(ConnectionManager::new(settings));

        let pool = connections.connect().await.unwrap();
        create_sqlite_catalogues_table(&pool).await.unwrap();

        Fixture {
            repo: CatalogRepository::new(connections),
            _dir: dir,
        }
    }

    fn catalog(name: &str, description: &str, released_date: &str) -> Catalog {
        Catalog {
            id: 0,
            name: name.to_string(),
            description: description.to_string(),
            released_date: released_date.to_string(),
        }
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids() {
        let Fixture { repo, _dir } = fixture().await;

        let first = repo.create(&catalog("A", "d", "2020-01-01")).await.unwrap();
        let second = repo.create(&catalog("B", "e", "2021-02-02")).await.unwrap();

        assert_eq!(first, 1);
        assert!(second > first);
    }

    #[tokio::test]
    async fn create_ignores_supplied_id() {
        let Fixture { repo, _dir } = fixture().await;

        let mut input = catalog("A", "d", "2020-01-01");
        input.id = 42;
        let id = repo.create(&input).await.unwrap();

        assert_eq!(id, 1);
        assert!(repo.find(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_all_returns_rows_in_id_order() {
        let Fixture { repo, _dir } = fixture().await;
        assert!(repo.read_all().await.unwrap().is_empty());

        repo.create(&catalog("A", "d", "2020-01-01")).await.unwrap();
        repo.create(&catalog("B", "e", "whenever")).await.unwrap();

        let all = repo.read_all().await.unwrap();
        let names: Vec<_> = all.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(all[1].released_date, "whenever");
    }

    #[tokio::test]
    async fn find_returns_stored_fields() {
        let Fixture { repo, _dir } = fixture().await;
        let id = repo.create(&catalog("A", "d", "2020-01-01")).await.unwrap();

        let found = repo.find(id).await.unwrap().unwrap();
        assert_eq!(
            found,
            Catalog {
                id,
                ..catalog("A", "d", "2020-01-01")
            }
        );
        assert!(repo.find(id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_reports_affected_rows() {
        let Fixture { repo, _dir } = fixture().await;
        let id = repo.create(&catalog("A", "d", "2020-01-01")).await.unwrap();

        let changed = Catalog {
            id,
            ..catalog("A2", "d2", "2022-02-02")
        };
        assert_eq!(repo.update(&changed).await.unwrap(), 1);
        assert_eq!(repo.find(id).await.unwrap().unwrap(), changed);

        let missing = Catalog {
            id: id + 100,
            ..catalog("X", "x", "x")
        };
        assert_eq!(repo.update(&missing).await.unwrap(), 0);
        assert_eq!(repo.read_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_reports_affected_rows() {
        let Fixture { repo, _dir } = fixture().await;
        let id = repo.create(&catalog("A", "d", "2020-01-01")).await.unwrap();

        assert_eq!(repo.delete(id).await.unwrap(), 1);
        assert_eq!(repo.delete(id).await.unwrap(), 0);
        assert!(repo.find(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn statement_errors_surface_as_database_errors() {
        let Fixture { repo, _dir } = fixture().await;
        let pool = repo.connections().connect().await.unwrap();
        sqlx::query("DROP TABLE Catalogues").execute(&pool).await.unwrap();

        let err = repo.read_all().await.unwrap_err();
        assert!(matches!(err, CatalogError::Database(_)));
        assert!(repo.connections().is_live().await);
    }

    #[tokio::test]
    async fn recovers_after_connection_loss() {
        let Fixture { repo, _dir } = fixture().await;
        let id = repo.create(&catalog("A", "d", "2020-01-01")).await.unwrap();

        repo.connections().current_pool().await.unwrap().close().await;

        let err = repo.read_all().await.unwrap_err();
        assert!(err.is_connectivity());

        let all = repo.read_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, id);
    }
}
