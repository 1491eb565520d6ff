use directories::ProjectDirs;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::{Path, PathBuf};

use crate::documents::Document;
use crate::error::{DbError, Result};
use crate::schema::SCHEMA;

pub struct FrontdeskDb {
    pool: Pool<Sqlite>,
}

impl FrontdeskDb {
    pub async fn new() -> Result<Self> {
        let db_path = Self::default_path()?;
        Self::new_with_path(&db_path).await
    }

    pub async fn new_with_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&db_url).await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        tracing::info!("Database initialized at: {}", path.display());

        Ok(Self { pool })
    }

    /// A private in-memory database. One connection, so every query sees
    /// the same data.
    pub async fn new_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "frontdesk", "frontdesk").ok_or(DbError::NoDataDir)?;
        Ok(dirs.data_dir().join("frontdesk.db"))
    }

    /// Loads a document, falling back to its initial value.
    ///
    /// A missing or unparseable document is replaced by the initial value,
    /// which is written back immediately.
    pub async fn load<D: Document>(&self) -> Result<D> {
        let row: Option<(String,)> = sqlx::query_as("SELECT body FROM documents WHERE name = ?")
            .bind(D::NAME)
            .fetch_optional(&self.pool)
            .await?;

        let Some((body,)) = row else {
            tracing::debug!(document = D::NAME, "Document missing, seeding defaults");
            let initial = D::initial();
            self.save(&initial).await?;
            return Ok(initial);
        };

        match serde_json::from_str::<D>(&body) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                tracing::warn!(
                    document = D::NAME,
                    error = %e,
                    "Malformed document, resetting to defaults"
                );
                let initial = D::initial();
                self.save(&initial).await?;
                Ok(initial)
            }
        }
    }

    pub async fn save<D: Document>(&self, doc: &D) -> Result<()> {
        let body = serde_json::to_string_pretty(doc)?;
        self.put_raw(D::NAME, &body).await
    }

    /// Writes a raw document body without validation.
    pub async fn put_raw(&self, name: &str, body: &str) -> Result<()> {
        let now = chrono_timestamp();

        sqlx::query(
            r#"INSERT INTO documents (name, body, updated_at) VALUES (?, ?, ?)
               ON CONFLICT(name) DO UPDATE SET
                 body = excluded.body,
                 updated_at = excluded.updated_at"#,
        )
        .bind(name)
        .bind(body)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_raw(&self, name: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT body FROM documents WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(body,)| body))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn chrono_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
