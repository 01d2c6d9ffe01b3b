use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, QueryBuilder, Row, Sqlite,
};
use std::str::FromStr;
use tracing::debug;

use shared::domain::{
    DestroyFilter, NewTutorial, Tutorial, TutorialChanges, TutorialFilter, TutorialId,
};

const TUTORIAL_COLUMNS: &str = "id, title, description, published, created_at, updated_at";

/// Persistence capability the tutorial handlers are written against.
#[async_trait]
pub trait TutorialStore: Send + Sync {
    async fn create(&self, tutorial: NewTutorial) -> Result<Tutorial>;

    /// Records matching `filter`, ordered by id.
    async fn find_all(&self, filter: TutorialFilter) -> Result<Vec<Tutorial>>;

    async fn find_by_key(&self, id: TutorialId) -> Result<Option<Tutorial>>;

    /// Returns the number of rows affected. Empty `changes` touch nothing.
    async fn update(&self, id: TutorialId, changes: TutorialChanges) -> Result<u64>;

    async fn destroy(&self, filter: DestroyFilter) -> Result<u64>;

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);

        // Every connection to `sqlite::memory:` opens a fresh database, so pin
        // the pool to one long-lived connection.
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open sqlite database '{database_url}'"))?;
        let storage = Self { pool };
        storage.ensure_tutorials_table().await?;
        Ok(storage)
    }

    async fn ensure_tutorials_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tutorials (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL CHECK (length(title) > 0),
                description TEXT,
                published   INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure tutorials table exists")?;
        Ok(())
    }
}

#[async_trait]
impl TutorialStore for Storage {
    async fn create(&self, tutorial: NewTutorial) -> Result<Tutorial> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO tutorials (title, description, published, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {TUTORIAL_COLUMNS}"
        ))
        .bind(&tutorial.title)
        .bind(&tutorial.description)
        .bind(tutorial.published)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert tutorial")?;
        let created = tutorial_from_row(&row)?;
        debug!(id = created.id.0, "tutorial inserted");
        Ok(created)
    }

    async fn find_all(&self, filter: TutorialFilter) -> Result<Vec<Tutorial>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {TUTORIAL_COLUMNS} FROM tutorials WHERE 1 = 1"
        ));
        // instr() is case-sensitive where LIKE is not.
        if let Some(title) = filter.title_contains {
            query.push(" AND instr(title, ").push_bind(title).push(") > 0");
        }
        if let Some(published) = filter.published {
            query.push(" AND published = ").push_bind(published);
        }
        query.push(" ORDER BY id ASC");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .context("failed to list tutorials")?;
        rows.iter().map(tutorial_from_row).collect()
    }

    async fn find_by_key(&self, id: TutorialId) -> Result<Option<Tutorial>> {
        let row = sqlx::query(&format!(
            "SELECT {TUTORIAL_COLUMNS} FROM tutorials WHERE id = ?"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to load tutorial {id}"))?;
        row.as_ref().map(tutorial_from_row).transpose()
    }

    async fn update(&self, id: TutorialId, changes: TutorialChanges) -> Result<u64> {
        if changes.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE tutorials SET ");
        {
            let mut assignments = query.separated(", ");
            if let Some(title) = changes.title {
                assignments.push("title = ").push_bind_unseparated(title);
            }
            if let Some(description) = changes.description {
                assignments
                    .push("description = ")
                    .push_bind_unseparated(description);
            }
            if let Some(published) = changes.published {
                assignments
                    .push("published = ")
                    .push_bind_unseparated(published);
            }
            assignments
                .push("updated_at = ")
                .push_bind_unseparated(Utc::now());
        }
        query.push(" WHERE id = ").push_bind(id.0);

        let result = query
            .build()
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to update tutorial {id}"))?;
        Ok(result.rows_affected())
    }

    async fn destroy(&self, filter: DestroyFilter) -> Result<u64> {
        let result = match filter {
            DestroyFilter::ById(id) => sqlx::query("DELETE FROM tutorials WHERE id = ?")
                .bind(id.0)
                .execute(&self.pool)
                .await
                .with_context(|| format!("failed to delete tutorial {id}"))?,
            DestroyFilter::All => sqlx::query("DELETE FROM tutorials")
                .execute(&self.pool)
                .await
                .context("failed to delete tutorials")?,
        };
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }
}

fn tutorial_from_row(row: &SqliteRow) -> Result<Tutorial> {
    Ok(Tutorial {
        id: TutorialId(row.try_get("id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        published: row.try_get("published")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
