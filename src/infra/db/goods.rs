use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use tracing::debug;

use crate::{
    application::repos::{
        CreateGoodParams, GoodsRepo, GoodsWriteRepo, RepoError, UpdateGoodParams,
    },
    domain::entities::{GoodKey, GoodRecord},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct GoodRow {
    id: i32,
    project_id: i32,
    name: String,
    description: Option<String>,
    priority: i32,
    removed: bool,
    created_at: OffsetDateTime,
}

impl From<GoodRow> for GoodRecord {
    fn from(row: GoodRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            description: row.description.unwrap_or_default(),
            priority: row.priority,
            removed: row.removed,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl GoodsRepo for PostgresRepositories {
    async fn find_by_id(&self, id: i32) -> Result<Option<GoodRecord>, RepoError> {
        let row = sqlx::query_as::<_, GoodRow>(
            r#"
            SELECT id, project_id, name, description, priority, removed, created_at
            FROM goods
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(GoodRecord::from))
    }

    async fn list_goods(&self, limit: i64, offset: i64) -> Result<Vec<GoodRecord>, RepoError> {
        let rows = sqlx::query_as::<_, GoodRow>(
            r#"
            SELECT id, project_id, name, description, priority, removed, created_at
            FROM goods
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(GoodRecord::from).collect())
    }

    async fn count_goods(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM goods")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn count_removed(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM goods WHERE removed")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}

#[async_trait]
impl GoodsWriteRepo for PostgresRepositories {
    async fn create_good(&self, params: CreateGoodParams) -> Result<i32, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        Self::lock_project(&mut tx, params.project_id).await?;
        let priority = Self::next_priority(&mut tx, params.project_id).await?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO goods (project_id, name, description, priority)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(params.project_id)
        .bind(&params.name)
        .bind(params.description.as_deref())
        .bind(priority)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(
            target = "goods::infra::db::goods",
            id,
            project_id = params.project_id,
            priority,
            "Inserted good"
        );
        Ok(id)
    }

    async fn update_good(&self, params: UpdateGoodParams) -> Result<(), RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"
            UPDATE goods
            SET name = $1,
                description = $2
            WHERE id = $3 AND project_id = $4
            "#,
        )
        .bind(&params.name)
        .bind(&params.description)
        .bind(params.key.id)
        .bind(params.key.project_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn soft_delete_good(&self, key: GoodKey) -> Result<(), RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query("UPDATE goods SET removed = TRUE WHERE id = $1 AND project_id = $2")
            .bind(key.id)
            .bind(key.project_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

impl PostgresRepositories {
    /// Serializes priority assignment for concurrent creates in one project.
    async fn lock_project(
        tx: &mut Transaction<'_, Postgres>,
        project_id: i32,
    ) -> Result<(), RepoError> {
        let locked: Option<i32> =
            sqlx::query_scalar("SELECT id FROM projects WHERE id = $1 FOR UPDATE")
                .bind(project_id)
                .fetch_optional(tx.as_mut())
                .await
                .map_err(map_sqlx_error)?;

        match locked {
            Some(_) => Ok(()),
            None => Err(RepoError::InvalidInput {
                message: format!("project {project_id} does not exist"),
            }),
        }
    }

    async fn next_priority(
        tx: &mut Transaction<'_, Postgres>,
        project_id: i32,
    ) -> Result<i32, RepoError> {
        sqlx::query_scalar("SELECT COALESCE(MAX(priority) + 1, 0) FROM goods WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(tx.as_mut())
            .await
            .map_err(map_sqlx_error)
    }
}
