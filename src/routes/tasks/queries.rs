use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::dto::{NewTask, TaskChanges};
use super::model::Task;
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub is_completed: Option<bool>,
}

/// Every operation is scoped by owner; a task owned by someone else is
/// indistinguishable from one that does not exist.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, owner_id: Uuid, task: &NewTask) -> Result<Task, StoreError>;

    /// One page of the owner's tasks, newest first, plus the total number of
    /// tasks matching `filter`. `page` is 1-based.
    async fn list_tasks(
        &self,
        owner_id: Uuid,
        filter: TaskFilter,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Task>, i64), StoreError>;

    async fn get_task(&self, owner_id: Uuid, id: i64) -> Result<Option<Task>, StoreError>;

    async fn update_task(
        &self,
        owner_id: Uuid,
        id: i64,
        changes: &TaskChanges,
    ) -> Result<Option<Task>, StoreError>;

    /// Returns whether a row was removed.
    async fn delete_task(&self, owner_id: Uuid, id: i64) -> Result<bool, StoreError>;
}

pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn create_task(&self, owner_id: Uuid, task: &NewTask) -> Result<Task, StoreError> {
        let rec = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (owner_id, title, description, is_completed)
            VALUES ($1, $2, $3, $4)
            RETURNING id, owner_id, title, description, created_at, is_completed
            "#,
        )
        .bind(owner_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.is_completed)
        .fetch_one(&self.pool)
        .await?;

        Ok(rec)
    }

    async fn list_tasks(
        &self,
        owner_id: Uuid,
        filter: TaskFilter,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Task>, i64), StoreError> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM tasks
            WHERE owner_id = $1 AND ($2::BOOLEAN IS NULL OR is_completed = $2)
            "#,
        )
        .bind(owner_id)
        .bind(filter.is_completed)
        .fetch_one(&self.pool)
        .await?;

        let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);

        let rec = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, owner_id, title, description, created_at, is_completed
            FROM tasks
            WHERE owner_id = $1 AND ($2::BOOLEAN IS NULL OR is_completed = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(owner_id)
        .bind(filter.is_completed)
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rec, total))
    }

    async fn get_task(&self, owner_id: Uuid, id: i64) -> Result<Option<Task>, StoreError> {
        let rec = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, owner_id, title, description, created_at, is_completed
            FROM tasks
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rec)
    }

    async fn update_task(
        &self,
        owner_id: Uuid,
        id: i64,
        changes: &TaskChanges,
    ) -> Result<Option<Task>, StoreError> {
        let rec = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                is_completed = COALESCE($5, is_completed)
            WHERE id = $2 AND owner_id = $1
            RETURNING id, owner_id, title, description, created_at, is_completed
            "#,
        )
        .bind(owner_id)
        .bind(id)
        .bind(changes.title.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.is_completed)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rec)
    }

    async fn delete_task(&self, owner_id: Uuid, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM tasks
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
