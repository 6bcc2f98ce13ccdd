use crate::types::tables::{NewStudent, Student, StudentChanges, SyncUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::Postgres, types::Json, Pool};
use thiserror::Error;

type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("student not found")]
    NotFound,
    #[error("a student with the same email or handle already exists")]
    Conflict,
    #[error("failed to query the student store")]
    Database(#[from] sqlx::Error),
}

/// The persistent student record store.
///
/// The sync subsystem is the only writer of the sync-derived fields
/// (`apply_sync`, `record_reminder`); the CRUD layer owns the identity
/// fields and is the only source of deletions.
#[async_trait]
pub trait StudentStore {
    async fn find_all(&self) -> Result<Vec<Student>>;
    async fn find_by_id(&self, id: i64) -> Result<Student>;
    async fn find_by_handle(&self, handle: &str) -> Result<Student>;
    async fn create(&self, new: &NewStudent) -> Result<Student>;
    async fn update_profile(&self, id: i64, changes: &StudentChanges) -> Result<Student>;
    async fn apply_sync(&self, id: i64, update: &SyncUpdate) -> Result<Student>;
    async fn record_reminder(&self, id: i64, sent_at: DateTime<Utc>) -> Result<Student>;
    async fn delete(&self, id: i64) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct PgStudentStore {
    pool: Pool<Postgres>,
}

impl PgStudentStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        PgStudentStore { pool }
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1;").execute(&self.pool).await?;
        Ok(())
    }
}

fn map_write_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => StoreError::Conflict,
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl StudentStore for PgStudentStore {
    async fn find_all(&self) -> Result<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(
            r#"
            SELECT * FROM students ORDER BY created_at DESC;
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(students)
    }

    async fn find_by_id(&self, id: i64) -> Result<Student> {
        sqlx::query_as::<_, Student>(
            r#"
            SELECT * FROM students WHERE id = $1;
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Student> {
        sqlx::query_as::<_, Student>(
            r#"
            SELECT * FROM students WHERE handle = $1;
            "#,
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn create(&self, new: &NewStudent) -> Result<Student> {
        sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students (name, email, phone, handle)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.handle)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update_profile(&self, id: i64, changes: &StudentChanges) -> Result<Student> {
        sqlx::query_as::<_, Student>(
            r#"
            UPDATE students
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                handle = COALESCE($5, handle),
                email_reminders_enabled = COALESCE($6, email_reminders_enabled),
                updated_at = now()
            WHERE id = $1
            RETURNING *;
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.phone.as_deref())
        .bind(changes.handle.as_deref())
        .bind(changes.email_reminders_enabled)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?
        .ok_or(StoreError::NotFound)
    }

    async fn apply_sync(&self, id: i64, update: &SyncUpdate) -> Result<Student> {
        // One statement, so a concurrent reader never observes a fresh
        // last_synced_at paired with stale contest or submission data.
        sqlx::query_as::<_, Student>(
            r#"
            UPDATE students
            SET current_rating = $2,
                max_rating = $3,
                contests = $4,
                submissions = $5,
                last_synced_at = $6,
                updated_at = now()
            WHERE id = $1
            RETURNING *;
            "#,
        )
        .bind(id)
        .bind(update.current_rating)
        .bind(update.max_rating)
        .bind(Json(&update.contests))
        .bind(Json(&update.submissions))
        .bind(update.last_synced_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn record_reminder(&self, id: i64, sent_at: DateTime<Utc>) -> Result<Student> {
        sqlx::query_as::<_, Student>(
            r#"
            UPDATE students
            SET reminder_count = reminder_count + 1,
                last_reminder_sent_at = $2,
                updated_at = now()
            WHERE id = $1
            RETURNING *;
            "#,
        )
        .bind(id)
        .bind(sent_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM students WHERE id = $1;
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}
