//! Postgres-backed submission store

use super::{apply_patch, snapshot_fingerprint, SubmissionStore};
use crate::auth::UserToken;
use crate::error::PrepCoachError;
use crate::models::{Answers, Submission, SubmissionPatch};
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

pub struct PgSubmissionStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PgSubmissionStore {
    /// Lazily connecting pool; no I/O happens until the first query.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)
            .map_err(|e| {
                PrepCoachError::Database(format!("Failed to configure postgres pool: {}", e))
            })?;

        info!("Submission store backend: postgres");

        Ok(Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        })
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS prepcoach_submissions (
                      id UUID PRIMARY KEY,
                      user_id UUID NOT NULL,
                      answers_json TEXT NOT NULL,
                      summary_text TEXT,
                      fingerprint TEXT NOT NULL,
                      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                      updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_prepcoach_submissions_user_time
                    ON prepcoach_submissions (user_id, created_at);
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                PrepCoachError::Database(format!(
                    "Failed to initialize submission schema: {}",
                    e
                ))
            })?;

        Ok(())
    }

    fn row_to_submission(row: &PgRow) -> Result<Submission> {
        let answers_json: String = row
            .try_get("answers_json")
            .map_err(|e| PrepCoachError::Database(format!("Bad answers column: {}", e)))?;
        let answers: Answers = serde_json::from_str(&answers_json)?;

        let get_err = |e: sqlx::Error| PrepCoachError::Database(format!("Bad submission row: {}", e));

        Ok(Submission {
            id: row.try_get("id").map_err(get_err)?,
            user_id: row.try_get("user_id").map_err(get_err)?,
            answers,
            summary_text: row.try_get("summary_text").map_err(get_err)?,
            fingerprint: row.try_get("fingerprint").map_err(get_err)?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(get_err)?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(get_err)?,
        })
    }
}

#[async_trait::async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn create_submission(
        &self,
        token: &UserToken,
        answers: &Answers,
        summary: Option<&str>,
    ) -> Result<Uuid> {
        self.ensure_schema().await?;

        let id = Uuid::new_v4();
        let answers_json = serde_json::to_string(answers)?;

        sqlx::query(
            r#"
            INSERT INTO prepcoach_submissions
              (id, user_id, answers_json, summary_text, fingerprint, created_at, updated_at)
            VALUES
              ($1, $2, $3, $4, $5, $6, $6)
            "#,
        )
        .bind(id)
        .bind(token.owner_id())
        .bind(answers_json)
        .bind(summary)
        .bind(snapshot_fingerprint(answers, summary))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| PrepCoachError::Persistence(format!("Failed to create submission: {}", e)))?;

        debug!(submission_id = %id, "Submission created");
        Ok(id)
    }

    async fn update_submission(
        &self,
        token: &UserToken,
        submission_id: Uuid,
        patch: SubmissionPatch,
    ) -> Result<()> {
        let mut submission = self
            .get_submission(token, submission_id)
            .await?
            .ok_or_else(|| {
                PrepCoachError::Persistence(format!("Submission {} not found", submission_id))
            })?;

        if !apply_patch(&mut submission, patch) {
            debug!(submission_id = %submission_id, "Submission unchanged, skipping write");
            return Ok(());
        }

        sqlx::query(
            r#"
            UPDATE prepcoach_submissions
            SET answers_json = $3, summary_text = $4, fingerprint = $5, updated_at = $6
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(submission_id)
        .bind(token.owner_id())
        .bind(serde_json::to_string(&submission.answers)?)
        .bind(&submission.summary_text)
        .bind(&submission.fingerprint)
        .bind(submission.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PrepCoachError::Persistence(format!("Failed to update submission: {}", e)))?;

        Ok(())
    }

    async fn get_submission(
        &self,
        token: &UserToken,
        submission_id: Uuid,
    ) -> Result<Option<Submission>> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            SELECT id, user_id, answers_json, summary_text, fingerprint, created_at, updated_at
            FROM prepcoach_submissions
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(submission_id)
        .bind(token.owner_id())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PrepCoachError::Persistence(format!("Failed to load submission: {}", e)))?;

        row.as_ref().map(Self::row_to_submission).transpose()
    }

    async fn list_submissions(&self, token: &UserToken) -> Result<Vec<Submission>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            r#"
            SELECT id, user_id, answers_json, summary_text, fingerprint, created_at, updated_at
            FROM prepcoach_submissions
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(token.owner_id())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PrepCoachError::Persistence(format!("Failed to list submissions: {}", e)))?;

        rows.iter().map(Self::row_to_submission).collect()
    }
}
