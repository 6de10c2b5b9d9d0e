//! Submission persistence
//!
//! Create-if-absent, else update. Every write carries a snapshot fingerprint
//! so retrying the same payload leaves the record unchanged.

use crate::auth::UserToken;
use crate::error::PrepCoachError;
use crate::models::{Answers, Submission, SubmissionPatch};
use crate::Result;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

pub mod postgres;

pub use postgres::PgSubmissionStore;

/// Persistence collaborator
#[async_trait::async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn create_submission(
        &self,
        token: &UserToken,
        answers: &Answers,
        summary: Option<&str>,
    ) -> Result<Uuid>;

    async fn update_submission(
        &self,
        token: &UserToken,
        submission_id: Uuid,
        patch: SubmissionPatch,
    ) -> Result<()>;

    async fn get_submission(&self, token: &UserToken, submission_id: Uuid)
        -> Result<Option<Submission>>;

    /// Drafts owned by the user, oldest first
    async fn list_submissions(&self, token: &UserToken) -> Result<Vec<Submission>>;
}

/// SHA-256 over the serialized snapshot
pub fn snapshot_fingerprint(answers: &Answers, summary: Option<&str>) -> String {
    let mut hasher = Sha256::new();

    // Stream JSON directly into hasher (no intermediate String)
    if serde_json::to_writer(&mut HashWriter(&mut hasher), &(answers, summary)).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Apply a patch in place. Returns false when nothing changed.
pub(crate) fn apply_patch(submission: &mut Submission, patch: SubmissionPatch) -> bool {
    let answers = patch.answers.unwrap_or_else(|| submission.answers.clone());
    let summary = patch.summary.or_else(|| submission.summary_text.clone());
    let fingerprint = snapshot_fingerprint(&answers, summary.as_deref());

    if fingerprint == submission.fingerprint {
        return false;
    }

    submission.answers = answers;
    submission.summary_text = summary;
    submission.fingerprint = fingerprint;
    submission.updated_at = Utc::now();
    true
}

/// In-memory store for development and tests
pub struct InMemorySubmissionStore {
    submissions: Arc<RwLock<HashMap<Uuid, Submission>>>,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self {
            submissions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySubmissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn create_submission(
        &self,
        token: &UserToken,
        answers: &Answers,
        summary: Option<&str>,
    ) -> Result<Uuid> {
        let now = Utc::now();
        let submission = Submission {
            id: Uuid::new_v4(),
            user_id: token.owner_id(),
            answers: answers.clone(),
            summary_text: summary.map(str::to_string),
            fingerprint: snapshot_fingerprint(answers, summary),
            created_at: now,
            updated_at: now,
        };

        let id = submission.id;
        let mut submissions = self.submissions.write().await;
        submissions.insert(id, submission);

        debug!(submission_id = %id, "Submission created");
        Ok(id)
    }

    async fn update_submission(
        &self,
        token: &UserToken,
        submission_id: Uuid,
        patch: SubmissionPatch,
    ) -> Result<()> {
        let mut submissions = self.submissions.write().await;

        let submission = submissions
            .get_mut(&submission_id)
            .filter(|s| s.user_id == token.owner_id())
            .ok_or_else(|| {
                PrepCoachError::Persistence(format!("Submission {} not found", submission_id))
            })?;

        if !apply_patch(submission, patch) {
            debug!(submission_id = %submission_id, "Submission unchanged, skipping write");
        }

        Ok(())
    }

    async fn get_submission(
        &self,
        token: &UserToken,
        submission_id: Uuid,
    ) -> Result<Option<Submission>> {
        let submissions = self.submissions.read().await;
        Ok(submissions
            .get(&submission_id)
            .filter(|s| s.user_id == token.owner_id())
            .cloned())
    }

    async fn list_submissions(&self, token: &UserToken) -> Result<Vec<Submission>> {
        let owner = token.owner_id();
        let submissions = self.submissions.read().await;

        let mut items: Vec<Submission> = submissions
            .values()
            .filter(|s| s.user_id == owner)
            .cloned()
            .collect();

        items.sort_by_key(|s| s.created_at);
        Ok(items)
    }
}
