use std::future::Future;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::clock::Clock;
use crate::domain::NewSubmissionItem;
use crate::domain::ObjectSummary;
use crate::domain::SubmissionItem;
use crate::domain::SubmissionStatus;
use crate::errors::RepositoryError;

/// Outcome of `lock_and_replace_oldest_by_status`. `Found` is returned whenever a
/// candidate row was leased, whatever the caller-supplied closure did with it — its own
/// `Result` is nested inside so a drain loop can still `match` on `Found`/`NotFound` to
/// decide whether to keep draining, while the closure's error remains available for
/// logging. The leased row's `sdes_correlation_id` travels alongside the `Result` so a
/// drain loop can exclude it from the next iteration even when the closure failed.
/// `NotFound` means no eligible row existed (all done, all currently locked, or all
/// already attempted this tick).
pub enum LockAndReplaceOutcome<T> {
    Found(Uuid, Result<T, anyhow::Error>),
    NotFound,
}

struct SubmissionItemRow {
    id: String,
    owner: String,
    sdes_correlation_id: Uuid,
    callback_url: String,
    status: SubmissionStatus,
    object_summary: Option<Json<ObjectSummary>>,
    failure_reason: Option<String>,
    last_updated: DateTime<Utc>,
    locked_at: Option<DateTime<Utc>>,
    failure_count: i32,
}

impl From<SubmissionItemRow> for SubmissionItem {
    fn from(row: SubmissionItemRow) -> Self {
        Self {
            id: row.id,
            owner: row.owner,
            sdes_correlation_id: row.sdes_correlation_id,
            callback_url: row.callback_url,
            status: row.status,
            object_summary: row.object_summary.map(|Json(inner)| inner),
            failure_reason: row.failure_reason,
            last_updated: row.last_updated,
            locked_at: row.locked_at,
            failure_count: row.failure_count,
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

/// Durable, primary-key'd storage of `SubmissionItem`, backed by Postgres.
///
/// The only shared mutable state in the service: every worker and HTTP handler reaches
/// `SubmissionItem` only through here, never by touching `submission_item` directly.
pub struct SubmissionRepository {
    pool: PgPool,
    clock: Arc<dyn Clock>,
    lock_ttl: Duration,
}

impl SubmissionRepository {
    pub fn new(
        pool: PgPool,
        clock: Arc<dyn Clock>,
        lock_ttl: Duration,
    ) -> Self {
        Self { pool, clock, lock_ttl }
    }

    /// Rejects if `(owner, id)` or `sdes_correlation_id` already exists. Stamps
    /// `last_updated`; the caller never supplies it.
    #[tracing::instrument(skip_all, fields(owner = %new_item.owner, id = %new_item.id))]
    pub async fn insert(
        &self,
        new_item: NewSubmissionItem,
    ) -> Result<SubmissionItem, RepositoryError> {
        let now = self.clock.now();
        let item = SubmissionItem {
            id: new_item.id,
            owner: new_item.owner,
            sdes_correlation_id: new_item.sdes_correlation_id,
            callback_url: new_item.callback_url,
            status: SubmissionStatus::Submitted,
            object_summary: Some(new_item.object_summary),
            failure_reason: None,
            last_updated: now,
            locked_at: None,
            failure_count: 0,
        };
        let object_summary = item.object_summary.clone().map(Json);

        let result = sqlx::query!(
            r#"
            INSERT INTO submission_item
                (id, owner, sdes_correlation_id, callback_url, status, object_summary,
                 failure_reason, last_updated, locked_at, failure_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
            item.id,
            item.owner,
            item.sdes_correlation_id,
            item.callback_url,
            item.status as SubmissionStatus,
            object_summary as _,
            item.failure_reason,
            item.last_updated,
            item.locked_at,
            item.failure_count,
        )
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(item),
            Err(e) if is_unique_violation(&e) => Err(RepositoryError::Duplicate),
            Err(e) => Err(RepositoryError::Storage(e)),
        }
    }

    pub async fn get_by_owner_and_id(
        &self,
        owner: &str,
        id: &str,
    ) -> Result<Option<SubmissionItem>, RepositoryError> {
        let row = sqlx::query_as!(
            SubmissionItemRow,
            r#"
            SELECT
                id, owner, sdes_correlation_id, callback_url,
                status as "status: SubmissionStatus",
                object_summary as "object_summary: Json<ObjectSummary>",
                failure_reason, last_updated, locked_at, failure_count
            FROM submission_item
            WHERE owner = $1 AND id = $2
            "#,
            owner,
            id,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SubmissionItem::from))
    }

    pub async fn get_by_correlation_id(
        &self,
        sdes_correlation_id: Uuid,
    ) -> Result<Option<SubmissionItem>, RepositoryError> {
        let row = sqlx::query_as!(
            SubmissionItemRow,
            r#"
            SELECT
                id, owner, sdes_correlation_id, callback_url,
                status as "status: SubmissionStatus",
                object_summary as "object_summary: Json<ObjectSummary>",
                failure_reason, last_updated, locked_at, failure_count
            FROM submission_item
            WHERE sdes_correlation_id = $1
            "#,
            sdes_correlation_id,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SubmissionItem::from))
    }

    /// Used by admin/inspection tooling; not on the hot path of any worker.
    pub async fn list(
        &self,
        owner: &str,
        status: Option<SubmissionStatus>,
        created_before: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SubmissionItem>, RepositoryError> {
        let status = status.map(|s| s.to_string());
        let rows = sqlx::query_as!(
            SubmissionItemRow,
            r#"
            SELECT
                id, owner, sdes_correlation_id, callback_url,
                status as "status: SubmissionStatus",
                object_summary as "object_summary: Json<ObjectSummary>",
                failure_reason, last_updated, locked_at, failure_count
            FROM submission_item
            WHERE owner = $1
              AND ($2::TEXT IS NULL OR status = $2::TEXT)
              AND ($3::TIMESTAMPTZ IS NULL OR last_updated < $3)
            ORDER BY last_updated ASC
            LIMIT $4 OFFSET $5
            "#,
            owner,
            status,
            created_before,
            limit,
            offset,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(SubmissionItem::from).collect())
    }

    /// `failure_reason = None` erases any existing reason; `Some(_)` replaces it.
    pub async fn update_by_owner_and_id(
        &self,
        owner: &str,
        id: &str,
        new_status: SubmissionStatus,
        failure_reason: Option<String>,
    ) -> Result<SubmissionItem, RepositoryError> {
        let now = self.clock.now();
        let row = sqlx::query_as!(
            SubmissionItemRow,
            r#"
            UPDATE submission_item
            SET status = $1, failure_reason = $2, last_updated = $3
            WHERE owner = $4 AND id = $5
            RETURNING
                id, owner, sdes_correlation_id, callback_url,
                status as "status: SubmissionStatus",
                object_summary as "object_summary: Json<ObjectSummary>",
                failure_reason, last_updated, locked_at, failure_count
            "#,
            new_status as SubmissionStatus,
            failure_reason,
            now,
            owner,
            id,
        )
        .fetch_optional(&self.pool)
        .await?;
        row.map(SubmissionItem::from).ok_or(RepositoryError::NothingToUpdate)
    }

    pub async fn update_by_correlation_id(
        &self,
        sdes_correlation_id: Uuid,
        new_status: SubmissionStatus,
        failure_reason: Option<String>,
    ) -> Result<SubmissionItem, RepositoryError> {
        let now = self.clock.now();
        let row = sqlx::query_as!(
            SubmissionItemRow,
            r#"
            UPDATE submission_item
            SET status = $1, failure_reason = $2, last_updated = $3
            WHERE sdes_correlation_id = $4
            RETURNING
                id, owner, sdes_correlation_id, callback_url,
                status as "status: SubmissionStatus",
                object_summary as "object_summary: Json<ObjectSummary>",
                failure_reason, last_updated, locked_at, failure_count
            "#,
            new_status as SubmissionStatus,
            failure_reason,
            now,
            sdes_correlation_id,
        )
        .fetch_optional(&self.pool)
        .await?;
        row.map(SubmissionItem::from).ok_or(RepositoryError::NothingToUpdate)
    }

    /// Idempotent: succeeds (as a no-op) if no such row exists.
    pub async fn remove_by_owner_and_id(
        &self,
        owner: &str,
        id: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query!(
            "DELETE FROM submission_item WHERE owner = $1 AND id = $2",
            owner,
            id,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Lease the oldest-by-`last_updated` item in `status` whose lock (if any) has
    /// expired and whose `sdes_correlation_id` isn't in `exclude`, hand it to `f`, and
    /// commit `f`'s replacement. The row is selected with `FOR UPDATE SKIP LOCKED`
    /// inside a transaction that also writes `locked_at`, so two callers racing to
    /// lease the same row can't both see it: the loser's `SELECT` either blocks behind
    /// the winner's row lock and then excludes it (its `locked_at` is fresh once the
    /// winner commits) or skips it outright while the winner still holds the lock,
    /// exactly as the teacher's `dequeue` does for its delivery queue. `exclude` is how
    /// a drain loop gives every eligible item at most one attempt per tick: a worker
    /// accumulates the ids it has already attempted and excludes them, rather than
    /// re-leasing the same item back-to-back after a failure within one tick.
    #[tracing::instrument(skip_all, fields(status = %status))]
    pub async fn lock_and_replace_oldest_by_status<F, Fut>(
        &self,
        status: SubmissionStatus,
        exclude: &[Uuid],
        f: F,
    ) -> Result<LockAndReplaceOutcome<SubmissionItem>, RepositoryError>
    where
        F: FnOnce(SubmissionItem) -> Fut,
        Fut: Future<Output = Result<SubmissionItem, anyhow::Error>>,
    {
        let now = self.clock.now();
        let lock_cutoff = now - self.lock_ttl;

        let mut transaction = self.pool.begin().await?;

        let row = sqlx::query_as!(
            SubmissionItemRow,
            r#"
            SELECT
                id, owner, sdes_correlation_id, callback_url,
                status as "status: SubmissionStatus",
                object_summary as "object_summary: Json<ObjectSummary>",
                failure_reason, last_updated, locked_at, failure_count
            FROM submission_item
            WHERE status = $1
              AND (locked_at IS NULL OR locked_at < $2)
              AND NOT (sdes_correlation_id = ANY($3))
            ORDER BY last_updated ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
            status as SubmissionStatus,
            lock_cutoff,
            exclude,
        )
        .fetch_optional(&mut *transaction)
        .await?;

        let Some(row) = row else {
            transaction.commit().await?;
            return Ok(LockAndReplaceOutcome::NotFound);
        };
        let item = SubmissionItem::from(row);

        sqlx::query!(
            "UPDATE submission_item SET locked_at = $1 WHERE sdes_correlation_id = $2",
            now,
            item.sdes_correlation_id,
        )
        .execute(&mut *transaction)
        .await?;

        transaction.commit().await?;

        match f(item.clone()).await {
            Ok(replacement) => {
                let commit_now = self.clock.now();
                let object_summary = replacement.object_summary.clone().map(Json);
                sqlx::query!(
                    r#"
                    UPDATE submission_item
                    SET status = $1, object_summary = $2, failure_reason = $3,
                        failure_count = $4, locked_at = NULL, last_updated = $5
                    WHERE sdes_correlation_id = $6
                    "#,
                    replacement.status as SubmissionStatus,
                    object_summary as _,
                    replacement.failure_reason,
                    replacement.failure_count,
                    commit_now,
                    item.sdes_correlation_id,
                )
                .execute(&self.pool)
                .await?;
                Ok(LockAndReplaceOutcome::Found(item.sdes_correlation_id, Ok(replacement)))
            }
            Err(e) => {
                sqlx::query!(
                    "UPDATE submission_item SET locked_at = NULL WHERE sdes_correlation_id = $1",
                    item.sdes_correlation_id,
                )
                .execute(&self.pool)
                .await?;
                Ok(LockAndReplaceOutcome::Found(item.sdes_correlation_id, Err(e)))
            }
        }
    }

    /// Bulk-transition every `{Processed, Failed}` item whose `failure_count` has reached
    /// `max_failures` to `CallbackFailed`. Returns the number of rows promoted.
    pub async fn promote_exhausted_callbacks(
        &self,
        max_failures: i32,
    ) -> Result<u64, RepositoryError> {
        let now = self.clock.now();
        let result = sqlx::query!(
            r#"
            UPDATE submission_item
            SET status = $1, last_updated = $2
            WHERE status IN ($3, $4) AND failure_count >= $5
            "#,
            SubmissionStatus::CallbackFailed as SubmissionStatus,
            now,
            SubmissionStatus::Processed as SubmissionStatus,
            SubmissionStatus::Failed as SubmissionStatus,
            max_failures,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
