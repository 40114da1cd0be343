use std::sync::Arc;

use uuid::Uuid;

use crate::domain::SubmissionStatus;
use crate::repository::LockAndReplaceOutcome;
use crate::repository::SubmissionRepository;
use crate::services::SdesClient;

/// Drain every `Submitted` item, notifying SDES and advancing each to `Forwarded`. A
/// notify failure leaves the item in `Submitted` (lock cleared) for the next tick to
/// retry, per the teacher's "never propagate worker errors out of the tick" policy.
/// Each item gets at most one notify attempt per tick: a failed item is added to
/// `attempted` so the next iteration excludes it and moves on to the next eligible
/// item rather than re-leasing the one that just failed.
#[tracing::instrument(skip_all)]
pub async fn run_once(
    repository: &SubmissionRepository,
    sdes: &Arc<SdesClient>,
) -> Result<(), anyhow::Error> {
    let mut attempted = Vec::<Uuid>::new();
    loop {
        let outcome = repository
            .lock_and_replace_oldest_by_status(SubmissionStatus::Submitted, &attempted, |item| {
                let sdes = Arc::clone(sdes);
                async move {
                    let object_summary = item
                        .object_summary
                        .as_ref()
                        .ok_or_else(|| anyhow::anyhow!("submitted item missing object summary"))?;
                    sdes.notify(item.sdes_correlation_id, object_summary).await?;
                    Ok(item.forwarded())
                }
            })
            .await?;

        match outcome {
            LockAndReplaceOutcome::Found(_, Ok(item)) => {
                tracing::info!(id = %item.id, "forwarded submission to SDES");
            }
            LockAndReplaceOutcome::Found(correlation_id, Err(e)) => {
                tracing::warn!(error.cause_chain = ?e, error.message = %e, "SDES notify failed, left for retry");
                attempted.push(correlation_id);
            }
            LockAndReplaceOutcome::NotFound => break,
        }
    }
    Ok(())
}
