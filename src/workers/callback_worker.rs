use std::sync::Arc;

use uuid::Uuid;

use crate::domain::SubmissionStatus;
use crate::repository::LockAndReplaceOutcome;
use crate::repository::SubmissionRepository;
use crate::services::CallbackClient;

/// Drain both terminal-from-SDES queues (`Processed`, `Failed`), POSTing the client
/// callback for each item. A `200` response completes the item; anything else
/// increments `failureCount` and leaves the item queued for the next tick. Note this
/// outcome is committed as `Ok(..)`, not propagated as an error: unlike the SDES
/// worker, a callback failure is itself progress (the attempt count advances) rather
/// than a no-op to retry unchanged. Each item still gets at most one attempt per tick
/// — the just-attempted id is excluded from the rest of the drain regardless of
/// outcome, so a persistently failing callback endpoint can't be hammered thousands of
/// times within a single tick before the failure worker gets a chance to promote it.
#[tracing::instrument(skip_all)]
pub async fn run_once(
    repository: &SubmissionRepository,
    callback: &Arc<CallbackClient>,
) -> Result<(), anyhow::Error> {
    drain(repository, callback, SubmissionStatus::Processed).await?;
    drain(repository, callback, SubmissionStatus::Failed).await?;
    Ok(())
}

async fn drain(
    repository: &SubmissionRepository,
    callback: &Arc<CallbackClient>,
    status: SubmissionStatus,
) -> Result<(), anyhow::Error> {
    let mut attempted = Vec::<Uuid>::new();
    loop {
        let outcome = repository
            .lock_and_replace_oldest_by_status(status, &attempted, |item| {
                let callback = Arc::clone(callback);
                async move {
                    let result = callback
                        .notify(
                            &item.callback_url,
                            &item.id,
                            item.status,
                            item.object_summary.as_ref(),
                            item.failure_reason.as_deref(),
                        )
                        .await;

                    match result {
                        Ok(()) => Ok(item.completed()),
                        Err(e) => {
                            tracing::warn!(
                                id = %item.id,
                                error.cause_chain = ?e,
                                error.message = %e,
                                "callback attempt failed"
                            );
                            Ok(item.with_incremented_failure_count())
                        }
                    }
                }
            })
            .await?;

        match outcome {
            LockAndReplaceOutcome::Found(correlation_id, Ok(item)) => {
                tracing::info!(id = %item.id, status = %item.status, "callback worker committed item");
                attempted.push(correlation_id);
            }
            LockAndReplaceOutcome::Found(correlation_id, Err(e)) => {
                // The closure above never returns `Err`; a repository-level failure
                // surfaced through the future would land here.
                tracing::error!(error.cause_chain = ?e, error.message = %e, "unexpected callback tick failure");
                attempted.push(correlation_id);
            }
            LockAndReplaceOutcome::NotFound => break,
        }
    }
    Ok(())
}
