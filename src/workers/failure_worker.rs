use crate::repository::SubmissionRepository;

/// Promote every `{Processed, Failed}` item whose `failureCount` has reached
/// `max_failures` to the terminal `CallbackFailed` state, freeing the callback
/// worker from retrying a client that will never answer.
#[tracing::instrument(skip(repository))]
pub async fn run_once(
    repository: &SubmissionRepository,
    max_failures: i32,
) -> Result<(), anyhow::Error> {
    let promoted = repository.promote_exhausted_callbacks(max_failures).await?;
    if promoted > 0 {
        tracing::info!(promoted, "promoted exhausted-callback items to CallbackFailed");
    }
    Ok(())
}
