mod callback_worker;
mod failure_worker;
pub mod scheduler;
mod sdes_worker;

use std::sync::Arc;

use tokio::sync::watch;

use crate::configuration::Settings;
use crate::repository::SubmissionRepository;
use crate::services::CallbackClient;
use crate::services::SdesClient;

/// Spawn the three background workers on the configured schedules, wired only to
/// the shared `repository` and outbound service clients. Returns when `shutdown`
/// reports `true` and every in-flight tick has finished.
pub async fn run_workers(
    cfg: Settings,
    repository: Arc<SubmissionRepository>,
    sdes: Arc<SdesClient>,
    callback: Arc<CallbackClient>,
    shutdown: watch::Receiver<bool>,
) {
    let sdes_worker = {
        let repository = Arc::clone(&repository);
        let sdes = Arc::clone(&sdes);
        scheduler::run_periodic(
            cfg.workers.sdes_worker_interval(),
            cfg.workers.initial_delay(),
            shutdown.clone(),
            move || {
                let repository = Arc::clone(&repository);
                let sdes = Arc::clone(&sdes);
                async move { sdes_worker::run_once(&repository, &sdes).await }
            },
        )
    };

    let callback_worker = {
        let repository = Arc::clone(&repository);
        let callback = Arc::clone(&callback);
        scheduler::run_periodic(
            cfg.workers.processed_item_worker_interval(),
            cfg.workers.initial_delay(),
            shutdown.clone(),
            move || {
                let repository = Arc::clone(&repository);
                let callback = Arc::clone(&callback);
                async move { callback_worker::run_once(&repository, &callback).await }
            },
        )
    };

    let max_failures = cfg.workers.failed_item_worker_max_failures;
    let failure_worker = {
        let repository = Arc::clone(&repository);
        scheduler::run_periodic(
            cfg.workers.failed_item_worker_interval(),
            cfg.workers.initial_delay(),
            shutdown.clone(),
            move || {
                let repository = Arc::clone(&repository);
                async move { failure_worker::run_once(&repository, max_failures).await }
            },
        )
    };

    tokio::join!(sdes_worker, callback_worker, failure_worker);
}
