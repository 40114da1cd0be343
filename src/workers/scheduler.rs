use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;

/// Run `f` every `interval`, starting after `initial_delay`, until `shutdown` fires.
/// Ticks are serial: a tick that overruns `interval` delays the next tick rather than
/// overlapping with it, because the loop only starts timing the next wait after `f`
/// returns (`tokio::time::interval` would instead let ticks stack up, which the spec's
/// "no overlap" guarantee rules out).
///
/// `f`'s errors are caught and logged; a failing tick never stops the schedule, mirroring
/// the teacher's `expire_keys_loop`.
pub async fn run_periodic<F, Fut>(
    interval: Duration,
    initial_delay: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut f: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), anyhow::Error>>,
{
    tokio::select! {
        _ = tokio::time::sleep(initial_delay) => {}
        _ = shutdown.changed() => return,
    }

    loop {
        if *shutdown.borrow() {
            return;
        }

        if let Err(e) = f().await {
            tracing::error!(error.cause_chain = ?e, error.message = %e, "worker tick failed");
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => return,
        }
    }
}
