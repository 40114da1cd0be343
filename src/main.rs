use std::fmt::Debug;
use std::fmt::Display;

use dms_submission::configuration::get_configuration;
use dms_submission::startup::Application;
use dms_submission::telemetry::get_subscriber;
use dms_submission::telemetry::init_subscriber;
use tokio::task::JoinError;

fn report_exit(
    name: &str,
    outcome: Result<Result<(), impl Debug + Display>, JoinError>,
) {
    match outcome {
        Ok(Ok(())) => {
            tracing::info!("{name} exited gracefully")
        }

        Ok(Err(e)) => {
            tracing::error!(
                error.cause_chain=?e,
                error.message=%e,
                "{name} failed (inner)"
            )
        }

        Err(e) => {
            tracing::error!(
                error.cause_chain=?e,
                error.message=%e,
                "{name} failed (outer)"
            )
        }
    }
}

/// Initialise telemetry, load config, and start the server and its background
/// workers side by side.
#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("dms-submission", "info", std::io::stdout);
    init_subscriber(subscriber);

    let cfg = get_configuration()?;

    let application = Application::build(cfg).await?;
    let server_thread = tokio::spawn(application.run_until_stopped());

    report_exit("API", server_thread.await);

    Ok(())
}
