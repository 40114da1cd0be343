use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::web;
use actix_web::web::Data;
use actix_web::App;
use actix_web::HttpServer;
use actix_web_lab::middleware::from_fn;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::watch;
use tracing_actix_web::TracingLogger;

use crate::authentication::authenticate_request;
use crate::authentication::Authenticator;
use crate::authentication::StaticTokenAuthenticator;
use crate::clock::SystemClock;
use crate::configuration::DatabaseSettings;
use crate::configuration::Settings;
use crate::repository::SubmissionRepository;
use crate::routes::health_check;
use crate::routes::sdes_callback_handler;
use crate::routes::submit_handler;
use crate::services::CallbackClient;
use crate::services::ObjectStoreClient;
use crate::services::SdesClient;
use crate::workers::run_workers;

/// Wrapper for actix's `Server` with access to the bound port and a shutdown
/// handle for the background workers that share its lifetime.
pub struct Application {
    port: u16,
    server: Server,
    shutdown_tx: watch::Sender<bool>,
    workers: tokio::task::JoinHandle<()>,
}

impl Application {
    pub async fn build(cfg: Settings) -> Result<Self, anyhow::Error> {
        let addr = format!("{}:{}", cfg.application.host, cfg.application.port);
        let listener = TcpListener::bind(addr)?;
        let port = listener.local_addr().unwrap().port();

        let pool = get_connection_pool(&cfg.database);
        let clock = Arc::new(SystemClock);
        let repository = Arc::new(SubmissionRepository::new(pool, clock, cfg.workers.lock_ttl()));

        let object_store = Arc::new(ObjectStoreClient::new(cfg.object_store.base_url.clone(), cfg.object_store.timeout()));
        let sdes = Arc::new(SdesClient::new(
            cfg.sdes.base_url.clone(),
            cfg.sdes.timeout(),
            cfg.sdes.information_type.clone(),
            cfg.sdes.recipient_or_sender.clone(),
            cfg.sdes.object_store_location_prefix.clone(),
        ));
        let callback = Arc::new(CallbackClient::new(cfg.callback.timeout()));

        let authenticator: Arc<dyn Authenticator> =
            Arc::new(StaticTokenAuthenticator::new(cfg.internal_auth.token.clone(), "internal".to_string()));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let workers = tokio::spawn(run_workers(
            cfg.clone(),
            Arc::clone(&repository),
            Arc::clone(&sdes),
            Arc::clone(&callback),
            shutdown_rx,
        ));

        let server = run(listener, repository, object_store, authenticator, cfg.allow_localhost_callbacks).await?;

        Ok(Self { port, server, shutdown_tx, workers })
    }

    pub fn get_port(&self) -> u16 { self.port }

    /// Because this consumes `self`, this should be the final call (or passed to
    /// `tokio::spawn`). Signals the background workers to stop once the HTTP
    /// server exits, and waits for them to finish their current ticks.
    pub async fn run_until_stopped(self) -> Result<(), anyhow::Error> {
        let result = self.server.await;
        let _ = self.shutdown_tx.send(true);
        self.workers.await?;
        Ok(result?)
    }
}

pub fn get_connection_pool(db_cfg: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new().connect_lazy_with(db_cfg.connection())
}

pub async fn run(
    listener: TcpListener,
    repository: Arc<SubmissionRepository>,
    object_store: Arc<ObjectStoreClient>,
    authenticator: Arc<dyn Authenticator>,
    allow_localhost_callbacks: bool,
) -> Result<Server, anyhow::Error> {
    let repository = web::Data::from(repository);
    let object_store = web::Data::from(object_store);
    let authenticator = Data::new(authenticator);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/sdes-callback", web::post().to(sdes_callback_handler))
            .service(
                web::scope("/dms-submission")
                    .wrap(from_fn(authenticate_request))
                    .route("/submit", web::post().to(submit_handler)),
            )
            .app_data(repository.clone())
            .app_data(object_store.clone())
            .app_data(authenticator.clone())
            .app_data(Data::new(allow_localhost_callbacks))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
