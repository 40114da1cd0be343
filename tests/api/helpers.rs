use dms_submission::configuration::get_configuration;
use dms_submission::configuration::DatabaseSettings;
use dms_submission::startup::get_connection_pool;
use dms_submission::startup::Application;
use dms_submission::telemetry::get_subscriber;
use dms_submission::telemetry::init_subscriber;
use once_cell::sync::Lazy;
use secrecy::ExposeSecret;
use sqlx::Connection;
use sqlx::Executor;
use sqlx::PgConnection;
use sqlx::PgPool;
use uuid::Uuid;
use wiremock::MockServer;

/// Init a static subscriber using the `once_cell` crate.
///
/// To opt in to verbose logging, use the env var `TEST_LOG`:
///
/// ```sh
///      TEST_LOG=true cargo test [test_name] | bunyan
/// ```
static TRACING: Lazy<()> = Lazy::new(|| {
    match std::env::var("TEST_LOG") {
        Ok(_) => {
            let subscriber = get_subscriber("test", "debug", std::io::stdout);
            init_subscriber(subscriber);
        }
        Err(_) => {
            let subscriber = get_subscriber("test", "debug", std::io::sink);
            init_subscriber(subscriber);
        }
    };
});

pub struct TestApp {
    pub addr: String,
    pub pool: PgPool,
    pub object_store_server: MockServer,
    pub sdes_server: MockServer,
    pub callback_server: MockServer,
    pub internal_auth_token: String,
}

impl TestApp {
    /// Builds a `multipart/form-data` submit request against
    /// `/dms-submission/submit`, authenticated with the configured internal token.
    pub fn post_submit(
        &self,
    ) -> SubmitRequestBuilder {
        SubmitRequestBuilder::new(&self.addr, &self.internal_auth_token)
    }

    pub async fn post_sdes_callback(
        &self,
        body: serde_json::Value,
    ) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/sdes-callback", self.addr))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn get_submission(
        &self,
        owner: &str,
        id: &str,
    ) -> Option<(String, String)> {
        sqlx::query!(
            r#"SELECT status, failure_reason FROM submission_item WHERE owner = $1 AND id = $2"#,
            owner,
            id,
        )
        .fetch_optional(&self.pool)
        .await
        .unwrap()
        .map(|row| (row.status, row.failure_reason.unwrap_or_default()))
    }
}

/// A minimal builder over `reqwest::multipart::Form` for the submit endpoint's
/// text fields plus one file part.
pub struct SubmitRequestBuilder {
    addr: String,
    token: String,
    submission_reference: Option<String>,
    callback_url: String,
    metadata: Vec<(&'static str, String)>,
    pdf_bytes: Vec<u8>,
}

impl SubmitRequestBuilder {
    fn new(
        addr: &str,
        token: &str,
    ) -> Self {
        Self {
            addr: addr.to_string(),
            token: token.to_string(),
            submission_reference: None,
            callback_url: "http://foo.mdtp/callback".to_string(),
            metadata: vec![
                ("metadata.store", "true".to_string()),
                ("metadata.source", "dms".to_string()),
                ("metadata.timeOfReceipt", "2024-01-01T00:00:00Z".to_string()),
                ("metadata.formId", "form-1".to_string()),
                ("metadata.customerId", "cust-1".to_string()),
                ("metadata.submissionMark", "mark".to_string()),
                ("metadata.casKey", "cas-key".to_string()),
                ("metadata.classificationType", "classification".to_string()),
                ("metadata.businessArea", "area".to_string()),
            ],
            pdf_bytes: b"%PDF-1.4 fake".to_vec(),
        }
    }

    pub fn submission_reference(
        mut self,
        value: &str,
    ) -> Self {
        self.submission_reference = Some(value.to_string());
        self
    }

    pub fn callback_url(
        mut self,
        value: &str,
    ) -> Self {
        self.callback_url = value.to_string();
        self
    }

    pub fn metadata_field(
        mut self,
        field: &'static str,
        value: &str,
    ) -> Self {
        if let Some(existing) = self.metadata.iter_mut().find(|(f, _)| *f == field) {
            existing.1 = value.to_string();
        }
        self
    }

    pub async fn send(self) -> reqwest::Response {
        let mut form = reqwest::multipart::Form::new();
        if let Some(reference) = &self.submission_reference {
            form = form.text("submissionReference", reference.clone());
        }
        form = form.text("callbackUrl", self.callback_url.clone());
        for (field, value) in &self.metadata {
            form = form.text(*field, value.clone());
        }
        form = form.part(
            "form",
            reqwest::multipart::Part::bytes(self.pdf_bytes.clone())
                .file_name("form.pdf")
                .mime_str("application/pdf")
                .unwrap(),
        );

        reqwest::Client::new()
            .post(format!("{}/dms-submission/submit", self.addr))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .unwrap()
    }
}

async fn configure_database(cfg: &DatabaseSettings) -> PgPool {
    let mut conn = PgConnection::connect_with(&cfg.connection_without_db())
        .await
        .expect("postgres must be running; run scripts/init_db.sh");

    conn.execute(format!(r#"CREATE DATABASE "{}";"#, cfg.database_name).as_str())
        .await
        .unwrap();

    let pool = PgPool::connect_with(cfg.connection()).await.unwrap();
    sqlx::migrate!().run(&pool).await.expect("failed to migrate");
    pool
}

/// Spawn a `TestApp` wired to mock object-store/SDES/callback servers, and to a
/// freshly created, randomly named database.
pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let object_store_server = MockServer::start().await;
    let sdes_server = MockServer::start().await;
    let callback_server = MockServer::start().await;

    let cfg = {
        let mut rand_cfg = get_configuration().unwrap();
        rand_cfg.database.database_name = Uuid::new_v4().to_string();
        rand_cfg.application.port = 0;
        rand_cfg.object_store.base_url = object_store_server.uri();
        rand_cfg.sdes.base_url = sdes_server.uri();
        // wiremock binds to 127.0.0.1, which only passes `CallbackUrl::parse`'s host
        // check when this is set.
        rand_cfg.allow_localhost_callbacks = true;
        // `workers` intervals are short so lifecycle tests don't stall.
        rand_cfg.workers.initial_delay_ms = 10;
        rand_cfg.workers.sdes_worker_interval_ms = 50;
        rand_cfg.workers.processed_item_worker_interval_ms = 50;
        rand_cfg.workers.failed_item_worker_interval_ms = 50;
        rand_cfg
    };

    configure_database(&cfg.database).await;

    let internal_auth_token = cfg.internal_auth.token.expose_secret().clone();

    let app = Application::build(cfg.clone()).await.unwrap();
    let addr = format!("http://localhost:{}", app.get_port());
    let pool = get_connection_pool(&cfg.database);
    tokio::spawn(app.run_until_stopped());

    TestApp {
        addr,
        pool,
        object_store_server,
        sdes_server,
        callback_server,
        internal_auth_token,
    }
}
