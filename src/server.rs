//! HTTP server bootstrap.
//!
//! Wires together configuration, the database pool, the orchestrator
//! services and the Axum router. Every collaborator is injected through
//! constructors; optional ones (ledger, notifier) stay `Option` and are
//! reported at startup.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use crate::auth::{AuthMiddlewareState, JwtValidator};
use crate::crypto::CertificateSigner;
use crate::infra::{
    FsBlobStore, LedgerService, Notifier, NotifierConfig, PgCertificateRepository,
    PgInstitutionDirectory, PgScoreRepository, PgStudentDirectory, PgSubjectCatalog,
    PgVerificationCodeRepository, WebhookNotifier,
};
use crate::ledger::{HttpLedgerClient, LedgerConfig};
use crate::service::{CertificateService, ScoreService, VerificationService};

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Server listen address
    pub listen_addr: SocketAddr,
    /// Maximum database connections
    pub max_connections: u32,
    /// Deadline for ledger anchor submissions
    pub anchor_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/credentis".to_string());

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .expect("Invalid listen address");

        let max_connections: u32 = std::env::var("MAX_DB_CONNECTIONS")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(10);

        let anchor_timeout = std::env::var("ANCHOR_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Self {
            database_url,
            listen_addr,
            max_connections,
            anchor_timeout,
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub scores: Arc<ScoreService>,
    pub certificates: Arc<CertificateService>,
    pub verification: Arc<VerificationService>,
    pub pool: PgPool,
}

/// Start the HTTP server
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Credentis v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    info!("Configuration loaded");
    info!("  Listen address: {}", config.listen_addr);
    info!("  Max connections: {}", config.max_connections);

    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    info!("Connected to PostgreSQL");

    let migrate_on_startup = std::env::var("DB_MIGRATE_ON_STARTUP")
        .ok()
        .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off"))
        .unwrap_or(true);
    if migrate_on_startup {
        info!("Running database migrations...");
        crate::migrations::run_postgres(&pool).await?;
        info!("Database migrations applied");
    } else {
        info!("DB migrations skipped (DB_MIGRATE_ON_STARTUP=0)");
    }

    // Auth: the identity provider and this service share a secret
    let jwt_secret = std::env::var("JWT_SECRET")
        .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;
    let issuer = std::env::var("JWT_ISSUER").unwrap_or_else(|_| "credentis".to_string());
    let audience = std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "credentis-api".to_string());
    let validator = Arc::new(JwtValidator::new(jwt_secret.as_bytes(), &issuer, &audience));
    let auth_state = AuthMiddlewareState { validator };

    // Signing key for certificates
    let signer = match std::env::var("SIGNING_KEY") {
        Ok(hex_key) => Arc::new(
            CertificateSigner::from_hex(&hex_key)
                .map_err(|e| anyhow::anyhow!("Invalid SIGNING_KEY: {e}"))?,
        ),
        Err(_) => {
            let signer = Arc::new(CertificateSigner::generate());
            info!("SIGNING_KEY not set; generated an ephemeral signing key");
            signer
        }
    };
    info!("Certificate signer: {}", signer.identity());

    // Repositories
    let scores_repo = Arc::new(PgScoreRepository::new(pool.clone()));
    let certificates_repo = Arc::new(PgCertificateRepository::new(pool.clone()));
    let codes_repo = Arc::new(PgVerificationCodeRepository::new(pool.clone()));
    let students = Arc::new(PgStudentDirectory::new(pool.clone()));
    let subjects = Arc::new(PgSubjectCatalog::new(pool.clone()));
    let institutions = Arc::new(PgInstitutionDirectory::new(pool.clone()));

    // Optional collaborators
    let ledger: Option<Arc<dyn LedgerService>> = match LedgerConfig::from_env() {
        Some(ledger_config) => {
            info!("Ledger gateway configured:");
            info!("  Endpoint: {}", ledger_config.endpoint);
            info!("  Timeout: {:?}", ledger_config.request_timeout);
            Some(Arc::new(HttpLedgerClient::new(ledger_config)))
        }
        None => {
            info!("Ledger gateway not configured (set LEDGER_GATEWAY_URL to enable anchoring)");
            None
        }
    };

    let notifier: Option<Arc<dyn Notifier>> = match NotifierConfig::from_env() {
        Some(notifier_config) => {
            info!("Notifier webhook: {}", notifier_config.endpoint);
            Some(Arc::new(WebhookNotifier::new(notifier_config)))
        }
        None => {
            info!("Notifier not configured (set NOTIFY_WEBHOOK_URL to enable)");
            None
        }
    };

    let blobs = Arc::new(FsBlobStore::from_env());

    // Services
    let state = AppState {
        scores: Arc::new(ScoreService::new(
            scores_repo,
            students.clone(),
            subjects,
        )),
        certificates: Arc::new(CertificateService::new(
            certificates_repo,
            students,
            institutions,
            ledger,
            blobs,
            signer,
            config.anchor_timeout,
        )),
        verification: Arc::new(VerificationService::new(codes_repo, notifier)),
        pool: pool.clone(),
    };

    let app = build_router(auth_state)?.with_state(state);

    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    info!("Credentis is ready to accept connections");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}

fn build_router(auth_state: AuthMiddlewareState) -> anyhow::Result<Router<AppState>> {
    let api = crate::api::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        crate::auth::auth_middleware,
    ));

    let mut router = Router::new()
        .nest("/api", api)
        .merge(crate::api::public_router())
        .route("/health", get(crate::api::handlers::health::health_check))
        .route("/ready", get(crate::api::handlers::health::readiness_check))
        .layer(TraceLayer::new_for_http());

    if let Some(cors_layer) = cors_layer_from_env()? {
        router = router.layer(cors_layer);
    }

    Ok(router)
}

fn cors_layer_from_env() -> anyhow::Result<Option<CorsLayer>> {
    let origins = match std::env::var("CORS_ALLOW_ORIGINS") {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };

    let origins = origins.trim();
    if origins.is_empty() {
        return Ok(None);
    }

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::PATCH])
            .allow_headers([
                axum::http::header::AUTHORIZATION,
                axum::http::header::CONTENT_TYPE,
            ]),
    ))
}
