use agency_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    session::{HostedSessionProvider, SessionContext, SessionProviderState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, the session backend client, then the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production settings).
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging.
    init_tracing(&config.env);

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Session backend, wrapped in the timeout/retry policy.
    let provider = Arc::new(HostedSessionProvider::from_config(&config)) as SessionProviderState;
    let session = SessionContext::from_config(provider, &config);
    tracing::info!(
        baas_url = %config.baas_url,
        timeout_ms = config.session_timeout.as_millis() as u64,
        retries = config.session_retries,
        "session backend configured"
    );

    if config.dev_bypass {
        tracing::warn!("local mode: the x-dev-role bypass header is enabled");
    } else if config.env == Env::Local {
        tracing::info!("APP_ENV not set to local explicitly: x-dev-role bypass disabled");
    }

    // 4. Router and server.
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState { session, config });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly");
}

/// Installs the global subscriber. `RUST_LOG` overrides the default filter; locally the output
/// is human-readable, in production it is one JSON object per line for the log pipeline.
fn init_tracing(env: &Env) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("agency_portal=debug,tower_http=info"));
    let registry = tracing_subscriber::registry().with(filter);

    match env {
        Env::Local => registry.with(fmt::layer().pretty()).init(),
        Env::Production => registry.with(fmt::layer().json().flatten_event(true)).init(),
    }
}
