use std::{env, time::Duration};

/// AppConfig
///
/// Holds the service's entire configuration state. Immutable once loaded and shared with
/// handlers through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects defaults and the log format.
    pub env: Env,
    // Honors the `x-dev-role` header. Only set by an explicit `APP_ENV=local`, never by the
    // fallback when `APP_ENV` is missing.
    pub dev_bypass: bool,
    // Base URL of the hosted backend (session, entities, login).
    pub baas_url: String,
    // Application id the backend scopes every call to.
    pub baas_app_id: String,
    // Public URL of the dashboard front end; login returns here.
    pub app_url: String,
    // Optional secret for validating session tokens locally before asking the backend.
    pub jwt_secret: Option<String>,
    // Upper bound on a single session fetch.
    pub session_timeout: Duration,
    // How many times a transient session failure is retried before redirecting to login.
    pub session_retries: u32,
    pub bind_addr: String,
}

/// Env
///
/// Defines the runtime context: local development (bypass header, pretty logs) or production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const DEFAULT_SESSION_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_SESSION_RETRIES: u32 = 1;

impl Default for AppConfig {
    /// default
    ///
    /// Non-panicking configuration for test state scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            dev_bypass: false,
            baas_url: "http://localhost:4000".to_string(),
            baas_app_id: "agency-portal-test".to_string(),
            app_url: "http://localhost:5173".to_string(),
            jwt_secret: None,
            session_timeout: Duration::from_millis(DEFAULT_SESSION_TIMEOUT_MS),
            session_retries: DEFAULT_SESSION_RETRIES,
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables at startup.
    ///
    /// # Panics
    /// Panics in production when `BAAS_URL`, `BAAS_APP_ID` or `APP_URL` is missing, and in any
    /// environment when a numeric setting does not parse. The service must not start half-configured.
    pub fn load() -> Self {
        let app_env = env::var("APP_ENV").ok();
        let env = match app_env.as_deref() {
            Some("production") => Env::Production,
            _ => Env::Local,
        };
        let dev_bypass = app_env.as_deref() == Some("local");

        let session_timeout = Duration::from_millis(
            env::var("SESSION_TIMEOUT_MS")
                .map(|v| {
                    v.parse()
                        .expect("FATAL: SESSION_TIMEOUT_MS must be a number of milliseconds")
                })
                .unwrap_or(DEFAULT_SESSION_TIMEOUT_MS),
        );
        let session_retries = env::var("SESSION_RETRIES")
            .map(|v| v.parse().expect("FATAL: SESSION_RETRIES must be a number"))
            .unwrap_or(DEFAULT_SESSION_RETRIES);
        let jwt_secret = env::var("SESSION_JWT_SECRET").ok().filter(|s| !s.is_empty());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        match env {
            Env::Local => {
                let defaults = Self::default();
                Self {
                    env: Env::Local,
                    dev_bypass,
                    baas_url: env::var("BAAS_URL").unwrap_or(defaults.baas_url),
                    baas_app_id: env::var("BAAS_APP_ID").unwrap_or(defaults.baas_app_id),
                    app_url: env::var("APP_URL").unwrap_or(defaults.app_url),
                    jwt_secret,
                    session_timeout,
                    session_retries,
                    bind_addr,
                }
            }
            Env::Production => Self {
                env: Env::Production,
                dev_bypass: false,
                baas_url: env::var("BAAS_URL").expect("FATAL: BAAS_URL required in prod"),
                baas_app_id: env::var("BAAS_APP_ID").expect("FATAL: BAAS_APP_ID required in prod"),
                app_url: env::var("APP_URL").expect("FATAL: APP_URL required in prod"),
                jwt_secret,
                session_timeout,
                session_retries,
                bind_addr,
            },
        }
    }
}
