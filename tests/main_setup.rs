use agency_portal::{AppConfig, config::Env};
use serial_test::serial;
use std::{env, panic, time::Duration};

// --- Setup/Teardown Utilities ---

const CONFIG_VARS: [&str; 9] = [
    "APP_ENV",
    "BAAS_URL",
    "BAAS_APP_ID",
    "APP_URL",
    "SESSION_JWT_SECRET",
    "SESSION_TIMEOUT_MS",
    "SESSION_RETRIES",
    "BIND_ADDR",
    "RUST_LOG",
];

/// Runs `test` with a clean config environment and restores the original values afterwards.
fn run_with_env<T, R>(test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(String, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var.to_string(), env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals.into_iter().rev() {
        unsafe {
            if let Some(val) = original_value {
                env::set_var(&key, val);
            } else {
                env::remove_var(&key);
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_production_fail_fast() {
    let result = run_with_env(|| {
        panic::catch_unwind(|| {
            unsafe {
                env::set_var("APP_ENV", "production");
                env::set_var("BAAS_URL", "https://baas.example.com");
            }
            // BAAS_APP_ID and APP_URL are missing
            AppConfig::load()
        })
    });

    assert!(
        result.is_err(),
        "Production config loading should panic on missing settings"
    );
}

#[test]
#[serial]
fn test_app_config_production_complete() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "production");
            env::set_var("BAAS_URL", "https://baas.example.com");
            env::set_var("BAAS_APP_ID", "app-123");
            env::set_var("APP_URL", "https://portal.example.com");
            env::set_var("SESSION_TIMEOUT_MS", "1500");
            env::set_var("SESSION_RETRIES", "2");
        }
        AppConfig::load()
    });

    assert_eq!(config.env, Env::Production);
    assert!(!config.dev_bypass);
    assert_eq!(config.baas_app_id, "app-123");
    assert_eq!(config.session_timeout, Duration::from_millis(1500));
    assert_eq!(config.session_retries, 2);
    assert!(config.jwt_secret.is_none());
}

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "local");
            env::set_var("SESSION_JWT_SECRET", "");
        }
        AppConfig::load()
    });

    let defaults = AppConfig::default();
    assert_eq!(config.env, Env::Local);
    assert!(config.dev_bypass);
    assert_eq!(config.baas_url, defaults.baas_url);
    assert_eq!(config.session_timeout, Duration::from_secs(3));
    assert_eq!(config.session_retries, 1);
    // An empty secret disables local token validation.
    assert!(config.jwt_secret.is_none());
}

#[test]
#[serial]
fn test_app_config_missing_app_env_keeps_dev_bypass_off() {
    let config = run_with_env(AppConfig::load);

    assert_eq!(config.env, Env::Local);
    assert!(!config.dev_bypass);
}

#[test]
#[serial]
fn test_app_config_rejects_malformed_timeout() {
    let result = run_with_env(|| {
        panic::catch_unwind(|| {
            unsafe {
                env::set_var("SESSION_TIMEOUT_MS", "three seconds");
            }
            AppConfig::load()
        })
    });

    assert!(result.is_err());
}
