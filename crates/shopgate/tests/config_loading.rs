//! Loading `GuardConfig` from files and the environment.

use shopgate::{Error, GuardConfig, PolicyClass, RateLimitPolicy};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_from_file() {
    let file = write_config(
        r#"
        cleanup_interval_secs = 120

        [auth]
        capacity = 10
        refill_rate = 2
        refill_interval_ms = 30000

        [retry]
        max_retries = 4
        initial_delay_ms = 250
        max_delay_ms = 5000
        jitter = 0.2
        "#,
    );

    let config = GuardConfig::from_file(file.path()).unwrap();

    assert_eq!(config.cleanup_interval(), Duration::from_secs(120));
    assert_eq!(config.policy(PolicyClass::Auth), RateLimitPolicy::new(10, 2, 30_000));
    assert_eq!(config.policy(PolicyClass::Read), RateLimitPolicy::read());
    assert_eq!(config.retry.max_retries, 4);
    assert_eq!(config.retry.multiplier, 2.0);
    assert_eq!(config.retry.jitter, 0.2);

    let limiters = config.build_limiters().unwrap();
    assert_eq!(limiters.get(PolicyClass::Auth).policy().capacity, 10);
    assert_eq!(limiters.get(PolicyClass::Auth).max_idle(), Duration::from_secs(3_600));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    match GuardConfig::from_file(&path) {
        Err(Error::ConfigIo { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected ConfigIo, got {other:?}"),
    }
}

#[test]
fn test_malformed_file() {
    let file = write_config("[auth\ncapacity = 1");
    let err = GuardConfig::from_file(file.path()).unwrap_err();

    assert!(matches!(err, Error::ConfigParse(_)));
    assert!(err.is_config_error());
}

#[test]
fn test_env_layers_over_file() {
    let file = write_config(
        r#"
        max_idle_secs = 900

        [api]
        capacity = 50
        refill_rate = 5
        refill_interval_ms = 60000
        "#,
    );

    temp_env::with_vars(
        [
            ("SHOPGATE_API_CAPACITY", Some("75")),
            ("SHOPGATE_MAX_IDLE_SECS", None),
        ],
        || {
            let config = GuardConfig::from_file(file.path())
                .and_then(GuardConfig::with_env_overrides)
                .unwrap();

            assert_eq!(config.api, RateLimitPolicy::new(75, 5, 60_000));
            assert_eq!(config.max_idle(), Duration::from_secs(900));
        },
    );
}

#[test]
fn test_round_trips_through_toml() {
    let config = GuardConfig::default();
    let rendered = toml::to_string(&config).unwrap();

    assert_eq!(GuardConfig::from_toml_str(&rendered).unwrap(), config);
}
