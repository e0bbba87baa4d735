// Environment configuration tests
//
// These mutate process-wide environment variables, so they are serialized.

use encore_backend::app_config::AppConfig;
use serial_test::serial;

fn set_required_vars() {
    std::env::set_var("JWT_SECRET", "test-secret-at-least-32-characters-long");
    std::env::set_var("DATABASE_URL", "postgresql://localhost/encore_test");
}

#[test]
#[serial]
fn loads_with_defaults() {
    set_required_vars();
    std::env::remove_var("BIND_ADDRESS");
    std::env::remove_var("JWT_EXPIRY");

    let config = AppConfig::from_env().expect("config should load");
    assert_eq!(config.bind_address, "0.0.0.0:8080");
    assert_eq!(config.port, 8080);
    assert_eq!(config.jwt_expiry, 604_800);
    assert_eq!(config.jwt_issuer, "encore.sg");
    assert_eq!(config.media_gen.poll_interval_secs, 5);
    assert_eq!(config.media_gen.poll_timeout_secs, 300);
    assert_eq!(config.paypal.currency, "SGD");
}

#[test]
#[serial]
fn rejects_short_jwt_secret() {
    std::env::set_var("JWT_SECRET", "too-short");
    std::env::set_var("DATABASE_URL", "postgresql://localhost/encore_test");

    assert!(AppConfig::from_env().is_err());

    // Restore a valid secret for any later test
    set_required_vars();
}

#[test]
#[serial]
fn rejects_missing_database_url() {
    std::env::set_var("JWT_SECRET", "test-secret-at-least-32-characters-long");
    std::env::remove_var("DATABASE_URL");

    assert!(AppConfig::from_env().is_err());

    set_required_vars();
}

#[test]
#[serial]
fn parses_bind_address_port() {
    set_required_vars();
    std::env::set_var("BIND_ADDRESS", "127.0.0.1:9999");

    let config = AppConfig::from_env().expect("config should load");
    assert_eq!(config.port, 9999);

    std::env::remove_var("BIND_ADDRESS");
}
