use croquettes_shop::config::{AppConfig, parse_origins};

#[test]
fn cors_origins_are_trimmed_and_blank_entries_dropped() {
    assert_eq!(
        parse_origins(" https://croquettes.sn/, ,http://localhost:5173"),
        vec!["https://croquettes.sn", "http://localhost:5173"]
    );
    assert!(parse_origins(" , ").is_empty());
}

#[test]
fn defaults_allow_the_local_frontend_only() {
    let config = AppConfig::with_defaults("postgres://unused", "secret");
    assert_eq!(config.cors_allowed_origins, vec!["http://localhost:3000"]);
}
