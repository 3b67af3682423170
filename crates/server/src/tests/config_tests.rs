use super::*;

use std::collections::HashMap;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_apply_without_file_or_env() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings_from(&dir.path().join("missing.toml"), env_from(&[]));
    assert_eq!(settings.server_bind, "127.0.0.1:3000");
    assert_eq!(settings.max_upload_bytes, 64 * 1024 * 1024);
    assert_eq!(settings.max_output_samples, DEFAULT_MAX_OUTPUT_SAMPLES);
    assert!(settings.cors_allowed_origin.is_none());
}

#[test]
fn file_values_override_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("server.toml");
    fs::write(
        &path,
        "bind_addr = \"0.0.0.0:9000\"\nmax_upload_bytes = 1024\nmax_output_samples = 4096\ncors_allowed_origin = \"http://localhost:3000\"\n",
    )
    .expect("write settings");

    let settings = load_settings_from(&path, env_from(&[]));
    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.max_upload_bytes, 1024);
    assert_eq!(settings.max_output_samples, 4096);
    assert_eq!(
        settings.cors_allowed_origin.as_deref(),
        Some("http://localhost:3000")
    );
}

#[test]
fn env_overrides_file_and_prefixed_bind_wins() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("server.toml");
    fs::write(&path, "bind_addr = \"0.0.0.0:9000\"\n").expect("write settings");

    let settings = load_settings_from(
        &path,
        env_from(&[
            ("SERVER_BIND", "127.0.0.1:7000"),
            ("APP__BIND_ADDR", "127.0.0.1:7001"),
            ("APP__MAX_UPLOAD_BYTES", "2048"),
        ]),
    );
    assert_eq!(settings.server_bind, "127.0.0.1:7001");
    assert_eq!(settings.max_upload_bytes, 2048);
}

#[test]
fn env_overrides_output_limit_and_cors_origin() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("server.toml");
    fs::write(&path, "cors_allowed_origin = \"http://localhost:3000\"\n")
        .expect("write settings");

    let settings = load_settings_from(
        &path,
        env_from(&[
            ("APP__MAX_OUTPUT_SAMPLES", "1000"),
            ("APP__CORS_ALLOWED_ORIGIN", "https://audio.example"),
        ]),
    );
    assert_eq!(settings.max_output_samples, 1000);
    assert_eq!(
        settings.cors_allowed_origin.as_deref(),
        Some("https://audio.example")
    );
}

#[test]
fn unparsable_upload_limit_keeps_previous_value() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings_from(
        &dir.path().join("missing.toml"),
        env_from(&[("APP__MAX_UPLOAD_BYTES", "lots")]),
    );
    assert_eq!(settings.max_upload_bytes, Settings::default().max_upload_bytes);
}

#[test]
fn malformed_settings_file_is_ignored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("server.toml");
    fs::write(&path, "bind_addr = [").expect("write settings");

    let settings = load_settings_from(&path, env_from(&[]));
    assert_eq!(settings.server_bind, Settings::default().server_bind);
}

#[test]
fn cors_origin_is_validated() {
    let mut settings = Settings::default();
    assert!(settings.cors_origin().expect("no origin").is_none());

    settings.cors_allowed_origin = Some("http://localhost:3000".into());
    assert_eq!(
        settings.cors_origin().expect("valid").expect("origin"),
        "http://localhost:3000"
    );

    settings.cors_allowed_origin = Some("bad\norigin".into());
    assert!(settings.cors_origin().is_err());
}
