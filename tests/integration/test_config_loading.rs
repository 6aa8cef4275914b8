use dagboard::core::config::loader::CONFIG_FILE_NAME;
use dagboard::core::dag::LayoutKind;
use dagboard::core::{ConfigLoader, ConfigValidator, EditorConfig, ErrorCategory};
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

const DAGBOARD_ENV: &[&str] = &[
    "DAGBOARD_BACKEND_URL",
    "DAGBOARD_BACKEND_TOKEN",
    "DAGBOARD_PROJECT_CODE",
    "DAGBOARD_TIMEOUT_SECONDS",
    "DAGBOARD_POLL_INTERVAL_SECONDS",
    "DAGBOARD_LAYOUT_KIND",
];

fn clear_env() {
    for name in DAGBOARD_ENV {
        env::remove_var(name);
    }
}

fn workspace_with(config: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(CONFIG_FILE_NAME), config).unwrap();
    dir
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let config = ConfigLoader::load_from_workspace(dir.path()).unwrap();
    assert_eq!(config, EditorConfig::default());
    assert!(ConfigValidator::validate(&config).is_ok());
}

#[test]
#[serial]
fn test_file_values_are_loaded() {
    clear_env();
    let dir = workspace_with(
        r#"
[backend]
base_url = "https://scheduler.internal/dolphinscheduler"
token = "s3cret"
project_code = 5120

[overlay]
poll_interval_seconds = 15

[layout]
kind = "grid"
rows = 3
"#,
    );

    let config = ConfigLoader::load_from_workspace(dir.path()).unwrap();
    assert_eq!(config.backend.base_url, "https://scheduler.internal/dolphinscheduler");
    assert_eq!(config.backend.token.as_deref(), Some("s3cret"));
    assert_eq!(config.backend.project_code, 5120);
    assert_eq!(config.backend.timeout_seconds, 30);
    assert_eq!(config.overlay.poll_interval_seconds, 15);
    assert_eq!(config.layout.kind, LayoutKind::Grid);
    assert_eq!(config.layout.rows, Some(3));
    assert!(ConfigValidator::validate(&config).is_ok());
}

#[test]
#[serial]
fn test_env_wins_over_file() {
    clear_env();
    let dir = workspace_with(
        r#"
[backend]
token = "from-file"
timeout_seconds = 10
"#,
    );
    env::set_var("DAGBOARD_BACKEND_TOKEN", "");
    env::set_var("DAGBOARD_TIMEOUT_SECONDS", " 45 ");
    env::set_var("DAGBOARD_POLL_INTERVAL_SECONDS", "2");

    let config = ConfigLoader::load_from_workspace(dir.path()).unwrap();
    clear_env();

    // An empty token clears the file value.
    assert!(config.backend.token.is_none());
    assert_eq!(config.backend.timeout_seconds, 45);
    assert_eq!(config.overlay.poll_interval_seconds, 2);
}

#[test]
#[serial]
fn test_bad_env_layout_kind_is_ignored() {
    clear_env();
    let dir = workspace_with("[layout]\nkind = \"grid\"\n");
    env::set_var("DAGBOARD_LAYOUT_KIND", "spiral");

    let config = ConfigLoader::load_from_workspace(dir.path()).unwrap();
    clear_env();
    assert_eq!(config.layout.kind, LayoutKind::Grid);
}

#[test]
#[serial]
fn test_unknown_layout_kind_in_file_is_a_config_error() {
    clear_env();
    let dir = workspace_with("[layout]\nkind = \"spiral\"\n");
    let err = ConfigLoader::load_from_workspace(dir.path()).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ConfigError);
    assert!(err.message.contains(CONFIG_FILE_NAME));
}

#[test]
#[serial]
fn test_validator_rejections() {
    clear_env();
    let cases = [
        ("[backend]\nbase_url = \"ftp://files/dolphinscheduler\"\n", "http or https"),
        ("[backend]\ntimeout_seconds = 0\n", "timeout_seconds"),
        ("[overlay]\npoll_interval_seconds = 0\n", "poll_interval_seconds"),
        ("[layout]\nnodesep = -1.0\n", "layout.nodesep"),
        ("[layout]\ncols = 0\n", "at least 1"),
    ];

    for (toml, expected) in cases {
        let dir = workspace_with(toml);
        let config = ConfigLoader::load_from_workspace(dir.path()).unwrap();
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(err.category, ErrorCategory::ConfigError, "{}", toml);
        assert!(
            err.message.contains(expected),
            "expected '{}' in '{}'",
            expected,
            err.message
        );
    }
}

#[test]
#[serial]
fn test_env_url_is_validated_too() {
    clear_env();
    let dir = TempDir::new().unwrap();
    env::set_var("DAGBOARD_BACKEND_URL", "not a url");
    let config = ConfigLoader::load_from_workspace(dir.path()).unwrap();
    clear_env();

    let err = ConfigValidator::validate(&config).unwrap_err();
    assert!(err.message.contains("backend.base_url"));
}

#[test]
#[serial]
fn test_defaults_serialize_as_documented() {
    clear_env();
    let config = EditorConfig::default();
    let rendered = toml::to_string(&config.backend).unwrap();
    insta::assert_snapshot!(rendered, @r###"
    base_url = "http://127.0.0.1:12345/dolphinscheduler"
    project_code = 0
    timeout_seconds = 30
    "###);
}
