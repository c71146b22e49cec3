//! Configuration loading and data folder layout
//!
//! Missing or unreadable config must never stop startup; these tests load
//! real files from a temp directory.

use aiso_common::config::{
    default_root_folder, load_toml_config, load_toml_config_or_default, DataPaths, APP_DIR_NAME,
};
use aiso_common::Error;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn default_root_folder_is_app_specific() {
    let root = default_root_folder();
    assert!(root.ends_with(APP_DIR_NAME), "{}", root.display());
}

#[test]
fn data_paths_live_in_root_folder() {
    let paths = DataPaths::new(PathBuf::from("/data/aiso"));
    assert_eq!(paths.database_path(), PathBuf::from("/data/aiso/samples.db"));
    assert_eq!(paths.setup_config_path(), PathBuf::from("/data/aiso/setup-config.json"));
    assert_eq!(paths.custom_tags_path(), PathBuf::from("/data/aiso/custom-tags.json"));
}

#[test]
fn ensure_directory_creates_nested_root() {
    let dir = TempDir::new().unwrap();
    let paths = DataPaths::new(dir.path().join("a").join("b"));

    paths.ensure_directory_exists().unwrap();
    assert!(paths.root().is_dir());
    // Second call is a no-op
    paths.ensure_directory_exists().unwrap();
}

#[test]
fn full_config_file_parses() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/samples"
port = 6000

[logging]
level = "aiso_ai=debug"

[ai]
timeout_seconds = 10
requests_per_minute = 5
max_file_size_mb = 20

[openai]
api_key = "sk-openai"
model = "gpt-4o"

[anthropic]
base_url = "http://127.0.0.1:9999"
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.root_folder.as_deref(), Some("/srv/samples"));
    assert_eq!(config.port, Some(6000));
    assert_eq!(config.logging.level, "aiso_ai=debug");
    assert_eq!(config.ai.timeout_seconds, 10);
    assert_eq!(config.ai.requests_per_minute, 5);
    assert_eq!(config.ai.max_file_size_mb, 20);
    assert_eq!(config.openai.model.as_deref(), Some("gpt-4o"));
    assert!(config.anthropic.api_key.is_none());
    assert_eq!(config.anthropic.base_url.as_deref(), Some("http://127.0.0.1:9999"));
}

#[test]
fn missing_config_is_an_error_but_loader_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    assert!(matches!(load_toml_config(&path), Err(Error::Config(_))));

    let config = load_toml_config_or_default(Some(&path));
    assert!(config.port.is_none());
    assert_eq!(config.logging.level, "info");

    let config = load_toml_config_or_default(None);
    assert_eq!(config.ai.max_file_size_mb, 100);
}
