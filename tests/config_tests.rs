use std::fs::File;
use std::io::Write;
use std::time::Duration;
use tempfile::tempdir;

use reorderify::config::Config;
use reorderify::reorder::ReorderOptions;
use reorderify::ReorderError;

#[test]
fn config_from_path_parses_toml() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("cfg.toml");
    let mut f = File::create(&cfg_path).unwrap();
    let toml = r#"
client_id = "abc"
client_secret = "def"
default_playlist = "Liked Oldies"
backup_suffix = " (reversed)"
max_batch_size = 50
max_retries = 5
retry_base_delay_ms = 10
dry_run_track_limit = 0
log_dir = "/tmp/reorderify-logs"
"#;
    f.write_all(toml.as_bytes()).unwrap();
    let cfg = Config::from_path(&cfg_path).expect("parse config");
    assert_eq!(cfg.client_id, "abc");
    assert!(cfg.has_client_credentials());
    assert_eq!(cfg.default_playlist, "Liked Oldies");
    assert_eq!(cfg.max_batch_size, 50);
    assert_eq!(cfg.dry_run_limit(), None);
    assert_eq!(cfg.log_dir.to_str().unwrap(), "/tmp/reorderify-logs");
    // unspecified keys keep their defaults
    assert_eq!(cfg.page_concurrency, 4);
    assert_eq!(cfg.redirect_uri, "http://localhost:8888/callback");

    let policy = cfg.retry_policy();
    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.base_delay, Duration::from_millis(10));

    let opts = ReorderOptions::from_config(&cfg, true);
    assert!(opts.dry_run);
    assert_eq!(opts.backup_suffix, " (reversed)");
    assert_eq!(opts.batch_size, 50);
    assert_eq!(opts.dry_run_track_limit, None);
}

#[test]
fn defaults_are_valid() {
    let cfg = Config::default();
    cfg.validate().expect("defaults validate");
    assert_eq!(cfg.default_playlist, "Starred");
    assert_eq!(cfg.backup_suffix, "Reordered");
    assert_eq!(cfg.max_batch_size, 100);
    assert_eq!(cfg.max_retries, 3);
    assert_eq!(cfg.dry_run_limit(), Some(10));
    assert!(!cfg.has_client_credentials());
}

#[test]
fn out_of_range_settings_are_rejected() {
    let too_big = Config { max_batch_size: 101, ..Config::default() };
    assert!(matches!(too_big.validate(), Err(ReorderError::Config(m)) if m.contains("max_batch_size")));

    let no_retries = Config { max_retries: 0, ..Config::default() };
    assert!(matches!(no_retries.validate(), Err(ReorderError::Config(m)) if m.contains("max_retries")));

    let no_pages = Config { page_concurrency: 0, ..Config::default() };
    assert!(no_pages.validate().is_err());
}

#[test]
fn malformed_toml_is_an_error() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("broken.toml");
    std::fs::write(&cfg_path, "max_batch_size = \"lots\"\n").unwrap();
    assert!(Config::from_path(&cfg_path).is_err());
    assert!(Config::from_path(&td.path().join("missing.toml")).is_err());
}
