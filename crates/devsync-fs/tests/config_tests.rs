use devsync_fs::{ConfigStore, Error, NormalizedPath};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use std::fs;
use tempfile::TempDir;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Remote {
    host: String,
    zone: String,
}

#[test]
fn test_load_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("remote.toml");
    fs::write(&path, "host = \"tpu-a\"\nzone = \"us-central2-b\"\n").unwrap();

    let loaded: Remote = ConfigStore::new().load(&NormalizedPath::new(&path)).unwrap();
    assert_eq!(
        loaded,
        Remote {
            host: "tpu-a".into(),
            zone: "us-central2-b".into()
        }
    );
}

#[test]
fn test_load_yaml_and_json() {
    let dir = TempDir::new().unwrap();
    let yaml = dir.path().join("remote.yaml");
    let json = dir.path().join("remote.json");
    fs::write(&yaml, "host: tpu-a\nzone: europe-west4-a\n").unwrap();
    fs::write(&json, r#"{"host": "tpu-b", "zone": "europe-west4-a"}"#).unwrap();

    let store = ConfigStore::new();
    let a: Remote = store.load(&NormalizedPath::new(&yaml)).unwrap();
    let b: Remote = store.load(&NormalizedPath::new(&json)).unwrap();
    assert_eq!(a.host, "tpu-a");
    assert_eq!(b.host, "tpu-b");
}

#[test]
fn test_save_then_load() {
    let dir = TempDir::new().unwrap();
    let path = NormalizedPath::new(dir.path().join("out.toml"));
    let value = Remote {
        host: "tpu-c".into(),
        zone: "us-east1-d".into(),
    };

    let store = ConfigStore::new();
    store.save(&path, &value).unwrap();
    let loaded: Remote = store.load(&path).unwrap();
    assert_eq!(loaded, value);
}

#[test]
fn test_load_optional_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = NormalizedPath::new(dir.path().join("absent.toml"));
    let loaded: Option<Remote> = ConfigStore::new().load_optional(&path).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("remote.ini");
    fs::write(&path, "host=tpu").unwrap();

    let result: Result<Remote, _> = ConfigStore::new().load(&NormalizedPath::new(&path));
    assert!(matches!(result, Err(Error::UnsupportedFormat { .. })));
}

#[test]
fn test_parse_error_names_format() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "host = ").unwrap();

    let result: Result<Remote, _> = ConfigStore::new().load(&NormalizedPath::new(&path));
    match result {
        Err(Error::ConfigParse { format, .. }) => assert_eq!(format, "TOML"),
        other => panic!("expected ConfigParse, got {other:?}"),
    }
}
