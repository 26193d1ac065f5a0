// tests/config_store.rs

mod common;
use crate::common::JobBuilder;

use std::sync::Arc;

use jobrunner::config::{AppDefinition, ConfigStore, TomlConfigStore};
use jobrunner::fs::{FileSystem, RealFileSystem};
use jobrunner::types::JobType;

const SAMPLE: &str = r#"
[global]
java_home = "/opt/jdk"
logs_dir = "/var/log/jobs"

[apps.billing]
name = "Billing"
webapp_path = "/srv/billing"

[apps.shared]
webapp_path = "/srv/shared"

[[jobs]]
id = "import"
app = ["billing", "shared"]
main_class = "com.example.Import"
type = "continuous"
params = ["--full"]

[[jobs]]
id = "cleanup"
app = "shared"
main_class = "com.example.Cleanup"
type = "hourly"
enabled = false
"#;

fn open(path: &std::path::Path) -> TomlConfigStore {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    TomlConfigStore::open(fs, path).unwrap()
}

#[test]
fn a_hand_written_file_loads_with_defaults_filled_in() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.toml");
    std::fs::write(&path, SAMPLE).unwrap();

    let store = open(&path);
    let import = store.job("import").unwrap();
    assert_eq!(import.apps, vec!["billing", "shared"]);
    assert_eq!(import.job_type, JobType::Continuous);
    assert!(import.enabled);

    let cleanup = store.job("cleanup").unwrap();
    assert_eq!(cleanup.apps, vec!["shared"]);
    assert_eq!(cleanup.job_type, JobType::OnDemand, "unknown types fall back");
    assert!(!cleanup.enabled);

    assert_eq!(store.app("shared").unwrap().name, "shared");
    assert_eq!(store.global().java_opts, "-Xms256m -Xmx512m");
    assert_eq!(store.location(), Some(path));
}

#[test]
fn saved_changes_reload_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("jobs.toml");

    let store = open(&path);
    assert!(path.exists(), "a default file is written on first open");

    store
        .upsert_app(AppDefinition::new("web", "Web", "/srv/web"))
        .unwrap();
    store
        .upsert_job(JobBuilder::new("nightly", "com.example.Nightly").app("web").param("x").build())
        .unwrap();

    let reopened = open(&path);
    assert_eq!(reopened.jobs(), store.jobs());
    assert_eq!(reopened.apps(), store.apps());
    assert_eq!(reopened.global(), store.global());
}

#[test]
fn reload_picks_up_external_edits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.toml");
    let store = open(&path);
    assert!(store.jobs().is_empty());

    std::fs::write(&path, SAMPLE).unwrap();
    store.reload().unwrap();
    assert_eq!(store.jobs().len(), 2);
}

#[test]
fn invalid_files_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.toml");
    std::fs::write(
        &path,
        r#"
[[jobs]]
id = "a"
main_class = "A"

[[jobs]]
id = "a"
main_class = "B"
"#,
    )
    .unwrap();

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let err = TomlConfigStore::open(fs.clone(), &path).unwrap_err();
    assert!(err.to_string().contains("declared more than once"), "{err}");

    std::fs::write(&path, "[[jobs]]\nid = \"a\"\nmain_class = \"A\"\napp = \"ghost\"\n").unwrap();
    let err = TomlConfigStore::open(fs, &path).unwrap_err();
    assert!(err.to_string().contains("ghost"), "{err}");
}
