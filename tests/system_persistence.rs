// tests/system_persistence.rs

//! Configuration persistence: `System` materializes its on-disk layout,
//! and mutations survive a reload from a fresh `System` instance.

use edm::system::{RemoteConfig, System, Toolset};
use std::fs;

#[test]
fn fresh_system_creates_the_documented_layout() {
    let base = tempfile::tempdir().unwrap();
    let system = System::new(base.path().to_path_buf()).unwrap();

    assert!(base.path().join("config.ini").exists());
    assert!(system.data_path.is_dir());
    assert!(system.temp_path.is_dir());
    assert!(!base.path().join("config.ini.lock").exists(), "the lock must be released after construction");
}

#[test]
fn added_remote_survives_a_reload() {
    let base = tempfile::tempdir().unwrap();
    let mut system = System::new(base.path().to_path_buf()).unwrap();

    system
        .add_remote(RemoteConfig {
            kind: "folder".into(),
            name: "share".into(),
            root: Some(base.path().join("share").to_string_lossy().to_string()),
            default: true,
            ..Default::default()
        })
        .unwrap();

    assert!(system.remote_named("share").is_some());

    let reloaded = System::new(base.path().to_path_buf()).unwrap();
    assert!(reloaded.remote_named("share").is_some());
    assert!(reloaded.default_remote().is_some());
}

#[test]
fn deleted_remote_does_not_survive_a_reload() {
    let base = tempfile::tempdir().unwrap();
    let mut system = System::new(base.path().to_path_buf()).unwrap();
    system
        .add_remote(RemoteConfig {
            kind: "folder".into(),
            name: "share".into(),
            root: Some(base.path().join("share").to_string_lossy().to_string()),
            ..Default::default()
        })
        .unwrap();
    system.del_remote("share").unwrap();

    let reloaded = System::new(base.path().to_path_buf()).unwrap();
    assert!(reloaded.remote_named("share").is_none());
}

#[test]
fn toolset_autofill_is_dropped_from_the_written_config() {
    let base = tempfile::tempdir().unwrap();
    let mut system = System::new(base.path().to_path_buf()).unwrap();
    system
        .add_toolset(Toolset::new("/usr/bin/gcc", None, None, String::new(), true))
        .unwrap();

    let text = fs::read_to_string(base.path().join("config.ini")).unwrap();
    assert!(!text.contains("\"os\""), "auto-filled os/arch must be omitted from the serialized toolset");

    let reloaded = System::new(base.path().to_path_buf()).unwrap();
    assert_eq!(reloaded.toolsets.len(), 1);
    assert!(reloaded.toolsets[0].autofill);
}

#[test]
fn import_folder_copies_the_tree_and_reloads_the_store() {
    let base = tempfile::tempdir().unwrap();
    let mut system = System::new(base.path().to_path_buf()).unwrap();

    let staging = tempfile::tempdir().unwrap();
    let props = edm::identity::Properties::new("foo", "1.0");
    let src = staging.path().join(props.dirname());
    fs::create_dir_all(&src).unwrap();
    props.to_edp_file(&src.join("edp.info")).unwrap();

    let dest = system.import_folder(&src).unwrap();
    assert!(dest.join("edp.info").exists());
    assert_eq!(
        fs::read(dest.join("edp.info")).unwrap(),
        fs::read(src.join("edp.info")).unwrap(),
        "imported edp.info must be bytewise identical to the source"
    );
    assert_eq!(system.store.query(&edm::identity::Properties::new("foo", "*")).len(), 1);
}
