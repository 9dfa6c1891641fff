// tests/remote_scenarios.rs

//! Remote pull/push round trip and duplicate-push refusal, exercised
//! against the shared-folder backend (same `Remote` contract as the HTTP
//! and FTP backends, without requiring a live server in the test harness).

use edm::dependency::Dependency;
use edm::identity::Properties;
use edm::remote::folder::Folder;
use edm::remote::Remote;
use std::fs;

fn build_package_archive(staging_dir: &std::path::Path, name: &str, version: &str) -> (Dependency, std::path::PathBuf) {
    let props = Properties::new(name, version);
    let pkg_dir = staging_dir.join(props.dirname());
    fs::create_dir_all(&pkg_dir).unwrap();
    props.to_edp_file(&pkg_dir.join("edp.info")).unwrap();
    fs::write(pkg_dir.join("lib.h"), b"// header").unwrap();

    let archive_dest = staging_dir.join("archives");
    fs::create_dir_all(&archive_dest).unwrap();
    let archive_path = archive_dest.join(format!("{}.tgz", props.dirname()));
    let file = fs::File::create(&archive_path).unwrap();
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(&props.dirname(), &pkg_dir).unwrap();
    builder.into_inner().unwrap().finish().unwrap();

    (Dependency::new(props), archive_path)
}

#[test]
fn push_then_pull_round_trips_through_a_remote() {
    let remote_root = tempfile::tempdir().unwrap();
    let mut remote = Folder::new("shared", remote_root.path().to_path_buf(), true);
    remote.connect().unwrap();

    let staging = tempfile::tempdir().unwrap();
    let (dep, archive) = build_package_archive(staging.path(), "foo", "1.0");

    remote.push(&dep, &archive, false).unwrap();

    assert_eq!(
        remote.query(&Properties::new("foo", "*")).len(),
        1,
        "query(dep) must return a match in the same process after push succeeds"
    );

    let dest = tempfile::tempdir().unwrap();
    let pulled = remote.pull(&dep, dest.path()).unwrap();
    assert!(pulled.exists());
}

#[test]
fn push_refuses_a_duplicate_unless_forced() {
    let remote_root = tempfile::tempdir().unwrap();
    let mut remote = Folder::new("shared", remote_root.path().to_path_buf(), true);
    remote.connect().unwrap();

    let staging = tempfile::tempdir().unwrap();
    let (dep, archive) = build_package_archive(staging.path(), "foo", "1.0");
    remote.push(&dep, &archive, false).unwrap();

    let result = remote.push(&dep, &archive, false);
    assert!(result.is_err(), "pushing an already-listed identity without force must fail");

    let result = remote.push(&dep, &archive, true);
    assert!(result.is_ok(), "force=true must allow overwriting an existing entry");
}

#[test]
fn pull_requires_exactly_one_match() {
    let remote_root = tempfile::tempdir().unwrap();
    let mut remote = Folder::new("shared", remote_root.path().to_path_buf(), true);
    remote.connect().unwrap();

    let query = Properties::new("nonexistent", "*");
    let unmatched = Dependency::new(query);
    let dest = tempfile::tempdir().unwrap();
    assert!(remote.pull(&unmatched, dest.path()).is_err());
}
