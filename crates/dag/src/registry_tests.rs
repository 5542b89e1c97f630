// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use tempfile::tempdir;

fn write_dag(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

#[test]
fn initialize_on_missing_directory_is_empty() {
    let registry = Registry::initialize("/nonexistent/path/for/loom/tests").unwrap();
    assert!(registry.is_empty());
}

#[test]
fn initialize_parses_every_yaml_file() {
    let dir = tempdir().unwrap();
    write_dag(dir.path(), "a.yaml", "schedule:\n  start: [\"0 1 * * *\"]\n");
    write_dag(dir.path(), "b.yml", "name: b\n");
    write_dag(dir.path(), "readme.md", "not a dag");

    let registry = Registry::initialize(dir.path()).unwrap();
    assert_eq!(registry.len(), 2);
    assert!(registry.get("a").is_some());
    assert!(registry.get("b").is_some());
}

#[test]
fn invalid_files_are_skipped_not_fatal() {
    let dir = tempdir().unwrap();
    write_dag(dir.path(), "good.yaml", "name: good\n");
    write_dag(dir.path(), "bad.yaml", "schedule:\n  start: [\"nonsense\"]\n");

    let registry = Registry::initialize(dir.path()).unwrap();
    assert_eq!(registry.len(), 1);
    assert!(registry.get("good").is_some());
}

#[test]
fn rescan_picks_up_newly_added_files() {
    let dir = tempdir().unwrap();
    write_dag(dir.path(), "a.yaml", "name: a\n");
    let registry = Registry::initialize(dir.path()).unwrap();
    assert_eq!(registry.len(), 1);

    write_dag(dir.path(), "b.yaml", "name: b\n");
    registry.rescan().unwrap();
    assert_eq!(registry.len(), 2);
}

#[test]
fn rescan_drops_entries_for_files_that_no_longer_exist() {
    let dir = tempdir().unwrap();
    write_dag(dir.path(), "a.yaml", "name: a\n");
    write_dag(dir.path(), "b.yaml", "name: b\n");
    let registry = Registry::initialize(dir.path()).unwrap();
    assert_eq!(registry.len(), 2);

    std::fs::remove_file(dir.path().join("b.yaml")).unwrap();
    registry.rescan().unwrap();
    assert_eq!(registry.len(), 1);
    assert!(registry.get("a").is_some());
    assert!(registry.get("b").is_none());
}

#[cfg(unix)]
#[test]
fn rescan_keeps_the_last_known_good_entry_for_a_transiently_unreadable_file() {
    let dir = tempdir().unwrap();
    write_dag(dir.path(), "a.yaml", "name: a\n");
    let path = dir.path().join("a.yaml");
    let registry = Registry::initialize(dir.path()).unwrap();
    assert!(registry.get("a").is_some());

    // Replace the file with a dangling symlink: same path, same `.yaml`
    // extension, but unreadable regardless of the process's privileges.
    std::fs::remove_file(&path).unwrap();
    std::os::unix::fs::symlink(dir.path().join("does-not-exist"), &path).unwrap();

    registry.rescan().unwrap();

    // The file couldn't be read this pass, so its previous entry survives
    // rather than disappearing from the registry.
    assert!(registry.get("a").is_some());
}

#[test]
fn upsert_path_reparses_only_the_changed_file() {
    let dir = tempdir().unwrap();
    write_dag(dir.path(), "a.yaml", "name: a\nmax_active_runs: 1\n");
    write_dag(dir.path(), "b.yaml", "name: b\n");
    let registry = Registry::initialize(dir.path()).unwrap();

    write_dag(dir.path(), "a.yaml", "name: a\nmax_active_runs: 5\n");
    registry.upsert_path(&dir.path().join("a.yaml"));

    assert_eq!(registry.get("a").unwrap().max_active_runs, 5);
    assert!(registry.get("b").is_some());
    assert_eq!(registry.len(), 2);
}

#[test]
fn upsert_path_on_an_invalid_file_keeps_the_previous_entry() {
    let dir = tempdir().unwrap();
    write_dag(dir.path(), "a.yaml", "name: a\n");
    let registry = Registry::initialize(dir.path()).unwrap();

    write_dag(dir.path(), "a.yaml", "schedule:\n  start: [\"nonsense\"]\n");
    registry.upsert_path(&dir.path().join("a.yaml"));

    assert!(registry.get("a").is_some());
}

#[test]
fn remove_path_deletes_only_the_matching_entry() {
    let dir = tempdir().unwrap();
    write_dag(dir.path(), "a.yaml", "name: a\n");
    write_dag(dir.path(), "b.yaml", "name: b\n");
    let registry = Registry::initialize(dir.path()).unwrap();

    std::fs::remove_file(dir.path().join("a.yaml")).unwrap();
    registry.remove_path(&dir.path().join("a.yaml"));

    assert!(registry.get("a").is_none());
    assert!(registry.get("b").is_some());
}

#[test]
fn recursive_subdirectories_are_scanned() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    write_dag(&dir.path().join("nested"), "deep.yaml", "name: deep\n");

    let registry = Registry::initialize(dir.path()).unwrap();
    assert!(registry.get("deep").is_some());
}

#[test]
fn due_entries_flattens_and_sorts_across_dags() {
    let dir = tempdir().unwrap();
    write_dag(dir.path(), "a.yaml", "name: a\nschedule:\n  start: [\"0 3 * * *\"]\n");
    write_dag(dir.path(), "b.yaml", "name: b\nschedule:\n  start: [\"0 1 * * *\"]\n");
    let registry = Registry::initialize(dir.path()).unwrap();

    let now = chrono::Utc.with_ymd_and_hms(2024, 5, 1, 4, 0, 0).unwrap();
    let suspend = SuspendFlags::new(dir.path().join("suspend"));
    let entries = registry.due_entries(now, &suspend, chrono_tz::UTC);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].dag_name().as_str(), "b");
    assert_eq!(entries[1].dag_name().as_str(), "a");
}

#[test]
fn due_entries_excludes_suspended_dags() {
    let dir = tempdir().unwrap();
    write_dag(dir.path(), "a.yaml", "name: a\nschedule:\n  start: [\"0 3 * * *\"]\n");
    write_dag(dir.path(), "b.yaml", "name: b\nschedule:\n  start: [\"0 1 * * *\"]\n");
    let registry = Registry::initialize(dir.path()).unwrap();

    let now = chrono::Utc.with_ymd_and_hms(2024, 5, 1, 4, 0, 0).unwrap();
    let suspend = SuspendFlags::new(dir.path().join("suspend"));
    suspend.suspend("a").unwrap();

    let entries = registry.due_entries(now, &suspend, chrono_tz::UTC);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].dag_name().as_str(), "b");
}
