// SPDX-License-Identifier: MIT

//! Specs for `sluice status` and `sluice unlock`: lock visibility and the
//! explicit stale-lock recovery path.

use crate::prelude::*;
use std::path::Path;

fn lock_path(work: &Path) -> std::path::PathBuf {
    work.join(".git/sluice-run.lock")
}

fn write_lock(work: &Path, pid: u32) {
    std::fs::write(lock_path(work), format!("{pid} 2026-01-01T00:00:00+00:00\n")).unwrap();
}

/// A pid that certainly refers to no live process: a reaped child.
fn dead_pid() -> u32 {
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let pid = child.id();
    child.wait().unwrap();
    pid
}

#[test]
fn status_reports_idle_when_no_lock_is_held() {
    let project = Project::new();
    let (work, _bare) = project.setup("demo.work", "demo");

    project
        .sluice()
        .args(&["status", "--work-tree", &work.display().to_string()])
        .passes()
        .stdout_has("demo: idle");
}

#[test]
fn status_reports_a_running_job_with_its_owner() {
    let project = Project::new();
    let (work, _bare) = project.setup("demo.work", "demo");
    let pid = std::process::id();
    write_lock(&work, pid);

    project
        .sluice()
        .args(&["status", "--work-tree", &work.display().to_string()])
        .passes()
        .stdout_has("run in progress")
        .stdout_has(&format!("pid {pid}"))
        .stdout_has("http://localhost:8082/api/demo");
}

#[test]
fn status_flags_a_stale_lock_whose_owner_died() {
    let project = Project::new();
    let (work, _bare) = project.setup("demo.work", "demo");
    write_lock(&work, dead_pid());

    project
        .sluice()
        .args(&["status", "--work-tree", &work.display().to_string()])
        .passes()
        .stdout_has("stale")
        .stdout_has("unlock");
}

#[test]
fn status_json_is_machine_readable() {
    let project = Project::new();
    let (work, _bare) = project.setup("demo.work", "demo");

    let idle = project
        .sluice()
        .args(&["status", "--work-tree", &work.display().to_string(), "--json"])
        .passes();
    let value: serde_json::Value = serde_json::from_str(&idle.stdout).unwrap();
    assert_eq!(value["project"], "demo");
    assert_eq!(value["running"], false);

    let pid = std::process::id();
    write_lock(&work, pid);
    let running = project
        .sluice()
        .args(&["status", "--work-tree", &work.display().to_string(), "--json"])
        .passes();
    let value: serde_json::Value = serde_json::from_str(&running.stdout).unwrap();
    assert_eq!(value["running"], true);
    assert_eq!(value["pid"], pid);
    assert_eq!(value["owner_alive"], true);
}

#[test]
fn unlock_with_no_lock_is_a_no_op() {
    let project = Project::new();
    let (work, _bare) = project.setup("demo.work", "demo");

    project
        .sluice()
        .args(&["unlock", "--work-tree", &work.display().to_string()])
        .passes()
        .stdout_has("no lock held");
}

#[test]
fn unlock_removes_a_lock_whose_owner_died() {
    let project = Project::new();
    let (work, _bare) = project.setup("demo.work", "demo");
    write_lock(&work, dead_pid());

    project
        .sluice()
        .args(&["unlock", "--work-tree", &work.display().to_string()])
        .passes()
        .stdout_has("lock removed");
    assert!(!lock_path(&work).exists());
}

#[test]
fn unlock_refuses_a_live_owner_unless_forced() {
    let project = Project::new();
    let (work, _bare) = project.setup("demo.work", "demo");
    write_lock(&work, std::process::id());

    project
        .sluice()
        .args(&["unlock", "--work-tree", &work.display().to_string()])
        .fails()
        .stderr_has("--force");
    assert!(lock_path(&work).exists(), "lock must survive a refused unlock");

    project
        .sluice()
        .args(&["unlock", "--work-tree", &work.display().to_string(), "--force"])
        .passes()
        .stdout_has("lock removed");
    assert!(!lock_path(&work).exists());
}

#[test]
fn unlock_requires_force_for_a_malformed_marker() {
    let project = Project::new();
    let (work, _bare) = project.setup("demo.work", "demo");
    std::fs::write(lock_path(&work), "not a lock marker\n").unwrap();

    project
        .sluice()
        .args(&["unlock", "--work-tree", &work.display().to_string()])
        .fails()
        .stderr_has("malformed");

    project
        .sluice()
        .args(&["unlock", "--work-tree", &work.display().to_string(), "--force"])
        .passes();
    assert!(!lock_path(&work).exists());
}
