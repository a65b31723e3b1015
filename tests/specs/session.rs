// SPDX-License-Identifier: MIT

//! Specs for the run session, driven synchronously through the hidden
//! `run-session` subcommand.

use crate::prelude::*;
use std::path::Path;

fn lock_path(work: &Path) -> std::path::PathBuf {
    work.join(".git/sluice-run.lock")
}

fn run_session(project: &Project, work: &Path, bare: &Path) -> SpecCmd {
    project
        .sluice()
        .args(&["run-session", "--work-tree", &work.display().to_string()])
        .env("SLUICE_SPEC_BARE", &bare.display().to_string())
}

/// The full cycle: pull, engine, one autocommit, large objects pushed
/// before the metadata, lock released.
#[test]
fn run_creates_one_autocommit_and_pushes_it() {
    let project = Project::new();
    let (work, bare) = project.setup("demo.work", "demo");
    project.user_commit(&work, "input/demo/reads.txt", "user data");

    run_session(&project, &work, &bare).passes();

    let expected = format!("{AUTOCOMMIT_AUTHOR}\n{AUTOCOMMIT_MESSAGE}");
    assert_eq!(project.tip(&work, "HEAD"), expected);
    assert_eq!(project.tip(&bare, "master"), expected);
    assert_eq!(
        project.git(&work, &["rev-parse", "HEAD"]),
        project.git(&bare, &["rev-parse", "master"]),
    );
    assert!(project.git(&work, &["status", "--porcelain"]).is_empty());
    assert!(!lock_path(&work).exists(), "lock should be released");
    assert!(project.engine_invocations().contains("run --reporter web"));
}

/// The engine is invoked with the configured reporter URL and runner.
#[test]
fn run_passes_reporter_and_runner_options_to_the_engine() {
    let project = Project::new();
    let (work, bare) = project.setup("demo.work", "demo");
    project.user_commit(&work, "input/demo/reads.txt", "user data");

    run_session(&project, &work, &bare).passes();

    let invocation = project.engine_invocations();
    assert!(invocation.contains("--reporter-url http://localhost:8082/api/demo"));
    assert!(invocation.contains("--runner local"));
    assert!(invocation.contains("-n 1"));
    assert!(!invocation.contains("--partition"));
}

/// Large objects must be uploadable before the metadata referencing them
/// is published: the store push happens while the bare still lags.
#[test]
fn large_object_push_precedes_the_metadata_push() {
    let project = Project::new();
    let (work, bare) = project.setup("demo.work", "demo");
    project.user_commit(&work, "input/demo/reads.txt", "user data");

    run_session(&project, &work, &bare).passes();

    let transcript = project.transcript();
    let pull_at = transcript.find("fat-pull").unwrap();
    let push_at = transcript.find("fat-push").unwrap();
    assert!(pull_at < push_at, "store pull should precede store push:\n{transcript}");

    let state = transcript
        .lines()
        .find(|l| l.starts_with("push-state"))
        .expect("stub driver should snapshot the push state");
    let bare_rev = state.split("bare=").nth(1).unwrap().split_whitespace().next().unwrap();
    let head_rev = state.split("head=").nth(1).unwrap().trim();
    assert_ne!(bare_rev, head_rev, "metadata push must not have happened yet:\n{state}");
    assert_eq!(
        project.git(&bare, &["rev-parse", "master"]),
        head_rev,
        "metadata push lands the snapshotted commit afterwards"
    );
}

/// Products above the size threshold get routed through the store before
/// the commit; the attributes file stays duplicate-free across runs.
#[test]
fn oversized_products_are_routed_through_the_store() {
    let project = Project::new();
    let (work, bare) = project.setup("demo.work", "demo");
    project.file(".engine-big", "");
    project.user_commit(&work, "input/demo/reads.txt", "user data");

    run_session(&project, &work, &bare).passes();

    let attributes = std::fs::read_to_string(work.join(".gitattributes")).unwrap();
    assert!(attributes.contains("products/big.bin filter=fat -crlf"));
    // result.txt is tiny and stays unrouted.
    assert!(!attributes.contains("result.txt"));

    run_session(&project, &work, &bare).passes();
    let attributes = std::fs::read_to_string(work.join(".gitattributes")).unwrap();
    assert_eq!(attributes.matches("products/big.bin").count(), 1, "routes are appended once");
}

/// A run that changes nothing skips the commit but still pushes.
#[test]
fn run_without_changes_skips_the_commit() {
    let project = Project::new();
    let (work, bare) = project.setup("demo.work", "demo");
    project.user_commit(&work, "input/demo/reads.txt", "user data");
    run_session(&project, &work, &bare).passes();

    let before = project.git(&work, &["rev-parse", "HEAD"]);
    project.file(".engine-noop", "");
    run_session(&project, &work, &bare).passes();

    assert_eq!(project.git(&work, &["rev-parse", "HEAD"]), before, "no empty autocommit");
    assert_eq!(project.git(&bare, &["rev-parse", "master"]), before);
}

/// Engine failure aborts the run but still releases the lock and leaves
/// no autocommit behind.
#[test]
fn engine_failure_releases_the_lock_without_committing() {
    let project = Project::new();
    let (work, bare) = project.setup("demo.work", "demo");
    project.user_commit(&work, "input/demo/reads.txt", "user data");
    let before = project.git(&work, &["rev-parse", "HEAD"]);
    project.file(".engine-fail", "");

    run_session(&project, &work, &bare)
        .fails()
        .stderr_has("exited with status 3");

    assert!(!lock_path(&work).exists(), "lock must be released on failure");
    assert_eq!(project.git(&work, &["rev-parse", "HEAD"]), before);
}

/// A second session against a locked work tree refuses to run.
#[test]
fn concurrent_session_is_refused_and_leaves_the_lock_alone() {
    let project = Project::new();
    let (work, bare) = project.setup("demo.work", "demo");
    std::fs::write(lock_path(&work), "4194303 2026-01-01T00:00:00+00:00\n").unwrap();

    run_session(&project, &work, &bare)
        .fails()
        .stderr_has("already in progress");

    assert!(lock_path(&work).exists(), "the foreign lock must not be touched");
    assert_eq!(project.engine_invocations(), "", "engine must not run");
}

/// The session pulls user commits from the bare repository before running.
#[test]
fn run_pulls_the_bare_tip_first() {
    let project = Project::new();
    let (work, bare) = project.setup("demo.work", "demo");

    // Land a user commit in the bare only, via a second clone.
    for hook in ["update", "post-receive"] {
        std::fs::remove_file(bare.join("hooks").join(hook)).unwrap();
    }
    let clone = project.path().join("user");
    project.git(project.path(), &["clone", &bare.display().to_string(), "user"]);
    project.user_commit(&clone, "input/demo/reads.txt", "user data");
    project.git(&clone, &["push", "origin", "master"]);

    run_session(&project, &work, &bare).passes();

    let user_rev = project.git(&clone, &["rev-parse", "master"]);
    project.git(&work, &["merge-base", "--is-ancestor", &user_rev, "HEAD"]);
    assert!(work.join("input/demo/reads.txt").exists(), "pulled content is on disk");
}
