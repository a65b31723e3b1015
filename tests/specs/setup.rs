// SPDX-License-Identifier: MIT

//! Specs for `sluice setup`: repository scaffolding, seed commit, hook
//! installation, and rollback on failure.

use crate::prelude::*;
use std::os::unix::fs::PermissionsExt;

#[test]
fn setup_creates_bare_and_work_repositories() {
    let project = Project::new();
    let (work, bare) = project.setup("demo.work", "demo");

    assert!(bare.join("HEAD").exists(), "bare repository should exist");
    assert!(work.join(".git").is_dir(), "work tree should be a clone");
    assert!(work.join("input/demo").is_dir(), "skeleton should scaffold the pipeline");
    assert!(work.join("products").is_dir());
}

#[test]
fn setup_seeds_an_autocommit_and_pushes_it() {
    let project = Project::new();
    let (work, bare) = project.setup("demo.work", "demo");

    let expected = format!("{AUTOCOMMIT_AUTHOR}\n{AUTOCOMMIT_MESSAGE}");
    assert_eq!(project.tip(&work, "HEAD"), expected);
    assert_eq!(project.tip(&bare, "master"), expected);
    assert_eq!(
        project.git(&work, &["rev-parse", "HEAD"]),
        project.git(&bare, &["rev-parse", "master"]),
        "seed commit should be pushed to the bare repository"
    );
}

#[test]
fn setup_writes_store_wiring_and_operator_scripts() {
    let project = Project::new();
    let (work, _bare) = project.setup("demo.work", "demo");

    let sync = std::fs::read_to_string(work.join(".gitfat")).unwrap();
    assert!(sync.contains("[rsync]"));
    assert!(sync.contains("localhost:"));
    assert!(sync.contains("store"));

    let attributes = std::fs::read_to_string(work.join(".gitattributes")).unwrap();
    assert!(attributes.contains("input/demo/* filter=fat -crlf"));

    for script in ["push.sh", "pull.sh"] {
        let mode = std::fs::metadata(work.join(script)).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755, "{script} should be executable");
    }

    // Both repositories had the large-object extension initialized.
    assert!(project.transcript().matches("fat-init").count() >= 2);
}

#[test]
fn setup_installs_executable_trigger_hooks() {
    let project = Project::new();
    let (work, bare) = project.setup("demo.work", "demo");

    for hook in ["update", "post-receive"] {
        let path = bare.join("hooks").join(hook);
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755, "{hook} hook should be executable");

        let script = std::fs::read_to_string(&path).unwrap();
        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains(&format!("export SLUICE_BARE_DIR={}", bare.display())));
        assert!(script.contains(&format!("export GIT_DIR={}", work.join(".git").display())));
        assert!(script.contains(&format!("export SLUICE_CONFIG={}", project.config_path().display())));
        assert!(script.contains("exec "));
        assert!(script.contains(hook));
    }
}

#[test]
fn setup_supports_additional_pipelines() {
    let project = Project::new();
    project
        .sluice()
        .args(&["setup", "-d", "multi.work", "-p", "demo", "-A", "extra"])
        .passes();

    let work = project.path().join("multi.work");
    assert!(work.join("input/demo").is_dir());
    assert!(work.join("input/extra").is_dir());

    let attributes = std::fs::read_to_string(work.join(".gitattributes")).unwrap();
    assert!(attributes.contains("input/extra/* filter=fat -crlf"));
}

#[test]
fn setup_rolls_back_partial_repositories_on_engine_failure() {
    let project = Project::new();
    project.stub("pipeline", "#!/bin/bash\nexit 1\n");

    project
        .sluice()
        .args(&["setup", "-d", "broken.work", "-p", "demo"])
        .fails()
        .stderr_has("engine scaffold");

    assert!(!project.path().join("broken.work").exists(), "work tree should be rolled back");
    assert!(!project.path().join("broken.work.git").exists(), "bare repo should be rolled back");
}

#[test]
fn setup_keep_partial_preserves_the_wreckage() {
    let project = Project::new();
    project.stub("pipeline", "#!/bin/bash\nexit 1\n");

    project
        .sluice()
        .args(&["setup", "-d", "broken.work", "-p", "demo", "--keep-partial"])
        .fails();

    assert!(project.path().join("broken.work").exists());
    assert!(project.path().join("broken.work.git").exists());
}
