// SPDX-License-Identifier: MIT

//! Repository scaffolding.
//!
//! Creates the bare repository users push to, the server-side work tree
//! runs operate on, the large-object plumbing between them, and the hook
//! scripts that deliver trigger events back to this binary. Any failure
//! rolls the partially created repositories back unless the caller asked
//! to keep them for inspection.

use sluice_core::{config::CONFIG_ENV_VAR, worktree::BARE_DIR_ENV_VAR, Config, WorkTree};
use sluice_repo::{append_routes, Git, GitError, DEFAULT_BRANCH, DEFAULT_REMOTE};
use std::collections::BTreeSet;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Git(#[from] GitError),
    #[error("setup could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start engine scaffold `{command}`: {source}")]
    EngineSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("engine scaffold `{command}` exited with status {code}: {stderr}")]
    Engine { command: String, code: i32, stderr: String },
}

#[derive(Debug, Clone)]
pub struct SetupOptions {
    /// Work-tree path; the bare repository lands next to it as `<path>.git`.
    pub repo_path: PathBuf,
    /// Main pipeline the engine scaffolds the tree for.
    pub pipeline: String,
    /// Additional optional pipelines.
    pub extra_pipelines: Vec<String>,
    /// Keep partially created repositories on failure instead of rolling back.
    pub keep_partial: bool,
}

/// Create a pipeline repository: bare repo, work tree, large-object
/// store wiring, engine skeleton, seed commit, and trigger hooks.
pub async fn setup_repo(config: &Config, opts: &SetupOptions) -> Result<(), SetupError> {
    let io_at = |path: &Path| {
        let path = path.to_path_buf();
        move |source| SetupError::Io { path, source }
    };

    let work_path =
        std::path::absolute(&opts.repo_path).map_err(io_at(&opts.repo_path))?;
    let mut bare_name = work_path.clone().into_os_string();
    bare_name.push(".git");
    let bare_path = PathBuf::from(bare_name);

    std::fs::create_dir_all(&config.store.path).map_err(io_at(&config.store.path))?;

    match do_setup(config, opts, &bare_path, &work_path).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if opts.keep_partial {
                tracing::warn!(
                    bare = %bare_path.display(),
                    work = %work_path.display(),
                    "setup failed, keeping partial repositories"
                );
            } else {
                // Best-effort rollback; the original error is what matters.
                let _ = std::fs::remove_dir_all(&bare_path);
                let _ = std::fs::remove_dir_all(&work_path);
                tracing::warn!("setup failed, rolled back partial repositories");
            }
            Err(e)
        }
    }
}

async fn do_setup(
    config: &Config,
    opts: &SetupOptions,
    bare_path: &Path,
    work_path: &Path,
) -> Result<(), SetupError> {
    let filter = &config.routes.filter;
    let neutral = Git::new(work_path.parent().unwrap_or(Path::new(".")));

    neutral.init_bare(bare_path).await?;
    let bare = Git::new(bare_path);
    // Pin the branch name before the clone copies the HEAD symref.
    bare.set_head_branch(DEFAULT_BRANCH).await?;
    bare.lob_init(filter).await?;

    neutral.clone(bare_path, work_path).await?;
    let work = Git::new(work_path);
    work.set_head_branch(DEFAULT_BRANCH).await?;
    work.config("user.name", &config.commit.author).await?;
    work.config("user.email", &config.commit.email).await?;
    work.lob_init(filter).await?;

    scaffold_pipelines(config, opts, work_path).await?;

    write_file(&work_path.join(format!(".git{filter}")), &store_sync_file(config))?;
    seed_input_routes(config, work_path)?;
    write_script(&work_path.join("push.sh"), &push_script(filter))?;
    write_script(&work_path.join("pull.sh"), &pull_script(filter))?;

    work.add_all().await?;
    work.commit(&config.commit.message).await?;
    work.push(DEFAULT_REMOTE, DEFAULT_BRANCH).await?;

    install_hooks(bare_path, work_path)?;

    tracing::info!(
        bare = %bare_path.display(),
        work = %work_path.display(),
        "repository setup complete"
    );
    Ok(())
}

/// Run the engine's skeleton command to lay out the input/product tree.
async fn scaffold_pipelines(
    config: &Config,
    opts: &SetupOptions,
    work_path: &Path,
) -> Result<(), SetupError> {
    let mut args = vec!["skeleton".to_string(), opts.pipeline.clone()];
    args.extend(opts.extra_pipelines.iter().cloned());
    let command_line = format!("{} {}", config.engine.command, args.join(" "));

    let output = tokio::process::Command::new(&config.engine.command)
        .args(&args)
        .current_dir(work_path)
        .stdin(std::process::Stdio::null())
        .output()
        .await
        .map_err(|source| SetupError::EngineSpawn { command: command_line.clone(), source })?;

    if !output.status.success() {
        return Err(SetupError::Engine {
            command: command_line,
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Route every scaffolded `input/<dir>` through the large-object store.
fn seed_input_routes(config: &Config, work_path: &Path) -> Result<(), SetupError> {
    let input_root = work_path.join("input");
    let mut patterns = BTreeSet::new();
    if let Ok(entries) = std::fs::read_dir(&input_root) {
        for entry in entries.flatten() {
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    patterns.insert(format!("input/{name}/*"));
                }
            }
        }
    }
    let attributes_path = work_path.join(".gitattributes");
    append_routes(&attributes_path, &patterns, &config.routes.filter)
        .map_err(|source| SetupError::Io { path: attributes_path, source })?;
    Ok(())
}

/// Install `update` and `post-receive` hooks into the bare repository.
fn install_hooks(bare_path: &Path, work_path: &Path) -> Result<(), SetupError> {
    let tree = WorkTree::new(work_path);
    let binary = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("sluice"));
    let config_path = std::env::var(CONFIG_ENV_VAR).ok();

    for hook in ["update", "post-receive"] {
        let script = hook_script(hook, &tree.git_dir(), bare_path, &binary, config_path.as_deref());
        write_script(&bare_path.join("hooks").join(hook), &script)?;
    }
    Ok(())
}

fn hook_script(
    hook: &str,
    git_dir: &Path,
    bare_dir: &Path,
    binary: &Path,
    config_path: Option<&str>,
) -> String {
    let config_export = match config_path {
        Some(path) => format!("export {CONFIG_ENV_VAR}={path}\n"),
        None => String::new(),
    };
    format!(
        "#!/bin/bash\n\
         {config_export}\
         export {BARE_DIR_ENV_VAR}={bare_dir}\n\
         export GIT_DIR={git_dir}\n\
         cd \"$GIT_DIR/..\"\n\
         exec {binary} {hook} \"$@\"\n",
        bare_dir = bare_dir.display(),
        git_dir = git_dir.display(),
        binary = binary.display(),
    )
}

fn store_sync_file(config: &Config) -> String {
    format!("[rsync]\nremote = {}:{}\n", config.store.host, config.store.path.display())
}

fn push_script(filter: &str) -> String {
    format!(
        "#!/bin/bash\n\
         git {filter} init\n\
         git add .\n\
         git commit -m add\n\
         git {filter} push\n\
         git push origin master\n"
    )
}

fn pull_script(filter: &str) -> String {
    format!(
        "#!/bin/bash\n\
         git {filter} pull\n\
         git pull origin master\n"
    )
}

fn write_file(path: &Path, contents: &str) -> Result<(), SetupError> {
    std::fs::write(path, contents)
        .map_err(|source| SetupError::Io { path: path.to_path_buf(), source })
}

fn write_script(path: &Path, contents: &str) -> Result<(), SetupError> {
    write_file(path, contents)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|source| SetupError::Io { path: path.to_path_buf(), source })
}

#[cfg(test)]
#[path = "setup_tests.rs"]
mod tests;
