//! Validation targets
//!
//! A [`ValidationTarget`] is the module under test plus everything needed to
//! invoke the tool against it. One is built fresh for every scenario and
//! dropped when the scenario ends, taking its scratch directory with it.
//!
//! ```text
//! /tmp/nodecheck-XXXX/
//! ├── module/     copy of module_dir (isolate_workdir = true)
//! └── tf-data/    TF_DATA_DIR: providers, modules, backend state
//! ```
//!
//! Concurrent scenarios therefore never share a working directory or a
//! plugin cache, and `terraform init` in one cannot race another.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tracing::debug;

use nodecheck_core::config::ValidationConfig;

use crate::error::HarnessError;
use crate::retry::RetryPolicy;
use crate::scenario::Scenario;

/// Directories never copied into a scratch workdir.
const SKIPPED_DIRS: &[&str] = &[".terraform", ".git"];

/// Invocation options shared (by value) by every target of a run.
#[derive(Debug, Clone)]
pub struct TargetOptions {
    /// Module under test
    pub module_dir: PathBuf,
    /// Pass `-no-color`
    pub no_color: bool,
    /// Initialise the configured backend
    pub backend: bool,
    /// Copy the module into the scratch directory
    pub isolate_workdir: bool,
    /// Limit per tool command
    pub command_timeout: Duration,
    /// Transient error handling
    pub retry: RetryPolicy,
}

impl TargetOptions {
    /// Options for `module_dir` with defaults everywhere else.
    pub fn new(module_dir: impl Into<PathBuf>) -> Self {
        Self {
            module_dir: module_dir.into(),
            no_color: true,
            backend: false,
            isolate_workdir: true,
            command_timeout: Duration::from_secs(300),
            retry: RetryPolicy::default(),
        }
    }

    /// Builds options from the `[validation]` config section.
    ///
    /// # Errors
    ///
    /// `HarnessError::Config` if an extra retryable pattern does not compile.
    pub fn from_config(config: &ValidationConfig) -> Result<Self, HarnessError> {
        let retry = RetryPolicy::new(
            config.max_retries,
            Duration::from_secs(config.retry_backoff_secs),
        )
        .with_extra_patterns(&config.extra_retryable_errors)?;

        Ok(Self {
            module_dir: PathBuf::from(&config.module_dir),
            no_color: config.no_color,
            backend: config.backend,
            isolate_workdir: config.isolate_workdir,
            command_timeout: Duration::from_secs(config.command_timeout_secs),
            retry,
        })
    }
}

/// The module under test, prepared for one scenario.
#[derive(Debug)]
pub struct ValidationTarget {
    scenario: String,
    workdir: PathBuf,
    data_dir: PathBuf,
    options: TargetOptions,
    // removed on drop
    _scratch: TempDir,
}

impl ValidationTarget {
    /// Creates a private scratch directory for `scenario` and, if enabled,
    /// copies the module into it.
    ///
    /// # Errors
    ///
    /// - `HarnessError::Environment` if the module directory cannot be read
    /// - `HarnessError::Io` if the scratch directory cannot be populated
    pub async fn prepare(options: &TargetOptions, scenario: &Scenario) -> Result<Self, HarnessError> {
        let options = options.clone();
        let scenario_name = scenario.name.clone();

        tokio::task::spawn_blocking(move || Self::prepare_blocking(options, scenario_name))
            .await
            .map_err(|e| HarnessError::Aborted(format!("spawn_blocking failed: {e}")))?
    }

    fn prepare_blocking(options: TargetOptions, scenario: String) -> Result<Self, HarnessError> {
        let module_dir = &options.module_dir;
        match std::fs::metadata(module_dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(HarnessError::environment(format!(
                    "module path '{}' is not a directory",
                    module_dir.display()
                )));
            }
            Err(e) => {
                return Err(HarnessError::environment(format!(
                    "cannot access module directory '{}': {e}",
                    module_dir.display()
                )));
            }
        }

        let scratch = tempfile::Builder::new()
            .prefix("nodecheck-")
            .tempdir()
            .map_err(|e| HarnessError::Io {
                path: std::env::temp_dir().display().to_string(),
                source: e,
            })?;

        let data_dir = scratch.path().join("tf-data");
        std::fs::create_dir(&data_dir).map_err(|e| io_error(&data_dir, e))?;

        let workdir = if options.isolate_workdir {
            let dest = scratch.path().join("module");
            copy_module(module_dir, &dest)?;
            dest
        } else {
            module_dir.clone()
        };

        debug!(
            scenario = %scenario,
            workdir = %workdir.display(),
            data_dir = %data_dir.display(),
            "validation target prepared"
        );

        Ok(Self {
            scenario,
            workdir,
            data_dir,
            options,
            _scratch: scratch,
        })
    }

    /// Scenario this target was prepared for.
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    /// Directory the tool runs in.
    pub fn working_dir(&self) -> &Path {
        &self.workdir
    }

    /// Private `TF_DATA_DIR`.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Invocation options.
    pub fn options(&self) -> &TargetOptions {
        &self.options
    }
}

/// Recursively copies `src` into `dest`, skipping tool state directories.
///
/// Links to files are copied as files. Links to directories are recreated
/// as links, so a link back into the module cannot recurse forever.
fn copy_module(src: &Path, dest: &Path) -> Result<(), HarnessError> {
    let root = std::fs::canonicalize(src).map_err(|e| io_error(src, e))?;
    copy_tree(&root, src, dest)
}

fn copy_tree(root: &Path, src: &Path, dest: &Path) -> Result<(), HarnessError> {
    std::fs::create_dir_all(dest).map_err(|e| io_error(dest, e))?;

    let entries = std::fs::read_dir(src).map_err(|e| io_error(src, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_error(src, e))?;
        let name = entry.file_name();
        if SKIPPED_DIRS.iter().any(|skip| name == *skip) {
            continue;
        }

        let from = entry.path();
        let to = dest.join(&name);
        let file_type = entry.file_type().map_err(|e| io_error(&from, e))?;
        if file_type.is_symlink() {
            copy_link(root, &from, &to)?;
        } else if file_type.is_dir() {
            copy_tree(root, &from, &to)?;
        } else {
            std::fs::copy(&from, &to).map_err(|e| io_error(&from, e))?;
        }
    }
    Ok(())
}

fn copy_link(root: &Path, from: &Path, to: &Path) -> Result<(), HarnessError> {
    match std::fs::metadata(from) {
        Ok(meta) if meta.is_file() => {
            std::fs::copy(from, to).map_err(|e| io_error(from, e))?;
            Ok(())
        }
        _ => relink(root, from, to),
    }
}

/// Recreates a directory (or dangling) link. Targets inside the module keep
/// their relative form; targets outside it are pinned to their absolute path.
#[cfg(unix)]
fn relink(root: &Path, from: &Path, to: &Path) -> Result<(), HarnessError> {
    let link = std::fs::read_link(from).map_err(|e| io_error(from, e))?;
    let target = match std::fs::canonicalize(from) {
        Ok(resolved) if !resolved.starts_with(root) => resolved,
        _ => link,
    };
    std::os::unix::fs::symlink(&target, to).map_err(|e| io_error(to, e))
}

#[cfg(not(unix))]
fn relink(_root: &Path, from: &Path, _to: &Path) -> Result<(), HarnessError> {
    debug!(path = %from.display(), "skipping directory link in module copy");
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> HarnessError {
    HarnessError::Io {
        path: path.display().to_string(),
        source,
    }
}
