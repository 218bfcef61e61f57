// src/system/executor.rs

use crate::CancellationToken;
use std::collections::HashMap;
use std::env;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, ExitStatus, Stdio};
use std::sync::atomic::Ordering;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command could not be parsed: {0}")]
    CommandParse(String),
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    #[error("Command '{command}' exited with status {code}.")]
    NonZeroExitStatus { command: String, code: i32 },
    #[error("Operation was cancelled by the user.")]
    Cancelled,
}

impl ExecutionError {
    /// The exit status this error should turn into at the process boundary.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NonZeroExitStatus { code, .. } => *code,
            Self::Cancelled => 130,
            _ => 1,
        }
    }
}

/// Splits the leading `-` "ignore failure" marker off a raw command line.
///
/// Only call this on lines as written by the user, before any value is
/// substituted into them.
pub fn strip_failure_marker(command_line: &str) -> (&str, bool) {
    let trimmed = command_line.trim();
    match trimmed.strip_prefix('-') {
        Some(rest) => (rest.trim_start(), true),
        None => (trimmed, false),
    }
}

/// Executes a command line in `cwd`, inheriting stdout and stderr.
///
/// The line is split with shell quoting rules but no shell is involved. With
/// `ignore_errors`, a non-zero exit status is not an error. The call blocks
/// until the child exits or the cancellation token is raised, in which case
/// the child is killed.
pub fn execute_command(
    command_line: &str,
    ignore_errors: bool,
    cwd: &Path,
    env_vars: &HashMap<String, String>,
    cancellation_token: &CancellationToken,
) -> Result<(), ExecutionError> {
    let final_command_line = command_line.trim();

    if final_command_line.is_empty() {
        return Ok(()); // An empty command is a success, not an error.
    }

    let parts = shlex::split(final_command_line)
        .ok_or_else(|| ExecutionError::CommandParse(final_command_line.to_string()))?;
    let Some((program, args)) = parts.split_first() else {
        return Ok(());
    };

    let clean_cwd = dunce::simplified(cwd);
    log::debug!(
        "Executing '{}' in {}",
        final_command_line,
        clean_cwd.display()
    );

    let mut command = StdCommand::new(program);
    command
        .args(args)
        .current_dir(clean_cwd)
        .envs(env_vars)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    // Built-ins like `echo` only exist inside cmd.exe on Windows.
    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == ErrorKind::NotFound && cfg!(target_os = "windows") => {
            log::debug!("Command '{}' not found. Retrying with cmd /C.", program);
            StdCommand::new("cmd")
                .arg("/C")
                .arg(final_command_line)
                .current_dir(clean_cwd)
                .envs(env_vars)
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .spawn()
                .map_err(|e| ExecutionError::CommandFailed(final_command_line.to_string(), e))?
        }
        Err(e) => {
            return Err(ExecutionError::CommandFailed(
                final_command_line.to_string(),
                e,
            ));
        }
    };

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() && !ignore_errors {
                    return Err(ExecutionError::NonZeroExitStatus {
                        command: final_command_line.to_string(),
                        code: status_code(status),
                    });
                }
                return Ok(());
            }
            Ok(None) => {
                if cancellation_token.load(Ordering::SeqCst) {
                    log::debug!(
                        "Cancellation requested, killing child process (PID: {})...",
                        child.id()
                    );
                    if let Err(e) = child.kill() {
                        log::warn!("Failed to kill child process {}: {}", child.id(), e);
                    }
                    child.wait().ok();
                    return Err(ExecutionError::Cancelled);
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                return Err(ExecutionError::CommandFailed(
                    final_command_line.to_string(),
                    e,
                ));
            }
        }
    }
}

fn status_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

/// Looks for an executable: first in `<cwd>/vendor/bin`, then on `PATH`.
pub fn find_executable(name: &str, cwd: &Path) -> Option<PathBuf> {
    let vendor = cwd.join("vendor").join("bin").join(name);
    if vendor.is_file() {
        return Some(vendor);
    }

    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .flat_map(|dir| executable_candidates(&dir, name))
        .find(|candidate| candidate.is_file())
}

fn executable_candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        vec![
            dir.join(format!("{}.exe", name)),
            dir.join(format!("{}.bat", name)),
            dir.join(name),
        ]
    } else {
        vec![dir.join(name)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn token() -> CancellationToken {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn test_empty_command_is_success() {
        let dir = tempfile::tempdir().unwrap();
        assert!(execute_command("   ", false, dir.path(), &HashMap::new(), &token()).is_ok());
    }

    #[test]
    fn test_unbalanced_quotes_fail_to_parse() {
        let dir = tempfile::tempdir().unwrap();
        let result = execute_command("echo 'oops", false, dir.path(), &HashMap::new(), &token());
        assert!(matches!(result, Err(ExecutionError::CommandParse(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_reported_unless_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let result = execute_command("false", false, dir.path(), &HashMap::new(), &token());
        match result {
            Err(e @ ExecutionError::NonZeroExitStatus { .. }) => assert_eq!(e.exit_code(), 1),
            other => panic!("Expected a non-zero exit error, got {:?}", other),
        }
        assert!(execute_command("false", true, dir.path(), &HashMap::new(), &token()).is_ok());
    }

    #[test]
    fn test_failure_marker_is_split_off() {
        assert_eq!(strip_failure_marker("  - rm -rf build"), ("rm -rf build", true));
        assert_eq!(strip_failure_marker("make clean "), ("make clean", false));
        assert_eq!(strip_failure_marker("-"), ("", true));
    }

    #[cfg(unix)]
    #[test]
    fn test_leading_dash_is_not_a_marker_here() {
        let dir = tempfile::tempdir().unwrap();
        let result = execute_command("-false", false, dir.path(), &HashMap::new(), &token());
        assert!(matches!(result, Err(ExecutionError::CommandFailed(..))));
    }

    #[test]
    fn test_find_executable_prefers_vendor_bin() {
        let dir = tempfile::tempdir().unwrap();
        let vendor_bin = dir.path().join("vendor").join("bin");
        std::fs::create_dir_all(&vendor_bin).unwrap();
        std::fs::write(vendor_bin.join("phpunit"), "").unwrap();

        let found = find_executable("phpunit", dir.path()).unwrap();
        assert_eq!(found, vendor_bin.join("phpunit"));
    }
}
