//! # Task Library
//!
//! Wrappers around third-party tools. A task only has to know how to build
//! its command line; running it goes through the system executor.
//!
//! ## Modules
//!
//! - **`composer`**: `composer install`, `update`, `dump-autoload` and `validate`.
//! - **`testing`**: the PHPUnit runner.

use crate::core::io::Io;
use crate::system::executor::{self, ExecutionError};
use crate::CancellationToken;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub mod composer;
pub mod testing;

/// Why a task did not complete.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("{task}: neither a local {executable} nor a global installation could be found.")]
    ExecutableNotFound { task: String, executable: String },
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl TaskError {
    /// The exit status the failed task maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ExecutableNotFound { .. } => 1,
            Self::Execution(e) => e.exit_code(),
        }
    }
}

/// Where and how tasks run.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
    pub cancellation_token: CancellationToken,
    pub io: Io,
}

/// A task that boils down to one command line.
pub trait CommandTask: fmt::Debug {
    fn command_line(&self) -> String;

    /// Whether a non-zero exit status still counts as success.
    fn allows_failure(&self) -> bool {
        false
    }

    fn run(&self, context: &TaskContext) -> Result<(), TaskError> {
        let line = self.command_line();
        if context.io.is_verbose() {
            context.io.say(&line);
        }
        executor::execute_command(
            &line,
            self.allows_failure(),
            &context.cwd,
            &context.env,
            &context.cancellation_token,
        )?;
        Ok(())
    }
}

/// A program followed by the arguments and options added to it, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exec {
    command: String,
    arguments: String,
    allow_failure: bool,
}

impl Exec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            arguments: String::new(),
            allow_failure: false,
        }
    }

    /// Lets the task succeed whatever its exit status.
    pub fn allow_failure(mut self, allow: bool) -> Self {
        self.allow_failure = allow;
        self
    }

    /// Appends a quoted argument.
    pub fn arg(mut self, arg: &str) -> Self {
        self.push_arg(arg);
        self
    }

    pub fn args<'a>(mut self, args: impl IntoIterator<Item = &'a str>) -> Self {
        for arg in args {
            self.push_arg(arg);
        }
        self
    }

    /// Appends an option; `None` adds nothing, which keeps builder chains simple.
    pub fn option(mut self, option: Option<&str>) -> Self {
        self.push_option(option, None);
        self
    }

    pub fn option_with_value(mut self, option: &str, value: &str) -> Self {
        self.push_option(Some(option), Some(value));
        self
    }

    pub(crate) fn push_arg(&mut self, arg: &str) {
        self.arguments.push(' ');
        self.arguments.push_str(&quote(arg));
    }

    pub(crate) fn push_option(&mut self, option: Option<&str>, value: Option<&str>) {
        let Some(option) = option else {
            return;
        };
        let option = if option.starts_with('-') {
            option.to_string()
        } else {
            format!("--{}", option)
        };
        self.arguments.push(' ');
        self.arguments.push_str(&option);
        if let Some(value) = value {
            self.arguments.push(' ');
            self.arguments.push_str(&quote(value));
        }
    }

    pub(crate) fn program(&self) -> &str {
        &self.command
    }

    pub(crate) fn arguments(&self) -> &str {
        &self.arguments
    }
}

impl CommandTask for Exec {
    fn command_line(&self) -> String {
        format!("{}{}", self.command, self.arguments)
    }

    fn allows_failure(&self) -> bool {
        self.allow_failure
    }
}

/// Quotes a value for `shlex::split`, leaving plain words untouched.
pub fn quote(value: &str) -> String {
    match shlex::try_quote(value) {
        Ok(quoted) => quoted.into_owned(),
        // Only NUL bytes are rejected; drop them rather than the whole value.
        Err(_) => quote(&value.replace('\0', "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_keeps_order_and_skips_empty_options() {
        let exec = Exec::new("git")
            .arg("commit")
            .option(None)
            .option(Some("amend"))
            .option_with_value("-m", "wip");
        assert_eq!(exec.command_line(), "git commit --amend -m wip");
    }

    #[test]
    fn test_quote_leaves_plain_words_alone() {
        assert_eq!(quote("plain"), "plain");
        for value in ["two words", "it's", "", "$HOME"] {
            assert_eq!(shlex::split(&quote(value)).unwrap(), vec![value.to_string()]);
        }
    }
}
