// src/task/testing.rs

use super::{CommandTask, Exec, TaskError};
use crate::system::executor;
use std::path::Path;

/// Runs PHPUnit.
#[derive(Debug, Clone)]
pub struct PhpUnit {
    exec: Exec,
    files: Vec<String>,
}

impl PhpUnit {
    /// Looks for a local `phpunit.phar` first, then `vendor/bin/phpunit`, then
    /// `phpunit` on `PATH`.
    pub fn new(cwd: &Path) -> Result<Self, TaskError> {
        if cwd.join("phpunit.phar").is_file() {
            return Ok(Self::with_path("php phpunit.phar"));
        }
        executor::find_executable("phpunit", cwd)
            .map(|path| Self::with_path(super::quote(&path.to_string_lossy())))
            .ok_or_else(|| TaskError::ExecutableNotFound {
                task: "phpunit".to_string(),
                executable: "phpunit".to_string(),
            })
    }

    pub fn with_path(path_to_phpunit: impl Into<String>) -> Self {
        Self {
            exec: Exec::new(path_to_phpunit),
            files: Vec::new(),
        }
    }

    pub fn bootstrap(mut self, file: &str) -> Self {
        self.exec.push_option(Some("bootstrap"), Some(file));
        self
    }

    pub fn filter(mut self, pattern: &str) -> Self {
        self.exec.push_option(Some("filter"), Some(pattern));
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.exec.push_option(Some("group"), Some(group));
        self
    }

    pub fn exclude_group(mut self, group: &str) -> Self {
        self.exec.push_option(Some("exclude-group"), Some(group));
        self
    }

    /// Writes a JUnit report to `file`.
    pub fn xml(mut self, file: &str) -> Self {
        self.exec.push_option(Some("log-junit"), Some(file));
        self
    }

    pub fn tap(mut self, file: &str) -> Self {
        self.exec.push_option(Some("log-tap"), Some(file));
        self
    }

    pub fn json(mut self, file: &str) -> Self {
        self.exec.push_option(Some("log-json"), Some(file));
        self
    }

    pub fn debug(mut self) -> Self {
        self.exec.push_option(Some("debug"), None);
        self
    }

    pub fn option(mut self, option: &str) -> Self {
        self.exec.push_option(Some(option), None);
        self
    }

    /// Test file or directory to run; appended after all options.
    pub fn files(mut self, files: &str) -> Self {
        self.files.push(files.to_string());
        self
    }
}

impl CommandTask for PhpUnit {
    fn command_line(&self) -> String {
        let exec = self.exec.clone().args(self.files.iter().map(String::as_str));
        exec.command_line()
    }
}
