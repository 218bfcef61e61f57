// src/task/composer.rs

use super::{CommandTask, Exec, TaskError};
use crate::system::executor;
use std::path::Path;

/// The composer sub-command a task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Install,
    Update,
    DumpAutoload,
    Validate,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Update => "update",
            Self::DumpAutoload => "dump-autoload",
            Self::Validate => "validate",
        }
    }
}

/// Builds a `composer <action>` command line.
///
/// ```
/// # use robo::task::composer::{Action, Composer};
/// # use robo::task::CommandTask;
/// let install = Composer::with_path(Action::Install, "composer")
///     .prefer_dist()
///     .no_dev();
/// assert_eq!(install.command_line(), "composer install --prefer-dist --no-dev");
/// ```
#[derive(Debug, Clone)]
pub struct Composer {
    action: Action,
    exec: Exec,
    prefer: Option<&'static str>,
    dev: Option<&'static str>,
    optimize_autoloader: Option<&'static str>,
    ansi: Option<&'static str>,
}

impl Composer {
    /// Locates composer from `cwd`: a local `composer.phar` is run through
    /// `php`, otherwise `vendor/bin/composer` or `composer` on `PATH`.
    pub fn new(action: Action, cwd: &Path) -> Result<Self, TaskError> {
        let command = find_composer(cwd).ok_or_else(|| TaskError::ExecutableNotFound {
            task: format!("composer {}", action.as_str()),
            executable: "composer.phar".to_string(),
        })?;
        let mut task = Self::with_path(action, command);
        if colored::control::SHOULD_COLORIZE.should_colorize() {
            task = task.ansi();
        }
        Ok(task)
    }

    /// Uses the given composer command as-is.
    pub fn with_path(action: Action, path_to_composer: impl Into<String>) -> Self {
        Self {
            action,
            exec: Exec::new(path_to_composer),
            prefer: None,
            dev: None,
            optimize_autoloader: None,
            ansi: None,
        }
    }

    pub fn prefer_dist(mut self) -> Self {
        self.prefer = Some("--prefer-dist");
        self
    }

    pub fn prefer_source(mut self) -> Self {
        self.prefer = Some("--prefer-source");
        self
    }

    pub fn no_dev(mut self) -> Self {
        self.dev = Some("--no-dev");
        self
    }

    pub fn no_ansi(mut self) -> Self {
        self.ansi = Some("--no-ansi");
        self
    }

    pub fn ansi(mut self) -> Self {
        self.ansi = Some("--ansi");
        self
    }

    pub fn optimize_autoloader(mut self) -> Self {
        self.optimize_autoloader = Some("--optimize-autoloader");
        self
    }

    /// Any other composer option, e.g. `--no-interaction`.
    pub fn option(mut self, option: &str) -> Self {
        self.exec.push_option(Some(option), None);
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.exec.push_arg(arg);
        self
    }
}

impl CommandTask for Composer {
    fn command_line(&self) -> String {
        let mut exec = self.exec.clone();
        for option in [self.prefer, self.dev, self.optimize_autoloader, self.ansi] {
            exec.push_option(option, None);
        }
        format!("{} {}{}", exec.program(), self.action.as_str(), exec.arguments())
    }
}

fn find_composer(cwd: &Path) -> Option<String> {
    if cwd.join("composer.phar").is_file() {
        return Some("php composer.phar".to_string());
    }
    executor::find_executable("composer", cwd).map(|path| super::quote(&path.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_command_with_all_switches() {
        let task = Composer::with_path(Action::Install, "composer")
            .prefer_source()
            .no_dev()
            .optimize_autoloader()
            .no_ansi();
        assert_eq!(
            task.command_line(),
            "composer install --prefer-source --no-dev --optimize-autoloader --no-ansi"
        );
    }

    #[test]
    fn test_later_switch_replaces_earlier_one() {
        let task = Composer::with_path(Action::Update, "composer")
            .prefer_dist()
            .prefer_source()
            .ansi()
            .no_ansi();
        assert_eq!(task.command_line(), "composer update --prefer-source --no-ansi");
    }

    #[test]
    fn test_extra_arguments_come_before_switches() {
        let task = Composer::with_path(Action::Update, "composer")
            .arg("monolog")
            .option("no-interaction")
            .no_dev();
        assert_eq!(
            task.command_line(),
            "composer update monolog --no-interaction --no-dev"
        );
    }

    #[test]
    fn test_local_phar_is_preferred() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("composer.phar"), "").unwrap();
        let task = Composer::new(Action::DumpAutoload, dir.path())
            .unwrap()
            .no_ansi();
        assert_eq!(task.command_line(), "php composer.phar dump-autoload --no-ansi");
    }
}
