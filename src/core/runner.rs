//! # Runner
//!
//! Sequences the bootstrap of one invocation:
//!
//! 1. split argv into framework and pass-through arguments (`--load-from` is
//!    applied to the configuration here);
//! 2. change into the requested working directory;
//! 3. rewrite argv for shebang scripts, which may also define the active unit;
//! 4. make sure a container exists; when the runner creates it, the failure
//!    hooks are installed and the remaining steps run inside a panic boundary;
//! 5. load the task file, register the commands and dispatch.
//!
//! No loading failure escapes [`Runner::execute`]; each one becomes an exit
//! status.

use crate::cli::application::Application;
use crate::cli::handlers::init::InitUnit;
use crate::constants::{DEFAULT_UNIT_NAME, FATAL_EXIT_CODE, INIT_COMMAND};
use crate::core::container::{Container, UnitFactory};
use crate::core::hooks;
use crate::core::input::split_input;
use crate::core::loader::{LoadError, load_task_units};
use crate::core::registrar::register_units;
use crate::core::shebang::process_shebang;
use crate::core::unit::TaskUnit;
use crate::models::{ParsedInput, RunnerConfig, UnitNames};
use colored::Color;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

/// Name under which the scaffolding unit is defined for the init fallback.
const INIT_UNIT_NAME: &str = "RoboInit";

/// Bootstraps and dispatches one invocation. See the module docs for the order
/// of the steps.
pub struct Runner {
    config: RunnerConfig,
    container: Option<Container>,
    pending_units: Vec<(String, UnitFactory)>,
    app_name: String,
    app_version: String,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .field("container", &self.container)
            .field(
                "pending_units",
                &self.pending_units.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .field("app_name", &self.app_name)
            .field("app_version", &self.app_version)
            .finish()
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl Runner {
    /// Creates a runner rooted at the current directory. Missing names fall
    /// back to `RoboFile` in `RoboFile.toml`.
    pub fn new(unit_names: Option<UnitNames>, task_file: Option<String>) -> Self {
        let working_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_config(RunnerConfig::new(unit_names, task_file, working_dir))
    }

    /// Creates a runner from a prepared configuration.
    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            config,
            container: None,
            pending_units: Vec::new(),
            app_name: env!("CARGO_PKG_NAME").to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Uses an existing container. The runner then installs no hooks and runs
    /// without a panic boundary; the embedding program owns both.
    pub fn with_container(mut self, container: Container) -> Self {
        self.container = Some(container);
        self
    }

    /// Defines a native unit in whichever container the run uses.
    pub fn with_unit<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Container) -> anyhow::Result<Box<dyn TaskUnit>> + 'static,
    {
        self.pending_units.push((name.into(), Box::new(factory)));
        self
    }

    /// Name and version shown by `--help` and `--version`.
    pub fn with_application(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.app_name = name.into();
        self.app_version = version.into();
        self
    }

    /// The configuration as updated by the last run.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// The container used by the last run, or the one supplied up front.
    pub fn container(&self) -> Option<&Container> {
        self.container.as_ref()
    }

    /// Runs one invocation and returns the process exit status.
    pub fn execute(&mut self, argv: Vec<String>) -> i32 {
        let original_dir = self.config.working_dir.clone();
        let input = split_input(argv, &mut self.config);
        if self.config.working_dir != original_dir {
            apply_working_dir(&self.config.working_dir);
        }

        let owns_container = self.container.is_none();
        let mut container = match self.container.take() {
            Some(container) => container,
            None => {
                hooks::install();
                Container::new(self.config.working_dir.clone())
            }
        };
        for (name, factory) in self.pending_units.drain(..) {
            container.define(name, factory);
        }

        let status = if owns_container {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.bootstrap(input, &mut container)));
            outcome.unwrap_or_else(|_| report_fatal(&container))
        } else {
            self.bootstrap(input, &mut container)
        };

        self.container = Some(container);
        status
    }

    fn bootstrap(&mut self, mut input: ParsedInput, container: &mut Container) -> i32 {
        input.framework_args = process_shebang(input.framework_args, &mut self.config, container);

        if let Err(e) = load_task_units(&mut self.config, container) {
            let io = container.io();
            return match e {
                LoadError::FileNotFound(path) => {
                    log::debug!("No task file at {}", path.display());
                    io.warn_block(t!("runner.not_initialized"), Color::Yellow);
                    self.run_init(input, container, path)
                }
                LoadError::InvalidPath(path) => {
                    io.warn_block(
                        &t!("runner.invalid_path").replace("{path}", &path.display().to_string()),
                        Color::Red,
                    );
                    1
                }
                LoadError::UnitNotFound(name) => {
                    io.error(&t!("runner.unit_not_loaded").replace("{unit}", &name));
                    1
                }
                other => {
                    io.error(&other.to_string());
                    1
                }
            };
        }

        let mut app = self.application();
        let unit_names = self.config.unit_names.clone();
        if let Err(e) = register_units(&mut app, container, &unit_names) {
            container.io().error(&e.to_string());
            return 1;
        }
        if let Some(command) = &self.config.pinned_command {
            log::debug!("Pinning command '{}'", command);
            app.pin(command.clone());
        }
        app.run(input, container.io_mut())
    }

    /// Offers only `init`, which scaffolds the missing task file.
    fn run_init(&self, input: ParsedInput, container: &mut Container, task_file: PathBuf) -> i32 {
        let unit_name = match &self.config.unit_names {
            UnitNames::Single(name) => name.clone(),
            UnitNames::Many(_) => DEFAULT_UNIT_NAME.to_string(),
        };
        container.define(INIT_UNIT_NAME, move |_| {
            Ok(Box::new(InitUnit::new(task_file.clone(), unit_name.clone())))
        });

        let mut app = self.application();
        if let Err(e) = register_units(&mut app, container, &UnitNames::Single(INIT_UNIT_NAME.to_string())) {
            container.io().error(&e.to_string());
            return 1;
        }
        app.restrict_to(&[INIT_COMMAND]);
        app.run(input, container.io_mut())
    }

    fn application(&self) -> Application {
        Application::new(self.app_name.clone(), self.app_version.clone())
    }
}

fn apply_working_dir(dir: &Path) {
    match env::set_current_dir(dir) {
        Ok(()) => log::debug!("Changed directory to {}", dir.display()),
        // The loader reports the invalid path.
        Err(e) => log::debug!("Could not change directory to {}: {}", dir.display(), e),
    }
}

fn report_fatal(container: &Container) -> i32 {
    let io = container.io();
    match hooks::take_last_fatal() {
        Some(fatal) => io.error_block(&fatal.message, Some((fatal.file.as_str(), fatal.line))),
        None => io.error_block(t!("runner.fatal_unknown"), None),
    }
    FATAL_EXIT_CODE
}
