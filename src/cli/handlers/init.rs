// src/cli/handlers/init.rs

use anyhow::{Context, Result, anyhow};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::{
    constants::INIT_COMMAND,
    core::unit::{CommandSpec, DescribeError, Invocation, TaskUnit},
    models::{ExtendedCommand, Runnable, TaskFile, TomlCommand, TomlOption, TomlUnit},
};

/// The only unit registered when the working directory has no task file.
/// Its `init` command writes a starter task file.
#[derive(Debug, Clone)]
pub struct InitUnit {
    task_file: PathBuf,
    unit_name: String,
}

impl InitUnit {
    pub fn new(task_file: impl Into<PathBuf>, unit_name: impl Into<String>) -> Self {
        Self {
            task_file: task_file.into(),
            unit_name: unit_name.into(),
        }
    }

    /// The task file written by `init`: one unit with a `hello` command.
    pub fn scaffold(&self) -> TaskFile {
        let hello = ExtendedCommand {
            run: Runnable::Single("echo Hello, <who>!".to_string()),
            desc: Some("Prints a greeting".to_string()),
            help: None,
            args: Vec::new(),
            options: BTreeMap::from([(
                "who".to_string(),
                TomlOption {
                    desc: Some("Who to greet".to_string()),
                    default: Some("world".to_string()),
                    ..TomlOption::default()
                },
            )]),
            aliases: Vec::new(),
            hidden: false,
        };
        let unit = TomlUnit {
            desc: Some("Tasks for this project".to_string()),
            commands: BTreeMap::from([("hello".to_string(), TomlCommand::Extended(hello))]),
        };
        TaskFile {
            unit: BTreeMap::from([(self.unit_name.clone(), unit)]),
        }
    }
}

impl TaskUnit for InitUnit {
    fn name(&self) -> &str {
        "Init"
    }

    fn commands(&self) -> Vec<Result<CommandSpec, DescribeError>> {
        vec![Ok(CommandSpec::new(INIT_COMMAND).about(t!("init.about")))]
    }

    fn invoke(&self, operation: &str, invocation: &Invocation) -> Result<i32> {
        if operation != INIT_COMMAND {
            return Err(anyhow!("Unknown operation '{}'", operation));
        }
        let path = self.task_file.display().to_string();
        if self.task_file.exists() {
            return Err(anyhow!(t!("init.error.exists").replace("{path}", &path)));
        }

        let content = toml::to_string_pretty(&self.scaffold())?;
        fs::write(&self.task_file, content)
            .with_context(|| t!("init.error.write").replace("{path}", &path))?;

        invocation.io.say(&t!("init.created").replace("{path}", &path));
        invocation.io.writeln(&t!("init.next_step"));
        Ok(0)
    }
}
