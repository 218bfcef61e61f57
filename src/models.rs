// src/models.rs

use crate::constants::{DEFAULT_TASK_FILE, DEFAULT_UNIT_NAME};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// --- RUNTIME MODELS ---

/// The unit (or units) whose commands the runner should register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitNames {
    /// One unit, loaded from the task file when it is not already defined.
    Single(String),
    /// Several units, all expected to be defined already (e.g. natively).
    Many(Vec<String>),
}

impl UnitNames {
    /// Iterates the names in their configured order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let names: &[String] = match self {
            Self::Single(name) => std::slice::from_ref(name),
            Self::Many(names) => names,
        };
        names.iter().map(String::as_str)
    }
}

/// Where the runner looks for task units. Mutated while argv is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub unit_names: UnitNames,
    /// File name (relative to `working_dir`) of the task file.
    pub task_file: String,
    pub working_dir: PathBuf,
    /// Set by a shebang line that names its command; only that command is exposed.
    pub pinned_command: Option<String>,
}

impl RunnerConfig {
    /// Builds a configuration rooted at `working_dir`, falling back to the defaults
    /// for any name that is not given.
    pub fn new(unit_names: Option<UnitNames>, task_file: Option<String>, working_dir: PathBuf) -> Self {
        Self {
            unit_names: unit_names.unwrap_or_else(|| UnitNames::Single(DEFAULT_UNIT_NAME.to_string())),
            task_file: task_file.unwrap_or_else(|| DEFAULT_TASK_FILE.to_string()),
            working_dir,
            pinned_command: None,
        }
    }

    /// Full path of the task file inside the working directory.
    pub fn task_file_path(&self) -> PathBuf {
        self.working_dir.join(&self.task_file)
    }
}

/// The process arguments once the pass-through tail has been cut off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedInput {
    /// Arguments for the dispatch layer, program name included.
    pub framework_args: Vec<String>,
    /// Arguments after the first `--`, forwarded verbatim.
    pub pass_through_args: Vec<String>,
}

// --- TASK FILE MODELS (What is read from RoboFile.toml) ---

/// Represents the deserialized structure of a task file.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct TaskFile {
    #[serde(default)]
    pub unit: BTreeMap<String, TomlUnit>,
}

/// A `[unit.<Name>]` table.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct TomlUnit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub commands: BTreeMap<String, TomlCommand>,
}

/// One or more command lines.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(untagged)]
pub enum Runnable {
    Sequence(Vec<String>),
    Single(String),
}

impl Runnable {
    /// The command lines in execution order.
    pub fn lines(&self) -> Vec<&str> {
        match self {
            Self::Sequence(lines) => lines.iter().map(String::as_str).collect(),
            Self::Single(line) => vec![line.as_str()],
        }
    }
}

/// Represents a command in a task file. Uses `untagged` for flexible syntax.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(untagged)]
pub enum TomlCommand {
    Sequence(Vec<String>),
    Simple(String),
    Extended(ExtendedCommand),
}

impl TomlCommand {
    /// Normalizes the short forms into the extended one.
    pub fn into_extended(self) -> ExtendedCommand {
        match self {
            Self::Sequence(lines) => ExtendedCommand::from_run(Runnable::Sequence(lines)),
            Self::Simple(line) => ExtendedCommand::from_run(Runnable::Single(line)),
            Self::Extended(ext) => ext,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ExtendedCommand {
    pub run: Runnable,
    /// One-line summary shown in the command list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Longer text shown by `<command> --help`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<TomlArg>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, TomlOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
}

impl ExtendedCommand {
    fn from_run(run: Runnable) -> Self {
        Self {
            run,
            desc: None,
            help: None,
            args: Vec::new(),
            options: BTreeMap::new(),
            aliases: Vec::new(),
            hidden: false,
        }
    }
}

/// A positional argument: a bare name, or a table for the details.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(untagged)]
pub enum TomlArg {
    Name(String),
    Extended(ExtendedArg),
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ExtendedArg {
    pub name: String,
    pub desc: Option<String>,
    pub default: Option<String>,
    /// Defaults to `true` unless a default value is given.
    pub required: Option<bool>,
    #[serde(default)]
    pub variadic: bool,
}

impl TomlArg {
    /// Normalizes a bare name into a required argument.
    pub fn into_extended(self) -> ExtendedArg {
        match self {
            Self::Name(name) => ExtendedArg {
                name,
                desc: None,
                default: None,
                required: None,
                variadic: false,
            },
            Self::Extended(ext) => ext,
        }
    }
}

/// A `--name` option.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct TomlOption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// A flag takes no value and renders as `--name` when set.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub flag: bool,
}
