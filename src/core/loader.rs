// src/core/loader.rs

use crate::core::container::Container;
use crate::core::toml_unit::TomlTaskUnit;
use crate::models::{RunnerConfig, TaskFile, UnitNames};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Represents the ways locating and loading the task file can fail.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The configured working directory does not exist.
    #[error("Path in `{}` is invalid", .0.display())]
    InvalidPath(PathBuf),
    /// The working directory exists but holds no task file.
    #[error("Task file '{}' not found", .0.display())]
    FileNotFound(PathBuf),
    /// The task file was loaded but does not declare the expected unit.
    #[error("Unit {0} was not loaded")]
    UnitNotFound(String),
    #[error("I/O error while reading '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML file at '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Makes the configured unit(s) available in the container.
///
/// Nothing is read when the units are already defined: several names are
/// always presumed defined (e.g. natively registered), and a single name may
/// have been defined by a shebang script. Otherwise the task file is looked up
/// in the canonicalized working directory, parsed, and all of its units are
/// defined. The units are never instantiated here.
pub fn load_task_units(config: &mut RunnerConfig, container: &mut Container) -> Result<(), LoadError> {
    let unit_name = match &config.unit_names {
        UnitNames::Many(_) => return Ok(()),
        UnitNames::Single(name) if container.is_defined(name) => {
            log::debug!("Unit '{}' is already defined, skipping the task file", name);
            return Ok(());
        }
        UnitNames::Single(name) => name.clone(),
    };

    if !config.working_dir.exists() {
        return Err(LoadError::InvalidPath(config.working_dir.clone()));
    }

    config.working_dir = dunce::canonicalize(&config.working_dir)
        .map_err(|_| LoadError::InvalidPath(config.working_dir.clone()))?;
    container.set_working_dir(&config.working_dir);

    let task_file = config.task_file_path();
    if !task_file.is_file() {
        return Err(LoadError::FileNotFound(task_file));
    }

    log::debug!("Loading task file {}", task_file.display());
    let source = fs::read_to_string(&task_file).map_err(|source| LoadError::Io {
        path: task_file.clone(),
        source,
    })?;
    let defined = define_units(container, &source, &task_file)?;
    log::debug!("Task file defined units: {:?}", defined);

    if !container.is_defined(&unit_name) {
        return Err(LoadError::UnitNotFound(unit_name));
    }
    Ok(())
}

/// Parses task-file source and defines every unit it declares.
///
/// This is the single path through which task definitions enter the
/// container, for task files and shebang scripts alike. Returns the defined
/// names in declaration-table order.
pub fn define_units(container: &mut Container, source: &str, origin: &Path) -> Result<Vec<String>, LoadError> {
    let task_file: TaskFile = toml::from_str(source).map_err(|source| LoadError::Parse {
        path: origin.to_path_buf(),
        source,
    })?;

    let mut names = Vec::with_capacity(task_file.unit.len());
    for (name, unit) in task_file.unit {
        let unit_name = name.clone();
        container.define(name.clone(), move |_| {
            Ok(Box::new(TomlTaskUnit::new(unit_name.clone(), unit.clone())))
        });
        names.push(name);
    }
    Ok(names)
}
