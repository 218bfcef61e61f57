// src/core/input.rs

use crate::constants::{LOAD_FROM_LONG, LOAD_FROM_SHORT, PASS_THROUGH_SEPARATOR, TASK_FILE_EXTENSION};
use crate::models::{ParsedInput, RunnerConfig, UnitNames};
use std::env;
use std::path::PathBuf;

/// Splits raw argv into the framework arguments and the pass-through tail,
/// applying any `--load-from`/`-f` override to `config` on the way.
///
/// # Logic:
/// - Everything after the first `--` is passed through untouched, later `--`
///   included.
/// - `--load-from <path>` (or `-f <path>` when the long form is absent) is
///   removed together with its value. The value becomes the working
///   directory. When it names an existing file, that file becomes the task
///   file and, if it carries the task-file extension, its stem becomes the
///   unit name. A relative value is resolved against the current directory
///   before anything changes into it.
/// - The program name slot is never read as a flag.
pub fn split_input(argv: Vec<String>, config: &mut RunnerConfig) -> ParsedInput {
    let (mut working_set, pass_through_args) =
        match argv.iter().position(|arg| arg == PASS_THROUGH_SEPARATOR) {
            Some(pos) => {
                let mut head = argv;
                let tail = head.split_off(pos + 1);
                head.truncate(pos);
                (head, tail)
            }
            None => (argv, Vec::new()),
        };

    let flag_position = find_flag(&working_set, LOAD_FROM_LONG).or_else(|| find_flag(&working_set, LOAD_FROM_SHORT));
    if let Some(pos) = flag_position {
        working_set.remove(pos);
        if pos < working_set.len() {
            let value = working_set.remove(pos);
            apply_load_from(&value, config);
        } else {
            log::debug!("'{}' given without a value, ignoring", LOAD_FROM_LONG);
        }
    }

    ParsedInput {
        framework_args: working_set,
        pass_through_args,
    }
}

fn find_flag(args: &[String], flag: &str) -> Option<usize> {
    args.iter().skip(1).position(|arg| arg == flag).map(|i| i + 1)
}

fn apply_load_from(value: &str, config: &mut RunnerConfig) {
    let expanded = PathBuf::from(shellexpand::tilde(value).into_owned());
    let target = if expanded.is_absolute() {
        expanded
    } else {
        match env::current_dir() {
            Ok(cwd) => cwd.join(expanded),
            Err(e) => {
                log::debug!("Could not read the current directory: {}", e);
                expanded
            }
        }
    };

    if !target.is_file() {
        log::debug!("Loading from directory {}", target.display());
        config.working_dir = target;
        return;
    }

    let Some(file_name) = target.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
        config.working_dir = target;
        return;
    };
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    log::debug!("Loading task file '{}' from {}", file_name, parent.display());

    if let Some(stem) = file_name.strip_suffix(TASK_FILE_EXTENSION)
        && !stem.is_empty()
    {
        config.unit_names = UnitNames::Single(stem.to_string());
    }
    config.task_file = file_name;
    config.working_dir = parent;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_TASK_FILE, DEFAULT_UNIT_NAME};
    use std::fs;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn config() -> RunnerConfig {
        RunnerConfig::new(None, None, PathBuf::from("."))
    }

    #[test]
    fn test_without_separator_nothing_is_passed_through() {
        let mut config = config();
        let parsed = split_input(args(&["robo", "build", "--fast"]), &mut config);
        assert_eq!(parsed.framework_args, args(&["robo", "build", "--fast"]));
        assert!(parsed.pass_through_args.is_empty());
        assert_eq!(config, self::config());
    }

    #[test]
    fn test_only_first_separator_splits() {
        let mut config = config();
        let parsed = split_input(args(&["robo", "lint", "--", "-x", "--", "y"]), &mut config);
        assert_eq!(parsed.framework_args, args(&["robo", "lint"]));
        assert_eq!(parsed.pass_through_args, args(&["-x", "--", "y"]));
    }

    #[test]
    fn test_load_from_directory_sets_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let dir_str = dir.path().to_str().unwrap();
        let mut config = config();

        let parsed = split_input(args(&["robo", "--load-from", dir_str, "hello"]), &mut config);
        assert_eq!(parsed.framework_args, args(&["robo", "hello"]));
        assert_eq!(config.working_dir, dir.path());
        assert_eq!(config.task_file, DEFAULT_TASK_FILE);
        assert_eq!(config.unit_names, UnitNames::Single(DEFAULT_UNIT_NAME.into()));
    }

    #[test]
    fn test_relative_load_from_becomes_absolute() {
        let mut config = config();
        split_input(args(&["robo", "--load-from", "some/project"]), &mut config);
        assert!(config.working_dir.is_absolute());
        assert!(config.working_dir.ends_with("some/project"));
    }

    #[test]
    fn test_short_flag_is_used_when_long_is_absent() {
        let mut config = config();
        let parsed = split_input(args(&["robo", "-f", "/srv/project", "deploy"]), &mut config);
        assert_eq!(parsed.framework_args, args(&["robo", "deploy"]));
        assert_eq!(config.working_dir, PathBuf::from("/srv/project"));
    }

    #[test]
    fn test_load_from_file_sets_task_file_and_unit() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Deploy.toml");
        fs::write(&file, "").unwrap();
        let mut config = config();

        split_input(args(&["robo", "--load-from", file.to_str().unwrap()]), &mut config);
        assert_eq!(config.task_file, "Deploy.toml");
        assert_eq!(config.working_dir, dir.path());
        assert_eq!(config.unit_names, UnitNames::Single("Deploy".into()));
    }

    #[test]
    fn test_load_from_file_without_extension_keeps_unit() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tasks");
        fs::write(&file, "").unwrap();
        let mut config = config();

        split_input(args(&["robo", "-f", file.to_str().unwrap()]), &mut config);
        assert_eq!(config.task_file, "tasks");
        assert_eq!(config.unit_names, UnitNames::Single(DEFAULT_UNIT_NAME.into()));
    }

    #[test]
    fn test_flag_without_value_is_removed() {
        let mut config = config();
        let parsed = split_input(args(&["robo", "hello", "--load-from"]), &mut config);
        assert_eq!(parsed.framework_args, args(&["robo", "hello"]));
        assert_eq!(config, self::config());
    }

    #[test]
    fn test_flag_after_separator_is_passed_through() {
        let mut config = config();
        let parsed = split_input(args(&["robo", "run", "--", "-f", "x"]), &mut config);
        assert_eq!(parsed.framework_args, args(&["robo", "run"]));
        assert_eq!(parsed.pass_through_args, args(&["-f", "x"]));
        assert_eq!(config, self::config());
    }

    #[test]
    fn test_program_slot_is_not_a_flag() {
        let mut config = config();
        let parsed = split_input(args(&["-f", "hello"]), &mut config);
        assert_eq!(parsed.framework_args, args(&["-f", "hello"]));
        assert_eq!(config, self::config());
    }
}
