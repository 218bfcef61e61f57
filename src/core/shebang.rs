//! # Shebang Processor
//!
//! Lets a task file double as an executable script. Two launch styles are
//! recognized from the shape of argv:
//!
//! - `#!/usr/bin/env robo`: the kernel runs `robo <script> [args...]`. The
//!   script path is dropped and the user picks a command as usual.
//! - `#!/usr/bin/env robo <command>`: the kernel runs
//!   `robo <command> <script> [args...]`. argv becomes
//!   `robo <command...> [args...]` and only that command is exposed.
//!
//! The script body starts after a line holding only `+++` and uses the task
//! file format. It is parsed through the loader, so scripts never get any
//! capability an ordinary task file does not have.

use crate::constants::{RUNNER_TOKEN, SCRIPT_OPEN_TAG};
use crate::core::container::Container;
use crate::core::loader;
use crate::models::{RunnerConfig, UnitNames};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

lazy_static! {
    // The first `[unit.<Name>]` (or `[unit.<Name>.…]`) header at line start.
    static ref UNIT_DECLARATION_RE: Regex =
        Regex::new(r"(?m)^\s*\[\s*unit\.([A-Za-z_][A-Za-z0-9_-]*)\s*[\].]").unwrap();
}

/// The embedded definition of a shebang script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShebangScript {
    /// Everything after the open tag.
    pub body: String,
    /// The first unit the body declares, if any.
    pub unit_name: Option<String>,
}

/// Whether a line is one of our interpreter directives.
pub fn is_shebang_line(line: &str) -> bool {
    line.starts_with("#!") && line.contains(RUNNER_TOKEN)
}

/// Reads `path` as a shebang script.
///
/// Returns `None` when the path does not exist, cannot be read or does not
/// start with a shebang line of ours. A recognized script without an open tag
/// yields `Some` with an empty body.
pub fn read_shebang_script(path: &Path) -> Option<ShebangScript> {
    if !path.is_file() {
        return None;
    }
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);

    let mut first_line = String::new();
    reader.read_line(&mut first_line).ok()?;
    if !is_shebang_line(&first_line) {
        return None;
    }

    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => {
                return Some(ShebangScript {
                    body: String::new(),
                    unit_name: None,
                });
            }
            Ok(_) if line.trim() == SCRIPT_OPEN_TAG => break,
            Ok(_) => {}
        }
    }

    let mut body = String::new();
    if reader.read_to_string(&mut body).is_err() {
        log::debug!("Shebang script {} has an unreadable body", path.display());
        return Some(ShebangScript {
            body: String::new(),
            unit_name: None,
        });
    }
    let unit_name = UNIT_DECLARATION_RE
        .captures(&body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    Some(ShebangScript { body, unit_name })
}

/// Checks `path` and, when it is a shebang script, defines its units and
/// makes the first one the active unit. Returns whether it was a shebang script.
pub fn load_shebang_file(path: &Path, config: &mut RunnerConfig, container: &mut Container) -> bool {
    let Some(script) = read_shebang_script(path) else {
        return false;
    };
    log::debug!("{} is a shebang script", path.display());

    let Some(unit_name) = script.unit_name else {
        return true;
    };
    match loader::define_units(container, &script.body, path) {
        Ok(_) => {
            log::debug!("Shebang script declares unit '{}'", unit_name);
            config.unit_names = UnitNames::Single(unit_name);
        }
        Err(e) => container.io().error(
            &t!("shebang.parse_failed")
                .replace("{path}", &path.display().to_string())
                .replace("{error}", &e.to_string()),
        ),
    }
    true
}

/// Rewrites `args` if it was produced by a shebang launch. See the module docs.
pub fn process_shebang(
    args: Vec<String>,
    config: &mut RunnerConfig,
    container: &mut Container,
) -> Vec<String> {
    if let Some(script) = args.get(1)
        && load_shebang_file(Path::new(script), config, container)
    {
        return args
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 1)
            .map(|(_, arg)| arg.clone())
            .collect();
    }

    if let (Some(command), Some(script)) = (args.get(1), args.get(2))
        && load_shebang_file(Path::new(script), config, container)
    {
        let command_tokens: Vec<String> = command.split(' ').map(str::to_string).collect();
        config.pinned_command = command_tokens.first().cloned();

        let mut rewritten = Vec::with_capacity(args.len() + command_tokens.len());
        rewritten.extend(args.first().cloned());
        rewritten.extend(command_tokens);
        rewritten.extend(args.iter().skip(3).cloned());
        return rewritten;
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SCRIPT: &str = "#!/usr/bin/env robo\n+++\n[unit.Deploy.commands]\nship = \"echo shipped\"\n";

    fn setup() -> (tempfile::TempDir, RunnerConfig, Container) {
        let dir = tempfile::tempdir().unwrap();
        let config = RunnerConfig::new(None, None, dir.path().to_path_buf());
        let container = Container::new(dir.path());
        (dir, config, container)
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_shebang_line_recognition() {
        assert!(is_shebang_line("#!/usr/bin/env robo\n"));
        assert!(is_shebang_line("#!/usr/local/bin/robo deploy"));
        assert!(!is_shebang_line("#!/usr/bin/env bash"));
        assert!(!is_shebang_line("# robo"));
    }

    #[test]
    fn test_form_a_drops_script_and_defines_unit() {
        let (dir, mut config, mut container) = setup();
        let script = dir.path().join("deploy");
        fs::write(&script, SCRIPT).unwrap();
        let argv = args(&["robo", script.to_str().unwrap()]);

        let result = process_shebang(argv, &mut config, &mut container);
        assert_eq!(result, args(&["robo"]));
        assert_eq!(config.unit_names, UnitNames::Single("Deploy".into()));
        assert!(container.is_defined("Deploy"));
        assert_eq!(config.pinned_command, None);
    }

    #[test]
    fn test_form_a_keeps_remaining_arguments() {
        let (dir, mut config, mut container) = setup();
        let script = dir.path().join("deploy");
        fs::write(&script, SCRIPT).unwrap();
        let argv = args(&["robo", script.to_str().unwrap(), "ship", "--verbose"]);

        let result = process_shebang(argv, &mut config, &mut container);
        assert_eq!(result, args(&["robo", "ship", "--verbose"]));
    }

    #[test]
    fn test_form_b_inserts_command_tokens() {
        let (dir, mut config, mut container) = setup();
        let script = dir.path().join("deploy");
        fs::write(&script, SCRIPT).unwrap();
        let argv = args(&["robo", "ship now", script.to_str().unwrap(), "extra"]);

        let result = process_shebang(argv, &mut config, &mut container);
        assert_eq!(result, args(&["robo", "ship", "now", "extra"]));
        assert_eq!(config.pinned_command.as_deref(), Some("ship"));
    }

    #[test]
    fn test_form_b_single_command() {
        let (dir, mut config, mut container) = setup();
        let script = dir.path().join("deploy");
        fs::write(&script, SCRIPT).unwrap();
        let argv = args(&["robo", "mycommand", script.to_str().unwrap()]);

        let result = process_shebang(argv, &mut config, &mut container);
        assert_eq!(result, args(&["robo", "mycommand"]));
    }

    #[test]
    fn test_script_without_declaration_is_still_a_shebang() {
        let (dir, mut config, mut container) = setup();
        let script = dir.path().join("plain");
        fs::write(&script, "#!/usr/bin/env robo\n+++\n# nothing here\n").unwrap();
        let before = config.unit_names.clone();

        assert!(load_shebang_file(&script, &mut config, &mut container));
        assert_eq!(config.unit_names, before);
    }

    #[test]
    fn test_missing_or_foreign_files_are_not_shebangs() {
        let (dir, mut config, mut container) = setup();
        let foreign = dir.path().join("foreign.sh");
        fs::write(&foreign, "#!/bin/sh\necho hi\n").unwrap();
        let argv = args(&["robo", "nope/not-here", foreign.to_str().unwrap()]);

        let result = process_shebang(argv.clone(), &mut config, &mut container);
        assert_eq!(result, argv);
    }

    #[test]
    fn test_first_declared_unit_wins() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("multi");
        fs::write(
            &script,
            "#!/usr/bin/env robo\n+++\n[unit.Zeta.commands]\na = \"true\"\n[unit.Alpha.commands]\nb = \"true\"\n",
        )
        .unwrap();
        let parsed = read_shebang_script(&script).unwrap();
        assert_eq!(parsed.unit_name.as_deref(), Some("Zeta"));
    }
}
