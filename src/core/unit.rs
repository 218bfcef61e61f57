//! # Task Units
//!
//! A task unit is the object whose operations become subcommands. Instead of
//! discovering operations by inspecting the object, every unit describes its
//! own commands through [`TaskUnit::commands`] and runs them through
//! [`TaskUnit::invoke`].

use crate::core::builder::CollectionBuilder;
use crate::core::io::Io;
use anyhow::Result;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Parameter names the dispatch layer already uses for itself.
const RESERVED_OPTIONS: &[&str] = &["help", "version", "quiet", "verbose", "no-ansi", "load-from"];
const RESERVED_SHORTS: &[char] = &['h', 'V', 'q', 'v', 'f'];

/// Why an operation could not be turned into a command.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DescribeError {
    #[error("operation '{operation}': parameter '{name}' is declared twice")]
    DuplicateParameter { operation: String, name: String },
    #[error("operation '{operation}': variadic argument '{name}' must be the last argument")]
    VariadicNotLast { operation: String, name: String },
    #[error("operation '{operation}': required argument '{name}' follows an optional one")]
    RequiredAfterOptional { operation: String, name: String },
    #[error("operation '{operation}': parameter name '{name}' is reserved")]
    ReservedOption { operation: String, name: String },
    #[error("operation '{operation}': invalid short flag '{short}' for option '{name}'")]
    InvalidShort {
        operation: String,
        name: String,
        short: String,
    },
    #[error("operation '{operation}': '{name}' is not a valid command-line name")]
    InvalidName { operation: String, name: String },
    #[error("operation '{operation}': {reason}")]
    Unsupported { operation: String, reason: String },
}

/// Help shown for a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelpText {
    pub about: Option<String>,
    pub long_about: Option<String>,
}

/// A positional parameter of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: String,
    pub desc: Option<String>,
    pub required: bool,
    pub default: Option<String>,
    pub variadic: bool,
}

impl ArgSpec {
    /// A required, single-valued argument.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desc: None,
            required: true,
            default: None,
            variadic: false,
        }
    }
}

/// A `--name` parameter of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: String,
    pub short: Option<char>,
    pub desc: Option<String>,
    pub default: Option<String>,
    pub flag: bool,
}

/// What a unit says about one of its operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The operation name, as the unit knows it.
    pub operation: String,
    pub help: HelpText,
    pub arguments: Vec<ArgSpec>,
    pub options: Vec<OptionSpec>,
    pub aliases: Vec<String>,
    pub hidden: bool,
}

impl CommandSpec {
    /// A spec with no parameters, visible, without aliases.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            help: HelpText::default(),
            arguments: Vec::new(),
            options: Vec::new(),
            aliases: Vec::new(),
            hidden: false,
        }
    }

    /// Sets the one-line help.
    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.help.about = Some(about.into());
        self
    }

    /// Appends a positional argument.
    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.arguments.push(arg);
        self
    }

    /// Appends an option.
    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    /// Checks the parameter list for shapes the dispatch layer cannot express.
    pub fn validate(&self) -> Result<(), DescribeError> {
        let operation = || self.operation.clone();
        let invalid = |name: &str| DescribeError::InvalidName {
            operation: operation(),
            name: name.to_string(),
        };
        if !is_cli_name(&command_name(&self.operation)) {
            return Err(invalid(&self.operation));
        }
        if let Some(alias) = self.aliases.iter().find(|a| !is_cli_name(a)) {
            return Err(invalid(alias));
        }

        let mut seen = HashSet::new();
        let mut saw_optional = false;
        let last_index = self.arguments.len().saturating_sub(1);

        for (i, arg) in self.arguments.iter().enumerate() {
            if !is_cli_name(&arg.name) {
                return Err(invalid(&arg.name));
            }
            if !seen.insert(arg.name.as_str()) {
                return Err(DescribeError::DuplicateParameter {
                    operation: operation(),
                    name: arg.name.clone(),
                });
            }
            if RESERVED_OPTIONS.contains(&arg.name.as_str()) {
                return Err(DescribeError::ReservedOption {
                    operation: operation(),
                    name: arg.name.clone(),
                });
            }
            if arg.variadic && i != last_index {
                return Err(DescribeError::VariadicNotLast {
                    operation: operation(),
                    name: arg.name.clone(),
                });
            }
            if arg.required && saw_optional {
                return Err(DescribeError::RequiredAfterOptional {
                    operation: operation(),
                    name: arg.name.clone(),
                });
            }
            saw_optional |= !arg.required;
        }

        let mut shorts = HashSet::new();
        for opt in &self.options {
            if !is_cli_name(&opt.name) {
                return Err(invalid(&opt.name));
            }
            if !seen.insert(opt.name.as_str()) {
                return Err(DescribeError::DuplicateParameter {
                    operation: operation(),
                    name: opt.name.clone(),
                });
            }
            if RESERVED_OPTIONS.contains(&opt.name.as_str()) {
                return Err(DescribeError::ReservedOption {
                    operation: operation(),
                    name: opt.name.clone(),
                });
            }
            if let Some(short) = opt.short
                && (!short.is_ascii_alphanumeric()
                    || RESERVED_SHORTS.contains(&short)
                    || !shorts.insert(short))
            {
                return Err(DescribeError::InvalidShort {
                    operation: operation(),
                    name: opt.name.clone(),
                    short: short.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Names clap can take as a command, alias, `--long` or value name.
fn is_cli_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('-') && !name.contains(|c: char| c.is_whitespace() || c == '=')
}

/// A resolved parameter value handed to an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Many(Vec<String>),
    Flag(bool),
    Absent,
}

/// Everything an operation receives when it is invoked.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub params: BTreeMap<String, ParamValue>,
    pub pass_through: Vec<String>,
    pub io: Io,
}

impl Invocation {
    /// The value of `name`, or [`ParamValue::Absent`].
    pub fn get(&self, name: &str) -> &ParamValue {
        self.params.get(name).unwrap_or(&ParamValue::Absent)
    }

    /// The value of a single-valued parameter, if it was given or defaulted.
    pub fn value(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            ParamValue::Single(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the flag `name` was given.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), ParamValue::Flag(true))
    }
}

/// Units that want a collection builder declare it by answering
/// [`TaskUnit::as_builder_aware`].
pub trait BuilderAware {
    fn set_builder(&mut self, builder: CollectionBuilder);
}

/// The contract every source of commands implements.
pub trait TaskUnit: fmt::Debug {
    /// The unit name, as used in `[unit.<Name>]` or `Container::define`.
    fn name(&self) -> &str;

    /// Describes every operation. Operations that cannot be described are
    /// reported as errors and skipped by the registrar.
    fn commands(&self) -> Vec<Result<CommandSpec, DescribeError>>;

    /// Runs one operation and returns its exit status.
    fn invoke(&self, operation: &str, invocation: &Invocation) -> Result<i32>;

    /// Capability check for the builder collaborator.
    fn as_builder_aware(&mut self) -> Option<&mut dyn BuilderAware> {
        None
    }
}

/// A registered command: a CLI name bound to one operation of a live unit.
#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    pub name: String,
    pub operation: String,
    pub unit: Rc<dyn TaskUnit>,
    pub help: HelpText,
    pub arguments: Vec<ArgSpec>,
    pub options: Vec<OptionSpec>,
    pub aliases: Vec<String>,
    pub hidden: bool,
}

impl CommandDescriptor {
    /// Binds a validated spec to the unit instance that will run it.
    pub fn bind(spec: CommandSpec, unit: Rc<dyn TaskUnit>) -> Self {
        Self {
            name: command_name(&spec.operation),
            operation: spec.operation,
            unit,
            help: spec.help,
            arguments: spec.arguments,
            options: spec.options,
            aliases: spec.aliases,
            hidden: spec.hidden,
        }
    }

    /// Runs the bound operation.
    pub fn invoke(&self, invocation: &Invocation) -> Result<i32> {
        log::debug!(
            "Invoking '{}' ({}::{})",
            self.name,
            self.unit.name(),
            self.operation
        );
        self.unit.invoke(&self.operation, invocation)
    }
}

/// Converts an operation name into a command name: every camelCase hump
/// starts a `:` group and `_` becomes `-` (`assetsBuild` -> `assets:build`).
pub fn command_name(operation: &str) -> String {
    let mut name = String::with_capacity(operation.len() + 4);
    let mut prev_lower = false;
    for c in operation.chars() {
        if c.is_uppercase() {
            if prev_lower {
                name.push(':');
            }
            name.extend(c.to_lowercase());
            prev_lower = false;
        } else if c == '_' {
            name.push('-');
            prev_lower = false;
        } else {
            name.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_name_conversion() {
        assert_eq!(command_name("hello"), "hello");
        assert_eq!(command_name("assetsBuild"), "assets:build");
        assert_eq!(command_name("deployToProd"), "deploy:to:prod");
        assert_eq!(command_name("run_tests"), "run-tests");
        assert_eq!(command_name("db:migrate"), "db:migrate");
        assert_eq!(command_name("HTTPServe"), "httpserve");
    }

    #[test]
    fn test_validate_rejects_variadic_before_last() {
        let spec = CommandSpec::new("copy")
            .arg(ArgSpec {
                variadic: true,
                ..ArgSpec::required("files")
            })
            .arg(ArgSpec::required("dest"));
        assert!(matches!(
            spec.validate(),
            Err(DescribeError::VariadicNotLast { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_required_after_optional() {
        let spec = CommandSpec::new("greet")
            .arg(ArgSpec {
                required: false,
                ..ArgSpec::required("greeting")
            })
            .arg(ArgSpec::required("name"));
        assert!(matches!(
            spec.validate(),
            Err(DescribeError::RequiredAfterOptional { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_reserved_and_duplicate_options() {
        let reserved = CommandSpec::new("x").option(OptionSpec {
            name: "verbose".into(),
            short: None,
            desc: None,
            default: None,
            flag: true,
        });
        assert!(matches!(
            reserved.validate(),
            Err(DescribeError::ReservedOption { .. })
        ));

        let duplicate = CommandSpec::new("x")
            .arg(ArgSpec::required("target"))
            .option(OptionSpec {
                name: "target".into(),
                short: Some('t'),
                desc: None,
                default: None,
                flag: false,
            });
        assert!(matches!(
            duplicate.validate(),
            Err(DescribeError::DuplicateParameter { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_shared_short_flags() {
        let option = |name: &str| OptionSpec {
            name: name.into(),
            short: Some('d'),
            desc: None,
            default: None,
            flag: true,
        };
        let spec = CommandSpec::new("x").option(option("dry")).option(option("debug"));
        assert!(matches!(
            spec.validate(),
            Err(DescribeError::InvalidShort { name, .. }) if name == "debug"
        ));
    }

    #[test]
    fn test_validate_rejects_names_clap_cannot_take() {
        let option = |name: &str| OptionSpec {
            name: name.into(),
            short: None,
            desc: None,
            default: None,
            flag: true,
        };
        for bad in ["-x", "", "dry run", "a=b"] {
            let spec = CommandSpec::new("x").option(option(bad));
            assert!(
                matches!(spec.validate(), Err(DescribeError::InvalidName { ref name, .. }) if name == bad),
                "option {:?} was accepted",
                bad
            );
        }

        let arg = CommandSpec::new("x").arg(ArgSpec::required("--target"));
        assert!(matches!(arg.validate(), Err(DescribeError::InvalidName { .. })));

        let mut aliased = CommandSpec::new("x");
        aliased.aliases.push("-y".into());
        assert!(matches!(aliased.validate(), Err(DescribeError::InvalidName { .. })));

        assert!(CommandSpec::new("x").option(option("dry-run")).validate().is_ok());
    }

    #[test]
    fn test_invocation_accessors() {
        let mut invocation = Invocation::default();
        invocation
            .params
            .insert("who".into(), ParamValue::Single("world".into()));
        invocation.params.insert("loud".into(), ParamValue::Flag(true));
        assert_eq!(invocation.value("who"), Some("world"));
        assert!(invocation.flag("loud"));
        assert!(!invocation.flag("missing"));
        assert_eq!(invocation.get("missing"), &ParamValue::Absent);
    }
}
