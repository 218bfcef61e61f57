//! # Task-file Units
//!
//! The [`TaskUnit`] behind every `[unit.<Name>]` table. Each command is a list
//! of command-line templates; `<name>` tokens are replaced with the values of
//! the declared arguments and options, `<passthrough>` with the arguments
//! given after `--`, and `\<` keeps a literal `<`.

use crate::core::builder::CollectionBuilder;
use crate::core::unit::{
    ArgSpec, BuilderAware, CommandSpec, DescribeError, HelpText, Invocation, OptionSpec,
    ParamValue, TaskUnit,
};
use crate::models::{ExtendedCommand, TomlCommand, TomlUnit};
use crate::system::executor::strip_failure_marker;
use crate::task::{Exec, quote};
use anyhow::{Result, anyhow};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

lazy_static! {
    // Captures `<token>`, with an optional escape character `\`.
    static ref TOKEN_RE: Regex = Regex::new(r"\\?<([A-Za-z_][A-Za-z0-9_-]*)>").unwrap();
}

/// The token that expands to the pass-through arguments.
const PASS_THROUGH_TOKEN: &str = "passthrough";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown token '<{0}>'")]
    UnknownToken(String),
    #[error("'<{0}>' is reserved for the pass-through arguments")]
    ReservedName(String),
}

/// One piece of a pre-parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateComponent {
    Literal(String),
    Param(String),
    PassThrough,
}

/// Splits a command line into literals and tokens, merging adjacent literals.
pub fn tokenize(line: &str) -> Vec<TemplateComponent> {
    let mut components = Vec::new();
    let mut literal = String::new();
    let mut last_end = 0;

    for captures in TOKEN_RE.captures_iter(line) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        literal.push_str(line.get(last_end..whole.start()).unwrap_or_default());
        last_end = whole.end();

        if let Some(escaped) = whole.as_str().strip_prefix('\\') {
            literal.push_str(escaped);
            continue;
        }
        if !literal.is_empty() {
            components.push(TemplateComponent::Literal(std::mem::take(&mut literal)));
        }
        components.push(if name.as_str() == PASS_THROUGH_TOKEN {
            TemplateComponent::PassThrough
        } else {
            TemplateComponent::Param(name.as_str().to_string())
        });
    }

    literal.push_str(line.get(last_end..).unwrap_or_default());
    if !literal.is_empty() {
        components.push(TemplateComponent::Literal(literal));
    }
    components
}

/// Renders a tokenized line with the values of one invocation.
pub fn render(components: &[TemplateComponent], invocation: &Invocation) -> String {
    let mut out = String::new();
    for component in components {
        match component {
            TemplateComponent::Literal(text) => out.push_str(text),
            TemplateComponent::Param(name) => match invocation.get(name) {
                ParamValue::Single(value) => out.push_str(&quote(value)),
                ParamValue::Many(values) => out.push_str(&quote_all(values)),
                ParamValue::Flag(true) => {
                    out.push_str("--");
                    out.push_str(name);
                }
                ParamValue::Flag(false) | ParamValue::Absent => {}
            },
            TemplateComponent::PassThrough => out.push_str(&quote_all(&invocation.pass_through)),
        }
    }
    out
}

fn quote_all(values: &[String]) -> String {
    values
        .iter()
        .map(|value| quote(value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A unit declared in a task file.
#[derive(Debug, Clone)]
pub struct TomlTaskUnit {
    name: String,
    desc: Option<String>,
    commands: BTreeMap<String, ExtendedCommand>,
    builder: Option<CollectionBuilder>,
}

impl TomlTaskUnit {
    /// Wraps the `[unit.<name>]` table of a task file.
    pub fn new(name: impl Into<String>, unit: TomlUnit) -> Self {
        Self {
            name: name.into(),
            desc: unit.desc,
            commands: unit
                .commands
                .into_iter()
                .map(|(op, cmd)| (op, TomlCommand::into_extended(cmd)))
                .collect(),
            builder: None,
        }
    }

    fn describe(&self, operation: &str, command: &ExtendedCommand) -> Result<CommandSpec, DescribeError> {
        let unsupported = |reason: String| DescribeError::Unsupported {
            operation: operation.to_string(),
            reason,
        };

        let arguments: Vec<ArgSpec> = command
            .args
            .iter()
            .cloned()
            .map(|arg| {
                let arg = arg.into_extended();
                ArgSpec {
                    required: arg.required.unwrap_or(arg.default.is_none()),
                    name: arg.name,
                    desc: arg.desc,
                    default: arg.default,
                    variadic: arg.variadic,
                }
            })
            .collect();

        let mut options = Vec::with_capacity(command.options.len());
        for (name, opt) in &command.options {
            let short = match opt.short.as_deref() {
                None => None,
                Some(s) => {
                    let mut chars = s.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Some(c),
                        _ => {
                            return Err(DescribeError::InvalidShort {
                                operation: operation.to_string(),
                                name: name.clone(),
                                short: s.to_string(),
                            });
                        }
                    }
                }
            };
            if opt.flag && opt.default.is_some() {
                return Err(unsupported(format!("flag '{}' cannot have a default value", name)));
            }
            options.push(OptionSpec {
                name: name.clone(),
                short,
                desc: opt.desc.clone(),
                default: opt.default.clone(),
                flag: opt.flag,
            });
        }

        let declared: HashSet<&str> = arguments
            .iter()
            .map(|a| a.name.as_str())
            .chain(options.iter().map(|o| o.name.as_str()))
            .collect();
        if declared.contains(PASS_THROUGH_TOKEN) {
            return Err(unsupported(
                TemplateError::ReservedName(PASS_THROUGH_TOKEN.to_string()).to_string(),
            ));
        }
        for line in command.run.lines() {
            for component in tokenize(line) {
                if let TemplateComponent::Param(name) = component
                    && !declared.contains(name.as_str())
                {
                    return Err(unsupported(TemplateError::UnknownToken(name).to_string()));
                }
            }
        }

        let spec = CommandSpec {
            operation: operation.to_string(),
            help: HelpText {
                // Commands without their own summary show the unit's.
                about: command.desc.clone().or_else(|| self.desc.clone()),
                long_about: command.help.clone(),
            },
            arguments,
            options,
            aliases: command.aliases.clone(),
            hidden: command.hidden,
        };
        spec.validate()?;
        Ok(spec)
    }
}

impl TaskUnit for TomlTaskUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn commands(&self) -> Vec<Result<CommandSpec, DescribeError>> {
        self.commands
            .iter()
            .map(|(operation, command)| self.describe(operation, command))
            .collect()
    }

    fn invoke(&self, operation: &str, invocation: &Invocation) -> Result<i32> {
        let command = self
            .commands
            .get(operation)
            .ok_or_else(|| anyhow!("Unit '{}' has no operation '{}'", self.name, operation))?;
        let builder = self
            .builder
            .as_ref()
            .ok_or_else(|| anyhow!("Unit '{}' was not given a task builder", self.name))?;

        let mut collection = builder.collection(invocation.io);
        for line in command.run.lines() {
            // The marker belongs to the template, never to a substituted value.
            let (template, allow_failure) = strip_failure_marker(line);
            let rendered = render(&tokenize(template), invocation);
            if !rendered.trim().is_empty() {
                collection.add(Exec::new(rendered.trim()).allow_failure(allow_failure));
            }
        }

        match collection.run() {
            Ok(()) => Ok(0),
            Err(e) => {
                invocation.io.error(&e.to_string());
                Ok(e.exit_code())
            }
        }
    }

    fn as_builder_aware(&mut self) -> Option<&mut dyn BuilderAware> {
        Some(self)
    }
}

impl BuilderAware for TomlTaskUnit {
    fn set_builder(&mut self, builder: CollectionBuilder) {
        self.builder = Some(builder);
    }
}
