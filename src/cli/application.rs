// src/cli/application.rs

use crate::core::io::Io;
use crate::core::unit::{CommandDescriptor, Invocation, ParamValue};
use crate::models::ParsedInput;
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::collections::{BTreeMap, HashSet};

/// The registered-command table and the clap rendering of it.
#[derive(Debug)]
pub struct Application {
    name: String,
    version: String,
    commands: BTreeMap<String, CommandDescriptor>,
    pinned: Option<String>,
}

impl Application {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            commands: BTreeMap::new(),
            pinned: None,
        }
    }

    /// Registers a command. A command with the same name is replaced.
    pub fn add(&mut self, descriptor: CommandDescriptor) {
        if let Some(previous) = self.commands.insert(descriptor.name.clone(), descriptor) {
            log::debug!(
                "Command '{}' from unit '{}' was replaced",
                previous.name,
                previous.unit.name()
            );
        }
    }

    /// Exposes only `name` when the application runs.
    pub fn pin(&mut self, name: impl Into<String>) {
        self.pinned = Some(name.into());
    }

    /// Drops every command not listed in `names`.
    pub fn restrict_to(&mut self, names: &[&str]) {
        self.commands.retain(|name, _| names.contains(&name.as_str()));
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Parses `input.framework_args` and runs the selected command.
    pub fn run(&self, input: ParsedInput, io: &mut Io) -> i32 {
        let visible: Vec<&CommandDescriptor> = match &self.pinned {
            Some(pinned) => match self.commands.get(pinned) {
                Some(descriptor) => vec![descriptor],
                None => {
                    io.error_block(
                        &t!("app.error.pinned_missing").replace("{command}", pinned),
                        None,
                    );
                    return 1;
                }
            },
            None => self.commands.values().collect(),
        };

        let mut command = self.build_command(&visible);
        let matches = match command.try_get_matches_from_mut(&input.framework_args) {
            Ok(matches) => matches,
            Err(e) => {
                let _ = e.print();
                return match e.kind() {
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                    _ => e.exit_code(),
                };
            }
        };

        let Some((name, sub_matches)) = matches.subcommand() else {
            let _ = command.print_help();
            return 0;
        };
        io.configure(
            sub_matches.get_flag("quiet"),
            sub_matches.get_count("verbose"),
            sub_matches.get_flag("no-ansi"),
        );

        let Some(descriptor) = visible.iter().find(|d| d.name == name) else {
            io.error_block(&t!("app.error.unknown_command").replace("{command}", name), None);
            return 1;
        };
        let invocation = Invocation {
            params: resolve_params(descriptor, sub_matches),
            pass_through: input.pass_through_args,
            io: *io,
        };

        match descriptor.invoke(&invocation) {
            Ok(status) => status,
            Err(e) => {
                log::debug!("Command '{}' failed: {:?}", descriptor.name, e);
                io.error_block(&format!("{:#}", e), None);
                1
            }
        }
    }

    fn build_command(&self, visible: &[&CommandDescriptor]) -> Command {
        let styles = Styles::styled()
            .header(AnsiColor::Yellow.on_default().bold())
            .usage(AnsiColor::Yellow.on_default().bold())
            .literal(AnsiColor::Cyan.on_default().bold())
            .placeholder(AnsiColor::Green.on_default());

        let root = Command::new(self.name.clone())
            .version(self.version.clone())
            .styles(styles)
            .disable_help_subcommand(true)
            .arg(
                Arg::new("quiet")
                    .short('q')
                    .long("quiet")
                    .global(true)
                    .action(ArgAction::SetTrue)
                    .help(t!("app.option.quiet")),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .global(true)
                    .action(ArgAction::Count)
                    .help(t!("app.option.verbose")),
            )
            .arg(
                Arg::new("no-ansi")
                    .long("no-ansi")
                    .global(true)
                    .action(ArgAction::SetTrue)
                    .help(t!("app.option.no_ansi")),
            );

        // An alias may not shadow a command name or an alias taken earlier.
        let mut taken: HashSet<String> = visible.iter().map(|d| d.name.clone()).collect();
        visible.iter().fold(root, |root, descriptor| {
            let aliases: Vec<String> = descriptor
                .aliases
                .iter()
                .filter(|alias| {
                    let free = taken.insert((*alias).clone());
                    if !free {
                        log::warn!("Alias '{}' of '{}' is already taken", alias, descriptor.name);
                    }
                    free
                })
                .cloned()
                .collect();
            root.subcommand(subcommand_for(descriptor, aliases))
        })
    }
}

fn subcommand_for(descriptor: &CommandDescriptor, aliases: Vec<String>) -> Command {
    let mut command = Command::new(descriptor.name.clone())
        .visible_aliases(aliases)
        .hide(descriptor.hidden);
    if let Some(about) = &descriptor.help.about {
        command = command.about(about.clone());
    }
    if let Some(long_about) = &descriptor.help.long_about {
        command = command.long_about(long_about.clone());
    }

    for spec in &descriptor.arguments {
        let mut arg = Arg::new(spec.name.clone())
            .required(spec.required && spec.default.is_none())
            .action(if spec.variadic { ArgAction::Append } else { ArgAction::Set });
        if spec.variadic {
            arg = arg.num_args(1..);
        }
        if let Some(desc) = &spec.desc {
            arg = arg.help(desc.clone());
        }
        if let Some(default) = &spec.default {
            arg = arg.default_value(default.clone());
        }
        command = command.arg(arg);
    }

    for spec in &descriptor.options {
        let mut arg = Arg::new(spec.name.clone()).long(spec.name.clone());
        if let Some(short) = spec.short {
            arg = arg.short(short);
        }
        if let Some(desc) = &spec.desc {
            arg = arg.help(desc.clone());
        }
        if spec.flag {
            arg = arg.action(ArgAction::SetTrue);
        } else {
            arg = arg.action(ArgAction::Set);
            if let Some(default) = &spec.default {
                arg = arg.default_value(default.clone());
            }
        }
        command = command.arg(arg);
    }
    command
}

fn resolve_params(descriptor: &CommandDescriptor, matches: &ArgMatches) -> BTreeMap<String, ParamValue> {
    let mut params = BTreeMap::new();
    for spec in &descriptor.arguments {
        let value = if spec.variadic {
            matches
                .get_many::<String>(&spec.name)
                .map(|values| ParamValue::Many(values.cloned().collect()))
        } else {
            matches.get_one::<String>(&spec.name).cloned().map(ParamValue::Single)
        };
        params.insert(spec.name.clone(), value.unwrap_or(ParamValue::Absent));
    }
    for spec in &descriptor.options {
        let value = if spec.flag {
            ParamValue::Flag(matches.get_flag(&spec.name))
        } else {
            matches
                .get_one::<String>(&spec.name)
                .cloned()
                .map_or(ParamValue::Absent, ParamValue::Single)
        };
        params.insert(spec.name.clone(), value);
    }
    params
}
