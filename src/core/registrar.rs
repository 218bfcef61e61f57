//! # Command Registrar
//!
//! Turns loaded units into registered commands. Each unit is instantiated at
//! most once per container: a shared instance is reused, a fresh one is given
//! its collection builder (if it asks for one) and then shared.

use crate::cli::application::Application;
use crate::core::container::{Container, ContainerError};
use crate::core::unit::{CommandDescriptor, TaskUnit};
use crate::models::UnitNames;
use std::rc::Rc;

/// Registers the commands of every unit in `unit_names`, in order.
///
/// Operations a unit cannot describe are skipped with a warning; their
/// siblings still register. Returns the number of registered commands.
pub fn register_units(
    app: &mut Application,
    container: &mut Container,
    unit_names: &UnitNames,
) -> Result<usize, ContainerError> {
    let mut registered = 0;
    for name in unit_names.iter() {
        let unit = shared_instance(container, name)?;
        for result in unit.commands() {
            match result.and_then(|spec| spec.validate().map(|()| spec)) {
                Ok(spec) => {
                    let descriptor = CommandDescriptor::bind(spec, Rc::clone(&unit));
                    log::debug!("Registering command '{}' from unit '{}'", descriptor.name, name);
                    app.add(descriptor);
                    registered += 1;
                }
                Err(e) => log::warn!("Skipping command of unit '{}': {}", name, e),
            }
        }
    }
    Ok(registered)
}

/// Returns the unit's shared instance, creating and sharing it first if needed.
pub fn shared_instance(container: &mut Container, name: &str) -> Result<Rc<dyn TaskUnit>, ContainerError> {
    if let Some(unit) = container.shared(name) {
        log::debug!("Reusing shared instance of unit '{}'", name);
        return Ok(unit);
    }

    let mut unit = container.make(name)?;
    if let Some(aware) = unit.as_builder_aware() {
        aware.set_builder(container.collection_builder(name));
    }
    Ok(container.share(name, Rc::from(unit)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::CollectionBuilder;
    use crate::core::loader::define_units;
    use crate::core::unit::{BuilderAware, CommandSpec, DescribeError, Invocation};
    use std::cell::Cell;
    use std::path::Path;

    thread_local! {
        static CREATED: Cell<usize> = const { Cell::new(0) };
    }

    #[derive(Debug, Default)]
    struct Native {
        builder: Option<CollectionBuilder>,
    }

    impl TaskUnit for Native {
        fn name(&self) -> &str {
            "Native"
        }
        fn commands(&self) -> Vec<Result<CommandSpec, DescribeError>> {
            vec![
                Ok(CommandSpec::new("assetsBuild")),
                Err(DescribeError::Unsupported {
                    operation: "broken".into(),
                    reason: "cannot be described".into(),
                }),
                Ok(CommandSpec::new("check_builder")),
            ]
        }
        fn invoke(&self, _: &str, _: &Invocation) -> anyhow::Result<i32> {
            Ok(if self.builder.is_some() { 0 } else { 3 })
        }
        fn as_builder_aware(&mut self) -> Option<&mut dyn BuilderAware> {
            Some(self)
        }
    }

    impl BuilderAware for Native {
        fn set_builder(&mut self, builder: CollectionBuilder) {
            self.builder = Some(builder);
        }
    }

    fn native_container() -> Container {
        let mut container = Container::new(".");
        container.define("Native", |_| {
            CREATED.with(|c| c.set(c.get() + 1));
            Ok(Box::new(Native::default()))
        });
        container
    }

    #[test]
    fn test_skips_undescribable_operations() {
        let mut container = native_container();
        let mut app = Application::new("robo", "0.0.0");

        let count = register_units(&mut app, &mut container, &UnitNames::Single("Native".into())).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            app.command_names().collect::<Vec<_>>(),
            vec!["assets:build", "check-builder"]
        );
    }

    #[test]
    fn test_fresh_instance_receives_builder() {
        let mut container = native_container();
        let unit = shared_instance(&mut container, "Native").unwrap();
        assert_eq!(unit.invoke("check_builder", &Invocation::default()).unwrap(), 0);
    }

    #[test]
    fn test_one_instance_per_unit() {
        CREATED.with(|c| c.set(0));
        let mut container = native_container();
        let mut app = Application::new("robo", "0.0.0");
        let names = UnitNames::Many(vec!["Native".into(), "Native".into()]);

        register_units(&mut app, &mut container, &names).unwrap();
        register_units(&mut app, &mut container, &names).unwrap();
        assert_eq!(CREATED.with(Cell::get), 1);
    }

    #[test]
    fn test_undefined_unit_is_an_error() {
        let mut container = Container::new(".");
        let mut app = Application::new("robo", "0.0.0");
        let err = register_units(&mut app, &mut container, &UnitNames::Single("Ghost".into())).unwrap_err();
        assert!(matches!(err, ContainerError::UndefinedUnit(_)));
    }

    #[test]
    fn test_registers_task_file_units() {
        let mut container = Container::new(".");
        define_units(
            &mut container,
            "[unit.RoboFile.commands]\nhello = \"echo hello\"\nbad = \"echo <nope>\"\n",
            Path::new("inline"),
        )
        .unwrap();
        let mut app = Application::new("robo", "0.0.0");

        let count = register_units(&mut app, &mut container, &UnitNames::Single("RoboFile".into())).unwrap();
        assert_eq!(count, 1);
        assert!(app.has_command("hello"));
    }

    #[test]
    fn test_skips_commands_with_unusable_parameter_names() {
        let mut container = Container::new(".");
        define_units(
            &mut container,
            r#"
            [unit.RoboFile.commands]
            hello = "echo hello"

            [unit.RoboFile.commands.bad]
            run = "echo bad"
            options = { "-x" = { flag = true } }

            [unit.RoboFile.commands.spaced]
            run = "echo spaced"
            args = ["two words"]
            "#,
            Path::new("inline"),
        )
        .unwrap();
        let mut app = Application::new("robo", "0.0.0");

        let count = register_units(&mut app, &mut container, &UnitNames::Single("RoboFile".into())).unwrap();
        assert_eq!(count, 1);
        assert_eq!(app.command_names().collect::<Vec<_>>(), vec!["hello"]);
    }
}
