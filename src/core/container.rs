//! # Container
//!
//! The explicit context created once by the runner (or handed to it by an
//! embedding program) and passed to every stage that needs it. It keeps:
//!
//! - the unit **definitions**: factories keyed by unit name. Loading a task file
//!   or a shebang script adds definitions; native units are added with
//!   [`Container::define`].
//! - the **shared instances**: one `Rc<dyn TaskUnit>` per unit, keyed by
//!   `<Name>Commands`.
//! - the shared collaborators: output settings, cancellation token and the
//!   working directory tasks run in.

use crate::CancellationToken;
use crate::constants::SHARED_INSTANCE_SUFFIX;
use crate::core::builder::CollectionBuilder;
use crate::core::io::Io;
use crate::core::unit::TaskUnit;
use crate::task::TaskContext;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use thiserror::Error;

/// Builds a fresh unit instance.
pub type UnitFactory = Box<dyn Fn(&Container) -> anyhow::Result<Box<dyn TaskUnit>>>;

/// Why a unit could not be handed out.
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Unit '{0}' is not defined")]
    UndefinedUnit(String),
    #[error("Unit '{name}' could not be created: {source}")]
    Instantiation {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Process-wide state of one run: unit definitions and their shared
/// instances, the output settings, the cancellation token and the directory
/// tasks run in.
pub struct Container {
    definitions: BTreeMap<String, UnitFactory>,
    shared: HashMap<String, Rc<dyn TaskUnit>>,
    io: Io,
    cancellation_token: CancellationToken,
    working_dir: PathBuf,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("definitions", &self.definitions.keys().collect::<Vec<_>>())
            .field("shared", &self.shared.keys().collect::<Vec<_>>())
            .field("io", &self.io)
            .field("working_dir", &self.working_dir)
            .finish()
    }
}

impl Container {
    /// An empty container whose tasks run in `working_dir`.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            definitions: BTreeMap::new(),
            shared: HashMap::new(),
            io: Io::default(),
            cancellation_token: Arc::new(AtomicBool::new(false)),
            working_dir: working_dir.into(),
        }
    }

    /// Makes a unit available under `name`. A later definition replaces an
    /// earlier one, but never an instance that was already shared.
    pub fn define<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Self) -> anyhow::Result<Box<dyn TaskUnit>> + 'static,
    {
        let name = name.into();
        log::debug!("Defining unit '{}'", name);
        self.definitions.insert(name, Box::new(factory));
    }

    /// Whether a factory is registered under `name`.
    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Names of every defined unit, sorted.
    pub fn defined_units(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Builds a new, unshared instance of a defined unit.
    pub fn make(&self, name: &str) -> Result<Box<dyn TaskUnit>, ContainerError> {
        let factory = self
            .definitions
            .get(name)
            .ok_or_else(|| ContainerError::UndefinedUnit(name.to_string()))?;
        factory(self).map_err(|source| ContainerError::Instantiation {
            name: name.to_string(),
            source,
        })
    }

    /// Stores `instance` as the single shared instance of `name`.
    pub fn share(&mut self, name: &str, instance: Rc<dyn TaskUnit>) -> Rc<dyn TaskUnit> {
        self.shared.insert(shared_key(name), Rc::clone(&instance));
        instance
    }

    /// The shared instance of `name`, if one was stored.
    pub fn shared(&self, name: &str) -> Option<Rc<dyn TaskUnit>> {
        self.shared.get(&shared_key(name)).cloned()
    }

    /// A builder bound to the unit `name`, running tasks in the working directory.
    pub fn collection_builder(&self, name: &str) -> CollectionBuilder {
        CollectionBuilder::new(
            name,
            TaskContext {
                cwd: self.working_dir.clone(),
                env: HashMap::new(),
                cancellation_token: Arc::clone(&self.cancellation_token),
                io: self.io,
            },
        )
    }

    /// The current output settings.
    pub fn io(&self) -> Io {
        self.io
    }

    pub fn io_mut(&mut self) -> &mut Io {
        &mut self.io
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    /// Where tasks run.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn set_working_dir(&mut self, working_dir: impl Into<PathBuf>) {
        self.working_dir = working_dir.into();
    }
}

fn shared_key(name: &str) -> String {
    format!("{}{}", name, SHARED_INSTANCE_SUFFIX)
}
