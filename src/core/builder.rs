// src/core/builder.rs

use crate::core::io::Io;
use crate::system::executor::strip_failure_marker;
use crate::task::{CommandTask, Exec, TaskContext, TaskError};

/// The collaborator handed to builder-aware units. It knows where the unit's
/// tasks run and produces fresh collections for each invocation.
#[derive(Debug, Clone)]
pub struct CollectionBuilder {
    unit: String,
    context: TaskContext,
}

impl CollectionBuilder {
    /// A builder for `unit`, running tasks with `context`.
    pub fn new(unit: impl Into<String>, context: TaskContext) -> Self {
        Self {
            unit: unit.into(),
            context,
        }
    }

    /// The unit this builder was created for.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn context(&self) -> &TaskContext {
        &self.context
    }

    /// Starts an empty collection whose output follows `io`.
    pub fn collection(&self, io: Io) -> Collection {
        let mut context = self.context.clone();
        context.io = io;
        Collection {
            tasks: Vec::new(),
            context,
        }
    }
}

/// Tasks queued for one operation, run in insertion order.
#[derive(Debug)]
pub struct Collection {
    tasks: Vec<Box<dyn CommandTask>>,
    context: TaskContext,
}

impl Collection {
    /// Queues a task.
    pub fn add(&mut self, task: impl CommandTask + 'static) -> &mut Self {
        self.tasks.push(Box::new(task));
        self
    }

    /// Queues a raw command line. A leading `-` lets it fail.
    pub fn exec(&mut self, command_line: &str) -> &mut Self {
        let (line, allow_failure) = strip_failure_marker(command_line);
        self.add(Exec::new(line).allow_failure(allow_failure))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The command lines of the queued tasks, in order.
    pub fn command_lines(&self) -> Vec<String> {
        self.tasks.iter().map(|task| task.command_line()).collect()
    }

    /// Runs every task, stopping at the first failure.
    pub fn run(&self) -> Result<(), TaskError> {
        for (i, task) in self.tasks.iter().enumerate() {
            log::debug!("Running task {}/{}: {:?}", i + 1, self.tasks.len(), task);
            task.run(&self.context)?;
        }
        Ok(())
    }
}
