//! # robo
//!
//! A task runner: it finds a task file, turns the operations its units declare
//! into subcommands and dispatches the command line to the matching one.

include!(concat!(env!("OUT_DIR"), "/translations.rs"));

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Cooperative cancellation flag shared with the system executor.
pub type CancellationToken = Arc<AtomicBool>;

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;
pub mod task;

pub use crate::core::runner::Runner;
