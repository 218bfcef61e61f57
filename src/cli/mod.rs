//! # Dispatch Layer
//!
//! - **`application`**: the registered-command table, rendered into a clap
//!   command at run time.
//! - **`handlers`**: commands built into the runner itself.

pub mod application;
pub mod handlers;
