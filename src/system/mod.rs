//! # System Interaction Layer
//!
//! The boundary between the task library and the operating system.
//!
//! ## Modules
//!
//! - **`executor`**: spawns command lines in a working directory, with
//!   cooperative cancellation and `cmd.exe` handling on Windows.

pub mod executor;
