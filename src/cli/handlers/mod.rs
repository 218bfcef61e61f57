// src/cli/handlers/mod.rs

// Commands the runner provides on its own, outside any task file.

pub mod init;
