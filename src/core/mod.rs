// src/core/mod.rs

pub mod builder;
pub mod container;
pub mod hooks;
pub mod input;
pub mod io;
pub mod loader;
pub mod registrar;
pub mod runner;
pub mod shebang;
pub mod toml_unit;
pub mod unit;
