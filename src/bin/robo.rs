// src/bin/robo.rs

use robo::Runner;
use std::env;

/// Entry point of the `robo` binary. Logging is controlled by `RUST_LOG`.
fn main() {
    env_logger::init();
    let status = Runner::default().execute(env::args().collect());
    std::process::exit(status);
}
