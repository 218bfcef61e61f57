// src/constants.rs

/// The name of the unit loaded when nothing else is configured.
pub const DEFAULT_UNIT_NAME: &str = "RoboFile";

/// The name of the task file looked up in the working directory.
pub const DEFAULT_TASK_FILE: &str = "RoboFile.toml";

/// The extension stripped from a `--load-from` file to derive a unit name.
pub const TASK_FILE_EXTENSION: &str = ".toml";

/// The token a shebang line must contain to be recognized as ours.
pub const RUNNER_TOKEN: &str = "robo";

/// The line that opens the embedded task definition of a shebang script.
pub const SCRIPT_OPEN_TAG: &str = "+++";

/// Separates framework arguments from pass-through arguments.
pub const PASS_THROUGH_SEPARATOR: &str = "--";

/// Long form of the directory/file override flag.
pub const LOAD_FROM_LONG: &str = "--load-from";

/// Short form of the directory/file override flag.
pub const LOAD_FROM_SHORT: &str = "-f";

/// Suffix of the container key under which a unit instance is shared.
pub const SHARED_INSTANCE_SUFFIX: &str = "Commands";

/// Name of the scaffolding command registered when no task file exists.
pub const INIT_COMMAND: &str = "init";

/// Exit status reported after a fatal panic was caught at the run boundary.
pub const FATAL_EXIT_CODE: i32 = 101;

/// Width of the highlighted blocks written by `Io::yell`.
pub const YELL_WIDTH: usize = 40;
