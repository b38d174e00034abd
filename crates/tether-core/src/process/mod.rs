//! Service process management.
//!
//! # Architecture
//!
//! - `launcher` - Extension -> command table
//! - `env` - Env file loading
//! - `supervisor` - Spawning, monitoring and teardown

pub mod env;
pub mod launcher;
pub mod supervisor;

pub use env::{env_files, parse_env, EnvLoader, EnvVars};
pub use launcher::{Direct, Interpreter, Launcher, LauncherRegistry};
pub use supervisor::{
    ActiveService, ClosedCallback, OutputCallback, ServiceGroup, StartOptions, Supervisor,
};
