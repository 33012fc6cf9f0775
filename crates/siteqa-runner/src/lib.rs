//! Process execution for siteqa
//!
//! Every external tool, the resume generator, and the local server are
//! launched through [`CommandSpec`], which keeps arguments as discrete argv
//! elements. Nothing is evaluated by a shell.

pub mod command_spec;
pub mod error;
pub mod native;
pub mod process;
pub mod signal;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use native::NativeRunner;
pub use process::{ProcessOutput, ProcessRunner};
pub use signal::{TermSignal, signal_group, signal_process};
#[cfg(unix)]
pub use signal::set_own_process_group;
