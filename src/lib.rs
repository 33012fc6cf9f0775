//! siteqa - local quality gates for a static portfolio site
//!
//! Runs the same checks a CI pipeline would, against a locally served copy
//! of the site: content validation, resume generation, link checking,
//! accessibility and performance audits. Each check is an external tool;
//! siteqa sequences them, owns the local server for the duration of the run,
//! and reduces everything to one summary and one exit code.
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! # Full run on the default audit port (8001)
//! siteqa run
//!
//! # Tools already known to be installed, different port
//! siteqa run --skip-deps --port 8100
//!
//! # Only probe for the required tools
//! siteqa doctor --json
//!
//! # Free the development server port
//! siteqa stop --port 8000
//! ```
//!
//! # Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | every stage passed |
//! | 1 | a stage failed, or setup stopped the run |
//! | 2 | invalid arguments or configuration |
//! | 130 | interrupted |
//!
//! # Library use
//!
//! The [`Orchestrator`] takes its collaborators as trait objects, so a run
//! can be embedded with a custom [`ProcessRunner`] or server launcher.
//!
//! [`ProcessRunner`]: siteqa_runner::ProcessRunner

pub mod cli;

pub use siteqa_config::{CliArgs, Config};
pub use siteqa_engine::{Orchestrator, RunOptions, RunReport, Summary};
pub use siteqa_utils::error::SiteQaError;
pub use siteqa_utils::exit_codes::ExitCode;
pub use siteqa_utils::types::{Stage, StageResult};
