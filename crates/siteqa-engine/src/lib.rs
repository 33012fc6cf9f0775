//! Quality gate engine for siteqa
//!
//! Drives the stages of a run against a locally served site:
//!
//! - [`orchestrator`] sequences the stages and owns the server
//! - [`stages`] wraps each external tool invocation into a stage result
//! - [`server`] evicts the port, spawns the server, polls it, tears it down
//! - [`rewrite`] and [`temp_config`] derive port-specific tool configs

pub mod orchestrator;
pub mod rewrite;
pub mod server;
pub mod stages;
pub mod summary;
pub mod temp_config;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use orchestrator::{Orchestrator, RunOptions, RunReport, render_banner};
pub use rewrite::{derive_config, local_origin, rewrite_urls};
pub use server::{
    HttpProbe, LiveServer, LocalServer, LsofOccupants, PortOccupants, ServerHandle,
    ServerLauncher, ShutdownOutcome, evict,
};
pub use summary::Summary;
pub use temp_config::TempConfig;
