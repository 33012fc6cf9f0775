use async_trait::async_trait;
use clap::Parser;
use std::sync::Mutex;

use super::args::{Cli, Commands, build_cli};
use super::commands::stop_port;
use super::run::cli_args_from;
use siteqa_engine::PortOccupants;
use siteqa_runner::RunnerError;
use siteqa_utils::exit_codes::ExitCode;

#[test]
fn test_cli_definition_is_consistent() {
    build_cli().debug_assert();
}

#[test]
fn test_run_flags_reach_config_layer() {
    let cli = Cli::try_parse_from([
        "siteqa",
        "--root",
        "/srv/site",
        "run",
        "--port",
        "8100",
        "--tool-timeout",
        "30",
        "--skip-deps",
        "-v",
    ])
    .unwrap();

    assert_eq!(
        cli.command,
        Commands::Run {
            skip_deps: true,
            port: Some(8100),
            tool_timeout: Some(30),
        }
    );

    let args = cli_args_from(&cli);
    assert_eq!(args.port, Some(8100));
    assert_eq!(args.tool_timeout_secs, Some(30));
    assert_eq!(args.root.as_deref(), Some(std::path::Path::new("/srv/site")));
    assert!(args.verbose);
    assert!(args.config_path.is_none());
}

#[test]
fn test_run_without_flags_leaves_defaults_to_config() {
    let cli = Cli::try_parse_from(["siteqa", "run"]).unwrap();
    let args = cli_args_from(&cli);
    assert_eq!(args.port, None);
    assert_eq!(args.tool_timeout_secs, None);
}

#[test]
fn test_stop_defaults_to_dev_port() {
    let cli = Cli::try_parse_from(["siteqa", "stop"]).unwrap();
    assert_eq!(cli.command, Commands::Stop { port: 8000 });
    // The stop port never overrides the audit port.
    assert_eq!(cli_args_from(&cli).port, None);
}

#[test]
fn test_rejects_port_out_of_range() {
    assert!(Cli::try_parse_from(["siteqa", "run", "--port", "70000"]).is_err());
    assert!(Cli::try_parse_from(["siteqa", "run", "--port", "http"]).is_err());
}

#[test]
fn test_subcommand_is_required() {
    assert!(Cli::try_parse_from(["siteqa"]).is_err());
}

struct FakeOccupants {
    pids: Result<Vec<u32>, ()>,
    refuse: Vec<u32>,
    terminated: Mutex<Vec<u32>>,
}

impl FakeOccupants {
    fn with(pids: Vec<u32>) -> Self {
        Self {
            pids: Ok(pids),
            refuse: Vec::new(),
            terminated: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PortOccupants for FakeOccupants {
    async fn list(&self, _port: u16) -> Result<Vec<u32>, RunnerError> {
        self.pids.clone().map_err(|()| RunnerError::SpawnFailed {
            program: "lsof".to_string(),
            reason: "not found".to_string(),
        })
    }

    fn terminate(&self, pid: u32) -> Result<(), RunnerError> {
        if self.refuse.contains(&pid) {
            return Err(RunnerError::SignalFailed {
                pid,
                reason: "EPERM".to_string(),
            });
        }
        self.terminated.lock().unwrap().push(pid);
        Ok(())
    }
}

#[tokio::test]
async fn test_stop_terminates_every_listener() {
    let occupants = FakeOccupants::with(vec![4242, 4343]);
    let outcome = stop_port(&occupants, 8000).await;

    assert_eq!(outcome.found, vec![4242, 4343]);
    assert_eq!(outcome.terminated, vec![4242, 4343]);
    assert_eq!(*occupants.terminated.lock().unwrap(), vec![4242, 4343]);
    assert_eq!(outcome.exit_code(), ExitCode::SUCCESS);
}

#[tokio::test]
async fn test_stop_on_free_port_fails() {
    let outcome = stop_port(&FakeOccupants::with(Vec::new()), 8000).await;
    assert!(outcome.found.is_empty());
    assert_eq!(outcome.exit_code(), ExitCode::FAILURE);
}

#[tokio::test]
async fn test_stop_when_lookup_fails() {
    let occupants = FakeOccupants {
        pids: Err(()),
        refuse: Vec::new(),
        terminated: Mutex::new(Vec::new()),
    };
    let outcome = stop_port(&occupants, 8000).await;
    assert_eq!(outcome.exit_code(), ExitCode::FAILURE);
}

#[tokio::test]
async fn test_stop_fails_when_no_signal_lands() {
    let occupants = FakeOccupants {
        pids: Ok(vec![1]),
        refuse: vec![1],
        terminated: Mutex::new(Vec::new()),
    };
    let outcome = stop_port(&occupants, 8000).await;
    assert_eq!(outcome.found, vec![1]);
    assert!(outcome.terminated.is_empty());
    assert_eq!(outcome.exit_code(), ExitCode::FAILURE);
}
