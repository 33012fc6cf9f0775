//! End-to-end run flow with scripted tools
//!
//! Configuration is discovered from a real `.siteqa/config.toml`; the tools
//! and the server are replaced by the `test-utils` fakes, so these tests
//! need neither the audit tools nor a network.

use std::time::Duration;

use siteqa::{CliArgs, Config, ExitCode, Orchestrator, RunOptions, Stage};
use siteqa_engine::stages::ACCESSIBILITY_REPORT;
use siteqa_engine::testing::{
    FakeLaunch, FakeLauncher, ScriptedRunner, StaticLocator, ToolScript, write_site_fixture,
};
use serial_test::serial;
use siteqa_utils::types::ConfigSource;
use tempfile::TempDir;

fn project(config_toml: &str) -> (TempDir, Config) {
    let dir = TempDir::new().unwrap();
    write_site_fixture(dir.path());
    std::fs::create_dir_all(dir.path().join(".siteqa")).unwrap();
    std::fs::write(dir.path().join(".siteqa/config.toml"), config_toml).unwrap();

    let nested = dir.path().join("assets/data");
    let config = Config::discover_from(&nested, &CliArgs::default()).unwrap();
    (dir, config)
}

#[tokio::test]
async fn test_tools_receive_configs_for_audit_port() {
    let (dir, config) = project("[server]\nport = 8100\n");
    assert_eq!(config.root, dir.path());

    let runner = ScriptedRunner::passing();
    let launcher = FakeLauncher::new(FakeLaunch::Ready);
    let report = Orchestrator::new(&config, &runner, &StaticLocator::all(), &launcher)
        .run(RunOptions::default(), std::future::pending())
        .await;

    assert_eq!(report.exit_code(), ExitCode::SUCCESS);

    let calls = runner.calls();
    for call in &calls {
        assert_eq!(call.cwd.as_deref(), Some(dir.path()), "{} cwd", call.program);
    }

    let pa11y = calls.iter().find(|c| c.program == "pa11y-ci").unwrap();
    let snapshot = pa11y.config_snapshot.as_deref().unwrap();
    assert!(snapshot.contains("http://localhost:8100/index.html"));
    assert!(!snapshot.contains("localhost:8000"));
    assert!(pa11y.args.ends_with(&["--reporter".to_string(), "json".to_string()]));

    let lhci = calls.iter().find(|c| c.program == "lhci").unwrap();
    assert_eq!(lhci.args[0], "autorun");
    assert!(lhci.args[1].starts_with("--config="));
    assert!(lhci.config_snapshot.as_deref().unwrap().contains("http://localhost:8100/"));

    // Derived configs are gone, originals untouched.
    assert!(!dir.path().join("test/pa11yci_temp.json").exists());
    assert!(!dir.path().join("test/lighthouserc_temp.json").exists());
    let original = std::fs::read_to_string(dir.path().join("test/pa11yci.json")).unwrap();
    assert!(original.contains("localhost:8000"));
}

#[tokio::test]
async fn test_accessibility_report_lands_in_report_dir() {
    let (dir, config) = project("");
    let runner = ScriptedRunner::passing().with(
        "pa11y-ci",
        ToolScript::ExitWithStdout(0, r#"{"total": 2, "errors": 0}"#.to_string()),
    );
    let launcher = FakeLauncher::new(FakeLaunch::Ready);

    Orchestrator::new(&config, &runner, &StaticLocator::all(), &launcher)
        .run(RunOptions::default(), std::future::pending())
        .await;

    let report = dir.path().join(".pa11yci").join(ACCESSIBILITY_REPORT);
    assert_eq!(
        std::fs::read_to_string(report).unwrap(),
        r#"{"total": 2, "errors": 0}"#
    );
    assert!(dir.path().join(".lycheeci").is_dir());
}

#[tokio::test]
async fn test_allow_failure_from_config_file() {
    let (dir, config) = project("[audits.performance]\nallow_failure = true\n");
    assert_eq!(
        config.source_of("audits.performance.allow_failure"),
        ConfigSource::ConfigFile(dir.path().join(".siteqa/config.toml"))
    );

    let runner = ScriptedRunner::passing().with("lhci", ToolScript::Exit(1));
    let launcher = FakeLauncher::new(FakeLaunch::Ready);
    let report = Orchestrator::new(&config, &runner, &StaticLocator::all(), &launcher)
        .run(RunOptions::default(), std::future::pending())
        .await;

    assert!(report.summary.get(Stage::Performance).unwrap().passed());
    assert_eq!(report.exit_code(), ExitCode::SUCCESS);
}

#[tokio::test]
async fn test_allow_failure_never_covers_timeouts() {
    let (_dir, config) = project("[audits.performance]\nallow_failure = true\n");
    let runner = ScriptedRunner::passing().with("lhci", ToolScript::Timeout);
    let launcher = FakeLauncher::new(FakeLaunch::Ready);

    let report = Orchestrator::new(&config, &runner, &StaticLocator::all(), &launcher)
        .run(RunOptions::default(), std::future::pending())
        .await;

    assert!(!report.summary.get(Stage::Performance).unwrap().passed());
    assert_eq!(report.exit_code(), ExitCode::FAILURE);
}

#[tokio::test]
async fn test_every_failing_stage_is_reported() {
    let (_dir, config) = project("");
    let runner = ScriptedRunner::passing()
        .with("jq", ToolScript::Exit(5))
        .with("python3", ToolScript::SpawnFailure)
        .with("lychee", ToolScript::Exit(2))
        .with("pa11y-ci", ToolScript::Exit(2))
        .with("lhci", ToolScript::Exit(1));
    let launcher = FakeLauncher::new(FakeLaunch::Ready);

    let report = Orchestrator::new(&config, &runner, &StaticLocator::all(), &launcher)
        .run(RunOptions::default(), std::future::pending())
        .await;

    let failed: Vec<Stage> = report
        .summary
        .results()
        .iter()
        .filter(|r| !r.passed())
        .map(|r| r.stage())
        .collect();
    assert_eq!(
        failed,
        vec![
            Stage::JsonValidation,
            Stage::ResumeGeneration,
            Stage::LinkValidation,
            Stage::Accessibility,
            Stage::Performance,
        ]
    );
    assert!(report.summary.get(Stage::LocalServer).unwrap().passed());
    assert_eq!(launcher.shutdowns(), 1);
    assert_eq!(report.exit_code(), ExitCode::FAILURE);
}

#[tokio::test]
async fn test_interrupt_before_server_skips_teardown() {
    let (_dir, config) = project("");
    let runner = ScriptedRunner::passing().with("python3", ToolScript::Hang);
    let launcher = FakeLauncher::new(FakeLaunch::Ready);

    let report = Orchestrator::new(&config, &runner, &StaticLocator::all(), &launcher)
        .run(
            RunOptions::default(),
            tokio::time::sleep(Duration::from_millis(100)),
        )
        .await;

    assert_eq!(report.exit_code(), ExitCode::INTERRUPTED);
    assert_eq!(launcher.launches(), 0);
    assert!(report.shutdown.is_none());
}

#[test]
fn test_cli_port_beats_config_file() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".siteqa")).unwrap();
    std::fs::write(
        dir.path().join(".siteqa/config.toml"),
        "[server]\nport = 8100\n",
    )
    .unwrap();

    let cli = CliArgs {
        port: Some(8200),
        ..CliArgs::default()
    };
    let config = Config::discover_from(dir.path(), &cli).unwrap();

    assert_eq!(config.server.port, 8200);
    assert_eq!(config.source_of("server.port"), ConfigSource::Cli);
    assert_eq!(config.source_of("tools.timeout_secs"), ConfigSource::Defaults);
}

/// `Config::discover` reads the process working directory.
#[test]
#[serial]
fn test_discover_starts_from_working_directory() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".git")).unwrap();
    std::fs::create_dir_all(dir.path().join(".siteqa")).unwrap();
    std::fs::write(
        dir.path().join(".siteqa/config.toml"),
        "[tools]\ntimeout_secs = 45\n",
    )
    .unwrap();
    let nested = dir.path().join("_scripts");
    std::fs::create_dir_all(&nested).unwrap();

    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(&nested).unwrap();
    let discovered = Config::discover(&CliArgs::default());
    std::env::set_current_dir(previous).unwrap();

    let config = discovered.unwrap();
    assert_eq!(config.tools.timeout_secs, 45);
    assert_eq!(
        config.root.canonicalize().unwrap(),
        dir.path().canonicalize().unwrap()
    );
}
