// tests/build_report.rs

mod common;
use crate::common::*;

use std::error::Error;
use std::sync::Arc;

use buck_rpc::errors::BuckError;
use buck_rpc::orchestrator::BuildOptions;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn successful_build_returns_report_and_removes_temp_file() -> TestResult {
    init_tracing();

    let report = ReportBuilder::new().built("//app:app", "buck-out/gen/app").build();
    let engine = Arc::new(FakeEngine::new().on("build", Scripted::default().with_report(report)));
    let orch = orchestrator(engine.clone(), 4);

    let result = orch
        .build(&root(), &targets(&["//app:app"]), &BuildOptions::default())
        .await?;

    assert!(result.is_success());
    assert!(result.results["//app:app"].succeeded());
    assert_eq!(
        result.results["//app:app"].output.as_deref(),
        Some("buck-out/gen/app")
    );

    let calls = engine.calls();
    assert_eq!(calls.len(), 1);
    let path = report_path(&calls[0]);
    assert!(!path.exists(), "report file should be deleted: {}", path.display());
    Ok(())
}

#[tokio::test]
async fn failed_build_with_report_returns_report() -> TestResult {
    init_tracing();

    let report = ReportBuilder::new()
        .built("//app:app", "buck-out/gen/app")
        .failed("//lib:lib", "compile error")
        .build();
    let engine = Arc::new(
        FakeEngine::new().on("build", Scripted::failing(1, "BUILD FAILED").with_report(report)),
    );
    let orch = orchestrator(engine.clone(), 4);

    let result = orch
        .build(&root(), &targets(&["//app:app", "//lib:lib"]), &BuildOptions::default())
        .await?;

    assert!(!result.is_success());
    assert_eq!(result.failed_targets(), vec!["//lib:lib"]);
    assert_eq!(result.failures["//lib:lib"], "compile error");
    assert!(!report_path(&engine.calls()[0]).exists());
    Ok(())
}

#[tokio::test]
async fn report_without_top_level_flag_is_still_returned() -> TestResult {
    init_tracing();

    let report = r#"{"results": {"//app:app": {"success": true}, "//lib:lib": {"success": "FAIL"}}}"#;
    let engine = Arc::new(
        FakeEngine::new().on("build", Scripted::failing(1, "BUILD FAILED").with_report(report)),
    );
    let orch = orchestrator(engine.clone(), 4);

    let result = orch
        .build(&root(), &targets(&["//app:app", "//lib:lib"]), &BuildOptions::default())
        .await?;

    assert_eq!(result.success, None);
    assert!(!result.is_success());
    assert!(result.results["//app:app"].succeeded());
    assert_eq!(result.failed_targets(), vec!["//lib:lib"]);
    assert!(!report_path(&engine.calls()[0]).exists());
    Ok(())
}

#[tokio::test]
async fn failed_build_without_report_returns_command_failure() {
    init_tracing();

    let engine = Arc::new(
        FakeEngine::new().on("build", Scripted::failing(1, "No build file at //nope")),
    );
    let orch = orchestrator(engine.clone(), 4);

    let err = orch
        .build(&root(), &targets(&["//nope:nope"]), &BuildOptions::default())
        .await
        .unwrap_err();

    match err {
        BuckError::CommandFailed {
            stderr, exit_code, ..
        } => {
            assert!(stderr.contains("No build file"));
            assert_eq!(exit_code, Some(1));
        }
        other => panic!("expected CommandFailed, got {:?}", other),
    }
    assert!(!report_path(&engine.calls()[0]).exists());
}

#[tokio::test]
async fn malformed_report_is_a_parse_error() {
    init_tracing();

    let engine =
        Arc::new(FakeEngine::new().on("build", Scripted::default().with_report("not json")));
    let orch = orchestrator(engine.clone(), 4);

    let err = orch
        .build(&root(), &targets(&["//app:app"]), &BuildOptions::default())
        .await
        .unwrap_err();

    match err {
        BuckError::ReportParse { raw, .. } => assert_eq!(raw, "not json"),
        other => panic!("expected ReportParse, got {:?}", other),
    }
    assert!(!report_path(&engine.calls()[0]).exists());
}

#[tokio::test]
async fn install_passes_device_and_launch_flags() -> TestResult {
    init_tracing();

    let report = ReportBuilder::new().built("//app:app", "buck-out/gen/app.ipa").build();
    let engine =
        Arc::new(FakeEngine::new().on("install", Scripted::default().with_report(report)));
    let orch = orchestrator(engine.clone(), 4);

    orch.install(&root(), &targets(&["//app:app"]), Some("SIM-1".into()), true, true)
        .await?;

    let call = &engine.calls()[0];
    let path = report_path(call).display().to_string();
    assert_eq!(
        call.invocation.args,
        vec![
            "install",
            "//app:app",
            "--keep-going",
            "--build-report",
            path.as_str(),
            "--udid",
            "SIM-1",
            "--run",
            "--wait-for-debugger",
        ]
    );
    assert_eq!(call.invocation.cwd, root().path());
    assert_eq!(call.invocation.program, std::path::PathBuf::from("buck"));
    Ok(())
}

#[tokio::test]
async fn test_runs_test_subcommand_with_extra_args() -> TestResult {
    init_tracing();

    let report = ReportBuilder::new().built("//lib:tests", "").build();
    let engine = Arc::new(FakeEngine::new().on("test", Scripted::default().with_report(report)));
    let orch = orchestrator(engine.clone(), 4);

    orch.test(&root(), &targets(&["//lib:tests"]), vec!["--all".into()])
        .await?;

    let args = &engine.args()[0];
    assert_eq!(args[0], "test");
    assert_eq!(args.last().map(String::as_str), Some("--all"));
    assert!(!args.iter().any(|a| a == "--udid"));
    Ok(())
}

#[tokio::test]
async fn per_call_env_and_timeout_reach_the_engine() -> TestResult {
    use buck_rpc::exec::RunOptions;
    use std::collections::BTreeMap;
    use std::time::Duration;

    init_tracing();

    let report = ReportBuilder::new().build();
    let engine = Arc::new(FakeEngine::new().on("build", Scripted::default().with_report(report)));
    let orch = orchestrator(engine.clone(), 4).with_run_options(RunOptions {
        timeout: Some(Duration::from_secs(30)),
        env: BTreeMap::from([("BUCK_EXTRA".to_string(), "1".to_string())]),
    });

    orch.build(&root(), &targets(&["//app:app"]), &BuildOptions::default())
        .await?;

    let invocation = &engine.calls()[0].invocation;
    assert_eq!(invocation.env.get("BUCK_EXTRA").map(String::as_str), Some("1"));
    assert_eq!(invocation.timeout, Some(Duration::from_secs(30)));
    Ok(())
}

#[tokio::test]
async fn slow_build_times_out() {
    use buck_rpc::exec::RunOptions;
    use std::time::Duration;

    init_tracing();

    let engine = Arc::new(
        FakeEngine::new().on("build", Scripted::default().with_delay(Duration::from_secs(5))),
    );
    let orch = orchestrator(engine, 4).with_run_options(RunOptions {
        timeout: Some(Duration::from_millis(50)),
        ..Default::default()
    });

    let err = with_timeout(orch.build(&root(), &targets(&["//app:app"]), &BuildOptions::default()))
        .await
        .unwrap_err();
    assert!(matches!(err, BuckError::Timeout { .. }), "got {:?}", err);
}
