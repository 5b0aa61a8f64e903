// tests/scenario_runtime.rs
mod common;
use crate::common::builders::{ProcessConfigBuilder, ScenarioBuilder};
use crate::common::{init_tracing, with_timeout};

use std::collections::BTreeMap;
use std::time::Duration;

use tlsharness::config::ExpectConfig;
use tlsharness::engine::{build_spec, check_expectations, run_scenario};
use tlsharness::exec::{Failure, Marker, ResultRecord};
use tlsharness::ports::PortAllocator;
use tlsharness::types::Mode;

#[tokio::test]
async fn test_echo_pair_passes_and_reports_in_launch_order() {
    init_tracing();

    // The "server" records the port it was given; the "client" waits for
    // its own marker before its input is sent and echoes it back.
    let cfg = ScenarioBuilder::new()
        .with_timeout(Duration::from_secs(5))
        .with_process(
            "server",
            ProcessConfigBuilder::script("echo listening on {port}")
                .expect_stdout("listening on 9600")
                .build(),
        )
        .with_process(
            "client",
            ProcessConfigBuilder::script("echo connected; cat")
                .after("server")
                .input("ping")
                .ready_to_send("connected")
                .expect(ExpectConfig {
                    stdout_contains_input: true,
                    stdout_matches: Some(r"^connected\nping$".to_string()),
                    ..ExpectConfig::default()
                })
                .build(),
        )
        .build();

    let ports = PortAllocator::new(9600..9610);
    let report = with_timeout(run_scenario(&cfg, &ports)).await.unwrap();

    assert!(report.passed(), "{report}");
    assert_eq!(report.port, 9600);
    let names: Vec<_> = report.processes.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["server", "client"]);

    let client = report.process("client").unwrap();
    assert_eq!(client.record.as_ref().unwrap().stdout, b"connected\nping");
    assert!(report.to_string().contains("scenario passed"));
}

#[tokio::test]
async fn test_failed_expectations_are_reported_not_raised() {
    init_tracing();

    let cfg = ScenarioBuilder::new()
        .with_process(
            "flaky",
            ProcessConfigBuilder::script("echo nope; exit 4")
                .expect_stdout("handshake complete")
                .build(),
        )
        .build();

    let report = with_timeout(run_scenario(&cfg, &PortAllocator::new(9611..9612)))
        .await
        .unwrap();

    assert!(!report.passed());
    let flaky = report.process("flaky").unwrap();
    assert_eq!(flaky.violations.len(), 2, "{:?}", flaky.violations);
    assert!(flaky.violations.iter().any(|v| v.contains("exit code Some(4)")));
    assert!(flaky.violations.iter().any(|v| v.contains("handshake complete")));

    let text = report.to_string();
    assert!(text.contains("[FAIL] flaky"));
    assert!(text.contains("scenario failed"));
}

#[tokio::test]
async fn test_expected_timeout_passes_and_missing_binary_fails() {
    init_tracing();

    let mut missing = ProcessConfigBuilder::script("unused").build();
    missing.cmd = Some(vec!["/nonexistent/tlsharness-missing".to_string()]);

    let cfg = ScenarioBuilder::new()
        .with_process(
            "hangs",
            ProcessConfigBuilder::script("exec sleep 30")
                .timeout(Duration::from_millis(300))
                .expect_timeout()
                .build(),
        )
        .with_process("missing", missing)
        .build();

    let report = with_timeout(run_scenario(&cfg, &PortAllocator::new(9612..9613)))
        .await
        .unwrap();

    let hangs = report.process("hangs").unwrap();
    assert!(hangs.passed(), "{:?}", hangs.violations);
    assert!(hangs.record.as_ref().unwrap().timed_out());

    let missing = report.process("missing").unwrap();
    assert!(!missing.passed());
    assert!(missing.violations[0].contains("never started"));
    assert!(!report.passed());
}

#[tokio::test]
async fn test_binary_hex_input_round_trips_through_cat() {
    init_tracing();

    let cfg = ScenarioBuilder::new()
        .with_process(
            "echo",
            ProcessConfigBuilder::script("cat")
                .input_hex("00ff7f80")
                .expect(ExpectConfig {
                    stdout_contains_input: true,
                    ..ExpectConfig::default()
                })
                .build(),
        )
        .build();

    let report = with_timeout(run_scenario(&cfg, &PortAllocator::new(9614..9615)))
        .await
        .unwrap();

    assert!(report.passed(), "{report}");
    let echo = report.process("echo").unwrap();
    assert_eq!(echo.record.as_ref().unwrap().stdout, [0x00u8, 0xff, 0x7f, 0x80]);
}

#[tokio::test]
async fn test_crashed_process_reports_its_signal() {
    init_tracing();

    let cfg = ScenarioBuilder::new()
        .with_process("crash", ProcessConfigBuilder::script("kill -ABRT $$").build())
        .build();

    let report = with_timeout(run_scenario(&cfg, &PortAllocator::new(9615..9616)))
        .await
        .unwrap();

    assert!(!report.passed());
    let crash = report.process("crash").unwrap();
    assert!(crash.violations.iter().any(|v| v.contains("exit code Some(-6)")));
    assert!(report.to_string().contains("killed by signal 6"), "{report}");
}

#[tokio::test]
async fn test_unsupported_provider_aborts_after_joining_started_processes() {
    init_tracing();

    // bssl has no server mode; that only surfaces when the command line
    // is built, after `first` is already running.
    let cfg = ScenarioBuilder::new()
        .with_process("first", ProcessConfigBuilder::script("sleep 0.2").build())
        .with_process(
            "server",
            ProcessConfigBuilder::provider("bssl", Mode::Server)
                .after("first")
                .build(),
        )
        .build();

    let err = with_timeout(run_scenario(&cfg, &PortAllocator::new(9616..9617)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        tlsharness::errors::HarnessError::Unsupported(_)
    ));
}

#[tokio::test]
async fn test_exhausted_ports_abort_the_scenario() {
    init_tracing();

    let cfg = ScenarioBuilder::new()
        .with_process("a", ProcessConfigBuilder::script("true").build())
        .build();
    let ports = PortAllocator::new(9613..9614);
    ports.next_port().unwrap();

    let err = run_scenario(&cfg, &ports).await.unwrap_err();
    assert!(matches!(
        err,
        tlsharness::errors::HarnessError::PortsExhausted { .. }
    ));
}

#[test]
fn test_build_spec_for_provider_and_cmd_processes() {
    let cfg = ScenarioBuilder::new()
        .with_timeout(Duration::from_secs(7))
        .with_process(
            "client",
            ProcessConfigBuilder::provider("openssl", Mode::Client)
                .input("hello")
                .build(),
        )
        .with_process(
            "raw",
            ProcessConfigBuilder::script("echo {host}:{port}")
                .ready_delay(Duration::from_millis(40))
                .ready_to_send("go")
                .timeout(Duration::from_secs(1))
                .build(),
        )
        .build();

    let client = build_spec("client", &cfg.process["client"], &cfg.config, 8443).unwrap();
    assert_eq!(
        client.cmd_line.to_string(),
        "openssl s_client -connect localhost:8443"
    );
    assert_eq!(client.timeout, Duration::from_secs(7));
    assert_eq!(client.exchange.payload.as_deref(), Some(&b"hello"[..]));
    assert_eq!(client.exchange.marker, Some(Marker::from("Verify return code")));

    let raw = build_spec("raw", &cfg.process["raw"], &cfg.config, 8443).unwrap();
    assert_eq!(raw.cmd_line.as_slice()[2], "echo localhost:8443");
    assert_eq!(raw.timeout, Duration::from_secs(1));
    assert_eq!(raw.ready_delay, Duration::from_millis(40));
    assert_eq!(raw.exchange.payload, None);
    assert_eq!(raw.exchange.marker, Some(Marker::from("go")));
}

#[test]
fn test_check_expectations_counts_and_stderr() {
    let record = ResultRecord {
        stdout: b"hello hello world".to_vec(),
        stderr: b"warning: self-signed".to_vec(),
        exit_code: Some(0),
        failure: None,
    };

    let mut expect = ExpectConfig {
        stderr_contains: vec!["self-signed".to_string()],
        stdout_count: BTreeMap::from([("hello".to_string(), 2), ("world".to_string(), 1)]),
        ..ExpectConfig::default()
    };
    assert!(check_expectations(&expect, None, &record).is_empty());

    expect.stdout_count.insert("hello".to_string(), 3);
    expect.timed_out = true;
    let violations = check_expectations(&expect, None, &record);
    assert_eq!(violations.len(), 2, "{violations:?}");
    assert!(violations.iter().any(|v| v.contains("expected the process to time out")));
    assert!(violations.iter().any(|v| v.contains("2 time(s), expected 3")));
}

#[test]
fn test_check_expectations_short_circuits_on_spawn_failure() {
    let record = ResultRecord::never_started(Failure::Spawn {
        kind: std::io::ErrorKind::NotFound,
        message: "No such file or directory".to_string(),
    });
    let expect = ExpectConfig {
        stdout_contains: vec!["anything".to_string()],
        ..ExpectConfig::default()
    };

    let violations = check_expectations(&expect, None, &record);
    assert_eq!(violations.len(), 1);
    assert!(violations[0].contains("never started"));
}
