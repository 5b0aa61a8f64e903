// tests/launcher.rs
mod common;
use crate::common::{ScriptProvider, init_tracing, with_timeout};

use std::error::Error;
use std::time::Duration;

use tokio::time::Instant;

use tlsharness::exec::ProcessState;
use tlsharness::launcher::Launcher;
use tlsharness::ports::PortAllocator;
use tlsharness::provider::ProviderOptions;
use tlsharness::types::Mode;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn launch_substitutes_options_and_collects_results() -> TestResult {
    init_tracing();

    let provider = ScriptProvider::new("echo client {host}:{port}", "echo server {host}:{port}");
    let ports = PortAllocator::new(9400..9410);
    let port = ports.next_port()?;

    let mut launcher = Launcher::new();
    let server_opts = ProviderOptions::new(Mode::Server, "localhost", port);
    let server = launcher
        .launch(&provider, &server_opts, Duration::from_secs(5))
        .await?;
    let client = launcher
        .launch(&provider, &server_opts.peer(), Duration::from_secs(5))
        .await?;

    let server_record = with_timeout(server.get_results()).await?;
    let client_record = with_timeout(client.get_results()).await?;
    assert_eq!(server_record.stdout, b"server localhost:9400\n");
    assert_eq!(client_record.stdout, b"client localhost:9400\n");

    assert_eq!(launcher.processes().len(), 2);
    launcher.join_all().await?;
    assert!(launcher.processes().is_empty());
    Ok(())
}

#[tokio::test]
async fn launch_returns_only_after_server_grace_period() -> TestResult {
    init_tracing();

    let provider = ScriptProvider::new("true", "sleep 1")
        .with_server_ready_delay(Duration::from_millis(300));

    let mut launcher = Launcher::new();
    let started = Instant::now();
    let server = launcher
        .launch(
            &provider,
            &ProviderOptions::new(Mode::Server, "localhost", 9411),
            Duration::from_secs(5),
        )
        .await?;

    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(server.state(), ProcessState::Ready);

    launcher.join_all().await?;
    assert_eq!(server.state(), ProcessState::Completed);
    Ok(())
}

#[tokio::test]
async fn client_payload_waits_for_provider_marker() -> TestResult {
    init_tracing();

    // The client echoes stdin in the background and announces the
    // handshake late; the payload must land after the announcement.
    let provider = ScriptProvider::new(
        "exec 3<&0; (cat <&3) & sleep 0.3; echo 'Cipher negotiated'; wait",
        "true",
    )
    .with_client_marker("Cipher negotiated");

    let mut options = ProviderOptions::new(Mode::Client, "localhost", 9412);
    options.data_to_send = Some(b"application data".to_vec());

    let mut launcher = Launcher::new();
    let client = launcher
        .launch(&provider, &options, Duration::from_secs(5))
        .await?;

    let record = with_timeout(client.get_results()).await?;
    assert!(record.is_success(), "{record}");
    assert_eq!(record.stdout, b"Cipher negotiated\napplication data");
    launcher.join_all().await?;
    Ok(())
}

#[tokio::test]
async fn spawn_failure_surfaces_from_join_all_but_not_from_launch() -> TestResult {
    init_tracing();

    let mut launcher = Launcher::new();
    let ok = launcher
        .launch_spec(tlsharness::exec::ProcessSpec::new(
            tlsharness::exec::CommandLine::new(["true"])?,
            Duration::from_secs(5),
        ))
        .await?;
    let missing = launcher
        .launch_spec(tlsharness::exec::ProcessSpec::new(
            tlsharness::exec::CommandLine::new(["/nonexistent/tlsharness-missing"])?,
            Duration::from_secs(5),
        ))
        .await?;

    assert!(with_timeout(missing.get_results()).await?.failed_to_start());
    assert!(with_timeout(ok.get_results()).await?.is_success());

    let joined = launcher.join_all().await;
    assert!(matches!(
        joined,
        Err(tlsharness::errors::HarnessError::Spawn { .. })
    ));
    Ok(())
}

#[test]
fn port_allocator_hands_out_unique_increasing_ports_until_exhausted() {
    let ports = PortAllocator::new(9500..9503);
    assert_eq!(ports.next_port().unwrap(), 9500);
    assert_eq!(ports.next_port().unwrap(), 9501);
    assert_eq!(ports.next_port().unwrap(), 9502);
    match ports.next_port() {
        Err(tlsharness::errors::HarnessError::PortsExhausted { start, end }) => {
            assert_eq!((start, end), (9500, 9503));
        }
        other => panic!("expected PortsExhausted, got {other:?}"),
    }
    assert_eq!(PortAllocator::default().range(), &(8000..9000));
}

#[test]
fn port_allocator_is_shared_safely_between_threads() {
    use std::collections::HashSet;
    use std::sync::Arc;

    let ports = Arc::new(PortAllocator::new(10000..10400));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ports = Arc::clone(&ports);
            std::thread::spawn(move || {
                (0..100)
                    .map(|_| ports.next_port().unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for port in handle.join().unwrap() {
            assert!(seen.insert(port), "port {port} handed out twice");
        }
    }
    assert_eq!(seen.len(), 400);
    assert!(ports.next_port().is_err());
}
