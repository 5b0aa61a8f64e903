// tests/providers.rs

use std::time::Duration;

use tlsharness::errors::HarnessError;
use tlsharness::exec::Marker;
use tlsharness::provider::{
    BoringSsl, CommandProvider, OpenSsl, ProviderOptions, S2n, SERVER_READY_DELAY,
    provider_by_name,
};
use tlsharness::types::{Ciphersuite, Mode, Protocol};

fn args(provider: &dyn CommandProvider, options: &ProviderOptions) -> Vec<String> {
    provider.cmd_line(options).unwrap().as_slice().to_vec()
}

#[test]
fn s2n_client_defaults_disable_tickets() {
    let options = ProviderOptions::new(Mode::Client, "localhost", 8000);
    assert_eq!(args(&S2n, &options), ["s2nc", "-T", "localhost", "8000"]);
}

#[test]
fn s2n_client_with_cipher_curve_and_tls13() {
    let mut options = ProviderOptions::new(Mode::Client, "127.0.0.1", 8123);
    options.cipher = Some(Ciphersuite::Chacha20Poly1305Sha256);
    options.curve = Some("X25519".to_string());
    options.use_session_ticket = true;
    options.insecure = true;
    options.protocol = Some(Protocol::Tls13);

    assert_eq!(
        args(&S2n, &options),
        [
            "s2nc",
            "-c",
            "default_tls13",
            "-k",
            "X25519",
            "--insecure",
            "--tls13",
            "127.0.0.1",
            "8123"
        ]
    );
}

#[test]
fn s2n_server_passes_key_and_cert() {
    let mut options = ProviderOptions::new(Mode::Server, "localhost", 8001);
    options.key = Some("server.key".to_string());
    options.cert = Some("server.pem".to_string());
    options.extra_flags = vec!["--parallelize".to_string()];

    assert_eq!(
        args(&S2n, &options),
        [
            "s2nd",
            "-n",
            "--key",
            "server.key",
            "--cert",
            "server.pem",
            "--parallelize",
            "localhost",
            "8001"
        ]
    );
}

#[test]
fn openssl_client_and_server_command_lines() {
    let mut options = ProviderOptions::new(Mode::Client, "localhost", 8002);
    options.protocol = Some(Protocol::Tls13);
    options.cipher = Some(Ciphersuite::Aes256GcmSha384);
    assert_eq!(
        args(&OpenSsl, &options),
        [
            "openssl",
            "s_client",
            "-connect",
            "localhost:8002",
            "-tls1_3",
            "-ciphersuites",
            "TLS_AES_256_GCM_SHA384"
        ]
    );

    let mut server = options.peer();
    server.cert = Some("server.pem".to_string());
    server.key = Some("server.key".to_string());
    server.curve = Some("P-256".to_string());
    assert_eq!(
        args(&OpenSsl, &server),
        [
            "openssl",
            "s_server",
            "-accept",
            "localhost:8002",
            "-cert",
            "server.pem",
            "-key",
            "server.key",
            "-tls1_3",
            "-ciphersuites",
            "TLS_AES_256_GCM_SHA384",
            "-curves",
            "P-256"
        ]
    );
}

#[test]
fn boringssl_is_client_only_and_limits_ciphers() {
    let mut options = ProviderOptions::new(Mode::Client, "localhost", 8003);
    options.cipher = Some(Ciphersuite::Chacha20Poly1305Sha256);
    assert_eq!(
        args(&BoringSsl, &options),
        [
            "bssl",
            "s_client",
            "-connect",
            "localhost:8003",
            "-cipher",
            "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256"
        ]
    );

    options.cipher = Some(Ciphersuite::Aes128GcmSha256);
    assert!(matches!(
        BoringSsl.cmd_line(&options),
        Err(HarnessError::Unsupported(_))
    ));

    let server = ProviderOptions::new(Mode::Server, "localhost", 8003);
    match BoringSsl.cmd_line(&server) {
        Err(HarnessError::Unsupported(msg)) => assert!(msg.contains("server mode")),
        other => panic!("expected Unsupported, got {other:?}"),
    }
}

#[test]
fn peer_swaps_mode_and_drops_payload() {
    let mut options = ProviderOptions::new(Mode::Client, "localhost", 8004);
    options.data_to_send = Some(b"hello".to_vec());
    options.extra_flags = vec!["-v".to_string()];
    options.cipher = Some(Ciphersuite::Aes128GcmSha256);

    let peer = options.peer();
    assert_eq!(peer.mode, Mode::Server);
    assert_eq!(peer.port, 8004);
    assert_eq!(peer.cipher, Some(Ciphersuite::Aes128GcmSha256));
    assert_eq!(peer.data_to_send, None);
    assert!(peer.extra_flags.is_empty());
    assert_eq!(peer.peer().mode, Mode::Client);
}

#[test]
fn client_specs_gate_payload_on_handshake_marker() {
    let mut options = ProviderOptions::new(Mode::Client, "localhost", 8005);
    options.data_to_send = Some(b"ping".to_vec());

    let spec = S2n.process_spec(&options, Duration::from_secs(5)).unwrap();
    assert_eq!(spec.exchange.payload.as_deref(), Some(&b"ping"[..]));
    assert_eq!(spec.exchange.marker, Some(Marker::from("Cipher negotiated")));
    assert_eq!(spec.ready_delay, Duration::ZERO);
    assert_eq!(spec.timeout, Duration::from_secs(5));

    let spec = OpenSsl.process_spec(&options, Duration::from_secs(5)).unwrap();
    assert_eq!(spec.exchange.marker, Some(Marker::from("Verify return code")));

    // Without a payload there is nothing to gate.
    options.data_to_send = None;
    let spec = S2n.process_spec(&options, Duration::from_secs(5)).unwrap();
    assert_eq!(spec.exchange.payload, None);
    assert_eq!(spec.exchange.marker, None);
}

#[test]
fn server_specs_wait_before_reporting_ready() {
    let options = ProviderOptions::new(Mode::Server, "localhost", 8006);
    for provider in [&S2n as &dyn CommandProvider, &OpenSsl] {
        let spec = provider.process_spec(&options, Duration::from_secs(5)).unwrap();
        assert_eq!(spec.ready_delay, SERVER_READY_DELAY, "{}", provider.name());
        assert_eq!(spec.exchange.marker, None);
    }
}

#[test]
fn providers_are_found_by_name() {
    assert_eq!(provider_by_name("s2n").unwrap().name(), "s2n");
    assert_eq!(provider_by_name(" OpenSSL ").unwrap().name(), "openssl");
    assert_eq!(provider_by_name("boringssl").unwrap().name(), "bssl");
    assert_eq!(provider_by_name("bssl").unwrap().name(), "bssl");
    assert!(provider_by_name("gnutls").is_none());
}
