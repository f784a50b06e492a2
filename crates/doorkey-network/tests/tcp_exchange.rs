//! Integration tests for the network clients over real TCP
//!
//! A local listener plays the server. The clients are ticked from the test
//! task with short sleeps in between, which is where the tokio reactor makes
//! progress, the same way the terminal loop drives them.

use std::net::SocketAddr;
use std::time::Duration;

use doorkey_core::{TokenAddress, key_hash};
use doorkey_network::{
    ReportClient, ReportOutcome, ReportSecrets, RevocationClient, RevocationEvent, ServerConfig,
    TcpTransport, TransportError,
};
use doorkey_storage::{CredentialRepository, CredentialStore, MemoryBackend};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const SECRET: &[u8] = b"some very long sentence";
const TICK: Duration = Duration::from_millis(5);
const MAX_TICKS: usize = 400;

fn addr(n: u8) -> TokenAddress {
    TokenAddress::with_checksum([0x01, n, 0, 0, 0, 0, n])
}

/// Read one request head and return it as text.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut request = Vec::new();
    let mut buf = [0u8; 256];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }
    String::from_utf8(request).unwrap()
}

/// Serve `responses` to consecutive connections, forwarding each request.
///
/// Each response is written in two halves to exercise reassembly across reads.
async fn spawn_server(responses: Vec<Vec<u8>>) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for response in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let _ = tx.send(request);
            let (head, tail) = response.split_at(response.len() / 2);
            // Report clients hang up right after sending, so writes may fail.
            let _ = stream.write_all(head).await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = stream.write_all(tail).await;
        }
    });

    (addr, rx)
}

fn config(addr: SocketAddr) -> ServerConfig {
    ServerConfig::new(addr.to_string())
        .poll_interval_ticks(0)
        .step_timeout_ticks(100)
}

async fn run_poll(
    client: &mut RevocationClient<TcpTransport>,
    store: &mut CredentialStore<MemoryBackend>,
) -> RevocationEvent {
    client.poll_now();
    for _ in 0..MAX_TICKS {
        if let Some(event) = client.tick(store) {
            return event;
        }
        tokio::time::sleep(TICK).await;
    }
    panic!("poll cycle did not finish");
}

#[tokio::test]
async fn test_revocation_over_tcp() {
    let target = addr(2);
    let mut store = CredentialStore::open(MemoryBackend::new(90)).unwrap();
    store.add(&addr(1)).unwrap();
    store.add(&target).unwrap();

    let mut response = b"HTTP/1.0 200 OK\r\nContent-Type: application/octet-stream\r\n\r\nREV".to_vec();
    response.extend_from_slice(key_hash(SECRET, &target).as_bytes());
    let (server, mut requests) = spawn_server(vec![response]).await;

    let config = config(server);
    let transport = TcpTransport::new(config.socket_addr().unwrap());
    let mut client = RevocationClient::new(transport, &config, SECRET);

    match run_poll(&mut client, &mut store).await {
        RevocationEvent::Applied { address, slot } => {
            assert_eq!(address, target);
            assert_eq!(slot, 1);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    assert_eq!(
        requests.recv().await.unwrap(),
        "GET /revoked.php?action=gethash HTTP/1.0\r\n\r\n"
    );
    assert!(!store.check(&target).unwrap());
    assert!(store.check(&addr(1)).unwrap());
}

#[tokio::test]
async fn test_nothing_pending_over_tcp() {
    let mut store = CredentialStore::open(MemoryBackend::new(90)).unwrap();
    store.add(&addr(1)).unwrap();
    let before = store.backend().image().to_vec();

    let (server, _requests) = spawn_server(vec![b"HTTP/1.0 200 OK\r\n\r\nREV0".to_vec()]).await;
    let config = config(server);
    let transport = TcpTransport::new(config.socket_addr().unwrap());
    let mut client = RevocationClient::new(transport, &config, SECRET);

    assert!(matches!(
        run_poll(&mut client, &mut store).await,
        RevocationEvent::NothingPending
    ));
    assert_eq!(store.backend().image(), &before[..]);
}

#[tokio::test]
async fn test_refused_connection_ends_cycle() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = listener.local_addr().unwrap();
    drop(listener);

    let mut store = CredentialStore::open(MemoryBackend::new(90)).unwrap();
    let config = config(server).step_timeout_ticks(20);
    let transport = TcpTransport::new(config.socket_addr().unwrap());
    let mut client = RevocationClient::new(transport, &config, SECRET);

    assert!(matches!(
        run_poll(&mut client, &mut store).await,
        RevocationEvent::TransportFailure(
            TransportError::ConnectFailed(_) | TransportError::ConnectionTimeout(_)
        )
    ));
    assert!(!client.is_polling());
}

#[tokio::test]
async fn test_access_report_over_tcp() {
    let (server, mut requests) = spawn_server(vec![b"HTTP/1.0 200 OK\r\n\r\n".to_vec()]).await;
    let config = config(server);
    let transport = TcpTransport::new(config.socket_addr().unwrap());
    let secrets = ReportSecrets {
        access: SECRET.to_vec(),
        revocation: Vec::new(),
    };
    let mut client = ReportClient::new(transport, &config, secrets);

    let address: TokenAddress = "021cb801000000a2".parse().unwrap();
    client.queue_access(&address);

    let mut outcome = None;
    for _ in 0..MAX_TICKS {
        outcome = client.tick();
        if outcome.is_some() {
            break;
        }
        tokio::time::sleep(TICK).await;
    }
    assert!(matches!(outcome, Some(ReportOutcome::Sent(_))));

    let request = tokio::time::timeout(Duration::from_secs(2), requests.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        request,
        "GET /logkey.php?key=df21531f6cf6f7181a0225651508a2441ec9741f081bae8b964532355eb3fe6a HTTP/1.0\r\n\r\n"
    );
}
