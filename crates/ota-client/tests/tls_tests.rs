//! Certificate handling tests for the transport factory and bootstrap
//!
//! Certificate material is generated on the fly with rcgen.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ota_client::{
    build_http_client, BootstrapExchange, CertificatePaths, ClientIdentity, ErrorKind,
    HttpsClientConfig, OtaClientError, TimeoutsConfig, TrustPool,
};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio_rustls::rustls::server::WebPkiClientVerifier;
use tokio_rustls::rustls::{RootCertStore, ServerConfig};
use tokio_rustls::TlsAcceptor;

struct Material {
    _dir: TempDir,
    cert: PathBuf,
    key: PathBuf,
    server_cert: PathBuf,
    device_der: Vec<u8>,
    server: rcgen::CertifiedKey,
}

fn write_pem(dir: &Path, name: &str, pem: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, pem).unwrap();
    path
}

fn generate_material() -> Material {
    let dir = tempfile::tempdir().unwrap();

    let device = rcgen::generate_simple_self_signed(vec!["device-1".to_string()]).unwrap();
    let server = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let other = rcgen::generate_simple_self_signed(vec!["backup.local".to_string()]).unwrap();

    let cert = write_pem(dir.path(), "certfile", &device.cert.pem());
    let key = write_pem(dir.path(), "certkey", &device.key_pair.serialize_pem());
    let bundle = format!("{}{}", server.cert.pem(), other.cert.pem());
    let server_cert = write_pem(dir.path(), "servercert", &bundle);

    Material {
        _dir: dir,
        cert,
        key,
        server_cert,
        device_der: device.cert.der().to_vec(),
        server,
    }
}

fn paths(material: &Material) -> CertificatePaths {
    CertificatePaths {
        cert_file: material.cert.clone(),
        key_file: material.key.clone(),
        server_cert: material.server_cert.clone(),
    }
}

// =============================================================================
// Transport Factory
// =============================================================================

#[test]
fn test_trust_pool_loads_bundle() {
    let material = generate_material();

    let pool = TrustPool::from_pem_file(&material.server_cert).unwrap();
    assert_eq!(pool.len(), 2);
    assert!(!pool.is_empty());
    assert_eq!(pool.source(), material.server_cert.as_path());
}

#[test]
fn test_client_identity_loads() {
    let material = generate_material();

    let identity = ClientIdentity::from_pem_files(&material.cert, &material.key).unwrap();
    assert_eq!(identity.cert_file(), material.cert.as_path());
    assert_eq!(identity.key_file(), material.key.as_path());
}

#[test]
fn test_client_identity_without_key() {
    let material = generate_material();

    // A certificate is not a private key
    let err = ClientIdentity::from_pem_files(&material.cert, &material.server_cert).unwrap_err();
    assert!(matches!(err, OtaClientError::ClientIdentity { .. }));
    assert!(err.is_configuration());
}

#[test]
fn test_full_tls_config_builds() {
    let material = generate_material();

    let config = HttpsClientConfig::builder()
        .client_identity(&material.cert, &material.key)
        .server_cert(&material.server_cert)
        .build();
    assert!(build_http_client(&config).is_ok());

    let config = HttpsClientConfig::builder()
        .client_identity(&material.cert, &material.key)
        .server_cert(&material.server_cert)
        .skip_verify(true)
        .build();
    assert!(build_http_client(&config).is_ok());
}

#[test]
fn test_trust_only_config_builds() {
    let material = generate_material();

    let config = HttpsClientConfig::builder()
        .server_cert(&material.server_cert)
        .build();
    assert!(build_http_client(&config).is_ok());
}

#[test]
fn test_lone_key_rejected_even_with_trust() {
    let material = generate_material();

    let config = HttpsClientConfig::builder()
        .client_key(&material.key)
        .server_cert(&material.server_cert)
        .build();
    let err = build_http_client(&config).unwrap_err();
    assert!(matches!(err, OtaClientError::IncompleteIdentity));
}

#[test]
fn test_mismatched_key_rejected_by_factory() {
    let material = generate_material();
    let stranger = rcgen::KeyPair::generate().unwrap();
    std::fs::write(&material.key, stranger.serialize_pem()).unwrap();

    let config = HttpsClientConfig::builder()
        .client_identity(&material.cert, &material.key)
        .server_cert(&material.server_cert)
        .build();
    let err = build_http_client(&config).unwrap_err();
    assert!(matches!(err, OtaClientError::ClientIdentity { .. }));
}

#[test]
fn test_empty_trust_file_rejected_by_factory() {
    let material = generate_material();
    std::fs::write(&material.server_cert, "").unwrap();

    let config = HttpsClientConfig::builder()
        .server_cert(&material.server_cert)
        .build();
    let err = build_http_client(&config).unwrap_err();
    assert!(matches!(err, OtaClientError::EmptyTrustPool));
}

// =============================================================================
// Bootstrap
// =============================================================================

#[test]
fn test_bootstrap_validate() {
    let material = generate_material();

    let validated = BootstrapExchange::validate("ota.example.com", &paths(&material)).unwrap();
    assert_eq!(validated.server_host(), "ota.example.com");
    assert_eq!(validated.trusted().len(), 2);
    assert_eq!(validated.bootstrap_url(), "https://ota.example.com/bootstrap");
}

#[test]
fn test_bootstrap_validate_empty_pool() {
    let material = generate_material();
    std::fs::write(&material.server_cert, "no certificates here\n").unwrap();

    let err = BootstrapExchange::validate("ota.example.com", &paths(&material)).unwrap_err();
    assert!(matches!(err, OtaClientError::EmptyTrustPool));
}

#[test]
fn test_bootstrap_validate_bad_identity() {
    let material = generate_material();
    std::fs::remove_file(&material.key).unwrap();

    let err = BootstrapExchange::validate("ota.example.com", &paths(&material)).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains(material.cert.to_str().unwrap()));
    assert!(msg.contains(material.key.to_str().unwrap()));
}

#[test]
fn test_bootstrap_validate_mismatched_key() {
    let material = generate_material();
    let stranger = rcgen::KeyPair::generate().unwrap();
    std::fs::write(&material.key, stranger.serialize_pem()).unwrap();

    let err = BootstrapExchange::validate("ota.example.com", &paths(&material)).unwrap_err();
    assert!(matches!(err, OtaClientError::ClientIdentity { .. }));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    let msg = err.to_string();
    assert!(msg.contains(material.cert.to_str().unwrap()));
    assert!(msg.contains(material.key.to_str().unwrap()));
}

/// What the bootstrap server saw from the client
struct SeenRequest {
    client_certs: Vec<Vec<u8>>,
    request_line: String,
}

/// Serve one mutually authenticated connection that requires the device
/// certificate and answers `500`
async fn serve_bootstrap_once(material: &Material) -> (u16, JoinHandle<SeenRequest>) {
    let _ = tokio_rustls::rustls::crypto::ring::default_provider().install_default();

    let mut roots = RootCertStore::empty();
    roots
        .add(CertificateDer::from(material.device_der.clone()))
        .unwrap();
    let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
        .build()
        .unwrap();

    let config = ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(
            vec![CertificateDer::from(material.server.cert.der().to_vec())],
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
                material.server.key_pair.serialize_der(),
            )),
        )
        .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut tls = acceptor.accept(tcp).await.unwrap();
        let client_certs = tls
            .get_ref()
            .1
            .peer_certificates()
            .map(|certs| certs.iter().map(|c| c.as_ref().to_vec()).collect())
            .unwrap_or_default();

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = tls.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        tls.write_all(
            b"HTTP/1.1 500 Internal Server Error\r\n\
              content-length: 4\r\n\
              connection: close\r\n\r\n\
              nope",
        )
        .await
        .unwrap();
        let _ = tls.shutdown().await;

        let request = String::from_utf8_lossy(&request).into_owned();
        SeenRequest {
            client_certs,
            request_line: request.lines().next().unwrap_or_default().to_string(),
        }
    });

    (port, handle)
}

#[tokio::test]
async fn test_bootstrap_exchange_presents_identity() {
    let material = generate_material();
    let (port, server) = serve_bootstrap_once(&material).await;

    let host = format!("localhost:{}", port);
    let validated = BootstrapExchange::validate(&host, &paths(&material)).unwrap();

    // A non-success status is not an error for the bootstrap
    tokio_test::assert_ok!(validated.exchange().await);

    let seen = server.await.unwrap();
    assert_eq!(seen.client_certs, vec![material.device_der.clone()]);
    assert_eq!(seen.request_line, "GET /bootstrap HTTP/1.1");
}

#[tokio::test]
async fn test_bootstrap_exchange_transport_error() {
    let material = generate_material();

    // Nothing listens on port 1
    let validated = BootstrapExchange::validate_with_timeouts(
        "127.0.0.1:1",
        &paths(&material),
        &TimeoutsConfig {
            request_ms: 2_000,
            connect_ms: 1_000,
        },
    )
    .unwrap();

    let err = validated.exchange().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().starts_with("bootstrap request failed"));
}
