//! Opening the IRC link.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

use super::stream::BridgeStream;
use super::tls::upgrade_to_tls;
use crate::config::{SessionOptions, Settings};
use crate::error::TransportError;

/// Any duplex byte stream the session can speak IRC over.
pub trait IrcIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> IrcIo for T {}

pub type BoxedIo = Box<dyn IrcIo>;

/// Opens a fresh transport for each connect attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(
        &self,
        settings: &Settings,
        options: &SessionOptions,
    ) -> Result<BoxedIo, TransportError>;
}

/// TCP, optionally wrapped in TLS when the settings ask for SSL.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(
        &self,
        settings: &Settings,
        options: &SessionOptions,
    ) -> Result<BoxedIo, TransportError> {
        let addr = settings.address();
        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|source| TransportError::Connect {
                addr: addr.clone(),
                source,
            })?;
        if let Err(e) = tcp.set_nodelay(true) {
            debug!(error = %e, "Failed to set TCP_NODELAY");
        }

        let stream = if settings.use_ssl {
            let tls = upgrade_to_tls(tcp, &settings.hostname, options.tls_verify).await?;
            BridgeStream::Tls(Box::new(tls))
        } else {
            BridgeStream::Plain(tcp)
        };

        debug!(addr = %addr, tls = stream.is_tls(), "Transport established");
        Ok(Box::new(stream))
    }
}

/// Refuses every connect; sessions sit in their retry loop.
#[cfg(test)]
pub(crate) struct RefusingConnector;

#[cfg(test)]
#[async_trait]
impl Connector for RefusingConnector {
    async fn connect(
        &self,
        settings: &Settings,
        _options: &SessionOptions,
    ) -> Result<BoxedIo, TransportError> {
        Err(TransportError::Connect {
            addr: settings.address(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{Channel, RoutingTable};
    use std::sync::Arc;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio_rustls::TlsAcceptor;
    use tokio_rustls::rustls::ServerConfig;
    use tokio_rustls::rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};

    fn settings(port: u16) -> Settings {
        Settings {
            hostname: "127.0.0.1".into(),
            port,
            use_ssl: false,
            nickname: "bot".into(),
            username: "bot".into(),
            realname: "Bot".into(),
            password: String::new(),
            channels: RoutingTable::from_iter([Channel::open("#ci")]),
        }
    }

    #[tokio::test]
    async fn connects_plain_tcp() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accept = tokio::spawn(async move { listener.accept().await.map(|_| ()) });

        let io = TcpConnector
            .connect(&settings(port), &SessionOptions::default())
            .await;
        assert!(io.is_ok());
        accept.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn refused_connect_is_reported() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = TcpConnector
            .connect(&settings(port), &SessionOptions::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TransportError::Connect { .. }));
    }

    fn tls_settings(port: u16) -> Settings {
        Settings {
            hostname: "localhost".into(),
            use_ssl: true,
            ..settings(port)
        }
    }

    /// A listener on an ephemeral port serving a fresh self-signed
    /// certificate for `localhost`.
    async fn self_signed_server() -> (TcpListener, TlsAcceptor) {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
            certified.key_pair.serialize_der(),
        ));
        let config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![certified.cert.der().clone()], key)
            .unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        (listener, TlsAcceptor::from(Arc::new(config)))
    }

    #[tokio::test]
    async fn tls_accepts_self_signed_certificate_without_verification() {
        let (listener, acceptor) = self_signed_server().await;
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let tls = acceptor.accept(tcp).await.unwrap();
            let mut line = String::new();
            BufReader::new(tls).read_line(&mut line).await.unwrap();
            line
        });

        let options = SessionOptions {
            tls_verify: false,
            ..SessionOptions::default()
        };
        let mut io = TcpConnector
            .connect(&tls_settings(port), &options)
            .await
            .unwrap();
        io.write_all(b"NICK bot\r\n").await.unwrap();
        io.flush().await.unwrap();

        assert_eq!(server.await.unwrap(), "NICK bot\r\n");
    }

    #[tokio::test]
    async fn tls_rejects_self_signed_certificate_when_verifying() {
        let (listener, acceptor) = self_signed_server().await;
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            acceptor.accept(tcp).await.is_err()
        });

        let options = SessionOptions {
            tls_verify: true,
            ..SessionOptions::default()
        };
        let err = TcpConnector
            .connect(&tls_settings(port), &options)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TransportError::Tls { ref host, .. } if host == "localhost"));
        assert!(server.await.unwrap());
    }
}
