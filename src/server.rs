//! HTTP server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. stops `listener.accept()` immediately, so no new connections arrive;
//! 2. lets in-flight connection tasks finish for up to the engine's
//!    shutdown timeout (5 s by default);
//! 3. aborts whatever is still running and returns.

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::rustls::pki_types::pem::PemObject;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tracing::{error, info, warn};

use crate::context::RemoteAddr;
use crate::engine::Engine;
use crate::error::Error;
use crate::writer::{ContentType, ResponseWriter};

impl Engine {
    /// Listens on `addr` and serves until SIGTERM or Ctrl-C.
    ///
    /// `addr` is `host:port`; a bare `:port` binds every interface.
    pub async fn run(self, addr: &str) -> Result<(), Error> {
        let listener = TcpListener::bind(normalize(addr)).await?;
        info!(addr = %listener.local_addr()?, "mows listening");
        serve_inner(self, listener, None, shutdown_signal()).await
    }

    /// [`run`](Self::run) over TLS, with a PEM certificate chain and key.
    pub async fn run_tls(self, addr: &str, cert_file: impl AsRef<Path>, key_file: impl AsRef<Path>) -> Result<(), Error> {
        let acceptor = tls_acceptor(cert_file.as_ref(), key_file.as_ref())?;
        let listener = TcpListener::bind(normalize(addr)).await?;
        info!(addr = %listener.local_addr()?, "mows listening (tls)");
        serve_inner(self, listener, Some(acceptor), shutdown_signal()).await
    }

    /// Serves connections from an already bound `listener` until `shutdown`
    /// resolves, then drains like [`run`](Self::run).
    pub async fn serve<S>(self, listener: TcpListener, shutdown: S) -> Result<(), Error>
    where
        S: Future<Output = ()> + Send,
    {
        serve_inner(self, listener, None, shutdown).await
    }
}

async fn serve_inner<S>(
    engine: Engine,
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    shutdown: S,
) -> Result<(), Error>
where
    S: Future<Output = ()> + Send,
{
    let grace = engine.shutdown_timeout;
    let engine = Arc::new(engine);
    let mut tasks = JoinSet::new();

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            // Shutdown is checked first so a signal stops accepting at once,
            // even with connections queued.
            biased;

            () = &mut shutdown => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let engine = Arc::clone(&engine);
                let tls = tls.clone();

                tasks.spawn(async move {
                    match tls {
                        Some(acceptor) => match acceptor.accept(stream).await {
                            Ok(stream) => serve_connection(engine, stream, remote_addr).await,
                            Err(e) => warn!(peer = %remote_addr, "tls handshake failed: {e}"),
                        },
                        None => serve_connection(engine, stream, remote_addr).await,
                    }
                });
            }

            // Reap finished tasks so the set does not grow without bound.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    let drain = async { while tasks.join_next().await.is_some() {} };
    if tokio::time::timeout(grace, drain).await.is_err() {
        warn!(remaining = tasks.len(), ?grace, "graceful shutdown timed out, closing connections");
        tasks.shutdown().await;
    }

    info!("mows stopped");
    Ok(())
}

/// Serves every request on one connection, HTTP/1.1 or HTTP/2.
async fn serve_connection<I>(engine: Arc<Engine>, io: I, remote_addr: SocketAddr)
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let svc = service_fn(move |req| {
        let engine = Arc::clone(&engine);
        async move { dispatch(&engine, req, remote_addr).await }
    });

    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(io), svc)
        .await
    {
        error!(peer = %remote_addr, "connection error: {e}");
    }
}

/// Collects the body, tags the peer address, and hands the request to the
/// engine. Never fails: hyper only ever sees a response.
async fn dispatch(
    engine: &Engine,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<bytes::Bytes>>, std::convert::Infallible> {
    let (mut parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            let mut writer = ResponseWriter::new();
            writer.send(http::StatusCode::BAD_REQUEST, ContentType::Text.as_str(), "400 bad request");
            return Ok(writer.into_response());
        }
    };
    parts.extensions.insert(RemoteAddr(remote_addr));

    Ok(engine.handle(http::Request::from_parts(parts, body)).await)
}

/// `":8080"` → `"0.0.0.0:8080"`; anything else unchanged.
fn normalize(addr: &str) -> String {
    match addr.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => addr.to_owned(),
    }
}

fn tls_acceptor(cert_file: &Path, key_file: &Path) -> Result<TlsAcceptor, Error> {
    let certs = CertificateDer::pem_file_iter(cert_file)
        .and_then(|certs| certs.collect::<Result<Vec<_>, _>>())
        .map_err(|e| Error::Tls(format!("{}: {e}", cert_file.display())))?;
    let key = PrivateKeyDer::from_pem_file(key_file)
        .map_err(|e| Error::Tls(format!("{}: {e}", key_file.display())))?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| Error::Tls(e.to_string()))?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(config)))
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C). Only Ctrl-C on
/// non-Unix platforms.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
