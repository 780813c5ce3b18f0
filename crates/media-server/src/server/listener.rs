//! Loopback TCP binding and the TLS accept loop.
//!
//! Each accepted connection gets its own task: TLS handshake, then the axum
//! router served over HTTP/1.1 or HTTP/2 (negotiated by ALPN). On shutdown the
//! accept loop stops first, then every open connection is asked to finish its
//! in-flight requests before [`serve`] returns.

use std::{io, net::SocketAddr};

use axum::Router;
use common::protocol::LOOPBACK_HOST;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
    service::TowerToHyperService,
};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, warn};

/// Unexpected failure that ended the accept loop.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),
}

/// Resolve `localhost:<port>`, preferring IPv4. Non-loopback results are ignored.
///
/// # Errors
///
/// Returns an error if resolution fails or yields no loopback address.
pub async fn loopback_addr(port: u16) -> io::Result<SocketAddr> {
    let mut fallback = None;
    for addr in tokio::net::lookup_host((LOOPBACK_HOST, port)).await? {
        if !addr.ip().is_loopback() {
            continue;
        }
        if addr.is_ipv4() {
            return Ok(addr);
        }
        fallback.get_or_insert(addr);
    }
    fallback.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "localhost does not resolve to a loopback address",
        )
    })
}

/// Bind a listener on `localhost:<port>` and return it with the port actually bound.
///
/// # Errors
///
/// Returns an error if the address cannot be resolved or bound.
pub async fn bind(port: u16) -> io::Result<(TcpListener, u16)> {
    let addr = loopback_addr(port).await?;
    let listener = TcpListener::bind(addr).await?;
    let bound = listener.local_addr()?.port();
    Ok((listener, bound))
}

/// Accept and serve connections until `shutdown` fires or accepting fails.
///
/// Returns `Ok(())` after a requested shutdown once every connection has
/// drained. Connections are drained on the error path as well.
///
/// # Errors
///
/// Returns [`ServeError::Accept`] for non-transient accept failures.
pub async fn serve(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    router: Router,
    shutdown: CancellationToken,
) -> Result<(), ServeError> {
    let connections = TaskTracker::new();
    let drain = shutdown.child_token();

    let result = loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => break Ok(()),
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) if is_transient(&e) => {
                    debug!(error = %e, "transient accept error");
                    continue;
                }
                Err(e) => break Err(ServeError::Accept(e)),
            },
        };

        debug!(%peer, "accepted connection");
        connections.spawn(handle_connection(
            stream,
            peer,
            acceptor.clone(),
            router.clone(),
            drain.clone(),
        ));
    };

    // Release the port before waiting so a restart can rebind it.
    drop(listener);
    drain.cancel();
    connections.close();
    connections.wait().await;

    result
}

/// Accept errors that concern a single connection rather than the listener.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    acceptor: TlsAcceptor,
    router: Router,
    drain: CancellationToken,
) {
    let tls = tokio::select! {
        _ = drain.cancelled() => return,
        handshake = acceptor.accept(stream) => match handshake {
            Ok(tls) => tls,
            Err(e) => {
                debug!(%peer, error = %e, "TLS handshake failed");
                return;
            }
        },
    };

    let builder = auto::Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection(TokioIo::new(tls), TowerToHyperService::new(router));
    tokio::pin!(conn);

    let mut draining = false;
    loop {
        tokio::select! {
            res = conn.as_mut() => {
                if let Err(e) = res {
                    warn!(%peer, error = %e, "connection ended with error");
                }
                break;
            }
            _ = drain.cancelled(), if !draining => {
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }
}
