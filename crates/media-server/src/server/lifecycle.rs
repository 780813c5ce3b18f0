//! Listener lifecycle: start, stop, and foreground/background transitions.
//!
//! A [`MediaServer`] owns at most one supervisor task. The supervisor binds
//! `localhost:<port>`, serves until told to stop, and heals itself:
//!
//! - bind failure: remembered port resets to 0, retry with backoff, give up
//!   after the configured number of consecutive failures;
//! - unexpected serve failure: restart on the same remembered port.
//!
//! Control calls (`start`, `stop`, `to_foreground`, `to_background`) serialize
//! on one async mutex. The supervisor never takes that mutex; it only writes
//! the atomic port and the state channel.

use std::sync::{
    atomic::{AtomicU16, Ordering},
    Arc,
};

use axum::Router;
use common::protocol;
use thiserror::Error;
use tokio::{
    net::TcpListener,
    sync::{watch, Mutex},
    task::{JoinError, JoinHandle},
};
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use super::{
    listener::{self, ServeError},
    retry::RetryPolicy,
    router,
    state::AppState,
    tls,
};
use crate::certificate::{CertificateError, CertificateProvider};
use crate::config::Config;

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No listener; either never started, stopped, or gave up binding.
    Stopped,
    /// A supervisor is binding or restarting the listener.
    Starting,
    /// Accepting connections on `port`.
    Running { port: u16 },
}

/// Errors surfaced to the lifecycle caller.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error(transparent)]
    Tls(#[from] tls::TlsError),

    /// The supervisor task panicked or was aborted.
    #[error("listener supervisor failed: {0}")]
    Supervisor(#[from] JoinError),
}

/// Loopback HTTPS media server. Cheap to clone; clones share one listener.
#[derive(Clone)]
pub struct MediaServer {
    inner: Arc<Inner>,
}

struct Inner {
    router: Router,
    acceptor: TlsAcceptor,
    retry: RetryPolicy,
    port: AtomicU16,
    state: watch::Sender<LifecycleState>,
    control: Mutex<Control>,
    /// Each permit fails the running listener once, as an accept error would.
    #[cfg(test)]
    serve_fault: tokio::sync::Notify,
}

#[derive(Default)]
struct Control {
    supervisor: Option<Supervisor>,
    /// Set by the first `start`; lets `to_foreground` resume after `to_background`.
    started: bool,
}

struct Supervisor {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl Supervisor {
    fn is_alive(&self) -> bool {
        !self.task.is_finished()
    }
}

impl MediaServer {
    /// Build a server over `state` using the process-wide certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be generated or rustls
    /// rejects it. Nothing is bound until [`start`](Self::start).
    pub fn new(config: &Config, state: AppState) -> Result<Self, ServerError> {
        Self::with_provider(config, state, CertificateProvider::global())
    }

    /// Like [`new`](Self::new), with an explicit certificate provider.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn with_provider(
        config: &Config,
        state: AppState,
        provider: &CertificateProvider,
    ) -> Result<Self, ServerError> {
        let material = provider.ensure_certificate()?;
        let acceptor = tls::acceptor(&material)?;
        let (state_tx, _) = watch::channel(LifecycleState::Stopped);

        Ok(Self {
            inner: Arc::new(Inner {
                router: router::build(state),
                acceptor,
                retry: config.retry_policy(),
                port: AtomicU16::new(config.port),
                state: state_tx,
                control: Mutex::new(Control::default()),
                #[cfg(test)]
                serve_fault: tokio::sync::Notify::new(),
            }),
        })
    }

    /// Launch the supervisor. No-op while one is alive.
    pub async fn start(&self) {
        let mut control = self.inner.control.lock().await;
        self.start_locked(&mut control);
    }

    /// Stop accepting, let in-flight requests finish, and wait for the supervisor.
    ///
    /// No-op when nothing was started. There is no timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Supervisor`] if the supervisor task panicked.
    pub async fn stop(&self) -> Result<(), ServerError> {
        let mut control = self.inner.control.lock().await;
        self.stop_locked(&mut control).await
    }

    /// Resume after [`to_background`](Self::to_background).
    ///
    /// No-op while running or if the server was never started.
    pub async fn to_foreground(&self) {
        let mut control = self.inner.control.lock().await;
        if !control.started || control.supervisor.as_ref().is_some_and(Supervisor::is_alive) {
            debug!("to_foreground: nothing to do");
            return;
        }
        info!(port = self.port(), "returning to foreground");
        self.start_locked(&mut control);
    }

    /// Stop the listener while keeping the remembered port. No-op when stopped.
    pub async fn to_background(&self) {
        let mut control = self.inner.control.lock().await;
        // A supervisor that is retrying a bind, or that gave up, still counts:
        // it must not keep retrying in the background, and its handle is reaped.
        if control.supervisor.is_none() {
            debug!("to_background: nothing to do");
            return;
        }
        info!(port = self.port(), "moving to background");
        if let Err(e) = self.stop_locked(&mut control).await {
            error!(error = %e, "failed to stop listener");
        }
    }

    /// Remembered port: the last successfully bound port, or 0.
    pub fn port(&self) -> u16 {
        self.inner.port.load(Ordering::Acquire)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        *self.inner.state.borrow()
    }

    /// True while the listener is accepting connections.
    pub fn is_running(&self) -> bool {
        matches!(self.state(), LifecycleState::Running { .. })
    }

    /// Receiver notified on every lifecycle transition.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.inner.state.subscribe()
    }

    /// Wait until the supervisor settles. Returns the bound port, or `None`
    /// if the server is (or ends up) stopped.
    pub async fn wait_until_running(&self) -> Option<u16> {
        let mut rx = self.subscribe();
        let settled = rx
            .wait_for(|s| !matches!(s, LifecycleState::Starting))
            .await
            .ok()?;
        match *settled {
            LifecycleState::Running { port } => Some(port),
            _ => None,
        }
    }

    /// Root URL at the remembered port.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        protocol::base_url(self.port())
    }

    /// Image URL for `message_id` at the remembered port.
    pub fn image_url(&self, message_id: &str) -> Result<Url, url::ParseError> {
        protocol::image_url(self.port(), message_id)
    }

    /// Audio URL for `message_id` at the remembered port.
    pub fn audio_url(&self, message_id: &str) -> Result<Url, url::ParseError> {
        protocol::audio_url(self.port(), message_id)
    }

    /// Identicon URL for `public_key` at the remembered port.
    pub fn identicon_url(&self, public_key: &str) -> Result<Url, url::ParseError> {
        protocol::identicon_url(self.port(), public_key)
    }

    fn start_locked(&self, control: &mut Control) {
        if control.supervisor.as_ref().is_some_and(Supervisor::is_alive) {
            debug!("start: supervisor already running");
            return;
        }

        let shutdown = CancellationToken::new();
        self.inner.state.send_replace(LifecycleState::Starting);
        let task = tokio::spawn(supervise(Arc::clone(&self.inner), shutdown.clone()));
        control.supervisor = Some(Supervisor { shutdown, task });
        control.started = true;
    }

    async fn stop_locked(&self, control: &mut Control) -> Result<(), ServerError> {
        let Some(supervisor) = control.supervisor.take() else {
            return Ok(());
        };

        supervisor.shutdown.cancel();
        let joined = supervisor.task.await;
        self.inner.state.send_replace(LifecycleState::Stopped);
        joined?;
        Ok(())
    }
}

/// Bind, serve, and retry until cancelled or out of bind attempts.
async fn supervise(inner: Arc<Inner>, shutdown: CancellationToken) {
    let mut failures = 0u32;

    loop {
        let requested = inner.port.load(Ordering::Acquire);
        let bound = tokio::select! {
            _ = shutdown.cancelled() => break,
            bound = listener::bind(requested) => bound,
        };

        let (tcp, port) = match bound {
            Ok(bound) => bound,
            Err(e) => {
                failures += 1;
                warn!(port = requested, attempt = failures, error = %e, "bind failed");
                inner.port.store(0, Ordering::Release);
                if inner.retry.exhausted(failures) {
                    error!(attempts = failures, "giving up on binding listener");
                    break;
                }
                let delay = inner.retry.delay(failures);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(delay) => continue,
                }
            }
        };

        failures = 0;
        inner.port.store(port, Ordering::Release);
        inner.state.send_replace(LifecycleState::Running { port });
        info!(port, "media server listening");

        match serve_once(&inner, tcp, shutdown.clone()).await {
            Ok(()) => break,
            Err(e) => {
                error!(port, error = %e, "listener failed, restarting");
                inner.state.send_replace(LifecycleState::Starting);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(inner.retry.base) => {}
                }
            }
        }
    }

    inner.state.send_replace(LifecycleState::Stopped);
    info!("media server stopped");
}

#[cfg(not(test))]
async fn serve_once(
    inner: &Inner,
    tcp: TcpListener,
    shutdown: CancellationToken,
) -> Result<(), ServeError> {
    listener::serve(tcp, inner.acceptor.clone(), inner.router.clone(), shutdown).await
}

#[cfg(test)]
async fn serve_once(
    inner: &Inner,
    tcp: TcpListener,
    shutdown: CancellationToken,
) -> Result<(), ServeError> {
    tokio::select! {
        served = listener::serve(tcp, inner.acceptor.clone(), inner.router.clone(), shutdown) => served,
        _ = inner.serve_fault.notified() => Err(ServeError::Accept(std::io::Error::other(
            "listener socket failed",
        ))),
    }
}
