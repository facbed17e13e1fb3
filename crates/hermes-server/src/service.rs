//! Service lifecycle: build, start, stop.
//!
//! [`HttpService`] owns its tokio runtime. `start()` builds the runtime,
//! binds the listener and launches the accept loop; `stop()` stops
//! accepting, drains live connections within the grace period and then
//! joins every runtime thread, so no framework-owned thread survives it.
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_server::HttpService;
//!
//! let service = HttpService::builder()
//!     .set_host("127.0.0.1")
//!     .set_port(0)
//!     .add_http_handler(MyHandler)
//!     .build()?;
//!
//! let addr = service.start()?;
//! // ... serve traffic ...
//! service.stop()?;
//! ```

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio_rustls::TlsAcceptor;

use hermes_core::{
    DefaultExceptionHandler, ExceptionHandler, HandlerContext, HttpHandler, PipelineStage,
    UrlRewriter,
};
use hermes_router::{RegistrationError, ResourceRegistry};

use crate::config::ServiceConfig;
use crate::pipeline::{self, PipelineShared};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};
use crate::tls::{build_acceptor, SslConfig};

/// Lifecycle states of an [`HttpService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Built, never started.
    New,
    /// `start()` in progress.
    Starting,
    /// Accepting connections.
    Running,
    /// `stop()` in progress.
    Stopping,
    /// Stopped; no framework threads remain.
    Terminated,
}

/// Errors from service construction and lifecycle transitions.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The requested transition is not legal from the current state.
    #[error("Cannot {action} while service is {state:?}")]
    InvalidState {
        /// The attempted action.
        action: &'static str,
        /// The state it was attempted from.
        state: ServiceState,
    },

    /// A configuration value failed validation.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The listener could not bind.
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        /// The address that failed.
        addr: String,
        /// The underlying error.
        source: io::Error,
    },

    /// TLS material could not be loaded.
    #[error("TLS configuration error: {0}")]
    Tls(String),

    /// Any other I/O failure during startup or shutdown.
    #[error(transparent)]
    Io(#[from] io::Error),
}

enum LifecycleState {
    New,
    Starting,
    Running(RunningState),
    Stopping,
    Terminated,
}

impl LifecycleState {
    fn public(&self) -> ServiceState {
        match self {
            Self::New => ServiceState::New,
            Self::Starting => ServiceState::Starting,
            Self::Running(_) => ServiceState::Running,
            Self::Stopping => ServiceState::Stopping,
            Self::Terminated => ServiceState::Terminated,
        }
    }
}

struct RunningState {
    runtime: Runtime,
    shutdown: ShutdownSignal,
    tracker: ConnectionTracker,
    local_addr: SocketAddr,
}

/// The Hermes HTTP service.
///
/// Construct with [`HttpService::builder`], then drive the lifecycle with
/// [`start`](Self::start) and [`stop`](Self::stop). Both are callable from
/// any non-runtime thread; calling them from inside a handler would
/// deadlock and is not supported.
pub struct HttpService {
    config: ServiceConfig,
    shared: Arc<PipelineShared>,
    handlers: Vec<Arc<dyn HttpHandler>>,
    ssl: Option<SslConfig>,
    state: Mutex<LifecycleState>,
}

impl HttpService {
    /// Creates a service builder.
    #[must_use]
    pub fn builder() -> HttpServiceBuilder {
        HttpServiceBuilder::new()
    }

    /// The resolved configuration.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServiceState {
        self.state.lock().public()
    }

    /// The bound address while running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.state.lock() {
            LifecycleState::Running(running) => Some(running.local_addr),
            _ => None,
        }
    }

    /// Binds the listener and starts accepting connections.
    ///
    /// Returns the bound address (useful with port `0`).
    ///
    /// # Errors
    ///
    /// Fails when the service is not `New`, when configuration is invalid,
    /// when TLS material cannot be loaded, or when the bind fails. A failed
    /// start leaves the service `Terminated`.
    pub fn start(&self) -> Result<SocketAddr, ServiceError> {
        {
            let mut state = self.state.lock();
            match &*state {
                LifecycleState::New => *state = LifecycleState::Starting,
                other => {
                    return Err(ServiceError::InvalidState {
                        action: "start",
                        state: other.public(),
                    })
                }
            }
        }

        match self.start_inner() {
            Ok(running) => {
                let addr = running.local_addr;
                tracing::info!(service = %self.config.service_name, %addr, "Service started");
                *self.state.lock() = LifecycleState::Running(running);
                Ok(addr)
            }
            Err(e) => {
                *self.state.lock() = LifecycleState::Terminated;
                Err(e)
            }
        }
    }

    fn start_inner(&self) -> Result<RunningState, ServiceError> {
        if self.config.boss_thread_pool_size == 0 {
            return Err(ServiceError::Configuration(
                "boss thread pool size must be at least 1".to_string(),
            ));
        }

        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder
            .worker_threads(self.config.worker_thread_pool_size.max(1))
            .thread_name(format!("{}-worker", self.config.service_name))
            .enable_all();
        if self.config.exec_thread_pool_size > 0 {
            builder.max_blocking_threads(self.config.exec_thread_pool_size);
        }
        let runtime = builder.build()?;

        let tls = self.ssl.as_ref().map(build_acceptor).transpose()?;

        let addr_text = format!("{}:{}", self.config.host, self.config.port);
        let listener = runtime
            .block_on(TcpListener::bind(&addr_text))
            .map_err(|e| ServiceError::Bind {
                addr: addr_text,
                source: e,
            })?;
        let local_addr = listener.local_addr()?;

        let context = HandlerContext::new(self.config.service_name.clone());
        for handler in &self.handlers {
            handler.init(&context);
        }

        let shutdown = ShutdownSignal::new();
        let tracker = ConnectionTracker::new();
        runtime.spawn(accept_loop(
            listener,
            tls,
            Arc::clone(&self.shared),
            shutdown.clone(),
            tracker.clone(),
        ));

        Ok(RunningState {
            runtime,
            shutdown,
            tracker,
            local_addr,
        })
    }

    /// Stops accepting, drains connections within the grace period, then
    /// joins the runtime. Idempotent once terminated; stopping a never-
    /// started service terminates it directly.
    ///
    /// # Errors
    ///
    /// Fails when called during another in-flight transition.
    pub fn stop(&self) -> Result<(), ServiceError> {
        let running = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, LifecycleState::Stopping) {
                LifecycleState::Running(running) => running,
                LifecycleState::New | LifecycleState::Terminated => {
                    *state = LifecycleState::Terminated;
                    return Ok(());
                }
                other => {
                    let public = other.public();
                    *state = other;
                    return Err(ServiceError::InvalidState {
                        action: "stop",
                        state: public,
                    });
                }
            }
        };

        tracing::info!(service = %self.config.service_name, "Stopping service");
        running.shutdown.trigger();

        let grace = self.config.shutdown_grace;
        let drained = running.runtime.block_on(async {
            tokio::select! {
                () = running.tracker.drained() => true,
                () = tokio::time::sleep(grace) => false,
            }
        });
        if !drained {
            tracing::warn!(
                active = running.tracker.active_connections(),
                "Shutdown grace period elapsed with connections still active"
            );
        }

        let context = HandlerContext::new(self.config.service_name.clone());
        for handler in &self.handlers {
            handler.destroy(&context);
        }

        // Joins every worker and blocking thread.
        running.runtime.shutdown_timeout(Duration::from_secs(5));
        *self.state.lock() = LifecycleState::Terminated;
        tracing::info!(service = %self.config.service_name, "Service terminated");
        Ok(())
    }
}

impl Drop for HttpService {
    fn drop(&mut self) {
        // Best-effort cleanup when the owner forgot (or failed) to stop.
        let state = std::mem::replace(&mut *self.state.lock(), LifecycleState::Terminated);
        if let LifecycleState::Running(running) = state {
            running.shutdown.trigger();
            running.runtime.shutdown_background();
        }
    }
}

/// Accepts connections until shutdown; one spawned task per connection.
async fn accept_loop(
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    shared: Arc<PipelineShared>,
    shutdown: ShutdownSignal,
    tracker: ConnectionTracker,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, remote_addr)) => {
                        let token = tracker.acquire();
                        let tls = tls.clone();
                        let shared = Arc::clone(&shared);
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            match tls {
                                Some(acceptor) => match acceptor.accept(stream).await {
                                    Ok(stream) => {
                                        serve_connection(stream, remote_addr, shared, shutdown)
                                            .await;
                                    }
                                    Err(e) => {
                                        tracing::debug!(%remote_addr, error = %e, "TLS handshake failed");
                                    }
                                },
                                None => serve_connection(stream, remote_addr, shared, shutdown).await,
                            }
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to accept connection"),
                }
            }
            () = shutdown.recv() => break,
        }
    }
}

/// Serves one connection with the HTTP/1.1 codec.
async fn serve_connection<S>(
    stream: S,
    remote_addr: SocketAddr,
    shared: Arc<PipelineShared>,
    shutdown: ShutdownSignal,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(stream);
    let service = service_fn(move |request| pipeline::handle(Arc::clone(&shared), request));
    let conn = http1::Builder::new().serve_connection(io, service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => {
            if let Err(e) = result {
                tracing::debug!(%remote_addr, error = %e, "Connection ended with error");
            }
        }
        () = shutdown.recv() => {
            conn.as_mut().graceful_shutdown();
            if let Err(e) = conn.as_mut().await {
                tracing::debug!(%remote_addr, error = %e, "Connection ended during shutdown");
            }
        }
    }
}

/// Builder for [`HttpService`].
///
/// ```rust
/// use hermes_server::HttpService;
///
/// let service = HttpService::builder()
///     .set_host("127.0.0.1")
///     .set_port(0)
///     .set_http_chunk_limit(75 * 1024)
///     .set_worker_thread_pool_size(4)
///     .build()
///     .unwrap();
/// assert_eq!(service.config().http_chunk_limit(), 75 * 1024);
/// ```
#[must_use]
pub struct HttpServiceBuilder {
    config: ServiceConfig,
    handlers: Vec<Arc<dyn HttpHandler>>,
    exception_handler: Arc<dyn ExceptionHandler>,
    rewriter: Option<Arc<dyn UrlRewriter>>,
    stages: Vec<Arc<dyn PipelineStage>>,
    ssl: Option<SslConfig>,
}

impl Default for HttpServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpServiceBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: ServiceConfig::default(),
            handlers: Vec::new(),
            exception_handler: Arc::new(DefaultExceptionHandler),
            rewriter: None,
            stages: Vec::new(),
            ssl: None,
        }
    }

    /// Appends already-shared handler objects.
    pub fn add_http_handlers<I>(mut self, handlers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn HttpHandler>>,
    {
        self.handlers.extend(handlers);
        self
    }

    /// Appends one handler object.
    pub fn add_http_handler(mut self, handler: impl HttpHandler) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Caps the aggregated request body, in bytes.
    pub fn set_http_chunk_limit(mut self, bytes: usize) -> Self {
        self.config.http_chunk_limit = bytes;
        self
    }

    /// Installs a custom exception translator.
    pub fn set_exception_handler(mut self, handler: impl ExceptionHandler) -> Self {
        self.exception_handler = Arc::new(handler);
        self
    }

    /// Installs the pre-routing URL rewriter.
    pub fn set_url_rewriter(mut self, rewriter: impl UrlRewriter) -> Self {
        self.rewriter = Some(Arc::new(rewriter));
        self
    }

    /// Enables TLS on the listener.
    pub fn enable_ssl(mut self, config: SslConfig) -> Self {
        self.ssl = Some(config);
        self
    }

    /// Injects an extra processing stage around each exchange.
    pub fn modify_pipeline(mut self, stage: impl PipelineStage) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Sizes the accept pool.
    pub fn set_boss_thread_pool_size(mut self, size: usize) -> Self {
        self.config.boss_thread_pool_size = size;
        self
    }

    /// Sizes the I/O worker pool.
    pub fn set_worker_thread_pool_size(mut self, size: usize) -> Self {
        self.config.worker_thread_pool_size = size;
        self
    }

    /// Sizes the handler-execution pool; `0` runs handlers on the I/O
    /// worker.
    pub fn set_exec_thread_pool_size(mut self, size: usize) -> Self {
        self.config.exec_thread_pool_size = size;
        self
    }

    /// Sets the bind host.
    pub fn set_host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the bind port; `0` picks an ephemeral port.
    pub fn set_port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Names the service (thread names, handler contexts, logs).
    pub fn set_service_name(mut self, name: impl Into<String>) -> Self {
        self.config.service_name = name.into();
        self
    }

    /// Sets the drain grace period for `stop()`.
    pub fn set_shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace = grace;
        self
    }

    /// Builds the service, walking every handler into the resource
    /// registry.
    ///
    /// # Errors
    ///
    /// Any [`RegistrationError`] (malformed pattern, empty or unsupported
    /// verb set, missing dispatch) is fatal here, not at request time.
    pub fn build(self) -> Result<HttpService, RegistrationError> {
        let registry = ResourceRegistry::build(&self.handlers, &self.exception_handler)?;
        let shared = Arc::new(PipelineShared {
            registry,
            rewriter: self.rewriter,
            stages: self.stages,
            chunk_limit: self.config.http_chunk_limit,
            offload: self.config.exec_thread_pool_size > 0,
        });
        Ok(HttpService {
            config: self.config,
            shared,
            handlers: self.handlers,
            ssl: self.ssl,
            state: Mutex::new(LifecycleState::New),
        })
    }
}
