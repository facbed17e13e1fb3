//! The Hermes HTTP server: connection pipeline, responder and lifecycle.
//!
//! This crate turns the contracts of `hermes-core` into a running service
//! on Hyper and Tokio. The service owns its runtime: [`HttpService::start`]
//! binds and launches the accept loop, [`HttpService::stop`] drains and
//! joins every framework thread.
//!
//! # Architecture
//!
//! ```text
//! accept ─► connection task ─► parse head ─► stages ─► rewrite ─► route
//!                                                                   │
//!                          ┌───────── buffered ──────┴── streaming ─┐
//!                          ▼                                        ▼
//!                 aggregate (≤ chunk limit)              invoke, get consumer
//!                 invoke handler                         pump chunks ─► finish
//!                          │                                        │
//!                          └──────────► responder ◄─────────────────┘
//!                                          │
//!                           flush ─► keep-alive reset | close
//! ```
//!
//! Both body paths are pre-wired per connection; the branch is taken at the
//! first byte of the body based on the matched handler's dispatch mode.

mod body;
mod config;
mod pipeline;
mod responder;
mod service;
mod shutdown;
mod tls;

pub use body::ResponseBody;
pub use config::{
    ServiceConfig, DEFAULT_BOSS_THREAD_POOL_SIZE, DEFAULT_EXEC_THREAD_POOL_SIZE,
    DEFAULT_HTTP_CHUNK_LIMIT, DEFAULT_WORKER_THREAD_POOL_SIZE,
};
pub use responder::BasicResponder;
pub use service::{HttpService, HttpServiceBuilder, ServiceError, ServiceState};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
pub use tls::SslConfig;
