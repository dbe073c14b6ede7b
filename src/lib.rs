//! Migration proxy library.
//!
//! Serves every request from a writable target cluster and, when the target
//! cannot answer, from read-only donor clusters, writing what it finds back
//! into the target.

pub mod backend;
pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod namespace;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod strategy;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::MigrationRouter;
