//! Backend client subsystem.
//!
//! # Data Flow
//! ```text
//! BackendRequest (buffered once)
//!     → client.rs (read-only guard)
//!     → namespace codec (encode path + Link headers)
//!     → reqwest call with per-call timeout
//!         ↺ transport error: same bytes again after a fixed delay
//!     → namespace codec (decode Link headers)
//!     → BackendResponse (any status)
//! ```
//!
//! # Design Decisions
//! - Clients are built once at startup and shared immutably
//! - HTTP error statuses are answers, not errors
//! - Donors are always read-only

pub mod client;
pub mod error;
pub mod message;
pub mod tls;

pub use client::{is_mutating, BackendClient, BackendClientBuilder};
pub use error::{BackendError, BackendResult};
pub use message::{BackendRequest, BackendResponse};
