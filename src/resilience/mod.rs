//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a backend:
//!     → retries.rs (TransportRetry: same request, fixed delay, transport errors only)
//!
//! Donor fallback in the router:
//!     → retries.rs (DonorRetry: fresh donor per attempt, donor unreachable only)
//!     → backoff.rs (optional delay between donor attempts)
//! ```
//!
//! # Design Decisions
//! - Two independent budgets; neither policy knows about the other
//! - HTTP error statuses never trigger a retry, they are answers
//! - Timeouts are per call, enforced by the HTTP client

pub mod backoff;
pub mod retries;

pub use retries::{DonorRetry, TransportRetry};
