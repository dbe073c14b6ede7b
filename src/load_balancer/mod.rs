//! Donor selection subsystem.
//!
//! # Data Flow
//! ```text
//! Target miss → router needs a donor
//!     → pool.rs (ordered donor clients)
//!     → round_robin.rs (atomic rotation cursor)
//!     → Arc<BackendClient> handed to the router for this attempt
//! ```
//!
//! # Design Decisions
//! - Pool is built once at startup, only the cursor changes afterwards
//! - Cursor is an atomic counter; fairness across tasks is not guaranteed
//! - A retry asks the pool again, so it usually lands on another donor

pub mod pool;
pub mod round_robin;

pub use pool::ClientPool;
pub use round_robin::RoundRobin;

/// Picks an index into a list of `len` candidates.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Returns `None` only when `len` is zero.
    fn next_index(&self, len: usize) -> Option<usize>;
}
