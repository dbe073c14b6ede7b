//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Buffered request
//!     → matcher.rs (stop list: reject before any backend call)
//!     → router.rs  (target first)
//!         → strategy says "served"     → answer from target
//!         → matcher.rs (skip list)     → answer from target
//!         → next donor from the pool   → strategy post-process → optional store
//!     → Answer or FailureReason
//! ```
//!
//! # Design Decisions
//! - One catch-all route; there is no routing table
//! - Filters compiled at startup, immutable at runtime
//! - Donor transport failures retry the whole cycle with a fresh donor

pub mod matcher;
pub mod router;

pub use matcher::{FilterError, Matcher, PathFilter};
pub use router::{Answer, AnswerSource, FailureReason, MigrationRouter};
