//! Virtual space isolation subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing request to target:
//!     /riak/users/42            → codec.rs (encode) → /riak/<space>users/42
//!     Link: </riak/users/7>     → codec.rs (encode) → Link: </riak/<space>users/7>
//!
//! Incoming response from target:
//!     Link: </riak/<space>users/7> → codec.rs (decode) → Link: </riak/users/7>
//! ```
//!
//! # Design Decisions
//! - Only the first path segment boundary is touched, at string start or after `<`
//! - `Link` is the only header whose value embeds paths
//! - An empty space is the identity; clients without a space get [`Passthrough`]

pub mod codec;

pub use codec::{NamespaceCodec, Passthrough, VirtualSpace};
