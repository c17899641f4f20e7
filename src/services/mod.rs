//! Business logic services for the gateway.
//!
//! Route parsing/resolution and outgoing request assembly. Nothing in this
//! layer performs I/O.

pub mod rewriter;
pub mod routing;

// Re-export commonly used types
pub use rewriter::{build_outgoing_request, OutgoingRequest};
pub use routing::{resolve_route, ResolvedRoute, RouteIdentifier};
