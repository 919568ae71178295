// src/core/mod.rs

//! The central module containing the routing logic and its collaborator seams.

pub mod errors;
pub mod membership;
pub mod metrics;
pub mod router;
pub mod transport;

pub use errors::RouterError;
pub use membership::{MemberChange, MemberStatus, MembershipEvent, MembershipProvider};
pub use router::listener::{MembershipHandler, MembershipListener};
pub use router::{ClientRouter, Router};
pub use transport::{ClientFactory, TransportChannel};
