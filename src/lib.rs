// src/lib.rs

pub mod config;
pub mod core;

// Re-export
pub use crate::config::RouterConfig;
pub use crate::core::{
    ClientFactory, ClientRouter, MemberChange, MemberStatus, MembershipEvent, MembershipProvider,
    Router, RouterError, TransportChannel,
};
