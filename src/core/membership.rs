// src/core/membership.rs

//! The boundary between the router and the cluster membership layer.
//!
//! The membership layer owns the hash ring and the failure detector. The router only
//! needs three things from it: which node owns a key, which node we are, and a stream
//! of status changes so cached clients for dead nodes can be dropped.

use crate::core::RouterError;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tokio::sync::mpsc;

/// The reachability status of a cluster member, as reported by the failure detector.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MemberStatus {
    /// The member is responding to probes.
    Alive,
    /// The member missed probes but has not been declared dead yet.
    Suspect,
    /// The member has been declared dead.
    Faulty,
    /// The member left the cluster voluntarily.
    #[serde(alias = "left")]
    #[strum(to_string = "leave", serialize = "left")]
    Leave,
}

impl MemberStatus {
    /// Returns `true` if a node in this state must no longer receive traffic.
    pub fn is_unreachable(self) -> bool {
        matches!(self, MemberStatus::Faulty | MemberStatus::Leave)
    }
}

/// A single status transition for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberChange {
    /// The member's `host:port` identity, as returned by `lookup`.
    pub address: String,
    pub status: MemberStatus,
    /// The member's incarnation number. Carried for logging only.
    #[serde(default)]
    pub incarnation: u64,
}

impl MemberChange {
    pub fn new(address: impl Into<String>, status: MemberStatus) -> Self {
        Self {
            address: address.into(),
            status,
            incarnation: 0,
        }
    }

    /// A change without an address cannot be applied to anything.
    pub fn is_malformed(&self) -> bool {
        self.address.trim().is_empty()
    }
}

/// Events emitted by the membership layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipEvent {
    /// An ordered batch of member status changes.
    ChangesReceived(Vec<MemberChange>),
    /// The hash ring was rebuilt. Key ownership may have moved.
    RingChanged {
        added: Vec<String>,
        removed: Vec<String>,
    },
    /// The membership layer finished bootstrapping.
    Ready,
}

/// The membership service a router is bound to.
///
/// `lookup` and `who_am_i` are expected to answer from in-memory state; the router
/// calls `who_am_i` while holding its cache write lock.
pub trait MembershipProvider: Send + Sync + 'static {
    /// Resolves a routing key to the address of the node that owns it.
    fn lookup(&self, key: &str) -> Result<String, RouterError>;

    /// Returns the address of the local node.
    fn who_am_i(&self) -> Result<String, RouterError>;

    /// Registers a new listener and returns the receiving end of its event stream.
    /// Events must be delivered in the order the membership layer produced them.
    fn subscribe(&self) -> mpsc::Receiver<MembershipEvent>;
}
