// src/core/transport.rs

//! Client construction seams: the transport channel that knows how to reach a
//! `host:port`, and the service-specific factory that turns a transport client (or
//! nothing, for the local node) into the handle callers actually use.

use crate::core::RouterError;

/// A shared RPC channel able to mint clients bound to a single peer.
///
/// Creating a client is expected to be cheap and must not block on the network;
/// connections are established lazily by the transport itself.
pub trait TransportChannel: Send + Sync + 'static {
    /// The transport-level client handed to [`ClientFactory::make_remote_client`].
    type Client: Send;

    /// The service name this channel was opened for.
    fn service_name(&self) -> &str;

    /// Builds a client that sends calls for `service` to `host_port`.
    fn new_client(&self, service: &str, host_port: &str) -> Result<Self::Client, RouterError>;
}

/// Produces handles for a particular service interface.
///
/// A handle is opaque to the router: it is stored, cloned and returned, nothing else.
/// Handles are shared between every caller routed to the same node, so they should be
/// cheap to clone (typically an `Arc`).
pub trait ClientFactory<R>: Send + Sync + 'static {
    type Client: Clone + Send + Sync + 'static;

    /// Returns a handle that dispatches straight to the in-process implementation.
    fn get_local_client(&self) -> Result<Self::Client, RouterError>;

    /// Wraps a transport client into a handle that dispatches over the network.
    fn make_remote_client(&self, transport: R) -> Result<Self::Client, RouterError>;
}
