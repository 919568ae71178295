// src/core/router/mod.rs

//! The membership-aware client router.
//!
//! A router turns a routing key into a client handle for the node that owns the key.
//! Handles are cached per node address, built on first use, and dropped when the
//! membership layer reports the node as faulty or gone. Key -> address resolution is
//! never cached: every call asks the membership layer, so ownership moves are picked
//! up immediately.

mod cache;
pub mod listener;

use crate::config::RouterConfig;
use crate::core::RouterError;
use crate::core::membership::{MemberChange, MembershipEvent, MembershipProvider};
use crate::core::metrics;
use crate::core::transport::{ClientFactory, TransportChannel};
use cache::{CacheEntry, ClientCache};
use listener::{MembershipHandler, MembershipListener};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Something that can hand out a client for a routing key.
pub trait Router: Send + Sync {
    type Client;

    fn get_client(&self, key: &str) -> Result<Self::Client, RouterError>;
}

/// Routes keys to per-node client handles, building each handle at most once per
/// node and forgetting it when the node becomes unreachable.
pub struct ClientRouter<M, F, T>
where
    M: MembershipProvider,
    T: TransportChannel,
    F: ClientFactory<T::Client>,
{
    membership: Arc<M>,
    factory: Arc<F>,
    channel: Arc<T>,
    /// The service name remote clients are bound to.
    service_name: String,
    metrics_enabled: bool,
    cache: ClientCache<F::Client>,
    shutdown_tx: broadcast::Sender<()>,
    listener_task: Mutex<Option<JoinHandle<()>>>,
}

impl<M, F, T> ClientRouter<M, F, T>
where
    M: MembershipProvider,
    T: TransportChannel,
    F: ClientFactory<T::Client>,
{
    /// Creates a router with the default configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime, since the membership listener is
    /// spawned as a task.
    pub fn new(membership: Arc<M>, factory: Arc<F>, channel: Arc<T>) -> Arc<Self> {
        Self::with_config(membership, factory, channel, RouterConfig::default())
    }

    /// Creates a router and registers it as a membership listener before returning.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn with_config(
        membership: Arc<M>,
        factory: Arc<F>,
        channel: Arc<T>,
        config: RouterConfig,
    ) -> Arc<Self> {
        let service_name = config
            .service_name
            .clone()
            .unwrap_or_else(|| channel.service_name().to_string());

        // Subscribe first so no event emitted after construction can be missed.
        let events_rx = membership.subscribe();
        let (shutdown_tx, _) = broadcast::channel(1);

        let router = Arc::new(Self {
            membership,
            factory,
            channel,
            service_name,
            metrics_enabled: config.metrics_enabled,
            cache: ClientCache::new(config.metrics_enabled),
            shutdown_tx,
            listener_task: Mutex::new(None),
        });

        let weak_router = Arc::downgrade(&router);
        let handler: Weak<dyn MembershipHandler> = weak_router;
        let listener = MembershipListener::new(handler, events_rx);
        let shutdown_rx = router.shutdown_tx.subscribe();
        let task = tokio::spawn(listener.run(shutdown_rx));
        *router.listener_task.lock() = Some(task);

        info!(
            "Client router started for service '{}'.",
            router.service_name
        );
        router
    }

    /// Returns a client handle for the node that owns `key`.
    ///
    /// Concurrent calls that resolve to the same node all get the same handle, and the
    /// factory is invoked once for it. Errors from the membership layer, the transport
    /// or the factory are returned as-is and leave the cache untouched.
    pub fn get_client(&self, key: &str) -> Result<F::Client, RouterError> {
        let dest = self.membership.lookup(key).inspect_err(|e| {
            debug!("Lookup for key '{}' failed: {}", key, e);
            self.record_error("lookup");
        })?;

        if let Some(client) = self.cache.get(&dest) {
            self.record_hit("fast");
            return Ok(client);
        }

        // No match so far. Build under the exclusive lock; the cache re-checks first.
        let entry = self
            .cache
            .get_or_try_insert_with(&dest, || self.build_client(&dest))?;

        match &entry {
            CacheEntry::Existing(_) => self.record_hit("recheck"),
            CacheEntry::Inserted(_) => {
                if self.metrics_enabled {
                    metrics::CACHE_MISSES_TOTAL.inc();
                }
            }
        }
        Ok(entry.into_inner())
    }

    /// Builds a local or remote handle for `dest`. Runs under the cache write lock.
    fn build_client(&self, dest: &str) -> Result<F::Client, RouterError> {
        let me = self.membership.who_am_i().inspect_err(|e| {
            warn!("Could not determine local address: {}", e);
            self.record_error("whoami");
        })?;

        let built = if dest == me {
            self.factory.get_local_client().map(|c| (c, "local"))
        } else {
            self.channel
                .new_client(&self.service_name, dest)
                .and_then(|transport| self.factory.make_remote_client(transport))
                .map(|c| (c, "remote"))
        };

        match built {
            Ok((client, kind)) => {
                info!("Created {} client for {}", kind, dest);
                if self.metrics_enabled {
                    metrics::CLIENTS_CREATED_TOTAL
                        .with_label_values(&[kind])
                        .inc();
                }
                Ok(client)
            }
            Err(e) => {
                warn!("Failed to construct client for {}: {}", dest, e);
                self.record_error("construct");
                Err(e)
            }
        }
    }

    /// Drops the cached handle for `address`, if any. Never fails; returns whether a
    /// handle was actually dropped.
    pub fn remove_client(&self, address: &str) -> bool {
        let removed = self.cache.remove(address);
        if removed {
            if self.metrics_enabled {
                metrics::EVICTIONS_TOTAL.inc();
            }
            info!("Evicted cached client for {}", address);
        }
        removed
    }

    fn handle_change(&self, change: &MemberChange) {
        if change.is_malformed() {
            warn!(
                "Skipping malformed membership change with empty address (status {}).",
                change.status
            );
            return;
        }
        if change.status.is_unreachable() {
            debug!(
                "Member {} is now {} (incarnation {}).",
                change.address, change.status, change.incarnation
            );
            self.remove_client(&change.address);
        }
    }

    /// Stops the membership listener and waits for it to exit. Cached clients stay
    /// usable, but no further evictions will happen.
    pub async fn shutdown(&self) {
        // An error only means the listener is already gone.
        let _ = self.shutdown_tx.send(());
        let task = self.listener_task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// The service name remote clients are created for.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Returns `true` if a handle for `address` is cached.
    pub fn contains(&self, address: &str) -> bool {
        self.cache.contains(address)
    }

    /// Returns the cached addresses, sorted.
    pub fn cached_addresses(&self) -> Vec<String> {
        self.cache.addresses()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record_hit(&self, path: &str) {
        if self.metrics_enabled {
            metrics::CACHE_HITS_TOTAL.with_label_values(&[path]).inc();
        }
    }

    fn record_error(&self, stage: &str) {
        if self.metrics_enabled {
            metrics::ROUTE_ERRORS_TOTAL.with_label_values(&[stage]).inc();
        }
    }
}

impl<M, F, T> MembershipHandler for ClientRouter<M, F, T>
where
    M: MembershipProvider,
    T: TransportChannel,
    F: ClientFactory<T::Client>,
{
    fn handle_event(&self, event: &MembershipEvent) {
        match event {
            MembershipEvent::ChangesReceived(changes) => {
                for change in changes {
                    self.handle_change(change);
                }
            }
            other => debug!("Ignoring membership event: {:?}", other),
        }
    }
}

impl<M, F, T> Router for ClientRouter<M, F, T>
where
    M: MembershipProvider,
    T: TransportChannel,
    F: ClientFactory<T::Client>,
{
    type Client = F::Client;

    fn get_client(&self, key: &str) -> Result<Self::Client, RouterError> {
        ClientRouter::get_client(self, key)
    }
}
