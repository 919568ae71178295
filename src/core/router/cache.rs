// src/core/router/cache.rs

//! The address -> client handle map behind every router.

use crate::core::metrics;
use parking_lot::RwLock;
use std::collections::HashMap;

/// The outcome of a get-or-insert on the cache.
#[derive(Debug)]
pub(crate) enum CacheEntry<C> {
    /// Another caller inserted the entry between our shared-lock miss and our
    /// exclusive-lock re-check.
    Existing(C),
    /// We built the handle and inserted it.
    Inserted(C),
}

impl<C> CacheEntry<C> {
    pub(crate) fn into_inner(self) -> C {
        match self {
            CacheEntry::Existing(c) | CacheEntry::Inserted(c) => c,
        }
    }
}

/// A map from node address to client handle guarded by a single reader-writer lock.
///
/// Reads take the shared lock and never block each other. Inserts and removals take
/// the exclusive lock. Construction of a missing handle runs under the exclusive lock,
/// which is what keeps it to one handle per address.
///
/// When `tracked`, the `CACHED_CLIENTS` gauge is adjusted while the exclusive lock is
/// still held, so it moves in the same order as the map itself.
#[derive(Debug)]
pub(crate) struct ClientCache<C> {
    clients: RwLock<HashMap<String, C>>,
    tracked: bool,
}

impl<C: Clone> ClientCache<C> {
    pub(crate) fn new(tracked: bool) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            tracked,
        }
    }

    /// Returns a clone of the cached handle for `addr`, under the shared lock.
    pub(crate) fn get(&self, addr: &str) -> Option<C> {
        self.clients.read().get(addr).cloned()
    }

    /// Takes the exclusive lock, re-checks for `addr`, and only if it is still absent
    /// runs `make` and inserts its result. If `make` fails nothing is inserted.
    pub(crate) fn get_or_try_insert_with<E>(
        &self,
        addr: &str,
        make: impl FnOnce() -> Result<C, E>,
    ) -> Result<CacheEntry<C>, E> {
        let mut clients = self.clients.write();

        if let Some(existing) = clients.get(addr) {
            return Ok(CacheEntry::Existing(existing.clone()));
        }

        let client = make()?;
        clients.insert(addr.to_string(), client.clone());
        if self.tracked {
            metrics::CACHED_CLIENTS.inc();
        }
        Ok(CacheEntry::Inserted(client))
    }

    /// Removes the entry for `addr`. Returns whether there was one.
    pub(crate) fn remove(&self, addr: &str) -> bool {
        let mut clients = self.clients.write();
        let removed = clients.remove(addr).is_some();
        if removed && self.tracked {
            metrics::CACHED_CLIENTS.dec();
        }
        removed
    }

    pub(crate) fn contains(&self, addr: &str) -> bool {
        self.clients.read().contains_key(addr)
    }

    pub(crate) fn len(&self) -> usize {
        self.clients.read().len()
    }

    /// Returns every cached address, sorted.
    pub(crate) fn addresses(&self) -> Vec<String> {
        let mut addrs: Vec<String> = self.clients.read().keys().cloned().collect();
        addrs.sort();
        addrs
    }
}

impl<C> Drop for ClientCache<C> {
    fn drop(&mut self) {
        if self.tracked {
            metrics::CACHED_CLIENTS.sub(self.clients.get_mut().len() as f64);
        }
    }
}
