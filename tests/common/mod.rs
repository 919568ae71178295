// tests/common/mod.rs

//! Shared test doubles for the router's collaborators.
//!
//! `TestMembership` is a hand-driven membership layer: tests decide which node owns
//! which key and push events through the channel it handed to the router.
//! `TestFactory` and `TestChannel` record every construction so tests can count them.

#![allow(dead_code)]

use parking_lot::Mutex;
use ringroute::{
    ClientFactory, ClientRouter, MemberChange, MemberStatus, MembershipEvent, MembershipProvider,
    RouterConfig, RouterError, TransportChannel,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

pub const SELF_ADDR: &str = "10.0.0.1:1";
pub const PEER_ADDR: &str = "10.0.0.2:1";
pub const OTHER_PEER_ADDR: &str = "10.0.0.3:1";
pub const SERVICE: &str = "kv";

pub type TestRouter = ClientRouter<TestMembership, TestFactory, TestChannel>;

/// Sets up minimal tracing for tests (ignores the error if already initialized).
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("warn"))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

// --- Membership ---

pub struct TestMembership {
    me: String,
    owners: Mutex<HashMap<String, String>>,
    lookup_failures: Mutex<HashMap<String, RouterError>>,
    whoami_failure: Mutex<Option<RouterError>>,
    events_tx: Mutex<Option<mpsc::Sender<MembershipEvent>>>,
    pub lookups: AtomicUsize,
    pub subscriptions: AtomicUsize,
}

impl TestMembership {
    pub fn new(me: &str) -> Arc<Self> {
        Arc::new(Self {
            me: me.to_string(),
            owners: Mutex::new(HashMap::new()),
            lookup_failures: Mutex::new(HashMap::new()),
            whoami_failure: Mutex::new(None),
            events_tx: Mutex::new(None),
            lookups: AtomicUsize::new(0),
            subscriptions: AtomicUsize::new(0),
        })
    }

    pub fn set_owner(&self, key: &str, addr: &str) {
        self.owners.lock().insert(key.to_string(), addr.to_string());
    }

    pub fn fail_lookup(&self, key: &str, err: RouterError) {
        self.lookup_failures.lock().insert(key.to_string(), err);
    }

    pub fn fail_who_am_i(&self, err: RouterError) {
        *self.whoami_failure.lock() = Some(err);
    }

    pub fn clear_who_am_i_failure(&self) {
        *self.whoami_failure.lock() = None;
    }

    /// Delivers an event to the subscribed router.
    pub async fn emit(&self, event: MembershipEvent) {
        let tx = self
            .events_tx
            .lock()
            .clone()
            .expect("router should have subscribed");
        tx.send(event).await.expect("listener should be running");
    }

    /// Delivers a single-change batch.
    pub async fn emit_change(&self, addr: &str, status: MemberStatus) {
        self.emit(MembershipEvent::ChangesReceived(vec![MemberChange::new(
            addr, status,
        )]))
        .await;
    }

    /// Drops our end of the event channel, closing the router's stream.
    pub fn close_events(&self) {
        self.events_tx.lock().take();
    }

    pub fn events_sender(&self) -> Option<mpsc::Sender<MembershipEvent>> {
        self.events_tx.lock().clone()
    }
}

impl MembershipProvider for TestMembership {
    fn lookup(&self, key: &str) -> Result<String, RouterError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.lookup_failures.lock().get(key) {
            return Err(err.clone());
        }
        self.owners
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| RouterError::lookup(key, "no owner for key"))
    }

    fn who_am_i(&self) -> Result<String, RouterError> {
        match self.whoami_failure.lock().as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(self.me.clone()),
        }
    }

    fn subscribe(&self) -> mpsc::Receiver<MembershipEvent> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(64);
        *self.events_tx.lock() = Some(tx);
        rx
    }
}

// --- Transport ---

/// The transport-level client minted by `TestChannel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportClient {
    pub service: String,
    pub host_port: String,
}

pub struct TestChannel {
    service_name: String,
    pub created: Mutex<Vec<TransportClient>>,
}

impl TestChannel {
    pub fn new(service_name: &str) -> Arc<Self> {
        Arc::new(Self {
            service_name: service_name.to_string(),
            created: Mutex::new(Vec::new()),
        })
    }
}

impl TransportChannel for TestChannel {
    type Client = TransportClient;

    fn service_name(&self) -> &str {
        &self.service_name
    }

    fn new_client(&self, service: &str, host_port: &str) -> Result<TransportClient, RouterError> {
        let client = TransportClient {
            service: service.to_string(),
            host_port: host_port.to_string(),
        };
        self.created.lock().push(client.clone());
        Ok(client)
    }
}

// --- Factory ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleKind {
    Local,
    Remote(TransportClient),
}

/// The opaque handle handed to callers. `serial` is unique per construction.
#[derive(Debug)]
pub struct TestHandle {
    pub kind: HandleKind,
    pub serial: usize,
}

pub struct TestFactory {
    pub local_calls: AtomicUsize,
    pub remote_calls: AtomicUsize,
    serial: AtomicUsize,
    remote_failure: Mutex<Option<RouterError>>,
    /// Time each construction takes; widens race windows in concurrency tests.
    build_delay: Mutex<Duration>,
}

impl TestFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            local_calls: AtomicUsize::new(0),
            remote_calls: AtomicUsize::new(0),
            serial: AtomicUsize::new(0),
            remote_failure: Mutex::new(None),
            build_delay: Mutex::new(Duration::ZERO),
        })
    }

    pub fn fail_remote(&self, err: Option<RouterError>) {
        *self.remote_failure.lock() = err;
    }

    pub fn set_build_delay(&self, delay: Duration) {
        *self.build_delay.lock() = delay;
    }

    pub fn local_calls(&self) -> usize {
        self.local_calls.load(Ordering::SeqCst)
    }

    pub fn remote_calls(&self) -> usize {
        self.remote_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.local_calls() + self.remote_calls()
    }

    fn next_handle(&self, kind: HandleKind) -> Arc<TestHandle> {
        let delay = *self.build_delay.lock();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Arc::new(TestHandle {
            kind,
            serial: self.serial.fetch_add(1, Ordering::SeqCst),
        })
    }
}

impl ClientFactory<TransportClient> for TestFactory {
    type Client = Arc<TestHandle>;

    fn get_local_client(&self) -> Result<Arc<TestHandle>, RouterError> {
        self.local_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_handle(HandleKind::Local))
    }

    fn make_remote_client(&self, transport: TransportClient) -> Result<Arc<TestHandle>, RouterError> {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.remote_failure.lock().clone() {
            return Err(err);
        }
        Ok(self.next_handle(HandleKind::Remote(transport)))
    }
}

// --- Fixture ---

pub struct Fixture {
    pub membership: Arc<TestMembership>,
    pub factory: Arc<TestFactory>,
    pub channel: Arc<TestChannel>,
    pub router: Arc<TestRouter>,
}

impl Fixture {
    /// A two-node cluster: `SELF_ADDR` is us, `PEER_ADDR` the other node.
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        init_tracing();
        let membership = TestMembership::new(SELF_ADDR);
        let factory = TestFactory::new();
        let channel = TestChannel::new(SERVICE);
        let router = ClientRouter::with_config(
            membership.clone(),
            factory.clone(),
            channel.clone(),
            config,
        );
        Self {
            membership,
            factory,
            channel,
            router,
        }
    }
}

/// Polls `cond` until it holds, panicking after two seconds.
pub async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
