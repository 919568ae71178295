// src/core/router/listener.rs

//! The background task that feeds membership events into a router.

use crate::core::membership::MembershipEvent;
use std::sync::Weak;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

/// Anything that reacts to membership events. Implemented by `ClientRouter`.
///
/// Membership layers that deliver events through callbacks rather than a channel
/// can call `handle_event` directly.
pub trait MembershipHandler: Send + Sync + 'static {
    fn handle_event(&self, event: &MembershipEvent);
}

/// A task that drains a membership event stream into a handler, in delivery order.
///
/// The listener only holds a weak reference, so it never keeps its router alive.
pub struct MembershipListener {
    /// The router the events are applied to.
    pub handler: Weak<dyn MembershipHandler>,
    /// The stream handed out by `MembershipProvider::subscribe`.
    pub rx: mpsc::Receiver<MembershipEvent>,
}

impl MembershipListener {
    pub fn new(handler: Weak<dyn MembershipHandler>, rx: mpsc::Receiver<MembershipEvent>) -> Self {
        Self { handler, rx }
    }

    /// Runs the main loop for the listener.
    ///
    /// Exits when the event stream closes, when the handler has been dropped, or when
    /// the shutdown channel fires or closes.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        debug!("Membership listener task started.");
        loop {
            tokio::select! {
                maybe_event = self.rx.recv() => {
                    let Some(event) = maybe_event else {
                        info!("Membership event stream closed. Listener exiting.");
                        return;
                    };
                    let Some(handler) = self.handler.upgrade() else {
                        debug!("Router dropped. Membership listener exiting.");
                        return;
                    };
                    handler.handle_event(&event);
                }
                _ = shutdown_rx.recv() => {
                    info!("Membership listener shutting down.");
                    self.rx.close();
                    return;
                }
            }
        }
    }
}
