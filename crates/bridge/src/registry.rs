use std::cell::RefCell;
use std::rc::Rc;

use battery_bridge_protocol::{BatteryStatus, ListenerId};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::events::{EventSource, StatusStream};

type Callback = Rc<dyn Fn(BatteryStatus)>;
type Listeners = Rc<RefCell<Vec<(ListenerId, Callback)>>>;

/// Fans one platform subscription out to any number of listeners.
///
/// The subscription is opened when the first listener registers and released
/// as soon as the last one is removed. Listeners are called in registration
/// order.
///
/// Must be used from within a [`tokio::task::LocalSet`].
pub struct ListenerRegistry<E: EventSource> {
    events: E,
    listeners: Listeners,
    next_id: u64,
    pump: Option<JoinHandle<()>>,
}

impl<E: EventSource> ListenerRegistry<E> {
    pub fn new(events: E) -> Self {
        Self {
            events,
            listeners: Rc::new(RefCell::new(Vec::new())),
            next_id: 0,
            pump: None,
        }
    }

    /// Registers a listener and returns its id.
    ///
    /// If the platform subscription cannot be opened the failure is logged
    /// and the listener stays registered; the next `subscribe` tries again.
    pub async fn subscribe<F>(&mut self, callback: F) -> ListenerId
    where
        F: Fn(BatteryStatus) + 'static,
    {
        let id = self.generate_id();
        self.listeners
            .borrow_mut()
            .push((id.clone(), Rc::new(callback)));
        debug!(id = %id, count = self.listener_count(), "Listener registered");

        if !self.is_listening() {
            self.open().await;
        }

        id
    }

    /// Removes a listener. Unknown ids are ignored.
    pub async fn unsubscribe(&mut self, id: &ListenerId) {
        let remaining = {
            let mut listeners = self.listeners.borrow_mut();
            let before = listeners.len();
            listeners.retain(|(entry, _)| entry != id);
            if listeners.len() == before {
                debug!(id = %id, "Ignoring removal of unknown listener");
                return;
            }
            listeners.len()
        };
        debug!(id = %id, count = remaining, "Listener removed");

        if remaining == 0 {
            self.release().await;
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// True while a platform subscription is open and delivering events.
    pub fn is_listening(&self) -> bool {
        self.pump.as_ref().is_some_and(|pump| !pump.is_finished())
    }

    fn generate_id(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId::new(format!("battery_listener_{}", self.next_id))
    }

    async fn open(&mut self) {
        match self.events.open().await {
            Ok(stream) => {
                let listeners = Rc::clone(&self.listeners);
                self.pump = Some(tokio::task::spawn_local(pump(stream, listeners)));
                info!("Platform battery subscription opened");
            }
            Err(e) => {
                warn!(error = %e, "Failed to open platform battery subscription");
            }
        }
    }

    async fn release(&mut self) {
        let Some(pump) = self.pump.take() else {
            return;
        };
        pump.abort();
        // Wait for the cancelled pump so its stream is gone before `close`.
        let _ = pump.await;

        match self.events.close().await {
            Ok(()) => info!("Platform battery subscription released"),
            Err(e) => warn!(error = %e, "Error releasing platform battery subscription"),
        }
    }
}

impl<E: EventSource> Drop for ListenerRegistry<E> {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

async fn pump(mut stream: StatusStream, listeners: Listeners) {
    while let Some(status) = stream.next().await {
        // Snapshot so listeners added or removed mid-dispatch don't alias the borrow.
        let callbacks: Vec<Callback> = listeners
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();

        trace!(
            level = status.level,
            status = %status.status,
            listeners = callbacks.len(),
            "Dispatching battery change"
        );

        for callback in callbacks {
            callback(status);
        }
    }
    debug!("Platform battery event stream ended");
}
