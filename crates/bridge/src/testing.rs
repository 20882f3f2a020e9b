//! Test doubles for battery sources and event sources.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use battery_bridge_platform::{BatteryReading, BatterySource};
use battery_bridge_protocol::BatteryStatus;
use color_eyre::eyre::{eyre, Result as EyreResult};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::error::{BridgeError, Result};
use crate::events::{EventSource, StatusStream};
use crate::normalizer::SharedSource;

/// A battery whose reading the test controls.
#[derive(Clone, Default)]
pub struct FakeSource {
    reading: Rc<Cell<Option<BatteryReading>>>,
    failing: Rc<Cell<bool>>,
}

impl FakeSource {
    pub fn with(reading: BatteryReading) -> Self {
        let source = Self::default();
        source.set(Some(reading));
        source
    }

    pub fn set(&self, reading: Option<BatteryReading>) {
        self.reading.set(reading);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn shared(&self) -> SharedSource {
        Rc::new(RefCell::new(self.clone()))
    }
}

impl BatterySource for FakeSource {
    fn read(&mut self) -> EyreResult<Option<BatteryReading>> {
        if self.failing.get() {
            return Err(eyre!("simulated read failure"));
        }
        Ok(self.reading.get())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// An event source driven by hand. Clones share state, so the test keeps
/// one clone while the registry owns another.
#[derive(Clone, Default)]
pub struct ChannelEvents {
    sender: Rc<RefCell<Option<mpsc::UnboundedSender<BatteryStatus>>>>,
    opens: Rc<Cell<usize>>,
    closes: Rc<Cell<usize>>,
    fail_open: Rc<Cell<bool>>,
    alive_at_close: Rc<Cell<bool>>,
}

impl ChannelEvents {
    /// Pushes a platform event. Returns false when no subscription is open.
    pub fn emit(&self, status: BatteryStatus) -> bool {
        self.sender
            .borrow()
            .as_ref()
            .is_some_and(|tx| tx.send(status).is_ok())
    }

    /// Ends the open stream, as if the platform went away.
    pub fn hang_up(&self) {
        self.sender.borrow_mut().take();
    }

    pub fn opens(&self) -> usize {
        self.opens.get()
    }

    pub fn closes(&self) -> usize {
        self.closes.get()
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.set(fail);
    }

    /// Whether the last `close` found the stream still held by someone.
    pub fn stream_alive_at_close(&self) -> bool {
        self.alive_at_close.get()
    }
}

impl EventSource for ChannelEvents {
    async fn open(&mut self) -> Result<StatusStream> {
        if self.fail_open.get() {
            return Err(BridgeError::Unavailable("channel"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.borrow_mut() = Some(tx);
        self.opens.set(self.opens.get() + 1);
        Ok(UnboundedReceiverStream::new(rx).boxed_local())
    }

    async fn close(&mut self) -> Result<()> {
        let alive = self
            .sender
            .borrow()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed());
        self.alive_at_close.set(alive);
        self.sender.borrow_mut().take();
        self.closes.set(self.closes.get() + 1);
        Ok(())
    }
}

/// Lets spawned local tasks run until they block again.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Collects every status a listener receives.
#[derive(Clone, Default)]
pub struct Received(Rc<RefCell<Vec<BatteryStatus>>>);

impl Received {
    pub fn listener(&self) -> impl Fn(BatteryStatus) + 'static {
        let received = Rc::clone(&self.0);
        move |status| received.borrow_mut().push(status)
    }

    pub fn all(&self) -> Vec<BatteryStatus> {
        self.0.borrow().clone()
    }
}
