use std::cell::RefCell;
use std::rc::Rc;

use battery_bridge_platform::{BatteryReading, BatterySource, NoBattery, SystemBattery};
use battery_bridge_protocol::BatteryStatus;
use tracing::{debug, warn};

/// A battery source shared between queries and the event poller.
pub type SharedSource = Rc<RefCell<dyn BatterySource>>;

/// The OS battery if one can be opened, otherwise [`NoBattery`].
pub fn default_source() -> SharedSource {
    match SystemBattery::new() {
        Ok(battery) => Rc::new(RefCell::new(battery)),
        Err(e) => {
            warn!(error = %e, "System battery API unavailable, reporting fallback status");
            Rc::new(RefCell::new(NoBattery))
        }
    }
}

/// Maps a raw reading to the host-facing status record.
pub fn normalize(reading: &BatteryReading) -> BatteryStatus {
    BatteryStatus::derive(reading.level(), reading.is_charging())
}

/// Reads the current battery state and normalizes it.
///
/// Never fails: a missing battery or a failed read yields
/// [`BatteryStatus::unavailable`].
#[derive(Clone)]
pub struct StatusNormalizer {
    source: SharedSource,
}

impl StatusNormalizer {
    pub fn new(source: SharedSource) -> Self {
        Self { source }
    }

    pub fn query(&self) -> BatteryStatus {
        self.read()
            .map(|reading| normalize(&reading))
            .unwrap_or_else(BatteryStatus::unavailable)
    }

    /// The raw reading, or `None` when the source has nothing to report.
    pub fn read(&self) -> Option<BatteryReading> {
        let mut source = self.source.borrow_mut();
        match source.read() {
            Ok(reading) => reading,
            Err(e) => {
                debug!(source = source.name(), error = %e, "Battery read failed");
                None
            }
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.borrow().name()
    }
}
