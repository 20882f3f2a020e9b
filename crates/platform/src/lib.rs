//! OS battery sources for battery-bridge.
//!
//! This crate reads raw battery state from the operating system and hands it
//! out as a [`BatteryReading`]. It does not derive the host-facing status
//! record; that happens in the bridge crate.
//!
//! # Features
//!
//! - `linux` - Refine charge state from sysfs (detects "Not charging")
//!
//! # Example
//!
//! ```ignore
//! use battery_bridge_platform::{BatterySource, SystemBattery};
//!
//! let mut source = SystemBattery::new()?;
//! if let Some(reading) = source.read()? {
//!     println!("Charge: {}%", reading.level());
//! }
//! ```

mod battery;
mod system;
mod types;

pub use battery::{BatteryReading, BatterySource, NoBattery};
pub use system::SystemBattery;
pub use types::ChargeState;

#[cfg(target_os = "linux")]
#[cfg(feature = "linux")]
pub mod linux;
