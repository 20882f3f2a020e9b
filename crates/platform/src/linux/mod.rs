//! Linux sysfs refinements for the system battery source.

mod battery;

pub use battery::{find_battery_path, is_ac_connected, refine_state, POWER_SUPPLY_PATH};
