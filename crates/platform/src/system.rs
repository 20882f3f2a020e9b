use std::path::PathBuf;

use color_eyre::eyre::Result;
use starship_battery::units::ratio::percent;
use starship_battery::Manager;

use crate::battery::{BatteryReading, BatterySource};
use crate::types::ChargeState;

/// The OS battery, read through starship-battery.
///
/// Only the first battery the OS lists is reported.
pub struct SystemBattery {
    manager: Manager,
    #[cfg_attr(not(all(target_os = "linux", feature = "linux")), allow(dead_code))]
    battery_path: Option<PathBuf>,
}

impl SystemBattery {
    pub fn new() -> Result<Self> {
        let manager = Manager::new()?;
        Ok(Self {
            manager,
            battery_path: sysfs_battery_path(),
        })
    }

    #[cfg(all(target_os = "linux", feature = "linux"))]
    fn refine(&self, reading: &mut BatteryReading) {
        crate::linux::refine_state(
            reading,
            self.battery_path.as_deref(),
            std::path::Path::new(crate::linux::POWER_SUPPLY_PATH),
        );
    }

    #[cfg(not(all(target_os = "linux", feature = "linux")))]
    fn refine(&self, _reading: &mut BatteryReading) {}
}

impl BatterySource for SystemBattery {
    fn read(&mut self) -> Result<Option<BatteryReading>> {
        let mut battery = match self.manager.batteries()?.next() {
            Some(battery) => battery?,
            None => return Ok(None),
        };

        self.manager.refresh(&mut battery)?;

        let mut reading = BatteryReading::new(
            battery.state_of_charge().get::<percent>(),
            ChargeState::from(battery.state()),
        );
        self.refine(&mut reading);

        tracing::trace!(
            percent = reading.charge_percent,
            state = %reading.state,
            "Read system battery"
        );

        Ok(Some(reading))
    }

    fn name(&self) -> &'static str {
        "system"
    }
}

#[cfg(all(target_os = "linux", feature = "linux"))]
fn sysfs_battery_path() -> Option<PathBuf> {
    crate::linux::find_battery_path(std::path::Path::new(crate::linux::POWER_SUPPLY_PATH))
}

#[cfg(not(all(target_os = "linux", feature = "linux")))]
fn sysfs_battery_path() -> Option<PathBuf> {
    None
}
