//! Battery source trait and the raw reading it produces.

use color_eyre::eyre::Result;

use crate::types::ChargeState;

/// Raw battery reading, straight from the OS.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatteryReading {
    /// Current charge level as a percentage (0-100), unrounded.
    pub charge_percent: f32,

    /// Current charging state.
    pub state: ChargeState,

    /// Whether external power is connected.
    pub external_connected: bool,
}

impl BatteryReading {
    pub fn new(charge_percent: f32, state: ChargeState) -> Self {
        Self {
            charge_percent,
            state,
            external_connected: state.is_plugged_in(),
        }
    }

    /// Charge level rounded to the nearest whole percent, clamped to 0-100.
    pub fn level(&self) -> u8 {
        if self.charge_percent.is_nan() {
            return 0;
        }
        self.charge_percent.round().clamp(0.0, 100.0) as u8
    }

    pub fn is_charging(&self) -> bool {
        self.state.is_charging()
    }
}

/// A platform-supplied battery API.
///
/// `Ok(None)` means the API is present but reports no battery (or the API
/// is missing altogether); `Err` is a failed read.
pub trait BatterySource {
    /// Read the battery state as it is right now.
    fn read(&mut self) -> Result<Option<BatteryReading>>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Source for systems without any battery API.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBattery;

impl BatterySource for NoBattery {
    fn read(&mut self) -> Result<Option<BatteryReading>> {
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_rounds_to_nearest() {
        assert_eq!(BatteryReading::new(14.4, ChargeState::Discharging).level(), 14);
        assert_eq!(BatteryReading::new(14.5, ChargeState::Discharging).level(), 15);
        assert_eq!(BatteryReading::new(99.6, ChargeState::Charging).level(), 100);
    }

    #[test]
    fn test_level_is_clamped() {
        assert_eq!(BatteryReading::new(-3.0, ChargeState::Unknown).level(), 0);
        assert_eq!(BatteryReading::new(104.2, ChargeState::Full).level(), 100);
        assert_eq!(BatteryReading::new(f32::NAN, ChargeState::Unknown).level(), 0);
    }

    #[test]
    fn test_new_infers_external_power() {
        assert!(BatteryReading::new(50.0, ChargeState::NotCharging).external_connected);
        assert!(!BatteryReading::new(50.0, ChargeState::Discharging).external_connected);
    }

    #[test]
    fn test_no_battery_reads_nothing() {
        let mut source = NoBattery;
        assert!(source.read().unwrap().is_none());
        assert_eq!(source.name(), "none");
    }
}
