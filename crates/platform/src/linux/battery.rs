use std::fs;
use std::path::{Path, PathBuf};

use crate::battery::BatteryReading;
use crate::types::ChargeState;

pub const POWER_SUPPLY_PATH: &str = "/sys/class/power_supply";

/// Corrects the charge state with what sysfs knows and starship-battery does not.
///
/// starship-battery maps the kernel's "Not charging" to `Unknown`, and reports
/// a plugged-in battery held below a charge limit as discharging.
pub fn refine_state(reading: &mut BatteryReading, battery_path: Option<&Path>, root: &Path) {
    reading.external_connected = is_ac_connected(root);

    if reading.state != ChargeState::Unknown {
        if reading.external_connected
            && reading.state != ChargeState::Charging
            && reading.state != ChargeState::Full
        {
            reading.state = ChargeState::NotCharging;
        }
        return;
    }

    let Some(path) = battery_path else {
        return;
    };

    if let Ok(status) = fs::read_to_string(path.join("status")) {
        let status = status.trim();
        if status.eq_ignore_ascii_case("Not charging") || reading.external_connected {
            reading.state = ChargeState::NotCharging;
        }
    }
}

pub fn find_battery_path(root: &Path) -> Option<PathBuf> {
    find_supply(root, "Battery")
}

pub fn is_ac_connected(root: &Path) -> bool {
    let Ok(entries) = fs::read_dir(root) else {
        return false;
    };

    entries.flatten().any(|entry| {
        let path = entry.path();
        supply_type(&path).as_deref() == Some("Mains")
            && fs::read_to_string(path.join("online"))
                .map(|online| online.trim() == "1")
                .unwrap_or(false)
    })
}

fn find_supply(root: &Path, kind: &str) -> Option<PathBuf> {
    fs::read_dir(root)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| supply_type(path).as_deref() == Some(kind))
}

fn supply_type(path: &Path) -> Option<String> {
    fs::read_to_string(path.join("type"))
        .ok()
        .map(|content| content.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSysfs {
        root: PathBuf,
    }

    impl FakeSysfs {
        fn new(name: &str) -> Self {
            let root = std::env::temp_dir().join(format!(
                "battery-bridge-sysfs-{}-{}",
                name,
                std::process::id()
            ));
            let _ = fs::remove_dir_all(&root);
            fs::create_dir_all(&root).unwrap();
            Self { root }
        }

        fn supply(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
            let dir = self.root.join(name);
            fs::create_dir_all(&dir).unwrap();
            for (file, content) in files {
                fs::write(dir.join(file), content).unwrap();
            }
            dir
        }
    }

    impl Drop for FakeSysfs {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.root);
        }
    }

    #[test]
    fn test_finds_battery_and_mains() {
        let sysfs = FakeSysfs::new("find");
        sysfs.supply("AC", &[("type", "Mains\n"), ("online", "1\n")]);
        let bat = sysfs.supply("BAT0", &[("type", "Battery\n"), ("status", "Charging\n")]);

        assert_eq!(find_battery_path(&sysfs.root), Some(bat));
        assert!(is_ac_connected(&sysfs.root));
    }

    #[test]
    fn test_offline_mains_is_not_connected() {
        let sysfs = FakeSysfs::new("offline");
        sysfs.supply("AC", &[("type", "Mains\n"), ("online", "0\n")]);
        assert!(!is_ac_connected(&sysfs.root));
        assert!(find_battery_path(&sysfs.root).is_none());
    }

    #[test]
    fn test_unknown_state_with_not_charging_status() {
        let sysfs = FakeSysfs::new("not-charging");
        let bat = sysfs.supply("BAT0", &[("type", "Battery\n"), ("status", "Not charging\n")]);

        let mut reading = BatteryReading::new(80.0, ChargeState::Unknown);
        refine_state(&mut reading, Some(&bat), &sysfs.root);
        assert_eq!(reading.state, ChargeState::NotCharging);
    }

    #[test]
    fn test_plugged_in_discharging_becomes_not_charging() {
        let sysfs = FakeSysfs::new("held");
        sysfs.supply("AC", &[("type", "Mains\n"), ("online", "1\n")]);

        let mut reading = BatteryReading::new(80.0, ChargeState::Discharging);
        refine_state(&mut reading, None, &sysfs.root);
        assert_eq!(reading.state, ChargeState::NotCharging);
        assert!(reading.external_connected);
    }

    #[test]
    fn test_charging_is_left_alone() {
        let sysfs = FakeSysfs::new("charging");
        sysfs.supply("AC", &[("type", "Mains\n"), ("online", "1\n")]);

        let mut reading = BatteryReading::new(40.0, ChargeState::Charging);
        refine_state(&mut reading, None, &sysfs.root);
        assert_eq!(reading.state, ChargeState::Charging);
    }
}
