use battery_bridge::BatteryStatus;
use color_eyre::eyre::Result;

use super::{block_on_local, plugin_for};
use crate::config::UserConfig;

pub fn run(config: &UserConfig, json: bool) -> Result<()> {
    let plugin = plugin_for(config);
    let status = block_on_local(plugin.get_battery_info())??;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status, &plugin.platform().to_string());
    }

    Ok(())
}

fn print_status(status: &BatteryStatus, platform: &str) {
    println!("Battery Status");
    println!("{}", "-".repeat(40));
    println!("Level:        {}%", status.level);
    println!("Status:       {}", status.status.label());
    println!("Charging:     {}", yes_no(status.is_charging));
    println!("Low battery:  {}", yes_no(status.is_low_battery));
    println!("Backend:      {}", platform);
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
