mod server;

pub use server::run_monitor;

use battery_bridge::is_monitor_running;

use crate::config::socket_path;

pub fn is_running() -> bool {
    is_monitor_running(&socket_path())
}
