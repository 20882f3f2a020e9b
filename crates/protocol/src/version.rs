//! Protocol versioning for monitor IPC.
//!
//! | Version | Changes |
//! |---------|---------|
//! | 1 | `getBatteryInfo`, listener registration, `batteryChanged` events |
//!
//! Removing or renaming a field of [`crate::BatteryStatus`], or removing a
//! request variant, breaks hosts built against an older monitor and needs a
//! `PROTOCOL_VERSION` bump. New request variants and new defaulted fields do
//! not.

/// Current protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Oldest protocol version this build still talks to.
pub const MIN_SUPPORTED_VERSION: u32 = 1;
