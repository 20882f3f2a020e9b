use battery_bridge_protocol::BatteryStatus;
use futures::stream::LocalBoxStream;

use crate::error::Result;

/// Normalized battery changes from an open platform subscription.
pub type StatusStream = LocalBoxStream<'static, BatteryStatus>;

/// The platform subscription a [`crate::ListenerRegistry`] multiplexes.
///
/// `open` may await a round trip to the platform before returning. The
/// registry cancels its pump and waits for it to finish, so the stream is
/// already dropped when `close` runs.
#[allow(async_fn_in_trait)]
pub trait EventSource {
    async fn open(&mut self) -> Result<StatusStream>;

    async fn close(&mut self) -> Result<()>;
}
