use lib_live::{BroadcastHub, ReadPath, SessionLimits};
use tokio_util::sync::CancellationToken;

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub hub: BroadcastHub,
    pub read: ReadPath,
    pub limits: SessionLimits,
    /// Cancelled once on shutdown; open sockets and streams close when it fires.
    pub shutdown: CancellationToken,
}
