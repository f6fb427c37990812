//! Connection state of a peer's outbound handle.

use strum::{Display, EnumString, IntoStaticStr};

/// Liveness of a peer's outbound connection handle.
///
/// `NoConnection` is reported when no handle is attached. `Shutdown` is terminal:
/// a closed handle never transitions back on its own.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Ready,
    TransientFailure,
    Shutdown,
    #[default]
    NoConnection,
}

impl ConnectionState {
    /// Parse a wire label. Unknown labels map to `NoConnection`.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }

    pub fn label(&self) -> &'static str {
        self.into()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ConnectionState::Ready)
    }

    /// Handshake still pending.
    pub fn is_pending(&self) -> bool {
        matches!(self, ConnectionState::Idle | ConnectionState::Connecting)
    }
}
