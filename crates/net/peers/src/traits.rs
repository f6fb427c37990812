//! Trait for connection handles tracked by the peer store.

use std::fmt::Debug;

use crate::state::ConnectionState;

/// Outbound connection handle owned by the store on behalf of the node.
///
/// Handles are cheap to clone; all clones observe the same underlying connection.
/// State transitions happen in the background and are only visible by polling
/// [`NetConnection::state`].
pub trait NetConnection: Clone + Debug + Send + Sync + 'static {
    fn state(&self) -> ConnectionState;

    /// Close the connection. The handle moves to `Shutdown` and stays there.
    fn close(&self);

    fn is_ready(&self) -> bool {
        self.state().is_ready()
    }
}
