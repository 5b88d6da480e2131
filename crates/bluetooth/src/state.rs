//! A2DP link state tracker.

use platform::ConnectionState;

/// What a state report changed, from the player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkChange {
    /// The link became usable.
    Up,
    /// The link stopped being usable.
    Down,
    /// Nothing the player reacts to (e.g. `Connecting`, or a repeat).
    None,
}

/// Tracks the A2DP link state and, while connected, the peer's address.
pub struct ConnectionTracker {
    state: ConnectionState,
    peer_address: Option<[u8; 6]>,
}

impl ConnectionTracker {
    /// Create a new, disconnected tracker.
    pub const fn new() -> Self {
        ConnectionTracker {
            state: ConnectionState::Disconnected,
            peer_address: None,
        }
    }

    /// Record a state report from the stack.
    ///
    /// `address` is kept only while connected.
    pub fn on_state(&mut self, state: ConnectionState, address: Option<[u8; 6]>) -> LinkChange {
        let was_connected = self.state.is_connected();
        self.state = state;
        if state.is_connected() {
            if address.is_some() {
                self.peer_address = address;
            }
        } else {
            self.peer_address = None;
        }
        match (was_connected, state.is_connected()) {
            (false, true) => LinkChange::Up,
            (true, false) => LinkChange::Down,
            _ => LinkChange::None,
        }
    }

    /// Last reported state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns `true` if a peer is currently connected.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Returns the peer's 6-byte Bluetooth address, or `None` when disconnected.
    #[must_use]
    pub fn peer_address(&self) -> Option<[u8; 6]> {
        self.peer_address
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectionTracker, LinkChange};
    use platform::ConnectionState;

    const ADDR: [u8; 6] = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];

    #[test]
    fn test_starts_disconnected() {
        let tracker = ConnectionTracker::new();
        assert!(!tracker.connected());
        assert_eq!(tracker.state(), ConnectionState::Disconnected);
        assert_eq!(tracker.peer_address(), None);
    }

    #[test]
    fn test_connecting_is_not_up() {
        let mut tracker = ConnectionTracker::new();
        assert_eq!(tracker.on_state(ConnectionState::Connecting, None), LinkChange::None);
        assert!(!tracker.connected());
    }

    #[test]
    fn test_connect_records_peer() {
        let mut tracker = ConnectionTracker::new();
        tracker.on_state(ConnectionState::Connecting, None);
        assert_eq!(tracker.on_state(ConnectionState::Connected, Some(ADDR)), LinkChange::Up);
        assert!(tracker.connected());
        assert_eq!(tracker.peer_address(), Some(ADDR));
    }

    #[test]
    fn test_repeat_connected_is_no_change() {
        let mut tracker = ConnectionTracker::new();
        tracker.on_state(ConnectionState::Connected, Some(ADDR));
        assert_eq!(tracker.on_state(ConnectionState::Connected, None), LinkChange::None);
        assert_eq!(tracker.peer_address(), Some(ADDR));
    }

    #[test]
    fn test_disconnect_clears_peer() {
        let mut tracker = ConnectionTracker::new();
        tracker.on_state(ConnectionState::Connected, Some(ADDR));
        assert_eq!(tracker.on_state(ConnectionState::Disconnecting, None), LinkChange::Down);
        assert_eq!(tracker.peer_address(), None);
        assert_eq!(tracker.on_state(ConnectionState::Disconnected, None), LinkChange::None);
    }
}
