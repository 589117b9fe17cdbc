//! Connection lifecycle state.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of the single point-to-point connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LinkState {
    Disconnected = 0x00,
    Connecting = 0x01,
    Connected = 0x02,
}

impl LinkState {
    fn from_u8(value: u8) -> Self {
        // only values stored through LinkStatus ever come back out
        match value {
            0x01 => LinkState::Connecting,
            0x02 => LinkState::Connected,
            _ => LinkState::Disconnected,
        }
    }
}

/// Shared state holder for the link lifecycle.
///
/// One instance per link, shared by the connection manager, write path, and
/// read loop. Transitions are compare-and-swap over the legal edges only:
/// Disconnected->Connecting, Connecting->Connected, Connecting->Disconnected,
/// Connected->Disconnected. An illegal transition leaves the state untouched.
#[derive(Debug)]
pub struct LinkStatus(AtomicU8);

impl LinkStatus {
    pub fn new() -> Self {
        Self(AtomicU8::new(LinkState::Disconnected as u8))
    }

    pub fn get(&self) -> LinkState {
        LinkState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Attempt to move to `next`. Returns whether a legal edge was taken.
    pub fn advance(&self, next: LinkState) -> bool {
        let legal_from: &[LinkState] = match next {
            LinkState::Connecting => &[LinkState::Disconnected],
            LinkState::Connected => &[LinkState::Connecting],
            LinkState::Disconnected => &[LinkState::Connecting, LinkState::Connected],
        };

        for &from in legal_from {
            if self
                .0
                .compare_exchange(from as u8, next as u8, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }

        tracing::debug!(
            "ignoring illegal link state transition {:?} -> {:?}",
            self.get(),
            next
        );
        false
    }
}

impl Default for LinkStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lifecycle_edges() {
        let status = LinkStatus::new();
        assert_eq!(status.get(), LinkState::Disconnected);

        assert!(status.advance(LinkState::Connecting));
        assert_eq!(status.get(), LinkState::Connecting);

        assert!(status.advance(LinkState::Connected));
        assert_eq!(status.get(), LinkState::Connected);

        assert!(status.advance(LinkState::Disconnected));
        assert_eq!(status.get(), LinkState::Disconnected);
    }

    #[test]
    fn test_failed_handshake_edge() {
        let status = LinkStatus::new();
        assert!(status.advance(LinkState::Connecting));
        assert!(status.advance(LinkState::Disconnected));
        assert_eq!(status.get(), LinkState::Disconnected);
    }

    #[test]
    fn test_illegal_edges_leave_state_untouched() {
        let status = LinkStatus::new();

        // cannot skip Connecting
        assert!(!status.advance(LinkState::Connected));
        assert_eq!(status.get(), LinkState::Disconnected);

        // no self-loop on Disconnected
        assert!(!status.advance(LinkState::Disconnected));
        assert_eq!(status.get(), LinkState::Disconnected);

        // cannot re-enter Connecting from Connected
        assert!(status.advance(LinkState::Connecting));
        assert!(status.advance(LinkState::Connected));
        assert!(!status.advance(LinkState::Connecting));
        assert_eq!(status.get(), LinkState::Connected);
    }

    #[test]
    fn test_state_byte_values() {
        assert_eq!(LinkState::Disconnected as u8, 0x00);
        assert_eq!(LinkState::Connecting as u8, 0x01);
        assert_eq!(LinkState::Connected as u8, 0x02);
    }
}
