use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{BUTTON_CHAR_UUID, MOVEMENT_CHAR_UUID, ROTATION_CHAR_UUID};

/// Logical command channel
///
/// Each channel maps to one write-only characteristic on the robot's service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Drive vector channel
    Movement,
    /// Rotation vector channel
    Rotation,
    /// Button bitstring channel
    Buttons,
}

impl Channel {
    /// All channels, in table order
    pub const ALL: [Self; 3] = [Self::Movement, Self::Rotation, Self::Buttons];

    /// The characteristic UUID carrying this channel
    #[must_use]
    pub const fn uuid(self) -> Uuid {
        match self {
            Self::Movement => MOVEMENT_CHAR_UUID,
            Self::Rotation => ROTATION_CHAR_UUID,
            Self::Buttons => BUTTON_CHAR_UUID,
        }
    }

    /// Map a discovered characteristic UUID back to its channel
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.uuid() == uuid)
    }

    const fn index(self) -> usize {
        match self {
            Self::Movement => 0,
            Self::Rotation => 1,
            Self::Buttons => 2,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movement => write!(f, "movement"),
            Self::Rotation => write!(f, "rotation"),
            Self::Buttons => write!(f, "buttons"),
        }
    }
}

/// Mapping from logical channels to resolved writable endpoints
///
/// Populated in one pass from a discovery result and swapped in whole, so a
/// reader never observes a half-updated table. `E` is the transport's endpoint
/// handle type ([`Central::Endpoint`](crate::Central::Endpoint)).
#[derive(Debug, Clone)]
pub struct ChannelTable<E> {
    entries: [Option<E>; 3],
}

impl<E> ChannelTable<E> {
    /// An empty table with every channel unresolved
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: [None, None, None],
        }
    }

    /// Build a table from a discovery pass over the robot service
    ///
    /// Each discovered characteristic is matched against the known channel
    /// UUIDs; unmatched characteristics are ignored. A channel whose UUID
    /// never appears stays unresolved — retrying is a whole-connection
    /// concern, not a table concern. If a UUID appears more than once the
    /// first occurrence wins.
    pub fn from_discovered<I>(discovered: I) -> Self
    where
        I: IntoIterator<Item = (Uuid, E)>,
    {
        let mut table = Self::empty();
        for (uuid, endpoint) in discovered {
            if let Some(channel) = Channel::from_uuid(uuid) {
                let slot = &mut table.entries[channel.index()];
                if slot.is_none() {
                    tracing::debug!("Resolved {channel} channel characteristic");
                    *slot = Some(endpoint);
                }
            }
        }
        table
    }

    /// Look up the resolved endpoint for a channel
    #[must_use]
    pub const fn resolve(&self, channel: Channel) -> Option<&E> {
        self.entries[channel.index()].as_ref()
    }

    /// Check whether every channel is resolved
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(Option::is_some)
    }

    /// Check whether no channel is resolved
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }
}

impl<E> Default for ChannelTable<E> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_uuid_round_trip() {
        for channel in Channel::ALL {
            assert_eq!(Channel::from_uuid(channel.uuid()), Some(channel));
        }
        assert_eq!(Channel::from_uuid(crate::ROBOT_SERVICE_UUID), None);
    }

    #[test]
    fn test_resolution_ignores_unknown_characteristics() {
        let table = ChannelTable::from_discovered(vec![
            (MOVEMENT_CHAR_UUID, "move"),
            (crate::ROBOT_SERVICE_UUID, "not-a-channel"),
            (BUTTON_CHAR_UUID, "btn"),
        ]);

        assert_eq!(table.resolve(Channel::Movement), Some(&"move"));
        assert_eq!(table.resolve(Channel::Buttons), Some(&"btn"));
        assert_eq!(table.resolve(Channel::Rotation), None);
        assert!(!table.is_complete());
    }

    #[test]
    fn test_first_occurrence_wins() {
        let table = ChannelTable::from_discovered(vec![
            (MOVEMENT_CHAR_UUID, "first"),
            (MOVEMENT_CHAR_UUID, "second"),
        ]);
        assert_eq!(table.resolve(Channel::Movement), Some(&"first"));
    }

    #[test]
    fn test_empty_table() {
        let table: ChannelTable<u8> = ChannelTable::empty();
        assert!(table.is_empty());
        assert!(!table.is_complete());
        for channel in Channel::ALL {
            assert_eq!(table.resolve(channel), None);
        }
    }

    #[test]
    fn test_idempotent_re_resolution() {
        let discovered = || {
            vec![
                (MOVEMENT_CHAR_UUID, 1u8),
                (ROTATION_CHAR_UUID, 2u8),
                (BUTTON_CHAR_UUID, 3u8),
            ]
        };

        let first = ChannelTable::from_discovered(discovered());
        let second = ChannelTable::from_discovered(discovered());

        assert!(first.is_complete());
        for channel in Channel::ALL {
            assert_eq!(first.resolve(channel), second.resolve(channel));
        }
    }
}
