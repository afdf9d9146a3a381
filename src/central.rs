use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Result;

/// Opaque, transport-agnostic peripheral identifier
///
/// For the `btleplug` backend this is the platform peripheral id rendered as
/// a string; fakes can use whatever they like. The link only ever compares
/// ids for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap a transport-level identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Asynchronous event emitted by the transport
///
/// The transport serializes its own events: the supervisor consumes them from
/// a single receiver, so no two events are ever handled in parallel. Events
/// do, however, run concurrently with the command pump and input sampling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A peripheral was discovered (or re-advertised) during a scan
    Discovered {
        /// Transport handle for the peripheral
        device: DeviceId,
        /// Advertised local name, if the advertisement carried one
        name: Option<String>,
    },
    /// A previously connected peripheral dropped the link
    ///
    /// May arrive at any time, including mid-send.
    Disconnected {
        /// Transport handle for the peripheral
        device: DeviceId,
    },
}

/// Central-role BLE transport boundary
///
/// The production implementation is [`BtleplugCentral`](crate::BtleplugCentral);
/// tests substitute fakes. All methods are asynchronous and none may block the
/// caller beyond issuing the request to the radio.
#[async_trait]
pub trait Central: Send + Sync + 'static {
    /// Writable endpoint handle resolved during discovery
    ///
    /// Held in the [`ChannelTable`](crate::ChannelTable) and passed back to
    /// [`write_without_response`](Central::write_without_response).
    type Endpoint: Clone + Send + Sync + fmt::Debug + 'static;

    /// Subscribe to the transport's event stream
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Ble`](crate::LinkError::Ble) if the underlying
    /// adapter cannot produce an event stream.
    async fn events(&self) -> Result<mpsc::UnboundedReceiver<TransportEvent>>;

    /// Begin scanning for all visible peripherals, unfiltered
    ///
    /// # Errors
    ///
    /// Returns a transport error if the scan cannot be started.
    async fn start_scan(&self) -> Result<()>;

    /// Stop an in-progress scan
    ///
    /// # Errors
    ///
    /// Returns a transport error if the scan cannot be stopped.
    async fn stop_scan(&self) -> Result<()>;

    /// Connect to a discovered peripheral
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::ConnectFailed`](crate::LinkError::ConnectFailed)
    /// or [`LinkError::PeripheralNotFound`](crate::LinkError::PeripheralNotFound)
    /// when the link cannot be established.
    async fn connect(&self, device: &DeviceId) -> Result<()>;

    /// Discover the robot service's characteristics on a connected peripheral
    ///
    /// Returns every characteristic found under the robot service as
    /// `(uuid, endpoint)` pairs, ready for
    /// [`ChannelTable::from_discovered`](crate::ChannelTable::from_discovered).
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::ServiceNotFound`](crate::LinkError::ServiceNotFound)
    /// if the peripheral does not carry the robot service (wrong device), or a
    /// transport error if discovery itself fails.
    async fn discover_channels(&self, device: &DeviceId)
        -> Result<Vec<(Uuid, Self::Endpoint)>>;

    /// Issue a single fire-and-forget write to a resolved endpoint
    ///
    /// # Errors
    ///
    /// Returns a transport error if the write cannot be queued. Callers in
    /// the send path treat this as a dropped sample, not a failure.
    async fn write_without_response(
        &self,
        endpoint: &Self::Endpoint,
        payload: &[u8],
    ) -> Result<()>;

    /// Tear down the link to a peripheral
    ///
    /// # Errors
    ///
    /// Returns a transport error if the disconnect request fails.
    async fn disconnect(&self, device: &DeviceId) -> Result<()>;
}
