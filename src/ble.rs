use async_trait::async_trait;
use btleplug::{
    api::{
        Central as _, CentralEvent, CharPropFlags, Manager as _, Peripheral as _, ScanFilter,
        WriteType,
    },
    platform::{Adapter, Manager, Peripheral},
};
use futures::stream::StreamExt;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::{
    central::{Central, DeviceId, TransportEvent},
    error::{LinkError, Result},
    ROBOT_SERVICE_UUID,
};

/// Production [`Central`] implementation backed by `btleplug`
///
/// Owns the platform adapter and the set of peripherals seen during the
/// current scan. Exactly one peripheral is held as connected at a time; the
/// supervisor task in [`RobotLink`](crate::RobotLink) decides which.
pub struct BtleplugCentral {
    adapter: Adapter,
    peripherals: Arc<Mutex<HashMap<DeviceId, Peripheral>>>,
    connected: Arc<Mutex<Option<(DeviceId, Peripheral)>>>,
}

impl BtleplugCentral {
    /// Create a central over the first available Bluetooth adapter
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Ble`] if the platform Bluetooth stack cannot be
    /// initialized, or [`LinkError::AdapterUnavailable`] if the host has no
    /// adapter.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(LinkError::AdapterUnavailable)?;

        Ok(Self {
            adapter,
            peripherals: Arc::new(Mutex::new(HashMap::new())),
            connected: Arc::new(Mutex::new(None)),
        })
    }

    async fn peripheral(&self, device: &DeviceId) -> Result<Peripheral> {
        self.peripherals
            .lock()
            .await
            .get(device)
            .cloned()
            .ok_or_else(|| LinkError::PeripheralNotFound(device.to_string()))
    }
}

fn is_writable(props: CharPropFlags) -> bool {
    props.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE) || props.contains(CharPropFlags::WRITE)
}

#[async_trait]
impl Central for BtleplugCentral {
    type Endpoint = btleplug::api::Characteristic;

    async fn events(&self) -> Result<mpsc::UnboundedReceiver<TransportEvent>> {
        let mut events = self.adapter.events().await?;
        let (tx, rx) = mpsc::unbounded_channel();

        let adapter = self.adapter.clone();
        let peripherals = Arc::clone(&self.peripherals);
        let connected = Arc::clone(&self.connected);

        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                match event {
                    // DeviceUpdated matters too: on some platforms the local
                    // name only arrives with a later advertisement.
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                        let Ok(peripheral) = adapter.peripheral(&id).await else {
                            trace!("Peripheral {id} vanished before lookup");
                            continue;
                        };
                        let name = match peripheral.properties().await {
                            Ok(props) => props.and_then(|p| p.local_name),
                            Err(e) => {
                                debug!("Failed to read properties for {id}: {e}");
                                None
                            }
                        };

                        let device = DeviceId::new(id.to_string());
                        peripherals.lock().await.insert(device.clone(), peripheral);

                        if tx.send(TransportEvent::Discovered { device, name }).is_err() {
                            break;
                        }
                    }
                    CentralEvent::DeviceDisconnected(id) => {
                        let device = DeviceId::new(id.to_string());

                        let mut held = connected.lock().await;
                        if held.as_ref().is_some_and(|(held_id, _)| *held_id == device) {
                            *held = None;
                        }
                        drop(held);

                        if tx.send(TransportEvent::Disconnected { device }).is_err() {
                            break;
                        }
                    }
                    _ => {}
                }
            }
            debug!("Adapter event stream ended");
        });

        Ok(rx)
    }

    async fn start_scan(&self) -> Result<()> {
        // Unfiltered on purpose: the bridge firmware does not advertise its
        // service UUID, so candidates are filtered by name upstream.
        self.adapter.start_scan(ScanFilter::default()).await?;
        Ok(())
    }

    async fn stop_scan(&self) -> Result<()> {
        self.adapter.stop_scan().await?;
        Ok(())
    }

    async fn connect(&self, device: &DeviceId) -> Result<()> {
        let peripheral = self.peripheral(device).await?;

        peripheral
            .connect()
            .await
            .map_err(|e| LinkError::ConnectFailed(e.to_string()))?;

        *self.connected.lock().await = Some((device.clone(), peripheral));
        Ok(())
    }

    async fn discover_channels(
        &self,
        device: &DeviceId,
    ) -> Result<Vec<(Uuid, Self::Endpoint)>> {
        let peripheral = self.peripheral(device).await?;

        peripheral.discover_services().await?;

        let services = peripheral.services();
        let service = services
            .iter()
            .find(|s| s.uuid == ROBOT_SERVICE_UUID)
            .ok_or(LinkError::ServiceNotFound)?;

        let mut discovered = Vec::new();
        for characteristic in &service.characteristics {
            if is_writable(characteristic.properties) {
                discovered.push((characteristic.uuid, characteristic.clone()));
            } else {
                warn!(
                    "Characteristic {} under robot service is not writable",
                    characteristic.uuid
                );
            }
        }

        Ok(discovered)
    }

    async fn write_without_response(
        &self,
        endpoint: &Self::Endpoint,
        payload: &[u8],
    ) -> Result<()> {
        let peripheral = {
            let held = self.connected.lock().await;
            held.as_ref()
                .map(|(_, p)| p.clone())
                .ok_or(LinkError::Disconnected)?
        };

        peripheral
            .write(endpoint, payload, WriteType::WithoutResponse)
            .await?;
        Ok(())
    }

    async fn disconnect(&self, device: &DeviceId) -> Result<()> {
        let peripheral = self.peripheral(device).await?;
        peripheral.disconnect().await?;
        *self.connected.lock().await = None;
        Ok(())
    }
}
