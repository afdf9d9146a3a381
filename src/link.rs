use std::sync::Arc;
use tokio::{
    sync::{mpsc, watch, RwLock},
    task::JoinHandle,
    time::{sleep_until, timeout, Instant},
};
use tracing::{debug, info, trace, warn};

use crate::{
    central::{Central, DeviceId, TransportEvent},
    channels::{Channel, ChannelTable},
    error::Result,
    types::{ConnectionState, LinkConfig, MotionSample},
};

/// State shared between the supervisor task and every [`LinkHandle`]
struct Shared<C: Central> {
    central: C,
    config: LinkConfig,
    /// Swapped in whole on (re-)resolution and cleared on disconnect, so a
    /// reader never sees a partially populated table.
    table: RwLock<ChannelTable<C::Endpoint>>,
    state_tx: watch::Sender<ConnectionState>,
}

/// The robot link: owns the connection lifecycle
///
/// Starting a link spawns a supervisor task that runs the connection state
/// machine: it scans for the robot, filters candidates by advertised name,
/// connects, resolves the command characteristics, and schedules reconnects
/// after any failure. The link self-heals; no transport error ever surfaces
/// past this type.
///
/// Commands are sent through cloneable [`LinkHandle`]s obtained from
/// [`handle`](Self::handle). Dropping the `RobotLink` (or calling
/// [`shutdown`](Self::shutdown)) stops the supervisor.
///
/// # Examples
///
/// ```no_run
/// use botlink::{BtleplugCentral, Channel, LinkConfig, MotionSample, RobotLink};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let central = BtleplugCentral::new().await?;
///     let link = RobotLink::start(central, LinkConfig::default()).await?;
///
///     let handle = link.handle();
///     handle
///         .send_motion(Channel::Movement, MotionSample::new(90.0, 25.0))
///         .await;
///
///     link.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct RobotLink<C: Central> {
    shared: Arc<Shared<C>>,
    supervisor: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl<C: Central> RobotLink<C> {
    /// Start the link and its supervisor task
    ///
    /// The supervisor immediately enters `Searching` and begins an
    /// unfiltered scan.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the central cannot produce an event
    /// stream. Everything after startup is handled internally.
    pub async fn start(central: C, config: LinkConfig) -> Result<Self> {
        let events = central.events().await?;

        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            central,
            config,
            table: RwLock::new(ChannelTable::empty()),
            state_tx,
        });

        let supervisor = tokio::spawn(
            Supervisor {
                shared: Arc::clone(&shared),
                active: None,
                reconnect_at: None,
            }
            .run(events, shutdown_rx),
        );

        Ok(Self {
            shared,
            supervisor,
            shutdown_tx,
        })
    }

    /// Get a cloneable handle for sending commands and observing state
    #[must_use]
    pub fn handle(&self) -> LinkHandle<C> {
        LinkHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Current connection state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Subscribe to connection state changes
    ///
    /// Last-value-wins: a slow reader only ever sees the latest state, never
    /// a backlog of transitions.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Stop the supervisor, tearing down any active connection
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.supervisor.await {
            debug!("Supervisor task ended abnormally: {e}");
        }
    }
}

/// Cloneable command/status handle onto a running [`RobotLink`]
///
/// This is the transmission gateway: every `send` is best-effort and
/// non-blocking. A send issued while the link is not `Connected`, or against
/// a channel that never resolved, is a silent no-op observable only in the
/// debug log — the next pump tick supersedes it anyway.
pub struct LinkHandle<C: Central> {
    shared: Arc<Shared<C>>,
}

impl<C: Central> Clone for LinkHandle<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: Central> LinkHandle<C> {
    /// Current connection state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Subscribe to connection state changes
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Check whether a channel currently has a resolved endpoint
    pub async fn channel_resolved(&self, channel: Channel) -> bool {
        self.shared.table.read().await.resolve(channel).is_some()
    }

    /// Send a pre-encoded payload to a channel, best-effort
    ///
    /// Drops the payload without error if the link is not connected, the
    /// channel is unresolved, or the write fails. The endpoint is cloned out
    /// of the table before the write so the table lock is never held across
    /// transport I/O.
    pub async fn send(&self, channel: Channel, payload: &str) {
        let state = self.state();
        if state != ConnectionState::Connected {
            trace!("Dropping {channel} send while {state}");
            return;
        }

        let endpoint = self.shared.table.read().await.resolve(channel).cloned();
        let Some(endpoint) = endpoint else {
            debug!("Dropping send to unresolved {channel} channel");
            return;
        };

        if let Err(e) = self
            .shared
            .central
            .write_without_response(&endpoint, payload.as_bytes())
            .await
        {
            debug!("Dropped {channel} write: {e}");
        }
    }

    /// Encode and send a motion sample on a motion channel
    pub async fn send_motion(&self, channel: Channel, sample: MotionSample) {
        self.send(channel, &sample.encode()).await;
    }

    /// Encode and send button states on the button channel
    pub async fn send_buttons(&self, buttons: &[bool]) {
        self.send(Channel::Buttons, &crate::protocol::encode_buttons(buttons))
            .await;
    }
}

/// The connection state machine
///
/// Runs as a single task: transport events and the reconnect timer are
/// multiplexed through one `select!` loop, so state transitions are
/// serialized by construction. Only this task ever mutates the connection
/// state or the channel table.
struct Supervisor<C: Central> {
    shared: Arc<Shared<C>>,
    /// The one accepted peripheral; all other scan results are ignored until
    /// it disconnects.
    active: Option<DeviceId>,
    /// Pending reconnect deadline. Re-arming replaces the deadline instead of
    /// stacking timers, so a stale timer can never fire after a fresh
    /// connect.
    reconnect_at: Option<Instant>,
}

impl<C: Central> Supervisor<C> {
    async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        self.enter_searching().await;

        loop {
            let deadline = self.reconnect_at;
            tokio::select! {
                // An Err here means the owning RobotLink was dropped; treat
                // it the same as an explicit shutdown.
                _ = shutdown.changed() => {
                    info!("Robot link shutting down");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.on_transport_event(event).await,
                    None => {
                        warn!("Transport event stream closed; supervisor exiting");
                        break;
                    }
                },
                () = async {
                    match deadline {
                        Some(at) => sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                } => self.on_reconnect_tick().await,
            }
        }

        self.teardown().await;
    }

    fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.shared.state_tx.send_replace(next);
        if previous != next {
            info!("Connection state: {previous} -> {next}");
        }
    }

    fn arm_reconnect_timer(&mut self) {
        self.reconnect_at = Some(Instant::now() + self.shared.config.reconnect_interval);
    }

    async fn enter_searching(&mut self) {
        self.set_state(ConnectionState::Searching);
        if let Err(e) = self.shared.central.start_scan().await {
            warn!("Failed to start scan: {e}");
            self.enter_error();
        }
    }

    fn enter_error(&mut self) {
        self.set_state(ConnectionState::Error);
        self.arm_reconnect_timer();
    }

    async fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Discovered { device, name } => {
                self.on_discovered(device, name).await;
            }
            TransportEvent::Disconnected { device } => {
                self.on_disconnected(&device).await;
            }
        }
    }

    async fn on_discovered(&mut self, device: DeviceId, name: Option<String>) {
        // First match wins; anything seen outside Searching is ignored.
        if self.state() != ConnectionState::Searching {
            return;
        }
        let Some(name) = name else {
            return;
        };
        if !self.shared.config.matches(&name) {
            trace!("Ignoring non-matching peripheral {name}");
            return;
        }

        info!("Discovered robot {name} ({device})");
        self.set_state(ConnectionState::Connecting);
        if let Err(e) = self.shared.central.stop_scan().await {
            debug!("Failed to stop scan: {e}");
        }

        let connect = self.shared.central.connect(&device);
        match timeout(self.shared.config.connect_timeout, connect).await {
            Ok(Ok(())) => {
                info!("Connected to {name}");
                self.active = Some(device.clone());
                // A connect cancels any pending reconnect; a stale deadline
                // must not fire into the fresh connection.
                self.reconnect_at = None;
                self.set_state(ConnectionState::Connected);
                self.discover(&device).await;
            }
            Ok(Err(e)) => {
                warn!("Connect to {name} failed: {e}");
                self.enter_error();
            }
            Err(_) => {
                warn!(
                    "Connect to {name} timed out after {}ms",
                    self.shared.config.connect_timeout.as_millis()
                );
                self.enter_error();
            }
        }
    }

    /// Discovery sub-flow, entered on a fresh connection
    ///
    /// Not a separate state: while it runs the link is `Connected` and sends
    /// are accepted but dropped against the still-empty table.
    async fn discover(&mut self, device: &DeviceId) {
        match self.shared.central.discover_channels(device).await {
            Ok(discovered) => {
                let table = ChannelTable::from_discovered(discovered);
                if !table.is_complete() {
                    warn!("Some channels did not resolve; sends on them will be dropped");
                }
                *self.shared.table.write().await = table;
                info!("Channel table populated");
            }
            Err(e) => {
                // Wrong device or discovery failure: drop the link and go
                // back to hunting for the robot.
                warn!("Discovery on {device} failed: {e}");
                if let Err(e) = self.shared.central.disconnect(device).await {
                    debug!("Disconnect after failed discovery failed: {e}");
                }
                self.drop_link().await;
            }
        }
    }

    async fn on_disconnected(&mut self, device: &DeviceId) {
        if self.active.as_ref() != Some(device) || self.state() != ConnectionState::Connected {
            trace!("Ignoring disconnect from inactive peripheral {device}");
            return;
        }
        warn!("Link to {device} lost");
        self.drop_link().await;
    }

    /// Shared teardown for link loss and failed discovery
    async fn drop_link(&mut self) {
        self.active = None;
        *self.shared.table.write().await = ChannelTable::empty();
        self.set_state(ConnectionState::Disconnected);
        self.arm_reconnect_timer();
    }

    async fn on_reconnect_tick(&mut self) {
        if self.state() == ConnectionState::Connected {
            // State changed independently since the timer was armed.
            self.reconnect_at = None;
            return;
        }
        // The timer repeats while the link is down, as a periodic scan
        // restart; each firing re-arms a single deadline.
        self.arm_reconnect_timer();
        self.enter_searching().await;
    }

    async fn teardown(&mut self) {
        if let Err(e) = self.shared.central.stop_scan().await {
            debug!("Failed to stop scan during teardown: {e}");
        }
        if let Some(device) = self.active.take() {
            if let Err(e) = self.shared.central.disconnect(&device).await {
                debug!("Failed to disconnect during teardown: {e}");
            }
        }
        *self.shared.table.write().await = ChannelTable::empty();
        self.set_state(ConnectionState::Disconnected);
    }
}
