use thiserror::Error;

/// Errors that can occur when working with the robot link
#[derive(Error, Debug)]
pub enum LinkError {
    /// Bluetooth Low Energy related errors
    #[error("BLE error: {0}")]
    Ble(#[from] btleplug::Error),

    /// No usable Bluetooth adapter on this host
    #[error("No Bluetooth adapter available")]
    AdapterUnavailable,

    /// Peripheral vanished between discovery and use
    #[error("Peripheral not found: {0}")]
    PeripheralNotFound(String),

    /// Transport-level connect failure
    #[error("Failed to connect to device: {0}")]
    ConnectFailed(String),

    /// Connect attempt exceeded the configured timeout
    #[error("Connection timed out after {timeout_ms}ms")]
    ConnectTimeout {
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Peripheral connected but does not carry the robot service
    ///
    /// Treated as "wrong device": the link is torn down and scanning resumes.
    #[error("Robot service not present on connected peripheral")]
    ServiceNotFound,

    /// Peripheral disconnected unexpectedly
    #[error("Device disconnected")]
    Disconnected,

    /// Transport event stream closed
    #[error("Transport event stream closed")]
    EventStreamClosed,

    /// Other errors
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for robot link operations
pub type Result<T> = std::result::Result<T, LinkError>;

impl LinkError {
    /// Check if this error indicates a connection issue
    ///
    /// Connection issues are never fatal: the state machine answers every one
    /// of them by scheduling a reconnect.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Ble(_)
                | Self::ConnectFailed(_)
                | Self::ConnectTimeout { .. }
                | Self::Disconnected
                | Self::PeripheralNotFound(_)
        )
    }

    /// Check if this error means the connected peripheral is the wrong device
    #[must_use]
    pub const fn is_wrong_device(&self) -> bool {
        matches!(self, Self::ServiceNotFound)
    }
}
