#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

//! # Botlink 🤖
//!
//! A Rust library for driving BLE-bridged combat robots with normalized
//! joystick commands.
//!
//! Botlink implements the connection-management core of a remote-control
//! link: it discovers the robot's radio among all visible Bluetooth Low
//! Energy peripherals, resolves the command characteristics, keeps the
//! connection alive across drops without operator intervention, and exposes
//! a fire-and-forget `send` surface to whatever produces the control input.
//!
//! The wire protocol is the one spoken by the ESP32 bridge firmware: three
//! write-only characteristics under a single Nordic-UART-style service, each
//! carrying plain ASCII text. Motion channels take `"<angle>,<magnitude>"`
//! pairs, the button channel takes a fixed-length `'0'`/`'1'` bitstring.
//!
//! ## Design
//!
//! - An explicit [`ConnectionState`] machine owns the peripheral lifecycle:
//!   scanning, name-based candidate filtering, connecting, characteristic
//!   discovery, disconnect detection, and reconnection on a fixed timer.
//! - All transport failures are non-fatal. The link self-heals; the only
//!   thing an operator ever sees is the published [`ConnectionState`].
//! - Sends are best-effort, non-blocking, and most-recent-wins. There is no
//!   queue: a dropped write is superseded by the next timer tick.
//!
//! ## Quick Start
//!
//! ```no_run
//! use botlink::{BtleplugCentral, Channel, LinkConfig, MotionSample, RobotLink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let central = BtleplugCentral::new().await?;
//!     let link = RobotLink::start(central, LinkConfig::default()).await?;
//!
//!     // Drive forward at half throttle.
//!     let sample = MotionSample::new(90.0, 25.0);
//!     link.handle().send_motion(Channel::Movement, sample).await;
//!
//!     link.shutdown().await;
//!     Ok(())
//! }
//! ```

/// Bluetooth Low Energy transport implementation backed by `btleplug`
pub mod ble;
/// Transport boundary: the `Central` trait and its event model
pub mod central;
/// Logical channel identifiers and the resolved channel table
pub mod channels;
/// Error types and handling
pub mod error;
/// Connection state machine, transmission gateway, and status publisher
pub mod link;
/// Wire-format encoding for motion and button payloads
pub mod protocol;
/// Input cells and the fixed-cadence command pump
pub mod pump;
/// Type definitions and data structures
pub mod types;

// Re-export the main types for convenient usage.
pub use ble::BtleplugCentral;
pub use central::{Central, DeviceId, TransportEvent};
pub use channels::{Channel, ChannelTable};
pub use error::{LinkError, Result};
pub use link::{LinkHandle, RobotLink};
pub use protocol::{encode_buttons, encode_motion, BUTTON_COUNT, MAX_MAGNITUDE};
pub use pump::{CommandPump, InputCell};
pub use types::{ConnectionState, ControlInputs, LinkConfig, MotionSample};

use uuid::{uuid, Uuid};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parent service UUID exposed by the robot's ESP32 BLE bridge
///
/// All three command characteristics live under this service. A peripheral
/// that does not carry it after discovery is treated as the wrong device and
/// the connection is torn down.
pub const ROBOT_SERVICE_UUID: Uuid = uuid!("6E400001-B5A3-F393-E0A9-E50E24DCCA9E");

/// Movement joystick characteristic UUID
///
/// Carries `"<angle>,<magnitude>"` samples for the drive vector.
pub const MOVEMENT_CHAR_UUID: Uuid = uuid!("6E400002-B5A3-F393-E0A9-E50E24DCCA9E");

/// Rotation joystick characteristic UUID
///
/// Carries `"<angle>,<magnitude>"` samples for the rotation vector.
pub const ROTATION_CHAR_UUID: Uuid = uuid!("6E400003-B5A3-F393-E0A9-E50E24DCCA9E");

/// Button state characteristic UUID
///
/// Carries a fixed-length `'0'`/`'1'` bitstring, one character per button.
pub const BUTTON_CHAR_UUID: Uuid = uuid!("6E400004-B5A3-F393-E0A9-E50E24DCCA9E");

/// Advertised name of the robot's radio endpoint
///
/// Scan results are matched against this name (by prefix, per
/// [`LinkConfig::match_prefix`]) to pick the robot out of every visible
/// peripheral. The scan itself runs unfiltered because the bridge firmware
/// does not advertise its service UUID.
pub const DEFAULT_DEVICE_NAME: &str = "ESP32_BLE";
