use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

use crate::protocol::{self, BUTTON_COUNT, MAX_MAGNITUDE};

/// Connection state of the robot link
///
/// Exactly one value at any instant. The state is owned and mutated only by
/// the supervisor task inside [`RobotLink`](crate::RobotLink); everything else
/// observes it through the status publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No peripheral and no scan in progress
    Disconnected,
    /// Scanning for a peripheral whose advertised name matches
    Searching,
    /// Connect request issued to a matched peripheral
    Connecting,
    /// Link established; characteristic discovery runs as a sub-phase
    Connected,
    /// Last connect attempt failed; reconnect timer pending
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Searching => write!(f, "Searching"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Error => write!(f, "Error"),
        }
    }
}

/// A single joystick motion sample
///
/// Angle is in degrees, `[0, 360)`, measured the way the joystick reports it.
/// Magnitude is the deflection in `[0, MAX_MAGNITUDE]`. Construction clamps
/// both, so a sample is always encodable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Direction of deflection in degrees, `[0, 360)`
    pub angle_degrees: f32,
    /// Deflection magnitude, `[0, MAX_MAGNITUDE]`
    pub magnitude: f32,
}

impl MotionSample {
    /// Create a sample, clamping inputs into the wire-format range
    ///
    /// The angle is wrapped into `[0, 360)`; the magnitude is clamped into
    /// `[0, MAX_MAGNITUDE]`. Non-finite inputs collapse to zero.
    #[must_use]
    pub fn new(angle_degrees: f32, magnitude: f32) -> Self {
        let angle_degrees = if angle_degrees.is_finite() {
            angle_degrees.rem_euclid(360.0)
        } else {
            0.0
        };
        let magnitude = if magnitude.is_finite() {
            magnitude.clamp(0.0, MAX_MAGNITUDE)
        } else {
            0.0
        };
        Self {
            angle_degrees,
            magnitude,
        }
    }

    /// The neutral (centered stick) sample
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            angle_degrees: 0.0,
            magnitude: 0.0,
        }
    }

    /// Encode this sample into its wire payload
    #[must_use]
    pub fn encode(&self) -> String {
        protocol::encode_motion(self.angle_degrees, self.magnitude)
    }
}

impl Default for MotionSample {
    fn default() -> Self {
        Self::neutral()
    }
}

/// The full control input snapshot read by the command pump each tick
///
/// One copyable value so that readers take an atomic snapshot rather than
/// observing a half-updated set of inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlInputs {
    /// Latest movement joystick sample
    pub movement: MotionSample,
    /// Latest rotation joystick sample
    pub rotation: MotionSample,
    /// Button states in wire order: weapon, field orientation, power
    pub buttons: [bool; BUTTON_COUNT],
}

impl Default for ControlInputs {
    fn default() -> Self {
        Self {
            movement: MotionSample::neutral(),
            rotation: MotionSample::neutral(),
            // Field orientation and power start enabled on the robot side.
            buttons: [false, true, true],
        }
    }
}

/// Link configuration
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Advertised name the robot's radio must carry
    pub device_name: String,
    /// Match `device_name` as a prefix of the advertised name rather than
    /// requiring exact equality
    pub match_prefix: bool,
    /// Fixed interval of the reconnect timer
    pub reconnect_interval: Duration,
    /// Upper bound on a single transport connect attempt
    pub connect_timeout: Duration,
    /// Cadence of the command pump
    pub send_period: Duration,
}

impl LinkConfig {
    /// Check whether an advertised name selects the robot
    #[must_use]
    pub fn matches(&self, advertised: &str) -> bool {
        if self.match_prefix {
            advertised.starts_with(&self.device_name)
        } else {
            advertised == self.device_name
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device_name: crate::DEFAULT_DEVICE_NAME.to_string(),
            match_prefix: true,
            reconnect_interval: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            send_period: Duration::from_millis(100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_sample_clamping() {
        let sample = MotionSample::new(405.0, 80.0);
        assert!((sample.angle_degrees - 45.0).abs() < f32::EPSILON);
        assert!((sample.magnitude - MAX_MAGNITUDE).abs() < f32::EPSILON);

        let negative = MotionSample::new(-90.0, -5.0);
        assert!((negative.angle_degrees - 270.0).abs() < f32::EPSILON);
        assert!(negative.magnitude.abs() < f32::EPSILON);
    }

    #[test]
    fn test_motion_sample_non_finite() {
        let sample = MotionSample::new(f32::NAN, f32::INFINITY);
        assert!(sample.angle_degrees.abs() < f32::EPSILON);
        assert!(sample.magnitude.abs() < f32::EPSILON);
    }

    #[test]
    fn test_neutral_sample() {
        let neutral = MotionSample::neutral();
        assert_eq!(neutral, MotionSample::default());
        assert_eq!(neutral.encode(), "0.00,0.00");
    }

    #[test]
    fn test_name_matching() {
        let config = LinkConfig::default();
        assert!(config.matches("ESP32_BLE"));
        assert!(config.matches("ESP32_BLE_v2"));
        assert!(!config.matches("HeartRateMonitor"));
        assert!(!config.matches("esp32_ble"));

        let exact = LinkConfig {
            match_prefix: false,
            ..LinkConfig::default()
        };
        assert!(exact.matches("ESP32_BLE"));
        assert!(!exact.matches("ESP32_BLE_v2"));
    }

    #[test]
    fn test_config_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.device_name, "ESP32_BLE");
        assert!(config.match_prefix);
        assert_eq!(config.reconnect_interval, Duration::from_secs(10));
        assert_eq!(config.send_period, Duration::from_millis(100));
    }

    #[test]
    fn test_default_buttons() {
        let inputs = ControlInputs::default();
        assert_eq!(inputs.buttons, [false, true, true]);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Searching.to_string(), "Searching");
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
    }
}
