//! Wire-format encoding for the ESP32 bridge protocol.
//!
//! Payloads are plain ASCII with no framing, length prefix, or checksum; the
//! transport's own packet boundaries delimit messages. Motion channels carry
//! `"<angle>,<magnitude>"`, the button channel carries one `'0'`/`'1'` per
//! button in input order.
//!
//! Encoding is pure and infallible. Range enforcement lives upstream in
//! [`MotionSample::new`](crate::MotionSample::new); the encoders format
//! whatever they are given.

/// Maximum joystick deflection magnitude accepted on the wire
pub const MAX_MAGNITUDE: f32 = 50.0;

/// Number of buttons carried by the button channel
///
/// Wire order: weapon, field orientation, power.
pub const BUTTON_COUNT: usize = 3;

/// Encode a motion sample into its wire payload
///
/// Fixed two-decimal formatting is the documented stable choice for this
/// protocol; the bridge firmware parses the floats and does not care about
/// precision beyond that.
///
/// # Examples
///
/// ```
/// assert_eq!(botlink::encode_motion(45.0, 12.5), "45.00,12.50");
/// ```
#[must_use]
pub fn encode_motion(angle_degrees: f32, magnitude: f32) -> String {
    format!("{angle_degrees:.2},{magnitude:.2}")
}

/// Encode button states into the wire bitstring
///
/// One `'1'` or `'0'` per button, in input order.
///
/// # Examples
///
/// ```
/// assert_eq!(botlink::encode_buttons(&[true, false, true]), "101");
/// ```
#[must_use]
pub fn encode_buttons(buttons: &[bool]) -> String {
    buttons
        .iter()
        .map(|&pressed| if pressed { '1' } else { '0' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_motion() {
        assert_eq!(encode_motion(45.0, 12.5), "45.00,12.50");
        assert_eq!(encode_motion(0.0, 0.0), "0.00,0.00");
        assert_eq!(encode_motion(359.99, 50.0), "359.99,50.00");
    }

    #[test]
    fn test_encode_motion_rounding() {
        assert_eq!(encode_motion(123.456, 7.891), "123.46,7.89");
        assert_eq!(encode_motion(0.006, 0.004), "0.01,0.00");
    }

    #[test]
    fn test_encode_buttons() {
        assert_eq!(encode_buttons(&[true, false, true]), "101");
        assert_eq!(encode_buttons(&[false, true, true]), "011");
        assert_eq!(encode_buttons(&[false; BUTTON_COUNT]), "000");
        assert_eq!(encode_buttons(&[]), "");
    }

    #[test]
    fn test_payloads_are_ascii() {
        assert!(encode_motion(359.99, 49.99).is_ascii());
        assert!(encode_buttons(&[true, true, false]).is_ascii());
    }
}
