//! Maps `Box<dyn Error>` from trait boundaries to typed `ServoError`.
//!
//! The traits in `servoscale_traits` use `Box<dyn Error + Send + Sync>` so any platform can
//! plug in; this module converts those to our typed error enum, with an optional
//! feature-gated path for `servoscale_hardware::HwError` downcasting.

use crate::error::ServoError;

/// Map a trait-boundary error to a typed `ServoError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ServoError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<servoscale_hardware::error::HwError>() {
            return match hw {
                servoscale_hardware::error::HwError::SignalLost => {
                    ServoError::SignalLost { waited_ms: 0 }
                }
                other => ServoError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("signal lost") {
        ServoError::SignalLost { waited_ms: 0 }
    } else {
        ServoError::Hardware(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_errors_keep_their_message() {
        let e = std::io::Error::other("pin 3 busy");
        assert_eq!(
            map_hw_error(&e),
            ServoError::Hardware("pin 3 busy".to_string())
        );
    }

    #[test]
    fn signal_lost_text_maps_to_typed_variant() {
        let e = std::io::Error::other("Signal lost on pin 4");
        assert_eq!(map_hw_error(&e), ServoError::SignalLost { waited_ms: 0 });
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hw_errors_downcast() {
        use servoscale_hardware::error::HwError;
        let gpio = HwError::Gpio("pin 2: denied".into());
        assert!(matches!(map_hw_error(&gpio), ServoError::HardwareFault(m) if m.contains("denied")));
        assert_eq!(
            map_hw_error(&HwError::SignalLost),
            ServoError::SignalLost { waited_ms: 0 }
        );
    }
}
