//! Maps `Box<dyn Error>` from trait boundaries to typed `SwishError`.
//!
//! The traits in `swish_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `swish_hardware::error::HwError` downcasting.

use crate::error::SwishError;

/// Map a sensor-side error.
pub fn map_sensor_error(e: &(dyn std::error::Error + 'static)) -> SwishError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<swish_hardware::error::HwError>() {
            return match hw {
                swish_hardware::error::HwError::Disconnected => {
                    SwishError::Sensor("sensor disconnected".into())
                }
                other => SwishError::Sensor(other.to_string()),
            };
        }
    }
    SwishError::Sensor(e.to_string())
}

/// Map an actuator-side error.
pub fn map_actuator_error(e: &(dyn std::error::Error + 'static)) -> SwishError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<swish_hardware::error::HwError>() {
            return match hw {
                swish_hardware::error::HwError::InvalidPin(pin) => {
                    SwishError::Config(format!("no motor output on pin {pin}"))
                }
                other => SwishError::Actuator(other.to_string()),
            };
        }
    }
    SwishError::Actuator(e.to_string())
}
