//! Vibration motors on Raspberry Pi GPIO, driven with software PWM.

use std::collections::HashMap;

use rppal::gpio::{Gpio, OutputPin};
use swish_traits::Actuator;

use crate::error::{HwError, Result};

/// Default PWM carrier for coin vibration motors.
pub const DEFAULT_PWM_HZ: f64 = 200.0;

pub struct PwmActuator {
    outputs: HashMap<u8, OutputPin>,
    frequency_hz: f64,
}

impl PwmActuator {
    /// Claim every pin in `pins` as an output, held low.
    pub fn new(pins: &[u8], frequency_hz: f64) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let mut outputs = HashMap::with_capacity(pins.len());
        for &pin in pins {
            let mut out = gpio
                .get(pin)
                .map_err(|e| HwError::Gpio(format!("pin {pin}: {e}")))?
                .into_output();
            out.set_low();
            outputs.insert(pin, out);
        }
        tracing::info!(pins = ?pins, frequency_hz, "pwm motors ready");
        Ok(Self {
            outputs,
            frequency_hz,
        })
    }

    fn set(&mut self, pin: u8, intensity: u8) -> Result<()> {
        let out = self.outputs.get_mut(&pin).ok_or(HwError::InvalidPin(pin))?;
        if intensity == 0 {
            out.clear_pwm().map_err(|e| HwError::Pwm(e.to_string()))?;
            out.set_low();
            return Ok(());
        }
        let duty = f64::from(intensity) / 255.0;
        out.set_pwm_frequency(self.frequency_hz, duty)
            .map_err(|e| HwError::Pwm(e.to_string()))
    }
}

impl Actuator for PwmActuator {
    // The controller sends an explicit zero when a pattern ends, so the
    // duration is advisory here.
    fn drive(
        &mut self,
        pin: u8,
        intensity: u8,
        _duration_ms: u64,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.set(pin, intensity).map_err(|e| {
            tracing::error!(pin, intensity, error = %e, "motor drive failed");
            Box::new(e) as Box<dyn std::error::Error + Send + Sync>
        })
    }
}

impl Drop for PwmActuator {
    fn drop(&mut self) {
        for out in self.outputs.values_mut() {
            let _ = out.clear_pwm();
            out.set_low();
        }
    }
}
