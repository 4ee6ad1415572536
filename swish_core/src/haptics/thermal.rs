//! First-order motor temperature estimate.
//!
//! `dT/dt = heat * (I / 255) - cool * (T - ambient)`, integrated in closed
//! form over each interval with the intensity held constant, so large or
//! irregular update gaps stay stable.

use crate::config::ThermalCfg;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalState {
    temperature_c: f32,
}

impl ThermalState {
    pub fn new(cfg: &ThermalCfg) -> Self {
        Self {
            temperature_c: cfg.ambient_c,
        }
    }

    pub fn temperature_c(&self) -> f32 {
        self.temperature_c
    }

    /// Advance by `dt_ms` at constant `intensity`.
    pub fn advance(&mut self, cfg: &ThermalCfg, intensity: u8, dt_ms: u64) {
        if dt_ms == 0 {
            return;
        }
        let dt = dt_ms as f32 / 1000.0;
        let drive = cfg.heat_c_per_s * f32::from(intensity) / 255.0;
        let t = self.temperature_c;
        let next = if cfg.cool_per_s > 0.0 {
            let equilibrium = cfg.ambient_c + drive / cfg.cool_per_s;
            equilibrium + (t - equilibrium) * (-cfg.cool_per_s * dt).exp()
        } else {
            t + drive * dt
        };
        if next.is_finite() {
            self.temperature_c = next;
        }
    }
}

/// Guard evaluation over all motor estimates, with trip/clear hysteresis.
pub fn guard_tripped<'a>(
    cfg: &ThermalCfg,
    states: impl IntoIterator<Item = &'a ThermalState>,
    currently_tripped: bool,
) -> bool {
    let hottest = states
        .into_iter()
        .map(ThermalState::temperature_c)
        .fold(f32::NEG_INFINITY, f32::max);
    if currently_tripped {
        hottest > cfg.clear_c
    } else {
        hottest >= cfg.trip_c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_drive_heats_and_idle_cools() {
        let cfg = ThermalCfg::default();
        let mut s = ThermalState::new(&cfg);
        s.advance(&cfg, 255, 1000);
        let hot = s.temperature_c();
        assert!(hot > cfg.ambient_c);
        s.advance(&cfg, 0, 10_000);
        assert!(s.temperature_c() < hot);
        assert!(s.temperature_c() >= cfg.ambient_c);
    }

    #[test]
    fn continuous_full_drive_trips_then_clears_with_hysteresis() {
        let cfg = ThermalCfg::default();
        let mut s = ThermalState::new(&cfg);
        let mut tripped = false;
        let mut ms = 0;
        while !tripped {
            s.advance(&cfg, 255, 100);
            ms += 100;
            tripped = guard_tripped(&cfg, [&s], tripped);
            assert!(ms < 60_000, "never tripped");
        }
        // just below trip is still tripped
        s.advance(&cfg, 0, 500);
        assert!(guard_tripped(&cfg, [&s], true));
        s.advance(&cfg, 0, 30_000);
        assert!(!guard_tripped(&cfg, [&s], true));
    }
}
