//! Wet-bulb temperature from dry-bulb temperature and relative humidity.
//!
//! Uses the empirical fit from Stull (2011), "Wet-Bulb Temperature from
//! Relative Humidity and Air Temperature", J. Appl. Meteor. Climatol. 50,
//! 2267-2269. The fit is stated for RH 5-99% and T -20..50 °C at sea-level
//! pressure with a mean absolute error under 0.3 °C. Inputs outside that
//! envelope are still computed; only physically meaningless humidity is
//! rejected.

use crate::error::ComputationError;
use crate::utils::constants::{STULL_MAX_TEMP, STULL_MIN_HUMIDITY, STULL_MIN_TEMP};

#[derive(Debug, Clone, Copy, Default)]
pub struct WetBulbCalculator;

impl WetBulbCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Wet-bulb temperature in °C.
    ///
    /// `humidity_pct` must lie in (0, 100]. The result never exceeds
    /// `temperature_c`: the fit overshoots dry-bulb by a fraction of a
    /// degree near saturation, so it is capped there.
    pub fn compute(&self, temperature_c: f64, humidity_pct: f64) -> Result<f64, ComputationError> {
        if !temperature_c.is_finite() {
            return Err(ComputationError::InvalidTemperature(temperature_c));
        }
        if !humidity_pct.is_finite() || humidity_pct <= 0.0 || humidity_pct > 100.0 {
            return Err(ComputationError::InvalidHumidity(humidity_pct));
        }

        let t = temperature_c;
        let rh = humidity_pct;

        let wet_bulb = t * (0.151977 * (rh + 8.313659).sqrt()).atan() + (t + rh).atan()
            - (rh - 1.676331).atan()
            + 0.00391838 * rh.powf(1.5) * (0.023101 * rh).atan()
            - 4.686035;

        Ok(wet_bulb.min(t))
    }

    /// Whether the inputs fall inside the range the fit was calibrated on
    pub fn is_within_calibration(&self, temperature_c: f64, humidity_pct: f64) -> bool {
        (STULL_MIN_TEMP..=STULL_MAX_TEMP).contains(&temperature_c)
            && (STULL_MIN_HUMIDITY..=100.0).contains(&humidity_pct)
    }
}
