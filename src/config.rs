//! Configuration containers for the dispersion pipeline.

use serde::{Deserialize, Serialize};

/// Tunable parameters of the two-station measurement, all overridable per
/// call and carrying the conventional defaults of the method.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TwoStationConfig {
    /// Width parameter of the FTAN Gaussian filters.
    pub ftan_alpha: f64,
    /// Isolation window half-width, in periods.
    pub isolation_halfwidth: f64,
    /// Period resampling interval in seconds; sets the passband width of the
    /// filter bank.
    pub period_resample: f64,
    /// Lower bound of the velocity grid in km/s.
    pub min_velocity: f64,
    /// Upper bound of the velocity grid in km/s.
    pub max_velocity: f64,
    /// Step of the uniform velocity grid in km/s.
    pub velocity_step: f64,
    /// Maximum cross-correlation lag in seconds.
    pub max_lag: f64,
    /// Seeds picked below this period (seconds) are discarded.
    pub min_seed_period: f64,
    /// Fraction of one period the straddling extrema must span before a
    /// pick is accepted.
    pub straddle_fraction: f64,
    /// Maximum angle (degrees) between the inter-station line and the
    /// station-event line for the common-line test.
    pub min_angle: f64,
}

impl Default for TwoStationConfig {
    fn default() -> Self {
        TwoStationConfig {
            ftan_alpha: 20.0,
            isolation_halfwidth: 3.0,
            period_resample: 1.0,
            min_velocity: 2.0,
            max_velocity: 7.0,
            velocity_step: 0.01,
            max_lag: 500.0,
            min_seed_period: 20.0,
            straddle_fraction: 0.4,
            min_angle: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bound_a_sane_velocity_band() {
        let cfg = TwoStationConfig::default();
        assert!(cfg.min_velocity < cfg.max_velocity);
        assert!(cfg.velocity_step > 0.0);
        assert!(cfg.straddle_fraction > 0.0 && cfg.straddle_fraction < 1.0);
    }
}
