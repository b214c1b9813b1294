//! Construction of the period–velocity correlation matrix.
//!
//! Every period row of the two filtered matrices is cross-correlated over a
//! bounded lag window; the positive-lag axis is mapped to inter-station
//! velocity through `v = dist / lag`, masked to the configured band, and
//! resampled onto a uniform velocity grid with a cubic spline.

use crate::config::TwoStationConfig;
use crate::errors::{ExtractionError, ExtractionMiss};
use crate::math_tools::cross_correlate_full;
use crate::spline::{CubicSpline, MIN_SPLINE_POINTS};
use crate::trace::PeriodSet;
use log::debug;
use ndarray::{Array1, Array2};

/// Period×velocity amplitude matrix with its uniform velocity axis.
#[derive(Clone, Debug)]
pub struct VelocityMatrix {
    /// Uniform, strictly increasing velocity grid in km/s.
    pub scale: Array1<f64>,
    /// One correlation-amplitude row per period.
    pub matrix: Array2<f64>,
    /// Rows left empty for lack of usable correlation samples.
    pub misses: Vec<ExtractionMiss>,
}

/// Maps bounded-lag cross-correlations onto the velocity grid.
#[derive(Clone, Debug)]
pub struct VelocityMatrixBuilder {
    pub min_velocity: f64,
    pub max_velocity: f64,
    pub velocity_step: f64,
    /// Maximum correlation lag in seconds.
    pub max_lag: f64,
}

impl VelocityMatrixBuilder {
    pub fn from_config(cfg: &TwoStationConfig) -> Self {
        VelocityMatrixBuilder {
            min_velocity: cfg.min_velocity,
            max_velocity: cfg.max_velocity,
            velocity_step: cfg.velocity_step,
            max_lag: cfg.max_lag,
        }
    }

    /// The uniform velocity grid `[vmin, vmax)` in `velocity_step`
    /// increments.
    pub fn velocity_scale(&self) -> Result<Array1<f64>, ExtractionError> {
        if !(self.velocity_step > 0.0) || self.max_velocity <= self.min_velocity {
            return Err(ExtractionError::InvalidVelocityRange {
                vmin: self.min_velocity,
                vmax: self.max_velocity,
                dv: self.velocity_step,
            });
        }
        let n = ((self.max_velocity - self.min_velocity) / self.velocity_step).ceil() as usize;
        Ok(Array1::from_iter(
            (0..n).map(|i| self.min_velocity + i as f64 * self.velocity_step),
        ))
    }

    /// Build the dispersion matrix from both stations' filtered rows.
    ///
    /// `dist_km` is the inter-station great-circle distance. Rows with too
    /// few masked correlation samples to fit a spline stay zero and are
    /// reported in [`VelocityMatrix::misses`].
    pub fn build(
        &self,
        sampling_rate: f64,
        dist_km: f64,
        periods: &PeriodSet,
        filtered1: &Array2<f64>,
        filtered2: &Array2<f64>,
    ) -> Result<VelocityMatrix, ExtractionError> {
        let scale = self.velocity_scale()?;
        let npoints = (self.max_lag * sampling_rate).round() as usize;

        let mut matrix = Array2::<f64>::zeros((periods.len(), scale.len()));
        let mut misses = Vec::new();

        for iperiod in 0..periods.len() {
            let row1 = filtered1.row(iperiod).to_vec();
            let row2 = filtered2.row(iperiod).to_vec();
            let correlation = cross_correlate_full(&row1, &row2, npoints);
            let center = correlation.len() / 2;

            // positive lags whose velocity falls inside the band, collected
            // in decreasing velocity order as the lag grows
            let mut velocities = Vec::new();
            let mut amplitudes = Vec::new();
            for lag in (1..=center).rev() {
                let velocity = dist_km * sampling_rate / lag as f64;
                if velocity > self.min_velocity && velocity < self.max_velocity {
                    velocities.push(velocity);
                    amplitudes.push(correlation[center + lag]);
                }
            }

            let peak = amplitudes.iter().fold(0.0_f64, |m, a| m.max(a.abs()));
            if velocities.len() < MIN_SPLINE_POINTS || peak == 0.0 {
                debug!("period row {iperiod}: {} usable lags, left empty", velocities.len());
                misses.push(ExtractionMiss::SparseRow {
                    period_index: iperiod,
                });
                continue;
            }
            for a in amplitudes.iter_mut() {
                *a /= peak;
            }

            let Some(spline) = CubicSpline::fit(&velocities, &amplitudes) else {
                misses.push(ExtractionMiss::SparseRow {
                    period_index: iperiod,
                });
                continue;
            };
            let (vlo, vhi) = spline.span();
            for (ivelo, &v) in scale.iter().enumerate() {
                if v >= vlo && v <= vhi {
                    matrix[[iperiod, ivelo]] = spline.eval(v);
                }
            }
        }

        debug!("velocity matrix -> {:?}", matrix.shape());
        Ok(VelocityMatrix {
            scale,
            matrix,
            misses,
        })
    }
}
