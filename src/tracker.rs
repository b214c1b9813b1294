//! Seeded local-extremum tracking across the period–velocity matrix.
//!
//! From an externally picked seed the tracker walks outward column by
//! column, accepting at each period the first pair of straddling extrema
//! separated by a significant fraction of one wave cycle, and assembling
//! the surviving picks into a phase-velocity dispersion curve.

use crate::config::TwoStationConfig;
use crate::errors::ExtractionMiss;
use crate::math_tools::{local_maxima, local_minima};
use crate::trace::PeriodSet;
use crate::velocity::VelocityMatrix;
use log::debug;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Supplies the starting point on the velocity–period surface.
///
/// Replaces the interactive matrix plot of the classical workflow: an
/// operator front-end and an automated classifier are interchangeable
/// behind this trait. Returning `None` aborts the extraction gracefully.
pub trait SeedProvider {
    fn pick(&mut self, matrix: &VelocityMatrix, periods: &PeriodSet) -> Option<(f64, f64)>;
}

/// Seed provider returning one predetermined `(period, velocity)` point.
#[derive(Clone, Copy, Debug)]
pub struct FixedSeed {
    pub period: f64,
    pub velocity: f64,
}

impl SeedProvider for FixedSeed {
    fn pick(&mut self, _matrix: &VelocityMatrix, _periods: &PeriodSet) -> Option<(f64, f64)> {
        Some((self.period, self.velocity))
    }
}

/// Phase-velocity dispersion curve; unresolved periods stay `None`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispersionCurve {
    periods: Array1<f64>,
    velocities: Vec<Option<f64>>,
}

impl DispersionCurve {
    pub fn empty(periods: &PeriodSet) -> Self {
        DispersionCurve {
            periods: periods.values().clone(),
            velocities: vec![None; periods.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.velocities.len()
    }

    /// True when no period is resolved.
    pub fn is_empty(&self) -> bool {
        self.velocities.iter().all(Option::is_none)
    }

    pub fn velocity_at(&self, period_index: usize) -> Option<f64> {
        self.velocities[period_index]
    }

    fn set(&mut self, period_index: usize, velocity: f64) {
        self.velocities[period_index] = Some(velocity);
    }

    /// Resolved `(period, velocity)` pairs in period order.
    pub fn resolved(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.periods
            .iter()
            .zip(self.velocities.iter())
            .filter_map(|(&p, v)| v.map(|v| (p, v)))
    }
}

/// Result of one tracking run.
#[derive(Debug)]
pub struct TrackReport {
    pub curve: DispersionCurve,
    pub misses: Vec<ExtractionMiss>,
    /// Inclusive range of resolved period indices, `None` when the walk
    /// resolved nothing.
    pub extent: Option<(usize, usize)>,
}

/// Bidirectional local-extremum walker over a [`VelocityMatrix`].
#[derive(Clone, Debug)]
pub struct DispersionTracker {
    /// Seeds below this period (seconds) are rejected as noisy picks.
    pub min_seed_period: f64,
    /// Minimum fraction of a cycle the straddling extrema must span.
    pub straddle_fraction: f64,
}

impl DispersionTracker {
    pub fn from_config(cfg: &TwoStationConfig) -> Self {
        DispersionTracker {
            min_seed_period: cfg.min_seed_period,
            straddle_fraction: cfg.straddle_fraction,
        }
    }

    /// Track a dispersion curve outward from `seed = (period, velocity)`.
    ///
    /// `dist_km` converts velocity separations into travel-time shifts for
    /// the straddle test. A rejected seed or an unsatisfiable column is a
    /// local miss bounding the curve, never an error.
    pub fn track(
        &self,
        vm: &VelocityMatrix,
        periods: &PeriodSet,
        dist_km: f64,
        seed: (f64, f64),
    ) -> TrackReport {
        let mut curve = DispersionCurve::empty(periods);
        let mut misses = Vec::new();

        let (seed_period, seed_velocity) = seed;
        if seed_period < self.min_seed_period {
            debug!(
                "seed period {seed_period} below minimum {}, extraction discarded",
                self.min_seed_period
            );
            misses.push(ExtractionMiss::SeedBelowMinPeriod {
                period: seed_period,
                min_period: self.min_seed_period,
            });
            return TrackReport {
                curve,
                misses,
                extent: None,
            };
        }

        let seed_iperiod = periods.nearest_index(seed_period);
        let seed_ivelo = nearest_scale_index(&vm.scale, seed_velocity);

        let mut extent: Option<(usize, usize)> = None;
        let mut enqueued = vec![false; periods.len()];
        let mut worklist = VecDeque::new();
        enqueued[seed_iperiod] = true;
        worklist.push_back((seed_iperiod, seed_ivelo));
        debug!("seeded at period index {seed_iperiod}, velocity index {seed_ivelo}");

        while let Some((iperiod, ivelo)) = worklist.pop_front() {
            match self.pick_column(vm, periods, dist_km, iperiod, ivelo) {
                Some(picked) => {
                    let velocity = vm.scale[picked];
                    curve.set(iperiod, velocity);
                    extent = Some(match extent {
                        Some((lo, hi)) => (lo.min(iperiod), hi.max(iperiod)),
                        None => (iperiod, iperiod),
                    });
                    debug!("period index {iperiod}: picked {velocity} km/s");
                    // neighbours start from the crest just found, so the
                    // walk re-centers as the ridge drifts in velocity
                    if iperiod > 0 && !enqueued[iperiod - 1] {
                        enqueued[iperiod - 1] = true;
                        worklist.push_back((iperiod - 1, picked));
                    }
                    if iperiod + 1 < periods.len() && !enqueued[iperiod + 1] {
                        enqueued[iperiod + 1] = true;
                        worklist.push_back((iperiod + 1, picked));
                    }
                }
                None => {
                    debug!("period index {iperiod}: no straddling pair, walk bounded");
                    misses.push(ExtractionMiss::NoStraddlePair {
                        period_index: iperiod,
                    });
                }
            }
        }

        TrackReport {
            curve,
            misses,
            extent,
        }
    }

    /// Pick the crest velocity index in one period column, or `None` when
    /// no extremum pair straddles a sufficient fraction of a cycle.
    fn pick_column(
        &self,
        vm: &VelocityMatrix,
        periods: &PeriodSet,
        dist_km: f64,
        iperiod: usize,
        ivelo: usize,
    ) -> Option<usize> {
        let row = vm.matrix.row(iperiod);

        let maxima = local_maxima(row);
        let mut extrema = maxima.clone();
        extrema.extend(local_minima(row));
        extrema.sort_unstable();

        let left: Vec<usize> = extrema.iter().copied().filter(|&i| i <= ivelo).collect();
        let right: Vec<usize> = extrema.iter().copied().filter(|&i| i >= ivelo).collect();

        let shift_length = left.len().min(right.len());
        for shift in 0..shift_length {
            let left_extremum = left[left.len() - 1 - shift];
            let right_extremum = right[shift];

            // the pair must straddle a significant fraction of one cycle:
            // compare the inter-station travel-time difference of the two
            // candidate velocities against the period
            let v_left = vm.scale[left_extremum];
            let v_right = vm.scale[right_extremum];
            let shift_time = dist_km * (1.0 / v_left - 1.0 / v_right);
            if shift_time / periods.get(iperiod) > self.straddle_fraction {
                // the pick is the strongest maximum the accepted pair
                // brackets; the pair itself may be two side minima when
                // the walk sits right on the crest
                let crest = maxima
                    .iter()
                    .copied()
                    .filter(|&i| left_extremum <= i && i <= right_extremum)
                    .max_by(|&a, &b| row[a].total_cmp(&row[b]));
                if let Some(crest) = crest {
                    return Some(crest);
                }
            }
        }
        None
    }
}

/// Index of the grid velocity closest to `velocity`.
fn nearest_scale_index(scale: &Array1<f64>, velocity: f64) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, &v) in scale.iter().enumerate() {
        let d = (v - velocity).abs();
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    /// Matrix with one clear ridge of maxima at `ridge(iperiod)` km/s,
    /// flanked by side minima so every column has straddling extrema.
    fn ridged_matrix(
        periods: &PeriodSet,
        scale: Array1<f64>,
        ridge: impl Fn(usize) -> f64,
    ) -> VelocityMatrix {
        let mut matrix = Array2::<f64>::zeros((periods.len(), scale.len()));
        for ip in 0..periods.len() {
            let v0 = ridge(ip);
            for (iv, &v) in scale.iter().enumerate() {
                // narrow ricker-like ridge: central peak, negative side lobes
                let x = (v - v0) / 0.4;
                matrix[[ip, iv]] = (1.0 - 2.0 * x * x) * (-x * x).exp();
            }
        }
        VelocityMatrix {
            scale,
            matrix,
            misses: vec![],
        }
    }

    fn tracker() -> DispersionTracker {
        DispersionTracker {
            min_seed_period: 20.0,
            straddle_fraction: 0.4,
        }
    }

    fn scale() -> Array1<f64> {
        Array1::from_iter((0..500).map(|i| 2.0 + i as f64 * 0.01))
    }

    #[test]
    fn recovers_a_flat_ridge_everywhere() {
        let ps = PeriodSet::regular(20.0, 60.0, 5.0).unwrap();
        let vm = ridged_matrix(&ps, scale(), |_| 3.5);
        // operator seed lands near, not exactly on, the ridge crest
        let report = tracker().track(&vm, &ps, 1000.0, (40.0, 3.7));
        assert_eq!(report.extent, Some((0, ps.len() - 1)));
        assert!(report.misses.is_empty());
        for ip in 0..ps.len() {
            let v = report.curve.velocity_at(ip).expect("period resolved");
            assert_relative_eq!(v, 3.5, epsilon = 0.011);
        }
    }

    #[test]
    fn seed_on_the_crest_still_tracks() {
        let ps = PeriodSet::regular(20.0, 60.0, 5.0).unwrap();
        let vm = ridged_matrix(&ps, scale(), |_| 3.5);
        // with the walk sitting exactly on the crest the straddling pair
        // is the two side minima; the crest between them must win out
        let report = tracker().track(&vm, &ps, 1000.0, (40.0, 3.5));
        assert!(report.misses.is_empty());
        for ip in 0..ps.len() {
            let v = report.curve.velocity_at(ip).expect("period resolved");
            assert_relative_eq!(v, 3.5, epsilon = 0.011);
        }
    }

    #[test]
    fn follows_a_sloped_ridge_within_one_grid_step() {
        let ps = PeriodSet::regular(20.0, 60.0, 5.0).unwrap();
        // ridge drifts from 3.3 to 3.7 km/s across periods
        let ridge = |ip: usize| 3.3 + 0.05 * ip as f64;
        let vm = ridged_matrix(&ps, scale(), ridge);
        let report = tracker().track(&vm, &ps, 1000.0, (40.0, ridge(4) + 0.1));
        for ip in 0..ps.len() {
            let v = report.curve.velocity_at(ip).expect("period resolved");
            assert_relative_eq!(v, ridge(ip), epsilon = 0.011);
        }
    }

    #[test]
    fn sub_threshold_seed_is_a_miss_not_an_error() {
        let ps = PeriodSet::regular(20.0, 60.0, 5.0).unwrap();
        let vm = ridged_matrix(&ps, scale(), |_| 3.5);
        let report = tracker().track(&vm, &ps, 1000.0, (10.0, 3.5));
        assert!(report.curve.is_empty());
        assert_eq!(report.extent, None);
        assert_eq!(
            report.misses,
            vec![ExtractionMiss::SeedBelowMinPeriod {
                period: 10.0,
                min_period: 20.0
            }]
        );
    }

    #[test]
    fn featureless_column_bounds_the_walk() {
        let ps = PeriodSet::regular(20.0, 60.0, 5.0).unwrap();
        let mut vm = ridged_matrix(&ps, scale(), |_| 3.5);
        // wipe the column left of the seed: the walk must stop there and
        // never reach the columns beyond it
        for iv in 0..vm.scale.len() {
            vm.matrix[[2, iv]] = 0.0;
        }
        let report = tracker().track(&vm, &ps, 1000.0, (40.0, 3.7));
        assert!(report
            .misses
            .contains(&ExtractionMiss::NoStraddlePair { period_index: 2 }));
        assert!(report.curve.velocity_at(2).is_none());
        assert!(report.curve.velocity_at(1).is_none());
        assert!(report.curve.velocity_at(0).is_none());
        // right side unaffected
        assert!(report.curve.velocity_at(8).is_some());
        assert_eq!(report.extent, Some((3, 8)));
    }

    #[test]
    fn fixed_seed_provider_hands_back_its_point() {
        let ps = PeriodSet::regular(20.0, 60.0, 5.0).unwrap();
        let vm = ridged_matrix(&ps, scale(), |_| 3.5);
        let mut provider = FixedSeed {
            period: 40.0,
            velocity: 3.5,
        };
        assert_eq!(provider.pick(&vm, &ps), Some((40.0, 3.5)));
    }
}
