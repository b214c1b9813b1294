//! The station-pair/event combination and its measurement pipeline.
//!
//! A [`Combination`] owns the two traces of a common-line station pair and
//! runs the dispersion extraction end to end: FTAN group arrivals, window
//! isolation, the bandpass filter bank, the period–velocity matrix, and
//! the seeded tracking of the phase-velocity curve.

use crate::config::TwoStationConfig;
use crate::errors::{ExtractionError, ExtractionMiss};
use crate::filterbank::BandpassFilterBank;
use crate::ftan::GroupArrivalEstimator;
use crate::geo::Geometry;
use crate::isolation::WindowIsolator;
use crate::tracker::{DispersionCurve, DispersionTracker, SeedProvider};
use crate::trace::{Event, PeriodSet, Trace};
use crate::velocity::{VelocityMatrix, VelocityMatrixBuilder};
use log::{error, info};
use rayon::prelude::*;

/// Everything one combination yields: the full matrix for inspection plus
/// the (possibly partial) curve and the misses that bounded it.
#[derive(Debug)]
pub struct Extraction {
    pub velocity_matrix: VelocityMatrix,
    pub curve: DispersionCurve,
    pub misses: Vec<ExtractionMiss>,
}

/// A matched station pair and event with both waveforms attached.
#[derive(Clone, Debug)]
pub struct Combination {
    pub tr1: Trace,
    pub tr2: Trace,
    pub event: Event,
    /// Inter-station great-circle distance in km.
    pub dist_km: f64,
    /// `net.sta-net.sta-originstamp` composite key.
    pub id: String,
}

impl Combination {
    /// Pair two traces for one event, validating the loader's calibration
    /// guarantee and the sampling-rate invariant, and computing the
    /// inter-station distance through the injected geometry provider.
    pub fn new<G: Geometry>(
        tr1: Trace,
        tr2: Trace,
        event: Event,
        geometry: &G,
    ) -> Result<Self, ExtractionError> {
        for tr in [&tr1, &tr2] {
            if !tr.response_removed {
                error!("{} without response removal", tr.id());
                return Err(ExtractionError::TracesNotCorrected { id: tr.id() });
            }
        }
        if tr1.sampling_rate != tr2.sampling_rate {
            error!("sampling rates of traces are different");
            return Err(ExtractionError::SamplingRateMismatch {
                left: tr1.sampling_rate,
                right: tr2.sampling_rate,
            });
        }

        let dist_km = geometry.distance_m(
            (tr1.station.latitude, tr1.station.longitude),
            (tr2.station.latitude, tr2.station.longitude),
        ) / 1000.0;
        let id = format!(
            "{}-{}-{}",
            tr1.station.code(),
            tr2.station.code(),
            event.origin.format("%Y%m%d%H%M%S")
        );
        info!("Combination {id}, dist {dist_km:.1} km");

        Ok(Combination {
            tr1,
            tr2,
            event,
            dist_km,
            id,
        })
    }

    /// Run the full two-station measurement.
    ///
    /// Fatal integrity or configuration problems abort with a classified
    /// error; everything else yields an [`Extraction`] whose curve may be
    /// partial or, when the seed is rejected, empty.
    pub fn measure_dispersion<S: SeedProvider>(
        &self,
        periods: &PeriodSet,
        cfg: &TwoStationConfig,
        seed_provider: &mut S,
    ) -> Result<Extraction, ExtractionError> {
        info!("Processing {}", self.id);

        let estimator = GroupArrivalEstimator::new(cfg.ftan_alpha);
        let (_, arrivals1) = estimator.measure(&self.tr1, periods)?;
        let (_, arrivals2) = estimator.measure(&self.tr2, periods)?;
        if arrivals1.reftime != arrivals2.reftime {
            error!("ReferenceTimeNotMatch");
            return Err(ExtractionError::ReferenceTimeMismatch {
                left: arrivals1.reftime.to_string(),
                right: arrivals2.reftime.to_string(),
            });
        }

        let isolator = WindowIsolator::new(cfg.isolation_halfwidth);
        let iso1 = isolator.isolate(&self.tr1, periods, &arrivals1);
        let iso2 = isolator.isolate(&self.tr2, periods, &arrivals2);

        let bank = BandpassFilterBank::new(cfg.period_resample);
        let filt1 = bank.apply(&self.tr1, periods, &iso1)?;
        let filt2 = bank.apply(&self.tr2, periods, &iso2)?;

        let builder = VelocityMatrixBuilder::from_config(cfg);
        let velocity_matrix = builder.build(
            self.tr1.sampling_rate,
            self.dist_km,
            periods,
            &filt1,
            &filt2,
        )?;

        let mut misses = velocity_matrix.misses.clone();
        let curve = match seed_provider.pick(&velocity_matrix, periods) {
            Some(seed) => {
                let tracker = DispersionTracker::from_config(cfg);
                let report = tracker.track(&velocity_matrix, periods, self.dist_km, seed);
                misses.extend(report.misses);
                report.curve
            }
            None => {
                info!("no usable seed, extraction discarded for {}", self.id);
                misses.push(ExtractionMiss::SeedRejected);
                DispersionCurve::empty(periods)
            }
        };

        Ok(Extraction {
            velocity_matrix,
            curve,
            misses,
        })
    }
}

/// Measure several independent combinations in parallel.
///
/// Combinations share no mutable state, so each failure stays local to its
/// own result.
pub fn measure_all<S>(
    combinations: &[Combination],
    periods: &PeriodSet,
    cfg: &TwoStationConfig,
    make_seed_provider: impl Fn(&Combination) -> S + Sync,
) -> Vec<Result<Extraction, ExtractionError>>
where
    S: SeedProvider,
{
    combinations
        .par_iter()
        .map(|combination| {
            let mut provider = make_seed_provider(combination);
            combination.measure_dispersion(periods, cfg, &mut provider)
        })
        .collect()
}
