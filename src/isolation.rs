//! Time-domain isolation of probable fundamental-mode energy.
//!
//! Around each per-period group arrival a smooth window is built: flat
//! inside ±n·T of the arrival, cosine-tapered across an extra ±T/2, zero
//! elsewhere (Yao et al., 2004). The taper avoids the hard edges that would
//! leak into the following filter stage.

use crate::trace::{GroupArrivals, PeriodSet, Trace};
use log::debug;
use ndarray::Array2;
use std::f64::consts::PI;

/// Builds per-period isolation windows and applies them to a raw trace.
#[derive(Clone, Debug)]
pub struct WindowIsolator {
    /// Flat-top half-width, in periods.
    pub halfwidth: f64,
}

impl WindowIsolator {
    pub fn new(halfwidth: f64) -> Self {
        WindowIsolator { halfwidth }
    }

    /// Weight of the window for period `t0` centered on `arrival`, at time
    /// `t` (all in seconds relative to the same reference).
    fn weight(&self, t: f64, arrival: f64, t0: f64) -> f64 {
        let off = (t - arrival).abs();
        let flat = self.halfwidth * t0;
        if off <= flat {
            1.0
        } else if off < flat + t0 / 2.0 {
            (PI * (off - flat) / t0).cos()
        } else {
            0.0
        }
    }

    /// One isolated row per period, each the raw trace multiplied by its
    /// window. Output shape is `[periods, trace samples]`.
    pub fn isolate(
        &self,
        trace: &Trace,
        periods: &PeriodSet,
        arrivals: &GroupArrivals,
    ) -> Array2<f64> {
        let n = trace.npts();
        let mut iso = Array2::<f64>::zeros((periods.len(), n));
        for (iperiod, &t0) in periods.iter().enumerate() {
            let arrival = arrivals.times[iperiod];
            for i in 0..n {
                let w = self.weight(trace.sample_time(i), arrival, t0);
                if w != 0.0 {
                    iso[[iperiod, i]] = trace.data[i] * w;
                }
            }
        }
        debug!("isolation matrix -> {:?}", iso.shape());
        iso
    }
}
