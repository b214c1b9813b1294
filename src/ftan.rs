//! Multiple-filter technique (FTAN): per-period analytic-signal envelopes
//! and the group arrival times extracted from them.

use crate::errors::ExtractionError;
use crate::trace::{GroupArrivals, PeriodSet, Trace};
use log::debug;
use ndarray::Array2;
use num_complex::Complex64;
use realfft::RealFftPlanner;
use rustfft::FftPlanner;

/// Estimates group arrival times by running a bank of narrow Gaussian
/// filters over one trace and locating the envelope maximum per period.
#[derive(Clone, Debug)]
pub struct GroupArrivalEstimator {
    /// Width parameter of the Gaussian filters: larger values narrow the
    /// passband around each center frequency.
    pub alpha: f64,
}

impl GroupArrivalEstimator {
    pub fn new(alpha: f64) -> Self {
        GroupArrivalEstimator { alpha }
    }

    /// Analytic-signal envelopes, one row per period.
    ///
    /// The trace spectrum is multiplied by `exp(-alpha·((f − f0)/f0)²)`
    /// centered on `f0 = 1/T`, negative frequencies are suppressed and
    /// positive ones doubled, and the modulus of the inverse transform is
    /// the envelope.
    pub fn envelopes(
        &self,
        trace: &Trace,
        periods: &PeriodSet,
    ) -> Result<Array2<f64>, ExtractionError> {
        let n = trace.npts();
        if n == 0 {
            return Err(ExtractionError::EmptyEnvelope {
                period: periods.get(0),
            });
        }

        let mut real_planner = RealFftPlanner::<f64>::new();
        let r2c = real_planner.plan_fft_forward(n);
        let mut input = trace.data.to_vec();
        let mut spectrum = r2c.make_output_vec();
        r2c.process(&mut input, &mut spectrum)
            .map_err(|_| ExtractionError::EmptyEnvelope {
                period: periods.get(0),
            })?;

        let ifft = FftPlanner::<f64>::new().plan_fft_inverse(n);
        let df = trace.sampling_rate / n as f64;

        let mut amp = Array2::<f64>::zeros((periods.len(), n));
        for (iperiod, &t0) in periods.iter().enumerate() {
            let f0 = 1.0 / t0;
            let mut analytic = vec![Complex64::new(0.0, 0.0); n];
            for (k, s) in spectrum.iter().enumerate() {
                let f = k as f64 * df;
                let gauss = (-self.alpha * ((f - f0) / f0).powi(2)).exp();
                // one-sided spectrum: double interior bins, keep DC and
                // Nyquist single
                let weight = if k == 0 || (n % 2 == 0 && k == n / 2) {
                    1.0
                } else {
                    2.0
                };
                analytic[k] = Complex64::new(s.re, s.im) * (weight * gauss);
            }
            ifft.process(&mut analytic);
            let scale = 1.0 / n as f64;
            for (i, v) in analytic.iter().enumerate() {
                amp[[iperiod, i]] = v.norm() * scale;
            }
        }
        Ok(amp)
    }

    /// Reference time and per-period group arrivals of one trace.
    ///
    /// Arrivals are the envelope-maximum times in seconds relative to the
    /// trace's reference time. An all-zero or non-finite envelope row means
    /// no arrival can be produced and fails the whole measurement.
    pub fn measure(
        &self,
        trace: &Trace,
        periods: &PeriodSet,
    ) -> Result<(Array2<f64>, GroupArrivals), ExtractionError> {
        let amp = self.envelopes(trace, periods)?;

        let mut times = ndarray::Array1::zeros(periods.len());
        for (iperiod, row) in amp.outer_iter().enumerate() {
            let mut imax = 0;
            let mut vmax = f64::NEG_INFINITY;
            for (i, &v) in row.iter().enumerate() {
                if v > vmax {
                    vmax = v;
                    imax = i;
                }
            }
            if !(vmax.is_finite() && vmax > 0.0) {
                return Err(ExtractionError::EmptyEnvelope {
                    period: periods.get(iperiod),
                });
            }
            times[iperiod] = trace.sample_time(imax);
        }
        debug!("reftime -> {}", trace.reftime);

        Ok((
            amp,
            GroupArrivals {
                reftime: trace.reftime,
                times,
            },
        ))
    }
}
