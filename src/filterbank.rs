//! Per-period FIR bandpass filtering of the isolated traces.
//!
//! Each period gets a narrow passband around its center frequency and a
//! linear-phase Kaiser-window FIR filter, applied as a centered convolution
//! so every row keeps the raw trace length.

use crate::errors::ExtractionError;
use crate::math_tools::{convolve_same, kaiser_window};
use crate::trace::{PeriodSet, Trace};
use log::{debug, info};
use ndarray::Array2;
use std::f64::consts::PI;

/// Kaiser shape parameter of the filter-bank windows.
const KAISER_BETA: f64 = 9.0;

/// Fraction of Nyquist the upper band edge is clipped to.
const NYQUIST_MARGIN: f64 = 0.99;

/// Designs and applies one Kaiser-windowed FIR bandpass per period.
#[derive(Clone, Debug)]
pub struct BandpassFilterBank {
    /// Period resampling interval Δ in seconds; the passband of period `T`
    /// is `[1/(T + Δ/2), 1/(T − Δ/2)]`.
    pub resample_interval: f64,
}

impl BandpassFilterBank {
    pub fn new(resample_interval: f64) -> Self {
        BandpassFilterBank { resample_interval }
    }

    /// Passband `(lowcut, highcut)` in Hz for period `t0`, clipped below
    /// Nyquist. A band that collapses after clipping is a caller
    /// misconfiguration, never a silent skip.
    fn passband(&self, t0: f64, nyquist: f64) -> Result<(f64, f64), ExtractionError> {
        let half = self.resample_interval / 2.0;
        let lowcut = 1.0 / (t0 + half);
        let highcut = if t0 > half {
            (1.0 / (t0 - half)).min(NYQUIST_MARGIN * nyquist)
        } else {
            NYQUIST_MARGIN * nyquist
        };
        if lowcut >= highcut {
            return Err(ExtractionError::DegenerateBand {
                period: t0,
                lowcut,
                highcut,
            });
        }
        Ok((lowcut, highcut))
    }

    /// Filter every isolated row, producing a matrix of identical shape.
    ///
    /// The tap count is the next power of two at or above the trace length
    /// (made odd for a symmetric kernel), keeping the frequency resolution
    /// and filter length consistent across periods.
    pub fn apply(
        &self,
        trace: &Trace,
        periods: &PeriodSet,
        isolated: &Array2<f64>,
    ) -> Result<Array2<f64>, ExtractionError> {
        let nyquist = trace.sampling_rate / 2.0;
        let ntaps = trace.npts().next_power_of_two() | 1;
        debug!("filter bank: nyquist {nyquist} Hz, {ntaps} taps");

        let mut filtered = Array2::<f64>::zeros(isolated.raw_dim());
        for (iperiod, &t0) in periods.iter().enumerate() {
            let (lowcut, highcut) = self.passband(t0, nyquist)?;
            let taps = design_bandpass(lowcut, highcut, trace.sampling_rate, ntaps);
            let row = isolated.row(iperiod).to_vec();
            let out = convolve_same(&row, &taps);
            for (i, v) in out.into_iter().enumerate() {
                filtered[[iperiod, i]] = v;
            }
        }
        info!("Kaiser window filter applied");
        Ok(filtered)
    }
}

/// Windowed-sinc bandpass: difference of two Kaiser lowpasses.
fn design_bandpass(lowcut: f64, highcut: f64, sample_rate: f64, ntaps: usize) -> Vec<f64> {
    let lp_high = design_lowpass(highcut, sample_rate, ntaps);
    let lp_low = design_lowpass(lowcut, sample_rate, ntaps);
    lp_high
        .iter()
        .zip(lp_low.iter())
        .map(|(h, l)| h - l)
        .collect()
}

/// Kaiser-windowed sinc lowpass, normalized to unity gain at DC.
fn design_lowpass(cutoff_hz: f64, sample_rate: f64, ntaps: usize) -> Vec<f64> {
    let fc = cutoff_hz / sample_rate;
    let mid = (ntaps - 1) as f64 / 2.0;
    let window = kaiser_window(ntaps, KAISER_BETA);

    let mut coeffs = Vec::with_capacity(ntaps);
    for (i, w) in window.iter().enumerate() {
        let n = i as f64 - mid;
        let sinc = if n.abs() < 1e-10 {
            2.0 * PI * fc
        } else {
            (2.0 * PI * fc * n).sin() / n
        };
        coeffs.push(sinc * w);
    }

    let sum: f64 = coeffs.iter().sum();
    if sum.abs() > 1e-10 {
        for c in coeffs.iter_mut() {
            *c /= sum;
        }
    }
    coeffs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::Station;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use ndarray::Array1;

    fn trace_with(data: Array1<f64>, sr: f64) -> Trace {
        let reftime = Utc.with_ymd_and_hms(2014, 5, 1, 12, 0, 0).unwrap();
        Trace {
            station: Station {
                network: "XX".into(),
                name: "SYN".into(),
                channel: "BHZ".into(),
                latitude: 0.0,
                longitude: 0.0,
            },
            data,
            sampling_rate: sr,
            starttime: reftime,
            reftime,
            response_removed: true,
        }
    }

    #[test]
    fn output_shape_matches_input() {
        let n = 600;
        let tr = trace_with(Array1::ones(n), 1.0);
        let ps = PeriodSet::regular(20.0, 40.0, 10.0).unwrap();
        let iso = Array2::<f64>::ones((ps.len(), n));
        let out = BandpassFilterBank::new(1.0).apply(&tr, &ps, &iso).unwrap();
        assert_eq!(out.shape(), iso.shape());
    }

    #[test]
    fn passband_keeps_matching_tone_and_rejects_distant_one() {
        let n = 2048;
        let sr = 1.0;
        let t_pass = 40.0;
        let t_reject = 10.0;
        let data = Array1::from_iter((0..n).map(|i| {
            let t = i as f64 / sr;
            (2.0 * PI * t / t_pass).sin() + (2.0 * PI * t / t_reject).sin()
        }));
        let tr = trace_with(data.clone(), sr);
        let ps = PeriodSet::new(Array1::from(vec![t_pass])).unwrap();
        let mut iso = Array2::<f64>::zeros((1, n));
        for i in 0..n {
            iso[[0, i]] = data[i];
        }
        let out = BandpassFilterBank::new(1.0).apply(&tr, &ps, &iso).unwrap();

        // project the filtered signal on each tone over the central third;
        // the in-band 40 s component must dominate the rejected 10 s one
        let lo = n / 3;
        let hi = 2 * n / 3;
        let mut on_pass = 0.0;
        let mut on_reject = 0.0;
        for i in lo..hi {
            let t = i as f64 / sr;
            on_pass += out[[0, i]] * (2.0 * PI * t / t_pass).sin();
            on_reject += out[[0, i]] * (2.0 * PI * t / t_reject).sin();
        }
        assert!(
            on_pass.abs() > 10.0 * on_reject.abs(),
            "pass {on_pass}, reject {on_reject}"
        );
    }

    #[test]
    fn degenerate_band_is_a_configuration_error() {
        // a 0.2 s period at 1 Hz sampling puts the band entirely above Nyquist
        let bank = BandpassFilterBank::new(1.0);
        let err = bank.passband(0.2, 0.5).unwrap_err();
        assert!(matches!(err, ExtractionError::DegenerateBand { .. }));
        assert_eq!(
            err.class(),
            crate::errors::ErrorClass::Configuration
        );
    }

    #[test]
    fn band_is_clipped_to_nyquist_when_possible() {
        let bank = BandpassFilterBank::new(1.0);
        // t0 = 3 s, Δ/2 = 0.5 s: raw highcut 0.4 Hz stays below Nyquist
        let (lo, hi) = bank.passband(3.0, 0.5).unwrap();
        assert!(lo < hi);
        assert!(hi <= 0.5);
        assert_relative_eq!(lo, 1.0 / 3.5, epsilon = 1e-12);
    }
}
