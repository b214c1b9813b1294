//! Waveform and metadata containers: stations, events, traces, and the
//! period axis shared by every derived matrix.

use crate::errors::ExtractionError;
use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// A seismic station with its geographic coordinates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Station {
    pub network: String,
    pub name: String,
    pub channel: String,
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

impl Station {
    /// `network.name` identifier used in combination keys.
    pub fn code(&self) -> String {
        format!("{}.{}", self.network, self.name)
    }
}

/// An earthquake used as the common source of a station pair.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub origin: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Hypocentral depth in km.
    pub depth: f64,
    pub magnitude: f64,
}

/// A uniformly sampled, instrument-corrected waveform.
///
/// The loader guarantees calibrated amplitude units; traces failing that
/// guarantee carry `response_removed: false` and are rejected at
/// combination construction. Times are absolute: `starttime` is the time of
/// the first sample, `reftime` the record's reference (event origin) time
/// that arrivals are measured against.
#[derive(Clone, Debug)]
pub struct Trace {
    pub station: Station,
    pub data: Array1<f64>,
    pub sampling_rate: f64,
    pub starttime: DateTime<Utc>,
    pub reftime: DateTime<Utc>,
    pub response_removed: bool,
}

impl Trace {
    /// Sampling interval in seconds.
    pub fn dt(&self) -> f64 {
        1.0 / self.sampling_rate
    }

    /// Number of samples.
    pub fn npts(&self) -> usize {
        self.data.len()
    }

    /// `network.station.channel` identifier.
    pub fn id(&self) -> String {
        format!(
            "{}.{}.{}",
            self.station.network, self.station.name, self.station.channel
        )
    }

    /// Offset of the first sample from the reference time, in seconds.
    pub fn start_offset(&self) -> f64 {
        (self.starttime - self.reftime).num_milliseconds() as f64 / 1000.0
    }

    /// Time of sample `i` in seconds relative to the reference time.
    pub fn sample_time(&self, i: usize) -> f64 {
        self.start_offset() + i as f64 * self.dt()
    }

    /// Length of the record in seconds.
    pub fn duration(&self) -> f64 {
        self.npts() as f64 * self.dt()
    }
}

/// Ordered set of analysis periods in seconds.
///
/// Validated on construction: non-empty, positive, strictly increasing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeriodSet {
    periods: Array1<f64>,
}

impl PeriodSet {
    pub fn new(periods: Array1<f64>) -> Result<Self, ExtractionError> {
        if periods.is_empty() {
            return Err(ExtractionError::InvalidPeriodSet {
                reason: "empty".into(),
            });
        }
        if periods[0] <= 0.0 {
            return Err(ExtractionError::InvalidPeriodSet {
                reason: format!("non-positive period {}", periods[0]),
            });
        }
        for w in periods.windows(2) {
            if w[1] <= w[0] {
                return Err(ExtractionError::InvalidPeriodSet {
                    reason: format!("not strictly increasing at {} -> {}", w[0], w[1]),
                });
            }
        }
        Ok(PeriodSet { periods })
    }

    /// Evenly spaced periods `start, start + step, ..` up to `stop` inclusive.
    pub fn regular(start: f64, stop: f64, step: f64) -> Result<Self, ExtractionError> {
        if step <= 0.0 || stop < start {
            return Err(ExtractionError::InvalidPeriodSet {
                reason: format!("bad range {start}..{stop} step {step}"),
            });
        }
        let n = ((stop - start) / step).floor() as usize + 1;
        let periods = Array1::from_iter((0..n).map(|i| start + i as f64 * step));
        PeriodSet::new(periods)
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.periods
    }

    pub fn get(&self, i: usize) -> f64 {
        self.periods[i]
    }

    pub fn iter(&self) -> ndarray::iter::Iter<'_, f64, ndarray::Ix1> {
        self.periods.iter()
    }

    /// Index of the period closest to `period`.
    pub fn nearest_index(&self, period: f64) -> usize {
        let mut best = 0;
        let mut best_d = f64::INFINITY;
        for (i, &p) in self.periods.iter().enumerate() {
            let d = (p - period).abs();
            if d < best_d {
                best_d = d;
                best = i;
            }
        }
        best
    }
}

/// Per-period group arrival times of one trace.
///
/// Arrival times are in seconds relative to `reftime`, one entry per period
/// of the set they were measured over.
#[derive(Clone, Debug)]
pub struct GroupArrivals {
    pub reftime: DateTime<Utc>,
    pub times: Array1<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn test_station(name: &str, lat: f64, lon: f64) -> Station {
        Station {
            network: "BL".into(),
            name: name.into(),
            channel: "BHZ".into(),
            latitude: lat,
            longitude: lon,
        }
    }

    #[test]
    fn period_set_rejects_disorder() {
        assert!(PeriodSet::new(Array1::from(vec![10.0, 5.0])).is_err());
        assert!(PeriodSet::new(Array1::from(vec![])).is_err());
        assert!(PeriodSet::new(Array1::from(vec![-1.0, 5.0])).is_err());
        assert!(PeriodSet::new(Array1::from(vec![10.0, 20.0, 50.0])).is_ok());
    }

    #[test]
    fn regular_period_set_includes_endpoint() {
        let ps = PeriodSet::regular(10.0, 100.0, 10.0).unwrap();
        assert_eq!(ps.len(), 10);
        assert_relative_eq!(ps.get(9), 100.0);
    }

    #[test]
    fn nearest_index_snaps_to_grid() {
        let ps = PeriodSet::regular(10.0, 50.0, 10.0).unwrap();
        assert_eq!(ps.nearest_index(24.0), 1);
        assert_eq!(ps.nearest_index(26.0), 2);
    }

    #[test]
    fn sample_times_offset_from_reftime() {
        let reftime = Utc.with_ymd_and_hms(2014, 5, 1, 12, 0, 0).unwrap();
        let tr = Trace {
            station: test_station("NUPB", -10.0, -48.0),
            data: Array1::zeros(100),
            sampling_rate: 20.0,
            starttime: reftime + chrono::Duration::seconds(60),
            reftime,
            response_removed: true,
        };
        assert_relative_eq!(tr.start_offset(), 60.0);
        assert_relative_eq!(tr.sample_time(20), 61.0);
    }
}
