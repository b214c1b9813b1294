//! Error taxonomy of the extraction pipeline.
//!
//! Fatal conditions abort one station pair and carry a [`ErrorClass`]
//! telling the caller whether the input data or the configuration is at
//! fault. Conditions that merely bound a measurement are not errors at
//! all; they travel as [`ExtractionMiss`] records next to the results.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad classification of a fatal extraction error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// The input traces cannot support the measurement.
    DataIntegrity,
    /// The requested parameters are internally inconsistent.
    Configuration,
}

/// Fatal error aborting the extraction for one station pair.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("trace {id} has not had its instrument response removed")]
    TracesNotCorrected { id: String },

    #[error("sampling rates differ between traces: {left} Hz vs {right} Hz")]
    SamplingRateMismatch { left: f64, right: f64 },

    #[error("reference times differ between traces: {left} vs {right}")]
    ReferenceTimeMismatch { left: String, right: String },

    #[error("envelope at period {period} s carries no energy")]
    EmptyEnvelope { period: f64 },

    #[error("invalid period set: {reason}")]
    InvalidPeriodSet { reason: String },

    #[error("band for period {period} s collapsed: [{lowcut}, {highcut}] Hz")]
    DegenerateBand {
        period: f64,
        lowcut: f64,
        highcut: f64,
    },

    #[error("invalid velocity range [{vmin}, {vmax}) km/s, step {dv}")]
    InvalidVelocityRange { vmin: f64, vmax: f64, dv: f64 },
}

impl ExtractionError {
    /// Whether the input data or the requested parameters caused the abort.
    pub fn class(&self) -> ErrorClass {
        match self {
            ExtractionError::TracesNotCorrected { .. }
            | ExtractionError::SamplingRateMismatch { .. }
            | ExtractionError::ReferenceTimeMismatch { .. }
            | ExtractionError::EmptyEnvelope { .. } => ErrorClass::DataIntegrity,
            ExtractionError::InvalidPeriodSet { .. }
            | ExtractionError::DegenerateBand { .. }
            | ExtractionError::InvalidVelocityRange { .. } => ErrorClass::Configuration,
        }
    }
}

/// Non-fatal condition bounding a measurement; carried with the results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExtractionMiss {
    /// The seed provider declined to pick a starting point.
    SeedRejected,
    /// The picked seed period sits below the trusted band.
    SeedBelowMinPeriod { period: f64, min_period: f64 },
    /// Too few in-band correlation lags to resample this period row.
    SparseRow { period_index: usize },
    /// No extremum pair in this column straddles enough of a cycle.
    NoStraddlePair { period_index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_faults_are_data_integrity() {
        let err = ExtractionError::TracesNotCorrected { id: "XX.SYN".into() };
        assert_eq!(err.class(), ErrorClass::DataIntegrity);
        let err = ExtractionError::SamplingRateMismatch {
            left: 1.0,
            right: 2.0,
        };
        assert_eq!(err.class(), ErrorClass::DataIntegrity);
        let err = ExtractionError::EmptyEnvelope { period: 20.0 };
        assert_eq!(err.class(), ErrorClass::DataIntegrity);
    }

    #[test]
    fn parameter_faults_are_configuration() {
        let err = ExtractionError::InvalidVelocityRange {
            vmin: 7.0,
            vmax: 2.0,
            dv: 0.01,
        };
        assert_eq!(err.class(), ErrorClass::Configuration);
        let err = ExtractionError::InvalidPeriodSet {
            reason: "empty".into(),
        };
        assert_eq!(err.class(), ErrorClass::Configuration);
    }

    #[test]
    fn errors_render_their_parameters() {
        let err = ExtractionError::DegenerateBand {
            period: 0.2,
            lowcut: 1.43,
            highcut: 0.495,
        };
        let msg = err.to_string();
        assert!(msg.contains("0.2"));
        assert!(msg.contains("1.43"));
    }

    #[test]
    fn misses_compare_by_value() {
        assert_eq!(
            ExtractionMiss::SparseRow { period_index: 3 },
            ExtractionMiss::SparseRow { period_index: 3 }
        );
        assert_ne!(
            ExtractionMiss::NoStraddlePair { period_index: 1 },
            ExtractionMiss::SeedRejected
        );
    }
}
