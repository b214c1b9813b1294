//! Two-station surface-wave dispersion measurement.
//!
//! Measures group- and phase-velocity dispersion curves of earthquake
//! surface waves recorded at station pairs lying on a common great circle
//! with the source. The pipeline per station pair:
//!
//! 1. multiple filter technique (FTAN) for per-period group arrivals,
//! 2. time-domain isolation windows around those arrivals,
//! 3. a linear-phase Kaiser-window FIR bandpass filter bank,
//! 4. cubic-spline resampling of the cross-correlation amplitudes into a
//!    period–velocity image,
//! 5. seeded local-extremum tracking of the phase-velocity ridge.
//!
//! Waveform loading, catalog management, and seed picking are external
//! collaborators; the seed enters through the [`tracker::SeedProvider`]
//! trait so interactive and automated pickers are interchangeable.

pub mod combination;
pub mod config;
pub mod errors;
pub mod filterbank;
pub mod ftan;
pub mod geo;
pub mod isolation;
pub mod math_tools;
pub mod spline;
pub mod tracker;
pub mod trace;
pub mod velocity;

pub use combination::{measure_all, Combination, Extraction};
pub use config::TwoStationConfig;
pub use errors::{ErrorClass, ExtractionError, ExtractionMiss};
pub use filterbank::BandpassFilterBank;
pub use ftan::GroupArrivalEstimator;
pub use geo::{common_line_judgement, Geometry, GreatCircle};
pub use isolation::WindowIsolator;
pub use tracker::{DispersionCurve, DispersionTracker, FixedSeed, SeedProvider, TrackReport};
pub use trace::{Event, GroupArrivals, PeriodSet, Station, Trace};
pub use velocity::{VelocityMatrix, VelocityMatrixBuilder};
