//! Great-circle geometry: inter-station distance, azimuths, and the
//! common-line test that decides whether a station pair and an event are
//! usable for the two-station method.

use crate::trace::{Event, Station};
use log::debug;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Distance and azimuth computations between geographic coordinates.
///
/// Injected into the pipeline so surveys with their own geodetic libraries
/// can substitute a higher-order ellipsoidal implementation.
pub trait Geometry {
    /// Great-circle distance in meters between two points given as
    /// (latitude, longitude) in degrees.
    fn distance_m(&self, from: (f64, f64), to: (f64, f64)) -> f64;

    /// Forward azimuth in degrees [0, 360) from `from` towards `to`.
    fn azimuth(&self, from: (f64, f64), to: (f64, f64)) -> f64;

    /// Back-azimuth in degrees [0, 360): the azimuth seen from `to` back
    /// towards `from`.
    fn back_azimuth(&self, from: (f64, f64), to: (f64, f64)) -> f64 {
        self.azimuth(to, from)
    }
}

/// Spherical-Earth geometry on the mean radius.
#[derive(Clone, Copy, Debug, Default)]
pub struct GreatCircle;

impl Geometry for GreatCircle {
    fn distance_m(&self, from: (f64, f64), to: (f64, f64)) -> f64 {
        let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
        let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
        let dlat = lat2 - lat1;
        let dlon = lon2 - lon1;
        let a = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }

    fn azimuth(&self, from: (f64, f64), to: (f64, f64)) -> f64 {
        let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
        let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
        let dlon = lon2 - lon1;
        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        (y.atan2(x).to_degrees() + 360.0) % 360.0
    }
}

/// Check whether `event` lies (approximately) on the great circle through
/// the two stations, so that surface waves traverse the inter-station path.
///
/// Compares the inter-station back-azimuth with the station-to-event
/// back-azimuth. Within `min_angle` degrees the pair is accepted in the
/// given order; within `min_angle` of 180 degrees the event sits on the
/// opposite side and the station order is swapped. Anything else is
/// rejected.
pub fn common_line_judgement<'a, G: Geometry>(
    sta1: &'a Station,
    sta2: &'a Station,
    event: &Event,
    min_angle: f64,
    geometry: &G,
) -> Option<(&'a Station, &'a Station)> {
    let p1 = (sta1.latitude, sta1.longitude);
    let p2 = (sta2.latitude, sta2.longitude);
    let pe = (event.latitude, event.longitude);

    let intersta_baz = geometry.back_azimuth(p1, p2);
    let event_baz = geometry.back_azimuth(p1, pe);
    let diff = angular_difference(intersta_baz, event_baz);

    if diff < min_angle {
        debug!(
            "Commonline -> {}-{}-{}",
            sta1.code(),
            sta2.code(),
            event.origin
        );
        Some((sta1, sta2))
    } else if (diff - 180.0).abs() < min_angle {
        debug!(
            "Commonline -> {}-{}-{}",
            sta2.code(),
            sta1.code(),
            event.origin
        );
        Some((sta2, sta1))
    } else {
        None
    }
}

/// Smallest separation between two azimuths, in [0, 180].
fn angular_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 360.0;
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}
