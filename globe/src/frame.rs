//! Inertial to globe coordinate transforms
//!
//! The globe frame is Y-up with the prime meridian/equator intersection at +X.
//! Marker placement in the renderer depends on the exact axis order and signs used here.

use na::{Rotation3, Vector3};
use nav_types::{ECEF, WGS84};
use std::f64::consts::PI;
use tletypes::prelude::{Cartesian3, GeodeticPosition, InertialPosition};

/// Radius markers orbit at, in globe units
pub const MARKER_RADIUS: f64 = 1.3;

/// Radius of the rendered Earth surface, in globe units
pub const GLOBE_RADIUS: f64 = 1.0;

const METERS_PER_KM: f64 = 1000.0;
const DEG_TO_RAD: f64 = PI / 180.0;

/// Rotate a TEME vector into the Earth-fixed frame by -GMST about Z
pub fn inertial_to_earth_fixed(v: &Vector3<f64>, sidereal_time: f64) -> Vector3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), -sidereal_time) * v
}

pub fn inertial_to_geodetic(inertial: &InertialPosition, sidereal_time: f64) -> GeodeticPosition {
    let ecef = inertial_to_earth_fixed(&inertial.pos, sidereal_time) * METERS_PER_KM;
    let wgs = WGS84::from(ECEF::new(ecef.x, ecef.y, ecef.z));
    GeodeticPosition::new(
        wgs.latitude_degrees(),
        wgs.longitude_degrees(),
        wgs.altitude() / METERS_PER_KM,
    )
}

/// Place a geodetic position on a sphere of the given radius
pub fn geodetic_to_globe(geodetic: &GeodeticPosition, radius: f64) -> Cartesian3 {
    let la = (90.0 - geodetic.latitude_deg) * DEG_TO_RAD;
    let ln = (180.0 + geodetic.longitude_deg) * DEG_TO_RAD;
    Cartesian3::new(
        -(radius * la.sin() * ln.cos()),
        radius * la.cos(),
        radius * la.sin() * ln.sin(),
    )
}

pub fn to_globe_cartesian(
    inertial: &InertialPosition,
    sidereal_time: f64,
    radius: f64,
) -> Cartesian3 {
    geodetic_to_globe(&inertial_to_geodetic(inertial, sidereal_time), radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    const WGS84_EQUATORIAL_RADIUS_KM: f64 = 6378.137;

    #[test]
    fn north_pole_is_up() {
        for lon in [-180.0, -97.3, 0.0, 45.0, 179.9] {
            let c = geodetic_to_globe(&GeodeticPosition::new(90.0, lon, 400.0), MARKER_RADIUS);
            assert_eq!(c.x, 0.0);
            assert_eq!(c.z, 0.0);
            assert_eq!(c.y, MARKER_RADIUS);
        }
    }

    #[test]
    fn equator_axes() {
        let c = geodetic_to_globe(&GeodeticPosition::new(0.0, 0.0, 0.0), GLOBE_RADIUS);
        assert_relative_eq!(c.x, GLOBE_RADIUS, epsilon = 1e-12);
        assert_relative_eq!(c.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(c.z, 0.0, epsilon = 1e-12);

        let c = geodetic_to_globe(&GeodeticPosition::new(0.0, 90.0, 0.0), GLOBE_RADIUS);
        assert_relative_eq!(c.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(c.z, -GLOBE_RADIUS, epsilon = 1e-12);

        let c = geodetic_to_globe(&GeodeticPosition::new(-90.0, 12.0, 0.0), GLOBE_RADIUS);
        assert_relative_eq!(c.y, -GLOBE_RADIUS, epsilon = 1e-12);
    }

    #[test]
    fn earth_fixed_rotation() {
        let v = Vector3::new(7000.0, 0.0, 0.0);
        let ecef = inertial_to_earth_fixed(&v, FRAC_PI_2);
        assert_relative_eq!(ecef, Vector3::new(0.0, -7000.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn geodetic_on_axes() {
        let inertial = InertialPosition::new([7000.0, 0.0, 0.0], [0.0, 7.5, 0.0]);

        let g = inertial_to_geodetic(&inertial, 0.0);
        assert_relative_eq!(g.latitude_deg, 0.0, epsilon = 1e-6);
        assert_relative_eq!(g.longitude_deg, 0.0, epsilon = 1e-6);
        assert_relative_eq!(
            g.altitude_km,
            7000.0 - WGS84_EQUATORIAL_RADIUS_KM,
            epsilon = 1e-3
        );

        let g = inertial_to_geodetic(&inertial, FRAC_PI_2);
        assert_relative_eq!(g.longitude_deg, -90.0, epsilon = 1e-6);
    }

    #[test]
    fn globe_radius_is_preserved() {
        let inertial = InertialPosition::new([-4120.5, 2951.2, 4378.9], [0.0; 3]);
        for gmst in [0.0, 1.0, 4.5] {
            let c = to_globe_cartesian(&inertial, gmst, MARKER_RADIUS);
            assert_relative_eq!(c.norm(), MARKER_RADIUS, epsilon = 1e-12);
        }
    }
}
