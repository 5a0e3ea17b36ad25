use derive_more::Display;
use serde::Serialize;

/// Propagated state in the TEME inertial frame
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Default, Display)]
#[display(fmt = "{{pos: {}, vel: {}}}", "pos", "vel")]
pub struct InertialPosition {
    /// Position [km]
    pub pos: na::Vector3<f64>,

    /// Velocity [km/s]
    pub vel: na::Vector3<f64>,
}

impl InertialPosition {
    pub fn new(pos: [f64; 3], vel: [f64; 3]) -> Self {
        Self {
            pos: na::Vector3::from(pos),
            vel: na::Vector3::from(vel),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.pos.iter().chain(self.vel.iter()).all(|v| v.is_finite())
    }
}

/// Earth-fixed geodetic position on the WGS84 ellipsoid
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Default, Display)]
#[display(
    fmt = "{{lat: {}°, lon: {}°, alt: {} km}}",
    "latitude_deg",
    "longitude_deg",
    "altitude_km"
)]
pub struct GeodeticPosition {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

impl GeodeticPosition {
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude_km: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            altitude_km,
        }
    }
}

/// Globe-frame position, Y up, scaled to the rendering radius
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Default, Display, Serialize)]
#[display(fmt = "({}, {}, {})", "x", "y", "z")]
pub struct Cartesian3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Cartesian3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Distance from the globe center
    pub fn norm(&self) -> f64 {
        na::Vector3::from(*self).norm()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<Cartesian3> for na::Vector3<f64> {
    fn from(value: Cartesian3) -> Self {
        na::Vector3::new(value.x, value.y, value.z)
    }
}

impl From<na::Vector3<f64>> for Cartesian3 {
    fn from(value: na::Vector3<f64>) -> Self {
        Cartesian3::new(value.x, value.y, value.z)
    }
}
