//! Geodetic point with WCS/ECI/NED conversions, offsets, and great-circle
//! extrapolation (spec §3 `GeoPoint`, §4.1).
use nalgebra::{Matrix3, Vector3};

use super::earth::CentralBody;

/// Latitude/longitude/altitude, degrees/degrees/meters MSL.
///
/// A value type, copied freely. Conversions to WCS/ECI/NED are round-trip
/// consistent to floating-point tolerance under a given [`CentralBody`],
/// which is always passed explicitly rather than read from global state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl GeoPoint {
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            altitude_m,
        }
    }

    fn lat_rad(self) -> f64 {
        self.latitude_deg.to_radians()
    }

    fn lon_rad(self) -> f64 {
        self.longitude_deg.to_radians()
    }

    /// Earth-centered Earth-fixed Cartesian position (WCS).
    pub fn to_wcs(self, body: CentralBody) -> Vector3<f64> {
        let (lat, lon, alt) = (self.lat_rad(), self.lon_rad(), self.altitude_m);
        let n = body.prime_vertical_radius(lat);
        let e2 = match body {
            CentralBody::Spherical => 0.0,
            CentralBody::Wgs84 => super::earth::WGS84_E2,
        };
        let x = (n + alt) * lat.cos() * lon.cos();
        let y = (n + alt) * lat.cos() * lon.sin();
        let z = (n * (1.0 - e2) + alt) * lat.sin();
        Vector3::new(x, y, z)
    }

    /// Inverse of [`GeoPoint::to_wcs`].
    pub fn from_wcs(wcs: Vector3<f64>, body: CentralBody) -> Self {
        match body {
            CentralBody::Spherical => {
                let r = wcs.norm();
                let lat = (wcs.z / r.max(1e-12)).asin();
                let lon = wcs.y.atan2(wcs.x);
                let alt = r - body.mean_radius();
                Self::new(lat.to_degrees(), lon.to_degrees(), alt)
            }
            CentralBody::Wgs84 => {
                // Bowring's method.
                let (x, y, z) = (wcs.x, wcs.y, wcs.z);
                let p = (x * x + y * y).sqrt();
                let lon = y.atan2(x);
                let a = super::earth::WGS84_A;
                let b = super::earth::WGS84_B;
                let e2 = super::earth::WGS84_E2;
                let ep2 = (a * a - b * b) / (b * b);
                let theta = (z * a).atan2(p * b);
                let lat = (z + ep2 * b * theta.sin().powi(3))
                    .atan2(p - e2 * a * theta.cos().powi(3));
                let n = a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
                let alt = p / lat.cos() - n;
                Self::new(lat.to_degrees(), lon.to_degrees(), alt)
            }
        }
    }

    /// Earth-centered inertial position at simulation time `t` seconds past
    /// the epoch at which WCS and ECI frames coincided.
    pub fn to_eci(self, body: CentralBody, t_seconds: f64) -> Vector3<f64> {
        let theta = super::earth::EARTH_ROTATION_RATE_RAD_S * t_seconds;
        rotate_z(theta) * self.to_wcs(body)
    }

    pub fn from_eci(eci: Vector3<f64>, body: CentralBody, t_seconds: f64) -> Self {
        let theta = super::earth::EARTH_ROTATION_RATE_RAD_S * t_seconds;
        let wcs = rotate_z(-theta) * eci;
        Self::from_wcs(wcs, body)
    }

    /// North-east-down offset (meters) of `self` relative to `reference`, in
    /// the local tangent plane at `reference`.
    pub fn to_ned(self, reference: GeoPoint, body: CentralBody) -> Vector3<f64> {
        let delta = self.to_wcs(body) - reference.to_wcs(body);
        ecef_to_ned_rotation(reference) * delta
    }

    /// Inverse of [`GeoPoint::to_ned`]: the point `ned` meters north/east/down
    /// of `reference`.
    pub fn from_ned(ned: Vector3<f64>, reference: GeoPoint, body: CentralBody) -> Self {
        let rot = ecef_to_ned_rotation(reference);
        let delta = rot.transpose() * ned;
        Self::from_wcs(reference.to_wcs(body) + delta, body)
    }

    /// Applies `delta_ned` rotated by `heading_rad` about the down axis, then
    /// offsets `self` by the result (spec §4.1 `Offset`).
    pub fn offset(self, heading_rad: f64, delta_ned: Vector3<f64>, body: CentralBody) -> Self {
        let rotated = rotate_about_down(heading_rad) * delta_ned;
        let here_ned = Vector3::zeros();
        let target_ned = here_ned + rotated;
        // Offset is defined relative to self: convert self -> NED(self) is
        // trivially zero, so apply target_ned relative to self directly.
        Self::from_ned(target_ned, self, body)
    }

    /// Moves along a great circle by `distance_m`, holding altitude fixed,
    /// under the given model's mean spherical radius (spec §4.1
    /// `Extrapolate`).
    pub fn extrapolate(self, heading_rad: f64, distance_m: f64, body: CentralBody) -> Self {
        let r = body.mean_radius();
        let delta = distance_m / r;
        let lat1 = self.lat_rad();
        let lon1 = self.lon_rad();
        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * heading_rad.cos()).asin();
        let lon2 = lon1
            + (heading_rad.sin() * delta.sin() * lat1.cos())
                .atan2(delta.cos() - lat1.sin() * lat2.sin());
        Self::new(lat2.to_degrees(), lon2.to_degrees(), self.altitude_m)
    }

    /// Euclidean WCS distance (`use_spherical = false`) or great-circle
    /// chord-plus-altitude distance (`use_spherical = true`) to `other`
    /// (spec §4.1 `SlantRangeTo`).
    pub fn slant_range_to(self, other: GeoPoint, body: CentralBody, use_spherical: bool) -> f64 {
        if !use_spherical {
            (other.to_wcs(body) - self.to_wcs(body)).norm()
        } else {
            let r = body.mean_radius();
            let central_angle = great_circle_central_angle(self, other);
            let chord = 2.0 * r * (central_angle / 2.0).sin();
            let dalt = other.altitude_m - self.altitude_m;
            (chord * chord + dalt * dalt).sqrt()
        }
    }

    /// Initial great-circle bearing (radians) from `self` to `other` (spec
    /// §4.1 `TrueBearingTo`).
    pub fn true_bearing_to(self, other: GeoPoint) -> f64 {
        let lat1 = self.lat_rad();
        let lat2 = other.lat_rad();
        let dlon = other.lon_rad() - self.lon_rad();
        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        y.atan2(x)
    }

    /// Great-circle surface distance only (no altitude term), used by grid
    /// path finders for edge length / heuristic.
    pub fn great_circle_distance_to(self, other: GeoPoint, body: CentralBody) -> f64 {
        body.mean_radius() * great_circle_central_angle(self, other)
    }
}

fn great_circle_central_angle(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat_rad();
    let lat2 = b.lat_rad();
    let dlat = lat2 - lat1;
    let dlon = b.lon_rad() - a.lon_rad();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

fn rotate_z(theta: f64) -> Matrix3<f64> {
    let (s, c) = theta.sin_cos();
    Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
}

/// Rotation that takes a NED-frame vector and rotates it about the down axis
/// by `heading_rad` (heading measured clockwise from north).
fn rotate_about_down(heading_rad: f64) -> Matrix3<f64> {
    let (s, c) = heading_rad.sin_cos();
    Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
}

/// Rotation matrix from ECEF-delta to NED, evaluated at `reference`.
fn ecef_to_ned_rotation(reference: GeoPoint) -> Matrix3<f64> {
    let lat = reference.lat_rad();
    let lon = reference.lon_rad();
    let (slat, clat) = lat.sin_cos();
    let (slon, clon) = lon.sin_cos();
    // Rows are North, East, Down expressed in ECEF basis.
    Matrix3::new(
        -slat * clon,
        -slat * slon,
        clat,
        -slon,
        clon,
        0.0,
        -clat * clon,
        -clat * slon,
        -slat,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wcs_round_trip_spherical() {
        let p = GeoPoint::new(34.05, -118.25, 1500.0);
        let back = GeoPoint::from_wcs(p.to_wcs(CentralBody::Spherical), CentralBody::Spherical);
        assert!((p.latitude_deg - back.latitude_deg).abs() < 1e-9);
        assert!((p.longitude_deg - back.longitude_deg).abs() < 1e-9);
        assert!((p.altitude_m - back.altitude_m).abs() < 1e-6);
    }

    #[test]
    fn wcs_round_trip_wgs84() {
        let p = GeoPoint::new(-12.3, 45.6, 320.0);
        let back = GeoPoint::from_wcs(p.to_wcs(CentralBody::Wgs84), CentralBody::Wgs84);
        assert!((p.latitude_deg - back.latitude_deg).abs() < 1e-7);
        assert!((p.longitude_deg - back.longitude_deg).abs() < 1e-7);
        assert!((p.altitude_m - back.altitude_m).abs() < 1e-3);
    }

    #[test]
    fn extrapolate_then_back_returns_to_origin() {
        let body = CentralBody::Spherical;
        let p = GeoPoint::new(10.0, 20.0, 0.0);
        let out = p.extrapolate(0.7, 50_000.0, body);
        let back = out.extrapolate(0.7 + std::f64::consts::PI, 50_000.0, body);
        assert!(p.slant_range_to(back, body, true) < 1e-3);
    }

    #[test]
    fn ned_round_trip() {
        let body = CentralBody::Wgs84;
        let reference = GeoPoint::new(40.0, -110.0, 1000.0);
        let p = GeoPoint::new(40.01, -109.99, 1200.0);
        let ned = p.to_ned(reference, body);
        let back = GeoPoint::from_ned(ned, reference, body);
        assert!(p.slant_range_to(back, body, false) < 1e-3);
    }

    #[test]
    fn bearing_north_is_zero() {
        let body = CentralBody::Spherical;
        let p = GeoPoint::new(0.0, 0.0, 0.0);
        let north = p.extrapolate(0.0, 100_000.0, body);
        let bearing = p.true_bearing_to(north);
        assert!(bearing.abs() < 1e-6);
    }
}
