//! Time-varying coherent-noise volume (spec §3 `NoiseCloud`, §4.2 invariant:
//! "segment-penetration is a continuous function of time only through the
//! wind rotation").
use std::cell::Cell;
use std::collections::HashMap;

use nalgebra::Vector3;
use noise::{NoiseFn, OpenSimplex};

use crate::geo::segment::Point2;
use crate::geo::{CentralBody, GeoPoint};

use super::zone::{Extrema, ZoneContext, ZoneVolume};

/// A rectangular footprint of coherent noise, windowed in altitude, that
/// rotates about `wind_axis` at `wind_angular_speed_rad_s` (spec §3).
///
/// `contains`/`penetration` ignore [`ZoneContext`] entirely; a cloud's pose
/// is carried internally and advanced with [`NoiseCloud::advance_time`],
/// mirroring how the teacher's `NoiseGenerator` samples are driven by a
/// caller-owned position rather than an ECS resource (`systems/terrain/noise.rs`).
#[derive(Debug)]
pub struct NoiseCloud {
    pub name: String,
    pub center: GeoPoint,
    pub heading_rad: f64,
    pub half_width_m: f64,
    pub half_length_m: f64,
    pub frequency: f64,
    pub octaves: u32,
    pub threshold: f64,
    pub height_m: f64,
    pub thickness_m: f64,
    pub tile_scalar: f64,
    pub wind_angular_speed_rad_s: f64,
    pub wind_axis: Vector3<f64>,
    pub modifiers: HashMap<String, f64>,
    noise_fn: OpenSimplex,
    time_s: Cell<f64>,
}

const PENETRATION_SAMPLES: usize = 200;

impl NoiseCloud {
    pub fn new(name: impl Into<String>, center: GeoPoint, heading_rad: f64, seed: u32) -> Self {
        Self {
            name: name.into(),
            center,
            heading_rad,
            half_width_m: 1000.0,
            half_length_m: 1000.0,
            frequency: 1.0,
            octaves: 4,
            threshold: 0.5,
            height_m: center.altitude_m,
            thickness_m: 500.0,
            tile_scalar: 1.0,
            wind_angular_speed_rad_s: 0.0,
            wind_axis: Vector3::new(0.0, 0.0, 1.0),
            modifiers: HashMap::new(),
            noise_fn: OpenSimplex::new(seed),
            time_s: Cell::new(0.0),
        }
    }

    pub fn advance_time(&self, dt_s: f64) {
        self.time_s.set(self.time_s.get() + dt_s);
    }

    pub fn set_time(&self, t_s: f64) {
        self.time_s.set(t_s);
    }

    /// Drift adds a heading rotation proportional to elapsed time; the
    /// footprint is a horizontal rectangle so only `wind_axis`'s vertical
    /// component contributes.
    fn effective_heading(&self) -> f64 {
        self.heading_rad + self.wind_angular_speed_rad_s * self.time_s.get() * self.wind_axis.z
    }

    fn local_xy(&self, point: GeoPoint, body: CentralBody) -> Point2 {
        let ned = point.to_ned(self.center, body);
        let (s, c) = self.effective_heading().sin_cos();
        let forward = ned.x * c + ned.y * s;
        let right = -ned.x * s + ned.y * c;
        Point2::new(forward, right)
    }

    /// Coherent-noise density in `[0, 1]` at a local footprint coordinate,
    /// octave-summed the way `systems/terrain/noise.rs`'s `NoiseGenerator`
    /// accumulates layered `OpenSimplex` samples.
    fn density(&self, xy: Point2) -> f64 {
        let mut value = 0.0;
        let mut amplitude = 1.0;
        let mut total_amplitude = 0.0;
        let mut freq = self.frequency / self.tile_scalar.max(1e-6);
        for _ in 0..self.octaves.max(1) {
            let sample = self
                .noise_fn
                .get([xy.x * freq, xy.y * freq]);
            value += sample * amplitude;
            total_amplitude += amplitude;
            amplitude *= 0.5;
            freq *= 2.0;
        }
        let normalized = value / total_amplitude.max(1e-9);
        (normalized + 1.0) / 2.0
    }

    fn contains_xy_alt(&self, xy: Point2, altitude_m: f64) -> bool {
        let half_thickness = self.thickness_m / 2.0;
        if (altitude_m - self.height_m).abs() > half_thickness {
            return false;
        }
        if xy.x.abs() > self.half_length_m || xy.y.abs() > self.half_width_m {
            return false;
        }
        self.density(xy) >= self.threshold
    }
}

impl ZoneVolume for NoiseCloud {
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, point: GeoPoint, _ctx: &ZoneContext, body: CentralBody) -> bool {
        let xy = self.local_xy(point, body);
        self.contains_xy_alt(xy, point.altitude_m)
    }

    /// Noise density has no closed-form crossing, so this samples the
    /// segment at a fixed resolution and sums the contained sub-lengths,
    /// rather than the analytic-crossing approach `ZoneDefinition` uses.
    fn penetration(&self, from: GeoPoint, to: GeoPoint, ctx: &ZoneContext, body: CentralBody) -> f64 {
        let full_length = from.slant_range_to(to, body, true);
        if full_length < 1e-9 {
            return 0.0;
        }
        let mut total = 0.0;
        let step = 1.0 / PENETRATION_SAMPLES as f64;
        let mut prev_inside = self.contains(from, ctx, body);
        for i in 1..=PENETRATION_SAMPLES {
            let t = i as f64 * step;
            let lat = from.latitude_deg + (to.latitude_deg - from.latitude_deg) * t;
            let lon = from.longitude_deg + (to.longitude_deg - from.longitude_deg) * t;
            let alt = from.altitude_m + (to.altitude_m - from.altitude_m) * t;
            let sample = GeoPoint::new(lat, lon, alt);
            let inside = self.contains(sample, ctx, body);
            if inside || prev_inside {
                total += step * full_length;
            }
            prev_inside = inside;
        }
        total.max(0.0)
    }

    fn centroid(&self) -> GeoPoint {
        self.center
    }

    fn lat_lon_extrema(&self) -> Extrema {
        let radius_m = (self.half_length_m.powi(2) + self.half_width_m.powi(2)).sqrt();
        let body = CentralBody::default();
        let dlat = (radius_m / body.mean_radius()).to_degrees();
        let dlon = (radius_m / (body.mean_radius() * self.center.latitude_deg.to_radians().cos().max(1e-6)))
            .to_degrees();
        Extrema {
            min_lat_deg: self.center.latitude_deg - dlat,
            max_lat_deg: self.center.latitude_deg + dlat,
            min_lon_deg: self.center.longitude_deg - dlon,
            max_lon_deg: self.center.longitude_deg + dlon,
        }
    }

    fn modifier(&self, category: &str) -> Option<f64> {
        self.modifiers.get(category).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penetration_is_continuous_under_wind_rotation() {
        let center = GeoPoint::new(10.0, 10.0, 1000.0);
        let mut cloud = NoiseCloud::new("cu-1", center, 0.0, 42);
        cloud.threshold = -1.0; // always dense, isolates the rotation effect
        cloud.wind_angular_speed_rad_s = 0.05;
        let body = CentralBody::Spherical;
        let from = GeoPoint::from_ned(nalgebra::Vector3::new(-2000.0, 0.0, 0.0), center, body);
        let to = GeoPoint::from_ned(nalgebra::Vector3::new(2000.0, 0.0, 0.0), center, body);
        let ctx = ZoneContext::default();

        cloud.set_time(0.0);
        let p0 = cloud.penetration(from, to, &ctx, body);
        cloud.set_time(0.01);
        let p1 = cloud.penetration(from, to, &ctx, body);
        assert!((p0 - p1).abs() < 50.0, "penetration jumped from {p0} to {p1}");
    }

    #[test]
    fn outside_footprint_never_contains() {
        let center = GeoPoint::new(0.0, 0.0, 500.0);
        let mut cloud = NoiseCloud::new("cu-2", center, 0.0, 7);
        cloud.threshold = -1.0;
        cloud.half_length_m = 100.0;
        cloud.half_width_m = 100.0;
        let body = CentralBody::Spherical;
        let far = GeoPoint::from_ned(nalgebra::Vector3::new(5000.0, 0.0, 0.0), center, body);
        let ctx = ZoneContext::default();
        assert!(!cloud.contains(far, &ctx, body));
    }
}
