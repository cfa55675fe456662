//! Concrete zone shapes (spec §3 `ZoneDefinition`, §4.2).
use std::collections::HashMap;

use crate::geo::segment::{point_in_polygon, segment_intersection, Point2};
use crate::geo::{CentralBody, GeoPoint};

use super::zone::{Extrema, ZoneContext, ZoneVolume};

/// How a zone's local frame is positioned (spec §3 `reference`).
#[derive(Debug, Clone)]
pub enum ReferenceKind {
    /// Evaluated relative to the observer passed in at query time.
    Observer,
    /// A fixed internal position and heading.
    Internal {
        lat_deg: f64,
        lon_deg: f64,
        heading_rad: f64,
    },
    /// Resolved at query time from [`ZoneContext::platform_positions`].
    PlatformRef(String),
}

/// The geometric shape of a [`ZoneDefinition`].
#[derive(Debug, Clone)]
pub enum Shape {
    Circle { min_radius_m: f64, max_radius_m: f64 },
    Ellipse { semi_major_m: f64, semi_minor_m: f64 },
    /// Local (x = forward, y = right) meters, clockwise as viewed from
    /// above, per spec §3's polygon winding invariant.
    Polygon { points: Vec<(f64, f64)> },
    Sphere { min_radius_m: f64, max_radius_m: f64 },
}

#[derive(Debug, Clone)]
pub struct ZoneDefinition {
    pub name: String,
    pub shape: Shape,
    pub reference: ReferenceKind,
    pub min_altitude_m: f64,
    pub max_altitude_m: f64,
    /// Observer-relative angle bounds, radians, measured clockwise from the
    /// reference heading. `min_angle_rad <= max_angle_rad`; a full circle is
    /// `(-PI, PI)`.
    pub min_angle_rad: f64,
    pub max_angle_rad: f64,
    pub negative: bool,
    pub modifiers: HashMap<String, f64>,
}

impl ZoneDefinition {
    pub fn new(name: impl Into<String>, shape: Shape, reference: ReferenceKind) -> Self {
        Self {
            name: name.into(),
            shape,
            reference,
            min_altitude_m: -1.0e9,
            max_altitude_m: 1.0e9,
            min_angle_rad: -std::f64::consts::PI,
            max_angle_rad: std::f64::consts::PI,
            negative: false,
            modifiers: HashMap::new(),
        }
    }

    fn resolve_reference(&self, ctx: &ZoneContext) -> Option<(GeoPoint, f64)> {
        match &self.reference {
            ReferenceKind::Observer => ctx.observer,
            ReferenceKind::Internal {
                lat_deg,
                lon_deg,
                heading_rad,
            } => Some((GeoPoint::new(*lat_deg, *lon_deg, 0.0), *heading_rad)),
            ReferenceKind::PlatformRef(name) => ctx.platform_positions.get(name).copied(),
        }
    }

    /// Projects `point` into the zone's local (forward, right) plane in
    /// meters, along with the point's absolute altitude.
    fn local_xy(&self, point: GeoPoint, reference: GeoPoint, heading_rad: f64, body: CentralBody) -> Point2 {
        let ned = point.to_ned(reference, body);
        // NED -> (forward, right) by rotating about the down axis by
        // -heading, since heading rotates forward away from north.
        let (s, c) = heading_rad.sin_cos();
        let forward = ned.x * c + ned.y * s;
        let right = -ned.x * s + ned.y * c;
        Point2::new(forward, right)
    }

    fn contains_local(&self, xy: Point2, altitude_m: f64) -> bool {
        if altitude_m < self.min_altitude_m || altitude_m > self.max_altitude_m {
            return false;
        }
        if !self.angle_in_bounds(xy) {
            return false;
        }
        let raw = match &self.shape {
            Shape::Circle {
                min_radius_m,
                max_radius_m,
            } => {
                let r = xy.norm();
                r >= *min_radius_m && r <= *max_radius_m
            }
            Shape::Ellipse {
                semi_major_m,
                semi_minor_m,
            } => {
                (xy.x / semi_major_m).powi(2) + (xy.y / semi_minor_m).powi(2) <= 1.0
            }
            Shape::Polygon { points } => {
                let ring: Vec<Point2> = points.iter().map(|&(x, y)| Point2::new(x, y)).collect();
                point_in_polygon(xy, &ring)
            }
            Shape::Sphere { .. } => unreachable!("sphere handled in contains() via 3-D radius"),
        };
        raw
    }

    fn angle_in_bounds(&self, xy: Point2) -> bool {
        if self.min_angle_rad <= -std::f64::consts::PI && self.max_angle_rad >= std::f64::consts::PI
        {
            return true;
        }
        let angle = xy.y.atan2(xy.x);
        angle >= self.min_angle_rad && angle <= self.max_angle_rad
    }

    fn sphere_contains(&self, point: GeoPoint, reference: GeoPoint, body: CentralBody, min_r: f64, max_r: f64) -> bool {
        let d = point.slant_range_to(reference, body, false);
        d >= min_r && d <= max_r
    }
}

impl ZoneVolume for ZoneDefinition {
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, point: GeoPoint, ctx: &ZoneContext, body: CentralBody) -> bool {
        let Some((reference, heading)) = self.resolve_reference(ctx) else {
            return false;
        };
        let raw = if let Shape::Sphere {
            min_radius_m,
            max_radius_m,
        } = &self.shape
        {
            point.altitude_m >= self.min_altitude_m
                && point.altitude_m <= self.max_altitude_m
                && self.sphere_contains(point, reference, body, *min_radius_m, *max_radius_m)
        } else {
            let xy = self.local_xy(point, reference, heading, body);
            self.contains_local(xy, point.altitude_m)
        };
        raw ^ self.negative
    }

    fn penetration(&self, from: GeoPoint, to: GeoPoint, ctx: &ZoneContext, body: CentralBody) -> f64 {
        let Some((reference, heading)) = self.resolve_reference(ctx) else {
            return 0.0;
        };
        let full_length = from.slant_range_to(to, body, true);
        if full_length < 1e-9 {
            return if self.contains(from, ctx, body) { 0.0 } else { 0.0 };
        }

        let from_xy = self.local_xy(from, reference, heading, body);
        let to_xy = self.local_xy(to, reference, heading, body);

        let mut ts: Vec<f64> = vec![0.0, 1.0];
        ts.extend(altitude_bound_crossings(from.altitude_m, to.altitude_m, self.min_altitude_m));
        ts.extend(altitude_bound_crossings(from.altitude_m, to.altitude_m, self.max_altitude_m));

        match &self.shape {
            Shape::Circle { min_radius_m, max_radius_m } => {
                ts.extend(radius_crossings(from_xy, to_xy, *min_radius_m));
                ts.extend(radius_crossings(from_xy, to_xy, *max_radius_m));
            }
            Shape::Ellipse { semi_major_m, semi_minor_m } => {
                ts.extend(ellipse_crossings(from_xy, to_xy, *semi_major_m, *semi_minor_m));
            }
            Shape::Polygon { points } => {
                let n = points.len();
                for i in 0..n {
                    let (ax, ay) = points[i];
                    let (bx, by) = points[(i + 1) % n];
                    if let crate::geo::segment::Intersection::Point { t_ab, .. } =
                        segment_intersection(from_xy, to_xy, Point2::new(ax, ay), Point2::new(bx, by))
                    {
                        ts.push(t_ab);
                    }
                }
            }
            Shape::Sphere { min_radius_m, max_radius_m } => {
                // Use true 3-D WCS positions for the sphere case.
                let a = from.to_wcs(body);
                let b = to.to_wcs(body);
                let c = reference.to_wcs(body);
                ts.extend(sphere_crossings(a, b, c, *min_radius_m));
                ts.extend(sphere_crossings(a, b, c, *max_radius_m));
            }
        }

        ts.extend(angle_bound_crossings(self, from_xy, to_xy));

        ts.retain(|t| (0.0..=1.0).contains(t));
        ts.sort_by(|a, b| a.partial_cmp(b).unwrap());
        ts.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

        let mut total = 0.0;
        for w in ts.windows(2) {
            let (t0, t1) = (w[0], w[1]);
            let t_mid = (t0 + t1) / 2.0;
            let mid_point = lerp_geo(from, to, t_mid);
            if self.contains(mid_point, ctx, body) {
                total += (t1 - t0) * full_length;
            }
        }
        total.max(0.0)
    }

    fn centroid(&self) -> GeoPoint {
        match &self.reference {
            ReferenceKind::Internal { lat_deg, lon_deg, .. } => GeoPoint::new(*lat_deg, *lon_deg, 0.0),
            _ => GeoPoint::new(0.0, 0.0, 0.0),
        }
    }

    fn lat_lon_extrema(&self) -> Extrema {
        let (lat, lon) = match &self.reference {
            ReferenceKind::Internal { lat_deg, lon_deg, .. } => (*lat_deg, *lon_deg),
            _ => (0.0, 0.0),
        };
        let body = CentralBody::default();
        let reference = GeoPoint::new(lat, lon, 0.0);
        let radius_m = match &self.shape {
            Shape::Circle { max_radius_m, .. } | Shape::Sphere { max_radius_m, .. } => *max_radius_m,
            Shape::Ellipse { semi_major_m, semi_minor_m } => semi_major_m.max(*semi_minor_m),
            Shape::Polygon { points } => points
                .iter()
                .fold(0.0_f64, |acc, &(x, y)| acc.max((x * x + y * y).sqrt())),
        };
        let dlat = (radius_m / body.mean_radius()).to_degrees();
        let dlon = (radius_m / (body.mean_radius() * lat.to_radians().cos().max(1e-6))).to_degrees();
        Extrema {
            min_lat_deg: reference.latitude_deg - dlat,
            max_lat_deg: reference.latitude_deg + dlat,
            min_lon_deg: reference.longitude_deg - dlon,
            max_lon_deg: reference.longitude_deg + dlon,
        }
    }

    fn modifier(&self, category: &str) -> Option<f64> {
        self.modifiers.get(category).copied()
    }
}

fn lerp_geo(a: GeoPoint, b: GeoPoint, t: f64) -> GeoPoint {
    GeoPoint::new(
        a.latitude_deg + (b.latitude_deg - a.latitude_deg) * t,
        a.longitude_deg + (b.longitude_deg - a.longitude_deg) * t,
        a.altitude_m + (b.altitude_m - a.altitude_m) * t,
    )
}

fn altitude_bound_crossings(alt_from: f64, alt_to: f64, bound: f64) -> Vec<f64> {
    let d = alt_to - alt_from;
    if d.abs() < 1e-12 {
        return vec![];
    }
    let t = (bound - alt_from) / d;
    if (0.0..=1.0).contains(&t) {
        vec![t]
    } else {
        vec![]
    }
}

fn radius_crossings(from_xy: Point2, to_xy: Point2, radius: f64) -> Vec<f64> {
    // |from + t*(to-from)|^2 = radius^2
    let d = to_xy - from_xy;
    let a = d.norm_squared();
    if a < 1e-18 {
        return vec![];
    }
    let b = 2.0 * from_xy.dot(&d);
    let c = from_xy.norm_squared() - radius * radius;
    solve_quadratic(a, b, c)
}

fn ellipse_crossings(from_xy: Point2, to_xy: Point2, semi_major: f64, semi_minor: f64) -> Vec<f64> {
    let d = to_xy - from_xy;
    let a = (d.x / semi_major).powi(2) + (d.y / semi_minor).powi(2);
    let b = 2.0 * (from_xy.x * d.x / (semi_major * semi_major) + from_xy.y * d.y / (semi_minor * semi_minor));
    let c = (from_xy.x / semi_major).powi(2) + (from_xy.y / semi_minor).powi(2) - 1.0;
    solve_quadratic(a, b, c)
}

fn sphere_crossings(
    a: nalgebra::Vector3<f64>,
    b: nalgebra::Vector3<f64>,
    center: nalgebra::Vector3<f64>,
    radius: f64,
) -> Vec<f64> {
    let d = b - a;
    let m = a - center;
    let qa = d.norm_squared();
    let qb = 2.0 * m.dot(&d);
    let qc = m.norm_squared() - radius * radius;
    solve_quadratic(qa, qb, qc)
}

fn solve_quadratic(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a.abs() < 1e-18 {
        return vec![];
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return vec![];
    }
    let sq = disc.sqrt();
    vec![(-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)]
}

fn angle_bound_crossings(def: &ZoneDefinition, from_xy: Point2, to_xy: Point2) -> Vec<f64> {
    if def.min_angle_rad <= -std::f64::consts::PI && def.max_angle_rad >= std::f64::consts::PI {
        return vec![];
    }
    let angle_at = |t: f64| -> f64 {
        let p = from_xy + (to_xy - from_xy) * t;
        p.y.atan2(p.x)
    };
    let mut crossings = Vec::new();
    const STEPS: usize = 64;
    for bound in [def.min_angle_rad, def.max_angle_rad] {
        let f = |t: f64| angle_at(t) - bound;
        let mut prev_t = 0.0;
        let mut prev_v = f(0.0);
        for i in 1..=STEPS {
            let t = i as f64 / STEPS as f64;
            let v = f(t);
            if prev_v.signum() != v.signum() && prev_v.is_finite() && v.is_finite() {
                let mut lo = prev_t;
                let mut hi = t;
                let mut lo_v = prev_v;
                for _ in 0..40 {
                    let mid = (lo + hi) / 2.0;
                    let mid_v = f(mid);
                    if mid_v.signum() == lo_v.signum() {
                        lo = mid;
                        lo_v = mid_v;
                    } else {
                        hi = mid;
                    }
                }
                crossings.push((lo + hi) / 2.0);
            }
            prev_t = t;
            prev_v = v;
        }
    }
    crossings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_zone() -> ZoneDefinition {
        ZoneDefinition::new(
            "rect",
            Shape::Polygon {
                points: vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)],
            },
            ReferenceKind::Internal {
                lat_deg: 0.0,
                lon_deg: 0.0,
                heading_rad: 0.0,
            },
        )
    }

    #[test]
    fn point_in_polygon_scenario() {
        let zone = rect_zone();
        let ctx = ZoneContext::default();
        let body = CentralBody::Spherical;
        let reference = GeoPoint::new(0.0, 0.0, 0.0);
        let inside = GeoPoint::from_ned(nalgebra::Vector3::new(0.5, 0.5, 0.0), reference, body);
        let outside = GeoPoint::from_ned(nalgebra::Vector3::new(1.5, 0.5, 0.0), reference, body);
        let on_edge = GeoPoint::from_ned(nalgebra::Vector3::new(0.0, 0.5, 0.0), reference, body);
        assert!(zone.contains(inside, &ctx, body));
        assert!(!zone.contains(outside, &ctx, body));
        assert!(zone.contains(on_edge, &ctx, body));
    }

    #[test]
    fn segment_penetration_through_rectangle() {
        let zone = rect_zone();
        let ctx = ZoneContext::default();
        let body = CentralBody::Spherical;
        let reference = GeoPoint::new(0.0, 0.0, 0.0);
        let from = GeoPoint::from_ned(nalgebra::Vector3::new(-1.0, 0.5, 0.0), reference, body);
        let to = GeoPoint::from_ned(nalgebra::Vector3::new(2.0, 0.5, 0.0), reference, body);
        let pen = zone.penetration(from, to, &ctx, body);
        assert!((pen - 1.0).abs() < 1e-2, "penetration was {pen}");
    }

    #[test]
    fn negative_flag_inverts_containment() {
        let mut zone = rect_zone();
        zone.negative = true;
        let ctx = ZoneContext::default();
        let body = CentralBody::Spherical;
        let reference = GeoPoint::new(0.0, 0.0, 0.0);
        let inside = GeoPoint::from_ned(nalgebra::Vector3::new(0.5, 0.5, 0.0), reference, body);
        assert!(!zone.contains(inside, &ctx, body));
    }
}
