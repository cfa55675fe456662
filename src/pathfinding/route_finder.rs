//! 2-D visibility-graph router that avoids polygonal zones (spec §4.7
//! `ZoneRouteFinder`).
use std::rc::Rc;

use crate::geo::segment::{convex_hull, point_in_polygon, segment_intersection, Intersection, Point2};
use crate::geo::{CentralBody, GeoPoint};
use crate::zones::{ReferenceKind, Shape, ZoneContext, ZoneDefinition, ZoneVolume};

const NUDGE_OUT_M: f64 = 10.0;
const MAX_NUDGE_ITERATIONS: usize = 16;

struct PolygonZone<'a> {
    def: &'a ZoneDefinition,
    origin: GeoPoint,
    ring_local: Vec<Point2>,
}

/// Router that treats a fixed set of internally-referenced polygonal zones
/// as obstacles and routes between two points with a visibility graph (spec
/// §4.7). Zones that are not `Internal`-referenced polygons with at least
/// two vertices are ignored (precondition from the original collection
/// step).
pub struct ZoneRouteFinder {
    zones: Vec<Rc<ZoneDefinition>>,
}

impl ZoneRouteFinder {
    pub fn new(zones: Vec<Rc<ZoneDefinition>>) -> Self {
        let zones = zones
            .into_iter()
            .filter(|z| matches!(z.reference, ReferenceKind::Internal { .. }))
            .filter(|z| matches!(&z.shape, Shape::Polygon { points } if points.len() >= 2))
            .collect();
        Self { zones }
    }

    fn polygon_zones(&self) -> Vec<PolygonZone<'_>> {
        self.zones
            .iter()
            .map(|def| {
                let ReferenceKind::Internal { lat_deg, lon_deg, .. } = def.reference else {
                    unreachable!("filtered at construction")
                };
                let origin = GeoPoint::new(lat_deg, lon_deg, 0.0);
                let Shape::Polygon { points } = &def.shape else {
                    unreachable!("filtered at construction")
                };
                let ring_local = points.iter().map(|&(x, y)| Point2::new(x, y)).collect();
                PolygonZone { def, origin, ring_local }
            })
            .collect()
    }

    fn vertices_geo(&self, zone: &PolygonZone, body: CentralBody) -> Vec<GeoPoint> {
        zone.ring_local
            .iter()
            .map(|p| GeoPoint::from_ned(nalgebra::Vector3::new(p.x, p.y, 0.0), zone.origin, body))
            .collect()
    }

    fn containing_zones<'a>(&self, point: GeoPoint, polygons: &'a [PolygonZone<'a>], ctx: &ZoneContext, body: CentralBody) -> Vec<&'a PolygonZone<'a>> {
        polygons
            .iter()
            .filter(|z| z.def.contains(point, ctx, body))
            .collect()
    }

    /// Pushes `point` outward past the convex hull of every zone containing
    /// it until no zone contains the result (spec §4.7 `NearestSafePoint`).
    fn nearest_safe_point(&self, point: GeoPoint, polygons: &[PolygonZone], ctx: &ZoneContext, body: CentralBody) -> GeoPoint {
        let mut current = point;
        for _ in 0..MAX_NUDGE_ITERATIONS {
            let containing = self.containing_zones(current, polygons, ctx, body);
            if containing.is_empty() {
                return current;
            }
            let mut pool: Vec<Point2> = Vec::new();
            for z in &containing {
                let reference = z.origin;
                for p in &z.ring_local {
                    let geo = GeoPoint::from_ned(nalgebra::Vector3::new(p.x, p.y, 0.0), reference, body);
                    let ned = geo.to_ned(point, body);
                    pool.push(Point2::new(ned.x, ned.y));
                }
            }
            let hull = convex_hull(&pool);
            if hull.len() < 2 {
                return current;
            }
            let local = {
                let ned = current.to_ned(point, body);
                Point2::new(ned.x, ned.y)
            };
            let (nearest_edge_point, outward_normal) = nearest_hull_edge(&hull, local);
            let nudged = nearest_edge_point + outward_normal * NUDGE_OUT_M;
            current = GeoPoint::from_ned(nalgebra::Vector3::new(nudged.x, nudged.y, 0.0), point, body);
        }
        current
    }

    /// Builds the visibility graph over both safe endpoints and every zone
    /// vertex, then returns the shortest edge-respecting path via bounded
    /// DFS (spec §4.7). Returns an empty route if no path exists.
    pub fn find_route(&self, from: GeoPoint, to: GeoPoint, ctx: &ZoneContext, body: CentralBody) -> Vec<GeoPoint> {
        let polygons = self.polygon_zones();
        let safe_from = self.nearest_safe_point(from, &polygons, ctx, body);
        let safe_to = self.nearest_safe_point(to, &polygons, ctx, body);

        let mut nodes = vec![safe_from, safe_to];
        for z in &polygons {
            nodes.extend(self.vertices_geo(z, body));
        }

        let n = nodes.len();
        let mut visible = vec![vec![false; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                if self.segment_is_clear(nodes[i], nodes[j], &polygons, body) {
                    visible[i][j] = true;
                    visible[j][i] = true;
                }
            }
        }

        let mut best_path: Option<Vec<usize>> = None;
        let mut best_len = f64::INFINITY;
        let mut visited = vec![false; n];
        let mut stack = vec![0usize];
        visited[0] = true;
        dfs(0, 1, 0.0, &nodes, &visible, &mut visited, &mut stack, &mut best_path, &mut best_len, body);

        match best_path {
            Some(indices) => indices.into_iter().map(|i| nodes[i]).collect(),
            None => Vec::new(),
        }
    }

    /// Segment `a`-`b` is clear iff it does not cross any zone edge except
    /// at a shared endpoint where the segment exits the polygon (spec §4.7).
    fn segment_is_clear(&self, a: GeoPoint, b: GeoPoint, polygons: &[PolygonZone], body: CentralBody) -> bool {
        for z in polygons {
            let reference = z.origin;
            let a_xy = to_local(a, reference, body);
            let b_xy = to_local(b, reference, body);
            let n = z.ring_local.len();
            for i in 0..n {
                let p0 = z.ring_local[i];
                let p1 = z.ring_local[(i + 1) % n];
                match segment_intersection(a_xy, b_xy, p0, p1) {
                    Intersection::Point { t_ab, t_cd, .. } => {
                        let at_shared_endpoint =
                            (t_ab < 1e-9 || t_ab > 1.0 - 1e-9) && (t_cd < 1e-9 || t_cd > 1.0 - 1e-9);
                        if !at_shared_endpoint {
                            return false;
                        }
                        // Endpoint-sharing is only permitted when the segment
                        // exits the polygon at that vertex (cross-product
                        // sign test).
                        let mid = a_xy + (b_xy - a_xy) * 0.5;
                        if point_in_polygon(mid, &z.ring_local) {
                            return false;
                        }
                    }
                    Intersection::None => {}
                }
            }
        }
        true
    }
}

fn to_local(point: GeoPoint, reference: GeoPoint, body: CentralBody) -> Point2 {
    let ned = point.to_ned(reference, body);
    Point2::new(ned.x, ned.y)
}

fn nearest_hull_edge(hull: &[Point2], point: Point2) -> (Point2, Point2) {
    let n = hull.len();
    let mut best_dist = f64::INFINITY;
    let mut best_point = hull[0];
    let mut best_normal = Point2::new(1.0, 0.0);
    for i in 0..n {
        let a = hull[i];
        let b = hull[(i + 1) % n];
        let ab = b - a;
        let len2 = ab.norm_squared().max(1e-12);
        let t = ((point - a).dot(&ab) / len2).clamp(0.0, 1.0);
        let proj = a + ab * t;
        let dist = (point - proj).norm();
        if dist < best_dist {
            best_dist = dist;
            best_point = proj;
            // Outward normal for a CCW hull: rotate edge vector -90 degrees.
            best_normal = Point2::new(ab.y, -ab.x).normalize();
        }
    }
    (best_point, best_normal)
}

#[allow(clippy::too_many_arguments)]
fn dfs(
    current: usize,
    depth: usize,
    length_so_far: f64,
    nodes: &[GeoPoint],
    visible: &[Vec<bool>],
    visited: &mut [bool],
    stack: &mut Vec<usize>,
    best_path: &mut Option<Vec<usize>>,
    best_len: &mut f64,
    body: CentralBody,
) {
    if current == 1 {
        if length_so_far < *best_len {
            *best_len = length_so_far;
            *best_path = Some(stack.clone());
        }
        return;
    }
    if length_so_far >= *best_len {
        return;
    }
    for next in 0..nodes.len() {
        if visited[next] || !visible[current][next] {
            continue;
        }
        let edge_len = nodes[current].slant_range_to(nodes[next], body, true);
        if length_so_far + edge_len >= *best_len {
            continue;
        }
        visited[next] = true;
        stack.push(next);
        dfs(next, depth + 1, length_so_far + edge_len, nodes, visible, visited, stack, best_path, best_len, body);
        stack.pop();
        visited[next] = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_zone(name: &str, origin: (f64, f64)) -> ZoneDefinition {
        ZoneDefinition::new(
            name,
            Shape::Polygon {
                points: vec![(-500.0, -500.0), (-500.0, 500.0), (500.0, 500.0), (500.0, -500.0)],
            },
            ReferenceKind::Internal {
                lat_deg: origin.0,
                lon_deg: origin.1,
                heading_rad: 0.0,
            },
        )
    }

    #[test]
    fn route_avoids_single_obstacle() {
        let zone = Rc::new(square_zone("obstacle", (0.0, 0.0)));
        let finder = ZoneRouteFinder::new(vec![zone]);
        let ctx = ZoneContext::default();
        let body = CentralBody::default();
        let origin = GeoPoint::new(0.0, 0.0, 0.0);
        let from = GeoPoint::from_ned(nalgebra::Vector3::new(-2000.0, 0.0, 0.0), origin, body);
        let to = GeoPoint::from_ned(nalgebra::Vector3::new(2000.0, 0.0, 0.0), origin, body);
        let route = finder.find_route(from, to, &ctx, body);
        assert!(!route.is_empty());
    }
}
