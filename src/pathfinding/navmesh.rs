//! Triangulated navigation mesh: tessellation against zones, cell adjacency,
//! and line-of-sight path smoothing (spec §4.6).
use std::collections::HashMap;
use std::rc::Rc;

use petgraph::algo::astar;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::geo::segment::{point_in_polygon, segment_intersection, Intersection, Point2};
use crate::geo::{CentralBody, GeoPoint};
use crate::zones::{ZoneContext, ZoneVolume};

pub const MAX_TESSELLATION_LEVEL: u8 = 5;
const COLLAPSE_TOLERANCE_DEG: f64 = 1e-5;

/// A leaf triangle of the mesh: three vertices, up to three neighbor cell
/// ids, a pathing weight, and per-cell modifiers (spec §3 `NavigationCell`).
#[derive(Debug, Clone)]
pub struct NavigationCell {
    pub id: usize,
    pub a: GeoPoint,
    pub b: GeoPoint,
    pub c: GeoPoint,
    pub neighbors: Vec<usize>,
    pub tessellation_level: u8,
    pub weight: f64,
    pub modifiers: HashMap<String, f64>,
}

impl NavigationCell {
    fn sides(&self) -> [(GeoPoint, GeoPoint); 3] {
        [(self.a, self.b), (self.b, self.c), (self.c, self.a)]
    }

    pub fn centroid(&self) -> GeoPoint {
        GeoPoint::new(
            (self.a.latitude_deg + self.b.latitude_deg + self.c.latitude_deg) / 3.0,
            (self.a.longitude_deg + self.b.longitude_deg + self.c.longitude_deg) / 3.0,
            (self.a.altitude_m + self.b.altitude_m + self.c.altitude_m) / 3.0,
        )
    }

    fn contains_point(&self, point: GeoPoint, reference: GeoPoint, body: CentralBody) -> bool {
        let ring = [self.a, self.b, self.c].map(|p| to_local_xy(p, reference, body));
        point_in_polygon(to_local_xy(point, reference, body), &ring)
    }
}

fn to_local_xy(point: GeoPoint, reference: GeoPoint, body: CentralBody) -> Point2 {
    let ned = point.to_ned(reference, body);
    Point2::new(ned.x, ned.y)
}

fn midpoint(a: GeoPoint, b: GeoPoint) -> GeoPoint {
    GeoPoint::new(
        (a.latitude_deg + b.latitude_deg) / 2.0,
        (a.longitude_deg + b.longitude_deg) / 2.0,
        (a.altitude_m + b.altitude_m) / 2.0,
    )
}

fn side_key(a: GeoPoint, b: GeoPoint) -> ((i64, i64), (i64, i64)) {
    let round = |p: GeoPoint| {
        (
            (p.latitude_deg / COLLAPSE_TOLERANCE_DEG).round() as i64,
            (p.longitude_deg / COLLAPSE_TOLERANCE_DEG).round() as i64,
        )
    };
    let (ka, kb) = (round(a), round(b));
    if ka <= kb {
        (ka, kb)
    } else {
        (kb, ka)
    }
}

/// How a candidate segment relates to a cell, used by the line-of-sight
/// smoothing pass (spec §4.6 `ClassifyPathToCell`).
pub enum PathClassification {
    NoRelationship,
    EndingCell,
    ExitingCell { neighbor: Option<usize>, at: GeoPoint },
}

/// Tessellated triangle mesh with zone-aware refinement and a centroid-level
/// A* grid for pathing (spec §3/§4.6).
pub struct NavigationMesh {
    pub cells: Vec<NavigationCell>,
    graph: UnGraph<usize, f64>,
    cell_node: HashMap<usize, NodeIndex>,
    body: CentralBody,
}

impl NavigationMesh {
    pub fn build(
        upper_left: GeoPoint,
        lower_right: GeoPoint,
        grid_size_deg: f64,
        zones: &[Rc<dyn ZoneVolume>],
        ctx: &ZoneContext,
        body: CentralBody,
    ) -> Self {
        let lon_span = (lower_right.longitude_deg - upper_left.longitude_deg).abs();
        let lat_span = (upper_left.latitude_deg - lower_right.latitude_deg).abs();
        let cols = (lon_span / grid_size_deg).ceil() as i32;
        let rows = (lat_span / grid_size_deg).ceil() as i32;

        let corner = |xi: i32, yi: i32| -> GeoPoint {
            GeoPoint::new(
                upper_left.latitude_deg - yi as f64 * grid_size_deg,
                upper_left.longitude_deg + xi as f64 * grid_size_deg,
                upper_left.altitude_m,
            )
        };

        let mut raw_cells = Vec::new();
        for xi in 0..cols {
            for yi in 0..rows {
                let nw = corner(xi, yi);
                let ne = corner(xi + 1, yi);
                let sw = corner(xi, yi + 1);
                let se = corner(xi + 1, yi + 1);
                raw_cells.push((nw, se, sw));
                raw_cells.push((nw, ne, se));
            }
        }

        let mut cells = Vec::new();
        for (a, b, c) in raw_cells {
            tessellate_recursive(a, b, c, 0, zones, ctx, body, &mut cells);
        }

        for (id, cell) in cells.iter_mut().enumerate() {
            cell.id = id;
        }

        compute_adjacency(&mut cells);

        let mut graph = UnGraph::new_undirected();
        let mut cell_node = HashMap::new();
        for cell in &cells {
            let idx = graph.add_node(cell.id);
            cell_node.insert(cell.id, idx);
        }
        for cell in &cells {
            let a = cell_node[&cell.id];
            for &neighbor_id in &cell.neighbors {
                if neighbor_id <= cell.id {
                    continue;
                }
                let b = cell_node[&neighbor_id];
                let dist = cell.centroid().great_circle_distance_to(cells[neighbor_id].centroid(), body);
                graph.add_edge(a, b, dist);
            }
        }

        Self {
            cells,
            graph,
            cell_node,
            body,
        }
    }

    fn find_containing_cell(&self, point: GeoPoint) -> Option<usize> {
        self.cells
            .iter()
            .find(|cell| cell.contains_point(point, cell.centroid(), self.body))
            .map(|cell| cell.id)
    }

    fn shared_side(&self, a: usize, b: usize) -> Option<(GeoPoint, GeoPoint)> {
        let cell_a = &self.cells[a];
        let cell_b = &self.cells[b];
        for side_a in cell_a.sides() {
            for side_b in cell_b.sides() {
                if side_key(side_a.0, side_a.1) == side_key(side_b.0, side_b.1) {
                    return Some(side_a);
                }
            }
        }
        None
    }

    /// Tests how `from`->`to` relates to `cell` (spec §4.6
    /// `ClassifyPathToCell`).
    pub fn classify_path_to_cell(&self, from: GeoPoint, to: GeoPoint, cell_id: usize) -> PathClassification {
        let cell = &self.cells[cell_id];
        let reference = cell.centroid();
        let from_xy = to_local_xy(from, reference, self.body);
        let to_xy = to_local_xy(to, reference, self.body);

        if cell.contains_point(to, reference, self.body) {
            return PathClassification::EndingCell;
        }

        for (sa, sb) in cell.sides() {
            let a_xy = to_local_xy(sa, reference, self.body);
            let b_xy = to_local_xy(sb, reference, self.body);
            if let Intersection::Point { at, .. } = segment_intersection(from_xy, to_xy, a_xy, b_xy) {
                let at_geo = GeoPoint::from_ned(nalgebra::Vector3::new(at.x, at.y, 0.0), reference, self.body);
                let neighbor = cell
                    .neighbors
                    .iter()
                    .find(|&&n| self.shared_side(cell_id, n) == Some((sa, sb)) || self.shared_side(cell_id, n) == Some((sb, sa)))
                    .copied();
                return PathClassification::ExitingCell { neighbor, at: at_geo };
            }
        }
        PathClassification::NoRelationship
    }

    /// Finds a route from `from` to `to` across the mesh (spec §4.6).
    /// Returns an empty route if either endpoint is outside every cell.
    pub fn find_path(&self, from: GeoPoint, to: GeoPoint) -> Vec<GeoPoint> {
        let Some(start_cell) = self.find_containing_cell(from) else {
            return Vec::new();
        };
        let Some(end_cell) = self.find_containing_cell(to) else {
            return Vec::new();
        };
        if start_cell == end_cell {
            return vec![from, to];
        }

        let start_idx = self.cell_node[&start_cell];
        let end_idx = self.cell_node[&end_cell];
        let Some((_, cell_path)) = astar(
            &self.graph,
            start_idx,
            |n| n == end_idx,
            |e| *e.weight(),
            |n| self.cells[self.graph[n]].centroid().great_circle_distance_to(to, self.body),
        ) else {
            return Vec::new();
        };

        let cell_ids: Vec<usize> = cell_path.iter().map(|&idx| self.graph[idx]).collect();

        // adjustedPath = [start, exit(c0,c1), centroid(c1), exit(c1,c2),
        // centroid(c2), ..., exit(c_{n-2},c_{n-1}), end] — the exit point on
        // each shared edge interleaved with the interior cell's centroid, in
        // cell-path order.
        let last = cell_ids.len() - 1;
        let mut adjusted = vec![from];
        for (i, w) in cell_ids.windows(2).enumerate() {
            if let Some((sa, sb)) = self.shared_side(w[0], w[1]) {
                adjusted.push(midpoint(sa, sb));
            }
            let next_cell_index = i + 1;
            if next_cell_index != last {
                adjusted.push(self.cells[w[1]].centroid());
            }
        }
        adjusted.push(to);

        let smoothed = self.smooth_line_of_sight(&adjusted, &cell_ids);
        collapse_duplicates(smoothed, from, to)
    }

    /// Walks forward from each index as far as possible while the direct
    /// segment stays inside the mesh (spec §4.6 step 5).
    fn smooth_line_of_sight(&self, waypoints: &[GeoPoint], cell_ids: &[usize]) -> Vec<GeoPoint> {
        if waypoints.len() <= 2 {
            return waypoints.to_vec();
        }
        let mut result = vec![waypoints[0]];
        let mut i = 0;
        while i < waypoints.len() - 1 {
            let mut farthest = i + 1;
            for j in (i + 2)..waypoints.len() {
                if self.segment_stays_in_mesh(waypoints[i], waypoints[j], cell_ids) {
                    farthest = j;
                } else {
                    break;
                }
            }
            result.push(waypoints[farthest]);
            i = farthest;
        }
        result
    }

    fn segment_stays_in_mesh(&self, from: GeoPoint, to: GeoPoint, cell_ids: &[usize]) -> bool {
        let mut current = from;
        let mut guard = 0;
        loop {
            guard += 1;
            if guard > cell_ids.len() + 2 {
                return false;
            }
            let Some(cell_id) = cell_ids.iter().copied().find(|&id| {
                let cell = &self.cells[id];
                cell.contains_point(current, cell.centroid(), self.body)
            }) else {
                return false;
            };
            match self.classify_path_to_cell(current, to, cell_id) {
                PathClassification::EndingCell => return true,
                PathClassification::ExitingCell { at, .. } => current = at,
                PathClassification::NoRelationship => {
                    // Nudge the segment-begin point a small step forward and retry.
                    let bearing = current.true_bearing_to(to);
                    current = current.extrapolate(bearing, 0.5, self.body);
                }
            }
        }
    }
}

fn collapse_duplicates(points: Vec<GeoPoint>, from: GeoPoint, to: GeoPoint) -> Vec<GeoPoint> {
    let total_len = from.slant_range_to(to, CentralBody::default(), true).max(1e-9);
    let mut out: Vec<GeoPoint> = Vec::with_capacity(points.len());
    for p in points {
        if let Some(last) = out.last() {
            if (last.latitude_deg - p.latitude_deg).abs() < COLLAPSE_TOLERANCE_DEG
                && (last.longitude_deg - p.longitude_deg).abs() < COLLAPSE_TOLERANCE_DEG
                && (last.altitude_m - p.altitude_m).abs() < COLLAPSE_TOLERANCE_DEG
            {
                continue;
            }
        }
        out.push(p);
    }
    // Altitude is linearly interpolated along the route from start to end.
    let n = out.len();
    if n >= 2 {
        let mut cumulative = vec![0.0; n];
        for i in 1..n {
            cumulative[i] = cumulative[i - 1]
                + out[i - 1].slant_range_to(out[i], CentralBody::default(), true);
        }
        for (i, p) in out.iter_mut().enumerate() {
            let t = (cumulative[i] / total_len).clamp(0.0, 1.0);
            p.altitude_m = from.altitude_m + (to.altitude_m - from.altitude_m) * t;
        }
    }
    out
}

fn vertices_inside_any_zone(
    a: GeoPoint,
    b: GeoPoint,
    c: GeoPoint,
    zones: &[Rc<dyn ZoneVolume>],
    ctx: &ZoneContext,
    body: CentralBody,
) -> usize {
    [a, b, c]
        .iter()
        .filter(|&&v| zones.iter().any(|z| z.contains(v, ctx, body)))
        .count()
}

/// Whether any zone carries a vertex that falls strictly inside this cell —
/// catches a zone wholly contained within the triangle with no cell vertex
/// inside it (spec §4.6 classification note).
fn any_zone_vertex_inside_cell(a: GeoPoint, b: GeoPoint, c: GeoPoint, zones: &[Rc<dyn ZoneVolume>]) -> bool {
    let reference = GeoPoint::new(
        (a.latitude_deg + b.latitude_deg + c.latitude_deg) / 3.0,
        (a.longitude_deg + b.longitude_deg + c.longitude_deg) / 3.0,
        0.0,
    );
    let body = CentralBody::default();
    let ring = [a, b, c].map(|p| to_local_xy(p, reference, body));
    zones.iter().any(|z| {
        let centroid = z.centroid();
        point_in_polygon(to_local_xy(centroid, reference, body), &ring)
    })
}

fn tessellate_recursive(
    a: GeoPoint,
    b: GeoPoint,
    c: GeoPoint,
    level: u8,
    zones: &[Rc<dyn ZoneVolume>],
    ctx: &ZoneContext,
    body: CentralBody,
    out: &mut Vec<NavigationCell>,
) {
    let inside_count = vertices_inside_any_zone(a, b, c, zones, ctx, body);
    let straddles = any_zone_vertex_inside_cell(a, b, c, zones);

    if inside_count == 3 {
        return; // fully inside an obstacle zone: discard
    }
    if inside_count == 0 && !straddles {
        out.push(NavigationCell {
            id: 0,
            a,
            b,
            c,
            neighbors: Vec::new(),
            tessellation_level: level,
            weight: 1.0,
            modifiers: HashMap::new(),
        });
        return;
    }
    if level >= MAX_TESSELLATION_LEVEL {
        // Can't refine further; keep as a boundary-straddling cell rather
        // than silently dropping coverage.
        out.push(NavigationCell {
            id: 0,
            a,
            b,
            c,
            neighbors: Vec::new(),
            tessellation_level: level,
            weight: 1.0,
            modifiers: HashMap::new(),
        });
        return;
    }

    let mab = midpoint(a, b);
    let mbc = midpoint(b, c);
    let mca = midpoint(c, a);
    for (x, y, z) in [(a, mab, mca), (mab, b, mbc), (mca, mbc, c), (mab, mbc, mca)] {
        tessellate_recursive(x, y, z, level + 1, zones, ctx, body, out);
    }
}

fn compute_adjacency(cells: &mut [NavigationCell]) {
    let mut by_side: HashMap<((i64, i64), (i64, i64)), Vec<usize>> = HashMap::new();
    for cell in cells.iter() {
        for (a, b) in cell.sides() {
            by_side.entry(side_key(a, b)).or_default().push(cell.id);
        }
    }
    let adjacency: Vec<Vec<usize>> = cells
        .iter()
        .map(|cell| {
            let mut neighbors = std::collections::BTreeSet::new();
            for (a, b) in cell.sides() {
                if let Some(owners) = by_side.get(&side_key(a, b)) {
                    for &other in owners {
                        if other != cell.id {
                            neighbors.insert(other);
                        }
                    }
                }
            }
            neighbors.into_iter().collect()
        })
        .collect();
    for (cell, neighbors) in cells.iter_mut().zip(adjacency) {
        cell.neighbors = neighbors;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbor_cells_share_two_collinear_endpoints() {
        let upper_left = GeoPoint::new(1.0, -1.0, 100.0);
        let lower_right = GeoPoint::new(-1.0, 1.0, 100.0);
        let mesh = NavigationMesh::build(upper_left, lower_right, 1.0, &[], &ZoneContext::default(), CentralBody::default());
        for cell in &mesh.cells {
            for &neighbor_id in &cell.neighbors {
                assert!(mesh.shared_side(cell.id, neighbor_id).is_some());
            }
        }
    }

    #[test]
    fn find_path_between_adjacent_cells() {
        let upper_left = GeoPoint::new(1.0, -1.0, 100.0);
        let lower_right = GeoPoint::new(-1.0, 1.0, 100.0);
        let mesh = NavigationMesh::build(upper_left, lower_right, 1.0, &[], &ZoneContext::default(), CentralBody::default());
        let from = GeoPoint::new(0.9, -0.9, 100.0);
        let to = GeoPoint::new(-0.9, 0.9, 100.0);
        let path = mesh.find_path(from, to);
        assert!(!path.is_empty());
        assert!((path.first().unwrap().altitude_m - from.altitude_m).abs() < 1e-6);
        assert!((path.last().unwrap().altitude_m - to.altitude_m).abs() < 1e-6);
    }
}
