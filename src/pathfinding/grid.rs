//! Weighted 2-D grid path-finder, 8-connected (spec §4.4).
use std::collections::HashMap;

use petgraph::algo::astar;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::geo::{CentralBody, GeoPoint};
use crate::zones::{ZoneContext, ZoneVolume};

/// Sentinel "impassable" weight (spec §3 `PFNode` invariant): a node bearing
/// this weight is excluded from any path regardless of `base_weight`.
pub const IMPASSABLE: f64 = f64::INFINITY;

/// A single grid node: integer coordinates, geo-location, and the two
/// weights the spec calls out (base/current), plus a "marked" flag reused
/// by [`super::terrain::TerrainPathFinder`]'s RQT reduction.
#[derive(Debug, Clone)]
pub struct PFNode {
    pub x: i32,
    pub y: i32,
    pub base_weight: f64,
    pub current_weight: f64,
    pub location: GeoPoint,
    pub marked: bool,
    /// Surface-normal angle against local down, radians (spec §4.5). Zero
    /// until a terrain pass (`TerrainPathFinder::sample_terrain`) sets it.
    pub slope_rad: f64,
}

impl PFNode {
    fn new(x: i32, y: i32, location: GeoPoint) -> Self {
        Self {
            x,
            y,
            base_weight: 1.0,
            current_weight: 1.0,
            location,
            marked: false,
            slope_rad: 0.0,
        }
    }

    pub fn is_impassable(&self) -> bool {
        self.current_weight >= IMPASSABLE
    }
}

/// An `m`x`n` lat/lon grid of [`PFNode`]s connected 8-ways, with per-zone
/// weight contributions folded in by [`PathFinder::recalculate_weights`].
///
/// Grounded on the teacher's `systems/physics/integrator.rs` graph-over-grid
/// style of keeping a flat node array plus an index map rather than a tree,
/// generalized here from a physics integration grid to a navigation grid.
#[derive(Debug)]
pub struct PathFinder {
    pub upper_left: GeoPoint,
    pub lower_right: GeoPoint,
    pub grid_size_deg: f64,
    pub m: usize,
    pub n: usize,
    graph: UnGraph<PFNode, f64>,
    index_of: HashMap<(i32, i32), NodeIndex>,
}

impl PathFinder {
    pub fn new(upper_left: GeoPoint, lower_right: GeoPoint, grid_size_deg: f64) -> Self {
        let lon_span = (lower_right.longitude_deg - upper_left.longitude_deg).abs();
        let lat_span = (upper_left.latitude_deg - lower_right.latitude_deg).abs();
        let m = (lon_span / grid_size_deg).ceil() as usize + 1;
        let n = (lat_span / grid_size_deg).ceil() as usize + 1;

        let mut graph = UnGraph::new_undirected();
        let mut index_of = HashMap::with_capacity(m * n);
        let mut node_at = vec![vec![NodeIndex::end(); n]; m];

        for xi in 0..m {
            for yi in 0..n {
                let lon = upper_left.longitude_deg + xi as f64 * grid_size_deg;
                let lat = upper_left.latitude_deg - yi as f64 * grid_size_deg;
                let loc = GeoPoint::new(lat, lon, upper_left.altitude_m);
                let idx = graph.add_node(PFNode::new(xi as i32, yi as i32, loc));
                index_of.insert((xi as i32, yi as i32), idx);
                node_at[xi][yi] = idx;
            }
        }

        for xi in 0..m as i32 {
            for yi in 0..n as i32 {
                let a = node_at[xi as usize][yi as usize];
                for (dx, dy) in [(1, 0), (0, 1), (1, 1), (1, -1)] {
                    let (nx, ny) = (xi + dx, yi + dy);
                    if nx < 0 || ny < 0 || nx as usize >= m || ny as usize >= n {
                        continue;
                    }
                    let b = node_at[nx as usize][ny as usize];
                    let body = CentralBody::default();
                    let len = graph[a].location.great_circle_distance_to(graph[b].location, body);
                    graph.add_edge(a, b, len);
                }
            }
        }

        Self {
            upper_left,
            lower_right,
            grid_size_deg,
            m,
            n,
            graph,
            index_of,
        }
    }

    pub fn node(&self, x: i32, y: i32) -> Option<&PFNode> {
        self.index_of.get(&(x, y)).map(|&i| &self.graph[i])
    }

    fn nearest_node_index(&self, point: GeoPoint) -> NodeIndex {
        let xi = ((point.longitude_deg - self.upper_left.longitude_deg) / self.grid_size_deg)
            .round()
            .clamp(0.0, (self.m - 1) as f64) as i32;
        let yi = ((self.upper_left.latitude_deg - point.latitude_deg) / self.grid_size_deg)
            .round()
            .clamp(0.0, (self.n - 1) as f64) as i32;
        self.index_of[&(xi, yi)]
    }

    /// `weight = base + Sigma weights of zones containing the node centroid`,
    /// except any node already at [`IMPASSABLE`] is left untouched (spec §4.4).
    pub fn recalculate_weights(
        &mut self,
        zones: &[(std::rc::Rc<dyn ZoneVolume>, f64)],
        ctx: &ZoneContext,
        body: CentralBody,
    ) {
        for node in self.graph.node_weights_mut() {
            if node.is_impassable() {
                continue;
            }
            let extra: f64 = zones
                .iter()
                .filter(|(zone, _)| zone.contains(node.location, ctx, body))
                .map(|(_, weight)| weight)
                .sum();
            node.current_weight = node.base_weight + extra;
        }
    }

    /// Marks a node impassable directly, bypassing weight accumulation.
    pub fn set_impassable(&mut self, x: i32, y: i32) {
        if let Some(&idx) = self.index_of.get(&(x, y)) {
            self.graph[idx].current_weight = IMPASSABLE;
        }
    }

    /// Updates a node's location (e.g. with a terrain-sampled altitude) and
    /// surface-normal angle, and, if `impassable`, sets its weight to
    /// [`IMPASSABLE`] (spec §4.5).
    pub fn set_node_terrain(&mut self, x: i32, y: i32, location: GeoPoint, slope_rad: f64, impassable: bool) {
        if let Some(&idx) = self.index_of.get(&(x, y)) {
            let node = &mut self.graph[idx];
            node.location = location;
            node.slope_rad = slope_rad;
            if impassable {
                node.current_weight = IMPASSABLE;
            }
        }
    }

    /// `A*` over the grid with cost `edgeLength x targetNode.weight` and a
    /// great-circle heuristic; altitude is inherited from `from`, never from
    /// the path (spec §4.4).
    pub fn find_path(&self, from: GeoPoint, to: GeoPoint) -> Vec<GeoPoint> {
        let start = self.nearest_node_index(from);
        let goal = self.nearest_node_index(to);
        let body = CentralBody::default();

        let result = astar(
            &self.graph,
            start,
            |n| n == goal,
            |edge| {
                let target = edge.target();
                let target_weight = self.graph[target].current_weight;
                if target_weight >= IMPASSABLE {
                    IMPASSABLE
                } else {
                    edge.weight() * target_weight
                }
            },
            |n| self.graph[n].location.great_circle_distance_to(to, body),
        );

        match result {
            Some((_, path)) => path
                .into_iter()
                .map(|idx| {
                    let node = &self.graph[idx];
                    GeoPoint::new(node.location.latitude_deg, node.location.longitude_deg, from.altitude_m)
                })
                .collect(),
            None => Vec::new(),
        }
    }

    /// Finds the nearest grid vertex to `point`, then among that vertex's
    /// neighbors the first one not contained by `zone` (spec §4.4).
    pub fn find_closest_valid_point(&self, point: GeoPoint, zone: &dyn ZoneVolume, ctx: &ZoneContext, body: CentralBody) -> Option<GeoPoint> {
        let nearest = self.nearest_node_index(point);
        self.graph
            .neighbors(nearest)
            .find(|&idx| !zone.contains(self.graph[idx].location, ctx, body))
            .map(|idx| self.graph[idx].location)
    }

    /// Scans one of the four quadrant rims (min-x, max-x, min-y, max-y edge
    /// columns/rows) for the first passable node reachable from `point`,
    /// cycling through up to all four quadrants (spec §4.4).
    pub fn find_closest_point_on_edge(&self, point: GeoPoint) -> Option<GeoPoint> {
        let start = self.nearest_node_index(point);
        if self.graph[start].is_impassable() {
            return None;
        }

        let rims: [Box<dyn Fn() -> Vec<(i32, i32)>>; 4] = [
            Box::new(|| (0..self.n as i32).map(|y| (0, y)).collect()),
            Box::new(|| (0..self.n as i32).map(|y| (self.m as i32 - 1, y)).collect()),
            Box::new(|| (0..self.m as i32).map(|x| (x, 0)).collect()),
            Box::new(|| (0..self.m as i32).map(|x| (x, self.n as i32 - 1)).collect()),
        ];

        for rim in &rims {
            for (x, y) in rim() {
                let Some(&idx) = self.index_of.get(&(x, y)) else { continue };
                if self.graph[idx].is_impassable() {
                    continue;
                }
                if astar(&self.graph, start, |n| n == idx, |e| *e.weight(), |_| 0.0).is_some() {
                    return Some(self.graph[idx].location);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::definition::{ReferenceKind, Shape, ZoneDefinition};
    use std::rc::Rc;

    #[test]
    fn grid_route_around_weighted_zone_stays_finite() {
        let upper_left = GeoPoint::new(40.0, -110.0, 1000.0);
        let lower_right = GeoPoint::new(39.0, -109.0, 1000.0);
        let mut finder = PathFinder::new(upper_left, lower_right, 0.1);

        let zone: Rc<dyn ZoneVolume> = Rc::new(ZoneDefinition::new(
            "no-fly",
            Shape::Polygon {
                points: vec![(-500.0, -500.0), (-500.0, 500.0), (500.0, 500.0), (500.0, -500.0)],
            },
            ReferenceKind::Internal {
                lat_deg: 39.5,
                lon_deg: -109.5,
                heading_rad: 0.0,
            },
        ));
        let ctx = ZoneContext::default();
        let body = CentralBody::default();
        finder.recalculate_weights(&[(zone, 1000.0)], &ctx, body);

        let from = GeoPoint::new(39.9, -109.9, 1000.0);
        let to = GeoPoint::new(39.1, -109.1, 1000.0);
        let path = finder.find_path(from, to);
        assert!(!path.is_empty());
        for wp in &path {
            let node = finder
                .node(
                    ((wp.longitude_deg - upper_left.longitude_deg) / 0.1).round() as i32,
                    ((upper_left.latitude_deg - wp.latitude_deg) / 0.1).round() as i32,
                )
                .expect("waypoint maps to a grid node");
            assert!(node.current_weight.is_finite());
        }
    }

    #[test]
    fn impassable_node_excluded_from_path() {
        let upper_left = GeoPoint::new(1.0, -1.0, 0.0);
        let lower_right = GeoPoint::new(-1.0, 1.0, 0.0);
        let mut finder = PathFinder::new(upper_left, lower_right, 0.5);
        finder.set_impassable(2, 2);
        let node = finder.node(2, 2).unwrap();
        assert!(node.is_impassable());
    }
}
