//! Terrain-aware grid extension and Restricted Quadtree Triangulation (RQT)
//! mesh reduction (spec §4.5).
use std::io::{self, Read, Write};

use nalgebra::Vector3;
use petgraph::algo::astar;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::collaborators::Terrain;
use crate::geo::{CentralBody, GeoPoint};

use super::grid::{PathFinder, IMPASSABLE};

/// Wraps a [`PathFinder`] with terrain-sampled slope rejection: any node
/// whose surface normal deviates from local down by more than `max_slope_rad`
/// becomes impassable (spec §4.5).
#[derive(Debug)]
pub struct TerrainPathFinder {
    pub grid: PathFinder,
    pub max_slope_rad: f64,
}

impl TerrainPathFinder {
    pub fn new(grid: PathFinder, max_slope_rad: f64, terrain: &dyn Terrain) -> Self {
        let mut this = Self { grid, max_slope_rad };
        this.sample_terrain(terrain);
        this
    }

    fn sample_terrain(&mut self, terrain: &dyn Terrain) {
        // NED "up" is (0, 0, -1); a flat-terrain normal points straight up,
        // so the slope angle is the deviation of the sampled normal from it.
        let up = Vector3::new(0.0, 0.0, -1.0);
        let max_slope = self.max_slope_rad;
        let m = self.grid.m as i32;
        let n = self.grid.n as i32;
        for x in 0..m {
            for y in 0..n {
                let Some(node) = self.grid.node(x, y) else { continue };
                let lat = node.location.latitude_deg;
                let lon = node.location.longitude_deg;
                let elevation = terrain.elevation(lat, lon);
                let normal = terrain.normal_ned(lat, lon);
                let slope = normal.normalize().dot(&up).clamp(-1.0, 1.0).acos();
                let impassable = slope > max_slope;
                let node_location = GeoPoint::new(lat, lon, elevation);
                self.grid.set_node_terrain(x, y, node_location, slope, impassable);
            }
        }
    }
}

/// A reduced RQT node: grid coordinates, slope angle, and weights, ready for
/// binary serialization (spec §6 mesh-cache format).
#[derive(Debug, Clone, PartialEq)]
pub struct RqtNode {
    pub x: i32,
    pub y: i32,
    pub normal_angle: f32,
    pub base_weight: f32,
    pub weight: f64,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RqtEdge {
    pub src_idx: i32,
    pub dst_idx: i32,
}

/// Reduced graph produced by [`rqt_reduce`]: the node array is a stable index
/// space that [`RqtEdge`]s reference by absolute position, matching the
/// on-disk format in spec §6.
#[derive(Debug, Clone, Default)]
pub struct RqtGraph {
    pub nodes: Vec<RqtNode>,
    pub edges: Vec<RqtEdge>,
}

/// Signed perpendicular distance, in meters along local-NED "down"
/// magnitude, of `point` from the chord between `a` and `b`.
fn signed_distance_from_chord(point: GeoPoint, a: GeoPoint, b: GeoPoint, body: CentralBody) -> f64 {
    let chord_len = a.slant_range_to(b, body, true).max(1e-9);
    let pa = a.slant_range_to(point, body, true);
    let pb = b.slant_range_to(point, body, true);
    // Heron-style perpendicular distance from the triangle a-b-point.
    let s = (chord_len + pa + pb) / 2.0;
    let area_sq = (s * (s - chord_len) * (s - pa) * (s - pb)).max(0.0);
    2.0 * area_sq.sqrt() / chord_len
}

/// Reduces `grid` to the marked-node subset defined by the original RQT
/// algorithm (spec §4.5): block corners of `chunk_size`x`chunk_size` are
/// always marked, then at strides `2, 4, 8, ...` each edge midpoint and
/// block center is marked if it deviates from the corner-to-corner chord by
/// more than `metric`. A marked center recursively marks its four corners; a
/// marked edge midpoint recursively marks its two parallel neighbor
/// midpoints, preserving triangulation consistency.
pub fn rqt_reduce(grid: &PathFinder, chunk_size: i32, metric: f64) -> RqtGraph {
    let m = grid.m as i32;
    let n = grid.n as i32;
    let mut marked = vec![vec![false; n as usize]; m as usize];
    let body = CentralBody::default();

    let mark = |marked: &mut Vec<Vec<bool>>, x: i32, y: i32| {
        if x >= 0 && y >= 0 && (x as usize) < marked.len() && (y as usize) < marked[0].len() {
            marked[x as usize][y as usize] = true;
        }
    };

    let mut block_x = 0;
    while block_x < m {
        let mut block_y = 0;
        while block_y < n {
            for (cx, cy) in [
                (block_x, block_y),
                (block_x, (block_y + chunk_size).min(n - 1)),
                ((block_x + chunk_size).min(m - 1), block_y),
                ((block_x + chunk_size).min(m - 1), (block_y + chunk_size).min(n - 1)),
            ] {
                mark(&mut marked, cx, cy);
            }
            block_y += chunk_size;
        }
        block_x += chunk_size;
    }

    let mut stride = 2;
    while stride <= chunk_size {
        let mut x = 0;
        while x + stride <= m - 1 || x == 0 {
            let mut y = 0;
            while y + stride <= n - 1 || y == 0 {
                let x0 = x;
                let x1 = (x + stride).min(m - 1);
                let y0 = y;
                let y1 = (y + stride).min(n - 1);
                if x1 <= x0 || y1 <= y0 {
                    y += stride;
                    continue;
                }
                let corner00 = grid.node(x0, y0).map(|n| n.location);
                let corner10 = grid.node(x1, y0).map(|n| n.location);
                let corner01 = grid.node(x0, y1).map(|n| n.location);
                let corner11 = grid.node(x1, y1).map(|n| n.location);

                let mx = (x0 + x1) / 2;
                let my = (y0 + y1) / 2;

                if let (Some(a), Some(b)) = (corner00, corner10) {
                    if let Some(mid) = grid.node(mx, y0) {
                        if signed_distance_from_chord(mid.location, a, b, body) > metric {
                            mark(&mut marked, mx, y0);
                            mark(&mut marked, mx, y1);
                        }
                    }
                }
                if let (Some(a), Some(b)) = (corner00, corner01) {
                    if let Some(mid) = grid.node(x0, my) {
                        if signed_distance_from_chord(mid.location, a, b, body) > metric {
                            mark(&mut marked, x0, my);
                            mark(&mut marked, x1, my);
                        }
                    }
                }
                if let (Some(a), Some(b)) = (corner00, corner11) {
                    if let Some(center) = grid.node(mx, my) {
                        if signed_distance_from_chord(center.location, a, b, body) > metric {
                            mark(&mut marked, mx, my);
                            mark(&mut marked, x0, y0);
                            mark(&mut marked, x1, y0);
                            mark(&mut marked, x0, y1);
                            mark(&mut marked, x1, y1);
                        }
                    }
                }
                let _ = corner01;
                let _ = corner10;
                let _ = corner11;
                y += stride;
            }
            x += stride;
        }
        stride *= 2;
    }

    let mut nodes = Vec::new();
    let mut index_of = std::collections::HashMap::new();
    for x in 0..m {
        for y in 0..n {
            if !marked[x as usize][y as usize] {
                continue;
            }
            let Some(node) = grid.node(x, y) else { continue };
            index_of.insert((x, y), nodes.len() as i32);
            nodes.push(RqtNode {
                x,
                y,
                normal_angle: node.slope_rad as f32,
                base_weight: node.base_weight as f32,
                weight: node.current_weight,
                location: node.location,
            });
        }
    }

    // Connect each marked node to its closest marked node in each of the
    // eight compass directions within chunk_size, duplicates suppressed.
    let mut edges = Vec::new();
    let mut seen = std::collections::HashSet::new();
    const DIRS: [(i32, i32); 8] = [
        (1, 0),
        (-1, 0),
        (0, 1),
        (0, -1),
        (1, 1),
        (1, -1),
        (-1, 1),
        (-1, -1),
    ];
    for &(x, y) in index_of.keys() {
        for &(dx, dy) in &DIRS {
            let mut best: Option<(i32, i32)> = None;
            for step in 1..=chunk_size {
                let (nx, ny) = (x + dx * step, y + dy * step);
                if index_of.contains_key(&(nx, ny)) {
                    best = Some((nx, ny));
                    break;
                }
            }
            if let Some(other) = best {
                let a = index_of[&(x, y)];
                let b = index_of[&other];
                let key = (a.min(b), a.max(b));
                if seen.insert(key) {
                    edges.push(RqtEdge { src_idx: a, dst_idx: b });
                }
            }
        }
    }

    RqtGraph { nodes, edges }
}

impl RqtGraph {
    fn nearest_node(&self, point: GeoPoint, body: CentralBody) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = a.location.great_circle_distance_to(point, body);
                let db = b.location.great_circle_distance_to(point, body);
                da.partial_cmp(&db).expect("distances are finite")
            })
            .map(|(idx, _)| idx)
    }

    /// `A*` over the reduced graph with cost `(edgeLength x 2) + targetWeight`
    /// (spec §4.5), from the node nearest `from` to the node nearest `to`.
    pub fn find_path(&self, from: GeoPoint, to: GeoPoint, body: CentralBody) -> Vec<GeoPoint> {
        if self.nodes.is_empty() {
            return Vec::new();
        }
        let Some(start_idx) = self.nearest_node(from, body) else { return Vec::new() };
        let Some(end_idx) = self.nearest_node(to, body) else { return Vec::new() };

        let mut graph = UnGraph::<usize, ()>::with_capacity(self.nodes.len(), self.edges.len());
        let mut handle = Vec::with_capacity(self.nodes.len());
        for i in 0..self.nodes.len() {
            handle.push(graph.add_node(i));
        }
        for edge in &self.edges {
            let (a, b) = (edge.src_idx as usize, edge.dst_idx as usize);
            if a < handle.len() && b < handle.len() {
                graph.add_edge(handle[a], handle[b], ());
            }
        }

        let start = handle[start_idx];
        let goal = handle[end_idx];
        let to_location = self.nodes[end_idx].location;

        let result = astar(
            &graph,
            start,
            |n| n == goal,
            |e| {
                let source = &self.nodes[graph[e.source()]];
                let target = &self.nodes[graph[e.target()]];
                let edge_length = source.location.great_circle_distance_to(target.location, body);
                edge_length * 2.0 + target.weight
            },
            |n| self.nodes[graph[n]].location.great_circle_distance_to(to_location, body),
        );

        match result {
            Some((_, path)) => path.into_iter().map(|idx: NodeIndex| self.nodes[graph[idx]].location).collect(),
            None => Vec::new(),
        }
    }

    /// Serializes to the binary cache format of spec §6: node array, then
    /// edge array of absolute indices.
    pub fn write_to<W: Write>(&self, mut w: W) -> io::Result<()> {
        for node in &self.nodes {
            w.write_all(&node.x.to_le_bytes())?;
            w.write_all(&node.y.to_le_bytes())?;
            w.write_all(&node.normal_angle.to_le_bytes())?;
            w.write_all(&node.base_weight.to_le_bytes())?;
            w.write_all(&node.weight.to_le_bytes())?;
            w.write_all(&node.location.latitude_deg.to_le_bytes())?;
            w.write_all(&node.location.longitude_deg.to_le_bytes())?;
            w.write_all(&node.location.altitude_m.to_le_bytes())?;
        }
        for edge in &self.edges {
            w.write_all(&edge.src_idx.to_le_bytes())?;
            w.write_all(&edge.dst_idx.to_le_bytes())?;
        }
        Ok(())
    }

    /// Inverse of [`RqtGraph::write_to`]. The node count is implicit: reading
    /// continues, fixed-width, until EOF for the edge tail, matching the
    /// original format's lack of an explicit edge count (spec §6).
    pub fn read_from<R: Read>(mut r: R, num_nodes: usize) -> io::Result<Self> {
        let mut nodes = Vec::with_capacity(num_nodes);
        for _ in 0..num_nodes {
            let x = read_i32(&mut r)?;
            let y = read_i32(&mut r)?;
            let normal_angle = read_f32(&mut r)?;
            let base_weight = read_f32(&mut r)?;
            let weight = read_f64(&mut r)?;
            let lat = read_f64(&mut r)?;
            let lon = read_f64(&mut r)?;
            let alt = read_f64(&mut r)?;
            nodes.push(RqtNode {
                x,
                y,
                normal_angle,
                base_weight,
                weight,
                location: GeoPoint::new(lat, lon, alt),
            });
        }
        let mut edges = Vec::new();
        loop {
            let mut buf = [0u8; 4];
            match r.read_exact(&mut buf) {
                Ok(()) => {
                    let src_idx = i32::from_le_bytes(buf);
                    let dst_idx = read_i32(&mut r)?;
                    edges.push(RqtEdge { src_idx, dst_idx });
                }
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
        }
        Ok(Self { nodes, edges })
    }
}

fn read_i32<R: Read>(r: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_f32<R: Read>(r: &mut R) -> io::Result<f32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

fn read_f64<R: Read>(r: &mut R) -> io::Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::FlatTerrain;

    #[test]
    fn rqt_preserves_chunk_corners_on_flat_terrain() {
        let upper_left = GeoPoint::new(1.0, -1.0, 0.0);
        let lower_right = GeoPoint::new(-1.0, 1.0, 0.0);
        let grid = PathFinder::new(upper_left, lower_right, 0.25);
        let reduced = rqt_reduce(&grid, 4, 0.0);
        for x in (0..grid.m as i32).step_by(4) {
            for y in (0..grid.n as i32).step_by(4) {
                assert!(
                    reduced.nodes.iter().any(|n| n.x == x && n.y == y),
                    "corner ({x},{y}) should remain marked"
                );
            }
        }
    }

    #[test]
    fn rqt_cache_round_trips() {
        let upper_left = GeoPoint::new(1.0, -1.0, 0.0);
        let lower_right = GeoPoint::new(-1.0, 1.0, 0.0);
        let grid = PathFinder::new(upper_left, lower_right, 0.5);
        let reduced = rqt_reduce(&grid, 2, 0.0);
        let mut buf = Vec::new();
        reduced.write_to(&mut buf).unwrap();
        let back = RqtGraph::read_from(&buf[..], reduced.nodes.len()).unwrap();
        assert_eq!(back.nodes.len(), reduced.nodes.len());
        assert_eq!(back.edges.len(), reduced.edges.len());
    }

    #[test]
    fn steep_slope_becomes_impassable() {
        struct Wall;
        impl Terrain for Wall {
            fn elevation(&self, _lat: f64, _lon: f64) -> f64 {
                0.0
            }
            fn normal_ned(&self, _lat: f64, _lon: f64) -> Vector3<f64> {
                Vector3::new(1.0, 0.0, 0.0)
            }
        }
        let upper_left = GeoPoint::new(1.0, -1.0, 0.0);
        let lower_right = GeoPoint::new(-1.0, 1.0, 0.0);
        let grid = PathFinder::new(upper_left, lower_right, 0.5);
        let tpf = TerrainPathFinder::new(grid, 0.5, &Wall);
        let node = tpf.grid.node(2, 2).unwrap();
        assert!(node.is_impassable());
        let flat = TerrainPathFinder::new(
            PathFinder::new(upper_left, lower_right, 0.5),
            0.5,
            &FlatTerrain,
        );
        assert!(!flat.grid.node(2, 2).unwrap().is_impassable());
    }
}
