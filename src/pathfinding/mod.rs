//! Weighted grid, terrain-aware RQT reduction, triangulated navigation
//! mesh, and polygon-avoidance visibility-graph routing (spec §1, §4.4-4.7).
pub mod grid;
pub mod navmesh;
pub mod route_finder;
pub mod terrain;

pub use grid::{PathFinder, PFNode, IMPASSABLE};
pub use navmesh::{NavigationCell, NavigationMesh, PathClassification};
pub use route_finder::ZoneRouteFinder;
pub use terrain::{rqt_reduce, RqtEdge, RqtGraph, RqtNode, TerrainPathFinder};
