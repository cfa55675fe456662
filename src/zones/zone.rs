//! Zone capability set (spec §9 redesign flag: tagged capability set instead
//! of a `WsfZone` virtual chain).
use crate::geo::{CentralBody, GeoPoint};

/// Lat/lon bounding box, used for cheap overlap pruning before an expensive
/// penetration test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extrema {
    pub min_lat_deg: f64,
    pub max_lat_deg: f64,
    pub min_lon_deg: f64,
    pub max_lon_deg: f64,
}

impl Extrema {
    pub fn overlaps_segment(&self, a: GeoPoint, b: GeoPoint) -> bool {
        let seg_min_lat = a.latitude_deg.min(b.latitude_deg);
        let seg_max_lat = a.latitude_deg.max(b.latitude_deg);
        let seg_min_lon = a.longitude_deg.min(b.longitude_deg);
        let seg_max_lon = a.longitude_deg.max(b.longitude_deg);
        self.min_lat_deg <= seg_max_lat
            && self.max_lat_deg >= seg_min_lat
            && self.min_lon_deg <= seg_max_lon
            && self.max_lon_deg >= seg_min_lon
    }
}

/// An observer position/heading, needed to evaluate a zone whose reference
/// is `Observer` rather than an internally-fixed point, and to resolve
/// `PlatformRef` zones by name.
#[derive(Debug, Clone, Default)]
pub struct ZoneContext {
    pub observer: Option<(GeoPoint, f64)>,
    pub platform_positions: std::collections::HashMap<String, (GeoPoint, f64)>,
}

impl ZoneContext {
    pub fn with_observer(point: GeoPoint, heading_rad: f64) -> Self {
        Self {
            observer: Some((point, heading_rad)),
            platform_positions: Default::default(),
        }
    }
}

/// The capability set every zone-like volume implements: containment,
/// segment-penetration distance, centroid, and lat/lon extrema (spec §4.2).
pub trait ZoneVolume: std::fmt::Debug {
    fn name(&self) -> &str;

    fn contains(&self, point: GeoPoint, ctx: &ZoneContext, body: CentralBody) -> bool;

    /// Length, in meters, of the intersection of segment `from`-`to` with
    /// this volume. A segment entirely inside contributes its full length.
    fn penetration(&self, from: GeoPoint, to: GeoPoint, ctx: &ZoneContext, body: CentralBody) -> f64;

    fn centroid(&self) -> GeoPoint;

    fn lat_lon_extrema(&self) -> Extrema;

    /// Per-category attenuation modifier, if this zone carries one for
    /// `category` (spec §4.3).
    fn modifier(&self, category: &str) -> Option<f64>;
}
