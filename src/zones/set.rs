//! Union/exclusion of zones (spec §3 `Zone::Set`, §4.2).
use std::cell::RefCell;
use std::rc::Rc;

use crate::geo::{CentralBody, GeoPoint};

use super::zone::{Extrema, ZoneContext, ZoneVolume};

#[derive(Debug, Default)]
struct SpatialIndex {
    member_extrema: Vec<Extrema>,
    exclusion_extrema: Vec<Extrema>,
}

/// A named union of member zones minus excluded zones.
///
/// `Set` lazily builds a bounding-box index over its members/exclusions on
/// first penetration query (spec §3); `rebuild_index` invalidates it if the
/// set's membership changes.
#[derive(Debug)]
pub struct ZoneSet {
    pub name: String,
    pub members: Vec<Rc<dyn ZoneVolume>>,
    pub exclusions: Vec<Rc<dyn ZoneVolume>>,
    index: RefCell<Option<SpatialIndex>>,
}

impl ZoneSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            exclusions: Vec::new(),
            index: RefCell::new(None),
        }
    }

    pub fn add_member(&mut self, zone: Rc<dyn ZoneVolume>) {
        self.members.push(zone);
        self.rebuild_index();
    }

    pub fn add_exclusion(&mut self, zone: Rc<dyn ZoneVolume>) {
        self.exclusions.push(zone);
        self.rebuild_index();
    }

    /// Invalidates the cached spatial index; the next penetration query
    /// rebuilds it.
    pub fn rebuild_index(&mut self) {
        *self.index.get_mut() = None;
    }

    fn ensure_index(&self) {
        if self.index.borrow().is_some() {
            return;
        }
        let member_extrema = self.members.iter().map(|m| m.lat_lon_extrema()).collect();
        let exclusion_extrema = self.exclusions.iter().map(|m| m.lat_lon_extrema()).collect();
        *self.index.borrow_mut() = Some(SpatialIndex {
            member_extrema,
            exclusion_extrema,
        });
    }
}

impl ZoneVolume for ZoneSet {
    fn name(&self) -> &str {
        &self.name
    }

    /// `inside(Set, q) == (exists member. inside(member, q)) && (forall
    /// exclusion. !inside(exclusion, q))` (spec §3 invariant, §8 testable
    /// property).
    fn contains(&self, point: GeoPoint, ctx: &ZoneContext, body: CentralBody) -> bool {
        let in_any_member = self.members.iter().any(|m| m.contains(point, ctx, body));
        if !in_any_member {
            return false;
        }
        !self.exclusions.iter().any(|e| e.contains(point, ctx, body))
    }

    /// `Sigma contains(member) - Sigma contains(exclusion)`, clamped at zero
    /// (spec §4.2). Members/exclusions whose bounding box does not overlap
    /// the segment are skipped via the lazily-built spatial index.
    fn penetration(&self, from: GeoPoint, to: GeoPoint, ctx: &ZoneContext, body: CentralBody) -> f64 {
        self.ensure_index();
        let index = self.index.borrow();
        let index = index.as_ref().expect("index built above");

        let member_total: f64 = self
            .members
            .iter()
            .zip(&index.member_extrema)
            .filter(|(_, ext)| ext.overlaps_segment(from, to))
            .map(|(m, _)| m.penetration(from, to, ctx, body))
            .sum();
        let exclusion_total: f64 = self
            .exclusions
            .iter()
            .zip(&index.exclusion_extrema)
            .filter(|(_, ext)| ext.overlaps_segment(from, to))
            .map(|(e, _)| e.penetration(from, to, ctx, body))
            .sum();

        (member_total - exclusion_total).max(0.0)
    }

    fn centroid(&self) -> GeoPoint {
        if self.members.is_empty() {
            return GeoPoint::new(0.0, 0.0, 0.0);
        }
        let n = self.members.len() as f64;
        let (mut lat, mut lon, mut alt) = (0.0, 0.0, 0.0);
        for m in &self.members {
            let c = m.centroid();
            lat += c.latitude_deg;
            lon += c.longitude_deg;
            alt += c.altitude_m;
        }
        GeoPoint::new(lat / n, lon / n, alt / n)
    }

    fn lat_lon_extrema(&self) -> Extrema {
        self.members.iter().map(|m| m.lat_lon_extrema()).fold(
            Extrema {
                min_lat_deg: f64::MAX,
                max_lat_deg: f64::MIN,
                min_lon_deg: f64::MAX,
                max_lon_deg: f64::MIN,
            },
            |acc, e| Extrema {
                min_lat_deg: acc.min_lat_deg.min(e.min_lat_deg),
                max_lat_deg: acc.max_lat_deg.max(e.max_lat_deg),
                min_lon_deg: acc.min_lon_deg.min(e.min_lon_deg),
                max_lon_deg: acc.max_lon_deg.max(e.max_lon_deg),
            },
        )
    }

    fn modifier(&self, category: &str) -> Option<f64> {
        self.members.iter().find_map(|m| m.modifier(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::definition::{ReferenceKind, Shape, ZoneDefinition};

    fn square(name: &str, origin: (f64, f64)) -> Rc<dyn ZoneVolume> {
        Rc::new(ZoneDefinition::new(
            name,
            Shape::Polygon {
                points: vec![(0.0, 0.0), (0.0, 2.0), (2.0, 2.0), (2.0, 0.0)],
            },
            ReferenceKind::Internal {
                lat_deg: origin.0,
                lon_deg: origin.1,
                heading_rad: 0.0,
            },
        ))
    }

    #[test]
    fn set_excludes_hole() {
        let mut set = ZoneSet::new("donut");
        set.add_member(square("outer", (0.0, 0.0)));
        let body = CentralBody::Spherical;
        let origin = GeoPoint::new(0.0, 0.0, 0.0);
        let hole = Rc::new(ZoneDefinition::new(
            "hole",
            Shape::Circle {
                min_radius_m: 0.0,
                max_radius_m: 0.5,
            },
            ReferenceKind::Internal {
                lat_deg: 0.0,
                lon_deg: 0.0,
                heading_rad: 0.0,
            },
        ));
        set.add_exclusion(hole);
        let ctx = ZoneContext::default();
        let center = GeoPoint::from_ned(nalgebra::Vector3::new(1.0, 1.0, 0.0), origin, body);
        let near_edge = GeoPoint::from_ned(nalgebra::Vector3::new(1.9, 1.9, 0.0), origin, body);
        assert!(!set.contains(center, &ctx, body));
        assert!(set.contains(near_edge, &ctx, body));
    }
}
