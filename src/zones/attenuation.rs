//! Category-indexed attenuation over a registry of zones and clouds (spec
//! §4.3 `ZoneAttenuation`).
use std::collections::HashMap;
use std::rc::Rc;

use crate::geo::{CentralBody, GeoPoint};

use super::zone::{ZoneContext, ZoneVolume};

/// Builds, once, a reverse index from category name to the ordered list of
/// zones (or clouds, stored uniformly as [`ZoneVolume`]) carrying a modifier
/// for that category, then answers attenuation queries against it.
///
/// Mirrors `ZoneAttenuation::Initialize` iterating the simulation's zone/
/// noise-cloud registry once at start-up (spec §4.3): entries are pushed in
/// registration order and a duplicate `(category, volume-name)` pair is
/// skipped so the second registration never double-counts.
pub struct ZoneAttenuation {
    by_category: HashMap<String, Vec<Rc<dyn ZoneVolume>>>,
    seen: std::collections::HashSet<(String, String)>,
}

impl ZoneAttenuation {
    pub fn new() -> Self {
        Self {
            by_category: HashMap::new(),
            seen: std::collections::HashSet::new(),
        }
    }

    /// Registers `volume` under every category for which it carries a
    /// modifier. Call once per zone/cloud, in the order they should be
    /// summed.
    pub fn register(&mut self, volume: Rc<dyn ZoneVolume>, categories: &[&str]) {
        for &category in categories {
            let key = (category.to_string(), volume.name().to_string());
            if !self.seen.insert(key) {
                continue;
            }
            self.by_category
                .entry(category.to_string())
                .or_default()
                .push(volume.clone());
        }
    }

    /// `Sigma over indexed zones/clouds (modifier * penetration * (two_way ?
    /// 2 : 1))` for `category`; an unknown category contributes zero (spec
    /// §4.3). A zero-altitude endpoint is raised to 1 m to avoid degenerate
    /// ground contact, matching the original failure-mode note.
    pub fn compute_attenuation(
        &self,
        category: &str,
        mut from: GeoPoint,
        mut to: GeoPoint,
        two_way: bool,
        ctx: &ZoneContext,
        body: CentralBody,
    ) -> f64 {
        if from.altitude_m == 0.0 {
            from.altitude_m = 1.0;
        }
        if to.altitude_m == 0.0 {
            to.altitude_m = 1.0;
        }
        let Some(volumes) = self.by_category.get(category) else {
            return 0.0;
        };
        let multiplier = if two_way { 2.0 } else { 1.0 };
        volumes
            .iter()
            .filter_map(|v| v.modifier(category).map(|m| (v, m)))
            .map(|(v, modifier)| modifier * v.penetration(from, to, ctx, body) * multiplier)
            .sum()
    }
}

impl Default for ZoneAttenuation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::definition::{ReferenceKind, Shape, ZoneDefinition};

    fn zone_with_modifier(name: &str, category: &str, modifier: f64) -> Rc<dyn ZoneVolume> {
        let mut def = ZoneDefinition::new(
            name,
            Shape::Circle {
                min_radius_m: 0.0,
                max_radius_m: 5000.0,
            },
            ReferenceKind::Internal {
                lat_deg: 0.0,
                lon_deg: 0.0,
                heading_rad: 0.0,
            },
        );
        def.modifiers.insert(category.to_string(), modifier);
        Rc::new(def)
    }

    #[test]
    fn unknown_category_is_zero() {
        let atten = ZoneAttenuation::new();
        let ctx = ZoneContext::default();
        let body = CentralBody::Spherical;
        let from = GeoPoint::new(0.0, 0.0, 100.0);
        let to = GeoPoint::new(0.1, 0.0, 100.0);
        assert_eq!(atten.compute_attenuation("radar", from, to, false, &ctx, body), 0.0);
    }

    #[test]
    fn duplicate_registration_does_not_double_count() {
        let mut atten = ZoneAttenuation::new();
        let zone = zone_with_modifier("z1", "radar", 0.5);
        atten.register(zone.clone(), &["radar"]);
        atten.register(zone, &["radar"]);
        assert_eq!(atten.by_category.get("radar").map(Vec::len), Some(1));
    }

    #[test]
    fn two_way_doubles_single_leg() {
        let mut atten = ZoneAttenuation::new();
        let zone = zone_with_modifier("z1", "radar", 1.0);
        atten.register(zone, &["radar"]);
        let ctx = ZoneContext::default();
        let body = CentralBody::Spherical;
        let center = GeoPoint::new(0.0, 0.0, 0.0);
        let from = GeoPoint::from_ned(nalgebra::Vector3::new(-1000.0, 0.0, 100.0), center, body);
        let to = GeoPoint::from_ned(nalgebra::Vector3::new(1000.0, 0.0, 100.0), center, body);
        let one = atten.compute_attenuation("radar", from, to, false, &ctx, body);
        let two = atten.compute_attenuation("radar", from, to, true, &ctx, body);
        assert!((two - 2.0 * one).abs() < 1e-6);
    }
}
