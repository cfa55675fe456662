//! A zone defined by translating and (heading-)rotating another zone's
//! shape to a new reference position (spec §3 `Zone::Reference`, §4.2).
use super::definition::{ReferenceKind, Shape, ZoneDefinition};
use super::zone::{Extrema, ZoneContext, ZoneVolume};
use crate::geo::{CentralBody, GeoPoint};

/// Builds a new zone with the same shape, altitude, angle, and modifier
/// data as `base`, but re-centered at `origin` (heading `heading_rad`) and
/// offset by `translation_m` (forward, right) in that new frame.
///
/// This realizes "one Zone may be created referencing another" (spec §4.1
/// doc comment on the original `WsfZone`) without needing a live pointer
/// back to the base zone: the resulting geometry is self-contained, which
/// keeps ownership a plain value per the §9 redesign flag.
pub fn reference_zone(
    name: impl Into<String>,
    base: &ZoneDefinition,
    origin: GeoPoint,
    heading_rad: f64,
    translation_m: (f64, f64),
) -> ZoneDefinition {
    let shape = translate_shape(&base.shape, translation_m);
    let mut def = ZoneDefinition::new(
        name,
        shape,
        ReferenceKind::Internal {
            lat_deg: origin.latitude_deg,
            lon_deg: origin.longitude_deg,
            heading_rad,
        },
    );
    def.min_altitude_m = base.min_altitude_m;
    def.max_altitude_m = base.max_altitude_m;
    def.min_angle_rad = base.min_angle_rad;
    def.max_angle_rad = base.max_angle_rad;
    def.negative = base.negative;
    def.modifiers = base.modifiers.clone();
    def
}

fn translate_shape(shape: &Shape, translation_m: (f64, f64)) -> Shape {
    match shape {
        Shape::Polygon { points } => Shape::Polygon {
            points: points
                .iter()
                .map(|&(x, y)| (x + translation_m.0, y + translation_m.1))
                .collect(),
        },
        // Circles, ellipses, and spheres are centered on the reference
        // origin itself; a pure translation of the origin already captures
        // the requested offset, so the shape is unchanged.
        other => other.clone(),
    }
}

/// Thin named wrapper retained so callers can distinguish "a zone built by
/// referencing another" from a zone authored directly, matching spec §3's
/// `Zone::Reference{base-zone-name, translation, heading-rotation}` variant.
#[derive(Debug, Clone)]
pub struct ReferenceZone {
    pub base_zone_name: String,
    pub inner: ZoneDefinition,
}

impl ZoneVolume for ReferenceZone {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn contains(&self, point: GeoPoint, ctx: &ZoneContext, body: CentralBody) -> bool {
        self.inner.contains(point, ctx, body)
    }

    fn penetration(&self, from: GeoPoint, to: GeoPoint, ctx: &ZoneContext, body: CentralBody) -> f64 {
        self.inner.penetration(from, to, ctx, body)
    }

    fn centroid(&self) -> GeoPoint {
        self.inner.centroid()
    }

    fn lat_lon_extrema(&self) -> Extrema {
        self.inner.lat_lon_extrema()
    }

    fn modifier(&self, category: &str) -> Option<f64> {
        self.inner.modifier(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::definition::ReferenceKind;

    #[test]
    fn referenced_zone_is_translated() {
        let base = ZoneDefinition::new(
            "base",
            Shape::Polygon {
                points: vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)],
            },
            ReferenceKind::Internal {
                lat_deg: 0.0,
                lon_deg: 0.0,
                heading_rad: 0.0,
            },
        );
        let origin = GeoPoint::new(1.0, 1.0, 0.0);
        let referenced = reference_zone("derived", &base, origin, 0.0, (10.0, 0.0));
        let ctx = ZoneContext::default();
        let body = CentralBody::Spherical;
        let inside = GeoPoint::from_ned(nalgebra::Vector3::new(10.5, 0.5, 0.0), origin, body);
        assert!(referenced.contains(inside, &ctx, body));
    }
}
