//! Trait seams to the surrounding simulation (spec §6 / §1 "collaborators").
//!
//! This crate never implements a scheduler, a terrain cache, a pilot, or
//! scenario input parsing. It only consumes these through the traits below.
use nalgebra::Vector3;

/// Terrain elevation/slope queries. Enabled or disabled process-wide; path
/// finders sample it at build time only (spec §6).
pub trait Terrain {
    /// Elevation in meters MSL at the given latitude/longitude (degrees).
    fn elevation(&self, lat_deg: f64, lon_deg: f64) -> f64;

    /// Unit surface normal in NED frame at the given latitude/longitude.
    fn normal_ned(&self, lat_deg: f64, lon_deg: f64) -> Vector3<f64>;
}

/// A terrain collaborator that reports flat, sea-level ground everywhere.
/// Useful for tests and for vehicles with terrain queries disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatTerrain;

impl Terrain for FlatTerrain {
    fn elevation(&self, _lat_deg: f64, _lon_deg: f64) -> f64 {
        0.0
    }

    fn normal_ned(&self, _lat_deg: f64, _lon_deg: f64) -> Vector3<f64> {
        Vector3::new(0.0, 0.0, -1.0)
    }
}

/// Opaque handle into a [`Pilot`]'s control-input table, acquired once at
/// vehicle initialization (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlHandle(pub usize);

/// A pilot (human, AI, or playback) exposing a named control-input table.
pub trait Pilot {
    /// Resolve a control input by name to a stable handle, or `None` if the
    /// active pilot does not expose that input (spec §4.12, "Unresolved
    /// reference").
    fn get_control_handle(&self, name: &str) -> Option<ControlHandle>;

    /// Normalized control value, commonly -1..+1 or 0..1.
    fn control_value(&self, handle: ControlHandle) -> f64;

    /// Boolean control reading.
    fn control_value_bool(&self, handle: ControlHandle) -> bool;
}
