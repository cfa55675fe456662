//! The three polymorphic output kinds a `FlightControlSystem` can own
//! (spec §3 `FlightControlSystem`, §4.12).
use crate::collaborators::ControlHandle;

use super::actuator::Actuator;
use super::modifiers::{Curve, Modifier};

/// One input stream feeding an output: a named pilot control plus the
/// cascade of modifiers applied to it, in declared order.
#[derive(Debug, Clone)]
pub struct InputStream {
    pub input_name: String,
    pub modifiers: Vec<Modifier>,
    pub resolved_handle: Option<ControlHandle>,
}

impl InputStream {
    pub fn new(input_name: impl Into<String>) -> Self {
        Self { input_name: input_name.into(), modifiers: Vec::new(), resolved_handle: None }
    }
}

/// An aerodynamic (or gear, or anything else with a physical extent)
/// control surface, driven through an optional slew-rate-limited
/// actuator.
#[derive(Debug, Clone)]
pub struct SurfaceOutput {
    pub name: String,
    pub min_angle_deg: f64,
    pub max_angle_deg: f64,
    pub current_angle_deg: f64,
    pub actuator: Option<Actuator>,
    pub angle_map_auto: Option<Curve>,
    pub angle_map_manual: Option<Curve>,
    pub input_streams: Vec<InputStream>,
}

impl SurfaceOutput {
    pub fn new(name: impl Into<String>, min_angle_deg: f64, max_angle_deg: f64) -> Self {
        Self {
            name: name.into(),
            min_angle_deg,
            max_angle_deg,
            current_angle_deg: 0.0,
            actuator: None,
            angle_map_auto: None,
            angle_map_manual: None,
            input_streams: Vec::new(),
        }
    }
}

/// A scalar control output with no physical angle (e.g. throttle lever
/// position published for other systems to read).
#[derive(Debug, Clone)]
pub struct ValueOutput {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub current: f64,
    pub input_streams: Vec<InputStream>,
}

impl ValueOutput {
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self { name: name.into(), min, max, current: 0.0, input_streams: Vec::new() }
    }
}

/// A thresholded boolean output (gear-down, speed-brake-deployed, ...).
#[derive(Debug, Clone)]
pub struct BooleanOutput {
    pub name: String,
    pub threshold: f64,
    pub current: bool,
    pub last: bool,
    pub input_streams: Vec<InputStream>,
}

impl BooleanOutput {
    pub fn new(name: impl Into<String>, threshold: f64) -> Self {
        Self { name: name.into(), threshold, current: false, last: false, input_streams: Vec::new() }
    }
}
