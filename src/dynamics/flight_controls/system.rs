//! `FlightControlSystem`: resolves pilot inputs through cascaded
//! modifiers into surface/value/boolean outputs (spec §4.12).
use tracing::warn;

use crate::collaborators::Pilot;

use super::modifiers::ControlObservables;
use super::outputs::{BooleanOutput, SurfaceOutput, ValueOutput};

/// Opaque handle into a `FlightControlSystem`'s surface list, resolved
/// once at initialization the same way a `ControlHandle` is (spec §4.12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueHandle(pub usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BooleanHandle(pub usize);

/// Owns every surface/value/boolean output on a vehicle and the input
/// streams that drive them.
///
/// Grounded on `P6DofFlightControlSystem` (named surfaces/values/
/// booleans with handle-based lookup, `ConnectInputsWithOutputs` binding
/// pass, per-step `Update`) and `P6DofControlActuator` for the per-surface
/// actuator pass-through.
#[derive(Debug, Clone, Default)]
pub struct FlightControlSystem {
    pub surfaces: Vec<SurfaceOutput>,
    pub values: Vec<ValueOutput>,
    pub booleans: Vec<BooleanOutput>,
    pub no_lag_testing: bool,
}

impl FlightControlSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surface_handle(&self, name: &str) -> Option<SurfaceHandle> {
        self.surfaces.iter().position(|s| s.name == name).map(SurfaceHandle)
    }

    pub fn value_handle(&self, name: &str) -> Option<ValueHandle> {
        self.values.iter().position(|v| v.name == name).map(ValueHandle)
    }

    pub fn boolean_handle(&self, name: &str) -> Option<BooleanHandle> {
        self.booleans.iter().position(|b| b.name == name).map(BooleanHandle)
    }

    pub fn surface_angle_deg(&self, handle: SurfaceHandle) -> f64 {
        self.surfaces[handle.0].current_angle_deg
    }

    pub fn control_value(&self, handle: ValueHandle) -> f64 {
        self.values[handle.0].current
    }

    pub fn control_boolean(&self, handle: BooleanHandle) -> bool {
        self.booleans[handle.0].current
    }

    /// Resolves every input stream's named input against the active
    /// pilot's handle table, logging (not failing) on an unresolved
    /// reference (spec §4.12 "bind or log a warning if unresolved").
    pub fn initialize(&mut self, pilot: &dyn Pilot) {
        for surface in &mut self.surfaces {
            for stream in &mut surface.input_streams {
                stream.resolved_handle = resolve(pilot, &stream.input_name, &surface.name);
            }
        }
        for value in &mut self.values {
            for stream in &mut value.input_streams {
                stream.resolved_handle = resolve(pilot, &stream.input_name, &value.name);
            }
        }
        for boolean in &mut self.booleans {
            for stream in &mut boolean.input_streams {
                stream.resolved_handle = resolve(pilot, &stream.input_name, &boolean.name);
            }
        }
    }

    /// Advances every output by one step (spec §4.12).
    pub fn update(&mut self, pilot: &dyn Pilot, observables: &ControlObservables, dt: f64) {
        for surface in &mut self.surfaces {
            let control_output = sum_streams(&surface.input_streams, pilot, observables);
            let commanded_deg = match &surface.angle_map_auto {
                Some(curve) => curve.lookup(control_output),
                None => control_output,
            };
            let new_angle = match &mut surface.actuator {
                Some(actuator) => actuator.update(commanded_deg, dt, self.no_lag_testing),
                None => commanded_deg.clamp(surface.min_angle_deg, surface.max_angle_deg),
            };
            surface.current_angle_deg = new_angle.clamp(surface.min_angle_deg, surface.max_angle_deg);
        }

        for value in &mut self.values {
            let control_output = sum_streams(&value.input_streams, pilot, observables);
            value.current = control_output.clamp(value.min, value.max);
        }

        for boolean in &mut self.booleans {
            let control_output = sum_streams(&boolean.input_streams, pilot, observables);
            boolean.last = boolean.current;
            boolean.current = control_output >= boolean.threshold;
        }
    }
}

fn resolve(pilot: &dyn Pilot, input_name: &str, owner_name: &str) -> Option<crate::collaborators::ControlHandle> {
    let handle = pilot.get_control_handle(input_name);
    if handle.is_none() {
        warn!(input = input_name, owner = owner_name, "flight control input did not resolve to a pilot handle");
    }
    handle
}

fn sum_streams(streams: &[super::outputs::InputStream], pilot: &dyn Pilot, observables: &ControlObservables) -> f64 {
    streams
        .iter()
        .map(|stream| {
            let Some(handle) = stream.resolved_handle else { return 0.0 };
            let mut signal = pilot.control_value(handle);
            for modifier in &stream.modifiers {
                signal = modifier.apply(signal, observables);
            }
            signal
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::ControlHandle;
    use crate::dynamics::flight_controls::modifiers::Modifier;
    use crate::dynamics::flight_controls::outputs::InputStream;

    struct StubPilot;
    impl Pilot for StubPilot {
        fn get_control_handle(&self, name: &str) -> Option<ControlHandle> {
            if name == "pitch" {
                Some(ControlHandle(0))
            } else {
                None
            }
        }
        fn control_value(&self, _handle: ControlHandle) -> f64 {
            0.5
        }
        fn control_value_bool(&self, _handle: ControlHandle) -> bool {
            false
        }
    }

    #[test]
    fn unresolved_input_contributes_zero_without_panicking() {
        let mut fcs = FlightControlSystem::new();
        let mut surface = SurfaceOutput::new("elevator", -20.0, 20.0);
        surface.input_streams.push(InputStream::new("missing_input"));
        fcs.surfaces.push(surface);

        fcs.initialize(&StubPilot);
        fcs.update(&StubPilot, &ControlObservables::default(), 0.1);

        assert_eq!(fcs.surfaces[0].current_angle_deg, 0.0);
    }

    #[test]
    fn resolved_input_drives_surface_through_gain_and_actuator() {
        let mut fcs = FlightControlSystem::new();
        let mut surface = SurfaceOutput::new("elevator", -20.0, 20.0);
        let mut stream = InputStream::new("pitch");
        stream.modifiers.push(Modifier::ScalarGain(20.0));
        surface.input_streams.push(stream);
        fcs.surfaces.push(surface);

        fcs.initialize(&StubPilot);
        fcs.no_lag_testing = true;
        fcs.update(&StubPilot, &ControlObservables::default(), 0.1);

        assert_eq!(fcs.surfaces[0].current_angle_deg, 10.0);
    }
}
