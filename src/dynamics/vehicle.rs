//! `Vehicle`: the top-level composition binding mass, kinematics, aero,
//! propulsion, landing gear, flight controls, and sequencers into one
//! per-step update pipeline (spec §4.14).
use std::collections::HashSet;

use nalgebra::{Matrix3, Vector3};
use tracing::{error, warn};

use crate::collaborators::{Pilot, Terrain};
use crate::geo::{CentralBody, GeoPoint};
use crate::time::{DeltaTime, SimTimeNs};

use super::aero::{AeroContribution, AeroCore, AeroInputs, AeroMovable, ControlSurfaceDeflections};
use super::atmosphere::GRAVITY;
use super::flight_controls::{ControlObservables, FlightControlSystem};
use super::integrator::Integrator;
use super::kinematics::KinematicState;
use super::landing_gear::LandingGear;
use super::mass::{MassContribution, MassProperties};
use super::propulsion::PropulsionSystem;
use super::sequencer::{Sequencer, SequencerAction, SequencerObservables};

/// A fixed or control-surface-responsive aero component hung off the
/// vehicle, distinguished only by whether it reads control-surface
/// deflections (spec §4.9 `AeroCore`/`AeroMovable`).
#[derive(Debug, Clone)]
pub enum AeroComponent {
    Core(AeroCore),
    Movable(AeroMovable),
}

impl AeroComponent {
    fn contribution(&self, inputs: &AeroInputs) -> AeroContribution {
        match self {
            AeroComponent::Core(core) => core.contribution(inputs),
            AeroComponent::Movable(movable) => movable.contribution(inputs),
        }
    }

    fn reference_point(&self) -> Vector3<f64> {
        match self {
            AeroComponent::Core(core) => core.geometry.reference_point,
            AeroComponent::Movable(movable) => movable.core.geometry.reference_point,
        }
    }
}

/// Everything a single call to [`Vehicle::update`] produces besides the
/// mutated vehicle state itself.
#[derive(Debug, Default)]
pub struct VehicleUpdateReport {
    pub ground_crash: bool,
    pub weight_on_wheels: bool,
    /// `SetPilotMode` actions a fired sequencer asked for; `Pilot` is a
    /// read-only collaborator, so mode changes are surfaced here for an
    /// external caller to apply rather than mutated directly (spec §3
    /// `SequencerAction`).
    pub pilot_mode_requests: Vec<String>,
    /// Subobjects jettisoned this step, carrying ownership to the caller
    /// (spec §4.14 "emit a `SubobjectJettisoned` callback carrying
    /// ownership of the freed subobject to the caller").
    pub jettisoned: Vec<Vehicle>,
}

/// The top-level composition spec §4.14 describes: a named rigid body with
/// mass, kinematics, aerodynamics, propulsion, landing gear, flight
/// controls, sequencers, and any number of subobjects.
///
/// Grounded on `vehicles::aircraft::Aircraft` for the composition shape
/// (owns its dynamics components, steps them once per call) and
/// `systems::physics::integrator::PhysicsIntegrator` for the step
/// ordering; generalized from one aerso-backed airframe into the
/// component-composed model spec §4.8-§4.14 builds up piece by piece.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub name: String,
    pub mass: MassProperties,
    pub kinematics: KinematicState,
    pub aero_components: Vec<AeroComponent>,
    /// Names of flight-control surfaces whose angle feeds each aero
    /// control-deflection slot. `None` leaves that slot at zero.
    pub elevator_surface: Option<String>,
    pub aileron_surface: Option<String>,
    pub rudder_surface: Option<String>,
    pub flaps_surface: Option<String>,
    pub propulsion: PropulsionSystem,
    pub landing_gear: LandingGear,
    pub flight_controls: FlightControlSystem,
    pub sequencers: Vec<Sequencer>,
    pub subobjects: Vec<Vehicle>,
    /// Whether this vehicle currently rides attached to a parent (always
    /// `true` at the top level; a jettisoned subobject flips to `false`).
    pub captive: bool,
    /// Position of this vehicle's CG relative to its parent's CG, body
    /// frame, used only while `captive` to rigidly follow the parent.
    pub offset_body: Vector3<f64>,
    /// Velocity/angular-rate kick applied at the instant of jettison, body
    /// frame (spec §4.14 "apply any configured separation velocity and
    /// angular rate").
    pub separation_velocity_body: Vector3<f64>,
    pub separation_angular_rate_body: Vector3<f64>,
    pub integrator: Integrator,
    pub central_body: CentralBody,
    pub now_ns: SimTimeNs,
}

impl Vehicle {
    pub fn new(name: impl Into<String>, mass: MassProperties, kinematics: KinematicState) -> Self {
        Self {
            name: name.into(),
            mass,
            kinematics,
            aero_components: Vec::new(),
            elevator_surface: None,
            aileron_surface: None,
            rudder_surface: None,
            flaps_surface: None,
            propulsion: PropulsionSystem::new(),
            landing_gear: LandingGear::new(),
            flight_controls: FlightControlSystem::new(),
            sequencers: Vec::new(),
            subobjects: Vec::new(),
            captive: true,
            offset_body: Vector3::zeros(),
            separation_velocity_body: Vector3::zeros(),
            separation_angular_rate_body: Vector3::zeros(),
            integrator: Integrator::default(),
            central_body: CentralBody::default(),
            now_ns: 0,
        }
    }

    /// Binds every flight-control input stream to `pilot`'s handle table,
    /// recursively for every subobject.
    pub fn initialize(&mut self, pilot: &dyn Pilot) {
        self.flight_controls.initialize(pilot);
        for subobject in &mut self.subobjects {
            subobject.initialize(pilot);
        }
    }

    /// Advances the vehicle by `dt` (spec §4.14's ten-step pipeline).
    pub fn update(&mut self, pilot: &dyn Pilot, terrain: &dyn Terrain, dt: DeltaTime) -> VehicleUpdateReport {
        self.now_ns += dt.as_nanos();
        let mut report = VehicleUpdateReport::default();
        if dt.is_zero() {
            return report;
        }
        let dt_s = dt.as_secs_f64();

        self.refresh_mass();

        // 1. Flight controls.
        let observables = ControlObservables {
            mach: self.kinematics.mach,
            ktas: self.kinematics.true_airspeed,
            alpha_deg: self.kinematics.alpha.to_degrees(),
            beta_deg: self.kinematics.beta.to_degrees(),
            nx: self.kinematics.load_factor.x,
            ny: self.kinematics.load_factor.y,
            nz: self.kinematics.load_factor.z,
            altitude_m: self.kinematics.position.altitude_m,
            dynamic_pressure_pa: self.kinematics.dynamic_pressure,
        };
        self.flight_controls.update(pilot, &observables, dt_s);

        // 2. Propulsion.
        let propulsion_output =
            self.propulsion.update(dt_s, self.kinematics.position.altitude_m, self.kinematics.true_airspeed, self.mass.current_cg);

        // 3. Aero, driven by the surfaces flight control just resolved.
        let controls = ControlSurfaceDeflections {
            elevator: self.resolved_surface_angle_rad(&self.elevator_surface),
            aileron: self.resolved_surface_angle_rad(&self.aileron_surface),
            rudder: self.resolved_surface_angle_rad(&self.rudder_surface),
            flaps: self.resolved_surface_angle_rad(&self.flaps_surface),
        };
        let aero_inputs = AeroInputs {
            alpha: self.kinematics.alpha,
            beta: self.kinematics.beta,
            mach: self.kinematics.mach,
            body_rates: self.kinematics.body_rates,
            dynamic_pressure: self.kinematics.dynamic_pressure,
            controls,
        };
        let mut aero_force_body = Vector3::zeros();
        let mut aero_moment_body = Vector3::zeros();
        for component in &self.aero_components {
            let contribution = component.contribution(&aero_inputs);
            aero_force_body += contribution.force_body;
            aero_moment_body +=
                contribution.moment_about_reference + (component.reference_point() - self.mass.current_cg).cross(&contribution.force_body);
        }

        // 4. Gravity in NED.
        let gravity_ned = Vector3::new(0.0, 0.0, GRAVITY);
        let gravity_force_ned = gravity_ned * self.mass.current_mass;

        // 5. Landing gear, driven by the sum of everything above.
        let non_gear_force_body = propulsion_output.force_body + aero_force_body;
        let non_gear_force_ned = self.kinematics.attitude * non_gear_force_body + gravity_force_ned;
        let gear_output = self.landing_gear.update(
            self.kinematics.position,
            self.kinematics.attitude,
            self.kinematics.velocity_ned,
            non_gear_force_ned,
            terrain,
            self.central_body,
            dt_s,
        );
        report.ground_crash = gear_output.ground_crash;
        report.weight_on_wheels = gear_output.weight_on_wheels;

        // 6. Accumulate body-frame total F/M about the CG (gravity is applied
        // separately by the integrator, not folded into the force here).
        let total_force_body = propulsion_output.force_body + aero_force_body + gear_output.force_body;
        let total_moment_body = propulsion_output.moment_about_reference + aero_moment_body + gear_output.moment_body;

        let inertia_inv = match self.mass.current_inertia_inverse() {
            Some(inv) => inv,
            None => {
                error!(vehicle = %self.name, "singular inertia tensor, skipping this step's dynamics");
                Matrix3::identity()
            }
        };

        // 7. Integrate (recomputes derived kinematics as step 8 internally).
        self.integrator.step(
            &mut self.kinematics,
            total_force_body,
            total_moment_body,
            self.mass.current_mass,
            inertia_inv,
            gravity_ned,
            Vector3::zeros(),
            dt_s,
            self.central_body,
        );

        // 9. Sequencers, then subobjects.
        self.run_sequencers(&mut report);
        self.step_subobjects(pilot, terrain, dt, dt_s, &mut report);

        report
    }

    fn resolved_surface_angle_rad(&self, surface_name: &Option<String>) -> f64 {
        surface_name
            .as_ref()
            .and_then(|name| self.flight_controls.surface_handle(name))
            .map(|handle| self.flight_controls.surface_angle_deg(handle).to_radians())
            .unwrap_or(0.0)
    }

    /// Folds fuel tanks and captive subobjects into `current_mass/cg/inertia`
    /// ahead of this step's dynamics (spec §4.8 `accumulate-from-child`).
    fn refresh_mass(&mut self) {
        let mut contributions: Vec<MassContribution> = self
            .propulsion
            .tanks
            .values()
            .map(|tank| MassContribution { mass: tank.current_kg, cg: tank.cg_offset, inertia_about_cg: Matrix3::zeros() })
            .collect();
        contributions.extend(self.subobjects.iter().filter(|s| s.captive).map(|s| MassContribution {
            mass: s.mass.current_mass,
            cg: s.offset_body,
            inertia_about_cg: s.mass.current_inertia,
        }));
        self.mass.set_current_to_base();
        self.mass.accumulate_from_child(&contributions);
    }

    fn run_sequencers(&mut self, report: &mut VehicleUpdateReport) {
        let fired_names: HashSet<String> = self.sequencers.iter().filter(|s| s.fired).map(|s| s.name.clone()).collect();
        let observables = SequencerObservables {
            now_ns: self.now_ns,
            altitude_m: self.kinematics.position.altitude_m,
            speed_m_s: self.kinematics.velocity_ned.norm(),
            nx: self.kinematics.load_factor.x,
            ny: self.kinematics.load_factor.y,
            nz: self.kinematics.load_factor.z,
            dynamic_pressure_pa: self.kinematics.dynamic_pressure,
            static_pressure_pa: self.kinematics.static_pressure,
            captive: self.captive,
        };

        let mut triggered_actions = Vec::new();
        for sequencer in &mut self.sequencers {
            if let Some(actions) = sequencer.update(&observables, &fired_names) {
                triggered_actions.extend(actions);
            }
        }
        for action in triggered_actions {
            self.execute_sequencer_action(action, report);
        }
    }

    fn execute_sequencer_action(&mut self, action: SequencerAction, report: &mut VehicleUpdateReport) {
        match action {
            SequencerAction::IgniteEngines(names) => {
                for engine in self.propulsion.engines.iter_mut().filter(|e| names.contains(&e.name)) {
                    engine.ignite();
                }
            }
            SequencerAction::ShutdownEngines(names) => {
                for engine in self.propulsion.engines.iter_mut().filter(|e| names.contains(&e.name)) {
                    engine.shutdown();
                }
            }
            SequencerAction::JettisonSubobject(name) => match self.jettison_subobject(&name) {
                Some(subobject) => report.jettisoned.push(subobject),
                None => warn!(subobject = %name, vehicle = %self.name, "sequencer tried to jettison a subobject that does not exist"),
            },
            SequencerAction::ActivateSequencer(name) => {
                if let Some(target) = self.sequencers.iter_mut().find(|s| s.name == name) {
                    if !target.fired {
                        target.armed = true;
                    }
                }
            }
            SequencerAction::SetPilotMode(mode) => report.pilot_mode_requests.push(mode),
        }
    }

    /// Removes `name` from `subobjects`, preserves its current WCS
    /// position/velocity, applies its configured separation velocity and
    /// angular rate, and returns it to the caller (spec §4.14 jettison).
    pub fn jettison_subobject(&mut self, name: &str) -> Option<Vehicle> {
        let index = self.subobjects.iter().position(|s| s.name == name)?;
        let mut subobject = self.subobjects.remove(index);
        subobject.captive = false;
        subobject.kinematics.velocity_ned += subobject.kinematics.attitude * subobject.separation_velocity_body;
        subobject.kinematics.body_rates += subobject.separation_angular_rate_body;
        Some(subobject)
    }

    fn step_subobjects(&mut self, pilot: &dyn Pilot, terrain: &dyn Terrain, dt: DeltaTime, dt_s: f64, report: &mut VehicleUpdateReport) {
        for subobject in &mut self.subobjects {
            if subobject.captive {
                let offset_ned = self.kinematics.attitude * subobject.offset_body;
                subobject.kinematics.position = GeoPoint::from_ned(offset_ned, self.kinematics.position, self.central_body);
                let lever_arm_velocity = self.kinematics.attitude * self.kinematics.body_rates.cross(&subobject.offset_body);
                subobject.kinematics.velocity_ned = self.kinematics.velocity_ned + lever_arm_velocity;
                subobject.kinematics.attitude = self.kinematics.attitude;
                subobject.kinematics.body_rates = self.kinematics.body_rates;
                subobject.kinematics.recompute_derived(Vector3::zeros(), dt_s);
                subobject.now_ns = self.now_ns;
            } else {
                let sub_report = subobject.update(pilot, terrain, dt);
                report.ground_crash = report.ground_crash || sub_report.ground_crash;
                report.pilot_mode_requests.extend(sub_report.pilot_mode_requests);
                report.jettisoned.extend(sub_report.jettisoned);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{ControlHandle, FlatTerrain};
    use nalgebra::UnitQuaternion;

    struct NoPilot;
    impl Pilot for NoPilot {
        fn get_control_handle(&self, _name: &str) -> Option<ControlHandle> {
            None
        }
        fn control_value(&self, _handle: ControlHandle) -> f64 {
            0.0
        }
        fn control_value_bool(&self, _handle: ControlHandle) -> bool {
            false
        }
    }

    fn level_vehicle() -> Vehicle {
        let mass = MassProperties::new(1000.0, Vector3::zeros(), 800.0, 1200.0, 1500.0, 0.0);
        let kinematics = KinematicState::new(
            GeoPoint::new(0.0, 0.0, 5000.0),
            Vector3::new(100.0, 0.0, 0.0),
            UnitQuaternion::identity(),
            Vector3::zeros(),
        );
        Vehicle::new("test", mass, kinematics)
    }

    #[test]
    fn zero_dt_leaves_state_and_clock_unchanged() {
        let mut vehicle = level_vehicle();
        let before = vehicle.kinematics.position;
        vehicle.update(&NoPilot, &FlatTerrain, DeltaTime::from_nanos(0));
        assert_eq!(vehicle.kinematics.position, before);
        assert_eq!(vehicle.now_ns, 0);
    }

    #[test]
    fn falling_body_descends_under_gravity() {
        let mut vehicle = level_vehicle();
        let initial_altitude = vehicle.kinematics.position.altitude_m;
        for _ in 0..50 {
            vehicle.update(&NoPilot, &FlatTerrain, DeltaTime::from_seconds(0.1));
        }
        assert!(vehicle.kinematics.position.altitude_m < initial_altitude, "unpowered flight falls under gravity");
        assert!(vehicle.now_ns > 0);
    }

    #[test]
    fn jettisoning_unknown_subobject_returns_none() {
        let mut vehicle = level_vehicle();
        assert!(vehicle.jettison_subobject("missing").is_none());
    }

    #[test]
    fn jettison_preserves_kinematics_and_applies_separation_kick() {
        let mut vehicle = level_vehicle();
        let mut child = level_vehicle();
        child.name = "pod".to_string();
        child.separation_velocity_body = Vector3::new(0.0, 0.0, 5.0);
        vehicle.subobjects.push(child);

        let freed = vehicle.jettison_subobject("pod").expect("subobject present");
        assert!(!freed.captive);
        assert!(freed.kinematics.velocity_ned.z > 0.0, "separation kick pushes the pod downward in NED");
        assert!(vehicle.subobjects.is_empty());
    }

    #[test]
    fn captive_subobject_follows_parent_each_step() {
        let mut vehicle = level_vehicle();
        let mut child = level_vehicle();
        child.name = "pod".to_string();
        child.offset_body = Vector3::new(-1.0, 0.0, 0.0);
        vehicle.subobjects.push(child);

        vehicle.update(&NoPilot, &FlatTerrain, DeltaTime::from_seconds(0.1));

        let parent_position = vehicle.kinematics.position;
        let child_position = vehicle.subobjects[0].kinematics.position;
        assert!((parent_position.latitude_deg - child_position.latitude_deg).abs() < 1.0, "pod stays near the parent");
    }
}
