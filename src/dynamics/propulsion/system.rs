//! `PropulsionSystem` (spec §4.10): the full set of engines, fuel tanks,
//! and transfer paths for a vehicle, plus MIL/AB throttle multiplexing.
use std::collections::HashMap;

use nalgebra::Vector3;

use super::engine::Engine;
use super::fuel::{run_fuel_transfers, FuelTank, FuelTransfer};

/// Net force/moment contribution from every running engine this step.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropulsionOutput {
    pub force_body: Vector3<f64>,
    pub moment_about_reference: Vector3<f64>,
    pub total_fuel_burn_kg: f64,
}

/// Owns every engine, fuel tank, and transfer path on a vehicle.
///
/// Grounded on the teacher's `PowerplantConfig`/`PropulsionState` (engine
/// list, per-engine spool state) and `systems::propulsion::powerplant`
/// (per-step thrust/fuel computation), generalized to the multi-tank
/// transfer topology and MIL/AB throttle lever of spec §4.10.
#[derive(Debug, Clone, Default)]
pub struct PropulsionSystem {
    pub engines: Vec<Engine>,
    pub tanks: HashMap<String, FuelTank>,
    pub transfers: Vec<FuelTransfer>,
    /// When true, the throttle lever is split into a MIL range (0..1) and
    /// an afterburner range that only engages once MIL is saturated.
    pub has_afterburner: bool,
    mil_lever: f64,
    ab_lever: f64,
}

const AFTERBURNER_ENGAGE_EPSILON: f64 = 1e-6;

impl PropulsionSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the throttle lever position in `[0, 2]` when an afterburner is
    /// present (`0..1` MIL, `1..2` AB) or `[0, 1]` otherwise, and fans it
    /// out to every engine's `throttle` field. Engines that declare no
    /// afterburner range simply see the MIL fraction.
    pub fn set_throttle_lever(&mut self, lever: f64) {
        let lever = lever.clamp(0.0, if self.has_afterburner { 2.0 } else { 1.0 });
        if self.has_afterburner {
            self.mil_lever = lever.min(1.0);
            self.ab_lever = if self.mil_lever >= 1.0 - AFTERBURNER_ENGAGE_EPSILON {
                (lever - 1.0).max(0.0)
            } else {
                0.0
            };
        } else {
            self.mil_lever = lever;
            self.ab_lever = 0.0;
        }

        let effective = self.mil_lever + self.ab_lever;
        for engine in &mut self.engines {
            engine.throttle = effective.clamp(0.0, if self.has_afterburner { 2.0 } else { 1.0 });
        }
    }

    pub fn ignite_all(&mut self) {
        for engine in &mut self.engines {
            engine.ignite();
        }
    }

    pub fn shutdown_all(&mut self) {
        for engine in &mut self.engines {
            engine.shutdown();
        }
    }

    /// Advances fuel transfers, then every engine, draining its burn from
    /// its associated tank (if any) and accumulating the net force/moment
    /// about `reference_point`.
    pub fn update(&mut self, dt: f64, altitude_m: f64, true_airspeed_m_s: f64, reference_point: Vector3<f64>) -> PropulsionOutput {
        run_fuel_transfers(&mut self.tanks, &self.transfers, dt);

        let mut output = PropulsionOutput::default();
        for engine in &mut self.engines {
            let result = engine.update(dt, altitude_m, true_airspeed_m_s);

            let mut burn = result.fuel_burn_kg;
            if let Some(tank_name) = &engine.fuel_tank {
                if let Some(tank) = self.tanks.get_mut(tank_name) {
                    burn = tank.drain(burn);
                } else {
                    burn = 0.0;
                }
            }

            output.force_body += result.force_body;
            output.moment_about_reference += (result.position - reference_point).cross(&result.force_body);
            output.total_fuel_burn_kg += burn;
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::propulsion::engine::ThrustProducerKind;

    #[test]
    fn afterburner_only_engages_once_mil_saturates() {
        let mut system = PropulsionSystem::new();
        system.has_afterburner = true;
        system.engines.push(Engine::new("engine", ThrustProducerKind::Jet));

        system.set_throttle_lever(0.5);
        assert!((system.mil_lever - 0.5).abs() < 1e-9);
        assert_eq!(system.ab_lever, 0.0);

        system.set_throttle_lever(1.5);
        assert!((system.mil_lever - 1.0).abs() < 1e-9);
        assert!((system.ab_lever - 0.5).abs() < 1e-9);
    }

    #[test]
    fn update_drains_associated_tank() {
        let mut system = PropulsionSystem::new();
        let mut engine = Engine::new("engine", ThrustProducerKind::Jet);
        engine.max_thrust_n = 10_000.0;
        engine.tsfc_kg_per_n_s = 1e-4;
        engine.fuel_tank = Some("main".to_string());
        engine.ignite();
        system.engines.push(engine);

        let mut tank = FuelTank::new("main", 1000.0);
        tank.current_kg = 1000.0;
        system.tanks.insert("main".to_string(), tank);

        let output = system.update(1.0, 0.0, 0.0, Vector3::zeros());
        assert!(output.total_fuel_burn_kg > 0.0);
        assert!(system.tanks["main"].current_kg < 1000.0);
    }
}
