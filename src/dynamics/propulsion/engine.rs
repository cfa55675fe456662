//! Polymorphic thrust producers (spec §4.10).
use nalgebra::{UnitQuaternion, Vector3};

use crate::dynamics::atmosphere::{self, ISA_SEA_LEVEL_DENSITY};

/// The four thrust-producer kinds spec §4.10 asks `PropulsionSystem` to be
/// polymorphic over. Grounded on the teacher's `PowerplantConfig`
/// (position/orientation/`tsfc`/spool time constants, kept for `Jet`),
/// generalized to the other three kinds per a tagged-variant split (spec
/// §9 redesign flag) rather than a trait-object hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrustProducerKind {
    Jet,
    Ramjet,
    LiquidRocket,
    SolidRocket,
}

/// Optional yaw/pitch thrust vectoring within a declared limit (spec
/// §4.10).
#[derive(Debug, Clone, Copy, Default)]
pub struct ThrustVectoring {
    pub yaw_limit_rad: f64,
    pub pitch_limit_rad: f64,
    pub commanded_yaw_rad: f64,
    pub commanded_pitch_rad: f64,
}

impl ThrustVectoring {
    fn clamped_direction(&self) -> UnitQuaternion<f64> {
        let yaw = self.commanded_yaw_rad.clamp(-self.yaw_limit_rad, self.yaw_limit_rad);
        let pitch = self.commanded_pitch_rad.clamp(-self.pitch_limit_rad, self.pitch_limit_rad);
        UnitQuaternion::from_euler_angles(0.0, pitch, yaw)
    }
}

/// Result of one engine's per-step update: the force it contributes (in
/// body frame, applied at `position`) and the mass it burns this step.
#[derive(Debug, Clone, Copy)]
pub struct EngineOutput {
    pub force_body: Vector3<f64>,
    pub position: Vector3<f64>,
    pub fuel_burn_kg: f64,
}

/// A single thrust producer: configuration plus the mutable spool/throttle
/// state the teacher's `PowerplantState`/`update_powerplant_state` keeps.
#[derive(Debug, Clone)]
pub struct Engine {
    pub name: String,
    pub kind: ThrustProducerKind,
    pub position: Vector3<f64>,
    pub orientation: Vector3<f64>,
    pub max_thrust_n: f64,
    pub min_thrust_n: f64,
    pub tsfc_kg_per_n_s: f64,
    pub spool_up_time_s: f64,
    pub spool_down_time_s: f64,
    pub reverser_limit_fraction: f64,
    pub vectoring: Option<ThrustVectoring>,
    pub fuel_tank: Option<String>,

    pub throttle: f64,
    pub reverser_commanded: bool,
    thrust_fraction: f64,
    pub running: bool,
}

impl Engine {
    pub fn new(name: impl Into<String>, kind: ThrustProducerKind) -> Self {
        Self {
            name: name.into(),
            kind,
            position: Vector3::zeros(),
            orientation: Vector3::new(1.0, 0.0, 0.0),
            max_thrust_n: 20_000.0,
            min_thrust_n: 0.0,
            tsfc_kg_per_n_s: 0.4 / 3600.0,
            spool_up_time_s: 3.0,
            spool_down_time_s: 2.0,
            reverser_limit_fraction: 0.0,
            vectoring: None,
            fuel_tank: None,
            throttle: 0.0,
            reverser_commanded: false,
            thrust_fraction: 0.0,
            running: false,
        }
    }

    /// Sets throttle to full and marks the engine running (spec §4.10
    /// "ignition sets throttle to 1.0").
    pub fn ignite(&mut self) {
        self.throttle = 1.0;
        self.running = true;
    }

    /// Sets throttle to zero and marks the engine stopped (spec §4.10
    /// "shutdown sets it to 0.0").
    pub fn shutdown(&mut self) {
        self.throttle = 0.0;
        self.running = false;
    }

    /// Advances spool state toward the commanded throttle via the
    /// teacher's first-order exponential-decay response
    /// (`update_powerplant_state`), then computes thrust and fuel burn for
    /// this step.
    pub fn update(&mut self, dt: f64, altitude_m: f64, true_airspeed_m_s: f64) -> EngineOutput {
        if !self.running && self.throttle > 0.01 {
            self.running = true;
        } else if self.running && self.throttle <= 0.0 {
            self.running = false;
        }

        let target = if self.running { self.throttle } else { 0.0 };
        let time_constant = if target > self.thrust_fraction {
            self.spool_up_time_s
        } else {
            self.spool_down_time_s
        };
        if time_constant > 1e-6 && dt > 0.0 {
            let decay = (-dt / time_constant).exp();
            self.thrust_fraction = target + (self.thrust_fraction - target) * decay;
        } else {
            self.thrust_fraction = target;
        }
        self.thrust_fraction = self.thrust_fraction.clamp(0.0, 1.0);

        let density = atmosphere::sample(altitude_m).density_kg_m3;
        let density_ratio = (density / ISA_SEA_LEVEL_DENSITY).max(0.01);

        let (thrust_scalar, fuel_burn_kg) = self.thrust_and_burn(density_ratio, true_airspeed_m_s, dt);

        let mut direction = UnitQuaternion::from_euler_angles(self.orientation.x, self.orientation.y, self.orientation.z);
        if let Some(vectoring) = &self.vectoring {
            direction = direction * vectoring.clamped_direction();
        }
        let reverser_scale = if self.reverser_commanded {
            1.0 - 2.0 * self.reverser_limit_fraction
        } else {
            1.0
        };

        let force_body = (direction * Vector3::x()) * thrust_scalar * reverser_scale;

        EngineOutput { force_body, position: self.position, fuel_burn_kg }
    }

    fn thrust_and_burn(&self, density_ratio: f64, true_airspeed_m_s: f64, dt: f64) -> (f64, f64) {
        match self.kind {
            ThrustProducerKind::Jet => {
                let ram_factor = (1.0 - 0.1 * (true_airspeed_m_s / 340.3).max(0.0)).max(0.0);
                let rho_factor = density_ratio.sqrt();
                let available = (self.max_thrust_n * rho_factor * ram_factor).max(self.min_thrust_n * rho_factor);
                let thrust = self.min_thrust_n * rho_factor + (available - self.min_thrust_n * rho_factor) * self.thrust_fraction;
                let burn_rate = thrust * self.tsfc_kg_per_n_s;
                (thrust.max(0.0), burn_rate.max(0.0) * dt)
            }
            ThrustProducerKind::Ramjet => {
                // Ramjets produce negligible static thrust; scale with dynamic pressure proxy.
                let speed_factor = (true_airspeed_m_s / 300.0).clamp(0.0, 1.5);
                let thrust = self.max_thrust_n * speed_factor * self.thrust_fraction;
                let burn_rate = thrust * self.tsfc_kg_per_n_s;
                (thrust.max(0.0), burn_rate.max(0.0) * dt)
            }
            ThrustProducerKind::LiquidRocket => {
                // Thrust is essentially density-independent; a small back-pressure
                // loss is modeled as a linear density-ratio correction.
                let thrust = self.max_thrust_n * self.thrust_fraction * (0.95 + 0.05 * density_ratio.min(1.0));
                let burn_rate = thrust * self.tsfc_kg_per_n_s;
                (thrust.max(0.0), burn_rate.max(0.0) * dt)
            }
            ThrustProducerKind::SolidRocket => {
                // Solid motors burn at whatever their grain dictates; here
                // modeled as commanded-fraction of rated thrust, propellant
                // decremented directly by the caller via `fuel_burn_kg`
                // (there is no separate fuel tank for a solid charge).
                let thrust = self.max_thrust_n * self.thrust_fraction;
                let burn_rate = thrust * self.tsfc_kg_per_n_s;
                (thrust.max(0.0), burn_rate.max(0.0) * dt)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ignite_then_update_spools_up_gradually() {
        let mut engine = Engine::new("engine1", ThrustProducerKind::Jet);
        engine.max_thrust_n = 10_000.0;
        engine.ignite();
        let out = engine.update(1.0, 0.0, 0.0);
        assert!(out.force_body.x > 0.0);
        assert!(out.force_body.x < 10_000.0, "should not reach full thrust in one spool-up second");
    }

    #[test]
    fn shutdown_spools_thrust_toward_zero() {
        let mut engine = Engine::new("engine1", ThrustProducerKind::Jet);
        engine.max_thrust_n = 10_000.0;
        engine.ignite();
        for _ in 0..50 {
            engine.update(0.1, 0.0, 0.0);
        }
        engine.shutdown();
        let before = engine.update(0.01, 0.0, 0.0).force_body.x;
        let after = engine.update(1.0, 0.0, 0.0).force_body.x;
        assert!(after < before);
    }

    #[test]
    fn solid_rocket_burns_fuel_proportional_to_thrust() {
        let mut engine = Engine::new("booster", ThrustProducerKind::SolidRocket);
        engine.max_thrust_n = 5000.0;
        engine.tsfc_kg_per_n_s = 1e-4;
        engine.ignite();
        let out = engine.update(1.0, 0.0, 0.0);
        assert_relative_eq!(out.fuel_burn_kg, out.force_body.x * 1e-4, epsilon = 1e-6);
    }
}
