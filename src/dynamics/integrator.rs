//! Thin wrapper around `KinematicState::integrate` that applies the
//! velocity/angular-rate ceilings used throughout spec §4.14 step 7.
use nalgebra::{Matrix3, Vector3};

use crate::geo::CentralBody;

use super::kinematics::KinematicState;

/// Grounded on the teacher's `PhysicsIntegrator` (semi-implicit Euler with
/// the velocity/angular-velocity clamp applied between the rate update and
/// the position/attitude update); the Euler step itself lives on
/// `KinematicState::integrate` since every derived air-data quantity it
/// recomputes is intrinsic to the kinematic state, not the integrator, but
/// the ceilings are passed through so the clamp lands before position and
/// attitude (and every derived quantity) are advanced from it, not after.
#[derive(Debug, Clone, Copy)]
pub struct Integrator {
    pub max_velocity_m_s: f64,
    pub max_angular_velocity_rad_s: f64,
}

impl Default for Integrator {
    fn default() -> Self {
        Self { max_velocity_m_s: f64::INFINITY, max_angular_velocity_rad_s: f64::INFINITY }
    }
}

impl Integrator {
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &self,
        state: &mut KinematicState,
        external_force_body: Vector3<f64>,
        moment_body: Vector3<f64>,
        mass: f64,
        inertia_inv: Matrix3<f64>,
        gravity_ned: Vector3<f64>,
        wind_ned: Vector3<f64>,
        dt: f64,
        central_body: CentralBody,
    ) {
        state.integrate(
            external_force_body,
            moment_body,
            mass,
            inertia_inv,
            gravity_ned,
            wind_ned,
            dt,
            central_body,
            self.max_velocity_m_s,
            self.max_angular_velocity_rad_s,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use nalgebra::UnitQuaternion;

    #[test]
    fn clamps_velocity_to_configured_ceiling() {
        let integrator = Integrator { max_velocity_m_s: 50.0, max_angular_velocity_rad_s: f64::INFINITY };
        let mut state = KinematicState::new(GeoPoint::new(0.0, 0.0, 1000.0), Vector3::zeros(), UnitQuaternion::identity(), Vector3::zeros());
        integrator.step(
            &mut state,
            Vector3::new(100_000.0, 0.0, 0.0),
            Vector3::zeros(),
            1000.0,
            Matrix3::identity(),
            Vector3::zeros(),
            Vector3::zeros(),
            1.0,
            CentralBody::default(),
        );
        assert!(state.velocity_ned.norm() <= 50.0 + 1e-9);
        // Derived air data must reflect the clamped speed, not the raw
        // pre-clamp value the force would otherwise have produced.
        assert!(state.true_airspeed <= 50.0 + 1e-9);
    }
}
