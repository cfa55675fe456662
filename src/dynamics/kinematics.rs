//! Vehicle kinematic state: position/velocity/attitude plus every derived
//! air-data and load-factor quantity (spec §3 `KinematicState`).
use nalgebra::{Matrix3, UnitQuaternion, Vector3};

use crate::geo::{CentralBody, GeoPoint};

use super::atmosphere::{self, GRAVITY};

/// Position, velocity, attitude, and every quantity derived from them.
///
/// Grounded on the teacher's `state::spatial::SpatialComponent`/
/// `physics::components::motion::MotionSystem` (position/velocity/
/// `UnitQuaternion` attitude plus body rates, semi-implicit Euler
/// integration, quaternion update via `from_scaled_axis`), extended with
/// the air-data derived quantities spec §3 asks `KinematicState` to own.
#[derive(Debug, Clone, Copy)]
pub struct KinematicState {
    pub position: GeoPoint,
    pub velocity_ned: Vector3<f64>,
    pub attitude: UnitQuaternion<f64>,
    pub body_rates: Vector3<f64>,

    pub alpha: f64,
    pub beta: f64,
    pub alpha_dot: f64,
    pub beta_dot: f64,
    pub mach: f64,
    pub true_airspeed: f64,
    pub calibrated_airspeed: f64,
    pub indicated_airspeed: f64,
    pub dynamic_pressure: f64,
    pub static_pressure: f64,
    pub load_factor: Vector3<f64>,

    prev_alpha: f64,
    prev_beta: f64,
}

impl KinematicState {
    pub fn new(position: GeoPoint, velocity_ned: Vector3<f64>, attitude: UnitQuaternion<f64>, body_rates: Vector3<f64>) -> Self {
        let mut state = Self {
            position,
            velocity_ned,
            attitude,
            body_rates,
            alpha: 0.0,
            beta: 0.0,
            alpha_dot: 0.0,
            beta_dot: 0.0,
            mach: 0.0,
            true_airspeed: 0.0,
            calibrated_airspeed: 0.0,
            indicated_airspeed: 0.0,
            dynamic_pressure: 0.0,
            static_pressure: 0.0,
            load_factor: Vector3::zeros(),
            prev_alpha: 0.0,
            prev_beta: 0.0,
        };
        state.recompute_derived(Vector3::zeros(), 0.0);
        state
    }

    /// Direction cosine matrix body->NED. Always the rotation matrix form
    /// of `attitude`, so the two never diverge (spec §3 invariant).
    pub fn dcm(&self) -> Matrix3<f64> {
        self.attitude.to_rotation_matrix().into_inner()
    }

    pub fn velocity_body(&self) -> Vector3<f64> {
        self.attitude.inverse() * self.velocity_ned
    }

    pub fn velocity_wcs(&self, body: CentralBody) -> Vector3<f64> {
        ned_to_wcs_rotation(self.position, body) * self.velocity_ned
    }

    /// Semi-implicit Euler step: body rates and NED velocity are advanced
    /// from the accelerations first, then clamped to `max_velocity_m_s`/
    /// `max_angular_velocity_rad_s`, then position and attitude are advanced
    /// from the already-updated (and already-clamped) rates, matching the
    /// teacher's `PhysicsIntegrator::integrate_state` ordering of
    /// velocity-update, clamp, position-update.
    ///
    /// `external_force_body` excludes gravity (it is the accelerometer-style
    /// quantity load factors are computed from); `gravity_ned` and
    /// `moment_body`/`inertia_inv`/`mass` supply the rest of the dynamics.
    /// Pass `f64::INFINITY` for either ceiling to leave it unclamped.
    #[allow(clippy::too_many_arguments)]
    pub fn integrate(
        &mut self,
        external_force_body: Vector3<f64>,
        moment_body: Vector3<f64>,
        mass: f64,
        inertia_inv: Matrix3<f64>,
        gravity_ned: Vector3<f64>,
        wind_ned: Vector3<f64>,
        dt: f64,
        central_body: CentralBody,
        max_velocity_m_s: f64,
        max_angular_velocity_rad_s: f64,
    ) {
        if dt <= 0.0 {
            return;
        }
        let accel_body_external = external_force_body / mass;
        self.load_factor = accel_body_external / GRAVITY;

        let gravity_body = self.attitude.inverse() * gravity_ned;
        let accel_body_total = accel_body_external + gravity_body;
        let accel_ned = self.attitude * accel_body_total;

        let angular_accel = inertia_inv * moment_body;

        self.body_rates += angular_accel * dt;
        self.velocity_ned += accel_ned * dt;

        let speed = self.velocity_ned.norm();
        if speed > max_velocity_m_s {
            self.velocity_ned *= max_velocity_m_s / speed;
        }
        let rate = self.body_rates.norm();
        if rate > max_angular_velocity_rad_s {
            self.body_rates *= max_angular_velocity_rad_s / rate;
        }

        self.attitude = UnitQuaternion::from_scaled_axis(self.body_rates * dt) * self.attitude;

        self.position = GeoPoint::from_ned(self.velocity_ned * dt, self.position, central_body);

        self.recompute_derived(wind_ned, dt);
    }

    /// Recomputes every derived quantity from the current primitives (spec
    /// §3 invariant: derived quantities never persist across an integration
    /// step without being recomputed). `wind_ned` is the ambient wind;
    /// `dt` is used only for the `alpha_dot`/`beta_dot` finite difference
    /// and may be `0.0` at construction.
    pub fn recompute_derived(&mut self, wind_ned: Vector3<f64>, dt: f64) {
        let wind_body = self.attitude.inverse() * wind_ned;
        let relative_velocity = self.velocity_body() - wind_body;
        let airspeed = relative_velocity.norm();

        self.prev_alpha = self.alpha;
        self.prev_beta = self.beta;

        if airspeed > 1e-6 {
            self.alpha = relative_velocity.z.atan2(relative_velocity.x);
            self.beta = (relative_velocity.y / airspeed).clamp(-1.0, 1.0).asin();
        } else {
            self.alpha = 0.0;
            self.beta = 0.0;
        }
        if dt > 0.0 {
            self.alpha_dot = (self.alpha - self.prev_alpha) / dt;
            self.beta_dot = (self.beta - self.prev_beta) / dt;
        }

        self.true_airspeed = airspeed;
        let sample = atmosphere::sample(self.position.altitude_m);
        self.mach = airspeed / sample.speed_of_sound_m_s;
        self.dynamic_pressure = 0.5 * sample.density_kg_m3 * airspeed * airspeed;
        self.static_pressure = sample.pressure_pa;
        self.calibrated_airspeed = atmosphere::calibrated_airspeed(airspeed, &sample);
        self.indicated_airspeed = self.calibrated_airspeed;
    }
}

fn ned_to_wcs_rotation(reference: GeoPoint, body: CentralBody) -> Matrix3<f64> {
    let lat = reference.latitude_deg.to_radians();
    let lon = reference.longitude_deg.to_radians();
    let (sl, cl) = (lat.sin(), lat.cos());
    let (so, co) = (lon.sin(), lon.cos());
    let _ = body;
    Matrix3::new(
        -sl * co, -so, -cl * co,
        -sl * so, co, -cl * so,
        cl, 0.0, -sl,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn level_flight_has_zero_alpha_beta() {
        let state = KinematicState::new(
            GeoPoint::new(0.0, 0.0, 1000.0),
            Vector3::new(100.0, 0.0, 0.0),
            UnitQuaternion::identity(),
            Vector3::zeros(),
        );
        assert_relative_eq!(state.alpha, 0.0, epsilon = 1e-9);
        assert_relative_eq!(state.beta, 0.0, epsilon = 1e-9);
        assert!(state.mach > 0.0 && state.mach < 1.0);
    }

    #[test]
    fn climbing_velocity_gives_positive_alpha() {
        let state = KinematicState::new(
            GeoPoint::new(0.0, 0.0, 1000.0),
            Vector3::new(100.0, 0.0, -10.0),
            UnitQuaternion::identity(),
            Vector3::zeros(),
        );
        assert!(state.alpha < 0.0, "climbing relative wind gives negative body-z component");
    }

    #[test]
    fn integrate_advances_velocity_under_force() {
        let mut state = KinematicState::new(
            GeoPoint::new(0.0, 0.0, 1000.0),
            Vector3::zeros(),
            UnitQuaternion::identity(),
            Vector3::zeros(),
        );
        let inertia_inv = Matrix3::identity();
        state.integrate(
            Vector3::new(1000.0, 0.0, 0.0),
            Vector3::zeros(),
            1000.0,
            inertia_inv,
            Vector3::new(0.0, 0.0, GRAVITY),
            Vector3::zeros(),
            1.0,
            CentralBody::default(),
            f64::INFINITY,
            f64::INFINITY,
        );
        assert_relative_eq!(state.velocity_ned.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(state.velocity_ned.z, GRAVITY, epsilon = 1e-6);
    }
}
