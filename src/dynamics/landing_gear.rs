//! Ground-reaction landing gear model (spec §4.11).
use nalgebra::{UnitQuaternion, Vector3};

use crate::collaborators::Terrain;
use crate::geo::{CentralBody, GeoPoint};

/// Threshold below which the vehicle (and its previous step) are
/// considered at rest on the surface (spec §3 `LandingGear` invariant).
const AT_REST_SPEED_THRESHOLD_M_S: f64 = 0.1;

/// One ground-contact point: a wheel/skid (`is_landing_gear = true`) or a
/// crash-detection point such as a fuselage belly or wingtip.
///
/// Grounded on the teacher's `components/collision.rs`
/// (`CollisionComponent`: height offset, radius, collision bookkeeping)
/// and `P6DofGroundReactionPoint`/`P6DofLandingGear::Update` for the
/// spring/damper plus friction-phase behavior.
#[derive(Debug, Clone)]
pub struct GroundReactionPoint {
    pub name: String,
    /// Gear attachment point relative to the vehicle CG, body frame.
    pub position_body: Vector3<f64>,
    pub spring_k_n_per_m: f64,
    pub damping_c_n_per_m_per_s: f64,
    pub max_compression_m: f64,
    pub rolling_friction_static: f64,
    pub rolling_friction_kinetic: f64,
    pub braking_friction_static: f64,
    pub braking_friction_kinetic: f64,
    pub scuffing_friction_static: f64,
    pub is_nose_gear: bool,
    pub is_landing_gear: bool,

    pub steering_angle_deg: f64,
    pub braking_value: f64,

    compression_m: f64,
    prev_compression_m: f64,
    pub over_compressed: bool,
}

impl GroundReactionPoint {
    pub fn new(name: impl Into<String>, position_body: Vector3<f64>) -> Self {
        Self {
            name: name.into(),
            position_body,
            spring_k_n_per_m: 200_000.0,
            damping_c_n_per_m_per_s: 8_000.0,
            max_compression_m: 0.3,
            rolling_friction_static: 0.03,
            rolling_friction_kinetic: 0.02,
            braking_friction_static: 0.6,
            braking_friction_kinetic: 0.45,
            scuffing_friction_static: 0.8,
            is_nose_gear: false,
            is_landing_gear: true,
            steering_angle_deg: 0.0,
            braking_value: 0.0,
            compression_m: 0.0,
            prev_compression_m: 0.0,
            over_compressed: false,
        }
    }

    fn effective_rolling_mu(&self, kinetic: bool) -> f64 {
        let braked = self.braking_value > 1e-3;
        match (braked, kinetic) {
            (true, true) => self.braking_friction_kinetic,
            (true, false) => self.braking_friction_static,
            (false, true) => self.rolling_friction_kinetic,
            (false, false) => self.rolling_friction_static,
        }
    }

    /// Step 1 of spec §4.11: spring/damper normal force along the local
    /// terrain normal, plus the moment it induces about the CG.
    fn normal_force_moment(
        &mut self,
        vehicle_position: GeoPoint,
        attitude: UnitQuaternion<f64>,
        terrain: &dyn Terrain,
        central_body: CentralBody,
        dt: f64,
    ) -> (Vector3<f64>, Vector3<f64>, bool) {
        let offset_ned = attitude * self.position_body;
        let gear_geo = GeoPoint::from_ned(offset_ned, vehicle_position, central_body);

        let terrain_elevation_m = terrain.elevation(gear_geo.latitude_deg, gear_geo.longitude_deg);
        let normal_ned = terrain.normal_ned(gear_geo.latitude_deg, gear_geo.longitude_deg);

        let deflection = (terrain_elevation_m - gear_geo.altitude_m).max(0.0);
        let deflection_rate = if dt > 0.0 { (deflection - self.prev_compression_m) / dt } else { 0.0 };
        self.prev_compression_m = self.compression_m;
        self.compression_m = deflection;

        self.over_compressed = deflection > self.max_compression_m;
        let in_contact = deflection > 0.0;

        if !in_contact {
            return (Vector3::zeros(), Vector3::zeros(), false);
        }

        let force_magnitude = (self.spring_k_n_per_m * deflection + self.damping_c_n_per_m_per_s * deflection_rate).max(0.0);
        let force_ned = normal_ned * force_magnitude;
        let force_body = attitude.inverse() * force_ned;
        let moment_body = self.position_body.cross(&force_body);

        (force_body, moment_body, in_contact)
    }
}

/// Net output of one `LandingGear::update` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct LandingGearOutput {
    pub force_body: Vector3<f64>,
    pub moment_body: Vector3<f64>,
    pub weight_on_wheels: bool,
    pub weight_on_nose_wheel: bool,
    pub at_rest: bool,
    pub ground_crash: bool,
}

/// The vehicle's full set of ground-reaction points, plus the
/// at-rest/rolling friction state machine that spans them (spec §4.11).
#[derive(Debug, Clone, Default)]
pub struct LandingGear {
    pub points: Vec<GroundReactionPoint>,
    pub nws_enabled: bool,
    /// Suppresses `ground_crash` for testing (spec §4.11 "unless testing
    /// flags suppress it").
    pub suppress_crash_detection: bool,
    /// An externally applied lateral body-frame force (e.g. a catapult or
    /// tow bar) that overrides nose-gear steering while active.
    pub external_lateral_force_body: Option<Vector3<f64>>,
    last_speed_m_s: f64,
}

impl LandingGear {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(
        &mut self,
        vehicle_position: GeoPoint,
        attitude: UnitQuaternion<f64>,
        velocity_ned: Vector3<f64>,
        non_gear_force_ned: Vector3<f64>,
        terrain: &dyn Terrain,
        central_body: CentralBody,
        dt: f64,
    ) -> LandingGearOutput {
        if let Some(external_force) = self.external_lateral_force_body {
            let steering_angle_deg = steering_angle_from_lateral_force(external_force);
            for point in self.points.iter_mut().filter(|p| p.is_nose_gear) {
                point.steering_angle_deg = steering_angle_deg;
            }
        }

        let mut output = LandingGearOutput::default();
        let mut any_in_contact = false;

        for point in &mut self.points {
            let (force, moment, in_contact) = point.normal_force_moment(vehicle_position, attitude, terrain, central_body, dt);
            output.force_body += force;
            output.moment_body += moment;

            if in_contact {
                any_in_contact = true;
                if point.is_landing_gear {
                    output.weight_on_wheels = true;
                    if point.is_nose_gear {
                        output.weight_on_nose_wheel = true;
                    }
                }
            }
            if point.over_compressed && !point.is_landing_gear && !self.suppress_crash_detection {
                output.ground_crash = true;
            }
        }

        let speed = velocity_ned.norm();
        let at_rest = speed < AT_REST_SPEED_THRESHOLD_M_S && self.last_speed_m_s < AT_REST_SPEED_THRESHOLD_M_S;
        output.at_rest = at_rest;

        if any_in_contact {
            let (friction_force_body, friction_moment_body) = if !at_rest {
                self.rolling_friction(attitude, velocity_ned)
            } else {
                self.static_friction(attitude, non_gear_force_ned)
            };
            output.force_body += friction_force_body;
            output.moment_body += friction_moment_body;
        }

        self.last_speed_m_s = if output.weight_on_wheels { speed } else { 0.0 };
        output
    }

    /// Step 3 of spec §4.11: each contacting point contributes friction
    /// along the surface-plane projection of its own velocity, split into
    /// a rolling/braked component along the wheel heading and a static
    /// scuffing component perpendicular to it.
    fn rolling_friction(&self, attitude: UnitQuaternion<f64>, velocity_ned: Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
        let velocity_body = attitude.inverse() * velocity_ned;
        let mut total_force = Vector3::zeros();
        let mut total_moment = Vector3::zeros();

        for point in &self.points {
            if point.compression_m <= 0.0 {
                continue;
            }
            let normal = normal_force_estimate(point);
            if normal <= 0.0 {
                continue;
            }

            let heading = point.steering_angle_deg.to_radians();
            let wheel_axis = Vector3::new(heading.cos(), heading.sin(), 0.0);
            let planar_velocity = Vector3::new(velocity_body.x, velocity_body.y, 0.0);

            let along = planar_velocity.dot(&wheel_axis);
            let lateral = planar_velocity - wheel_axis * along;

            let mut force = Vector3::zeros();
            if along.abs() > 1e-6 {
                force -= wheel_axis * along.signum() * point.effective_rolling_mu(true) * normal;
            }
            if lateral.norm() > 1e-6 {
                force -= lateral.normalize() * point.scuffing_friction_static * normal;
            }

            total_force += force;
            total_moment += point.position_body.cross(&force);
        }
        (total_force, total_moment)
    }

    /// Steps 3-4 of spec §4.11 at rest: computes the maximum static
    /// friction available and either holds the vehicle still (scaling the
    /// pitch moment) or lets it start rolling under kinetic friction.
    fn static_friction(&self, attitude: UnitQuaternion<f64>, non_gear_force_ned: Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
        let force_body = attitude.inverse() * non_gear_force_ned;
        let planar_force = Vector3::new(force_body.x, force_body.y, 0.0);
        let required = planar_force.norm();
        if required < 1e-6 {
            return (Vector3::zeros(), Vector3::zeros());
        }
        let direction = -planar_force / required;

        let mut max_total_friction = 0.0;
        for point in &self.points {
            if point.compression_m <= 0.0 {
                continue;
            }
            let normal = normal_force_estimate(point);
            max_total_friction += point.effective_rolling_mu(false) * normal;
        }

        if max_total_friction < required {
            return self.rolling_friction_in_direction(direction);
        }

        let (naive_force, naive_moment) = self.rolling_friction_in_direction(direction);
        let naive_magnitude = naive_force.norm();
        let ratio = if naive_magnitude > 1e-9 { required / naive_magnitude } else { 1.0 };

        let friction_force = -planar_force;
        let friction_moment = Vector3::new(0.0, naive_moment.y * ratio, 0.0);
        (friction_force, friction_moment)
    }

    fn rolling_friction_in_direction(&self, direction: Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
        let mut total_force = Vector3::zeros();
        let mut total_moment = Vector3::zeros();
        for point in &self.points {
            if point.compression_m <= 0.0 {
                continue;
            }
            let normal = normal_force_estimate(point);
            let force = direction * point.effective_rolling_mu(true) * normal;
            total_force += force;
            total_moment += point.position_body.cross(&force);
        }
        (total_force, total_moment)
    }
}

fn normal_force_estimate(point: &GroundReactionPoint) -> f64 {
    point.spring_k_n_per_m * point.compression_m
}

/// Nose-gear steering angle implied by an externally applied lateral
/// force, kept within ±90° since wheels roll both forward and backward
/// (ported from `P6DofLandingGear::Update`'s steering-angle quadrant fix).
fn steering_angle_from_lateral_force(force_body: Vector3<f64>) -> f64 {
    if force_body.x.abs() < 1e-5 {
        return if force_body.y < 0.0 { -90.0 } else { 90.0 };
    }
    let mut angle_deg = force_body.y.atan2(force_body.x).to_degrees();
    if angle_deg > 90.0 {
        angle_deg -= 180.0;
    } else if angle_deg < -90.0 {
        angle_deg += 180.0;
    }
    angle_deg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::FlatTerrain;

    #[test]
    fn resting_on_flat_ground_produces_upward_force() {
        let mut gear = LandingGear::new();
        let mut point = GroundReactionPoint::new("main", Vector3::new(0.0, 0.0, 1.0));
        point.max_compression_m = 0.5;
        gear.points.push(point);

        let position = GeoPoint::new(0.0, 0.0, 0.9);
        let output = gear.update(
            position,
            UnitQuaternion::identity(),
            Vector3::zeros(),
            Vector3::zeros(),
            &FlatTerrain,
            CentralBody::default(),
            0.01,
        );

        assert!(output.force_body.z < 0.0, "normal force should push up (negative body-z)");
        assert!(output.weight_on_wheels);
    }

    #[test]
    fn no_contact_above_ground_produces_no_force() {
        let mut gear = LandingGear::new();
        gear.points.push(GroundReactionPoint::new("main", Vector3::new(0.0, 0.0, 1.0)));

        let position = GeoPoint::new(0.0, 0.0, 1000.0);
        let output = gear.update(
            position,
            UnitQuaternion::identity(),
            Vector3::new(50.0, 0.0, 0.0),
            Vector3::zeros(),
            &FlatTerrain,
            CentralBody::default(),
            0.01,
        );

        assert_eq!(output.force_body, Vector3::zeros());
        assert!(!output.weight_on_wheels);
    }

    #[test]
    fn steering_angle_from_force_is_clamped_to_plus_minus_90() {
        let angle = steering_angle_from_lateral_force(Vector3::new(-1.0, 1.0, 0.0));
        assert!(angle.abs() <= 90.0);
    }
}
