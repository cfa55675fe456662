//! Aerodynamic coefficient build-up and bounded-bisection trim queries
//! (spec §4.9).
//!
//! Grounded on the teacher's `components::aerodynamics` coefficient
//! structs (`DragCoefficients`/`LiftCoefficients`/.../`YawCoefficients`,
//! kept verbatim) and `systems::aerodynamics::force_calculator` for the
//! force/moment assembly shape, generalized from a single whole-aircraft
//! model driven by an external `aerso` crate into per-component
//! `AeroCore`/`AeroMovable` contributions the way spec §4.9 asks for.
//! The three bisection helpers replace the teacher's full 6DOF
//! `argmin`-based `TrimOptimizer` (`components::trim::solver`) with the
//! narrower single-variable root searches spec §4.9 actually calls for;
//! `argmin`/`argmin-math` accordingly have no remaining call site and were
//! dropped (see `DESIGN.md`).
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ControlSurfaceDeflections {
    pub elevator: f64,
    pub aileron: f64,
    pub rudder: f64,
    pub flaps: f64,
}

/// Everything a coefficient build-up needs: attitude angles, Mach, body
/// rates, dynamic pressure, and resolved control-surface deflections.
#[derive(Debug, Clone, Copy)]
pub struct AeroInputs {
    pub alpha: f64,
    pub beta: f64,
    pub mach: f64,
    pub body_rates: Vector3<f64>,
    pub dynamic_pressure: f64,
    pub controls: ControlSurfaceDeflections,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DragCoefficients {
    pub c_d_0: f64,
    pub c_d_alpha: f64,
    pub c_d_alpha_q: f64,
    pub c_d_alpha_deltae: f64,
    pub c_d_alpha2: f64,
    pub c_d_alpha2_q: f64,
    pub c_d_alpha2_deltae: f64,
    pub c_d_alpha3: f64,
    pub c_d_alpha3_q: f64,
    pub c_d_alpha4: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LiftCoefficients {
    pub c_l_0: f64,
    pub c_l_alpha: f64,
    pub c_l_q: f64,
    pub c_l_deltae: f64,
    pub c_l_alpha_q: f64,
    pub c_l_alpha2: f64,
    pub c_l_alpha3: f64,
    pub c_l_alpha4: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SideForceCoefficients {
    pub c_y_beta: f64,
    pub c_y_p: f64,
    pub c_y_r: f64,
    pub c_y_deltaa: f64,
    pub c_y_deltar: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RollCoefficients {
    pub c_l_beta: f64,
    pub c_l_p: f64,
    pub c_l_r: f64,
    pub c_l_deltaa: f64,
    pub c_l_deltar: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PitchCoefficients {
    pub c_m_0: f64,
    pub c_m_alpha: f64,
    pub c_m_q: f64,
    pub c_m_deltae: f64,
    pub c_m_alpha_q: f64,
    pub c_m_alpha2_q: f64,
    pub c_m_alpha2_deltae: f64,
    pub c_m_alpha3_q: f64,
    pub c_m_alpha3_deltae: f64,
    pub c_m_alpha4: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct YawCoefficients {
    pub c_n_beta: f64,
    pub c_n_p: f64,
    pub c_n_r: f64,
    pub c_n_deltaa: f64,
    pub c_n_deltar: f64,
    pub c_n_beta2: f64,
    pub c_n_beta3: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AeroCoefficients {
    pub drag: DragCoefficients,
    pub lift: LiftCoefficients,
    pub side_force: SideForceCoefficients,
    pub roll: RollCoefficients,
    pub pitch: PitchCoefficients,
    pub yaw: YawCoefficients,
}

/// Lift/drag/side-force magnitudes, the moment about the component's
/// declared reference point, and the area-weighted coefficients the
/// vehicle sums into `CLArea`/`CdArea`/`CmArea` (spec §4.9).
#[derive(Debug, Clone, Copy)]
pub struct AeroContribution {
    pub force_body: Vector3<f64>,
    pub moment_about_reference: Vector3<f64>,
    pub cl_area: f64,
    pub cd_area: f64,
    pub cm_area: f64,
}

/// Shared geometry every aero component declares: its reference point in
/// body coordinates, reference/wing area, span, and mean aerodynamic
/// chord (used to non-dimensionalize body rates into `qhat`/`phat`/`rhat`).
#[derive(Debug, Clone, Copy)]
pub struct AeroGeometry {
    pub reference_point: Vector3<f64>,
    pub reference_area: f64,
    pub wing_span: f64,
    pub mean_aerodynamic_chord: f64,
}

/// A fixed aerodynamic surface with no movable control input (spec §4.9
/// `AeroCore`): fuselage, fixed fin, wing-without-control-surface.
#[derive(Debug, Clone)]
pub struct AeroCore {
    pub name: String,
    pub geometry: AeroGeometry,
    pub coefficients: AeroCoefficients,
}

/// An aero component whose coefficients respond to a control-surface
/// deflection (spec §4.9 `AeroMovable`): elevator, aileron, rudder.
#[derive(Debug, Clone)]
pub struct AeroMovable {
    pub core: AeroCore,
}

impl AeroCore {
    pub fn new(name: impl Into<String>, geometry: AeroGeometry, coefficients: AeroCoefficients) -> Self {
        Self { name: name.into(), geometry, coefficients }
    }

    /// Builds force/moment ignoring control-surface deflections, since a
    /// fixed surface has none to apply (spec §4.9).
    pub fn contribution(&self, inputs: &AeroInputs) -> AeroContribution {
        build_up(&self.geometry, &self.coefficients, inputs, false)
    }
}

impl AeroMovable {
    pub fn new(core: AeroCore) -> Self {
        Self { core }
    }

    /// Builds force/moment including control-surface deflection terms.
    pub fn contribution(&self, inputs: &AeroInputs) -> AeroContribution {
        build_up(&self.core.geometry, &self.core.coefficients, inputs, true)
    }
}

fn build_up(
    geometry: &AeroGeometry,
    c: &AeroCoefficients,
    inputs: &AeroInputs,
    apply_controls: bool,
) -> AeroContribution {
    let (alpha, beta, qbar) = (inputs.alpha, inputs.beta, inputs.dynamic_pressure);
    let v = inputs.mach.max(1e-6) * 340.0; // speed scale only for rate nondimensionalization
    let (p, q, r) = (inputs.body_rates.x, inputs.body_rates.y, inputs.body_rates.z);
    let b = geometry.wing_span.max(1e-6);
    let mac = geometry.mean_aerodynamic_chord.max(1e-6);
    let qhat = q * mac / (2.0 * v);
    let phat = p * b / (2.0 * v);
    let rhat = r * b / (2.0 * v);

    let elevator = if apply_controls { inputs.controls.elevator } else { 0.0 };
    let aileron = if apply_controls { inputs.controls.aileron } else { 0.0 };
    let rudder = if apply_controls { inputs.controls.rudder } else { 0.0 };

    let (a2, a3, a4) = (alpha * alpha, alpha.powi(3), alpha.powi(4));

    let cl = c.lift.c_l_0
        + c.lift.c_l_alpha * alpha
        + c.lift.c_l_alpha2 * a2
        + c.lift.c_l_alpha3 * a3
        + c.lift.c_l_alpha4 * a4
        + c.lift.c_l_q * qhat
        + c.lift.c_l_alpha_q * alpha * qhat
        + c.lift.c_l_deltae * elevator;

    let cd = c.drag.c_d_0
        + c.drag.c_d_alpha * alpha
        + c.drag.c_d_alpha2 * a2
        + c.drag.c_d_alpha3 * a3
        + c.drag.c_d_alpha4 * a4
        + c.drag.c_d_alpha_q * alpha * qhat
        + c.drag.c_d_alpha2_q * a2 * qhat
        + c.drag.c_d_alpha3_q * a3 * qhat
        + c.drag.c_d_alpha_deltae * alpha * elevator
        + c.drag.c_d_alpha2_deltae * a2 * elevator;

    let cy = c.side_force.c_y_beta * beta
        + c.side_force.c_y_p * phat
        + c.side_force.c_y_r * rhat
        + c.side_force.c_y_deltaa * aileron
        + c.side_force.c_y_deltar * rudder;

    let c_roll = c.roll.c_l_beta * beta
        + c.roll.c_l_p * phat
        + c.roll.c_l_r * rhat
        + c.roll.c_l_deltaa * aileron
        + c.roll.c_l_deltar * rudder;

    let cm = c.pitch.c_m_0
        + c.pitch.c_m_alpha * alpha
        + c.pitch.c_m_alpha4 * a4
        + c.pitch.c_m_q * qhat
        + c.pitch.c_m_alpha_q * alpha * qhat
        + c.pitch.c_m_alpha2_q * a2 * qhat
        + c.pitch.c_m_alpha3_q * a3 * qhat
        + c.pitch.c_m_deltae * elevator
        + c.pitch.c_m_alpha2_deltae * a2 * elevator
        + c.pitch.c_m_alpha3_deltae * a3 * elevator;

    let cn = c.yaw.c_n_beta * beta
        + c.yaw.c_n_beta2 * beta * beta
        + c.yaw.c_n_beta3 * beta.powi(3)
        + c.yaw.c_n_p * phat
        + c.yaw.c_n_r * rhat
        + c.yaw.c_n_deltaa * aileron
        + c.yaw.c_n_deltar * rudder;

    let s = geometry.reference_area;
    // Stability-axis lift/drag rotated into body axes by alpha; side force
    // applied directly along body Y (beta's own rotation is already folded
    // into `cy` via the `c_y_beta` derivative, matching the teacher's
    // coefficient-only sideforce model rather than a full wind-axis
    // transform).
    let fx = qbar * s * (cl * alpha.sin() - cd * alpha.cos());
    let fz = qbar * s * (-cl * alpha.cos() - cd * alpha.sin());
    let fy = qbar * s * cy;

    AeroContribution {
        force_body: Vector3::new(fx, fy, fz),
        moment_about_reference: Vector3::new(qbar * s * b * c_roll, qbar * s * mac * cm, qbar * s * b * cn),
        cl_area: cl * s,
        cd_area: cd * s,
        cm_area: cm * s,
    }
}

/// Outcome of a bounded bisection query (spec §4.9): the achieved value,
/// whether the target was actually reached, and whether control authority
/// was exhausted (clamped to the best achievable value).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BisectionResult {
    pub value: f64,
    pub achieved: f64,
    pub clamped: bool,
}

const MAX_BISECTION_ITERATIONS: usize = 64;

/// Finds `x` in `[lo, hi]` such that `f(x) == target` to within `tol`,
/// assuming `f` is monotonic over the bracket. If `target` is outside
/// `[f(lo), f(hi)]` the search clamps to whichever endpoint is closest and
/// reports `clamped = true` (spec §4.9 "if authority is exhausted it
/// clamps ... and records that it did so").
fn bisect(mut f: impl FnMut(f64) -> f64, lo: f64, hi: f64, target: f64, tol: f64) -> BisectionResult {
    let f_lo = f(lo);
    let f_hi = f(hi);
    let increasing = f_hi >= f_lo;
    let (bracket_lo, bracket_hi) = if increasing { (f_lo, f_hi) } else { (f_hi, f_lo) };

    if target <= bracket_lo {
        let (value, achieved) = if increasing { (lo, f_lo) } else { (hi, f_hi) };
        return BisectionResult { value, achieved, clamped: true };
    }
    if target >= bracket_hi {
        let (value, achieved) = if increasing { (hi, f_hi) } else { (lo, f_lo) };
        return BisectionResult { value, achieved, clamped: true };
    }

    let (mut a, mut b) = (lo, hi);
    let mut mid = 0.5 * (a + b);
    let mut f_mid = f(mid);
    for _ in 0..MAX_BISECTION_ITERATIONS {
        if (f_mid - target).abs() < tol || (b - a).abs() < 1e-12 {
            break;
        }
        let on_low_side = if increasing { f_mid < target } else { f_mid > target };
        if on_low_side {
            a = mid;
        } else {
            b = mid;
        }
        mid = 0.5 * (a + b);
        f_mid = f(mid);
    }

    BisectionResult { value: mid, achieved: f_mid, clamped: false }
}

/// Finds the angle of attack achieving `target_nz` load factor, bisecting
/// over `[alpha_min, alpha_max]`. `nz_of_alpha` is the caller's closure over
/// `components`/`mass`/`qbar` collapsed to the single load-factor value at a
/// given alpha, matching the sibling solvers below.
pub fn solve_alpha_for_nz(
    nz_of_alpha: impl FnMut(f64) -> f64,
    alpha_min: f64,
    alpha_max: f64,
    target_nz: f64,
    tol: f64,
) -> BisectionResult {
    bisect(nz_of_alpha, alpha_min, alpha_max, target_nz, tol)
}

/// Finds the sideslip achieving `target_ny` load factor, bisecting over
/// `[beta_min, beta_max]`.
pub fn solve_beta_for_ny(
    ny_of_beta: impl FnMut(f64) -> f64,
    beta_min: f64,
    beta_max: f64,
    target_ny: f64,
    tol: f64,
) -> BisectionResult {
    bisect(ny_of_beta, beta_min, beta_max, target_ny, tol)
}

/// Finds the elevator (stick-back) deflection giving net-zero pitching
/// moment at a fixed (alpha, Mach), bisecting over `[elevator_min,
/// elevator_max]`.
pub fn solve_elevator_for_zero_cm(
    cm_of_elevator: impl FnMut(f64) -> f64,
    elevator_min: f64,
    elevator_max: f64,
    tol: f64,
) -> BisectionResult {
    bisect(cm_of_elevator, elevator_min, elevator_max, 0.0, tol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat_plate_core() -> AeroCore {
        AeroCore::new(
            "wing",
            AeroGeometry {
                reference_point: Vector3::zeros(),
                reference_area: 16.0,
                wing_span: 10.0,
                mean_aerodynamic_chord: 1.6,
            },
            AeroCoefficients {
                lift: LiftCoefficients { c_l_0: 0.2, c_l_alpha: 5.0, ..Default::default() },
                drag: DragCoefficients { c_d_0: 0.02, c_d_alpha2: 0.1, ..Default::default() },
                pitch: PitchCoefficients { c_m_0: 0.0, c_m_alpha: -1.0, c_m_deltae: -1.2, ..Default::default() },
                ..Default::default()
            },
        )
    }

    #[test]
    fn zero_alpha_beta_gives_zero_side_force_and_moment_y_matches_cm0() {
        let core = flat_plate_core();
        let inputs = AeroInputs {
            alpha: 0.0,
            beta: 0.0,
            mach: 0.3,
            body_rates: Vector3::zeros(),
            dynamic_pressure: 1000.0,
            controls: ControlSurfaceDeflections::default(),
        };
        let contribution = core.contribution(&inputs);
        assert_relative_eq!(contribution.force_body.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(contribution.cm_area, 0.0 * 16.0, epsilon = 1e-9);
    }

    #[test]
    fn bisection_finds_zero_elevator_solution_for_linear_cm() {
        let result = solve_elevator_for_zero_cm(|de| -1.0 - 1.2 * de, -1.0, 1.0, 1e-6);
        assert!(!result.clamped);
        assert_relative_eq!(result.value, -1.0 / 1.2, epsilon = 1e-4);
    }

    #[test]
    fn bisection_clamps_when_target_unreachable() {
        let result = solve_beta_for_ny(|b| b, -0.1, 0.1, 5.0, 1e-6);
        assert!(result.clamped);
        assert_relative_eq!(result.value, 0.1, epsilon = 1e-9);
    }

    #[test]
    fn bisection_finds_alpha_solution_for_linear_nz() {
        let result = solve_alpha_for_nz(|alpha| 1.0 + 4.0 * alpha, -0.2, 0.2, 1.4, 1e-6);
        assert!(!result.clamped);
        assert_relative_eq!(result.value, 0.1, epsilon = 1e-4);
    }
}
