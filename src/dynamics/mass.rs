//! Composable mass properties with parallel-axis inertia summation (spec
//! §3 `MassProperties`, §4.8).
use nalgebra::{Matrix3, Vector3};

/// Base plus current mass/CG/inertia for one vehicle or subobject.
///
/// Grounded on the teacher's `components::aircraft::config::mass::MassModel`
/// (mass + symmetric inertia tensor, built from diagonal and `Ixz` cross
/// term), generalized here to an additive base/current split so fuel burn
/// and child subobjects can be folded in without mutating the base values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    pub base_mass: f64,
    pub base_cg: Vector3<f64>,
    pub base_inertia: Matrix3<f64>,
    pub current_mass: f64,
    pub current_cg: Vector3<f64>,
    pub current_inertia: Matrix3<f64>,
}

/// One contribution to be folded into the parent's current properties by
/// [`MassProperties::accumulate_from_child`]: a child subobject, a fuel
/// tank, or a propellant charge, each with its own mass/CG/inertia-about-CG.
#[derive(Debug, Clone, Copy)]
pub struct MassContribution {
    pub mass: f64,
    pub cg: Vector3<f64>,
    pub inertia_about_cg: Matrix3<f64>,
}

impl MassProperties {
    /// Builds inertia from principal moments `ixx, iyy, izz` and the single
    /// off-diagonal product-of-inertia term `ixz`, matching `MassModel::new`.
    pub fn new(mass: f64, cg: Vector3<f64>, ixx: f64, iyy: f64, izz: f64, ixz: f64) -> Self {
        let inertia = Matrix3::new(ixx, 0.0, -ixz, 0.0, iyy, 0.0, -ixz, 0.0, izz);
        Self {
            base_mass: mass,
            base_cg: cg,
            base_inertia: inertia,
            current_mass: mass,
            current_cg: cg,
            current_inertia: inertia,
        }
    }

    /// Resets current properties to the base values (spec §4.8 `set-current
    /// = base`), discarding any previously accumulated contributions.
    pub fn set_current_to_base(&mut self) {
        self.current_mass = self.base_mass;
        self.current_cg = self.base_cg;
        self.current_inertia = self.base_inertia;
    }

    /// Folds every contribution into the current mass properties about a
    /// newly-computed combined CG, translating each inertia tensor (the
    /// base and every contribution's) to that CG via the parallel-axis
    /// theorem before summing (spec §3 invariant, §4.8
    /// `accumulate-from-child`).
    pub fn accumulate_from_child(&mut self, contributions: &[MassContribution]) {
        let total_mass = self.base_mass + contributions.iter().map(|c| c.mass).sum::<f64>();
        if total_mass <= 0.0 {
            self.current_mass = self.base_mass;
            self.current_cg = self.base_cg;
            self.current_inertia = self.base_inertia;
            return;
        }

        let weighted_cg = self.base_mass * self.base_cg
            + contributions.iter().map(|c| c.mass * c.cg).sum::<Vector3<f64>>();
        let combined_cg = weighted_cg / total_mass;

        let mut combined_inertia =
            parallel_axis_translate(self.base_inertia, self.base_mass, self.base_cg, combined_cg);
        for c in contributions {
            combined_inertia +=
                parallel_axis_translate(c.inertia_about_cg, c.mass, c.cg, combined_cg);
        }

        self.current_mass = total_mass;
        self.current_cg = combined_cg;
        self.current_inertia = combined_inertia;
    }

    /// Inverse of the current inertia tensor, for angular-acceleration
    /// solves (`alpha = I^-1 tau`). Returns `None` if the tensor is
    /// singular, mirroring `MassModel`'s inertia-inversion failure path
    /// (there logged via Bevy's `error!`; here the caller decides whether
    /// to log via `tracing::error!`).
    pub fn current_inertia_inverse(&self) -> Option<Matrix3<f64>> {
        self.current_inertia.try_inverse()
    }
}

/// Translates `inertia` (about `from_cg`) to an inertia tensor about
/// `to_cg` for a point mass `mass`, via the parallel-axis theorem:
/// `I' = I + m * (|d|^2 * Identity - d * d^T)` where `d = from_cg - to_cg`.
fn parallel_axis_translate(
    inertia: Matrix3<f64>,
    mass: f64,
    from_cg: Vector3<f64>,
    to_cg: Vector3<f64>,
) -> Matrix3<f64> {
    let d = from_cg - to_cg;
    let d2 = d.norm_squared();
    inertia + mass * (Matrix3::identity() * d2 - d * d.transpose())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn accumulate_with_coincident_cg_just_sums_mass_and_inertia() {
        let mut parent = MassProperties::new(1000.0, Vector3::zeros(), 800.0, 1200.0, 1500.0, 0.0);
        let child = MassContribution {
            mass: 200.0,
            cg: Vector3::zeros(),
            inertia_about_cg: Matrix3::from_diagonal(&Vector3::new(50.0, 60.0, 70.0)),
        };
        parent.accumulate_from_child(&[child]);
        assert_relative_eq!(parent.current_mass, 1200.0);
        assert_relative_eq!(parent.current_cg, Vector3::zeros());
        assert_relative_eq!(parent.current_inertia[(0, 0)], 850.0, epsilon = 1e-9);
    }

    #[test]
    fn offset_child_increases_inertia_via_parallel_axis() {
        let mut parent = MassProperties::new(1000.0, Vector3::zeros(), 800.0, 1200.0, 1500.0, 0.0);
        let child = MassContribution {
            mass: 100.0,
            cg: Vector3::new(0.0, 2.0, 0.0),
            inertia_about_cg: Matrix3::zeros(),
        };
        parent.accumulate_from_child(&[child]);
        // Combined CG shifts toward the child; Ixx picks up m*d^2 from the
        // offset child about the new combined CG.
        assert!(parent.current_cg.y > 0.0);
        assert!(parent.current_inertia[(0, 0)] > 800.0);
    }

    #[test]
    fn set_current_to_base_discards_accumulation() {
        let mut p = MassProperties::new(500.0, Vector3::zeros(), 100.0, 100.0, 100.0, 0.0);
        p.accumulate_from_child(&[MassContribution {
            mass: 50.0,
            cg: Vector3::new(1.0, 0.0, 0.0),
            inertia_about_cg: Matrix3::identity(),
        }]);
        p.set_current_to_base();
        assert_relative_eq!(p.current_mass, 500.0);
        assert_relative_eq!(p.current_inertia, p.base_inertia);
    }
}
