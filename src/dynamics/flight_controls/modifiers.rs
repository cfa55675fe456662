//! Per-input-stream modifiers and the curve lookup they share (spec §4.12).

/// Observable keys a gain/mapping curve can be indexed on, plus a
/// catch-all for a curve keyed on the raw upstream signal itself.
#[derive(Debug, Clone, PartialEq)]
pub enum CurveKey {
    Mach,
    Ktas,
    Alpha,
    Beta,
    Nx,
    Ny,
    Nz,
    Altitude,
    DynamicPressure,
    Signal,
}

/// Every value a modifier's curve might be keyed on, sampled once per
/// step from the vehicle's current kinematics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlObservables {
    pub mach: f64,
    pub ktas: f64,
    pub alpha_deg: f64,
    pub beta_deg: f64,
    pub nx: f64,
    pub ny: f64,
    pub nz: f64,
    pub altitude_m: f64,
    pub dynamic_pressure_pa: f64,
}

impl ControlObservables {
    fn sample(&self, key: &CurveKey, signal: f64) -> f64 {
        match key {
            CurveKey::Mach => self.mach,
            CurveKey::Ktas => self.ktas,
            CurveKey::Alpha => self.alpha_deg,
            CurveKey::Beta => self.beta_deg,
            CurveKey::Nx => self.nx,
            CurveKey::Ny => self.ny,
            CurveKey::Nz => self.nz,
            CurveKey::Altitude => self.altitude_m,
            CurveKey::DynamicPressure => self.dynamic_pressure_pa,
            CurveKey::Signal => signal,
        }
    }
}

/// A piecewise-linear lookup table, the idiomatic stand-in for the
/// teacher's ecosystem `UtTable`-backed curves (flat-extrapolated outside
/// its domain).
#[derive(Debug, Clone)]
pub struct Curve {
    points: Vec<(f64, f64)>,
}

impl Curve {
    pub fn new(mut points: Vec<(f64, f64)>) -> Self {
        points.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("curve breakpoints must be finite"));
        Self { points }
    }

    pub fn lookup(&self, x: f64) -> f64 {
        match self.points.len() {
            0 => 0.0,
            1 => self.points[0].1,
            _ => {
                if x <= self.points[0].0 {
                    return self.points[0].1;
                }
                if x >= self.points[self.points.len() - 1].0 {
                    return self.points[self.points.len() - 1].1;
                }
                let upper = self.points.iter().position(|&(px, _)| px >= x).unwrap();
                let (x0, y0) = self.points[upper - 1];
                let (x1, y1) = self.points[upper];
                let t = (x - x0) / (x1 - x0);
                y0 + t * (y1 - y0)
            }
        }
    }
}

/// One cascaded step applied to an input-stream's signal, in declared
/// order (spec §4.12).
#[derive(Debug, Clone)]
pub enum Modifier {
    ScalarGain(f64),
    ClampGain { min: f64, max: f64 },
    GainCurve { key: CurveKey, curve: Curve },
    MappingCurve { key: CurveKey, curve: Curve },
    /// Reserved: stability augmentation, a no-op until wired to rate
    /// feedback (spec §4.12).
    Sas,
}

impl Modifier {
    pub fn apply(&self, signal: f64, observables: &ControlObservables) -> f64 {
        match self {
            Modifier::ScalarGain(gain) => signal * gain,
            Modifier::ClampGain { min, max } => signal.clamp(*min, *max),
            Modifier::GainCurve { key, curve } => signal * curve.lookup(observables.sample(key, signal)),
            Modifier::MappingCurve { key, curve } => curve.lookup(observables.sample(key, signal)),
            Modifier::Sas => signal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_interpolates_linearly_between_breakpoints() {
        let curve = Curve::new(vec![(0.0, 0.0), (1.0, 10.0)]);
        assert!((curve.lookup(0.5) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn curve_flat_extrapolates_outside_domain() {
        let curve = Curve::new(vec![(0.0, 1.0), (1.0, 2.0)]);
        assert_eq!(curve.lookup(-5.0), 1.0);
        assert_eq!(curve.lookup(5.0), 2.0);
    }

    #[test]
    fn scalar_gain_multiplies_signal() {
        let observables = ControlObservables::default();
        let out = Modifier::ScalarGain(2.0).apply(3.0, &observables);
        assert_eq!(out, 6.0);
    }

    #[test]
    fn clamp_gain_bounds_signal() {
        let observables = ControlObservables::default();
        let out = Modifier::ClampGain { min: -1.0, max: 1.0 }.apply(5.0, &observables);
        assert_eq!(out, 1.0);
    }
}
