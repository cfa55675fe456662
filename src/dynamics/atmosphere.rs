//! Minimal International Standard Atmosphere model, used by
//! [`super::kinematics::KinematicState`] to derive Mach number, dynamic/
//! static pressure, and calibrated airspeed from altitude and true
//! airspeed (spec §3 `KinematicState`).
//!
//! Grounded on the teacher's `utils::constants` (ISA constants) and
//! `systems::aerodynamics::air_data` (dynamic pressure from density and
//! true airspeed); troposphere-only, matching the teacher's scope.

pub const GRAVITY: f64 = 9.80665;
pub const AIR_GAS_CONSTANT: f64 = 287.052_87;
pub const ISA_SEA_LEVEL_TEMP_K: f64 = 288.15;
pub const ISA_SEA_LEVEL_PRESSURE_PA: f64 = 101_325.0;
pub const ISA_LAPSE_RATE_K_PER_M: f64 = -0.0065;
pub const ISA_SEA_LEVEL_DENSITY: f64 = 1.225;
const GAMMA_AIR: f64 = 1.4;
const TROPOPAUSE_ALT_M: f64 = 11_000.0;

/// Temperature, pressure, density, and speed of sound at `altitude_m`
/// (troposphere lapse below 11km, isothermal above).
pub struct AtmosphereSample {
    pub temperature_k: f64,
    pub pressure_pa: f64,
    pub density_kg_m3: f64,
    pub speed_of_sound_m_s: f64,
}

pub fn sample(altitude_m: f64) -> AtmosphereSample {
    let h = altitude_m.min(TROPOPAUSE_ALT_M).max(-500.0);
    let temperature_k = ISA_SEA_LEVEL_TEMP_K + ISA_LAPSE_RATE_K_PER_M * h;
    let pressure_pa = ISA_SEA_LEVEL_PRESSURE_PA
        * (temperature_k / ISA_SEA_LEVEL_TEMP_K).powf(-GRAVITY / (ISA_LAPSE_RATE_K_PER_M * AIR_GAS_CONSTANT));
    let density_kg_m3 = pressure_pa / (AIR_GAS_CONSTANT * temperature_k);
    let speed_of_sound_m_s = (GAMMA_AIR * AIR_GAS_CONSTANT * temperature_k).sqrt();
    AtmosphereSample {
        temperature_k,
        pressure_pa,
        density_kg_m3,
        speed_of_sound_m_s,
    }
}

/// Calibrated airspeed from true airspeed and ambient pressure/density,
/// via the compressible pitot-static (Rayleigh supersonic-pitot-adjacent,
/// here subsonic-only) relation referenced to sea-level conditions.
pub fn calibrated_airspeed(true_airspeed_m_s: f64, sample: &AtmosphereSample) -> f64 {
    if true_airspeed_m_s <= 0.0 {
        return 0.0;
    }
    let mach = true_airspeed_m_s / sample.speed_of_sound_m_s;
    let impact_pressure = sample.pressure_pa
        * ((1.0 + 0.2 * mach * mach).powf(3.5) - 1.0);
    let sea_level_sample = sample_sea_level();
    let ratio = impact_pressure / sea_level_sample.pressure_pa + 1.0;
    sea_level_sample.speed_of_sound_m_s * (5.0 * (ratio.powf(2.0 / 7.0) - 1.0)).max(0.0).sqrt()
}

fn sample_sea_level() -> AtmosphereSample {
    AtmosphereSample {
        temperature_k: ISA_SEA_LEVEL_TEMP_K,
        pressure_pa: ISA_SEA_LEVEL_PRESSURE_PA,
        density_kg_m3: ISA_SEA_LEVEL_DENSITY,
        speed_of_sound_m_s: (GAMMA_AIR * AIR_GAS_CONSTANT * ISA_SEA_LEVEL_TEMP_K).sqrt(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sea_level_matches_constants() {
        let s = sample(0.0);
        assert_relative_eq!(s.density_kg_m3, ISA_SEA_LEVEL_DENSITY, epsilon = 1e-3);
        assert_relative_eq!(s.pressure_pa, ISA_SEA_LEVEL_PRESSURE_PA, epsilon = 1.0);
    }

    #[test]
    fn density_decreases_with_altitude() {
        assert!(sample(5000.0).density_kg_m3 < sample(0.0).density_kg_m3);
    }

    #[test]
    fn calibrated_airspeed_matches_true_at_sea_level() {
        let cas = calibrated_airspeed(100.0, &sample(0.0));
        assert_relative_eq!(cas, 100.0, epsilon = 0.5);
    }
}
