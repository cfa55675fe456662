//! Fuel tanks and the ordered per-step transfer algorithm (spec §4.10).
use std::collections::HashMap;

use nalgebra::Vector3;

/// A fuel reservoir: capacity, current fill, and the rate limits that
/// bound how fast it can be filled or drained in a single step.
#[derive(Debug, Clone)]
pub struct FuelTank {
    pub name: String,
    pub capacity_kg: f64,
    pub current_kg: f64,
    pub max_fill_rate_kg_s: f64,
    pub max_drain_rate_kg_s: f64,
    pub cg_offset: Vector3<f64>,
}

impl FuelTank {
    pub fn new(name: impl Into<String>, capacity_kg: f64) -> Self {
        Self {
            name: name.into(),
            capacity_kg,
            current_kg: 0.0,
            max_fill_rate_kg_s: f64::INFINITY,
            max_drain_rate_kg_s: f64::INFINITY,
            cg_offset: Vector3::zeros(),
        }
    }

    pub fn fill_fraction(&self) -> f64 {
        if self.capacity_kg <= 0.0 {
            0.0
        } else {
            (self.current_kg / self.capacity_kg).clamp(0.0, 1.0)
        }
    }

    /// Drains up to `requested_kg`, never more than is present, returning
    /// the amount actually removed.
    pub fn drain(&mut self, requested_kg: f64) -> f64 {
        let drawn = requested_kg.min(self.current_kg).max(0.0);
        self.current_kg -= drawn;
        drawn
    }
}

/// A commanded transfer path between two named tanks. `path_intact`
/// models a severed fuel line (battle damage, a closed crossfeed valve);
/// when false the transfer is dropped for the step (spec §4.10 step 1).
#[derive(Debug, Clone)]
pub struct FuelTransfer {
    pub name: String,
    pub source: String,
    pub target: String,
    pub path_intact: bool,
}

impl FuelTransfer {
    pub fn new(name: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self { name: name.into(), source: source.into(), target: target.into(), path_intact: true }
    }
}

/// Runs the six-step fuel-transfer algorithm (spec §4.10) for one time
/// step, mutating `tanks` in place.
///
/// 1. drop transfers with a severed path; 2. group the rest by target;
/// 3. bound each target's intake by its fill-rate and remaining capacity;
/// 4. ask each source what it can deliver, bounded by its own drain rate
///    and current fill; 5. if the sources collectively offer more than the
///    target can take, scale them down uniformly; 6. apply debits and the
///    credit atomically (the target is only touched once all of its
///    sources have been measured, so a tank can be simultaneously a
///    source for one transfer and a target for another without a step
///    ordering artifact).
pub fn run_fuel_transfers(tanks: &mut HashMap<String, FuelTank>, transfers: &[FuelTransfer], dt: f64) {
    if dt <= 0.0 {
        return;
    }

    let active: Vec<&FuelTransfer> = transfers.iter().filter(|t| t.path_intact).collect();

    let mut by_target: HashMap<String, Vec<&FuelTransfer>> = HashMap::new();
    for transfer in active {
        by_target.entry(transfer.target.clone()).or_default().push(transfer);
    }

    let mut debits: HashMap<String, f64> = HashMap::new();
    let mut credits: HashMap<String, f64> = HashMap::new();

    for (target_name, incoming) in &by_target {
        let Some(target) = tanks.get(target_name) else { continue };
        let max_transfer = (target.max_fill_rate_kg_s * dt).min(target.capacity_kg - target.current_kg).max(0.0);
        if max_transfer <= 0.0 {
            continue;
        }

        let mut deliverable: Vec<(String, f64)> = Vec::with_capacity(incoming.len());
        let mut total_deliverable = 0.0;
        for transfer in incoming {
            let Some(source) = tanks.get(&transfer.source) else { continue };
            let already_debited = *debits.get(&transfer.source).unwrap_or(&0.0);
            let remaining = (source.current_kg - already_debited).max(0.0);
            let offer = (source.max_drain_rate_kg_s * dt).min(remaining).max(0.0);
            total_deliverable += offer;
            deliverable.push((transfer.source.clone(), offer));
        }

        let scale = if total_deliverable > max_transfer && total_deliverable > 0.0 {
            max_transfer / total_deliverable
        } else {
            1.0
        };

        let mut credited_to_target = 0.0;
        for (source_name, offer) in deliverable {
            let amount = offer * scale;
            if amount <= 0.0 {
                continue;
            }
            *debits.entry(source_name).or_insert(0.0) += amount;
            credited_to_target += amount;
        }
        *credits.entry(target_name.clone()).or_insert(0.0) += credited_to_target;
    }

    for (name, amount) in debits {
        if let Some(tank) = tanks.get_mut(&name) {
            tank.current_kg = (tank.current_kg - amount).max(0.0);
        }
    }
    for (name, amount) in credits {
        if let Some(tank) = tanks.get_mut(&name) {
            tank.current_kg = (tank.current_kg + amount).min(tank.capacity_kg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tank(name: &str, capacity: f64, current: f64) -> FuelTank {
        let mut t = FuelTank::new(name, capacity);
        t.current_kg = current;
        t
    }

    #[test]
    fn transfer_moves_fuel_within_rate_limits() {
        let mut tanks = HashMap::new();
        tanks.insert("wing".to_string(), tank("wing", 1000.0, 1000.0));
        tanks.insert("fuselage".to_string(), tank("fuselage", 500.0, 0.0));
        tanks.get_mut("fuselage").unwrap().max_fill_rate_kg_s = 10.0;

        let transfers = vec![FuelTransfer::new("feed", "wing", "fuselage")];
        run_fuel_transfers(&mut tanks, &transfers, 1.0);

        assert_eq!(tanks["fuselage"].current_kg, 10.0);
        assert_eq!(tanks["wing"].current_kg, 990.0);
    }

    #[test]
    fn severed_path_blocks_transfer() {
        let mut tanks = HashMap::new();
        tanks.insert("wing".to_string(), tank("wing", 1000.0, 1000.0));
        tanks.insert("fuselage".to_string(), tank("fuselage", 500.0, 0.0));
        let mut transfer = FuelTransfer::new("feed", "wing", "fuselage");
        transfer.path_intact = false;

        run_fuel_transfers(&mut tanks, &[transfer], 1.0);

        assert_eq!(tanks["fuselage"].current_kg, 0.0);
        assert_eq!(tanks["wing"].current_kg, 1000.0);
    }

    #[test]
    fn oversubscribed_sources_are_scaled_uniformly() {
        let mut tanks = HashMap::new();
        tanks.insert("left".to_string(), tank("left", 1000.0, 1000.0));
        tanks.insert("right".to_string(), tank("right", 1000.0, 1000.0));
        tanks.insert("center".to_string(), tank("center", 100.0, 0.0));
        tanks.get_mut("center").unwrap().max_fill_rate_kg_s = 100.0;

        let transfers = vec![
            FuelTransfer::new("left-feed", "left", "center"),
            FuelTransfer::new("right-feed", "right", "center"),
        ];
        run_fuel_transfers(&mut tanks, &transfers, 1.0);

        assert_eq!(tanks["center"].current_kg, 100.0);
        let left_drawn = 1000.0 - tanks["left"].current_kg;
        let right_drawn = 1000.0 - tanks["right"].current_kg;
        assert!((left_drawn - right_drawn).abs() < 1e-9);
        assert!((left_drawn + right_drawn - 100.0).abs() < 1e-9);
    }
}
