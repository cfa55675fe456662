//! Event-triggered sequencers (spec §4.13): timers, threshold crossings,
//! and the actions they fire exactly once.
use std::collections::HashSet;

/// Observable values a trigger samples each step.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequencerObservables {
    pub now_ns: i64,
    pub altitude_m: f64,
    pub speed_m_s: f64,
    pub nx: f64,
    pub ny: f64,
    pub nz: f64,
    pub dynamic_pressure_pa: f64,
    pub static_pressure_pa: f64,
    pub captive: bool,
}

/// What a single trigger watches.
///
/// Threshold-crossing kinds (`Nx`/`Ny`/`Nz`/pressure) fire on any sign
/// change of `current - threshold` relative to the previous sample (spec
/// §4.13 "direction derived from the previous value"); the `Above`/
/// `Below` kinds are plain level comparisons.
#[derive(Debug, Clone)]
pub enum TriggerKind {
    Timer { fire_at_ns: i64 },
    AltitudeAbove(f64),
    AltitudeBelow(f64),
    SpeedAbove(f64),
    SpeedBelow(f64),
    NxCrossing(f64),
    NyCrossing(f64),
    NzCrossing(f64),
    DynamicPressureCrossing(f64),
    StaticPressureCrossing(f64),
    CaptiveStateChange,
    SequencerFired(String),
}

/// One condition within a sequencer's trigger set.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub kind: TriggerKind,
    last_sample: Option<f64>,
    last_captive: Option<bool>,
}

impl Trigger {
    pub fn new(kind: TriggerKind) -> Self {
        Self { kind, last_sample: None, last_captive: None }
    }

    fn crossing(&mut self, current: f64, threshold: f64) -> bool {
        let crossed = match self.last_sample {
            Some(last) => (last - threshold).signum() != (current - threshold).signum(),
            None => false,
        };
        self.last_sample = Some(current);
        crossed
    }

    fn evaluate(&mut self, observables: &SequencerObservables, fired_sequencers: &HashSet<String>) -> bool {
        match &self.kind {
            TriggerKind::Timer { fire_at_ns } => observables.now_ns >= *fire_at_ns,
            TriggerKind::AltitudeAbove(threshold) => observables.altitude_m > *threshold,
            TriggerKind::AltitudeBelow(threshold) => observables.altitude_m < *threshold,
            TriggerKind::SpeedAbove(threshold) => observables.speed_m_s > *threshold,
            TriggerKind::SpeedBelow(threshold) => observables.speed_m_s < *threshold,
            TriggerKind::NxCrossing(threshold) => self.crossing(observables.nx, *threshold),
            TriggerKind::NyCrossing(threshold) => self.crossing(observables.ny, *threshold),
            TriggerKind::NzCrossing(threshold) => self.crossing(observables.nz, *threshold),
            TriggerKind::DynamicPressureCrossing(threshold) => self.crossing(observables.dynamic_pressure_pa, *threshold),
            TriggerKind::StaticPressureCrossing(threshold) => self.crossing(observables.static_pressure_pa, *threshold),
            TriggerKind::CaptiveStateChange => {
                let changed = self.last_captive.is_some_and(|last| last != observables.captive);
                self.last_captive = Some(observables.captive);
                changed
            }
            TriggerKind::SequencerFired(name) => fired_sequencers.contains(name),
        }
    }
}

/// An action a sequencer's fire list can execute. The sequencer itself
/// only produces these; applying them against the vehicle's engines,
/// subobjects, and pilot manager is `Vehicle`'s job, since those are the
/// objects that actually own that state.
#[derive(Debug, Clone)]
pub enum SequencerAction {
    IgniteEngines(Vec<String>),
    ShutdownEngines(Vec<String>),
    JettisonSubobject(String),
    ActivateSequencer(String),
    SetPilotMode(String),
}

/// `(name, event-trigger-set, action-list, fired-flag)` (spec §3).
///
/// `armed` lets one sequencer's `ActivateSequencer` action gate another
/// (a drogue-deploy sequencer armed only once the prior stage fires);
/// top-level sequencers start armed.
#[derive(Debug, Clone)]
pub struct Sequencer {
    pub name: String,
    pub triggers: Vec<Trigger>,
    pub actions: Vec<SequencerAction>,
    pub fired: bool,
    pub armed: bool,
}

impl Sequencer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), triggers: Vec::new(), actions: Vec::new(), fired: false, armed: true }
    }

    /// Samples every trigger; if the set is non-empty and all are
    /// satisfied, marks the sequencer fired (idempotently, spec §3) and
    /// returns its action list for the caller to execute.
    pub fn update(&mut self, observables: &SequencerObservables, fired_sequencers: &HashSet<String>) -> Option<Vec<SequencerAction>> {
        if self.fired || !self.armed || self.triggers.is_empty() {
            return None;
        }
        let all_satisfied = self
            .triggers
            .iter_mut()
            .map(|trigger| trigger.evaluate(observables, fired_sequencers))
            .fold(true, |acc, satisfied| acc && satisfied);

        if all_satisfied {
            self.fired = true;
            Some(self.actions.clone())
        } else {
            None
        }
    }
}

/// Union of timer fire times across `sequencers` that fall within
/// `[now_ns, now_ns + horizon_ns]`, so a scheduler can avoid stepping
/// over one (spec §4.13 `PendingEventTimes`).
pub fn pending_event_times(sequencers: &[Sequencer], now_ns: i64, horizon_ns: i64) -> Vec<i64> {
    let mut times: Vec<i64> = sequencers
        .iter()
        .filter(|s| !s.fired)
        .flat_map(|s| s.triggers.iter())
        .filter_map(|trigger| match &trigger.kind {
            TriggerKind::Timer { fire_at_ns } if *fire_at_ns >= now_ns && *fire_at_ns <= now_ns + horizon_ns => Some(*fire_at_ns),
            _ => None,
        })
        .collect();
    times.sort_unstable();
    times.dedup();
    times
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_trigger_fires_once_threshold_reached() {
        let mut sequencer = Sequencer::new("deploy");
        sequencer.triggers.push(Trigger::new(TriggerKind::Timer { fire_at_ns: 1_000 }));
        sequencer.actions.push(SequencerAction::SetPilotMode("landing".to_string()));

        let fired_before = HashSet::new();
        let mut observables = SequencerObservables { now_ns: 500, ..Default::default() };
        assert!(sequencer.update(&observables, &fired_before).is_none());

        observables.now_ns = 1_500;
        let actions = sequencer.update(&observables, &fired_before);
        assert!(actions.is_some());
        assert!(sequencer.fired);

        assert!(sequencer.update(&observables, &fired_before).is_none(), "already fired");
    }

    #[test]
    fn nz_crossing_requires_a_previous_sample() {
        let mut trigger = Trigger::new(TriggerKind::NzCrossing(3.0));
        let fired = HashSet::new();
        let observables_a = SequencerObservables { nz: 1.0, ..Default::default() };
        assert!(!trigger.evaluate(&observables_a, &fired), "first sample only establishes baseline");

        let observables_b = SequencerObservables { nz: 5.0, ..Default::default() };
        assert!(trigger.evaluate(&observables_b, &fired), "crossed from below to above threshold");
    }

    #[test]
    fn all_triggers_must_be_satisfied_to_fire() {
        let mut sequencer = Sequencer::new("gear_up");
        sequencer.triggers.push(Trigger::new(TriggerKind::AltitudeAbove(100.0)));
        sequencer.triggers.push(Trigger::new(TriggerKind::SpeedAbove(50.0)));

        let fired = HashSet::new();
        let observables = SequencerObservables { altitude_m: 200.0, speed_m_s: 10.0, ..Default::default() };
        assert!(sequencer.update(&observables, &fired).is_none());
    }

    #[test]
    fn pending_event_times_returns_sorted_union_within_horizon() {
        let mut a = Sequencer::new("a");
        a.triggers.push(Trigger::new(TriggerKind::Timer { fire_at_ns: 5_000 }));
        let mut b = Sequencer::new("b");
        b.triggers.push(Trigger::new(TriggerKind::Timer { fire_at_ns: 1_000 }));

        let times = pending_event_times(&[a, b], 0, 10_000);
        assert_eq!(times, vec![1_000, 5_000]);
    }
}
