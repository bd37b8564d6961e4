//! Attack timing: clip durations and phase curves.
//!
//! An attack's timeline is split into three phases. The resolver only asks
//! "which phase is the active attack in right now", which is answered by
//! evaluating a [`PhaseCurve`] at the normalized elapsed time.
//!
//! ```
//! use riposte_core::timing::{AttackTiming, Phase, PhaseCurve};
//!
//! let timing = AttackTiming::new(1.2, PhaseCurve::new(0.25, 0.6));
//! assert_eq!(timing.phase_at(0.1), Some(Phase::Anticipation));
//! assert_eq!(timing.phase_at(0.5), Some(Phase::Active));
//! assert_eq!(timing.phase_at(1.0), Some(Phase::Recovery));
//! assert_eq!(timing.phase_at(1.3), None);
//! ```

use serde::{Deserialize, Serialize};

/// Where an attack is in its timeline.
///
/// "Not attacking" is represented as `None` wherever a phase is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Wind-up. Cannot be cancelled into another attack.
    Anticipation = 0,
    /// Hits apply. Cannot be cancelled.
    Active = 1,
    /// Follow-through. Chaining into the next attack is allowed.
    Recovery = 2,
}

impl Phase {
    /// Numeric phase index (0, 1 or 2).
    #[must_use]
    pub const fn index(self) -> i32 {
        self as i32
    }

    /// Phase for a numeric index, if valid.
    #[must_use]
    pub const fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Phase::Anticipation),
            1 => Some(Phase::Active),
            2 => Some(Phase::Recovery),
            _ => None,
        }
    }

    /// Whether a new attack may start during this phase.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Phase::Recovery)
    }
}

/// One step of a phase curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseKey {
    /// Normalized time in `[0, 1]` at which the phase begins.
    pub time: f64,
    /// Phase from `time` until the next key.
    pub phase: Phase,
}

/// Step function from normalized clip time to [`Phase`].
///
/// Keys are kept sorted by time. Evaluating before the first key yields the
/// first key's phase; an empty curve is all anticipation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<PhaseKey>", into = "Vec<PhaseKey>")]
pub struct PhaseCurve {
    keys: Vec<PhaseKey>,
}

impl PhaseCurve {
    /// The usual three-step curve: anticipation from 0, active from
    /// `active_start`, recovery from `recovery_start`.
    ///
    /// Both boundaries are clamped to `[0, 1]` and `recovery_start` is
    /// raised to at least `active_start`.
    #[must_use]
    pub fn new(active_start: f64, recovery_start: f64) -> Self {
        let active_start = active_start.clamp(0.0, 1.0);
        let recovery_start = recovery_start.clamp(active_start, 1.0);
        Self::from_keys([
            (0.0, Phase::Anticipation),
            (active_start, Phase::Active),
            (recovery_start, Phase::Recovery),
        ])
    }

    /// Builds a curve from `(time, phase)` pairs in any order.
    pub fn from_keys(keys: impl IntoIterator<Item = (f64, Phase)>) -> Self {
        keys.into_iter()
            .map(|(time, phase)| PhaseKey { time, phase })
            .collect::<Vec<_>>()
            .into()
    }

    /// The curve's keys, sorted by time.
    #[must_use]
    pub fn keys(&self) -> &[PhaseKey] {
        &self.keys
    }

    /// Phase at normalized time `t`.
    #[must_use]
    pub fn evaluate(&self, t: f64) -> Phase {
        let Some(first) = self.keys.first() else {
            return Phase::Anticipation;
        };
        self.keys
            .iter()
            .take_while(|key| key.time <= t)
            .last()
            .unwrap_or(first)
            .phase
    }
}

impl From<Vec<PhaseKey>> for PhaseCurve {
    fn from(mut keys: Vec<PhaseKey>) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }
}

impl From<PhaseCurve> for Vec<PhaseKey> {
    fn from(curve: PhaseCurve) -> Self {
        curve.keys
    }
}

/// Timing data of one attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackTiming {
    /// Length of the attack clip in seconds.
    pub clip_duration: f64,
    /// Phases over normalized clip time.
    pub phases: PhaseCurve,
}

impl AttackTiming {
    /// Creates timing data.
    #[must_use]
    pub fn new(clip_duration: f64, phases: PhaseCurve) -> Self {
        Self {
            clip_duration,
            phases,
        }
    }

    /// Phase after `elapsed` seconds, or `None` once the clip is over.
    ///
    /// Zero-length clips have no phases at all.
    #[must_use]
    pub fn phase_at(&self, elapsed: f64) -> Option<Phase> {
        if self.clip_duration <= 0.0 || !(0.0..=self.clip_duration).contains(&elapsed) {
            return None;
        }
        Some(self.phases.evaluate(elapsed / self.clip_duration))
    }

    /// Whether `elapsed` seconds run past the end of the clip.
    #[must_use]
    pub fn is_expired(&self, elapsed: f64) -> bool {
        elapsed > self.clip_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_indices_round_trip() {
        for phase in [Phase::Anticipation, Phase::Active, Phase::Recovery] {
            assert_eq!(Phase::from_index(phase.index()), Some(phase));
        }
        assert_eq!(Phase::from_index(-1), None);
        assert!(Phase::Recovery.is_cancellable());
        assert!(!Phase::Active.is_cancellable());
    }

    #[test]
    fn curve_boundaries_are_inclusive() {
        let curve = PhaseCurve::new(0.25, 0.75);
        assert_eq!(curve.evaluate(0.0), Phase::Anticipation);
        assert_eq!(curve.evaluate(0.249), Phase::Anticipation);
        assert_eq!(curve.evaluate(0.25), Phase::Active);
        assert_eq!(curve.evaluate(0.75), Phase::Recovery);
        assert_eq!(curve.evaluate(1.0), Phase::Recovery);
    }

    #[test]
    fn unordered_keys_are_sorted() {
        let curve = PhaseCurve::from_keys([
            (0.8, Phase::Recovery),
            (0.1, Phase::Anticipation),
            (0.4, Phase::Active),
        ]);
        let times: Vec<f64> = curve.keys().iter().map(|k| k.time).collect();
        assert_eq!(times, vec![0.1, 0.4, 0.8]);
        // Before the first key the first phase holds
        assert_eq!(curve.evaluate(0.0), Phase::Anticipation);
    }

    #[test]
    fn new_clamps_inverted_boundaries() {
        let curve = PhaseCurve::new(0.6, 0.2);
        assert_eq!(curve.evaluate(0.5), Phase::Anticipation);
        assert_eq!(curve.evaluate(0.6), Phase::Recovery);
    }

    #[test]
    fn empty_curve_is_anticipation() {
        assert_eq!(PhaseCurve::default().evaluate(0.5), Phase::Anticipation);
    }

    #[test]
    fn phase_at_is_none_outside_the_clip() {
        let timing = AttackTiming::new(2.0, PhaseCurve::new(0.5, 0.5));
        assert_eq!(timing.phase_at(-0.1), None);
        assert_eq!(timing.phase_at(1.0), Some(Phase::Recovery));
        assert_eq!(timing.phase_at(2.0), Some(Phase::Recovery));
        assert_eq!(timing.phase_at(2.01), None);
        assert!(timing.is_expired(2.01));
        assert!(!timing.is_expired(2.0));

        let zero = AttackTiming::new(0.0, PhaseCurve::default());
        assert_eq!(zero.phase_at(0.0), None);
    }

    #[test]
    fn curves_load_from_unsorted_json() {
        let json = r#"{
            "clip_duration": 1.0,
            "phases": [
                {"time": 0.7, "phase": "recovery"},
                {"time": 0.0, "phase": "anticipation"},
                {"time": 0.3, "phase": "active"}
            ]
        }"#;
        let timing: AttackTiming = serde_json::from_str(json).unwrap();
        assert_eq!(timing.phase_at(0.5), Some(Phase::Active));
        assert_eq!(timing.phases.keys()[0].phase, Phase::Anticipation);
    }
}
