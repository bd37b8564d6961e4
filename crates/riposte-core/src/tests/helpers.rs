//! Test helper functions for building trees, resolvers and actors.

use std::sync::{Arc, Once};

use serde::{Deserialize, Serialize};
use tally::Formula;

use crate::clock::ManualClock;
use crate::condition::Condition;
use crate::key::ComboKey::{self, A, B, C};
use crate::resolver::ComboResolver;
use crate::timing::{AttackTiming, PhaseCurve};
use crate::tree::{ComboDefinition, ComboTree};

// =============================================================================
// Logging
// =============================================================================

static TRACING: Once = Once::new();

/// Installs a test-writer subscriber once per test binary.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

// =============================================================================
// Payloads
// =============================================================================

/// Attack payload used by the integration tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attack {
    /// Display name.
    pub name: String,
    /// Damage formula evaluated against the attacker and the target.
    pub damage: Formula,
}

impl Attack {
    /// Creates an attack from a name and a damage formula.
    pub fn new(name: &str, damage: &str) -> Self {
        Self {
            name: name.to_string(),
            damage: Formula::parse(damage).unwrap(),
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// One second clip: anticipation until 0.2, active until 0.5, then recovery.
pub fn standard_timing() -> AttackTiming {
    AttackTiming::new(1.0, PhaseCurve::new(0.2, 0.5))
}

/// A sword moveset exercising chains, branches and conditions.
///
/// - `A`: slash, or plunge while airborne (registered second)
/// - `A A`: backhand
/// - `A A A`: spin finisher
/// - `A B`: thrust
/// - `B`: riposte after a perfect block, then counter after a block, then kick
pub fn sword_moveset() -> Vec<ComboDefinition<&'static str>> {
    let timed = |keys: Vec<ComboKey>, name| {
        ComboDefinition::new(keys, name).with_timing(standard_timing())
    };
    vec![
        timed(vec![A], "slash"),
        timed(vec![A], "plunge").with_condition(Condition::OnAir),
        timed(vec![A, A], "backhand"),
        timed(vec![A, A, A], "spin"),
        timed(vec![A, B], "thrust"),
        timed(vec![B], "riposte").with_condition(Condition::AfterPerfectBlock),
        timed(vec![B], "counter").with_condition(Condition::AfterBlock),
        timed(vec![B], "kick"),
        timed(vec![C], "lunge").with_condition(Condition::RunningForward),
        timed(vec![C], "retreat").with_condition(Condition::RunningBackwards),
    ]
}

/// Builds a resolver over `definitions` with a manual clock at zero.
pub fn build_resolver<P>(
    definitions: Vec<ComboDefinition<P>>,
) -> (ComboResolver<P>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0.0));
    let tree = ComboTree::build(definitions).unwrap();
    (ComboResolver::new(tree, clock.clone()), clock)
}
