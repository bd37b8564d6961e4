//! Determinism verification tests.
//!
//! Two resolvers built from the same table and driven by the same script,
//! with identical synthetic timestamps, must select identical attacks at
//! every step. The same scripts also check phase gating and `stop`.

use proptest::prelude::*;

use crate::actor::ActorState;
use crate::condition::Condition;
use crate::key::ComboKey;
use crate::resolver::ResolverState;
use crate::timing::{AttackTiming, Phase, PhaseCurve};
use crate::tree::ComboDefinition;

use super::helpers::build_resolver;

// =============================================================================
// Strategies
// =============================================================================

/// One scripted event.
#[derive(Debug, Clone)]
enum Step {
    Select {
        key: ComboKey,
        airborne: bool,
        busy: bool,
    },
    Advance(f64),
    Update,
    Stop,
    Block,
    PerfectBlock,
}

fn key() -> impl Strategy<Value = ComboKey> {
    // Few keys so that scripts actually walk deep
    prop::sample::select(vec![ComboKey::A, ComboKey::B, ComboKey::C])
}

fn condition() -> impl Strategy<Value = Condition> {
    prop::sample::select(vec![
        Condition::None,
        Condition::OnAir,
        Condition::AfterBlock,
        Condition::AfterPerfectBlock,
    ])
}

fn timing() -> impl Strategy<Value = Option<AttackTiming>> {
    prop::option::weighted(
        0.8,
        (0.2f64..2.0, 0.0f64..0.5, 0.0f64..0.5).prop_map(|(clip, active, span)| {
            AttackTiming::new(clip, PhaseCurve::new(active, active + span))
        }),
    )
}

fn definition() -> impl Strategy<Value = (Vec<ComboKey>, Condition, bool, Option<AttackTiming>)> {
    (
        prop::collection::vec(key(), 1..4),
        condition(),
        prop::bool::weighted(0.9),
        timing(),
    )
}

fn table() -> impl Strategy<Value = Vec<ComboDefinition<usize>>> {
    prop::collection::vec(definition(), 1..12).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(index, (keys, condition, enabled, timing))| ComboDefinition {
                keys,
                condition,
                enabled,
                timing,
                attack: index,
            })
            .collect()
    })
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (key(), prop::bool::weighted(0.2), prop::bool::weighted(0.2))
            .prop_map(|(key, airborne, busy)| Step::Select { key, airborne, busy }),
        3 => (0.0f64..0.8).prop_map(Step::Advance),
        2 => Just(Step::Update),
        1 => Just(Step::Stop),
        1 => Just(Step::Block),
        1 => Just(Step::PerfectBlock),
    ]
}

fn script() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(step(), 0..48)
}

// =============================================================================
// Runner
// =============================================================================

/// Observable result of one step.
#[derive(Debug, Clone, PartialEq)]
struct Observation {
    selected: Option<usize>,
    phase: Option<Phase>,
    state: ResolverState,
    blocking: bool,
    perfect_blocking: bool,
}

/// Runs `script` against a fresh resolver, checking gating along the way.
fn run(definitions: Vec<ComboDefinition<usize>>, script: &[Step]) -> Vec<Observation> {
    let (mut resolver, clock) = build_resolver(definitions);
    let mut observations = Vec::with_capacity(script.len());

    for step in script {
        let mut selected = None;
        match step {
            Step::Select { key, airborne, busy } => {
                let mut actor = ActorState::new().busy(*busy);
                if *airborne {
                    actor = actor.airborne();
                }
                let before = resolver.state();
                let gated = resolver
                    .current_phase()
                    .is_some_and(|phase| !phase.is_cancellable());
                selected = resolver.select(*key, &actor).copied();
                if gated {
                    assert_eq!(selected, None, "selected during uncancellable phase");
                    assert_eq!(resolver.state(), before, "state changed while gated");
                }
            }
            Step::Advance(dt) => {
                clock.advance(*dt);
            }
            Step::Update => {
                resolver.update();
            }
            Step::Stop => resolver.stop(),
            Step::Block => resolver.on_block(),
            Step::PerfectBlock => resolver.on_perfect_block(),
        }
        observations.push(Observation {
            selected,
            phase: resolver.current_phase(),
            state: resolver.state(),
            blocking: resolver.is_blocking(),
            perfect_blocking: resolver.is_perfect_blocking(),
        });
    }
    observations
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn lockstep_resolvers_agree(definitions in table(), script in script()) {
        let first = run(definitions.clone(), &script);
        let second = run(definitions, &script);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn selections_come_from_the_reached_node(definitions in table(), script in script()) {
        let (mut resolver, clock) = build_resolver(definitions.clone());
        for step in &script {
            match step {
                Step::Select { key, airborne, busy } => {
                    let mut actor = ActorState::new().busy(*busy);
                    if *airborne {
                        actor = actor.airborne();
                    }
                    if let Some(&index) = resolver.select(*key, &actor) {
                        let path = resolver.tree().path(resolver.current_node());
                        prop_assert_eq!(&path, &definitions[index].keys);
                        prop_assert!(definitions[index].enabled);
                    }
                }
                Step::Advance(dt) => {
                    clock.advance(*dt);
                }
                Step::Update => {
                    resolver.update();
                }
                Step::Stop => resolver.stop(),
                Step::Block => resolver.on_block(),
                Step::PerfectBlock => resolver.on_perfect_block(),
            }
        }
    }

    #[test]
    fn stop_is_idempotent(definitions in table(), script in script()) {
        let (mut resolver, clock) = build_resolver(definitions);
        let fresh = resolver.state();
        for step in &script {
            match step {
                Step::Select { key, .. } => {
                    resolver.select(*key, &ActorState::new());
                }
                Step::Advance(dt) => {
                    clock.advance(*dt);
                }
                Step::Block => resolver.on_block(),
                Step::PerfectBlock => resolver.on_perfect_block(),
                Step::Update | Step::Stop => {}
            }
        }
        resolver.stop();
        let once = resolver.state();
        resolver.stop();
        prop_assert_eq!(resolver.state(), once);
        prop_assert_eq!(once, fresh);
        prop_assert!(resolver.is_idle());
        prop_assert_eq!(resolver.current_phase(), None);
    }

    #[test]
    fn update_after_clip_returns_to_idle(
        clip in 0.1f64..5.0,
        start in 0.0f64..100.0,
        epsilon in 1e-3f64..1.0,
    ) {
        let timing = AttackTiming::new(clip, PhaseCurve::new(0.3, 0.6));
        let (mut resolver, clock) = build_resolver(vec![
            ComboDefinition::new(vec![ComboKey::A], 0usize).with_timing(timing),
        ]);
        clock.set(start);
        prop_assert_eq!(resolver.select(ComboKey::A, &ActorState::new()), Some(&0));

        clock.set(start + clip * 0.5);
        prop_assert!(!resolver.update());
        prop_assert!(!resolver.is_idle());

        clock.set(start + clip + epsilon);
        prop_assert!(resolver.update());
        prop_assert!(resolver.is_idle());
        prop_assert_eq!(resolver.attack_start(), None);
    }
}
