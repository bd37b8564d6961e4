//! Combo resolver: walks a [`ComboTree`] as timed inputs arrive.
//!
//! The resolver is either idle (at the root, no attack) or holding an
//! attack it selected earlier. Each [`select`](ComboResolver::select) call
//! tries to advance one key deeper and pick the first enabled candidate
//! whose condition holds.
//!
//! # Gating
//!
//! - During anticipation and active phases inputs are ignored.
//! - Once the held attack's clip is over but before
//!   [`update`](ComboResolver::update) has released it, a busy actor cannot
//!   chain. An actor holding nothing may always start.
//!
//! # Walk Position
//!
//! - Inputs continue from the current node while an attack is held, and from
//!   the root otherwise.
//! - A key with no child leaves the whole state untouched.
//! - Reaching a node whose candidates all fail still moves the walk there,
//!   but holds no attack, so the next input starts again from the root.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use riposte_core::actor::ActorState;
//! use riposte_core::clock::ManualClock;
//! use riposte_core::key::ComboKey::A;
//! use riposte_core::resolver::ComboResolver;
//! use riposte_core::timing::{AttackTiming, Phase, PhaseCurve};
//! use riposte_core::tree::{ComboDefinition, ComboTree};
//!
//! let timing = AttackTiming::new(1.0, PhaseCurve::new(0.2, 0.5));
//! let tree = ComboTree::build(vec![
//!     ComboDefinition::new(vec![A], "slash").with_timing(timing.clone()),
//!     ComboDefinition::new(vec![A, A], "backhand").with_timing(timing),
//! ])
//! .unwrap();
//!
//! let clock = Arc::new(ManualClock::new(0.0));
//! let mut resolver = ComboResolver::new(tree, clock.clone());
//! let actor = ActorState::new();
//!
//! assert_eq!(resolver.select(A, &actor), Some(&"slash"));
//! clock.set(0.3);
//! assert_eq!(resolver.current_phase(), Some(Phase::Active));
//! assert_eq!(resolver.select(A, &actor), None);
//! clock.set(0.6);
//! assert_eq!(resolver.select(A, &actor), Some(&"backhand"));
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::clock::Clock;
use crate::condition::ConditionContext;
use crate::key::{ComboKey, KeySet};
use crate::timing::Phase;
use crate::tree::{Candidate, ComboTree, NodeId};

/// Seconds a block flag stays usable for counters.
pub const DEFAULT_BLOCK_WINDOW: f64 = 0.75;

/// Thresholds used by candidate conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Seconds after a block during which block conditions hold.
    pub block_window: f64,
    /// Largest angle in degrees that still counts as forward.
    pub forward_angle: f32,
    /// Smallest angle in degrees that counts as backwards.
    pub backward_angle: f32,
    /// Speed below which the actor is not running.
    pub min_move_speed: f32,
    /// Stick magnitude below which there is no input.
    pub min_input_magnitude: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            block_window: DEFAULT_BLOCK_WINDOW,
            forward_angle: 20.0,
            backward_angle: 160.0,
            min_move_speed: 0.1,
            min_input_magnitude: 0.1,
        }
    }
}

impl ResolverConfig {
    /// Returns a copy with a different block window.
    #[must_use]
    pub fn with_block_window(mut self, block_window: f64) -> Self {
        self.block_window = block_window;
        self
    }

    /// Returns a copy with different direction thresholds.
    #[must_use]
    pub fn with_angles(mut self, forward_angle: f32, backward_angle: f32) -> Self {
        self.forward_angle = forward_angle;
        self.backward_angle = backward_angle;
        self
    }
}

/// Comparable snapshot of a resolver's walk state.
///
/// Block stamps are not part of the walk: they outlive [`ComboResolver::stop`]
/// and are read through [`ComboResolver::is_blocking`] and
/// [`ComboResolver::is_perfect_blocking`]. A stopped resolver's state equals
/// a freshly built one's.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolverState {
    /// Position in the tree.
    pub node: NodeId,
    /// Index of the held candidate at `node`.
    pub active: Option<usize>,
    /// When the held attack started.
    pub attack_start: Option<f64>,
}

/// Per-actor combo state machine.
pub struct ComboResolver<P> {
    tree: ComboTree<P>,
    config: ResolverConfig,
    clock: Arc<dyn Clock>,
    node: NodeId,
    active: Option<usize>,
    attack_start: Option<f64>,
    block: Option<f64>,
    perfect_block: Option<f64>,
}

impl<P> ComboResolver<P> {
    /// Creates an idle resolver with the default config.
    pub fn new(tree: ComboTree<P>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tree,
            config: ResolverConfig::default(),
            clock,
            node: NodeId::ROOT,
            active: None,
            attack_start: None,
            block: None,
            perfect_block: None,
        }
    }

    /// Returns the resolver with a different config.
    #[must_use]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Current time of the resolver's clock.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Phase of the held attack, or `None` when not attacking.
    ///
    /// Also `None` for untimed attacks and once the clip is over.
    #[must_use]
    pub fn current_phase(&self) -> Option<Phase> {
        self.phase_at(self.clock.now())
    }

    fn phase_at(&self, now: f64) -> Option<Phase> {
        let timing = self.active_candidate()?.timing.as_ref()?;
        let start = self.attack_start?;
        timing.phase_at(now - start)
    }

    /// Tries to advance the combo with `key`.
    ///
    /// Returns the selected attack, or `None` when the input is gated, has
    /// no continuation, or no candidate matches.
    pub fn select(&mut self, key: ComboKey, actor: &dyn Actor) -> Option<&P> {
        let now = self.clock.now();
        match self.phase_at(now) {
            Some(phase) if !phase.is_cancellable() => {
                tracing::debug!(%key, ?phase, "input ignored during uncancellable phase");
                return None;
            }
            None if self.active.is_some() && actor.is_busy() => {
                tracing::debug!(%key, "input ignored while busy after attack");
                return None;
            }
            _ => {}
        }

        let origin = self.origin();
        let Some(next) = self.tree.try_child(origin, key) else {
            tracing::debug!(%key, node = ?origin, "no combo continues with key");
            return None;
        };

        let ctx = ConditionContext {
            actor,
            config: &self.config,
            now,
            block: self.block,
            perfect_block: self.perfect_block,
        };
        let chosen = self
            .tree
            .candidates(next)
            .iter()
            .position(|candidate| candidate.enabled && candidate.condition.matches(&ctx));

        self.node = next;
        self.attack_start = Some(now);
        self.active = chosen;
        self.block = None;
        self.perfect_block = None;

        match chosen {
            Some(index) => {
                tracing::debug!(%key, node = ?next, candidate = index, "combo advanced");
                self.tree.candidates(next).get(index).map(|c| &c.attack)
            }
            None => {
                tracing::debug!(%key, node = ?next, "combo advanced without a matching candidate");
                None
            }
        }
    }

    /// Returns to idle: root position, no attack, no start time.
    ///
    /// Block flags are kept so a counter can follow a block made while idle.
    pub fn stop(&mut self) {
        if !self.is_idle() {
            tracing::debug!(node = ?self.node, "combo stopped");
        }
        self.node = NodeId::ROOT;
        self.active = None;
        self.attack_start = None;
    }

    /// Releases the held attack once its clip is over.
    ///
    /// Untimed attacks are released on the first update after selection.
    /// Returns whether the resolver stopped.
    pub fn update(&mut self) -> bool {
        let Some(candidate) = self.active_candidate() else {
            return false;
        };
        let elapsed = self.attack_start.map_or(0.0, |start| self.clock.now() - start);
        let expired = candidate
            .timing
            .as_ref()
            .map_or(true, |timing| timing.is_expired(elapsed));
        if expired {
            tracing::debug!(elapsed, "combo timed out");
            self.stop();
        }
        expired
    }

    /// Flags a regular block at the current time.
    pub fn on_block(&mut self) {
        let now = self.clock.now();
        tracing::debug!(at = now, "block flagged");
        self.block = Some(now);
    }

    /// Flags a perfect block at the current time.
    pub fn on_perfect_block(&mut self) {
        let now = self.clock.now();
        tracing::debug!(at = now, "perfect block flagged");
        self.perfect_block = Some(now);
    }

    /// Whether a regular block happened within the block window.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.flag_active(self.block)
    }

    /// Whether a perfect block happened within the block window.
    #[must_use]
    pub fn is_perfect_blocking(&self) -> bool {
        self.flag_active(self.perfect_block)
    }

    fn flag_active(&self, stamp: Option<f64>) -> bool {
        stamp.is_some_and(|at| self.clock.now() - at <= self.config.block_window)
    }

    fn origin(&self) -> NodeId {
        if self.active.is_some() {
            self.node
        } else {
            NodeId::ROOT
        }
    }

    /// Whether the resolver is at the root holding nothing.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.node == NodeId::ROOT && self.active.is_none()
    }

    /// Current position in the tree.
    #[must_use]
    pub fn current_node(&self) -> NodeId {
        self.node
    }

    /// The held candidate.
    #[must_use]
    pub fn active_candidate(&self) -> Option<&Candidate<P>> {
        self.tree.candidates(self.node).get(self.active?)
    }

    /// The held attack.
    #[must_use]
    pub fn active(&self) -> Option<&P> {
        self.active_candidate().map(|c| &c.attack)
    }

    /// When the current attack started, or `None` when idle.
    #[must_use]
    pub fn attack_start(&self) -> Option<f64> {
        self.attack_start
    }

    /// Keys the next [`select`](Self::select) could follow, ignoring gating.
    #[must_use]
    pub fn next_keys(&self) -> KeySet {
        self.tree.next_keys(self.origin())
    }

    /// The combo tree.
    #[must_use]
    pub fn tree(&self) -> &ComboTree<P> {
        &self.tree
    }

    /// Mutable combo tree, for toggling candidates.
    pub fn tree_mut(&mut self) -> &mut ComboTree<P> {
        &mut self.tree
    }

    /// Swaps in a new tree, e.g. on weapon switch, and stops.
    pub fn rebuild(&mut self, tree: ComboTree<P>) {
        self.tree = tree;
        self.stop();
    }

    /// The resolver's config.
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Snapshot of the walk state, without block stamps.
    #[must_use]
    pub fn state(&self) -> ResolverState {
        ResolverState {
            node: self.node,
            active: self.active,
            attack_start: self.attack_start,
        }
    }
}

impl<P: std::fmt::Debug> std::fmt::Debug for ComboResolver<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComboResolver")
            .field("state", &self.state())
            .field("active", &self.active())
            .finish_non_exhaustive()
    }
}
