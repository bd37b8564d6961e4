//! Evaluation contexts and per-call evaluation state.
//!
//! A formula reads the world through [`FormulaContext`]: the origin (the
//! actor whose value is being computed) and optionally a target (the other
//! side of an interaction, read by the `:other` clauses).
//!
//! All mutable evaluation state lives in an [`Evaluation`] created for each
//! top-level calculation: the depth counter that bounds runaway recursion,
//! and the RNG used by random clauses. Nothing is shared between
//! calculations, so any number of them can run concurrently.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{FormulaError, FormulaResult};
use crate::vars::Value;

/// Default bound on clause and derived-stat nesting in one calculation.
pub const DEFAULT_MAX_DEPTH: u32 = 500;

/// Configuration for formula evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormulaConfig {
    /// How deeply clauses and derived stats may nest within one top-level
    /// calculation, counting nested formulas reached through contexts.
    #[serde(alias = "max_iterations")]
    pub max_depth: u32,
    /// Seed for random clauses. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for FormulaConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            seed: None,
        }
    }
}

impl FormulaConfig {
    /// Config with a fixed RNG seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Returns a copy with a different depth bound.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Mutable state of one top-level calculation.
#[derive(Debug, Clone)]
pub struct Evaluation {
    max_depth: u32,
    depth: u32,
    rng: ChaCha8Rng,
}

impl Evaluation {
    /// Creates evaluation state from a config.
    #[must_use]
    pub fn new(config: &FormulaConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            max_depth: config.max_depth,
            depth: 0,
            rng,
        }
    }

    /// Creates evaluation state with a fixed seed and the default bound.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(&FormulaConfig::seeded(seed))
    }

    /// Enters one level of clause or derived-stat nesting.
    ///
    /// Every successful call must be paired with [`Evaluation::leave`].
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError::DepthLimit`] when the new level would exceed
    /// the bound. The depth is left unchanged in that case.
    pub fn enter(&mut self) -> FormulaResult<()> {
        if self.depth >= self.max_depth {
            return Err(FormulaError::DepthLimit(self.max_depth));
        }
        self.depth += 1;
        Ok(())
    }

    /// Leaves a level entered with [`Evaluation::enter`].
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Current nesting depth.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// RNG for random clauses.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}

impl Default for Evaluation {
    fn default() -> Self {
        Self::new(&FormulaConfig::default())
    }
}

/// Source of stats, attributes and variables for formulas.
///
/// Lookups fail soft: a missing name returns `Ok(None)` or `None`, and the
/// evaluator substitutes zero after logging a warning. `stat` and `attr`
/// receive the current [`Evaluation`] so that contexts which derive values
/// from further formulas evaluate them under the same depth bound; such
/// contexts propagate the resulting errors.
pub trait FormulaContext {
    /// Value of a stat.
    ///
    /// # Errors
    ///
    /// Errors from evaluating a derived stat's own formula.
    fn stat(&self, name: &str, evaluation: &mut Evaluation) -> FormulaResult<Option<f64>>;

    /// Value of an attribute.
    ///
    /// # Errors
    ///
    /// Errors from evaluating the formula of the stat that bounds it.
    fn attr(&self, name: &str, evaluation: &mut Evaluation) -> FormulaResult<Option<f64>>;

    /// Value of a local variable.
    fn local_var(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Value of a global variable.
    fn global_var(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// Context with no stats, attributes or variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyContext;

impl FormulaContext for EmptyContext {
    fn stat(&self, _name: &str, _evaluation: &mut Evaluation) -> FormulaResult<Option<f64>> {
        Ok(None)
    }

    fn attr(&self, _name: &str, _evaluation: &mut Evaluation) -> FormulaResult<Option<f64>> {
        Ok(None)
    }
}

/// Inputs to one calculation.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    /// Value read by `this[value]`.
    pub base: f64,
    /// The actor whose value is computed.
    pub origin: &'a dyn FormulaContext,
    /// The other side of an interaction, read by `:other` clauses.
    pub target: Option<&'a dyn FormulaContext>,
}

impl<'a> Scope<'a> {
    /// Creates a scope without a target.
    #[must_use]
    pub fn new(base: f64, origin: &'a dyn FormulaContext) -> Self {
        Self {
            base,
            origin,
            target: None,
        }
    }

    /// Returns a copy with a target.
    #[must_use]
    pub fn with_target(mut self, target: &'a dyn FormulaContext) -> Self {
        self.target = Some(target);
        self
    }
}

impl std::fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("base", &self.base)
            .field("has_target", &self.target.is_some())
            .finish()
    }
}
