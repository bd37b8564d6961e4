//! Stat sheets: stats, attributes and local variables of one actor.
//!
//! A [`StatsSheet`] is the standard [`FormulaContext`]. Stats have a base
//! value and an optional formula over it (`this[value]` reads the base), and
//! are adjusted by flat and percentage modifiers. Attributes are current
//! values bounded by a stat, such as health bounded by `max_health`.
//!
//! Stats are computed on demand. Derived stats evaluate their formula under
//! the caller's [`Evaluation`], so chains of stats that refer to each other
//! share one depth bound and a cycle ends in
//! [`FormulaError::DepthLimit`](crate::FormulaError::DepthLimit)
//! instead of overflowing the stack.
//!
//! # Example
//!
//! ```
//! use tally::{AttrDef, Formula, StatDef, StatsSheet};
//!
//! let mut sheet = StatsSheet::new()
//!     .with_stat("vitality", StatDef::new(10.0))
//!     .with_stat(
//!         "max_health",
//!         StatDef::derived(50.0, Formula::parse("this[value] + stat[vitality] * 5").unwrap()),
//!     )
//!     .with_attr("health", AttrDef::new("max_health"));
//!
//! assert_eq!(sheet.stat_value("max_health"), 100.0);
//! assert_eq!(sheet.attr_value("health"), 100.0);
//!
//! sheet.add_attr("health", -30.0);
//! assert_eq!(sheet.attr_value("health"), 70.0);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::context::{Evaluation, FormulaConfig, FormulaContext, Scope};
use crate::error::FormulaResult;
use crate::formula::{Formula, SENTINEL};
use crate::vars::{Value, Variables};

// =============================================================================
// Definitions
// =============================================================================

/// Definition of a stat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatDef {
    /// Base value, read by `this[value]` in the stat's formula.
    pub base: f64,
    /// Formula deriving the stat from its base and other values.
    #[serde(default)]
    pub formula: Option<Formula>,
}

impl StatDef {
    /// A plain stat with a fixed base value.
    #[must_use]
    pub fn new(base: f64) -> Self {
        Self {
            base,
            formula: None,
        }
    }

    /// A stat derived by a formula.
    #[must_use]
    pub fn derived(base: f64, formula: Formula) -> Self {
        Self {
            base,
            formula: Some(formula),
        }
    }
}

/// A temporary adjustment to a stat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatModifier {
    /// Added to the stat's computed value.
    Flat(f64),
    /// Percentage applied after all flat modifiers; `25.0` means +25%.
    Percent(f64),
}

/// Definition of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrDef {
    /// Lowest value the attribute can take.
    #[serde(default)]
    pub min: f64,
    /// Stat bounding the attribute from above.
    pub max_stat: String,
    /// Starting value as a fraction of the maximum.
    #[serde(default = "AttrDef::full")]
    pub start_percent: f64,
}

impl AttrDef {
    /// An attribute starting full, bounded by `max_stat`.
    #[must_use]
    pub fn new(max_stat: impl Into<String>) -> Self {
        Self {
            min: 0.0,
            max_stat: max_stat.into(),
            start_percent: Self::full(),
        }
    }

    /// Returns a copy starting at a different fraction of the maximum.
    #[must_use]
    pub fn starting_at(mut self, start_percent: f64) -> Self {
        self.start_percent = start_percent;
        self
    }

    fn full() -> f64 {
        1.0
    }
}

/// Serializable description of a sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetDef {
    /// Stats by name.
    pub stats: BTreeMap<String, StatDef>,
    /// Attributes by name.
    pub attrs: BTreeMap<String, AttrDef>,
    /// Initial local variables.
    pub locals: Variables,
}

// =============================================================================
// Sheet
// =============================================================================

/// Stats, attributes and variables of one actor.
#[derive(Debug, Clone, Default)]
pub struct StatsSheet {
    stats: BTreeMap<String, StatDef>,
    modifiers: BTreeMap<String, Vec<StatModifier>>,
    attrs: BTreeMap<String, AttrDef>,
    attr_values: BTreeMap<String, f64>,
    locals: Variables,
    globals: Arc<Variables>,
    config: FormulaConfig,
}

impl StatsSheet {
    /// Creates an empty sheet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sheet from a definition.
    #[must_use]
    pub fn from_def(def: SheetDef) -> Self {
        Self {
            stats: def.stats,
            attrs: def.attrs,
            locals: def.locals,
            ..Self::default()
        }
    }

    /// Adds or replaces a stat.
    #[must_use]
    pub fn with_stat(mut self, name: impl Into<String>, def: StatDef) -> Self {
        self.stats.insert(name.into(), def);
        self
    }

    /// Adds or replaces an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, def: AttrDef) -> Self {
        self.attrs.insert(name.into(), def);
        self
    }

    /// Shares a session's global variables with this sheet.
    #[must_use]
    pub fn with_globals(mut self, globals: Arc<Variables>) -> Self {
        self.globals = globals;
        self
    }

    /// Sets the evaluation config used by the convenience readers.
    #[must_use]
    pub fn with_config(mut self, config: FormulaConfig) -> Self {
        self.config = config;
        self
    }

    /// Local variables.
    #[must_use]
    pub fn locals(&self) -> &Variables {
        &self.locals
    }

    /// Mutable local variables.
    pub fn locals_mut(&mut self) -> &mut Variables {
        &mut self.locals
    }

    /// Adds a modifier to a stat. Returns `false` if the stat does not exist.
    pub fn add_modifier(&mut self, stat: &str, modifier: StatModifier) -> bool {
        if !self.stats.contains_key(stat) {
            tracing::warn!(stat, "modifier added to unknown stat, ignoring");
            return false;
        }
        self.modifiers
            .entry(stat.to_string())
            .or_default()
            .push(modifier);
        true
    }

    /// Removes all modifiers from a stat.
    pub fn clear_modifiers(&mut self, stat: &str) {
        self.modifiers.remove(stat);
    }

    /// Computed value of a stat.
    ///
    /// Unknown stats read `0`; stats whose formula fails read [`SENTINEL`].
    /// Both cases are logged.
    #[must_use]
    pub fn stat_value(&self, name: &str) -> f64 {
        let mut evaluation = Evaluation::new(&self.config);
        match self.stat(name, &mut evaluation) {
            Ok(Some(value)) => value,
            Ok(None) => {
                tracing::warn!(stat = name, "unknown stat, using 0");
                0.0
            }
            Err(err) => {
                tracing::warn!(stat = name, error = %err, "stat formula failed, using sentinel");
                SENTINEL
            }
        }
    }

    /// Current value of an attribute, clamped to its bounds.
    #[must_use]
    pub fn attr_value(&self, name: &str) -> f64 {
        let mut evaluation = Evaluation::new(&self.config);
        match self.attr(name, &mut evaluation) {
            Ok(Some(value)) => value,
            Ok(None) => {
                tracing::warn!(attr = name, "unknown attribute, using 0");
                0.0
            }
            Err(err) => {
                tracing::warn!(attr = name, error = %err, "attribute bound failed, using sentinel");
                SENTINEL
            }
        }
    }

    /// Attribute value as a fraction of its range, in `[0, 1]`.
    #[must_use]
    pub fn attr_percent(&self, name: &str) -> f64 {
        let Some(def) = self.attrs.get(name) else {
            return 0.0;
        };
        let max = self.stat_value(&def.max_stat);
        if max <= def.min {
            return 0.0;
        }
        ((self.attr_value(name) - def.min) / (max - def.min)).clamp(0.0, 1.0)
    }

    /// Sets an attribute. Returns the stored value after clamping, or `None`
    /// if the attribute does not exist.
    pub fn set_attr(&mut self, name: &str, value: f64) -> Option<f64> {
        if !self.attrs.contains_key(name) {
            tracing::warn!(attr = name, "set on unknown attribute, ignoring");
            return None;
        }
        self.attr_values.insert(name.to_string(), value);
        let clamped = self.attr_value(name);
        self.attr_values.insert(name.to_string(), clamped);
        Some(clamped)
    }

    /// Adds `delta` to an attribute, returning the new clamped value.
    pub fn add_attr(&mut self, name: &str, delta: f64) -> Option<f64> {
        let current = self.attrs.contains_key(name).then(|| self.attr_value(name))?;
        self.set_attr(name, current + delta)
    }

    /// Values of all stats, computed in parallel.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        self.stats
            .par_iter()
            .map(|(name, _)| (name.clone(), self.stat_value(name)))
            .collect()
    }

    fn apply_modifiers(&self, name: &str, value: f64) -> f64 {
        let Some(modifiers) = self.modifiers.get(name) else {
            return value;
        };
        let (flat, percent) = modifiers
            .iter()
            .fold((0.0, 0.0), |(flat, percent), modifier| match modifier {
                StatModifier::Flat(v) => (flat + v, percent),
                StatModifier::Percent(v) => (flat, percent + v),
            });
        (value + flat) * (1.0 + percent / 100.0)
    }
}

impl FormulaContext for StatsSheet {
    fn stat(&self, name: &str, evaluation: &mut Evaluation) -> FormulaResult<Option<f64>> {
        let Some(def) = self.stats.get(name) else {
            return Ok(None);
        };
        let raw = match &def.formula {
            Some(formula) => {
                evaluation.enter()?;
                let raw = formula.try_calculate(&Scope::new(def.base, self), evaluation);
                evaluation.leave();
                raw?
            }
            None => def.base,
        };
        Ok(Some(self.apply_modifiers(name, raw)))
    }

    fn attr(&self, name: &str, evaluation: &mut Evaluation) -> FormulaResult<Option<f64>> {
        let Some(def) = self.attrs.get(name) else {
            return Ok(None);
        };
        let max = self.stat(&def.max_stat, evaluation)?.unwrap_or_else(|| {
            tracing::warn!(attr = name, stat = %def.max_stat, "attribute bound stat missing, using 0");
            0.0
        });
        let upper = max.max(def.min);
        let value = self
            .attr_values
            .get(name)
            .copied()
            .unwrap_or(def.start_percent * max);
        Ok(Some(value.clamp(def.min, upper)))
    }

    fn local_var(&self, name: &str) -> Option<Value> {
        self.locals.get(name).cloned()
    }

    fn global_var(&self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }
}
