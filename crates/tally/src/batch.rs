//! Parallel evaluation of many formulas against one context.
//!
//! Each formula runs under its own [`Evaluation`]. When the config carries a
//! seed, formula `i` is seeded with `seed + i`, so random clauses produce the
//! same results regardless of how rayon schedules the work.

use rayon::prelude::*;

use crate::context::{Evaluation, FormulaConfig, FormulaContext, Scope};
use crate::formula::Formula;

/// Calculates every formula in parallel, in input order.
///
/// Failed formulas produce [`SENTINEL`](crate::SENTINEL), as with
/// [`Formula::calculate`].
///
/// # Example
///
/// ```
/// use tally::{batch, EmptyContext, Formula, FormulaConfig};
///
/// let formulas = vec![
///     Formula::parse("this[value] + 1").unwrap(),
///     Formula::parse("this[value] * 3").unwrap(),
/// ];
/// let values = batch::calculate_many(&formulas, 2.0, &EmptyContext, None, &FormulaConfig::seeded(1));
/// assert_eq!(values, vec![3.0, 6.0]);
/// ```
#[must_use]
pub fn calculate_many(
    formulas: &[Formula],
    base: f64,
    origin: &(dyn FormulaContext + Sync),
    target: Option<&(dyn FormulaContext + Sync)>,
    config: &FormulaConfig,
) -> Vec<f64> {
    formulas
        .par_iter()
        .enumerate()
        .map(|(index, formula)| {
            let config = FormulaConfig {
                seed: config.seed.map(|seed| seed.wrapping_add(index as u64)),
                ..config.clone()
            };
            let mut evaluation = Evaluation::new(&config);
            let scope = Scope {
                base,
                origin,
                target: target.map(|t| t as &dyn FormulaContext),
            };
            formula.calculate_with(&scope, &mut evaluation)
        })
        .collect()
}
