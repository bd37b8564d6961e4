//! # Tally
//!
//! Formula language for stats, attributes and tier tables.
//!
//! Designers write formulas as text mixing arithmetic with bracketed
//! clauses that read game state:
//!
//! ```text
//! this[value] + stat[strength] * 2 - stat:other[armor]
//! max[1, dice[2, 6] + local[bonus]]
//! table[stat[experience]]
//! ```
//!
//! A formula is parsed once into an expression tree. Calculating it resolves
//! every clause against a [`FormulaContext`] (the origin actor, and
//! optionally a target), then folds the remaining arithmetic.
//!
//! - **Soft lookups**: missing stats, attributes and variables read as `0`
//!   and log a warning.
//! - **Sentinel on failure**: malformed formulas, division by zero and
//!   runaway recursion make the infallible entry points return
//!   [`SENTINEL`] (`-1`), so a bad formula never stops the game.
//! - **Bounded**: parsing caps nesting and size, and clauses and derived
//!   stats nest at most [`FormulaConfig::max_depth`] levels per calculation,
//!   so self-referential stats read as the sentinel.
//! - **Deterministic when seeded**: random clauses draw from a per-call
//!   `ChaCha8` RNG.
//!
//! ## Quick Start
//!
//! ```rust
//! use tally::{AttrDef, Formula, StatDef, StatsSheet};
//!
//! let hero = StatsSheet::new()
//!     .with_stat("strength", StatDef::new(14.0))
//!     .with_stat("max_health", StatDef::new(60.0))
//!     .with_attr("health", AttrDef::new("max_health"));
//!
//! let damage = Formula::parse("this[value] + stat[strength] / 2").unwrap();
//! assert_eq!(damage.calculate(3.0, &hero, None), 10.0);
//!
//! // Bad input never panics.
//! assert_eq!(tally::calculate("stat[strength", 0.0, &hero, None), tally::SENTINEL);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod clause;
pub mod context;
pub mod error;
pub mod formula;
pub mod sheet;
pub mod syntax;
pub mod table;
pub mod vars;

// Re-exports for convenience
pub use clause::Clause;
pub use context::{EmptyContext, Evaluation, FormulaConfig, FormulaContext, Scope};
pub use error::{FormulaError, FormulaResult};
pub use formula::{calculate, evaluate, rewrite, Formula, SENTINEL};
pub use sheet::{AttrDef, SheetDef, StatDef, StatModifier, StatsSheet};
pub use syntax::{check_brackets, BinaryOp, Expr};
pub use table::Table;
pub use vars::{Value, Variables};
