//! Formula reduction, rewriting and calculation.
//!
//! Calculating a formula happens in two steps:
//!
//! 1. **Reduce**: every clause is resolved against the [`Scope`] and replaced
//!    by a numeric literal, leaving a tree of pure arithmetic. Clause
//!    arguments are reduced first, so `stat[local[weapon]]` resolves the
//!    variable to a stat name before the stat lookup runs.
//! 2. **Evaluate**: the arithmetic tree is folded to a number.
//!
//! [`Formula::rewrite`] stops after step 1 and renders the arithmetic tree as
//! text; [`evaluate`] performs step 2 on such text. Each clause and each
//! derived stat reached through a lookup enters one level of the
//! [`Evaluation`]'s depth bound.
//!
//! # Example
//!
//! ```
//! use tally::{Formula, Scope, Evaluation, EmptyContext};
//!
//! let formula = Formula::parse("this[value] * 2 + max[1, 3]").unwrap();
//! let ctx = EmptyContext;
//! let mut eval = Evaluation::seeded(0);
//!
//! let scope = Scope::new(10.0, &ctx);
//! assert_eq!(formula.rewrite(&scope, &mut eval).unwrap(), "10*2+3");
//! assert_eq!(formula.calculate(10.0, &ctx, None), 23.0);
//! ```

use std::fmt::Write as _;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::clause::Clause;
use crate::context::{Evaluation, FormulaConfig, FormulaContext, Scope};
use crate::error::{FormulaError, FormulaResult};
use crate::syntax::{self, BinaryOp, Expr};
use crate::table::Table;
use crate::vars::Value;

/// Result of the infallible entry points when a formula cannot be evaluated.
pub const SENTINEL: f64 = -1.0;

/// Upper bound on the number of rolls a single `dice[...]` clause performs.
pub const MAX_DICE_ROLLS: u32 = 1000;

// =============================================================================
// Formula
// =============================================================================

/// A parsed formula, optionally paired with a tier table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FormulaRepr", into = "FormulaRepr")]
pub struct Formula {
    source: String,
    expr: Expr,
    table: Option<Table>,
}

impl Formula {
    /// Parses a formula.
    ///
    /// # Errors
    ///
    /// Any syntax error, see [`syntax::parse`].
    pub fn parse(source: &str) -> FormulaResult<Self> {
        let expr = syntax::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            expr,
            table: None,
        })
    }

    /// Attaches the tier table read by `table[...]` and `table:rise[...]`.
    #[must_use]
    pub fn with_table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }

    /// The formula as written.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed expression.
    #[must_use]
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// The attached tier table.
    #[must_use]
    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    /// Reduces all clauses and renders the remaining arithmetic as text.
    ///
    /// The output contains only digits, `.`, `+ - * /` and parentheses.
    /// Negative numbers are written as `(0-x)`.
    ///
    /// # Errors
    ///
    /// Evaluation errors from clause arguments, nested formulas, or the
    /// depth bound.
    pub fn rewrite(&self, scope: &Scope<'_>, evaluation: &mut Evaluation) -> FormulaResult<String> {
        let reduced = Reducer::new(scope, self.table.as_ref(), evaluation).reduce(&self.expr)?;
        let mut out = String::new();
        render(&reduced, &mut out);
        Ok(out)
    }

    /// Calculates the formula, reporting failures.
    ///
    /// # Errors
    ///
    /// Any evaluation error, including [`FormulaError::DepthLimit`] and
    /// [`FormulaError::DivisionByZero`].
    pub fn try_calculate(
        &self,
        scope: &Scope<'_>,
        evaluation: &mut Evaluation,
    ) -> FormulaResult<f64> {
        let reduced = Reducer::new(scope, self.table.as_ref(), evaluation).reduce(&self.expr)?;
        fold(&reduced)
    }

    /// Calculates the formula under an existing evaluation, returning
    /// [`SENTINEL`] on failure.
    pub fn calculate_with(&self, scope: &Scope<'_>, evaluation: &mut Evaluation) -> f64 {
        match self.try_calculate(scope, evaluation) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(formula = %self.source, error = %err, "formula failed, using sentinel");
                SENTINEL
            }
        }
    }

    /// Calculates the formula with a fresh default [`Evaluation`].
    ///
    /// Failures are logged and produce [`SENTINEL`] so that a badly authored
    /// formula never interrupts gameplay.
    pub fn calculate(
        &self,
        base: f64,
        origin: &dyn FormulaContext,
        target: Option<&dyn FormulaContext>,
    ) -> f64 {
        let scope = Scope {
            base,
            origin,
            target,
        };
        let mut evaluation = Evaluation::new(&FormulaConfig::default());
        self.calculate_with(&scope, &mut evaluation)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum FormulaRepr {
    Plain(String),
    Full {
        expression: String,
        #[serde(default)]
        table: Option<Table>,
    },
}

impl TryFrom<FormulaRepr> for Formula {
    type Error = FormulaError;

    fn try_from(repr: FormulaRepr) -> Result<Self, Self::Error> {
        match repr {
            FormulaRepr::Plain(expression) => Formula::parse(&expression),
            FormulaRepr::Full { expression, table } => {
                let formula = Formula::parse(&expression)?;
                Ok(match table {
                    Some(table) => formula.with_table(table),
                    None => formula,
                })
            }
        }
    }
}

impl From<Formula> for FormulaRepr {
    fn from(formula: Formula) -> Self {
        match formula.table {
            None => FormulaRepr::Plain(formula.source),
            Some(table) => FormulaRepr::Full {
                expression: formula.source,
                table: Some(table),
            },
        }
    }
}

// =============================================================================
// Free functions
// =============================================================================

/// Parses and reduces `source`, returning the arithmetic-only rewrite.
///
/// # Errors
///
/// Syntax and evaluation errors.
pub fn rewrite(source: &str, scope: &Scope<'_>, evaluation: &mut Evaluation) -> FormulaResult<String> {
    Formula::parse(source)?.rewrite(scope, evaluation)
}

/// Evaluates a pure arithmetic string such as the output of [`rewrite`].
///
/// # Errors
///
/// Syntax errors, [`FormulaError::ClauseInArithmetic`] for leftover clauses,
/// and [`FormulaError::DivisionByZero`].
///
/// # Example
///
/// ```
/// assert_eq!(tally::evaluate("(2+3)*4").unwrap(), 20.0);
/// assert_eq!(tally::evaluate("10-4-3").unwrap(), 3.0);
/// assert!(tally::evaluate("1/0").is_err());
/// ```
pub fn evaluate(arithmetic: &str) -> FormulaResult<f64> {
    fold(&syntax::parse_arithmetic(arithmetic)?)
}

/// Parses and calculates `source` in one go.
///
/// Malformed formulas and evaluation failures are logged and produce
/// [`SENTINEL`].
pub fn calculate(
    source: &str,
    base: f64,
    origin: &dyn FormulaContext,
    target: Option<&dyn FormulaContext>,
) -> f64 {
    match Formula::parse(source) {
        Ok(formula) => formula.calculate(base, origin, target),
        Err(err) => {
            tracing::warn!(formula = source, error = %err, "malformed formula, using sentinel");
            SENTINEL
        }
    }
}

// =============================================================================
// Reduction
// =============================================================================

struct Reducer<'s, 'e> {
    scope: &'s Scope<'s>,
    table: Option<&'s Table>,
    evaluation: &'e mut Evaluation,
}

impl<'s, 'e> Reducer<'s, 'e> {
    fn new(scope: &'s Scope<'s>, table: Option<&'s Table>, evaluation: &'e mut Evaluation) -> Self {
        Self {
            scope,
            table,
            evaluation,
        }
    }

    /// Replaces clauses with literals, keeping the arithmetic structure.
    fn reduce(&mut self, expr: &Expr) -> FormulaResult<Expr> {
        match expr {
            Expr::Number(n) => Ok(Expr::Number(*n)),
            Expr::Name(name) => Err(FormulaError::NotANumber(name.clone())),
            Expr::Neg(inner) => Ok(Expr::Neg(Box::new(self.reduce(inner)?))),
            Expr::Binary { op, lhs, rhs } => Ok(Expr::Binary {
                op: *op,
                lhs: Box::new(self.reduce(lhs)?),
                rhs: Box::new(self.reduce(rhs)?),
            }),
            Expr::Clause { .. } => Ok(Expr::Number(self.number(expr)?)),
        }
    }

    fn value(&mut self, expr: &Expr) -> FormulaResult<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Name(name) => Ok(Value::Text(name.clone())),
            Expr::Neg(inner) => Ok(Value::Number(-self.number(inner)?)),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.number(lhs)?;
                let rhs = self.number(rhs)?;
                op.apply(lhs, rhs).map(Value::Number)
            }
            Expr::Clause { clause, args } => {
                self.evaluation.enter()?;
                let value = self.clause(*clause, args);
                self.evaluation.leave();
                value
            }
        }
    }

    fn number(&mut self, expr: &Expr) -> FormulaResult<f64> {
        let value = self.value(expr)?;
        value
            .as_number()
            .ok_or_else(|| FormulaError::NotANumber(value.to_name()))
    }

    fn name(&mut self, expr: &Expr) -> FormulaResult<String> {
        Ok(self.value(expr)?.to_name())
    }

    fn clause(&mut self, clause: Clause, args: &[Expr]) -> FormulaResult<Value> {
        let value = match clause {
            Clause::This => {
                let name = self.name(one(clause, args)?)?;
                if name == "value" {
                    Value::Number(self.scope.base)
                } else {
                    tracing::warn!(property = %name, "unknown this[] property, using 0");
                    Value::Number(0.0)
                }
            }
            Clause::Stat | Clause::StatOther => {
                let name = self.name(one(clause, args)?)?;
                let found = match self.context(clause) {
                    Some(context) => context.stat(&name, self.evaluation)?,
                    None => None,
                };
                Value::Number(soft_miss(clause, &name, found))
            }
            Clause::Attr | Clause::AttrOther => {
                let name = self.name(one(clause, args)?)?;
                let found = match self.context(clause) {
                    Some(context) => context.attr(&name, self.evaluation)?,
                    None => None,
                };
                Value::Number(soft_miss(clause, &name, found))
            }
            Clause::Local | Clause::LocalOther | Clause::Global => {
                let name = self.name(one(clause, args)?)?;
                let found = self.context(clause).and_then(|context| match clause {
                    Clause::Global => context.global_var(&name),
                    _ => context.local_var(&name),
                });
                match found {
                    Some(value) => value,
                    None => Value::Number(soft_miss(clause, &name, None)),
                }
            }
            Clause::Rand => {
                let (a, b) = two(clause, args)?;
                let (min, max) = (self.number(a)?, self.number(b)?);
                if max > min {
                    // The sampler needs a finite span
                    if !(max - min).is_finite() {
                        return Err(FormulaError::NonFinite);
                    }
                    Value::Number(self.evaluation.rng().gen_range(min..max))
                } else {
                    Value::Number(min)
                }
            }
            Clause::Dice => {
                let (a, b) = two(clause, args)?;
                let rolls = self.number(a)?.round();
                let sides = self.number(b)?.round();
                Value::Number(self.roll_dice(rolls, sides))
            }
            Clause::Chance => {
                let p = self.number(one(clause, args)?)?.clamp(0.0, 1.0);
                let roll: f64 = self.evaluation.rng().gen();
                Value::Number(if roll < p { 1.0 } else { 0.0 })
            }
            Clause::Min | Clause::Max => {
                let (a, b) = two(clause, args)?;
                let (a, b) = (self.number(a)?, self.number(b)?);
                Value::Number(if clause == Clause::Min { a.min(b) } else { a.max(b) })
            }
            Clause::Round => Value::Number(self.number(one(clause, args)?)?.round()),
            Clause::Floor => Value::Number(self.number(one(clause, args)?)?.floor()),
            Clause::Ceil => Value::Number(self.number(one(clause, args)?)?.ceil()),
            Clause::Table | Clause::TableRise => {
                let progress = self.number(one(clause, args)?)?;
                let table = self.table.ok_or(FormulaError::MissingTable)?;
                Value::Number(if clause == Clause::Table {
                    f64::from(table.tier(progress))
                } else {
                    table.percent_next_tier(progress)
                })
            }
        };
        tracing::trace!(clause = %clause, value = %value, "clause reduced");
        Ok(value)
    }

    /// Picks the context a lookup clause reads from.
    fn context(&self, clause: Clause) -> Option<&'s dyn FormulaContext> {
        match clause {
            Clause::StatOther | Clause::AttrOther | Clause::LocalOther => self.scope.target,
            _ => Some(self.scope.origin),
        }
    }

    fn roll_dice(&mut self, rolls: f64, sides: f64) -> f64 {
        if rolls < 1.0 || sides < 1.0 {
            return 0.0;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (rolls, sides) = (
            rolls.min(f64::from(MAX_DICE_ROLLS)) as u32,
            sides.min(f64::from(u32::MAX)) as u32,
        );
        let rng = self.evaluation.rng();
        (0..rolls)
            .map(|_| f64::from(rng.gen_range(1..=sides)))
            .sum()
    }
}

fn soft_miss(clause: Clause, name: &str, found: Option<f64>) -> f64 {
    found.unwrap_or_else(|| {
        tracing::warn!(clause = %clause, name, "lookup missed, using 0");
        0.0
    })
}

fn one(clause: Clause, args: &[Expr]) -> FormulaResult<&Expr> {
    match args {
        [a] => Ok(a),
        _ => Err(arity(clause, args)),
    }
}

fn two(clause: Clause, args: &[Expr]) -> FormulaResult<(&Expr, &Expr)> {
    match args {
        [a, b] => Ok((a, b)),
        _ => Err(arity(clause, args)),
    }
}

fn arity(clause: Clause, args: &[Expr]) -> FormulaError {
    FormulaError::Arity {
        clause: clause.spelling(),
        expected: clause.arity(),
        found: args.len(),
    }
}

// =============================================================================
// Arithmetic
// =============================================================================

/// Folds a clause-free expression to a number.
fn fold(expr: &Expr) -> FormulaResult<f64> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Neg(inner) => Ok(-fold(inner)?),
        Expr::Binary { op, lhs, rhs } => op.apply(fold(lhs)?, fold(rhs)?),
        Expr::Name(name) => Err(FormulaError::ClauseInArithmetic(name.clone())),
        Expr::Clause { clause, .. } => Err(FormulaError::ClauseInArithmetic(clause.to_string())),
    }
}

const fn precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Add | BinaryOp::Sub => 1,
        BinaryOp::Mul | BinaryOp::Div => 2,
    }
}

/// Renders an arithmetic tree with the fewest parentheses that preserve
/// evaluation order exactly.
fn render(expr: &Expr, out: &mut String) {
    match expr {
        Expr::Number(n) if n.is_sign_negative() => {
            let _ = write!(out, "(0-{})", n.abs());
        }
        Expr::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Expr::Neg(inner) => {
            out.push_str("(0-");
            if matches!(**inner, Expr::Binary { .. }) {
                out.push('(');
                render(inner, out);
                out.push(')');
            } else {
                render(inner, out);
            }
            out.push(')');
        }
        Expr::Binary { op, lhs, rhs } => {
            render_operand(lhs, *op, false, out);
            out.push(op.symbol());
            render_operand(rhs, *op, true, out);
        }
        // Clause-free trees never reach these arms.
        Expr::Name(name) => out.push_str(name),
        Expr::Clause { clause, .. } => out.push_str(clause.spelling()),
    }
}

fn render_operand(expr: &Expr, parent: BinaryOp, right: bool, out: &mut String) {
    let needs_parens = match expr {
        Expr::Binary { op, .. } => {
            let (child, parent) = (precedence(*op), precedence(parent));
            child < parent || (right && child == parent)
        }
        _ => false,
    };
    if needs_parens {
        out.push('(');
        render(expr, out);
        out.push(')');
    } else {
        render(expr, out);
    }
}
