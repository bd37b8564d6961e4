//! Error types for formula parsing and evaluation.
//!
//! Formulas are authored by designers and edited while the game runs, so most
//! of these errors are surfaced to callers as a sentinel value by the
//! infallible entry points (see [`crate::SENTINEL`]). The fallible `try_*`
//! APIs return them directly.

use thiserror::Error;

/// Errors produced while parsing, reducing or evaluating a formula.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// The formula contains no tokens.
    #[error("formula is empty")]
    EmptyExpression,

    /// A bracket was opened without being closed, closed without being
    /// opened, or closed with the wrong delimiter.
    #[error("unbalanced bracket at position {position}")]
    UnbalancedBrackets {
        /// Byte offset of the offending character (or the end of input).
        position: usize,
    },

    /// The parser found a token it did not expect.
    #[error("unexpected '{found}' at position {position}")]
    UnexpectedToken {
        /// Byte offset of the token in the whitespace-stripped source.
        position: usize,
        /// Text of the offending token.
        found: String,
    },

    /// The input ended in the middle of an expression.
    #[error("unexpected end of formula")]
    UnexpectedEnd,

    /// A numeric literal could not be parsed.
    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    /// A clause name is not part of the clause table.
    #[error("unknown clause '{0}'")]
    UnknownClause(String),

    /// A clause received the wrong number of arguments.
    #[error("clause '{clause}' takes {expected} argument(s), found {found}")]
    Arity {
        /// Clause name as written in formulas.
        clause: &'static str,
        /// Number of arguments the clause takes.
        expected: usize,
        /// Number of arguments supplied.
        found: usize,
    },

    /// A name or text value was used where a number is required.
    #[error("'{0}' is not a number")]
    NotANumber(String),

    /// A clause or name appeared in a string that must be pure arithmetic.
    #[error("'{0}' is not allowed in arithmetic")]
    ClauseInArithmetic(String),

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// An intermediate value overflowed to infinity or became NaN.
    #[error("result is not a finite number")]
    NonFinite,

    /// Clause or derived-stat evaluation nested deeper than the configured
    /// bound. This catches self-referential chains of stats and formulas.
    #[error("evaluation nested deeper than {0} levels")]
    DepthLimit(u32),

    /// Parentheses, clause brackets or unary minus nest too deeply to parse.
    #[error("formula nests deeper than {0} levels")]
    TooDeep(u32),

    /// The formula has more expression nodes than the parser accepts.
    #[error("formula has more than {0} nodes")]
    TooLarge(u32),

    /// A `table[...]` clause was used by a formula without a tier table.
    #[error("formula uses a table clause but has no table")]
    MissingTable,
}

/// Result type for formula operations.
pub type FormulaResult<T> = Result<T, FormulaError>;
