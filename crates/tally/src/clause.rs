//! The function-clause table.
//!
//! Clauses are the function-like tokens embedded in formulas, such as
//! `stat[strength]` or `dice[2,6]`. The set is closed: every clause a formula
//! can use is a variant of [`Clause`], and dispatch is an exhaustive `match`.

use std::fmt;

use crate::error::{FormulaError, FormulaResult};

/// A clause from the formula clause table.
///
/// Variants are declared in table order. When two spellings could match the
/// same text, the earlier entry wins.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Clause {
    /// `this[value]`: the base value passed to the calculation.
    This,
    /// `stat[name]`: a stat of the origin context.
    Stat,
    /// `attr[name]`: an attribute of the origin context.
    Attr,
    /// `stat:other[name]`: a stat of the target context.
    StatOther,
    /// `attr:other[name]`: an attribute of the target context.
    AttrOther,
    /// `local[name]`: a local variable of the origin context.
    Local,
    /// `local:other[name]`: a local variable of the target context.
    LocalOther,
    /// `global[name]`: a session-wide variable.
    Global,
    /// `rand[min,max]`: uniform random number.
    Rand,
    /// `dice[rolls,sides]`: sum of dice rolls.
    Dice,
    /// `chance[p]`: 1 with probability `p`, otherwise 0.
    Chance,
    /// `min[a,b]`
    Min,
    /// `max[a,b]`
    Max,
    /// `round[x]`
    Round,
    /// `floor[x]`
    Floor,
    /// `ceil[x]`
    Ceil,
    /// `table:rise[x]`: progress towards the next tier of the formula's table.
    TableRise,
    /// `table[x]`: tier of the formula's table reached at progress `x`.
    Table,
}

impl Clause {
    /// Every clause, in table order.
    pub const ALL: [Clause; 18] = [
        Clause::This,
        Clause::Stat,
        Clause::Attr,
        Clause::StatOther,
        Clause::AttrOther,
        Clause::Local,
        Clause::LocalOther,
        Clause::Global,
        Clause::Rand,
        Clause::Dice,
        Clause::Chance,
        Clause::Min,
        Clause::Max,
        Clause::Round,
        Clause::Floor,
        Clause::Ceil,
        Clause::TableRise,
        Clause::Table,
    ];

    /// Resolves a clause from its name and optional `:qualifier`.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError::UnknownClause`] when no table entry matches.
    pub fn from_parts(name: &str, qualifier: Option<&str>) -> FormulaResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|clause| {
                let (n, q) = clause.parts();
                n == name && q == qualifier
            })
            .ok_or_else(|| match qualifier {
                Some(q) => FormulaError::UnknownClause(format!("{name}:{q}")),
                None => FormulaError::UnknownClause(name.to_string()),
            })
    }

    /// The clause's name and qualifier as written in formulas.
    #[must_use]
    pub const fn parts(self) -> (&'static str, Option<&'static str>) {
        match self {
            Self::This => ("this", None),
            Self::Stat => ("stat", None),
            Self::Attr => ("attr", None),
            Self::StatOther => ("stat", Some("other")),
            Self::AttrOther => ("attr", Some("other")),
            Self::Local => ("local", None),
            Self::LocalOther => ("local", Some("other")),
            Self::Global => ("global", None),
            Self::Rand => ("rand", None),
            Self::Dice => ("dice", None),
            Self::Chance => ("chance", None),
            Self::Min => ("min", None),
            Self::Max => ("max", None),
            Self::Round => ("round", None),
            Self::Floor => ("floor", None),
            Self::Ceil => ("ceil", None),
            Self::TableRise => ("table", Some("rise")),
            Self::Table => ("table", None),
        }
    }

    /// The spelling used in formulas, e.g. `stat:other`.
    #[must_use]
    pub const fn spelling(self) -> &'static str {
        match self {
            Self::This => "this",
            Self::Stat => "stat",
            Self::Attr => "attr",
            Self::StatOther => "stat:other",
            Self::AttrOther => "attr:other",
            Self::Local => "local",
            Self::LocalOther => "local:other",
            Self::Global => "global",
            Self::Rand => "rand",
            Self::Dice => "dice",
            Self::Chance => "chance",
            Self::Min => "min",
            Self::Max => "max",
            Self::Round => "round",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::TableRise => "table:rise",
            Self::Table => "table",
        }
    }

    /// Number of bracketed arguments the clause takes.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Rand | Self::Dice | Self::Min | Self::Max => 2,
            _ => 1,
        }
    }

    /// Whether the clause's argument is a name rather than a number.
    #[must_use]
    pub const fn takes_name(self) -> bool {
        matches!(
            self,
            Self::This
                | Self::Stat
                | Self::Attr
                | Self::StatOther
                | Self::AttrOther
                | Self::Local
                | Self::LocalOther
                | Self::Global
        )
    }

    /// Checks an argument count against [`Clause::arity`].
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError::Arity`] on mismatch.
    pub fn check_arity(self, found: usize) -> FormulaResult<()> {
        let expected = self.arity();
        if found == expected {
            Ok(())
        } else {
            Err(FormulaError::Arity {
                clause: self.spelling(),
                expected,
                found,
            })
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spelling())
    }
}
