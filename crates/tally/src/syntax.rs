//! Bracket checking, lexing and parsing of formula text.
//!
//! Formulas are parsed once into an [`Expr`] tree by a small recursive-descent
//! parser. The grammar, from loosest to tightest binding:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | primary
//! primary := number | '(' expr ')' | clause | name
//! clause  := ident (':' ident)? '[' expr (',' expr)* ']'
//! ```
//!
//! Whitespace is insignificant and stripped before anything else happens, so
//! reported positions are offsets into the stripped text.
//!
//! Parsing is bounded: parentheses, clause brackets and unary minus may nest
//! at most [`MAX_NESTING`] levels, and a formula may hold at most
//! [`MAX_NODES`] expression nodes. Everything downstream walks the tree
//! recursively, so these bounds also bound its stack use.

use crate::clause::Clause;
use crate::error::{FormulaError, FormulaResult};

/// Deepest nesting of parentheses, clause brackets and unary minus.
pub const MAX_NESTING: u32 = 500;

/// Most expression nodes a single formula may parse into.
pub const MAX_NODES: u32 = 2048;

// =============================================================================
// AST
// =============================================================================

/// Binary arithmetic operator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl BinaryOp {
    /// The operator's symbol.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        }
    }

    /// Applies the operator.
    ///
    /// # Errors
    ///
    /// [`FormulaError::DivisionByZero`] for a zero divisor and
    /// [`FormulaError::NonFinite`] when the result overflows.
    pub fn apply(self, lhs: f64, rhs: f64) -> FormulaResult<f64> {
        let value = match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div => {
                if rhs == 0.0 {
                    return Err(FormulaError::DivisionByZero);
                }
                lhs / rhs
            }
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FormulaError::NonFinite)
        }
    }
}

/// A parsed formula expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),
    /// Bare identifier, meaningful as a clause argument (`stat[strength]`).
    Name(String),
    /// Unary minus.
    Neg(Box<Expr>),
    /// Binary arithmetic.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// A clause from the clause table with its arguments.
    Clause {
        /// Which clause.
        clause: Clause,
        /// Arguments, already arity-checked.
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Whether the expression contains no clauses and no names.
    #[must_use]
    pub fn is_arithmetic(&self) -> bool {
        match self {
            Self::Number(_) => true,
            Self::Name(_) | Self::Clause { .. } => false,
            Self::Neg(inner) => inner.is_arithmetic(),
            Self::Binary { lhs, rhs, .. } => lhs.is_arithmetic() && rhs.is_arithmetic(),
        }
    }
}

// =============================================================================
// Brackets
// =============================================================================

/// Removes all whitespace from a formula.
#[must_use]
pub fn strip_whitespace(source: &str) -> String {
    source.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Checks that `()` and `[]` are balanced and correctly nested.
///
/// # Errors
///
/// Returns [`FormulaError::UnbalancedBrackets`] with the position of a stray
/// or mismatched closing bracket, or of the innermost bracket left open.
///
/// # Example
///
/// ```
/// use tally::check_brackets;
///
/// assert!(check_brackets("stat[atk] * (1 + attr[hp])").is_ok());
/// assert!(check_brackets("stat[atk").is_err());
/// ```
pub fn check_brackets(source: &str) -> FormulaResult<()> {
    let mut open: Vec<(char, usize)> = Vec::new();
    for (position, ch) in source.char_indices() {
        match ch {
            '(' | '[' => open.push((ch, position)),
            ')' | ']' => {
                let expected = if ch == ')' { '(' } else { '[' };
                match open.pop() {
                    Some((opener, _)) if opener == expected => {}
                    _ => return Err(FormulaError::UnbalancedBrackets { position }),
                }
            }
            _ => {}
        }
    }
    match open.pop() {
        Some((_, position)) => Err(FormulaError::UnbalancedBrackets { position }),
        None => Ok(()),
    }
}

// =============================================================================
// Lexer
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Ident(String),
    Op(BinaryOp),
    Colon,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    position: usize,
    len: usize,
}

fn tokenize(source: &str) -> FormulaResult<Vec<Token>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let ch = bytes[i];
        let start = i;

        if ch.is_ascii_digit() || ch == b'.' {
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            let text = &source[start..i];
            if text.matches('.').count() > 1 {
                return Err(FormulaError::InvalidNumber(text.to_string()));
            }
            let value: f64 = text
                .parse()
                .map_err(|_| FormulaError::InvalidNumber(text.to_string()))?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                position: start,
                len: i - start,
            });
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == b'_' {
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.')
            {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident(source[start..i].to_string()),
                position: start,
                len: i - start,
            });
            continue;
        }

        let kind = match ch {
            b'+' => TokenKind::Op(BinaryOp::Add),
            b'-' => TokenKind::Op(BinaryOp::Sub),
            b'*' => TokenKind::Op(BinaryOp::Mul),
            b'/' => TokenKind::Op(BinaryOp::Div),
            b':' => TokenKind::Colon,
            b',' => TokenKind::Comma,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            _ => {
                let found = source[start..].chars().next().map(String::from).unwrap_or_default();
                return Err(FormulaError::UnexpectedToken {
                    position: start,
                    found,
                });
            }
        };
        tokens.push(Token {
            kind,
            position: start,
            len: 1,
        });
        i += 1;
    }

    Ok(tokens)
}

// =============================================================================
// Parser
// =============================================================================

/// Parses a formula that may contain clauses and names.
///
/// Whitespace is stripped and brackets are checked before tokenizing.
///
/// # Errors
///
/// Any syntax error: unbalanced brackets, unknown clauses, arity mismatches,
/// stray tokens, or an empty formula. [`FormulaError::TooDeep`] and
/// [`FormulaError::TooLarge`] when the formula exceeds [`MAX_NESTING`] or
/// [`MAX_NODES`].
pub fn parse(source: &str) -> FormulaResult<Expr> {
    Parser::new(&strip_whitespace(source), true)?.parse_all()
}

/// Parses a string that must be pure arithmetic: numbers, `+ - * /` and
/// parentheses.
///
/// # Errors
///
/// As [`parse`], plus [`FormulaError::ClauseInArithmetic`] when a clause or
/// name is present.
pub fn parse_arithmetic(source: &str) -> FormulaResult<Expr> {
    Parser::new(&strip_whitespace(source), false)?.parse_all()
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    allow_clauses: bool,
    depth: u32,
    nodes: u32,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, allow_clauses: bool) -> FormulaResult<Self> {
        if source.is_empty() {
            return Err(FormulaError::EmptyExpression);
        }
        check_brackets(source)?;
        let tokens = tokenize(source)?;
        Ok(Self {
            source,
            tokens,
            pos: 0,
            allow_clauses,
            depth: 0,
            nodes: 0,
        })
    }

    fn parse_all(mut self) -> FormulaResult<Expr> {
        let expr = self.parse_expr()?;
        match self.tokens.get(self.pos) {
            None => Ok(expr),
            Some(token) => Err(self.unexpected(token)),
        }
    }

    fn parse_expr(&mut self) -> FormulaResult<Expr> {
        let mut node = self.parse_term()?;
        while let Some(op) = self.match_op(&[BinaryOp::Add, BinaryOp::Sub]) {
            let rhs = self.parse_term()?;
            node = self.node(Expr::Binary {
                op,
                lhs: Box::new(node),
                rhs: Box::new(rhs),
            })?;
        }
        Ok(node)
    }

    fn parse_term(&mut self) -> FormulaResult<Expr> {
        let mut node = self.parse_unary()?;
        while let Some(op) = self.match_op(&[BinaryOp::Mul, BinaryOp::Div]) {
            let rhs = self.parse_unary()?;
            node = self.node(Expr::Binary {
                op,
                lhs: Box::new(node),
                rhs: Box::new(rhs),
            })?;
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> FormulaResult<Expr> {
        if self.match_op(&[BinaryOp::Sub]).is_some() {
            self.descend()?;
            let inner = self.parse_unary()?;
            self.ascend();
            return self.node(Expr::Neg(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> FormulaResult<Expr> {
        let token = self.next_token().ok_or(FormulaError::UnexpectedEnd)?;
        match token.kind {
            TokenKind::Number(value) => self.node(Expr::Number(value)),
            TokenKind::LParen => {
                self.descend()?;
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                self.ascend();
                Ok(expr)
            }
            TokenKind::Ident(name) => {
                let is_clause = matches!(
                    self.peek_kind(),
                    Some(TokenKind::Colon | TokenKind::LBracket)
                );
                if !self.allow_clauses {
                    return Err(FormulaError::ClauseInArithmetic(name));
                }
                if is_clause {
                    self.parse_clause(&name)
                } else {
                    self.node(Expr::Name(name))
                }
            }
            _ => Err(self.unexpected(&token)),
        }
    }

    fn parse_clause(&mut self, name: &str) -> FormulaResult<Expr> {
        let qualifier = if self.peek_kind() == Some(&TokenKind::Colon) {
            self.pos += 1;
            match self.next_token() {
                Some(Token {
                    kind: TokenKind::Ident(q),
                    ..
                }) => Some(q),
                Some(token) => return Err(self.unexpected(&token)),
                None => return Err(FormulaError::UnexpectedEnd),
            }
        } else {
            None
        };

        let clause = Clause::from_parts(name, qualifier.as_deref())?;
        self.expect(&TokenKind::LBracket)?;
        self.descend()?;

        let mut args = vec![self.parse_expr()?];
        while self.peek_kind() == Some(&TokenKind::Comma) {
            self.pos += 1;
            args.push(self.parse_expr()?);
        }
        self.expect(&TokenKind::RBracket)?;
        self.ascend();

        clause.check_arity(args.len())?;
        self.node(Expr::Clause { clause, args })
    }

    /// Counts a finished node against [`MAX_NODES`].
    fn node(&mut self, expr: Expr) -> FormulaResult<Expr> {
        self.nodes += 1;
        if self.nodes > MAX_NODES {
            return Err(FormulaError::TooLarge(MAX_NODES));
        }
        Ok(expr)
    }

    fn descend(&mut self) -> FormulaResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(FormulaError::TooDeep(MAX_NESTING));
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    fn match_op(&mut self, ops: &[BinaryOp]) -> Option<BinaryOp> {
        if let Some(TokenKind::Op(op)) = self.peek_kind() {
            let op = *op;
            if ops.contains(&op) {
                self.pos += 1;
                return Some(op);
            }
        }
        None
    }

    fn expect(&mut self, kind: &TokenKind) -> FormulaResult<()> {
        match self.next_token() {
            Some(token) if &token.kind == kind => Ok(()),
            Some(token) => Err(self.unexpected(&token)),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(token)
    }

    fn unexpected(&self, token: &Token) -> FormulaError {
        FormulaError::UnexpectedToken {
            position: token.position,
            found: self.source[token.position..token.position + token.len].to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(value: f64) -> Box<Expr> {
        Box::new(Expr::Number(value))
    }

    mod bracket_tests {
        use super::*;

        #[test]
        fn balanced_nesting_passes() {
            assert!(check_brackets("min[stat[a],(1+2)*[3]]").is_ok());
            assert!(check_brackets("").is_ok());
        }

        #[test]
        fn missing_close_reports_opener() {
            assert_eq!(
                check_brackets("stat[atk"),
                Err(FormulaError::UnbalancedBrackets { position: 4 })
            );
        }

        #[test]
        fn stray_close_reports_itself() {
            assert_eq!(
                check_brackets("1+2)"),
                Err(FormulaError::UnbalancedBrackets { position: 3 })
            );
        }

        #[test]
        fn crossed_delimiters_are_rejected() {
            assert_eq!(
                check_brackets("stat[(atk])"),
                Err(FormulaError::UnbalancedBrackets { position: 9 })
            );
        }

        #[test]
        fn parse_checks_brackets_first() {
            assert_eq!(
                parse("stat[atk"),
                Err(FormulaError::UnbalancedBrackets { position: 4 })
            );
        }
    }

    mod parser_tests {
        use super::*;

        #[test]
        fn multiplication_binds_tighter() {
            let expr = parse("1 + 2 * 3").unwrap();
            assert_eq!(
                expr,
                Expr::Binary {
                    op: BinaryOp::Add,
                    lhs: num(1.0),
                    rhs: Box::new(Expr::Binary {
                        op: BinaryOp::Mul,
                        lhs: num(2.0),
                        rhs: num(3.0),
                    }),
                }
            );
        }

        #[test]
        fn subtraction_is_left_associative() {
            let expr = parse("8-3-2").unwrap();
            assert_eq!(
                expr,
                Expr::Binary {
                    op: BinaryOp::Sub,
                    lhs: Box::new(Expr::Binary {
                        op: BinaryOp::Sub,
                        lhs: num(8.0),
                        rhs: num(3.0),
                    }),
                    rhs: num(2.0),
                }
            );
        }

        #[test]
        fn leading_minus_is_negation() {
            assert_eq!(parse("-4").unwrap(), Expr::Neg(num(4.0)));
        }

        #[test]
        fn redundant_parens_vanish() {
            assert_eq!(parse("((7))").unwrap(), Expr::Number(7.0));
        }

        #[test]
        fn whitespace_is_ignored() {
            assert_eq!(parse(" stat [ atk ] ").unwrap(), parse("stat[atk]").unwrap());
        }

        #[test]
        fn qualified_clause_parses() {
            let expr = parse("stat:other[defense]").unwrap();
            assert_eq!(
                expr,
                Expr::Clause {
                    clause: Clause::StatOther,
                    args: vec![Expr::Name("defense".into())],
                }
            );
        }

        #[test]
        fn nested_clause_arguments_parse() {
            let expr = parse("max[stat[local[weapon]], 1]").unwrap();
            let Expr::Clause { clause, args } = expr else {
                panic!("expected clause");
            };
            assert_eq!(clause, Clause::Max);
            assert_eq!(args.len(), 2);
            assert!(matches!(
                &args[0],
                Expr::Clause {
                    clause: Clause::Stat,
                    ..
                }
            ));
        }

        #[test]
        fn wrong_arity_is_rejected() {
            assert!(matches!(
                parse("min[1]"),
                Err(FormulaError::Arity { clause: "min", .. })
            ));
        }

        #[test]
        fn unknown_clause_is_rejected() {
            assert_eq!(
                parse("sqrt[4]"),
                Err(FormulaError::UnknownClause("sqrt".into()))
            );
        }

        #[test]
        fn trailing_tokens_are_rejected() {
            assert!(matches!(
                parse("1(2)"),
                Err(FormulaError::UnexpectedToken { position: 1, .. })
            ));
        }

        #[test]
        fn dangling_operator_is_unexpected_end() {
            assert_eq!(parse("1+"), Err(FormulaError::UnexpectedEnd));
        }

        #[test]
        fn empty_formula_is_rejected() {
            assert_eq!(parse("   "), Err(FormulaError::EmptyExpression));
        }

        #[test]
        fn malformed_number_is_rejected() {
            assert_eq!(
                parse("1.2.3"),
                Err(FormulaError::InvalidNumber("1.2.3".into()))
            );
        }

        #[test]
        fn foreign_characters_are_rejected() {
            assert!(matches!(
                parse("2^3"),
                Err(FormulaError::UnexpectedToken { position: 1, .. })
            ));
        }

        #[test]
        fn arithmetic_mode_rejects_clauses() {
            assert_eq!(
                parse_arithmetic("1+stat[atk]"),
                Err(FormulaError::ClauseInArithmetic("stat".into()))
            );
            assert!(parse_arithmetic("(2+3)*4").unwrap().is_arithmetic());
        }
    }

    mod bound_tests {
        use super::*;

        fn nested(open: &str, inner: &str, close: &str, levels: usize) -> String {
            format!("{}{inner}{}", open.repeat(levels), close.repeat(levels))
        }

        #[test]
        fn nesting_up_to_the_limit_parses() {
            let levels = MAX_NESTING as usize;
            assert_eq!(parse(&nested("(", "7", ")", levels)), Ok(Expr::Number(7.0)));
            assert!(parse(&nested("floor[", "7", "]", levels)).is_ok());
        }

        #[test]
        fn deep_parentheses_are_rejected() {
            let source = nested("(", "1", ")", 20_000);
            assert_eq!(parse(&source), Err(FormulaError::TooDeep(MAX_NESTING)));
            assert_eq!(
                parse_arithmetic(&source),
                Err(FormulaError::TooDeep(MAX_NESTING))
            );
        }

        #[test]
        fn deep_clauses_are_rejected() {
            let source = nested("round[", "1", "]", 20_000);
            assert_eq!(parse(&source), Err(FormulaError::TooDeep(MAX_NESTING)));
        }

        #[test]
        fn long_negation_runs_are_rejected() {
            let source = format!("{}1", "-".repeat(20_000));
            assert_eq!(parse(&source), Err(FormulaError::TooDeep(MAX_NESTING)));
        }

        #[test]
        fn flat_sums_are_not_nesting() {
            let source = vec!["1"; 600].join("+");
            assert!(parse(&source).is_ok());
        }

        #[test]
        fn oversized_formulas_are_rejected() {
            let source = vec!["1"; 5_000].join("+");
            assert_eq!(parse(&source), Err(FormulaError::TooLarge(MAX_NODES)));
        }
    }
}
