//! Filter and derived-column expressions over event-table columns.
//!
//! Supports arithmetic (`+ - * /`), comparisons (`== != < <= > >=`), boolean
//! operators (`&& || !`), the literals `true`/`false`, and the functions
//! `abs sqrt log exp pow min max`. Identifiers name table columns.
//!
//! Boolean results are encoded as `1.0`/`0.0`; any non-zero, non-NaN value
//! counts as true, so a bare flag column (`IsCC`) is a valid selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl Op {
    /// Left binding power; higher binds tighter.
    fn precedence(self) -> u8 {
        match self {
            Op::Or => 1,
            Op::And => 2,
            Op::Eq | Op::Ne | Op::Lt | Op::Le | Op::Gt | Op::Ge => 3,
            Op::Add | Op::Sub => 4,
            Op::Mul | Op::Div => 5,
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> f64 {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        match self {
            Op::Add => lhs + rhs,
            Op::Sub => lhs - rhs,
            Op::Mul => lhs * rhs,
            Op::Div => lhs / rhs,
            Op::Eq => flag(approx_eq(lhs, rhs)),
            Op::Ne => flag(!approx_eq(lhs, rhs)),
            Op::Lt => flag(lhs < rhs),
            Op::Le => flag(lhs <= rhs),
            Op::Gt => flag(lhs > rhs),
            Op::Ge => flag(lhs >= rhs),
            Op::And => flag(truthy(lhs) && truthy(rhs)),
            Op::Or => flag(truthy(lhs) || truthy(rhs)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Func {
    Abs,
    Sqrt,
    Log,
    Exp,
    Pow,
    Min,
    Max,
}

impl Func {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "abs" => Func::Abs,
            "sqrt" => Func::Sqrt,
            "log" => Func::Log,
            "exp" => Func::Exp,
            "pow" => Func::Pow,
            "min" => Func::Min,
            "max" => Func::Max,
            _ => return None,
        })
    }

    fn arity(self) -> usize {
        match self {
            Func::Pow | Func::Min | Func::Max => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Const(f64),
    Column(usize),
    Neg(Box<Node>),
    Not(Box<Node>),
    Binary(Op, Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

impl Node {
    fn eval(&self, row: &[f64]) -> f64 {
        match self {
            Node::Const(v) => *v,
            Node::Column(i) => row[*i],
            Node::Neg(a) => -a.eval(row),
            Node::Not(a) => {
                if truthy(a.eval(row)) {
                    0.0
                } else {
                    1.0
                }
            }
            Node::Binary(op, a, b) => op.apply(a.eval(row), b.eval(row)),
            Node::Call(f, args) => {
                let x = args[0].eval(row);
                match f {
                    Func::Abs => x.abs(),
                    Func::Sqrt => x.sqrt(),
                    Func::Log => x.ln(),
                    Func::Exp => x.exp(),
                    Func::Pow => x.powf(args[1].eval(row)),
                    Func::Min => x.min(args[1].eval(row)),
                    Func::Max => x.max(args[1].eval(row)),
                }
            }
        }
    }
}

/// Truthiness of an evaluated value.
#[inline]
pub fn truthy(v: f64) -> bool {
    v != 0.0 && !v.is_nan()
}

#[inline]
fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// A parsed expression, kept together with its source text.
///
/// Serializes as the source string, so expressions can appear directly in
/// configuration files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Expression {
    source: String,
    root: Node,
    columns: Vec<String>,
}

impl Expression {
    /// Parse an expression string.
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(TableError::Expression("empty expression".into()));
        }
        let mut parser = Parser { tokens: &tokens, pos: 0, columns: Vec::new() };
        let root = parser.expression(0)?;
        if let Some(tok) = parser.tokens.get(parser.pos) {
            return Err(TableError::Expression(format!(
                "unexpected {tok:?} after end of expression in '{input}'"
            )));
        }
        Ok(Self { source: input.trim().to_string(), root, columns: parser.columns })
    }

    /// The expression that accepts every row (`1`).
    pub fn always() -> Self {
        Self { source: "1".into(), root: Node::Const(1.0), columns: Vec::new() }
    }

    /// Source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Columns referenced, in order of first appearance.
    ///
    /// [`Expression::eval_row`] expects its values in this order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Evaluate for one row. `values` follows [`Expression::columns`].
    pub fn eval_row(&self, values: &[f64]) -> f64 {
        self.root.eval(values)
    }

    /// Evaluate column-wise. `columns` follows [`Expression::columns`] and
    /// every slice has `n_rows` entries.
    pub fn eval_columns(&self, columns: &[&[f64]], n_rows: usize) -> Vec<f64> {
        if columns.is_empty() {
            return vec![self.eval_row(&[]); n_rows];
        }
        let mut row = vec![0.0; columns.len()];
        (0..n_rows)
            .map(|i| {
                for (slot, col) in row.iter_mut().zip(columns) {
                    *slot = col[i];
                }
                self.eval_row(&row)
            })
            .collect()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Expression {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Expression {
    type Error = TableError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Expression> for String {
    fn from(e: Expression) -> Self {
        e.source
    }
}

// ── Lexer ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(Op),
    Bang,
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let mut end = start;
            let mut prev = ' ';
            while let Some(&(i, d)) = chars.peek() {
                let exponent_sign = (d == '+' || d == '-') && (prev == 'e' || prev == 'E');
                if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exponent_sign {
                    end = i + d.len_utf8();
                    prev = d;
                    chars.next();
                } else {
                    break;
                }
            }
            let text = &input[start..end];
            let value = text
                .parse::<f64>()
                .map_err(|_| TableError::Expression(format!("invalid number '{text}'")))?;
            tokens.push(Token::Num(value));
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let mut end = start;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_ascii_alphanumeric() || d == '_' || d == '.' {
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(input[start..end].to_string()));
            continue;
        }

        chars.next();
        let next = chars.peek().map(|&(_, d)| d);
        let (token, pair) = match (c, next) {
            ('&', Some('&')) => (Token::Op(Op::And), true),
            ('|', Some('|')) => (Token::Op(Op::Or), true),
            ('=', Some('=')) => (Token::Op(Op::Eq), true),
            ('!', Some('=')) => (Token::Op(Op::Ne), true),
            ('<', Some('=')) => (Token::Op(Op::Le), true),
            ('>', Some('=')) => (Token::Op(Op::Ge), true),
            ('<', _) => (Token::Op(Op::Lt), false),
            ('>', _) => (Token::Op(Op::Gt), false),
            ('!', _) => (Token::Bang, false),
            ('+', _) => (Token::Op(Op::Add), false),
            ('-', _) => (Token::Op(Op::Sub), false),
            ('*', _) => (Token::Op(Op::Mul), false),
            ('/', _) => (Token::Op(Op::Div), false),
            ('(', _) => (Token::LParen, false),
            (')', _) => (Token::RParen, false),
            (',', _) => (Token::Comma, false),
            _ => {
                return Err(TableError::Expression(format!(
                    "unexpected character '{c}' at offset {start} in '{input}'"
                )));
            }
        };
        if pair {
            chars.next();
        }
        tokens.push(token);
    }

    Ok(tokens)
}

// ── Parser (precedence climbing) ───────────────────────────────

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    columns: Vec<String>,
}

impl Parser<'_> {
    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, want: Token) -> Result<()> {
        match self.next() {
            Some(tok) if tok == want => Ok(()),
            other => Err(TableError::Expression(format!("expected {want:?}, found {other:?}"))),
        }
    }

    fn column_slot(&mut self, name: &str) -> usize {
        match self.columns.iter().position(|c| c == name) {
            Some(i) => i,
            None => {
                self.columns.push(name.to_string());
                self.columns.len() - 1
            }
        }
    }

    fn expression(&mut self, min_prec: u8) -> Result<Node> {
        let mut lhs = self.prefix()?;
        while let Some(Token::Op(op)) = self.tokens.get(self.pos) {
            let op = *op;
            let prec = op.precedence();
            if prec <= min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.expression(prec)?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn prefix(&mut self) -> Result<Node> {
        match self.next() {
            Some(Token::Op(Op::Sub)) => Ok(Node::Neg(Box::new(self.unary_operand()?))),
            Some(Token::Op(Op::Add)) => self.unary_operand(),
            Some(Token::Bang) => Ok(Node::Not(Box::new(self.unary_operand()?))),
            Some(Token::Num(v)) => Ok(Node::Const(v)),
            Some(Token::LParen) => {
                let inner = self.expression(0)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => self.identifier(name),
            other => Err(TableError::Expression(format!(
                "expected number, column, or '(', found {other:?}"
            ))),
        }
    }

    /// Operand of a unary operator: binds tighter than any binary operator.
    fn unary_operand(&mut self) -> Result<Node> {
        self.prefix()
    }

    fn identifier(&mut self, name: String) -> Result<Node> {
        if self.tokens.get(self.pos) != Some(&Token::LParen) {
            return Ok(match name.as_str() {
                "true" => Node::Const(1.0),
                "false" => Node::Const(0.0),
                _ => Node::Column(self.column_slot(&name)),
            });
        }

        let func = Func::lookup(&name)
            .ok_or_else(|| TableError::Expression(format!("unknown function '{name}'")))?;
        self.pos += 1;
        let mut args = vec![self.expression(0)?];
        while self.tokens.get(self.pos) == Some(&Token::Comma) {
            self.pos += 1;
            args.push(self.expression(0)?);
        }
        self.expect(Token::RParen)?;
        if args.len() != func.arity() {
            return Err(TableError::Expression(format!(
                "function '{name}' takes {} argument(s), got {}",
                func.arity(),
                args.len()
            )));
        }
        Ok(Node::Call(func, args))
    }
}
