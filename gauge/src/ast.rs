//! Abstract Syntax Tree

use serde::{Deserialize, Serialize};

/// A parsed template: literal text interleaved with `{{ ... }}` blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    pub fn expressions(&self) -> impl Iterator<Item = &Expr> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Expr { expr, .. } => Some(expr),
            Segment::Text(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    Text(String),
    Expr {
        /// Expression text as written, trimmed
        source: String,
        expr: Expr,
        line: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(f64),
    StringLiteral(String),
    Bool(bool),
    None,
    /// Possibly dotted: `meter.power`
    Variable(Vec<String>),
    BinaryOp(Box<Expr>, BinOp, Box<Expr>),
    UnaryOp(UnaryOp, Box<Expr>),
    /// Global call: `watts(x, 'kW')`
    FunctionCall(String, Vec<Expr>),
    /// Pipe: `x | watts('kW')`; the piped value becomes the first argument
    Filter(Box<Expr>, String, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp { Add, Sub, Mul, Div }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp { Neg }
