//! Template evaluator
//!
//! Evaluates each `{{ ... }}` block in order. Errors stay values and are
//! tagged with the block they came from.

use crate::ast::{BinOp, Expr, Segment, Template, UnaryOp};
use gauge_core::{GaugeError, Value};
use gauge_plugin::EvalContext;

/// Template evaluator
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate every block, in template order
    pub fn eval(&self, template: &Template, ctx: &EvalContext) -> Vec<Value> {
        template.segments.iter()
            .filter_map(|segment| match segment {
                Segment::Expr { source, expr, line } => Some(match self.eval_expr(expr, ctx) {
                    Value::Error(e) => Value::Error(locate(e, source, *line)),
                    value => value,
                }),
                Segment::Text(_) => None,
            })
            .collect()
    }

    /// Evaluate single expression
    pub fn eval_expr(&self, expr: &Expr, ctx: &EvalContext) -> Value {
        match expr {
            Expr::Number(n) => Value::Number(*n),
            Expr::StringLiteral(s) => Value::Text(s.clone()),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::None => Value::Null,

            Expr::Variable(parts) => ctx.get_var(&parts.join(".")),

            Expr::BinaryOp(left, op, right) => {
                let l = self.eval_expr(left, ctx);
                let r = self.eval_expr(right, ctx);
                self.eval_binary_op(l, *op, r)
            }

            Expr::UnaryOp(op, inner) => {
                let v = self.eval_expr(inner, ctx);
                self.eval_unary_op(*op, v)
            }

            Expr::FunctionCall(name, args) => {
                let args: Vec<Value> = args.iter().map(|a| self.eval_expr(a, ctx)).collect();
                ctx.registry.call_function(name, &args, ctx)
            }

            Expr::Filter(input, name, args) => {
                let args: Vec<Value> = std::iter::once(input.as_ref())
                    .chain(args.iter())
                    .map(|a| self.eval_expr(a, ctx))
                    .collect();
                ctx.registry.call_function(name, &args, ctx)
            }
        }
    }

    fn eval_binary_op(&self, left: Value, op: BinOp, right: Value) -> Value {
        if let Value::Error(e) = &left {
            return Value::Error(e.clone().with_note("from left operand"));
        }
        if let Value::Error(e) = &right {
            return Value::Error(e.clone().with_note("from right operand"));
        }

        if let (BinOp::Add, Value::Text(l), Value::Text(r)) = (op, &left, &right) {
            return Value::Text(format!("{}{}", l, r));
        }

        let l = match left.as_number() {
            Some(n) => n,
            None => return Value::Error(GaugeError::type_error("Number", left.type_name())),
        };
        let r = match right.as_number() {
            Some(n) => n,
            None => return Value::Error(GaugeError::type_error("Number", right.type_name())),
        };

        match op {
            BinOp::Add => Value::Number(l + r),
            BinOp::Sub => Value::Number(l - r),
            BinOp::Mul => Value::Number(l * r),
            BinOp::Div if r == 0.0 => Value::Error(GaugeError::div_zero()),
            BinOp::Div => Value::Number(l / r),
        }
    }

    fn eval_unary_op(&self, op: UnaryOp, value: Value) -> Value {
        if let Value::Error(e) = &value {
            return Value::Error(e.clone());
        }

        match op {
            UnaryOp::Neg => match value.as_number() {
                Some(n) => Value::Number(-n),
                None => Value::Error(GaugeError::type_error("Number", value.type_name())),
            },
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Attach the block text and line unless the error already carries them
fn locate(mut error: GaugeError, source: &str, line: usize) -> GaugeError {
    let ctx = error.context.get_or_insert_with(Default::default);
    if ctx.expression.is_none() {
        ctx.expression = Some(source.to_string());
    }
    if ctx.line.is_none() {
        ctx.line = Some(line);
    }
    error
}
