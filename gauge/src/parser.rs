//! Template parser
//!
//! Splits a template into literal text and `{{ ... }}` blocks, then parses
//! each block by recursive descent over top-level operators:
//! `+ -` bind loosest, then `* /`, unary minus, and `|` pipes tightest.

use crate::ast::{BinOp, Expr, Segment, Template, UnaryOp};
use gauge_core::GaugeError;

/// Parse template source to AST
pub fn parse(source: &str) -> Result<Template, GaugeError> {
    let mut segments = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while let Some(rel) = source[pos..].find('{') {
        let open = pos + rel;
        let tail = &source[open..];
        let (line, col) = position(source, open);

        if tail.starts_with("{{") {
            push_text(&mut segments, &source[text_start..open]);
            let body_start = open + 2;
            let close = find_block_end(&source[body_start..])
                .ok_or_else(|| GaugeError::parse_error("unclosed '{{'").at(line, col))?;
            let body = source[body_start..body_start + close].trim();
            let expr = parse_expr(body).map_err(|e| e.with_expression(body).at(line, col))?;
            segments.push(Segment::Expr { source: body.to_string(), expr, line });
            pos = body_start + close + 2;
            text_start = pos;
        } else if tail.starts_with("{#") {
            push_text(&mut segments, &source[text_start..open]);
            let close = source[open + 2..].find("#}")
                .ok_or_else(|| GaugeError::parse_error("unclosed comment '{#'").at(line, col))?;
            pos = open + 2 + close + 2;
            text_start = pos;
        } else if tail.starts_with("{%") {
            return Err(GaugeError::parse_error("statement blocks '{% ... %}' are not supported")
                .at(line, col));
        } else {
            pos = open + 1;
        }
    }

    push_text(&mut segments, &source[text_start..]);
    Ok(Template { segments })
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    match segments.last_mut() {
        Some(Segment::Text(prev)) => prev.push_str(text),
        _ => segments.push(Segment::Text(text.to_string())),
    }
}

/// 1-based line and column of a byte offset
fn position(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |nl| nl + 1);
    (line, before[line_start..].chars().count() + 1)
}

/// Offset of the `}}` closing a block, skipping quoted text
fn find_block_end(body: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in body.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if body[i..].starts_with("}}") => return Some(i),
            None => {}
        }
    }
    None
}

/// Each char of `input` with its byte offset, flagged when it sits
/// outside quotes and brackets.
fn scan(input: &str) -> Vec<(usize, char, bool)> {
    let mut depth = 0usize;
    let mut quote = None;
    input.char_indices().map(|(i, c)| {
        let top = match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                false
            }
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    false
                }
                '(' | '[' => {
                    depth += 1;
                    false
                }
                ')' | ']' => {
                    depth = depth.saturating_sub(1);
                    false
                }
                _ => depth == 0,
            },
        };
        (i, c, top)
    }).collect()
}

fn check_balanced(input: &str) -> Result<(), GaugeError> {
    let mut depth = 0i32;
    let mut quote = None;
    for c in input.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' | '[' => depth += 1,
                ')' | ']' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(GaugeError::parse_error(format!("unexpected '{}'", c)));
                    }
                }
                _ => {}
            },
        }
    }
    if quote.is_some() {
        return Err(GaugeError::parse_error("unterminated string"));
    }
    if depth != 0 {
        return Err(GaugeError::parse_error("unbalanced parentheses"));
    }
    Ok(())
}

/// Parse a single expression
pub fn parse_expr(input: &str) -> Result<Expr, GaugeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(GaugeError::parse_error("empty expression"));
    }
    check_balanced(input)?;
    parse_additive(input)
}

fn parse_additive(input: &str) -> Result<Expr, GaugeError> {
    for &(pos, c, top) in scan(input).iter().rev() {
        if !top || !(c == '+' || c == '-') || pos == 0 {
            continue;
        }
        let left = &input[..pos];
        let right = input[pos + 1..].trim();
        if is_unary_position(left) || is_exponent_sign(left) || right.is_empty() {
            continue;
        }
        let op = if c == '+' { BinOp::Add } else { BinOp::Sub };
        return Ok(Expr::BinaryOp(
            Box::new(parse_additive(left.trim())?),
            op,
            Box::new(parse_multiplicative(right)?),
        ));
    }
    parse_multiplicative(input)
}

fn parse_multiplicative(input: &str) -> Result<Expr, GaugeError> {
    for &(pos, c, top) in scan(input).iter().rev() {
        if !top || !(c == '*' || c == '/') {
            continue;
        }
        let left = input[..pos].trim();
        let right = input[pos + 1..].trim();
        if left.is_empty() || right.is_empty() {
            continue;
        }
        let op = if c == '*' { BinOp::Mul } else { BinOp::Div };
        return Ok(Expr::BinaryOp(
            Box::new(parse_multiplicative(left)?),
            op,
            Box::new(parse_unary(right)?),
        ));
    }
    parse_unary(input)
}

/// A sign with nothing or an operator before it is unary
fn is_unary_position(left: &str) -> bool {
    match left.trim_end().chars().last() {
        None => true,
        Some(c) => matches!(c, '+' | '-' | '*' | '/' | '(' | ',' | '|'),
    }
}

/// `1e-5`: the sign belongs to a number's exponent
fn is_exponent_sign(left: &str) -> bool {
    let Some(stem) = left.strip_suffix(['e', 'E']) else {
        return false;
    };
    let start = stem.char_indices().rev()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map_or(0, |(i, c)| i + c.len_utf8());
    let mantissa = &stem[start..];
    let before = stem[..start].chars().last();
    mantissa.chars().any(|c| c.is_ascii_digit())
        && before.map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
}

fn parse_unary(input: &str) -> Result<Expr, GaugeError> {
    let input = input.trim();
    if let Some(rest) = input.strip_prefix('-') {
        if parse_number(input).is_none() {
            return Ok(Expr::UnaryOp(UnaryOp::Neg, Box::new(parse_unary(rest)?)));
        }
    }
    if let Some(rest) = input.strip_prefix('+') {
        return parse_unary(rest);
    }
    parse_filtered(input)
}

/// `value | name | name(args)`
fn parse_filtered(input: &str) -> Result<Expr, GaugeError> {
    let pipes: Vec<usize> = scan(input).into_iter()
        .filter(|&(_, c, top)| top && c == '|')
        .map(|(pos, _, _)| pos)
        .collect();
    if pipes.is_empty() {
        return parse_primary(input);
    }

    let mut expr = parse_primary(&input[..pipes[0]])?;
    let ends = pipes.iter().skip(1).copied().chain(std::iter::once(input.len()));
    for (start, end) in pipes.iter().zip(ends) {
        let part = input[start + 1..end].trim();
        if part.is_empty() {
            return Err(GaugeError::parse_error("missing filter name after '|'"));
        }
        let (name, args) = match parse_call(part)? {
            Some(call) => call,
            None if is_identifier(part) => (part.to_string(), Vec::new()),
            None => return Err(GaugeError::parse_error(format!("invalid filter '{}'", part))),
        };
        expr = Expr::Filter(Box::new(expr), name, args);
    }
    Ok(expr)
}

fn parse_primary(input: &str) -> Result<Expr, GaugeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(GaugeError::parse_error("missing operand"));
    }

    if let Some(q) = input.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let content = input.strip_prefix(q).and_then(|s| s.strip_suffix(q));
        return match content {
            Some(s) if !s.contains(q) => Ok(Expr::StringLiteral(s.to_string())),
            _ => Err(GaugeError::parse_error(format!("unexpected text after string in '{}'", input))),
        };
    }

    if input.starts_with('(') && closes_at_end(input) {
        return parse_expr(&input[1..input.len() - 1]);
    }

    if let Some((name, args)) = parse_call(input)? {
        return Ok(Expr::FunctionCall(name, args));
    }

    if let Some(n) = parse_number(input) {
        return Ok(Expr::Number(n));
    }

    match input {
        "None" | "none" => return Ok(Expr::None),
        "True" | "true" => return Ok(Expr::Bool(true)),
        "False" | "false" => return Ok(Expr::Bool(false)),
        _ => {}
    }

    let parts: Vec<&str> = input.split('.').collect();
    if parts.iter().all(|p| is_identifier(p)) {
        return Ok(Expr::Variable(parts.into_iter().map(String::from).collect()));
    }

    Err(GaugeError::parse_error(format!("unexpected '{}'", input)))
}

/// `name(args)` spanning the whole input
fn parse_call(input: &str) -> Result<Option<(String, Vec<Expr>)>, GaugeError> {
    let Some(open) = input.find('(') else {
        return Ok(None);
    };
    let name = input[..open].trim();
    if !is_identifier(name) || !closes_at_end(&input[open..]) {
        return Ok(None);
    }
    let args = parse_args(&input[open + 1..input.len() - 1])?;
    Ok(Some((name.to_string(), args)))
}

/// Whether the bracket opening `input` is closed by its last char
fn closes_at_end(input: &str) -> bool {
    let mut depth = 0usize;
    let mut quote = None;
    for (i, c) in input.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' | '[' => depth += 1,
                ')' | ']' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return i + c.len_utf8() == input.len();
                    }
                }
                _ => {}
            },
        }
    }
    false
}

fn parse_args(input: &str) -> Result<Vec<Expr>, GaugeError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut args = Vec::new();
    let mut start = 0;
    for (pos, c, top) in scan(input) {
        if top && c == ',' {
            args.push(parse_expr(&input[start..pos])?);
            start = pos + 1;
        }
    }
    args.push(parse_expr(&input[start..])?);
    Ok(args)
}

fn parse_number(input: &str) -> Option<f64> {
    let first = input.chars().next()?;
    if !(first.is_ascii_digit() || first == '.' || first == '-') {
        return None;
    }
    input.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    fn text(s: &str) -> Expr {
        Expr::StringLiteral(s.to_string())
    }

    #[test]
    fn test_segments() {
        let t = parse("Grid: {{ 5 }} kW{# note #}!").unwrap();
        assert_eq!(t.segments.len(), 3);
        assert_eq!(t.segments[0], Segment::Text("Grid: ".to_string()));
        assert!(matches!(&t.segments[1], Segment::Expr { source, .. } if source == "5"));
        assert_eq!(t.segments[2], Segment::Text(" kW!".to_string()));
    }

    #[test]
    fn test_lone_braces_are_text() {
        let t = parse("a { b } c").unwrap();
        assert_eq!(t.segments, vec![Segment::Text("a { b } c".to_string())]);
    }

    #[test]
    fn test_closing_braces_inside_strings() {
        let t = parse("{{ '}}' }}").unwrap();
        assert_eq!(t.expressions().next(), Some(&text("}}")));
    }

    #[test]
    fn test_filter_chain() {
        let e = parse_expr("'sensor.grid_power' | watts | kilowatts('W')").unwrap();
        assert_eq!(e, Expr::Filter(
            Box::new(Expr::Filter(Box::new(text("sensor.grid_power")), "watts".to_string(), vec![])),
            "kilowatts".to_string(),
            vec![text("W")],
        ));
    }

    #[test]
    fn test_function_call_form() {
        let e = parse_expr("celsius(32, '°F')").unwrap();
        assert_eq!(e, Expr::FunctionCall("celsius".to_string(), vec![Expr::Number(32.0), text("°F")]));
    }

    #[test]
    fn test_units_with_operators_stay_strings() {
        let e = parse_expr("10 | gpm('L/min')").unwrap();
        assert_eq!(e, Expr::Filter(num(10.0), "gpm".to_string(), vec![text("L/min")]));
        let e = parse_expr("1 | joules('watt-hour')").unwrap();
        assert!(matches!(e, Expr::Filter(_, _, ref args) if args[0] == text("watt-hour")));
    }

    #[test]
    fn test_pipe_binds_tighter_than_arithmetic() {
        let e = parse_expr("x | watts('kW') * 2").unwrap();
        match e {
            Expr::BinaryOp(left, BinOp::Mul, right) => {
                assert!(matches!(*left, Expr::Filter(..)));
                assert_eq!(right, num(2.0));
            }
            other => panic!("Expected multiplication, got {:?}", other),
        }
    }

    #[test]
    fn test_arithmetic_precedence() {
        let e = parse_expr("1 + 2 * 3 - 4").unwrap();
        assert_eq!(e, Expr::BinaryOp(
            Box::new(Expr::BinaryOp(
                num(1.0),
                BinOp::Add,
                Box::new(Expr::BinaryOp(num(2.0), BinOp::Mul, num(3.0))),
            )),
            BinOp::Sub,
            num(4.0),
        ));
    }

    #[test]
    fn test_negative_numbers() {
        assert_eq!(parse_expr("-40").unwrap(), Expr::Number(-40.0));
        assert_eq!(parse_expr("2 * -3").unwrap(), Expr::BinaryOp(num(2.0), BinOp::Mul, num(-3.0)));
        assert_eq!(parse_expr("1e-3").unwrap(), Expr::Number(0.001));
        assert_eq!(
            parse_expr("-x").unwrap(),
            Expr::UnaryOp(UnaryOp::Neg, Box::new(Expr::Variable(vec!["x".to_string()]))),
        );
    }

    #[test]
    fn test_literals_and_variables() {
        assert_eq!(parse_expr("None").unwrap(), Expr::None);
        assert_eq!(parse_expr("true").unwrap(), Expr::Bool(true));
        assert_eq!(
            parse_expr("meter.power").unwrap(),
            Expr::Variable(vec!["meter".to_string(), "power".to_string()]),
        );
        assert_eq!(parse_expr("(5)").unwrap(), Expr::Number(5.0));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("{{ 5 ").is_err());
        assert!(parse("{# open").is_err());
        assert!(parse("{% if x %}").is_err());
        assert!(parse_expr("").is_err());
        assert!(parse_expr("watts(5").is_err());
        assert!(parse_expr("'open").is_err());
        assert!(parse_expr("5 |").is_err());
        assert!(parse_expr("5 | 7").is_err());
        assert!(parse_expr("a b").is_err());
    }

    #[test]
    fn test_error_position() {
        let err = parse("line one\n  {{ 5 | }}").unwrap_err();
        let ctx = err.context.unwrap();
        assert_eq!(ctx.line, Some(2));
        assert_eq!(ctx.column, Some(3));
    }
}
