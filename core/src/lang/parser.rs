//! PEST-based parser for snippet expressions
//!
//! Produces the AST consumed by the validator and the evaluator.

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

use super::ast::{BinaryOp, Expr, UnaryOp};

#[derive(Parser)]
#[grammar = "lang/grammar.pest"]
struct SnippetParser;

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    PestError(String),
    BuildError(String),
    /// Nesting or operator chains exceed what the recursive stages accept
    TooDeep { limit: usize },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::PestError(msg) => write!(f, "Syntax error: {}", msg),
            ParseError::BuildError(msg) => write!(f, "Invalid expression: {}", msg),
            ParseError::TooDeep { limit } => {
                write!(f, "Expression is nested too deeply (limit {})", limit)
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        ParseError::PestError(err.to_string())
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Deepest AST accepted; validation and evaluation recurse once per level
pub const MAX_DEPTH: usize = 256;

/// Most brackets plus ternaries accepted; each one is a recursion in the grammar
pub const MAX_NESTING: usize = 32;

/* ===================== Public API ===================== */

/// Parse a snippet into an expression AST
pub fn parse(source: &str) -> ParseResult<Expr> {
    check_nesting(source)?;

    let mut pairs = SnippetParser::parse(Rule::program, source)?;
    let program = next_pair(&mut pairs, "program")?;

    // program = { SOI ~ expression ~ ";"? ~ EOI }
    let mut inner = program.into_inner();
    let expression = next_pair(&mut inner, "expression")?;
    build_expression(expression)
}

/* ===================== Depth Limits ===================== */

/// Reject sources whose bracket nesting plus ternary count exceeds `MAX_NESTING`
///
/// Runs before pest, whose descent into `(`, `[` and `? :` is recursive.
/// String literals and comments are skipped.
fn check_nesting(source: &str) -> ParseResult<()> {
    let mut chars = source.chars().peekable();
    let mut depth = 0usize;
    let mut ternaries = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            chars.next();
                        }
                        '"' => break,
                        _ => {}
                    }
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '?' if chars.peek() == Some(&'?') => {
                chars.next();
            }
            '?' => ternaries += 1,
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ => continue,
        }

        if depth + ternaries > MAX_NESTING {
            return Err(ParseError::TooDeep {
                limit: MAX_NESTING,
            });
        }
    }

    Ok(())
}

/// Height of an expression tree, computed without recursion
pub fn expr_depth(expr: &Expr) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(expr, 1usize)];

    while let Some((expr, level)) = stack.pop() {
        deepest = deepest.max(level);
        let next = level + 1;
        match expr {
            Expr::LitNull
            | Expr::LitBool { .. }
            | Expr::LitInt { .. }
            | Expr::LitFloat { .. }
            | Expr::LitStr { .. }
            | Expr::Ident { .. } => {}
            Expr::List { items } => stack.extend(items.iter().map(|item| (item, next))),
            Expr::Member { object, .. } => stack.push((object, next)),
            Expr::Index { object, index } => {
                stack.push((object, next));
                stack.push((index, next));
            }
            Expr::Call { callee, args } => {
                stack.push((callee, next));
                stack.extend(args.iter().map(|arg| (arg, next)));
            }
            Expr::Unary { operand, .. } => stack.push((operand, next)),
            Expr::Binary { left, right, .. } => {
                stack.push((left, next));
                stack.push((right, next));
            }
            Expr::Conditional {
                test,
                then_e,
                else_e,
            } => {
                stack.push((test, next));
                stack.push((then_e, next));
                stack.push((else_e, next));
            }
        }
    }

    deepest
}

fn ensure_depth(depth: usize) -> ParseResult<usize> {
    if depth > MAX_DEPTH {
        return Err(ParseError::TooDeep { limit: MAX_DEPTH });
    }
    Ok(depth)
}

/* ===================== AST Builder ===================== */

fn next_pair<'a>(pairs: &mut Pairs<'a, Rule>, expected: &str) -> ParseResult<Pair<'a, Rule>> {
    pairs
        .next()
        .ok_or_else(|| ParseError::BuildError(format!("Expected {}", expected)))
}

fn build_expression(pair: Pair<Rule>) -> ParseResult<Expr> {
    match pair.as_rule() {
        Rule::expression | Rule::primary | Rule::literal => {
            let inner = next_pair(&mut pair.into_inner(), "operand")?;
            build_expression(inner)
        }
        Rule::conditional => build_conditional(pair),
        Rule::coalesce => build_fixed_chain(pair, BinaryOp::Coalesce),
        Rule::or_expr => build_fixed_chain(pair, BinaryOp::Or),
        Rule::and_expr => build_fixed_chain(pair, BinaryOp::And),
        Rule::equality | Rule::comparison | Rule::additive | Rule::multiplicative => {
            build_operator_chain(pair)
        }
        Rule::unary => build_unary(pair),
        Rule::postfix => build_postfix(pair),
        Rule::list => {
            let items = pair
                .into_inner()
                .map(build_expression)
                .collect::<ParseResult<Vec<_>>>()?;
            let list = Expr::List { items };
            ensure_depth(expr_depth(&list))?;
            Ok(list)
        }
        Rule::identifier => Ok(Expr::Ident {
            name: pair.as_str().to_string(),
        }),
        Rule::integer => {
            let text = pair.as_str();
            let v = text.parse::<i64>().map_err(|e| {
                ParseError::BuildError(format!("Integer literal '{}' out of range: {}", text, e))
            })?;
            Ok(Expr::LitInt { v })
        }
        Rule::float => {
            let text = pair.as_str();
            let v = text.parse::<f64>().map_err(|e| {
                ParseError::BuildError(format!("Failed to parse number '{}': {}", text, e))
            })?;
            Ok(Expr::LitFloat { v })
        }
        Rule::boolean => Ok(Expr::LitBool {
            v: pair.as_str() == "true",
        }),
        Rule::null_lit => Ok(Expr::LitNull),
        Rule::string => {
            // string = ${ "\"" ~ string_inner ~ "\"" }
            let content = next_pair(&mut pair.into_inner(), "string content")?;
            Ok(Expr::LitStr {
                v: unescape(content.as_str())?,
            })
        }
        _ => Err(ParseError::BuildError(format!(
            "Unexpected expression rule: {:?}",
            pair.as_rule()
        ))),
    }
}

fn build_conditional(pair: Pair<Rule>) -> ParseResult<Expr> {
    // conditional = { coalesce ~ ("?" ~ expression ~ ":" ~ expression)? }
    let mut inner = pair.into_inner();
    let test = build_expression(next_pair(&mut inner, "condition")?)?;

    match inner.next() {
        None => Ok(test),
        Some(then_pair) => {
            let then_e = build_expression(then_pair)?;
            let else_e = build_expression(next_pair(&mut inner, "else branch")?)?;
            let conditional = Expr::Conditional {
                test: Box::new(test),
                then_e: Box::new(then_e),
                else_e: Box::new(else_e),
            };
            ensure_depth(expr_depth(&conditional))?;
            Ok(conditional)
        }
    }
}

/// Left-fold a chain whose operator is implied by the rule (`??`, `||`, `&&`)
fn build_fixed_chain(pair: Pair<Rule>, op: BinaryOp) -> ParseResult<Expr> {
    let mut inner = pair.into_inner();
    let mut expr = build_expression(next_pair(&mut inner, "operand")?)?;
    let mut depth = expr_depth(&expr);

    for operand in inner {
        let right = build_expression(operand)?;
        depth = ensure_depth(depth.max(expr_depth(&right)) + 1)?;
        expr = Expr::Binary {
            op,
            left: Box::new(expr),
            right: Box::new(right),
        };
    }

    Ok(expr)
}

/// Left-fold a chain of `operand (op operand)*` where each operator is captured
fn build_operator_chain(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut inner = pair.into_inner();
    let mut expr = build_expression(next_pair(&mut inner, "operand")?)?;
    let mut depth = expr_depth(&expr);

    while let Some(op_pair) = inner.next() {
        let op = BinaryOp::from_symbol(op_pair.as_str()).ok_or_else(|| {
            ParseError::BuildError(format!("Unknown operator '{}'", op_pair.as_str()))
        })?;
        let right = build_expression(next_pair(&mut inner, "right operand")?)?;
        depth = ensure_depth(depth.max(expr_depth(&right)) + 1)?;
        expr = Expr::Binary {
            op,
            left: Box::new(expr),
            right: Box::new(right),
        };
    }

    Ok(expr)
}

fn build_unary(pair: Pair<Rule>) -> ParseResult<Expr> {
    // unary = { unary_op* ~ postfix }
    let mut ops = Vec::new();
    let mut operand_pair = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::unary_op => ops.push(if inner.as_str() == "-" {
                UnaryOp::Neg
            } else {
                UnaryOp::Not
            }),
            _ => operand_pair = Some(inner),
        }
    }

    let operand_pair = operand_pair
        .ok_or_else(|| ParseError::BuildError("Expected unary operand".to_string()))?;

    // A minus directly on an integer literal is part of the literal, so i64::MIN parses
    let mut expr = match (ops.last(), integer_literal(&operand_pair)) {
        (Some(UnaryOp::Neg), Some(digits)) => {
            ops.pop();
            let text = format!("-{}", digits);
            let v = text.parse::<i64>().map_err(|e| {
                ParseError::BuildError(format!("Integer literal '{}' out of range: {}", text, e))
            })?;
            Expr::LitInt { v }
        }
        _ => build_expression(operand_pair)?,
    };
    let mut depth = expr_depth(&expr);

    // Innermost operator binds first
    for op in ops.into_iter().rev() {
        expr = match (op, expr) {
            (UnaryOp::Neg, Expr::LitInt { v }) if v != i64::MIN => Expr::LitInt { v: -v },
            (UnaryOp::Neg, Expr::LitFloat { v }) => Expr::LitFloat { v: -v },
            (op, operand) => {
                depth = ensure_depth(depth + 1)?;
                Expr::Unary {
                    op,
                    operand: Box::new(operand),
                }
            }
        };
    }

    Ok(expr)
}

/// Digits of a postfix operand that is nothing but an integer literal
fn integer_literal<'a>(postfix: &Pair<'a, Rule>) -> Option<&'a str> {
    // postfix = { primary ~ (member | index | call)* }
    let mut inner = postfix.clone().into_inner();
    let primary = inner.next()?;
    if inner.next().is_some() {
        return None;
    }

    let literal = primary.into_inner().next()?;
    if literal.as_rule() != Rule::literal {
        return None;
    }

    let integer = literal.into_inner().next()?;
    (integer.as_rule() == Rule::integer).then(|| integer.as_str())
}

fn build_postfix(pair: Pair<Rule>) -> ParseResult<Expr> {
    // postfix = { primary ~ (member | index | call)* }
    let mut inner = pair.into_inner();
    let mut expr = build_expression(next_pair(&mut inner, "primary expression")?)?;
    let mut depth = expr_depth(&expr);

    // Chain accessors left-to-right
    for suffix in inner {
        expr = match suffix.as_rule() {
            Rule::member => {
                let property = next_pair(&mut suffix.into_inner(), "member name")?;
                depth = ensure_depth(depth + 1)?;
                Expr::Member {
                    object: Box::new(expr),
                    property: property.as_str().to_string(),
                }
            }
            Rule::index => {
                let index_pair = next_pair(&mut suffix.into_inner(), "index expression")?;
                let index = build_expression(index_pair)?;
                depth = ensure_depth(depth.max(expr_depth(&index)) + 1)?;
                Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                }
            }
            Rule::call => {
                let args = suffix
                    .into_inner()
                    .map(build_expression)
                    .collect::<ParseResult<Vec<_>>>()?;
                let widest = args.iter().map(expr_depth).max().unwrap_or(0);
                depth = ensure_depth(depth.max(widest) + 1)?;
                Expr::Call {
                    callee: Box::new(expr),
                    args,
                }
            }
            other => {
                return Err(ParseError::BuildError(format!(
                    "Unexpected postfix rule: {:?}",
                    other
                )))
            }
        };
    }

    Ok(expr)
}

fn unescape(raw: &str) -> ParseResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(c @ ('"' | '\\' | '/')) => out.push(c),
            other => {
                return Err(ParseError::BuildError(format!(
                    "Invalid escape sequence '\\{}'",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}
