//! Expression evaluation
//!
//! Walks the AST against a bound context and produces a value or a fault.
//! Evaluation never mutates the AST or the context, so one compiled expression
//! can be evaluated from any number of threads at once.

use std::cmp::Ordering;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::stdlib::{self, StdlibFunc};
use super::values::Val;
use crate::error::RuntimeFault;

/// Identifier that names the whole context value
pub const CONTEXT_IDENT: &str = "Context";

pub type EvalResult = Result<Val, RuntimeFault>;

/// Evaluation environment: the bound context
pub struct Env<'a> {
    context: &'a Val,
}

impl<'a> Env<'a> {
    pub fn new(context: &'a Val) -> Self {
        Self { context }
    }

    /// Resolve a bare identifier
    ///
    /// `Context` is the whole context; top-level fields of an object context are
    /// visible as globals.
    fn lookup(&self, name: &str) -> EvalResult {
        if name == CONTEXT_IDENT {
            return Ok(self.context.clone());
        }
        match self.context {
            Val::Obj(fields) => fields
                .get(name)
                .cloned()
                .ok_or_else(|| fault(format!("Unknown identifier '{}'", name))),
            _ => Err(fault(format!("Unknown identifier '{}'", name))),
        }
    }
}

/// Evaluate an expression to a value
pub fn eval_expr(expr: &Expr, env: &Env) -> EvalResult {
    match expr {
        Expr::LitNull => Ok(Val::Null),
        Expr::LitBool { v } => Ok(Val::Bool(*v)),
        Expr::LitInt { v } => Ok(Val::Int(*v)),
        Expr::LitFloat { v } => Ok(Val::Float(*v)),
        Expr::LitStr { v } => Ok(Val::Str(v.clone())),

        Expr::List { items } => items
            .iter()
            .map(|item| eval_expr(item, env))
            .collect::<Result<Vec<_>, _>>()
            .map(Val::List),

        Expr::Ident { name } => env.lookup(name),

        Expr::Member { object, property } => {
            let object = eval_expr(object, env)?;
            member(object, property)
        }

        Expr::Index { object, index } => {
            let object = eval_expr(object, env)?;
            let index = eval_expr(index, env)?;
            index_into(object, &index)
        }

        Expr::Call { callee, args } => {
            let func = resolve_callee(callee)?;
            let args = args
                .iter()
                .map(|arg| eval_expr(arg, env))
                .collect::<Result<Vec<_>, _>>()?;
            stdlib::call_stdlib_func(func, &args)
        }

        Expr::Unary { op, operand } => {
            let operand = eval_expr(operand, env)?;
            unary(*op, operand)
        }

        Expr::Binary { op, left, right } => match op {
            // Short-circuiting operators evaluate the right side lazily
            BinaryOp::And | BinaryOp::Or => {
                let left = expect_bool(eval_expr(left, env)?, *op)?;
                if (*op == BinaryOp::And) != left {
                    return Ok(Val::Bool(left));
                }
                let right = expect_bool(eval_expr(right, env)?, *op)?;
                Ok(Val::Bool(right))
            }
            BinaryOp::Coalesce => match eval_expr(left, env)? {
                Val::Null => eval_expr(right, env),
                value => Ok(value),
            },
            _ => {
                let left = eval_expr(left, env)?;
                let right = eval_expr(right, env)?;
                binary(*op, left, right)
            }
        },

        Expr::Conditional {
            test,
            then_e,
            else_e,
        } => match eval_expr(test, env)? {
            Val::Bool(true) => eval_expr(then_e, env),
            Val::Bool(false) => eval_expr(else_e, env),
            other => Err(fault(format!(
                "Condition must be a bool, got {}",
                other.type_name()
            ))),
        },
    }
}

/// Resolve a call target of the form `Namespace.Function`
pub(crate) fn resolve_callee(callee: &Expr) -> Result<StdlibFunc, RuntimeFault> {
    if let Expr::Member { object, property } = callee {
        if let Expr::Ident { name } = object.as_ref() {
            if let Some(func) = StdlibFunc::lookup(name, property) {
                return Ok(func);
            }
            return Err(fault(format!("Unknown function '{}.{}'", name, property)));
        }
    }
    Err(fault("Only Namespace.Function(...) calls are supported"))
}

/* ===================== Access ===================== */

fn member(object: Val, property: &str) -> EvalResult {
    match (object, property) {
        (Val::Str(s), "Length") => Ok(Val::Int(s.chars().count() as i64)),
        (Val::List(items), "Length" | "Count") => Ok(Val::Int(items.len() as i64)),
        (Val::Obj(mut fields), _) => fields
            .remove(property)
            .ok_or_else(|| fault(format!("Object has no member '{}'", property))),
        (Val::Null, _) => Err(fault(format!(
            "Cannot read member '{}' of null",
            property
        ))),
        (other, _) => Err(fault(format!(
            "Cannot read member '{}' of {}",
            property,
            other.type_name()
        ))),
    }
}

fn index_into(object: Val, index: &Val) -> EvalResult {
    match (object, index) {
        (Val::List(mut items), Val::Int(i)) => {
            let len = items.len();
            usize::try_from(*i)
                .ok()
                .filter(|i| *i < len)
                .map(|i| items.swap_remove(i))
                .ok_or_else(|| fault(format!("Index {} out of range for list of length {}", i, len)))
        }
        (Val::Str(s), Val::Int(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| s.chars().nth(i))
            .map(|c| Val::Str(c.to_string()))
            .ok_or_else(|| fault(format!("Index {} out of range for string", i))),
        (Val::Obj(mut fields), Val::Str(key)) => fields
            .remove(key)
            .ok_or_else(|| fault(format!("Object has no member '{}'", key))),
        (Val::Null, _) => Err(fault("Cannot index into null")),
        (object, index) => Err(fault(format!(
            "Cannot index {} with {}",
            object.type_name(),
            index.type_name()
        ))),
    }
}

/* ===================== Operators ===================== */

fn unary(op: UnaryOp, operand: Val) -> EvalResult {
    match (op, operand) {
        (UnaryOp::Neg, Val::Int(i)) => i
            .checked_neg()
            .map(Val::Int)
            .ok_or_else(|| fault("Integer overflow in negation")),
        (UnaryOp::Neg, Val::Float(f)) => Ok(Val::Float(-f)),
        (UnaryOp::Not, Val::Bool(b)) => Ok(Val::Bool(!b)),
        (op, other) => Err(fault(format!(
            "Operator '{}' cannot be applied to {}",
            op,
            other.type_name()
        ))),
    }
}

fn binary(op: BinaryOp, left: Val, right: Val) -> EvalResult {
    match op {
        BinaryOp::Eq => Ok(Val::Bool(left.loosely_equals(&right))),
        BinaryOp::Ne => Ok(Val::Bool(!left.loosely_equals(&right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&left, &right, op)?;
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Val::Bool(result))
        }
        BinaryOp::Add if matches!(left, Val::Str(_)) || matches!(right, Val::Str(_)) => {
            Ok(Val::Str(format!("{}{}", left, right)))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            arithmetic(op, left, right)
        }
        BinaryOp::And | BinaryOp::Or | BinaryOp::Coalesce => Err(fault(format!(
            "Operator '{}' must be evaluated lazily",
            op
        ))),
    }
}

fn arithmetic(op: BinaryOp, left: Val, right: Val) -> EvalResult {
    if let (Val::Int(a), Val::Int(b)) = (&left, &right) {
        let (a, b) = (*a, *b);
        if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0 {
            return Err(fault("Division by zero"));
        }
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div => a.checked_div(b),
            _ => a.checked_rem(b),
        };
        return result
            .map(Val::Int)
            .ok_or_else(|| fault(format!("Integer overflow in {} {} {}", a, op, b)));
    }

    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => {
            if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0.0 {
                return Err(fault("Division by zero"));
            }
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            };
            Ok(Val::Float(result))
        }
        _ => Err(fault(format!(
            "Operator '{}' cannot be applied to {} and {}",
            op,
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn compare(left: &Val, right: &Val, op: BinaryOp) -> Result<Ordering, RuntimeFault> {
    match (left, right) {
        (Val::Int(a), Val::Int(b)) => Ok(a.cmp(b)),
        (Val::Str(a), Val::Str(b)) => Ok(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a
                .partial_cmp(&b)
                .ok_or_else(|| fault("Cannot compare NaN")),
            _ => Err(fault(format!(
                "Operator '{}' cannot compare {} and {}",
                op,
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

fn expect_bool(value: Val, op: BinaryOp) -> Result<bool, RuntimeFault> {
    match value {
        Val::Bool(b) => Ok(b),
        other => Err(fault(format!(
            "Operator '{}' requires bool operands, got {}",
            op,
            other.type_name()
        ))),
    }
}

fn fault(message: impl Into<String>) -> RuntimeFault {
    RuntimeFault::evaluation(message)
}
