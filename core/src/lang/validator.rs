//! Semantic validation for parsed snippets
//!
//! Catches mistakes the grammar cannot: calls to unknown helpers, wrong argument
//! counts, and helper namespaces used where a value is expected.

use super::ast::Expr;
use super::stdlib::{self, StdlibFunc};

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Call target is not `Namespace.Function`
    InvalidCallTarget,
    /// `Namespace.Function` does not exist
    UnknownFunction { name: String },
    /// Argument count outside the accepted range
    WrongArgumentCount {
        name: String,
        min: usize,
        max: Option<usize>,
        found: usize,
    },
    /// A helper namespace used as a value, e.g. `Math + 1`
    NamespaceAsValue { name: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidCallTarget => {
                write!(f, "Only Namespace.Function(...) calls are supported")
            }
            ValidationError::UnknownFunction { name } => {
                write!(f, "Unknown function '{}'", name)
            }
            ValidationError::WrongArgumentCount {
                name,
                min,
                max,
                found,
            } => match max {
                Some(max) if max == min => write!(
                    f,
                    "{}() takes {} argument(s), got {}",
                    name, min, found
                ),
                Some(max) => write!(
                    f,
                    "{}() takes {} to {} arguments, got {}",
                    name, min, max, found
                ),
                None => write!(
                    f,
                    "{}() takes at least {} argument(s), got {}",
                    name, min, found
                ),
            },
            ValidationError::NamespaceAsValue { name } => {
                write!(f, "'{}' is a helper namespace and cannot be used as a value", name)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = Result<T, ValidationError>;

/* ===================== Public API ===================== */

/// Validate an expression tree, stopping at the first problem
pub fn validate_expr(expr: &Expr) -> ValidationResult<()> {
    match expr {
        Expr::LitNull
        | Expr::LitBool { .. }
        | Expr::LitInt { .. }
        | Expr::LitFloat { .. }
        | Expr::LitStr { .. } => Ok(()),

        Expr::Ident { name } => {
            if stdlib::is_namespace(name) {
                Err(ValidationError::NamespaceAsValue { name: name.clone() })
            } else {
                Ok(())
            }
        }

        Expr::List { items } => items.iter().try_for_each(validate_expr),

        Expr::Member { object, .. } => validate_expr(object),

        Expr::Index { object, index } => {
            validate_expr(object)?;
            validate_expr(index)
        }

        Expr::Call { callee, args } => {
            validate_call(callee, args.len())?;
            args.iter().try_for_each(validate_expr)
        }

        Expr::Unary { operand, .. } => validate_expr(operand),

        Expr::Binary { left, right, .. } => {
            validate_expr(left)?;
            validate_expr(right)
        }

        Expr::Conditional {
            test,
            then_e,
            else_e,
        } => {
            validate_expr(test)?;
            validate_expr(then_e)?;
            validate_expr(else_e)
        }
    }
}

fn validate_call(callee: &Expr, arg_count: usize) -> ValidationResult<()> {
    let (namespace, name) = match callee {
        Expr::Member { object, property } => match object.as_ref() {
            Expr::Ident { name } => (name.as_str(), property.as_str()),
            _ => return Err(ValidationError::InvalidCallTarget),
        },
        _ => return Err(ValidationError::InvalidCallTarget),
    };

    let full_name = format!("{}.{}", namespace, name);
    let func = StdlibFunc::lookup(namespace, name)
        .ok_or(ValidationError::UnknownFunction {
            name: full_name.clone(),
        })?;

    if !func.accepts(arg_count) {
        let (min, max) = func.arity();
        return Err(ValidationError::WrongArgumentCount {
            name: full_name,
            min,
            max,
            found: arg_count,
        });
    }

    Ok(())
}
