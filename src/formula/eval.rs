//! Formula interpreter.
//!
//! Walks an [`Expr`] tree against a [`FormulaScope`]. All arithmetic is
//! `f64`; booleans are 1 and 0. Battlers and `Math` are only valid as the
//! object of a property access or method call.

use super::parser::{BinaryOp, Expr, UnaryOp};
use crate::error::EvalError;

/// Which battler a formula refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The battler gaining TP (`user`, `a`).
    User,
    /// The other battler involved in the event (`target`, `b`).
    Target,
}

/// The values a formula can read.
///
/// The engine implements this over live battlers; tests and tools can
/// implement it over plain data.
pub trait FormulaScope {
    /// The event payload bound to `value`, `damage` and `heal`.
    fn value(&self) -> f64;

    /// Read `user.<name>` or `target.<name>`.
    fn property(&self, role: Role, name: &str) -> Result<f64, EvalError>;

    /// Call `user.<name>(args)` or `target.<name>(args)`.
    fn call(&self, role: Role, name: &str, args: &[f64]) -> Result<f64, EvalError>;
}

enum Value {
    Number(f64),
    Battler(Role),
    Math,
}

/// Evaluate an expression to a number.
///
/// Intermediate NaN and infinities are allowed; callers decide whether
/// the final result is acceptable.
pub fn evaluate(expr: &Expr, scope: &dyn FormulaScope) -> Result<f64, EvalError> {
    number(expr, scope)
}

fn number(expr: &Expr, scope: &dyn FormulaScope) -> Result<f64, EvalError> {
    match value(expr, scope)? {
        Value::Number(n) => Ok(n),
        Value::Battler(_) | Value::Math => Err(EvalError::NotANumber(expr.describe())),
    }
}

fn truthy(n: f64) -> bool {
    n != 0.0 && !n.is_nan()
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn value(expr: &Expr, scope: &dyn FormulaScope) -> Result<Value, EvalError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Ident(name) => identifier(name, scope),
        Expr::Member { object, property } => match value(object, scope)? {
            Value::Battler(role) => scope.property(role, property).map(Value::Number),
            Value::Math => math_constant(property).map(Value::Number),
            Value::Number(_) => Err(EvalError::UnknownProperty(format!(
                "{}.{}",
                object.describe(),
                property
            ))),
        },
        Expr::Call { callee, args } => call(callee, args, scope).map(Value::Number),
        Expr::Unary { op, operand } => {
            let n = number(operand, scope)?;
            Ok(Value::Number(match op {
                UnaryOp::Neg => -n,
                UnaryOp::Plus => n,
                UnaryOp::Not => flag(!truthy(n)),
            }))
        }
        Expr::Binary { op, lhs, rhs } => binary(*op, lhs, rhs, scope).map(Value::Number),
        Expr::Conditional {
            condition,
            then_branch,
            else_branch,
        } => {
            if truthy(number(condition, scope)?) {
                value(then_branch, scope)
            } else {
                value(else_branch, scope)
            }
        }
    }
}

fn identifier(name: &str, scope: &dyn FormulaScope) -> Result<Value, EvalError> {
    match name {
        "user" | "a" => Ok(Value::Battler(Role::User)),
        "target" | "b" => Ok(Value::Battler(Role::Target)),
        "value" | "damage" | "heal" => Ok(Value::Number(scope.value())),
        "Math" => Ok(Value::Math),
        _ => Err(EvalError::UnknownVariable(name.to_string())),
    }
}

fn binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, scope: &dyn FormulaScope) -> Result<f64, EvalError> {
    let left = number(lhs, scope)?;
    // Logical operators return an operand and skip the right side when decided.
    match op {
        BinaryOp::And if !truthy(left) => return Ok(left),
        BinaryOp::Or if truthy(left) => return Ok(left),
        _ => {}
    }
    let right = number(rhs, scope)?;
    Ok(match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => left / right,
        BinaryOp::Rem => left % right,
        BinaryOp::Pow => left.powf(right),
        BinaryOp::Less => flag(left < right),
        BinaryOp::LessEq => flag(left <= right),
        BinaryOp::Greater => flag(left > right),
        BinaryOp::GreaterEq => flag(left >= right),
        BinaryOp::Eq => flag(left == right),
        BinaryOp::NotEq => flag(left != right),
        BinaryOp::And | BinaryOp::Or => right,
    })
}

fn call(callee: &Expr, args: &[Expr], scope: &dyn FormulaScope) -> Result<f64, EvalError> {
    let Expr::Member { object, property } = callee else {
        return Err(EvalError::NotCallable(callee.describe()));
    };
    let target = value(object, scope)?;
    let args = args
        .iter()
        .map(|arg| number(arg, scope))
        .collect::<Result<Vec<_>, _>>()?;
    match target {
        Value::Battler(role) => scope.call(role, property, &args),
        Value::Math => math_function(property, &args),
        Value::Number(_) => Err(EvalError::NotCallable(callee.describe())),
    }
}

fn math_constant(name: &str) -> Result<f64, EvalError> {
    match name {
        "PI" => Ok(std::f64::consts::PI),
        "E" => Ok(std::f64::consts::E),
        _ => Err(EvalError::UnknownProperty(format!("Math.{name}"))),
    }
}

fn math_function(name: &str, args: &[f64]) -> Result<f64, EvalError> {
    let unary = |f: fn(f64) -> f64| -> Result<f64, EvalError> {
        match args {
            [x] => Ok(f(*x)),
            _ => Err(EvalError::Arity {
                function: format!("Math.{name}"),
                expected: 1,
                found: args.len(),
            }),
        }
    };
    // A NaN argument makes min/max NaN, as in JavaScript.
    if matches!(name, "min" | "max") && args.iter().any(|x| x.is_nan()) {
        return Ok(f64::NAN);
    }
    match name {
        // Empty min/max yield an infinity.
        "min" => Ok(args.iter().copied().fold(f64::INFINITY, f64::min)),
        "max" => Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        "floor" => unary(f64::floor),
        "ceil" => unary(f64::ceil),
        "round" => unary(|x| (x + 0.5).floor()),
        "trunc" => unary(f64::trunc),
        "abs" => unary(f64::abs),
        "sqrt" => unary(f64::sqrt),
        "sign" => unary(|x| if x == 0.0 || x.is_nan() { x } else { x.signum() }),
        "pow" => match args {
            [base, exp] => Ok(base.powf(*exp)),
            _ => Err(EvalError::Arity {
                function: "Math.pow".to_string(),
                expected: 2,
                found: args.len(),
            }),
        },
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}
