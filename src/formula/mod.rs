//! Formula compiler module.
//!
//! Turns authored formula text into a [`CompiledFormula`]. Compilation
//! never fails: a syntax error is kept inside the compiled value and
//! reported when the formula is evaluated, so a broken formula behaves like
//! any other failing formula at the engine boundary.

pub mod eval;
pub mod lexer;
pub mod parser;

pub use eval::{FormulaScope, Role};
pub use parser::MAX_EXPR_DEPTH;

use crate::error::EvalError;
use parser::Expr;
use std::sync::Arc;

/// A formula ready for evaluation.
///
/// # Examples
///
/// ```rust
/// use zztp::formula::{CompiledFormula, FormulaScope, Role};
/// use zztp::EvalError;
///
/// struct Fixed;
///
/// impl FormulaScope for Fixed {
///     fn value(&self) -> f64 { 40.0 }
///     fn property(&self, _: Role, name: &str) -> Result<f64, EvalError> {
///         match name {
///             "mhp" => Ok(200.0),
///             "tcr" => Ok(1.0),
///             _ => Err(EvalError::UnknownProperty(name.to_string())),
///         }
///     }
///     fn call(&self, _: Role, name: &str, _: &[f64]) -> Result<f64, EvalError> {
///         Err(EvalError::UnknownProperty(name.to_string()))
///     }
/// }
///
/// let formula = CompiledFormula::compile("Math.min(16, value * 100 / target.mhp) * user.tcr");
/// assert_eq!(formula.evaluate(&Fixed), Ok(16.0));
///
/// let broken = CompiledFormula::compile("value +");
/// assert!(!broken.is_valid());
/// assert!(broken.evaluate(&Fixed).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct CompiledFormula {
    source: Arc<str>,
    program: Result<Expr, EvalError>,
}

impl CompiledFormula {
    /// Compile formula text. Blank text compiles to the zero formula.
    pub fn compile(text: &str) -> Self {
        if text.trim().is_empty() {
            return Self::zero();
        }
        Self {
            source: Arc::from(text),
            program: parser::parse(text),
        }
    }

    /// The formula that always evaluates to 0.
    pub fn zero() -> Self {
        Self {
            source: Arc::from("0"),
            program: Ok(Expr::Number(0.0)),
        }
    }

    /// The text this formula was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns `true` if the text parsed.
    pub fn is_valid(&self) -> bool {
        self.program.is_ok()
    }

    /// The syntax error recorded at compile time, if any.
    pub fn syntax_error(&self) -> Option<&EvalError> {
        self.program.as_ref().err()
    }

    /// Evaluate against a scope.
    ///
    /// NaN and infinite results are reported as [`EvalError::NotFinite`].
    pub fn evaluate(&self, scope: &dyn FormulaScope) -> Result<f64, EvalError> {
        let expr = self.program.as_ref().map_err(EvalError::clone)?;
        let result = eval::evaluate(expr, scope)?;
        if result.is_finite() {
            Ok(result)
        } else {
            Err(EvalError::NotFinite)
        }
    }
}

impl Default for CompiledFormula {
    fn default() -> Self {
        Self::zero()
    }
}
