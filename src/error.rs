//! Error types.
//!
//! `EvalError` covers everything that can go wrong while evaluating a
//! formula. It never escapes the engine's outer boundary: the engine turns
//! it into a zero gain. `RuleError` covers loading rule data.

use thiserror::Error;

/// Errors raised while evaluating a compiled formula.
///
/// Syntax errors are recorded at compile time but only reported here, when
/// the formula is first evaluated.
///
/// # Examples
///
/// ```rust
/// use zztp::EvalError;
///
/// let err = EvalError::UnknownVariable("foo".to_string());
/// assert_eq!(err.to_string(), "unknown variable: foo");
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// The formula text could not be parsed.
    #[error("syntax error at byte {position}: {message}")]
    Syntax { position: usize, message: String },

    /// A bare identifier that is not one of the formula variables.
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    /// A property or method the battler (or `Math`) does not expose.
    #[error("unknown property: {0}")]
    UnknownProperty(String),

    /// A `Math` function outside the supported set.
    #[error("unknown function: Math.{0}")]
    UnknownFunction(String),

    /// A call on something that is not a method or function.
    #[error("expression is not callable: {0}")]
    NotCallable(String),

    /// Wrong number of arguments.
    #[error("{function} expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: usize,
        found: usize,
    },

    /// A battler or `Math` was used where a number was expected.
    #[error("{0} is not a number")]
    NotANumber(String),

    /// The formula produced NaN or an infinity.
    #[error("formula result is not a finite number")]
    NotFinite,

    /// Formulas re-entered maximum evaluation too deeply.
    #[error("formula recursion limit reached")]
    RecursionLimit,
}

/// Errors raised while loading rule data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuleError {
    /// The rule book or config could not be deserialized.
    #[error("invalid rule configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for RuleError {
    fn from(err: serde_json::Error) -> Self {
        RuleError::InvalidConfig(err.to_string())
    }
}
