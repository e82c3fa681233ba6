//! Domain errors callers may want to match on.
//!
//! Each is returned wrapped in `anyhow::Error`; recover it with
//! `err.downcast_ref::<CyclicDependencyError>()` and friends.

use std::fmt;

/// Feature dependencies form a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclicDependencyError {
    pub loop_features: Vec<String>,
}

impl fmt::Display for CyclicDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cyclic dependency detected among the following features: [{}]. Feature dependencies must be acyclic.",
            self.loop_features.join(", ")
        )
    }
}

impl std::error::Error for CyclicDependencyError {}

/// A transformation step failed while computing a feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformationError {
    pub feature: String,
    pub step: String,
    pub message: String,
}

impl fmt::Display for TransformationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "An error occurred during the transformation '{}' of feature '{}': {}",
            self.step, self.feature, self.message
        )
    }
}

impl std::error::Error for TransformationError {}

/// An infix expression could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    /// A character sequence that is not a token.
    Tokenize { expression: String, position: usize },
    /// Operators and operands do not alternate, or parentheses do not balance.
    Invalid(String),
    PositionalArguments(String),
    UnknownFunction(String),
    /// An argument literal could not be read.
    BadArgument { function: String, detail: String },
    /// A function was applied to something it cannot take.
    InvalidOperand(String),
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionError::Tokenize { expression, position } => write!(
                f,
                "Unexpected character at position {} in expression '{}'",
                position, expression
            ),
            ExpressionError::Invalid(expression) => {
                write!(f, "Invalid expression provided: '{}'", expression)
            }
            ExpressionError::PositionalArguments(function) => write!(
                f,
                "Positional arguments are not allowed. (in call to '{}')",
                function
            ),
            ExpressionError::UnknownFunction(function) => {
                write!(f, "Unknown transformation '{}' in expression", function)
            }
            ExpressionError::BadArgument { function, detail } => {
                write!(f, "Invalid argument in call to '{}': {}", function, detail)
            }
            ExpressionError::InvalidOperand(detail) => {
                write!(f, "Invalid operand for function: {}", detail)
            }
        }
    }
}

impl std::error::Error for ExpressionError {}
