use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    /// The selector resolved to an empty set.
    #[error("{description} returned no nodes.")]
    NoMatchingElement { description: String },

    /// The selector matched elements, but none of them is currently rendered.
    #[error("{description} returned {count} nodes, but no nodes were visible.")]
    NoVisibleElement { description: String, count: usize },

    /// A wait condition never held within its timeout, or evaluating it failed.
    #[error("{}", .message.as_deref().unwrap_or("Condition was not satisfied"))]
    ConditionTimeout {
        message: Option<String>,
        #[source]
        cause: Box<AutomationError>,
    },

    #[error("Type mismatch: expected element of type {expected}, but resolved {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Ambiguous match: {description} returned {count} nodes, expected exactly one")]
    AmbiguousMatch { description: String, count: usize },

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("{0}")]
    AssertionFailed(String),

    #[error("Interaction failed: {source}")]
    Interaction {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Platform-specific error: {0}")]
    PlatformError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AutomationError {
    /// Shorthand for the argument-validation error raised at call boundaries.
    pub fn invalid_argument(name: &str, problem: &str) -> Self {
        AutomationError::InvalidArgument(format!("Argument '{name}' {problem}"))
    }

    /// Returns the wrapped cause of a `ConditionTimeout`, if this is one.
    pub fn condition_cause(&self) -> Option<&AutomationError> {
        match self {
            AutomationError::ConditionTimeout { cause, .. } => Some(cause),
            _ => None,
        }
    }
}
