//! Error types for SQL/JSON path execution

use thiserror::Error;

/// Result type alias for path execution operations
pub type Result<T> = std::result::Result<T, JsonPathError>;

/// Errors surfaced by SQL/JSON path execution.
///
/// Most variants correspond to the SQL/JSON error conditions and are
/// *suppressible*: silent-mode entry points turn them into an empty or
/// null result. Guard and usage errors (undefined variable, recursion
/// limit, interrupts, malformed programs) always propagate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JsonPathError {
    /// Structural error: an array accessor met a non-array
    #[error("SQL/JSON array not found: {detail}")]
    ArrayNotFound {
        /// What was being applied to what
        detail: String,
    },

    /// Structural error: an object accessor met a non-object
    #[error("SQL/JSON object not found: {detail}")]
    ObjectNotFound {
        /// What was being applied to what
        detail: String,
    },

    /// Structural error: a key accessor found no such member
    #[error("SQL/JSON member not found: {detail}")]
    MemberNotFound {
        /// The missing key, or the misapplied accessor
        detail: String,
    },

    /// A numeric operand was required but not found
    #[error("SQL/JSON number not found: {detail}")]
    NumberNotFound {
        /// The offending operator
        detail: String,
    },

    /// A scalar result was required
    #[error("SQL/JSON scalar required: {detail}")]
    ScalarRequired {
        /// What produced the composite
        detail: String,
    },

    /// A singleton item sequence was required
    #[error("singleton SQL/JSON item required: {detail}")]
    SingletonRequired {
        /// Which operand violated the rule
        detail: String,
    },

    /// A value could not be treated as a number
    #[error("non-numeric SQL/JSON item: {detail}")]
    NonNumericItem {
        /// Which method rejected the value
        detail: String,
    },

    /// An array subscript was malformed or out of bounds
    #[error("invalid SQL/JSON subscript: {detail}")]
    InvalidSubscript {
        /// Bound or type violation description
        detail: String,
    },

    /// Bad input to the `.datetime()` item method
    #[error("invalid argument for SQL/JSON datetime function: {detail}")]
    InvalidDatetimeArgument {
        /// Parse or argument-shape failure description
        detail: String,
    },

    /// A `$name` reference could not be resolved
    #[error("cannot find jsonpath variable '{name}'")]
    UndefinedVariable {
        /// The unresolved variable name
        name: String,
    },

    /// Division by zero in path arithmetic
    #[error("division by zero")]
    DivisionByZero,

    /// Numeric overflow in path arithmetic
    #[error("numeric overflow in jsonpath arithmetic")]
    NumericOverflow,

    /// A `like_regex` pattern failed to compile
    #[error("invalid regular expression in like_regex: {detail}")]
    InvalidRegex {
        /// Compiler message
        detail: String,
    },

    /// `last` used outside an array subscript
    #[error("evaluating jsonpath LAST outside of array subscript")]
    LastOutsideSubscript,

    /// A non-predicate node was evaluated in a boolean position
    #[error("jsonpath item cannot be evaluated as a predicate")]
    NotAPredicate,

    /// A predicate node carried a trailing accessor chain
    #[error("boolean jsonpath item cannot have next item")]
    PredicateWithTail,

    /// The recursion-depth ceiling was hit
    #[error("jsonpath recursion limit of {limit} exceeded")]
    RecursionLimitExceeded {
        /// The configured ceiling
        limit: usize,
    },

    /// The caller-installed interrupt hook fired
    #[error("jsonpath evaluation interrupted")]
    Interrupted,
}

impl JsonPathError {
    /// Create an array-not-found error
    pub fn array_not_found(detail: impl Into<String>) -> Self {
        Self::ArrayNotFound {
            detail: detail.into(),
        }
    }

    /// Create an object-not-found error
    pub fn object_not_found(detail: impl Into<String>) -> Self {
        Self::ObjectNotFound {
            detail: detail.into(),
        }
    }

    /// Create a member-not-found error
    pub fn member_not_found(detail: impl Into<String>) -> Self {
        Self::MemberNotFound {
            detail: detail.into(),
        }
    }

    /// Create a number-not-found error
    pub fn number_not_found(detail: impl Into<String>) -> Self {
        Self::NumberNotFound {
            detail: detail.into(),
        }
    }

    /// Create a scalar-required error
    pub fn scalar_required(detail: impl Into<String>) -> Self {
        Self::ScalarRequired {
            detail: detail.into(),
        }
    }

    /// Create a singleton-required error
    pub fn singleton_required(detail: impl Into<String>) -> Self {
        Self::SingletonRequired {
            detail: detail.into(),
        }
    }

    /// Create a non-numeric-item error
    pub fn non_numeric(detail: impl Into<String>) -> Self {
        Self::NonNumericItem {
            detail: detail.into(),
        }
    }

    /// Create an invalid-subscript error
    pub fn invalid_subscript(detail: impl Into<String>) -> Self {
        Self::InvalidSubscript {
            detail: detail.into(),
        }
    }

    /// Create an invalid-datetime-argument error
    pub fn invalid_datetime(detail: impl Into<String>) -> Self {
        Self::InvalidDatetimeArgument {
            detail: detail.into(),
        }
    }

    /// Create an undefined-variable error
    pub fn undefined_variable(name: impl Into<String>) -> Self {
        Self::UndefinedVariable { name: name.into() }
    }

    /// Create an invalid-regex error
    pub fn invalid_regex(detail: impl Into<String>) -> Self {
        Self::InvalidRegex {
            detail: detail.into(),
        }
    }

    /// Whether silent-mode entry points may swallow this error.
    ///
    /// Structural and value errors are suppressible; guard and usage
    /// errors are not.
    pub fn can_suppress(&self) -> bool {
        !matches!(
            self,
            Self::UndefinedVariable { .. }
                | Self::InvalidRegex { .. }
                | Self::LastOutsideSubscript
                | Self::NotAPredicate
                | Self::PredicateWithTail
                | Self::RecursionLimitExceeded { .. }
                | Self::Interrupted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = JsonPathError::member_not_found("JSON object does not contain key \"a\"");
        assert!(matches!(err, JsonPathError::MemberNotFound { .. }));

        let err = JsonPathError::singleton_required("left operand of +");
        assert!(matches!(err, JsonPathError::SingletonRequired { .. }));
    }

    #[test]
    fn test_suppressibility_split() {
        assert!(JsonPathError::array_not_found("x").can_suppress());
        assert!(JsonPathError::invalid_subscript("x").can_suppress());
        assert!(JsonPathError::DivisionByZero.can_suppress());

        assert!(!JsonPathError::undefined_variable("v").can_suppress());
        assert!(!JsonPathError::LastOutsideSubscript.can_suppress());
        assert!(!JsonPathError::RecursionLimitExceeded { limit: 64 }.can_suppress());
        assert!(!JsonPathError::Interrupted.can_suppress());
    }

    #[test]
    fn test_error_display() {
        let err = JsonPathError::array_not_found(
            "jsonpath wildcard array accessor can only be applied to an array",
        );
        let display = format!("{err}");
        assert!(display.starts_with("SQL/JSON array not found"));

        let err = JsonPathError::undefined_variable("missing");
        assert_eq!(format!("{err}"), "cannot find jsonpath variable 'missing'");
    }
}
