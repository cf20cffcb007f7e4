//! Structured errors for template authors and tooling
//!
//! Errors never crash rendering. They are values that travel through
//! evaluation and carry clear, actionable information.

use serde::{Deserialize, Serialize};

/// Standard error codes (machine-readable)
pub mod codes {
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const UNDEFINED_VAR: &str = "UNDEFINED_VAR";
    pub const UNDEFINED_FUNC: &str = "UNDEFINED_FUNC";
    pub const UNDEFINED_FIELD: &str = "UNDEFINED_FIELD";
    pub const TYPE_ERROR: &str = "TYPE_ERROR";
    pub const DIV_ZERO: &str = "DIV_ZERO";
    pub const ARG_COUNT: &str = "ARG_COUNT";
    pub const ARG_TYPE: &str = "ARG_TYPE";
    // Conversion-specific error codes
    pub const MISSING_UNIT: &str = "MISSING_UNIT";
    pub const UNRECOGNIZED_UNIT: &str = "UNRECOGNIZED_UNIT";
    pub const UNRESOLVED_REFERENCE: &str = "UNRESOLVED_REFERENCE";
    pub const NOT_NUMERIC: &str = "NOT_NUMERIC";
    pub const INCOMPATIBLE_UNITS: &str = "INCOMPATIBLE_UNITS";
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
}

/// Severity level of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Rendering continued with a degraded result
    Warning,
    /// The expression failed
    Error,
    /// The template cannot be rendered
    Fatal,
}

/// Context about where an error occurred
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Expression text that caused the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    /// Line number in the template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    /// Column number in the template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,

    /// Propagation notes
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

/// Structured error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaugeError {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Suggestion for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Where the error occurred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,

    /// Severity level
    pub severity: Severity,
}

impl GaugeError {
    /// Create a new error
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
            context: None,
            severity: Severity::Error,
        }
    }

    /// Builder: add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Builder: add context
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Builder: set expression context
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.expression = Some(expression.into());
        self
    }

    /// Builder: set line/column context
    pub fn at(mut self, line: usize, column: usize) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.line = Some(line);
        ctx.column = Some(column);
        self
    }

    /// Builder: add propagation note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.notes.push(note.into());
        self
    }

    /// Builder: set severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    // ========== Common Error Constructors ==========

    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::new(codes::PARSE_ERROR, format!("Parse error: {}", details.into()))
            .with_suggestion("Check template syntax")
            .with_severity(Severity::Fatal)
    }

    pub fn undefined_var(name: &str) -> Self {
        Self::new(codes::UNDEFINED_VAR, format!("Undefined variable: {}", name))
            .with_suggestion(format!("Define '{}' or quote it if it is an entity id", name))
    }

    pub fn undefined_func(name: &str) -> Self {
        Self::new(codes::UNDEFINED_FUNC, format!("Unknown filter: {}", name))
            .with_suggestion("Use help() to list available filters")
    }

    pub fn undefined_field(name: &str) -> Self {
        Self::new(codes::UNDEFINED_FIELD, format!("Undefined field: {}", name))
    }

    pub fn type_error(expected: &str, got: &str) -> Self {
        Self::new(codes::TYPE_ERROR, format!("Expected {}, got {}", expected, got))
    }

    pub fn div_zero() -> Self {
        Self::new(codes::DIV_ZERO, "Division by zero")
    }

    pub fn arg_count(func: &str, expected: usize, got: usize) -> Self {
        Self::new(codes::ARG_COUNT,
            format!("{}() expects {} arguments, got {}", func, expected, got))
            .with_suggestion(format!("Use help('{}') for usage", func))
    }

    pub fn arg_type(func: &str, arg: &str, expected: &str, got: &str) -> Self {
        Self::new(codes::ARG_TYPE,
            format!("{}() argument '{}': expected {}, got {}", func, arg, expected, got))
    }

    pub fn config_error(details: impl Into<String>) -> Self {
        Self::new(codes::CONFIG_ERROR, format!("Configuration error: {}", details.into()))
            .with_severity(Severity::Fatal)
    }
}

impl std::fmt::Display for GaugeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for GaugeError {}

/// Errors compare by code and message; context and suggestions are advisory.
impl PartialEq for GaugeError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message
    }
}
