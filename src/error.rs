//! Error types for script compilation, evaluation and configuration

use thiserror::Error;

/// Errors that can occur while turning raw message bytes into a [`crate::Message`]
#[derive(Error, Debug)]
pub enum ParseError {
    /// Failed to parse the email structure
    #[error("Failed to parse email structure: {0}")]
    Structure(String),

    /// Failed to decode email content
    #[error("Failed to decode content: {0}")]
    Decode(String),
}

/// Load-time errors: structural problems in a script.
///
/// These never depend on a message. A script that produces one cannot be
/// evaluated at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Malformed statement or expression text
    #[error("Syntax error at line {line}: {details}")]
    Syntax { line: usize, details: String },

    /// Malformed expression inside a statement
    #[error("Invalid expression: {0}")]
    Expression(String),

    /// The error happened inside a specific statement
    #[error("In statement #{index} \"{name}\": {source}")]
    Statement {
        index: usize,
        name: String,
        #[source]
        source: Box<CompileError>,
    },

    /// Call to a function the library does not provide
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Function {name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    /// `[*]` or `[n]` applied to something that is not a list
    #[error("Cannot index a non-list value in path {0}")]
    WildcardOnScalar(String),

    /// Path names a root or field that does not exist
    #[error("Unknown field {field} in path {path}")]
    UnknownField { path: String, field: String },

    /// Path stops at a structured node instead of a value
    #[error("Path {0} does not select a value")]
    NotAValue(String),

    /// Union mixing addresses with text, or records with values
    #[error("Fields in union {0} have incompatible types")]
    IncompatibleUnion(String),

    /// Reference to a binding that has not been defined yet
    #[error("Undefined name: {0}")]
    UndefinedName(String),

    /// Argument with the wrong shape
    #[error("Function {name} argument {position} must be a {expected}")]
    ArgumentType {
        name: String,
        position: usize,
        expected: &'static str,
    },

    /// Selector argument that must be a literal from a fixed set
    #[error("Function {name} does not accept option '{value}'")]
    InvalidOption { name: String, value: String },
}

impl CompileError {
    #[must_use]
    pub fn in_statement(self, index: usize, name: &str) -> Self {
        Self::Statement {
            index,
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}

/// Run-time errors: a single binding could not be produced for a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// The path reached a record the transport layer flagged as malformed
    #[error("Malformed {record} record: {reason}")]
    MalformedRecord {
        record: &'static str,
        reason: String,
    },

    /// A list grew beyond the configured limit
    #[error("List with {len} items exceeds the limit of {limit}")]
    LimitExceeded { len: usize, limit: usize },

    /// The caller stopped evaluation at a checkpoint
    #[error("Evaluation interrupted after statement #{after}")]
    Interrupted { after: usize },
}

/// Errors while loading engine configuration or the public-suffix list
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid public suffix rule at line {line}: {rule}")]
    InvalidSuffixRule { line: usize, rule: String },
}

/// Result type for message parsing operations
pub type Result<T> = std::result::Result<T, ParseError>;
