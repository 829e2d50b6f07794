//! Values exchanged between expressions

use serde::{Deserialize, Serialize};
use std::fmt;

/// A feature value: a single string or an ordered list of strings.
///
/// The empty string and the empty list are the only "absent" values; there
/// is no null.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(String),
    List(Vec<String>),
}

/// Static shape of a value, known when a script is compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Scalar,
    List,
}

impl Shape {
    /// The absent value of this shape
    #[must_use]
    pub const fn absent(self) -> Value {
        match self {
            Self::Scalar => Value::Scalar(String::new()),
            Self::List => Value::List(Vec::new()),
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scalar => "string",
            Self::List => "list",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Scalar(String::new())
    }
}

impl Value {
    #[must_use]
    pub const fn shape(&self) -> Shape {
        match self {
            Self::Scalar(_) => Shape::Scalar,
            Self::List(_) => Shape::List,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Scalar(s) => s.is_empty(),
            Self::List(l) => l.is_empty(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::List(_) => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(l) => Some(l),
            Self::Scalar(_) => None,
        }
    }

    /// Scalar as-is, list joined with spaces
    #[must_use]
    pub fn into_string(self) -> String {
        match self {
            Self::Scalar(s) => s,
            Self::List(l) => l.join(" "),
        }
    }

    /// List as-is; a non-empty scalar becomes a one-item list, an empty one
    /// becomes the empty list
    #[must_use]
    pub fn into_list(self) -> Vec<String> {
        match self {
            Self::List(l) => l,
            Self::Scalar(s) if s.is_empty() => Vec::new(),
            Self::Scalar(s) => vec![s],
        }
    }

    /// Apply `f` to the scalar, or to every list item
    #[must_use]
    pub fn map(self, f: impl Fn(String) -> String) -> Self {
        match self {
            Self::Scalar(s) => Self::Scalar(f(s)),
            Self::List(l) => Self::List(l.into_iter().map(f).collect()),
        }
    }

    /// Number of strings held
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(s) => usize::from(!s.is_empty()),
            Self::List(l) => l.len(),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for Value {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_string).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{s}"),
            Self::List(l) => write!(f, "[{}]", l.join(", ")),
        }
    }
}
