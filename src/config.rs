//! Engine configuration

use crate::error::ConfigError;
use crate::functions::{DropEmpty, DropSubsumed, WinnowPolicy};
use crate::psl::PublicSuffixIndex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default cap on the number of items a single list value may hold
pub const DEFAULT_MAX_LIST_ITEMS: usize = 10_000;

/// Built-in `winnow` policies selectable from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinnowKind {
    #[default]
    DropEmpty,
    DropSubsumed,
}

impl WinnowKind {
    #[must_use]
    pub fn policy(self) -> Arc<dyn WinnowPolicy> {
        match self {
            Self::DropEmpty => Arc::new(DropEmpty),
            Self::DropSubsumed => Arc::new(DropSubsumed),
        }
    }
}

/// Engine settings, read once at start-up.
///
/// ```json
/// {
///   "winnow": "drop_empty",
///   "max_list_items": 10000,
///   "public_suffix_list": "/usr/share/publicsuffix/public_suffix_list.dat",
///   "public_suffixes": ["com", "co.uk"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub winnow: WinnowKind,
    pub max_list_items: usize,

    /// File in public-suffix-list format
    pub public_suffix_list: Option<PathBuf>,

    /// Extra rules, added after the ones from `public_suffix_list`
    pub public_suffixes: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            winnow: WinnowKind::default(),
            max_list_items: DEFAULT_MAX_LIST_ITEMS,
            public_suffix_list: None,
            public_suffixes: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Load the suffix list file, if any, then the inline rules
    pub fn suffix_index(&self) -> Result<PublicSuffixIndex, ConfigError> {
        let mut list = match &self.public_suffix_list {
            Some(path) => std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?,
            None => String::new(),
        };
        for rule in &self.public_suffixes {
            list.push('\n');
            list.push_str(rule);
        }
        PublicSuffixIndex::parse(&list)
    }
}
