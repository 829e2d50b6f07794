//! Binding evaluation results

use crate::error::EvalError;
use crate::value::Value;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

/// Append-only record of the bindings produced while evaluating one message.
///
/// Every name owns a slot fixed at compile time. Rebinding a name appends a
/// new entry and moves the slot to it; earlier entries are never touched.
#[derive(Debug, Clone, Default)]
pub struct BindingLog {
    entries: Vec<(usize, Value)>,
    latest: Vec<Option<usize>>,
}

impl BindingLog {
    pub(crate) fn with_slots(slots: usize) -> Self {
        Self {
            entries: Vec::new(),
            latest: vec![None; slots],
        }
    }

    /// Newest value bound to `slot`
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&Value> {
        let entry = (*self.latest.get(slot)?)?;
        self.entries.get(entry).map(|(_, value)| value)
    }

    pub(crate) fn push(&mut self, slot: usize, value: Value) {
        if slot >= self.latest.len() {
            self.latest.resize(slot + 1, None);
        }
        self.latest[slot] = Some(self.entries.len());
        self.entries.push((slot, value));
    }

    /// Number of bindings made, rebinds included
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Progress of a single statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementState {
    Pending,
    Resolving,
    Bound,
    Failed,
}

/// Passed to the checkpoint after each statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementReport<'x> {
    /// Position of the statement in the script, from zero
    pub index: usize,
    pub name: &'x str,
    pub state: StatementState,
}

/// A statement that could not produce its value for this message.
///
/// The name is still bound, to the absent value of its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub index: usize,
    pub name: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: EvalError,
}

fn serialize_display<S: Serializer>(error: &EvalError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Final value of every name bound by a script, in order of first binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    features: Vec<(String, Value)>,
    failures: Vec<Failure>,
}

impl FeatureSet {
    pub(crate) fn new(features: Vec<(String, Value)>, failures: Vec<Failure>) -> Self {
        Self { features, failures }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.features
            .iter()
            .find(|(feature, _)| feature == name)
            .map(|(_, value)| value)
    }

    /// Names and values in order of first binding
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.features
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.features.iter().map(|(name, _)| name.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Statements that failed for this message
    #[must_use]
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Serialize the features as a JSON object
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&Features(&self.features))
    }
}

struct Features<'x>(&'x [(String, Value)]);

impl Serialize for Features<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for FeatureSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FeatureSet", 2)?;
        state.serialize_field("features", &Features(&self.features))?;
        state.serialize_field("failures", &self.failures)?;
        state.end()
    }
}
