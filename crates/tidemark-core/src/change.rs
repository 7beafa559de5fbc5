use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::action::ChangeAction;

/// A single typed schema mutation declared by a step.
///
/// Serialized flat: the `type` key carries the tag and every other key belongs
/// to the handler-specific payload, e.g.
/// `{"type": "add_column", "table": "users", "column": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    #[serde(rename = "type")]
    pub change_type: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum ChangeError {
    #[error("invalid payload for change '{change_type}': {source}")]
    InvalidPayload {
        change_type: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("change '{0}' cannot be reversed")]
    Irreversible(String),
}

impl Change {
    pub fn new(change_type: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            change_type: change_type.into(),
            payload,
        }
    }

    /// Build a change from one of the typed payloads.
    pub fn from_action<A: ChangeAction>(action: &A) -> Result<Self, ChangeError> {
        let value = serde_json::to_value(action).map_err(|source| ChangeError::InvalidPayload {
            change_type: A::TYPE.to_string(),
            source,
        })?;
        let payload = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Ok(Self::new(A::TYPE, payload))
    }

    /// Decode the payload into the typed form for `A`.
    pub fn decode<A: ChangeAction>(&self) -> Result<A, ChangeError> {
        serde_json::from_value(Value::Object(self.payload.clone())).map_err(|source| {
            ChangeError::InvalidPayload {
                change_type: self.change_type.clone(),
                source,
            }
        })
    }

    pub fn is<A: ChangeAction>(&self) -> bool {
        self.change_type == A::TYPE
    }
}

/// Ordered collection of changes recorded by one hook invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    /// Record a typed change.
    pub fn record<A: ChangeAction>(&mut self, action: A) -> Result<(), ChangeError> {
        self.changes.push(Change::from_action(&action)?);
        Ok(())
    }

    pub fn extend(&mut self, changes: impl IntoIterator<Item = Change>) {
        self.changes.extend(changes);
    }

    pub fn reverse(&mut self) {
        self.changes.reverse();
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    pub fn into_vec(self) -> Vec<Change> {
        self.changes
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
