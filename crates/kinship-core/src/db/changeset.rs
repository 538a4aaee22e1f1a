use crate::{
    db::entity::{Entity, EntityState},
    value::Value,
};
use derive_more::{Deref, DerefMut, IntoIterator};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

///
/// Action
///
/// Intended persistence action for one change set.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Action {
    Insert,
    Update,
    Delete,
}

impl Action {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// RepoContext
///
/// Back-reference to the persistence context a change set is saved through.
/// Nested change sets inherit the root's context before dispatch.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RepoContext {
    pub repo: &'static str,
    pub prefix: Option<String>,
}

impl RepoContext {
    #[must_use]
    pub const fn new(repo: &'static str) -> Self {
        Self { repo, prefix: None }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

///
/// FieldError
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

///
/// Change
///
/// One entry in a changes mapping: a plain attribute value, or nested change
/// sets under an association field.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Change {
    Value(Value),
    One(Option<Box<ChangeSet>>),
    Many(Vec<ChangeSet>),
}

impl Change {
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_one(&self) -> Option<&ChangeSet> {
        match self {
            Self::One(Some(change)) => Some(change),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_many(&self) -> Option<&[ChangeSet]> {
        match self {
            Self::Many(changes) => Some(changes),
            _ => None,
        }
    }
}

///
/// Changes
/// Attribute name → change; key order carries no meaning.
///

#[derive(Clone, Debug, Default, Deref, DerefMut, Eq, IntoIterator, PartialEq)]
pub struct Changes(BTreeMap<String, Change>);

impl Changes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain value change for `field`, if one is pending.
    #[must_use]
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.0.get(field).and_then(Change::as_value)
    }
}

///
/// ChangeSet
///
/// Diff + intended action + validity state for one aggregate being saved.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChangeSet {
    pub data: Entity,
    pub changes: Changes,
    pub action: Action,
    pub valid: bool,
    pub errors: Vec<FieldError>,
    pub context: RepoContext,
}

impl ChangeSet {
    #[must_use]
    pub fn new(data: Entity, action: Action) -> Self {
        Self {
            data,
            changes: Changes::new(),
            action,
            valid: true,
            errors: Vec::new(),
            context: RepoContext::default(),
        }
    }

    #[must_use]
    pub fn insert(data: Entity) -> Self {
        Self::new(data, Action::Insert)
    }

    #[must_use]
    pub fn update(data: Entity) -> Self {
        Self::new(data, Action::Update)
    }

    #[must_use]
    pub fn delete(data: Entity) -> Self {
        Self::new(data, Action::Delete)
    }

    #[must_use]
    pub fn with_change(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.put_change(field, value);
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: RepoContext) -> Self {
        self.context = context;
        self
    }

    pub fn put_change(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.changes.insert(field.into(), Change::Value(value.into()));
    }

    /// Record a field error and mark the change set invalid.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
        self.valid = false;
    }

    /// Value the field will hold after the change set is applied.
    #[must_use]
    pub fn field_value(&self, field: &str) -> &Value {
        self.changes
            .value(field)
            .unwrap_or_else(|| self.data.get(field))
    }

    /// Apply plain value changes onto the data, marking the result loaded.
    /// Repo implementations use this to produce the persisted aggregate.
    #[must_use]
    pub fn apply_changes(&self) -> Entity {
        let mut entity = self.data.clone();
        for (field, change) in self.changes.iter() {
            if let Change::Value(value) = change {
                entity.put(field.clone(), value.clone());
            }
        }
        entity.set_state(match self.action {
            Action::Delete => EntityState::Deleted,
            Action::Insert | Action::Update => EntityState::Loaded,
        });

        entity
    }
}
