use crate::{model::EntityModel, value::Value};
use std::collections::BTreeMap;

///
/// EntityState
///
/// Persistence lifecycle of one aggregate instance.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EntityState {
    /// Exists only in memory; never persisted.
    #[default]
    Built,
    Loaded,
    Deleted,
}

///
/// AssocSlot
///
/// Association field contents on an aggregate.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum AssocSlot {
    /// Placeholder for an association that was never fetched.
    #[default]
    NotLoaded,
    One(Option<Box<Entity>>),
    Many(Vec<Entity>),
}

impl AssocSlot {
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        !matches!(self, Self::NotLoaded)
    }

    #[must_use]
    pub fn as_one(&self) -> Option<&Entity> {
        match self {
            Self::One(Some(entity)) => Some(entity),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_many(&self) -> Option<&[Entity]> {
        match self {
            Self::Many(items) => Some(items),
            _ => None,
        }
    }
}

///
/// Entity
///
/// One aggregate instance: attribute values plus association slots.
/// Identity is the primary key value declared by the model.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entity {
    model: &'static EntityModel,
    state: EntityState,
    values: BTreeMap<String, Value>,
    assocs: BTreeMap<String, AssocSlot>,
}

impl Entity {
    /// Build an in-memory instance with every declared field set to null.
    #[must_use]
    pub fn built(model: &'static EntityModel) -> Self {
        let values = model
            .fields
            .iter()
            .map(|field| ((*field).to_string(), Value::Null))
            .collect();

        Self {
            model,
            state: EntityState::Built,
            values,
            assocs: BTreeMap::new(),
        }
    }

    /// Build a persisted instance from attribute pairs.
    #[must_use]
    pub fn loaded<K, V>(model: &'static EntityModel, attrs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut entity = Self::built(model).with_attrs(attrs);
        entity.state = EntityState::Loaded;

        entity
    }

    #[must_use]
    pub fn with_attrs<K, V>(mut self, attrs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in attrs {
            self.values.insert(key.into(), value.into());
        }

        self
    }

    #[must_use]
    pub fn with_assoc(mut self, field: impl Into<String>, slot: AssocSlot) -> Self {
        self.assocs.insert(field.into(), slot);
        self
    }

    #[must_use]
    pub const fn model(&self) -> &'static EntityModel {
        self.model
    }

    #[must_use]
    pub const fn state(&self) -> EntityState {
        self.state
    }

    pub const fn set_state(&mut self, state: EntityState) {
        self.state = state;
    }

    /// Primary key value, or null when the model declares none.
    #[must_use]
    pub fn identity(&self) -> Value {
        self.model
            .primary_key
            .map_or(Value::Null, |pk| self.get(pk).clone())
    }

    /// Attribute value; missing attributes read as null.
    #[must_use]
    pub fn get(&self, field: &str) -> &Value {
        const NULL: &Value = &Value::Null;

        self.values.get(field).unwrap_or(NULL)
    }

    pub fn put(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(field.into(), value.into());
    }

    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Association slot; unknown fields read as not loaded.
    #[must_use]
    pub fn assoc(&self, field: &str) -> &AssocSlot {
        const NOT_LOADED: &AssocSlot = &AssocSlot::NotLoaded;

        self.assocs.get(field).unwrap_or(NOT_LOADED)
    }

    pub fn put_assoc(&mut self, field: impl Into<String>, slot: AssocSlot) {
        self.assocs.insert(field.into(), slot);
    }
}
