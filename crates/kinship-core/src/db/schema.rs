//! Type-level association registry.
//!
//! Associations are declared once per type through `SchemaBuilder`, which
//! validates each declaration against what is already registered and then
//! freezes into an immutable `Schema`. Nothing mutates a built schema.

use crate::{
    db::association::{
        Association, AssociationError, AssociationOptions, Cardinality, build_belongs_to,
        build_has, build_through,
    },
    error::{ErrorOrigin, InternalError},
    model::EntityModel,
};
use std::collections::BTreeMap;

///
/// Reflection
///
/// Read-only lookup of registered models and association descriptors.
///

pub trait Reflection {
    fn model(&self, path: &str) -> Option<&'static EntityModel>;

    fn association(&self, owner: &str, field: &str) -> Option<&Association>;

    /// Every association declared on `owner`, in declaration order.
    fn associations(&self, owner: &str) -> &[Association];
}

///
/// Schema
///

#[derive(Debug, Default)]
pub struct Schema {
    models: BTreeMap<&'static str, &'static EntityModel>,
    associations: BTreeMap<&'static str, Vec<Association>>,
}

impl Schema {
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }
}

impl Reflection for Schema {
    fn model(&self, path: &str) -> Option<&'static EntityModel> {
        self.models.get(path).copied()
    }

    fn association(&self, owner: &str, field: &str) -> Option<&Association> {
        self.associations(owner)
            .iter()
            .find(|assoc| assoc.field() == field)
    }

    fn associations(&self, owner: &str) -> &[Association] {
        self.associations.get(owner).map_or(&[], Vec::as_slice)
    }
}

///
/// SchemaBuilder
///

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type model without associations.
    pub fn entity(&mut self, model: &'static EntityModel) -> &mut Self {
        self.schema.models.insert(model.path, model);
        self
    }

    /// Declare a has-many association; a non-empty `through` makes it a
    /// through association.
    pub fn has_many(
        &mut self,
        owner: &'static EntityModel,
        field: &str,
        opts: AssociationOptions,
    ) -> Result<&mut Self, InternalError> {
        self.declare_has(owner, field, opts, Cardinality::Many)
    }

    /// Declare a has-one association; a non-empty `through` makes it a
    /// through association.
    pub fn has_one(
        &mut self,
        owner: &'static EntityModel,
        field: &str,
        opts: AssociationOptions,
    ) -> Result<&mut Self, InternalError> {
        self.declare_has(owner, field, opts, Cardinality::One)
    }

    pub fn belongs_to(
        &mut self,
        owner: &'static EntityModel,
        field: &str,
        opts: AssociationOptions,
    ) -> Result<&mut Self, InternalError> {
        let assoc = build_belongs_to(owner, field, &opts)?;
        self.register(owner, Association::DirectParent(assoc))
    }

    /// Declare a through association with the cardinality carried by `opts`.
    pub fn has_through(
        &mut self,
        owner: &'static EntityModel,
        field: &str,
        opts: AssociationOptions,
    ) -> Result<&mut Self, InternalError> {
        let assoc = build_through(owner, field, &opts, |name| {
            self.schema.association(owner.path, name)
        })?;
        self.register(owner, Association::Through(assoc))
    }

    /// Freeze the registry.
    #[must_use]
    pub fn build(self) -> Schema {
        self.schema
    }

    fn declare_has(
        &mut self,
        owner: &'static EntityModel,
        field: &str,
        mut opts: AssociationOptions,
        cardinality: Cardinality,
    ) -> Result<&mut Self, InternalError> {
        opts.cardinality = cardinality;
        if opts.through.is_empty() {
            let assoc = build_has(owner, field, &opts)?;
            self.register(owner, Association::DirectChild(assoc))
        } else {
            self.has_through(owner, field, opts)
        }
    }

    fn register(
        &mut self,
        owner: &'static EntityModel,
        assoc: Association,
    ) -> Result<&mut Self, InternalError> {
        if self.schema.association(owner.path, assoc.field()).is_some() {
            let mut err = InternalError::from(AssociationError::DuplicateAssociation {
                owner: owner.path.to_string(),
                field: assoc.field().to_string(),
            });
            err.origin = ErrorOrigin::Schema;

            return Err(err);
        }

        self.schema.models.insert(owner.path, owner);
        if let Some(related) = assoc.as_direct().map(|hop| hop.related) {
            self.schema.models.entry(related.path).or_insert(related);
        }
        self.schema
            .associations
            .entry(owner.path)
            .or_default()
            .push(assoc);

        Ok(self)
    }
}
