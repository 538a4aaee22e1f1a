//! Core runtime for kinship: association descriptors, relationship-aware
//! query synthesis and cascading persistence of nested changes.

// public exports are one module level down
pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, executors or metrics are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::{
            association::{AssociationOptions, Cardinality, OnDelete, OnReplace},
            changeset::{Action, ChangeSet},
            entity::{AssocSlot, Entity},
            schema::{Reflection, Schema},
        },
        model::EntityModel,
        value::Value,
    };
}
