//! Association metadata, query synthesis and cascading persistence.

pub mod association;
pub mod cascade;
pub mod changeset;
pub mod entity;
pub mod query;
pub mod repo;
pub mod schema;

// re-exports
pub use association::{Association, AssociationKind, AssociationOptions};
pub use cascade::{CascadeConfig, CascadeExecutor, CascadeOutcome, NestedChange};
pub use changeset::{Action, Change, ChangeSet, Changes, FieldError, RepoContext};
pub use entity::{AssocSlot, Entity, EntityState};
pub use query::Query;
pub use repo::{Repo, RepoResult};
pub use schema::{Reflection, Schema, SchemaBuilder};
