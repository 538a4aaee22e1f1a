//! Association descriptors: immutable metadata for one relationship between
//! aggregate types, plus the per-variant hooks the synthesizer and the
//! cascade dispatch through.

mod belongs_to;
mod builder;
mod error;
mod has;
mod options;
mod through;

#[cfg(test)]
mod tests;

use crate::{
    db::{
        cascade::replace::{ReplaceAction, ReplaceEffect},
        changeset::{Action, ChangeSet},
        entity::Entity,
        query::{Filter, Query, UpdateAll},
        repo::Repo,
        schema::Reflection,
    },
    error::InternalError,
    model::EntityModel,
    obs::sink::{self, MetricsEvent, QueryKind},
    value::Value,
};
use serde::Serialize;

// re-exports
pub use belongs_to::BelongsTo;
pub use builder::association_key;
pub(crate) use builder::{build_belongs_to, build_has, build_through};
pub use error::AssociationError;
pub use has::Has;
pub use options::{
    AssociationOptions, Cardinality, OnDelete, OnReplace, Queryable, Relationship, UnknownPolicy,
};
pub use through::{HasThrough, MAX_THROUGH_DEPTH};

///
/// Persisted
/// Successful nested dispatch: the stored aggregate (none once deleted) and
/// the change set that was actually dispatched.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Persisted {
    pub entity: Option<Entity>,
    pub change: ChangeSet,
}

///
/// PersistResult
/// Rejections are data, not errors: the repo's change set with field errors.
///

pub type PersistResult = Result<Persisted, ChangeSet>;

///
/// PreloadInfo
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum PreloadInfo {
    /// Related rows are grouped back onto owners by `related_key`.
    Assoc { related_key: String },
    /// Preloaded hop by hop along the chain.
    Through { chain: Vec<String> },
}

///
/// OnDeletePlan
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum OnDeletePlan {
    DeleteAll(Query),
    UpdateAll(UpdateAll),
}

///
/// DirectHop
/// Borrowed key data of one physical (non-through) hop.
///

#[derive(Clone, Copy, Debug)]
pub struct DirectHop<'a> {
    pub field: &'a str,
    pub owner_key: &'a str,
    pub related_key: &'a str,
    pub related: &'static EntityModel,
    pub queryable: &'a Queryable,
}

///
/// AssociationKind
///
/// Relationship-kind hooks, implemented once per descriptor variant.
///

pub trait AssociationKind {
    /// Build a new, unpersisted related instance for `owner`.
    fn build(&self, owner: &Entity, attributes: &[(String, Value)]) -> Result<Entity, InternalError>;

    /// Owner source inner-joined to the related source.
    fn joins_query(&self, schema: &dyn Reflection) -> Result<Query, InternalError>;

    /// Related rows whose key is in `values`, composed onto `query` when given.
    fn assoc_query(
        &self,
        schema: &dyn Reflection,
        query: Option<Query>,
        values: Vec<Value>,
    ) -> Result<Query, InternalError>;

    fn preload_info(&self) -> PreloadInfo;

    /// Execute a delete/nilify disposition for a superseded value.
    fn on_replace(
        &self,
        action: ReplaceAction,
        previous: &Entity,
        parent: &ChangeSet,
        repo: &dyn Repo,
    ) -> Result<ReplaceEffect, InternalError>;

    /// Persist one nested change under `parent`.
    fn persist(
        &self,
        parent: &ChangeSet,
        change: ChangeSet,
        repo: &dyn Repo,
    ) -> Result<PersistResult, InternalError>;
}

///
/// Association
///
/// Closed sum over the descriptor variants.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Association {
    DirectChild(Has),
    DirectParent(BelongsTo),
    Through(HasThrough),
}

impl Association {
    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        match self {
            Self::DirectChild(a) => a.cardinality,
            Self::DirectParent(a) => a.cardinality,
            Self::Through(a) => a.cardinality,
        }
    }

    #[must_use]
    pub const fn relationship(&self) -> Relationship {
        match self {
            Self::DirectChild(_) | Self::Through(_) => Relationship::Child,
            Self::DirectParent(_) => Relationship::Parent,
        }
    }

    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::DirectChild(a) => &a.field,
            Self::DirectParent(a) => &a.field,
            Self::Through(a) => &a.field,
        }
    }

    #[must_use]
    pub const fn owner(&self) -> &'static EntityModel {
        match self {
            Self::DirectChild(a) => a.owner,
            Self::DirectParent(a) => a.owner,
            Self::Through(a) => a.owner,
        }
    }

    /// Replace policy; through associations have none.
    #[must_use]
    pub const fn on_replace_policy(&self) -> Option<OnReplace> {
        match self {
            Self::DirectChild(a) => Some(a.on_replace),
            Self::DirectParent(a) => Some(a.on_replace),
            Self::Through(_) => None,
        }
    }

    #[must_use]
    pub const fn is_through(&self) -> bool {
        matches!(self, Self::Through(_))
    }

    /// Key data for direct variants.
    #[must_use]
    pub fn as_direct(&self) -> Option<DirectHop<'_>> {
        match self {
            Self::DirectChild(a) => Some(DirectHop {
                field: &a.field,
                owner_key: &a.owner_key,
                related_key: &a.related_key,
                related: a.related,
                queryable: &a.queryable,
            }),
            Self::DirectParent(a) => Some(DirectHop {
                field: &a.field,
                owner_key: &a.owner_key,
                related_key: &a.related_key,
                related: a.related,
                queryable: &a.queryable,
            }),
            Self::Through(_) => None,
        }
    }

    /// Related type, resolving through chains on demand.
    pub fn related_model(&self, schema: &dyn Reflection) -> Result<&'static EntityModel, InternalError> {
        match self {
            Self::DirectChild(a) => Ok(a.related),
            Self::DirectParent(a) => Ok(a.related),
            Self::Through(a) => a.related(schema),
        }
    }

    /// Owner-side key, resolving through chains on demand.
    pub fn owner_key(&self, schema: &dyn Reflection) -> Result<String, InternalError> {
        match self {
            Self::DirectChild(a) => Ok(a.owner_key.clone()),
            Self::DirectParent(a) => Ok(a.owner_key.clone()),
            Self::Through(a) => a.owner_key(schema),
        }
    }

    /// Related-side key, resolving through chains on demand.
    pub fn related_key(&self, schema: &dyn Reflection) -> Result<String, InternalError> {
        match self {
            Self::DirectChild(a) => Ok(a.related_key.clone()),
            Self::DirectParent(a) => Ok(a.related_key.clone()),
            Self::Through(a) => a.related_key(schema),
        }
    }

    /// Queryable, resolving through chains on demand.
    pub fn queryable(&self, schema: &dyn Reflection) -> Result<Queryable, InternalError> {
        match self {
            Self::DirectChild(a) => Ok(a.queryable.clone()),
            Self::DirectParent(a) => Ok(a.queryable.clone()),
            Self::Through(a) => a.queryable(schema),
        }
    }

    /// `assoc_query` over the owner keys of already loaded owners.
    /// Null keys are skipped; duplicates keep their first position.
    pub fn assoc_query_for(
        &self,
        schema: &dyn Reflection,
        owners: &[Entity],
    ) -> Result<Query, InternalError> {
        let owner_key = self.owner_key(schema)?;
        let mut values: Vec<Value> = Vec::with_capacity(owners.len());
        for owner in owners {
            let value = owner.get(&owner_key);
            if !value.is_null() && !values.contains(value) {
                values.push(value.clone());
            }
        }

        self.assoc_query(schema, None, values)
    }

    fn kind(&self) -> &dyn AssociationKind {
        match self {
            Self::DirectChild(a) => a,
            Self::DirectParent(a) => a,
            Self::Through(a) => a,
        }
    }
}

impl AssociationKind for Association {
    fn build(&self, owner: &Entity, attributes: &[(String, Value)]) -> Result<Entity, InternalError> {
        self.kind().build(owner, attributes)
    }

    fn joins_query(&self, schema: &dyn Reflection) -> Result<Query, InternalError> {
        let query = self.kind().joins_query(schema)?;
        sink::record(MetricsEvent::QuerySynthesized {
            kind: QueryKind::Joins,
            through: self.is_through(),
        });

        Ok(query)
    }

    fn assoc_query(
        &self,
        schema: &dyn Reflection,
        query: Option<Query>,
        values: Vec<Value>,
    ) -> Result<Query, InternalError> {
        let query = self.kind().assoc_query(schema, query, values)?;
        sink::record(MetricsEvent::QuerySynthesized {
            kind: QueryKind::Assoc,
            through: self.is_through(),
        });

        Ok(query)
    }

    fn preload_info(&self) -> PreloadInfo {
        self.kind().preload_info()
    }

    fn on_replace(
        &self,
        action: ReplaceAction,
        previous: &Entity,
        parent: &ChangeSet,
        repo: &dyn Repo,
    ) -> Result<ReplaceEffect, InternalError> {
        self.kind().on_replace(action, previous, parent, repo)
    }

    fn persist(
        &self,
        parent: &ChangeSet,
        change: ChangeSet,
        repo: &dyn Repo,
    ) -> Result<PersistResult, InternalError> {
        self.kind().persist(parent, change, repo)
    }
}

// `from x in query || queryable, where x.related_key in ^values`
fn direct_assoc_query(
    queryable: &Queryable,
    related_key: &str,
    query: Option<Query>,
    values: Vec<Value>,
) -> Query {
    query
        .unwrap_or_else(|| Query::from_source(queryable.to_source()))
        .filter(Filter::field_in(0, related_key, values))
}

// Dispatch the change's own action; a successful delete reports no entity.
fn dispatch_nested(repo: &dyn Repo, change: ChangeSet) -> PersistResult {
    let action = change.action;
    let entity = repo.dispatch(action, change.clone())?;

    Ok(Persisted {
        entity: (action != Action::Delete).then_some(entity),
        change,
    })
}
