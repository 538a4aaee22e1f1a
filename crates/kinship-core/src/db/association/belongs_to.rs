use crate::{
    db::{
        association::{
            AssociationKind, PersistResult, PreloadInfo, dispatch_nested, direct_assoc_query,
            options::{Cardinality, OnReplace, Queryable},
        },
        cascade::replace::{ReplaceAction, ReplaceEffect, ensure_replaced},
        changeset::ChangeSet,
        entity::Entity,
        query::{Filter, Query, Source},
        repo::Repo,
        schema::Reflection,
    },
    error::InternalError,
    model::EntityModel,
    value::Value,
};
use serde::Serialize;

///
/// BelongsTo
///
/// Direct-parent association: the owner holds `owner_key`, which points at
/// the related type's `related_key`.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct BelongsTo {
    pub cardinality: Cardinality,
    pub field: String,
    pub owner: &'static EntityModel,
    pub owner_key: String,
    pub related: &'static EntityModel,
    pub related_key: String,
    pub queryable: Queryable,
    pub on_replace: OnReplace,
    pub defaults: Vec<(String, Value)>,
}

impl BelongsTo {
    /// Owner-side key change implied by a persisted parent: the foreign key
    /// takes the parent's `related_key`, or null once the parent is gone.
    #[must_use]
    pub fn owner_key_change(&self, persisted: Option<&Entity>) -> (String, Value) {
        let value = persisted.map_or(Value::Null, |parent| parent.get(&self.related_key).clone());

        (self.owner_key.clone(), value)
    }
}

impl AssociationKind for BelongsTo {
    fn build(&self, _owner: &Entity, attributes: &[(String, Value)]) -> Result<Entity, InternalError> {
        let entity = Entity::built(self.related)
            .with_attrs(self.defaults.iter().cloned())
            .with_attrs(attributes.iter().cloned());

        Ok(entity)
    }

    fn joins_query(&self, _schema: &dyn Reflection) -> Result<Query, InternalError> {
        Ok(Query::from_source(Source::of(self.owner)).inner_join(
            self.queryable.to_source(),
            Filter::fields_eq(1, &self.related_key, 0, &self.owner_key),
        ))
    }

    fn assoc_query(
        &self,
        _schema: &dyn Reflection,
        query: Option<Query>,
        values: Vec<Value>,
    ) -> Result<Query, InternalError> {
        Ok(direct_assoc_query(&self.queryable, &self.related_key, query, values))
    }

    fn preload_info(&self) -> PreloadInfo {
        PreloadInfo::Assoc {
            related_key: self.related_key.clone(),
        }
    }

    fn on_replace(
        &self,
        action: ReplaceAction,
        previous: &Entity,
        parent: &ChangeSet,
        repo: &dyn Repo,
    ) -> Result<ReplaceEffect, InternalError> {
        match action {
            ReplaceAction::Delete => {
                let change = ChangeSet::delete(previous.clone()).with_context(parent.context.clone());
                ensure_replaced(&self.field, self.owner, repo.delete(change))?;

                Ok(ReplaceEffect::Applied)
            }
            // The reference lives on the owner, so nothing is written to the
            // previous parent; the owner's key is cleared instead.
            ReplaceAction::Nilify => Ok(ReplaceEffect::ClearOwnerKey(self.owner_key.clone())),
        }
    }

    fn persist(
        &self,
        parent: &ChangeSet,
        mut change: ChangeSet,
        repo: &dyn Repo,
    ) -> Result<PersistResult, InternalError> {
        change.context = parent.context.clone();

        Ok(dispatch_nested(repo, change))
    }
}
