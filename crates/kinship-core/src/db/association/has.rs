use crate::{
    db::{
        association::{
            AssociationKind, OnDeletePlan, PersistResult, PreloadInfo, dispatch_nested,
            direct_assoc_query,
            options::{Cardinality, OnDelete, OnReplace, Queryable},
        },
        cascade::replace::{ReplaceAction, ReplaceEffect, ensure_replaced},
        changeset::{Action, Change, ChangeSet},
        entity::Entity,
        query::{Filter, Query, Source, UpdateAll},
        repo::Repo,
        schema::Reflection,
    },
    error::InternalError,
    model::EntityModel,
    value::Value,
};
use serde::Serialize;

///
/// Has
///
/// Direct-child association (has-one / has-many): the related type holds
/// `related_key`, which points at the owner's `owner_key`.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Has {
    pub cardinality: Cardinality,
    pub field: String,
    pub owner: &'static EntityModel,
    pub owner_key: String,
    pub related: &'static EntityModel,
    pub related_key: String,
    pub queryable: Queryable,
    pub on_delete: OnDelete,
    pub on_replace: OnReplace,
    pub defaults: Vec<(String, Value)>,
}

impl Has {
    /// Query the external engine runs when an owner row is deleted, per
    /// `on_delete`. `Nothing` leaves related rows alone.
    #[must_use]
    pub fn on_delete_plan(&self, owner: &Entity) -> Option<OnDeletePlan> {
        let key = owner.get(&self.owner_key).clone();
        let query = Query::from_source(self.queryable.to_source()).filter(Filter::field_in(
            0,
            &self.related_key,
            vec![key],
        ));

        match self.on_delete {
            OnDelete::Nothing => None,
            OnDelete::DeleteAll => Some(OnDeletePlan::DeleteAll(query)),
            OnDelete::ClearReferences => Some(OnDeletePlan::UpdateAll(UpdateAll {
                query,
                set: vec![(self.related_key.clone(), Value::Null)],
            })),
        }
    }
}

impl AssociationKind for Has {
    fn build(&self, owner: &Entity, attributes: &[(String, Value)]) -> Result<Entity, InternalError> {
        let entity = Entity::built(self.related)
            .with_attrs(self.defaults.iter().cloned())
            .with_attrs([(self.related_key.clone(), owner.get(&self.owner_key).clone())])
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
        let change = match action {
            ReplaceAction::Delete => ChangeSet::delete(previous.clone()),
            ReplaceAction::Nilify => {
                ChangeSet::update(previous.clone()).with_change(self.related_key.clone(), Value::Null)
            }
        }
        .with_context(parent.context.clone());

        ensure_replaced(&self.field, self.owner, repo.dispatch(change.action, change))?;

        Ok(ReplaceEffect::Applied)
    }

    fn persist(
        &self,
        parent: &ChangeSet,
        mut change: ChangeSet,
        repo: &dyn Repo,
    ) -> Result<PersistResult, InternalError> {
        change.context = parent.context.clone();

        // The child carries the reference; point it at the owner unless either
        // side is being deleted.
        let original = change.changes.get(&self.related_key).cloned();
        if parent.action != Action::Delete && change.action != Action::Delete {
            let key = parent.field_value(&self.owner_key).clone();
            change.put_change(self.related_key.clone(), key);
        }

        Ok(dispatch_nested(repo, change).map_err(|mut rejected| {
            restore_change(&mut rejected, &self.related_key, original);
            rejected
        }))
    }
}

// Put back the pre-dispatch value of `field` so callers see their own diff.
fn restore_change(change: &mut ChangeSet, field: &str, original: Option<Change>) {
    match original {
        Some(original) => {
            change.changes.insert(field.to_string(), original);
        }
        None => {
            change.changes.remove(field);
        }
    }
}
