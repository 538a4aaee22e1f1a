//! Cascading persistence of nested association changes.
//!
//! The executor folds over `(association, nested change)` pairs in caller
//! order. Nested rejections are collected into the root's changes instead of
//! aborting; misuse and inline replace failures abort immediately. The caller
//! owns the transaction around the whole save.

pub mod replace;


use crate::{
    db::{
        association::{Association, AssociationKind, Cardinality, PersistResult},
        cascade::replace::{ReplaceEffect, ReplaceOutcome, replaceable, resolve_replace},
        changeset::{Action, Change, ChangeSet, Changes, FieldError},
        entity::{AssocSlot, Entity},
        repo::Repo,
    },
    error::InternalError,
    obs::sink::{self, MetricsEvent},
    value::Value,
};

///
/// NestedChange
/// Nested change data attached to the root under one association field.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NestedChange {
    One(Option<ChangeSet>),
    Many(Vec<ChangeSet>),
}

impl NestedChange {
    const fn cardinality(&self) -> Cardinality {
        match self {
            Self::One(_) => Cardinality::One,
            Self::Many(_) => Cardinality::Many,
        }
    }
}

///
/// CascadeOutcome
///
/// `Saved` carries the fully merged root aggregate. `Invalid` carries the
/// root change set with every nested result written back into its changes;
/// its data is left untouched.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CascadeOutcome {
    Saved(Entity),
    Invalid(ChangeSet),
}

impl CascadeOutcome {
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }

    #[must_use]
    pub const fn saved(&self) -> Option<&Entity> {
        match self {
            Self::Saved(entity) => Some(entity),
            Self::Invalid(_) => None,
        }
    }

    #[must_use]
    pub const fn invalid(&self) -> Option<&ChangeSet> {
        match self {
            Self::Saved(_) => None,
            Self::Invalid(change) => Some(change),
        }
    }
}

///
/// CascadeConfig
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CascadeConfig {
    pub debug: bool,
}

impl CascadeConfig {
    #[must_use]
    pub const fn debug() -> Self {
        Self { debug: true }
    }
}

///
/// CascadeExecutor
///

#[derive(Clone, Copy)]
pub struct CascadeExecutor<'a> {
    repo: &'a dyn Repo,
    debug: bool,
}

// Accumulator threaded through the fold; owned by one call.
struct CascadeState {
    model: Entity,
    changes: Changes,
    errors: Vec<FieldError>,
    valid: bool,
}

impl<'a> CascadeExecutor<'a> {
    #[must_use]
    pub const fn new(repo: &'a dyn Repo, config: CascadeConfig) -> Self {
        Self {
            repo,
            debug: config.debug,
        }
    }

    fn debug_log(&self, s: impl Into<String>) {
        if self.debug {
            println!("[debug] {}", s.into());
        }
    }

    /// Persist every nested change under `root`, in order.
    pub fn on_repo_change(
        &self,
        root: ChangeSet,
        assocs: Vec<(&Association, NestedChange)>,
    ) -> Result<CascadeOutcome, InternalError> {
        if assocs.is_empty() {
            return Ok(CascadeOutcome::Saved(root.data));
        }

        let entity_path = root.data.model().path;
        sink::record(MetricsEvent::CascadeStart {
            entity_path,
            action: root.action,
        });
        self.debug_log(format!(
            "cascade {} on {entity_path} across {} associations",
            root.action,
            assocs.len()
        ));

        let mut state = CascadeState {
            model: root.data.clone(),
            changes: root.changes.clone(),
            errors: root.errors.clone(),
            valid: true,
        };

        // An aborted cascade still closes its start event, as invalid.
        if let Err(err) = self.fold(&root, assocs, &mut state) {
            sink::record(MetricsEvent::CascadeFinish {
                entity_path,
                valid: false,
            });
            self.debug_log(format!("cascade on {entity_path} aborted: {err}"));

            return Err(err);
        }

        sink::record(MetricsEvent::CascadeFinish {
            entity_path,
            valid: state.valid,
        });
        self.debug_log(format!("cascade on {entity_path} valid={}", state.valid));

        if state.valid {
            return Ok(CascadeOutcome::Saved(state.model));
        }

        Ok(CascadeOutcome::Invalid(ChangeSet {
            changes: state.changes,
            errors: state.errors,
            valid: false,
            ..root
        }))
    }

    fn fold(
        &self,
        root: &ChangeSet,
        assocs: Vec<(&Association, NestedChange)>,
        state: &mut CascadeState,
    ) -> Result<(), InternalError> {
        for (assoc, nested) in assocs {
            check_association(root, assoc, &nested)?;

            match nested {
                NestedChange::One(change) => self.cascade_one(root, assoc, change, state)?,
                NestedChange::Many(changes) => self.cascade_many(root, assoc, changes, state)?,
            }
        }

        Ok(())
    }

    fn cascade_one(
        &self,
        root: &ChangeSet,
        assoc: &Association,
        change: Option<ChangeSet>,
        state: &mut CascadeState,
    ) -> Result<(), InternalError> {
        let field = assoc.field();
        let previous = root.data.assoc(field);

        let Some(change) = change else {
            if let Some(prev) = replaceable(previous, None) {
                self.replace(root, assoc, prev, state)?;
            }
            if let Association::DirectParent(parent) = assoc {
                let (key, value) = parent.owner_key_change(None);
                put_value(state, key, value);
            }
            self.debug_log(format!("  {field}: cleared"));
            state.model.put_assoc(field, AssocSlot::One(None));
            state.changes.insert(field.to_string(), Change::One(None));

            return Ok(());
        };

        check_action(root, assoc, &change)?;
        match self.persist(root, assoc, change)? {
            Ok(persisted) => {
                if let Some(entity) = persisted.entity.as_ref()
                    && let Some(prev) = replaceable(previous, Some(entity))
                {
                    self.replace(root, assoc, prev, state)?;
                }
                if let Association::DirectParent(parent) = assoc {
                    let (key, value) = parent.owner_key_change(persisted.entity.as_ref());
                    put_value(state, key, value);
                }

                state.model.put_assoc(
                    field,
                    AssocSlot::One(persisted.entity.map(Box::new)),
                );
                state.changes.insert(
                    field.to_string(),
                    Change::One(Some(Box::new(persisted.change))),
                );
            }
            Err(rejected) => {
                state
                    .changes
                    .insert(field.to_string(), Change::One(Some(Box::new(rejected))));
                state.valid = false;
            }
        }

        Ok(())
    }

    // Changes are always written in input order; the merged list only when
    // every element persisted.
    fn cascade_many(
        &self,
        root: &ChangeSet,
        assoc: &Association,
        nested: Vec<ChangeSet>,
        state: &mut CascadeState,
    ) -> Result<(), InternalError> {
        let field = assoc.field();
        let mut models = Vec::with_capacity(nested.len());
        let mut changes = Vec::with_capacity(nested.len());
        let mut all_valid = true;

        for change in nested {
            check_action(root, assoc, &change)?;

            match self.persist(root, assoc, change)? {
                Ok(persisted) => {
                    models.extend(persisted.entity);
                    changes.push(persisted.change);
                }
                Err(rejected) => {
                    all_valid = false;
                    changes.push(rejected);
                }
            }
        }

        state.changes.insert(field.to_string(), Change::Many(changes));
        if all_valid {
            state.model.put_assoc(field, AssocSlot::Many(models));
        } else {
            state.valid = false;
        }

        Ok(())
    }

    fn persist(
        &self,
        root: &ChangeSet,
        assoc: &Association,
        change: ChangeSet,
    ) -> Result<PersistResult, InternalError> {
        let action = change.action;
        let result = assoc.persist(root, change, self.repo)?;

        sink::record(MetricsEvent::NestedPersist {
            entity_path: assoc.owner().path,
            field: assoc.field(),
            action,
            ok: result.is_ok(),
        });
        self.debug_log(format!(
            "  {}: {action} -> {}",
            assoc.field(),
            if result.is_ok() { "ok" } else { "rejected" }
        ));

        Ok(result)
    }

    fn replace(
        &self,
        root: &ChangeSet,
        assoc: &Association,
        previous: &Entity,
        state: &mut CascadeState,
    ) -> Result<(), InternalError> {
        let outcome = resolve_replace(assoc, previous, root, self.repo)?;
        self.debug_log(format!(
            "  {}: replaced {} -> {outcome:?}",
            assoc.field(),
            previous.identity()
        ));

        match outcome {
            ReplaceOutcome::Effect(ReplaceEffect::Applied) => {}
            ReplaceOutcome::Effect(ReplaceEffect::ClearOwnerKey(key)) => {
                put_value(state, key, Value::Null);
            }
            ReplaceOutcome::Invalid => {
                state.errors.push(FieldError::new(assoc.field(), "is invalid"));
                state.valid = false;
            }
        }

        Ok(())
    }
}

// Write a plain attribute to both the merged model and the root changes.
fn put_value(state: &mut CascadeState, key: String, value: Value) {
    state.model.put(key.clone(), value.clone());
    state.changes.insert(key, Change::Value(value));
}

// Only direct associations declared on the root's own type, with a nested
// shape matching their cardinality, can be cascaded.
fn check_association(
    root: &ChangeSet,
    assoc: &Association,
    nested: &NestedChange,
) -> Result<(), InternalError> {
    let owner = assoc.owner();

    if assoc.is_through() {
        return Err(InternalError::cascade_misuse(format!(
            "cannot cascade through association `{}` on `{}`; persist the intermediate associations explicitly",
            assoc.field(),
            owner.path
        )));
    }
    if root.data.model() != owner {
        return Err(InternalError::cascade_misuse(format!(
            "association `{}` is declared on `{}` but the root change is for `{}`",
            assoc.field(),
            owner.path,
            root.data.model().path
        )));
    }
    if nested.cardinality() != assoc.cardinality() {
        return Err(InternalError::cascade_misuse(format!(
            "association `{}` on `{}` has cardinality {:?} but received {:?} nested data",
            assoc.field(),
            owner.path,
            assoc.cardinality(),
            nested.cardinality()
        )));
    }

    Ok(())
}

fn check_action(root: &ChangeSet, assoc: &Association, change: &ChangeSet) -> Result<(), InternalError> {
    if root.action == Action::Insert && change.action == Action::Delete {
        return Err(InternalError::cascade_misuse(format!(
            "cannot delete `{}` on `{}` while inserting its parent",
            assoc.field(),
            assoc.owner().path
        )));
    }

    Ok(())
}
