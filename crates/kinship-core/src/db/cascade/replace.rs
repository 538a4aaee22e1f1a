//! Disposition of a superseded one-to-one value.
//!
//! Delete and nilify run inline against the repo; there is no caller-supplied
//! change set for the previous value, so a failure here aborts the whole
//! cascade instead of surfacing as a field error.

use crate::{
    db::{
        association::{Association, AssociationKind, OnReplace},
        changeset::ChangeSet,
        entity::{AssocSlot, Entity, EntityState},
        repo::{Repo, RepoResult},
    },
    error::InternalError,
    model::EntityModel,
    obs::sink::{self, MetricsEvent},
    value::Value,
};

///
/// ReplaceAction
/// Repo-side dispositions; the other policies never reach a descriptor hook.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReplaceAction {
    Delete,
    Nilify,
}

///
/// ReplaceEffect
/// What the root must apply after a disposition ran.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReplaceEffect {
    /// The repo write already happened; nothing to merge.
    Applied,
    /// The reference lives on the root; clear this root attribute.
    ClearOwnerKey(String),
}

///
/// ReplaceOutcome
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReplaceOutcome {
    Effect(ReplaceEffect),
    /// `mark_invalid`: the pending save is rejected.
    Invalid,
}

/// Previous value that a new value would supersede, if replacing it matters.
///
/// Not-loaded placeholders, absent values and never-persisted instances are
/// not replaceable; neither is the same row reassigned.
#[must_use]
pub fn replaceable<'a>(previous: &'a AssocSlot, current: Option<&Entity>) -> Option<&'a Entity> {
    let previous = previous.as_one()?;
    if previous.state() == EntityState::Built {
        return None;
    }

    let current_identity = current.map_or(Value::Null, Entity::identity);
    (previous.identity() != current_identity).then_some(previous)
}

/// Apply `assoc`'s `on_replace` policy to `previous`.
pub fn resolve_replace(
    assoc: &Association,
    previous: &Entity,
    parent: &ChangeSet,
    repo: &dyn Repo,
) -> Result<ReplaceOutcome, InternalError> {
    let Some(policy) = assoc.on_replace_policy() else {
        return Err(InternalError::replace_misuse(format!(
            "through association `{}` on `{}` has no replace policy",
            assoc.field(),
            assoc.owner().path
        )));
    };

    sink::record(MetricsEvent::ReplaceDisposition {
        entity_path: assoc.owner().path,
        field: assoc.field(),
        policy,
    });

    match policy {
        OnReplace::Raise => Err(InternalError::replace_misuse(format!(
            "attempting to replace `{}` on `{}` whose previous value {} is still associated; \
             set `on_replace` to `mark_invalid`, `delete` or `nilify` to allow it",
            assoc.field(),
            assoc.owner().path,
            previous.identity()
        ))),
        OnReplace::MarkInvalid => Ok(ReplaceOutcome::Invalid),
        OnReplace::Delete => assoc
            .on_replace(ReplaceAction::Delete, previous, parent, repo)
            .map(ReplaceOutcome::Effect),
        OnReplace::Nilify => assoc
            .on_replace(ReplaceAction::Nilify, previous, parent, repo)
            .map(ReplaceOutcome::Effect),
    }
}

/// Promote a failed inline write to an invalid-state error.
pub(crate) fn ensure_replaced(
    field: &str,
    owner: &EntityModel,
    result: RepoResult,
) -> Result<(), InternalError> {
    match result {
        Ok(_) => Ok(()),
        Err(rejected) => {
            let errors = rejected
                .errors
                .iter()
                .map(|err| format!("{}: {}", err.field, err.message))
                .collect::<Vec<_>>()
                .join(", ");

            Err(InternalError::replace_invalid_state(format!(
                "could not {} replaced value of `{field}` on `{}`: [{errors}]",
                rejected.action,
                owner.path
            )))
        }
    }
}
