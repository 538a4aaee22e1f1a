use crate::db::{
    changeset::{Action, ChangeSet},
    entity::Entity,
};

///
/// RepoResult
///
/// Persisted aggregate on success; on failure the rejected change set,
/// carrying its field-level errors.
///

pub type RepoResult = Result<Entity, ChangeSet>;

///
/// Repo
///
/// Storage collaborator invoked for the root and every nested change.
/// Implementations run inside the caller's transaction; the cascade never
/// opens, commits or rolls back anything itself.
///

pub trait Repo {
    fn insert(&self, change: ChangeSet) -> RepoResult;

    fn update(&self, change: ChangeSet) -> RepoResult;

    fn delete(&self, change: ChangeSet) -> RepoResult;

    /// Dispatch `change` according to `action`.
    fn dispatch(&self, action: Action, change: ChangeSet) -> RepoResult {
        match action {
            Action::Insert => self.insert(change),
            Action::Update => self.update(change),
            Action::Delete => self.delete(change),
        }
    }
}

impl<R: Repo + ?Sized> Repo for &R {
    fn insert(&self, change: ChangeSet) -> RepoResult {
        (**self).insert(change)
    }

    fn update(&self, change: ChangeSet) -> RepoResult {
        (**self).update(change)
    }

    fn delete(&self, change: ChangeSet) -> RepoResult {
        (**self).delete(change)
    }
}
