use thiserror::Error as ThisError;

///
/// AssociationError
///
/// Configuration errors raised while a type's associations are declared.
/// Each is fatal to the defining type.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[remain::sorted]
pub enum AssociationError {
    #[error("type `{owner}` already defines an association named `{field}`")]
    DuplicateAssociation { owner: String, field: String },

    #[error(
        "invalid :on_delete option `{value}` for association `{field}`; the only valid options are: {valid}"
    )]
    InvalidOnDelete {
        field: String,
        value: String,
        valid: String,
    },

    #[error(
        "invalid :on_replace option `{value}` for association `{field}`; the only valid options are: {valid}"
    )]
    InvalidOnReplace {
        field: String,
        value: String,
        valid: String,
    },

    #[error("invalid option `{option}` for {kind} association `{field}` on `{owner}`")]
    InvalidOption {
        owner: String,
        field: String,
        kind: &'static str,
        option: &'static str,
    },

    #[error("association `{field}` on `{owner}` requires a :queryable type")]
    MissingQueryable { owner: String, field: String },

    #[error(
        "need to set the :references option for association `{field}` when `{owner}` has no primary key"
    )]
    MissingReferences { owner: String, field: String },

    #[error(
        "association `{field}` on `{owner}`: :queryable cannot be combined with :through; through associations derive their source from the chain"
    )]
    QueryableWithThrough { owner: String, field: String },

    #[error(
        "association `{field}` on `{owner}`: :through expects a list with at least two entries, got {len}"
    )]
    ThroughTooShort {
        owner: String,
        field: String,
        len: usize,
    },

    #[error(
        "type `{owner}` does not have the field `{key}` used by association `{field}`, please set the :foreign_key option accordingly"
    )]
    UnknownForeignKey {
        owner: String,
        field: String,
        key: String,
    },

    #[error(
        "type `{owner}` does not have the field `{reference}` used by association `{field}`, please set the :references option accordingly"
    )]
    UnknownReference {
        owner: String,
        field: String,
        reference: String,
    },

    #[error(
        "type `{owner}` does not have the association `{hop}` used by :through association `{field}`"
    )]
    UnknownThroughHop {
        owner: String,
        field: String,
        hop: String,
    },
}
