//! Descriptor construction: option validation and conventional key
//! derivation. Every failure here is a configuration error raised while the
//! owning type is being defined.

use crate::{
    db::association::{
        Association, AssociationError, BelongsTo, Cardinality, Has, HasThrough, OnDelete,
        OnReplace,
        options::AssociationOptions,
    },
    model::EntityModel,
};
use convert_case::{Case, Casing};

/// Conventional key name: snake-cased last segment of the type identity,
/// suffixed with the reference key (`Blog.Post` + `id` → `post_id`).
#[must_use]
pub fn association_key(model: &EntityModel, suffix: &str) -> String {
    format!("{}_{suffix}", model.short_name().to_case(Case::Snake))
}

/// Build a direct-child (has-one / has-many) descriptor.
pub(crate) fn build_has(
    owner: &'static EntityModel,
    field: &str,
    opts: &AssociationOptions,
) -> Result<Has, AssociationError> {
    if !opts.through.is_empty() {
        return Err(invalid_option(owner, field, "has", "through"));
    }
    let related = opts
        .queryable
        .ok_or_else(|| AssociationError::MissingQueryable {
            owner: owner.path.to_string(),
            field: field.to_string(),
        })?;

    // owner_key: explicit :references, else the owner's primary key.
    let owner_key = reference_key(owner, field, opts.references.as_deref())?;
    let related_key = opts
        .foreign_key
        .clone()
        .unwrap_or_else(|| association_key(owner, &owner_key));

    Ok(Has {
        cardinality: opts.cardinality,
        field: field.to_string(),
        owner,
        owner_key,
        related,
        related_key,
        queryable: opts.queryable_source(related),
        on_delete: parse_on_delete(field, opts.on_delete.as_deref())?,
        on_replace: parse_on_replace(field, opts.on_replace.as_deref())?,
        defaults: opts.defaults.clone(),
    })
}

/// Build a direct-parent (belongs-to) descriptor.
pub(crate) fn build_belongs_to(
    owner: &'static EntityModel,
    field: &str,
    opts: &AssociationOptions,
) -> Result<BelongsTo, AssociationError> {
    if !opts.through.is_empty() {
        return Err(invalid_option(owner, field, "belongs_to", "through"));
    }
    if opts.on_delete.is_some() {
        return Err(invalid_option(owner, field, "belongs_to", "on_delete"));
    }
    if opts.cardinality == Cardinality::Many {
        return Err(invalid_option(owner, field, "belongs_to", "cardinality"));
    }
    let related = opts
        .queryable
        .ok_or_else(|| AssociationError::MissingQueryable {
            owner: owner.path.to_string(),
            field: field.to_string(),
        })?;

    // related_key: explicit :references, else the parent's primary key.
    let related_key = reference_key(related, field, opts.references.as_deref())?;
    let owner_key = opts
        .foreign_key
        .clone()
        .unwrap_or_else(|| association_key(related, &related_key));
    if !owner.has_field(&owner_key) {
        return Err(AssociationError::UnknownForeignKey {
            owner: owner.path.to_string(),
            field: field.to_string(),
            key: owner_key,
        });
    }

    Ok(BelongsTo {
        cardinality: Cardinality::One,
        field: field.to_string(),
        owner,
        owner_key,
        related,
        related_key,
        queryable: opts.queryable_source(related),
        on_replace: parse_on_replace(field, opts.on_replace.as_deref())?,
        defaults: opts.defaults.clone(),
    })
}

/// Build a through descriptor. `existing` resolves associations already
/// registered on the owner; only the first hop has to exist at this point.
pub(crate) fn build_through<'a>(
    owner: &'static EntityModel,
    field: &str,
    opts: &AssociationOptions,
    existing: impl Fn(&str) -> Option<&'a Association>,
) -> Result<HasThrough, AssociationError> {
    if opts.queryable.is_some() || opts.source.is_some() {
        return Err(AssociationError::QueryableWithThrough {
            owner: owner.path.to_string(),
            field: field.to_string(),
        });
    }
    for (option, set) in [
        ("foreign_key", opts.foreign_key.is_some()),
        ("references", opts.references.is_some()),
        ("on_delete", opts.on_delete.is_some()),
        ("on_replace", opts.on_replace.is_some()),
        ("defaults", !opts.defaults.is_empty()),
    ] {
        if set {
            return Err(invalid_option(owner, field, "through", option));
        }
    }

    let [first, _, ..] = opts.through.as_slice() else {
        return Err(AssociationError::ThroughTooShort {
            owner: owner.path.to_string(),
            field: field.to_string(),
            len: opts.through.len(),
        });
    };
    if existing(first).is_none() {
        return Err(AssociationError::UnknownThroughHop {
            owner: owner.path.to_string(),
            field: field.to_string(),
            hop: first.clone(),
        });
    }

    Ok(HasThrough {
        cardinality: opts.cardinality,
        field: field.to_string(),
        owner,
        through: opts.through.clone(),
    })
}

// Explicit reference key or the model's primary key; must be a declared field.
fn reference_key(
    model: &EntityModel,
    field: &str,
    references: Option<&str>,
) -> Result<String, AssociationError> {
    let reference = match references {
        Some(reference) => reference,
        None => model
            .primary_key
            .ok_or_else(|| AssociationError::MissingReferences {
                owner: model.path.to_string(),
                field: field.to_string(),
            })?,
    };

    if !model.has_field(reference) {
        return Err(AssociationError::UnknownReference {
            owner: model.path.to_string(),
            field: field.to_string(),
            reference: reference.to_string(),
        });
    }

    Ok(reference.to_string())
}

fn parse_on_delete(field: &str, value: Option<&str>) -> Result<OnDelete, AssociationError> {
    value.map_or(Ok(OnDelete::default()), |value| {
        value
            .parse()
            .map_err(|_| AssociationError::InvalidOnDelete {
                field: field.to_string(),
                value: value.to_string(),
                valid: OnDelete::valid_names(),
            })
    })
}

fn parse_on_replace(field: &str, value: Option<&str>) -> Result<OnReplace, AssociationError> {
    value.map_or(Ok(OnReplace::default()), |value| {
        value
            .parse()
            .map_err(|_| AssociationError::InvalidOnReplace {
                field: field.to_string(),
                value: value.to_string(),
                valid: OnReplace::valid_names(),
            })
    })
}

fn invalid_option(
    owner: &EntityModel,
    field: &str,
    kind: &'static str,
    option: &'static str,
) -> AssociationError {
    AssociationError::InvalidOption {
        owner: owner.path.to_string(),
        field: field.to_string(),
        kind,
        option,
    }
}
