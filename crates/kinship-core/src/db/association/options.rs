use crate::{db::query::Source, model::EntityModel, value::Value};
use serde::Serialize;
use std::{fmt, str::FromStr};

///
/// Cardinality
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum Cardinality {
    #[default]
    One,
    Many,
}

///
/// Relationship
///
/// `Child`: the related side holds the foreign key.
/// `Parent`: the owner holds the foreign key itself.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Relationship {
    Parent,
    Child,
}

///
/// OnDelete
/// Policy applied to related rows when the owner is deleted elsewhere.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum OnDelete {
    #[default]
    Nothing,
    ClearReferences,
    DeleteAll,
}

impl OnDelete {
    pub const ALL: [Self; 3] = [Self::Nothing, Self::ClearReferences, Self::DeleteAll];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nothing => "nothing",
            Self::ClearReferences => "clear_references",
            Self::DeleteAll => "delete_all",
        }
    }
}

///
/// OnReplace
/// Disposition of a superseded one-to-one value.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum OnReplace {
    #[default]
    Raise,
    MarkInvalid,
    Delete,
    Nilify,
}

impl OnReplace {
    pub const ALL: [Self; 4] = [Self::Raise, Self::MarkInvalid, Self::Delete, Self::Nilify];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raise => "raise",
            Self::MarkInvalid => "mark_invalid",
            Self::Delete => "delete",
            Self::Nilify => "nilify",
        }
    }
}

///
/// UnknownPolicy
/// Parse failure for a policy name; carries the rejected text.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownPolicy(pub String);

// Policy enums share the same text surface: snake_case names, Display = name.
macro_rules! impl_policy_text {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownPolicy;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .into_iter()
                    .find(|policy| policy.as_str() == s)
                    .ok_or_else(|| UnknownPolicy(s.to_string()))
            }
        }

        impl $ty {
            /// Comma-separated list of every accepted name.
            #[must_use]
            pub fn valid_names() -> String {
                Self::ALL
                    .iter()
                    .map(|policy| format!("`{}`", policy.as_str()))
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }
    };
}

impl_policy_text!(OnDelete);
impl_policy_text!(OnReplace);

///
/// Queryable
///
/// Source description used when filtering related rows: the related type,
/// optionally reading from an overriding storage source.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Queryable {
    pub model: &'static EntityModel,
    pub source: Option<String>,
}

impl Queryable {
    #[must_use]
    pub const fn new(model: &'static EntityModel) -> Self {
        Self {
            model,
            source: None,
        }
    }

    #[must_use]
    pub fn to_source(&self) -> Source {
        Source::new(
            self.model.path,
            self.source.as_deref().unwrap_or(self.model.source),
        )
    }
}

///
/// AssociationOptions
///
/// Declarative options as written in a type's schema definition. Policy
/// options stay textual here and are parsed when the descriptor is built.
///

#[derive(Clone, Debug, Default)]
pub struct AssociationOptions {
    pub cardinality: Cardinality,
    pub queryable: Option<&'static EntityModel>,
    pub source: Option<String>,
    pub through: Vec<String>,
    pub foreign_key: Option<String>,
    pub references: Option<String>,
    pub on_delete: Option<String>,
    pub on_replace: Option<String>,
    pub defaults: Vec<(String, Value)>,
}

impl AssociationOptions {
    #[must_use]
    pub fn new(cardinality: Cardinality) -> Self {
        Self {
            cardinality,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn one() -> Self {
        Self::new(Cardinality::One)
    }

    #[must_use]
    pub fn many() -> Self {
        Self::new(Cardinality::Many)
    }

    #[must_use]
    pub fn queryable(mut self, model: &'static EntityModel) -> Self {
        self.queryable = Some(model);
        self
    }

    /// Override the storage source the related type is read from.
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn through<I, S>(mut self, chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.through = chain.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn foreign_key(mut self, key: impl Into<String>) -> Self {
        self.foreign_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn references(mut self, key: impl Into<String>) -> Self {
        self.references = Some(key.into());
        self
    }

    #[must_use]
    pub fn on_delete(mut self, policy: impl Into<String>) -> Self {
        self.on_delete = Some(policy.into());
        self
    }

    #[must_use]
    pub fn on_replace(mut self, policy: impl Into<String>) -> Self {
        self.on_replace = Some(policy.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.push((field.into(), value.into()));
        self
    }

    pub(crate) fn queryable_source(&self, model: &'static EntityModel) -> Queryable {
        Queryable {
            model,
            source: self.source.clone(),
        }
    }
}
