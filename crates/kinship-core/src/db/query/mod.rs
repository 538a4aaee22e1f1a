//! Opaque query shapes produced by the association synthesizer.
//!
//! Shapes are plain data: a root source, an ordered join list, a filter list
//! and a distinct marker. Execution belongs to an external query engine.

pub mod expr;
pub mod rewrite;


use crate::{model::EntityModel, value::Value};
use serde::Serialize;

// re-exports
pub use expr::{Expr, FieldRef, Filter, QueryParam};
pub use rewrite::{BindingMap, rewrite_expr, rewrite_filter, rewrite_join};

///
/// Source
///
/// One queryable source: the type identity plus the storage source it reads
/// from (which may override the type's default).
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Source {
    pub entity: &'static str,
    pub source: String,
}

impl Source {
    #[must_use]
    pub fn new(entity: &'static str, source: impl Into<String>) -> Self {
        Self {
            entity,
            source: source.into(),
        }
    }

    /// Source reading from the model's default storage.
    #[must_use]
    pub fn of(model: &EntityModel) -> Self {
        Self::new(model.path, model.source)
    }
}

///
/// JoinQual
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum JoinQual {
    Inner,
}

///
/// Join
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Join {
    pub qual: JoinQual,
    /// Binding position this join occupies in the composed query.
    pub ix: usize,
    pub source: Source,
    pub on: Filter,
}

///
/// Query
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Query {
    pub from: Source,
    pub joins: Vec<Join>,
    pub filters: Vec<Filter>,
    pub distinct: bool,
}

impl Query {
    #[must_use]
    pub const fn from_source(source: Source) -> Self {
        Self {
            from: source,
            joins: Vec::new(),
            filters: Vec::new(),
            distinct: false,
        }
    }

    /// Binding position the next join will occupy.
    #[must_use]
    pub const fn next_binding(&self) -> usize {
        self.joins.len() + 1
    }

    /// Append an inner join at the next binding position.
    #[must_use]
    pub fn inner_join(mut self, source: Source, on: Filter) -> Self {
        let ix = self.next_binding();
        self.joins.push(Join {
            qual: JoinQual::Inner,
            ix,
            source,
            on,
        });

        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Highest binding index referenced by any join or filter.
    #[must_use]
    pub fn max_binding(&self) -> usize {
        self.joins
            .iter()
            .flat_map(|join| join.on.bindings())
            .chain(self.filters.iter().flat_map(Filter::bindings))
            .max()
            .unwrap_or(0)
    }
}

///
/// UpdateAll
/// Bulk update: the rows selected by `query` receive every `set` pair.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct UpdateAll {
    pub query: Query,
    pub set: Vec<(String, Value)>,
}
