//! Multi-hop associations defined as a chain of existing associations.
//!
//! A through descriptor stores only its chain. Keys, the related type and
//! the queryable are resolved on demand from the first and last physical
//! hop, expanding nested through hops by recursive descent.

use crate::{
    db::{
        association::{
            Association, AssociationKind, DirectHop, PersistResult, PreloadInfo,
            options::{Cardinality, Queryable},
        },
        cascade::replace::{ReplaceAction, ReplaceEffect},
        changeset::ChangeSet,
        entity::Entity,
        query::{
            BindingMap, Filter, Join, JoinQual, Query, Source, rewrite_filter, rewrite_join,
        },
        repo::Repo,
        schema::Reflection,
    },
    error::InternalError,
    model::EntityModel,
    value::Value,
};
use serde::Serialize;

/// Maximum through-of-through nesting; deeper expansion is treated as a cycle.
pub const MAX_THROUGH_DEPTH: usize = 16;

///
/// HasThrough
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct HasThrough {
    pub cardinality: Cardinality,
    pub field: String,
    pub owner: &'static EntityModel,
    pub through: Vec<String>,
}

impl HasThrough {
    /// Expand the chain into its physical (direct) hops, in order.
    pub fn hops<'a>(&self, schema: &'a dyn Reflection) -> Result<Vec<DirectHop<'a>>, InternalError> {
        let mut hops = Vec::new();
        flatten_chain(schema, self, self.owner, &self.through, 0, &mut hops)?;

        Ok(hops)
    }

    /// Owner-side key, taken from the first physical hop.
    pub fn owner_key(&self, schema: &dyn Reflection) -> Result<String, InternalError> {
        let hops = self.hops(schema)?;
        let first = hops.first().ok_or_else(|| self.empty_chain())?;

        Ok(first.owner_key.to_string())
    }

    /// Related-side key, taken from the last physical hop.
    pub fn related_key(&self, schema: &dyn Reflection) -> Result<String, InternalError> {
        let hops = self.hops(schema)?;
        let last = hops.last().ok_or_else(|| self.empty_chain())?;

        Ok(last.related_key.to_string())
    }

    /// Type at the far end of the chain.
    pub fn related(&self, schema: &dyn Reflection) -> Result<&'static EntityModel, InternalError> {
        let hops = self.hops(schema)?;
        let last = hops.last().ok_or_else(|| self.empty_chain())?;

        Ok(last.related)
    }

    /// Queryable of the last physical hop.
    pub fn queryable(&self, schema: &dyn Reflection) -> Result<Queryable, InternalError> {
        let hops = self.hops(schema)?;
        let last = hops.last().ok_or_else(|| self.empty_chain())?;

        Ok(last.queryable.clone())
    }

    fn empty_chain(&self) -> InternalError {
        InternalError::query_configuration(format!(
            "through association `{}` on `{}` resolved to an empty chain",
            self.field, self.owner.path
        ))
    }

    fn misuse(&self, what: &str) -> InternalError {
        InternalError::association_misuse(format!(
            "cannot {what} through association `{}` on `{}`; through associations are read-only, persist the intermediate associations explicitly",
            self.field, self.owner.path
        ))
    }

    // Compose the chain onto `query`, one physical hop at a time.
    fn compose(
        &self,
        schema: &dyn Reflection,
        mut query: Query,
        owner: &'static EntityModel,
        chain: &[String],
        values: Vec<Value>,
        depth: usize,
    ) -> Result<Query, InternalError> {
        check_depth(self.owner, &self.field, depth)?;
        let Some((head, tail)) = chain.split_first() else {
            return Err(self.empty_chain());
        };
        let refl = resolve_hop(schema, owner, head, &self.field)?;

        // A nested through hop is flattened into this chain before composing.
        if let Association::Through(nested) = refl {
            let mut expanded = nested.through.clone();
            expanded.extend(tail.iter().cloned());

            return self.compose(schema, query, owner, &expanded, values, depth + 1);
        }

        // Phase 1: the first hop's membership filter becomes a join.
        let position = query.next_binding();
        let hop_query = refl.assoc_query(schema, None, values)?;
        query.joins.push(assoc_to_join(hop_query, position)?);

        // Phase 2: join the remaining hops, each anchored on the previous one.
        let mut rest = Vec::new();
        flatten_chain(schema, self, refl.related_model(schema)?, tail, depth, &mut rest)?;
        for hop in &rest {
            query = join_hop(query, hop);
        }

        // Phase 3: the last join targets the outer source itself, so it is
        // folded into the filters against binding 0.
        let Some(mut last) = query.joins.pop() else {
            return Err(self.empty_chain());
        };
        let map = BindingMap::single(last.ix, 0);
        for join in &mut query.joins {
            rewrite_join(join, &map);
        }
        rewrite_filter(&mut last.on, &map);
        query.filters.insert(0, last.on);
        query.from = merge_from(query.from, &last.source, &self.field)?;

        Ok(query.distinct())
    }
}

impl AssociationKind for HasThrough {
    fn build(&self, _owner: &Entity, _attributes: &[(String, Value)]) -> Result<Entity, InternalError> {
        Err(self.misuse("build"))
    }

    fn joins_query(&self, schema: &dyn Reflection) -> Result<Query, InternalError> {
        let hops = self.hops(schema)?;

        Ok(hops
            .iter()
            .fold(Query::from_source(Source::of(self.owner)), join_hop))
    }

    fn assoc_query(
        &self,
        schema: &dyn Reflection,
        query: Option<Query>,
        values: Vec<Value>,
    ) -> Result<Query, InternalError> {
        let query = match query {
            Some(query) => query,
            None => Query::from_source(self.queryable(schema)?.to_source()),
        };

        self.compose(schema, query, self.owner, &self.through, values, 0)
    }

    fn preload_info(&self) -> PreloadInfo {
        PreloadInfo::Through {
            chain: self.through.clone(),
        }
    }

    fn on_replace(
        &self,
        _action: ReplaceAction,
        _previous: &Entity,
        _parent: &ChangeSet,
        _repo: &dyn Repo,
    ) -> Result<ReplaceEffect, InternalError> {
        Err(self.misuse("replace a value of"))
    }

    fn persist(
        &self,
        _parent: &ChangeSet,
        _change: ChangeSet,
        _repo: &dyn Repo,
    ) -> Result<PersistResult, InternalError> {
        Err(self.misuse("persist"))
    }
}

fn check_depth(owner: &EntityModel, field: &str, depth: usize) -> Result<(), InternalError> {
    if depth > MAX_THROUGH_DEPTH {
        return Err(InternalError::query_configuration(format!(
            "through association `{field}` on `{}` nests deeper than {MAX_THROUGH_DEPTH} levels; the chain is likely cyclic",
            owner.path
        )));
    }

    Ok(())
}

// Look up one hop on the type currently at the end of the chain.
fn resolve_hop<'a>(
    schema: &'a dyn Reflection,
    model: &EntityModel,
    hop: &str,
    field: &str,
) -> Result<&'a Association, InternalError> {
    schema.association(model.path, hop).ok_or_else(|| {
        InternalError::query_configuration(format!(
            "type `{}` has no association `{hop}` required by through association `{field}`",
            model.path
        ))
    })
}

// Expand `chain`, starting at `model`, into direct hops. Errors name the
// through association being resolved, not the hop.
fn flatten_chain<'a>(
    schema: &'a dyn Reflection,
    through: &HasThrough,
    model: &'static EntityModel,
    chain: &[String],
    depth: usize,
    out: &mut Vec<DirectHop<'a>>,
) -> Result<(), InternalError> {
    let mut current = model;

    for name in chain {
        check_depth(through.owner, &through.field, depth)?;
        let refl = resolve_hop(schema, current, name, &through.field)?;

        match refl {
            Association::Through(nested) => {
                let start = out.len();
                flatten_chain(schema, through, current, &nested.through, depth + 1, out)?;
                if let Some(last) = out[start..].last() {
                    current = last.related;
                }
            }
            Association::DirectChild(_) | Association::DirectParent(_) => {
                let Some(hop) = refl.as_direct() else {
                    continue;
                };
                current = hop.related;
                out.push(hop);
            }
        }
    }

    Ok(())
}

// Inner join `hop` anchored on the most recent binding.
fn join_hop(query: Query, hop: &DirectHop<'_>) -> Query {
    let anchor = query.joins.last().map_or(0, |join| join.ix);
    let ix = query.next_binding();
    let on = Filter::fields_eq(ix, hop.related_key, anchor, hop.owner_key);

    query.inner_join(hop.queryable.to_source(), on)
}

// Turn a single-source, single-filter query into a join at `position`.
fn assoc_to_join(query: Query, position: usize) -> Result<Join, InternalError> {
    let Query {
        from,
        joins,
        mut filters,
        ..
    } = query;

    if !joins.is_empty() || filters.len() != 1 {
        return Err(InternalError::query_configuration(format!(
            "through hop on `{}` must produce a single-source, single-filter query (joins={}, filters={})",
            from.entity,
            joins.len(),
            filters.len()
        )));
    }

    let mut on = filters.remove(0);
    rewrite_filter(&mut on, &BindingMap::single(0, position));

    Ok(Join {
        qual: JoinQual::Inner,
        ix: position,
        source: from,
        on,
    })
}

// The outer query must already select the chain's target type. Its own
// storage source is kept.
fn merge_from(outer: Source, target: &Source, field: &str) -> Result<Source, InternalError> {
    if outer.entity != target.entity {
        return Err(InternalError::query_configuration(format!(
            "through association `{field}` targets `{}` but the outer query selects `{}`",
            target.entity, outer.entity
        )));
    }

    Ok(outer)
}
