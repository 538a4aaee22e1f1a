//! Binding-index substitution over composed query expressions.
//!
//! When join chains are spliced into an outer query, every positional
//! reference must be renumbered to the outer query's positions. Indices
//! absent from the table pass through unchanged.

use crate::db::query::{
    Join,
    expr::{Expr, Filter},
};
use std::collections::BTreeMap;

///
/// BindingMap
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BindingMap(BTreeMap<usize, usize>);

impl BindingMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-entry table `from → to`.
    #[must_use]
    pub fn single(from: usize, to: usize) -> Self {
        let mut map = Self::new();
        map.insert(from, to);

        map
    }

    pub fn insert(&mut self, from: usize, to: usize) {
        self.0.insert(from, to);
    }

    /// Target for `ix`; unmapped indices map to themselves.
    #[must_use]
    pub fn resolve(&self, ix: usize) -> usize {
        self.0.get(&ix).copied().unwrap_or(ix)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Rewrite every `Binding` node inside `expr`.
pub fn rewrite_expr(expr: &mut Expr, map: &BindingMap) {
    if map.is_empty() {
        return;
    }

    expr.walk_mut(&mut |node| {
        if let Expr::Binding(ix) = node {
            *ix = map.resolve(*ix);
        }
    });
}

/// Rewrite a filter's expression and every parameter cast it carries.
pub fn rewrite_filter(filter: &mut Filter, map: &BindingMap) {
    rewrite_expr(&mut filter.expr, map);

    for param in &mut filter.params {
        if let Some(cast) = param.cast.as_mut() {
            cast.binding = map.resolve(cast.binding);
        }
    }
}

/// Rewrite a join's `on` condition and its own position.
pub fn rewrite_join(join: &mut Join, map: &BindingMap) {
    rewrite_filter(&mut join.on, map);
    join.ix = map.resolve(join.ix);
}
