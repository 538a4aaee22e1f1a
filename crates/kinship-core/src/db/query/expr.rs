use crate::value::Value;
use serde::Serialize;

///
/// Expr
///
/// Closed expression-node type used by join conditions and filters.
/// Positional bindings refer to the query's sources: `0` is the root source,
/// `n` is the n-th join.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Expr {
    /// Positional reference to one source of the composed query.
    Binding(usize),
    /// Field access on a source expression (normally a `Binding`).
    Field(Box<Self>, String),
    /// Index into the owning filter's parameter list.
    Param(usize),
    Literal(Value),
    Eq(Box<Self>, Box<Self>),
    In(Box<Self>, Box<Self>),
    IsNull(Box<Self>),
    Not(Box<Self>),
    And(Box<Self>, Box<Self>),
    Or(Box<Self>, Box<Self>),
}

impl Expr {
    /// `&binding.name`
    #[must_use]
    pub fn field(binding: usize, name: impl Into<String>) -> Self {
        Self::Field(Box::new(Self::Binding(binding)), name.into())
    }

    #[must_use]
    pub fn eq(left: Self, right: Self) -> Self {
        Self::Eq(Box::new(left), Box::new(right))
    }

    #[must_use]
    pub fn in_(left: Self, right: Self) -> Self {
        Self::In(Box::new(left), Box::new(right))
    }

    #[must_use]
    pub fn and(left: Self, right: Self) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    /// Collect every binding index referenced anywhere in the tree.
    #[must_use]
    pub fn bindings(&self) -> Vec<usize> {
        let mut out = Vec::new();
        self.walk(&mut |expr| {
            if let Self::Binding(ix) = expr {
                out.push(*ix);
            }
        });
        out.sort_unstable();
        out.dedup();

        out
    }

    // Pre-order visit of every node.
    fn walk(&self, f: &mut impl FnMut(&Self)) {
        f(self);
        match self {
            Self::Binding(_) | Self::Param(_) | Self::Literal(_) => {}
            Self::Field(inner, _) | Self::IsNull(inner) | Self::Not(inner) => inner.walk(f),
            Self::Eq(left, right)
            | Self::In(left, right)
            | Self::And(left, right)
            | Self::Or(left, right) => {
                left.walk(f);
                right.walk(f);
            }
        }
    }

    // Pre-order mutable visit of every node.
    pub(crate) fn walk_mut(&mut self, f: &mut impl FnMut(&mut Self)) {
        f(self);
        match self {
            Self::Binding(_) | Self::Param(_) | Self::Literal(_) => {}
            Self::Field(inner, _) | Self::IsNull(inner) | Self::Not(inner) => inner.walk_mut(f),
            Self::Eq(left, right)
            | Self::In(left, right)
            | Self::And(left, right)
            | Self::Or(left, right) => {
                left.walk_mut(f);
                right.walk_mut(f);
            }
        }
    }
}

///
/// FieldRef
/// (binding index, field) pair a parameter is typed against.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FieldRef {
    pub binding: usize,
    pub field: String,
}

impl FieldRef {
    #[must_use]
    pub fn new(binding: usize, field: impl Into<String>) -> Self {
        Self {
            binding,
            field: field.into(),
        }
    }
}

///
/// QueryParam
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct QueryParam {
    pub value: Value,
    /// Field the value is cast against, when known.
    pub cast: Option<FieldRef>,
}

impl QueryParam {
    #[must_use]
    pub const fn new(value: Value, cast: Option<FieldRef>) -> Self {
        Self { value, cast }
    }
}

///
/// Filter
///
/// Boolean expression plus the parameters its `Param` nodes index into.
/// Used both as a `where` entry and as a join's `on` condition.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Filter {
    pub expr: Expr,
    pub params: Vec<QueryParam>,
}

impl Filter {
    #[must_use]
    pub const fn new(expr: Expr) -> Self {
        Self {
            expr,
            params: Vec::new(),
        }
    }

    /// `&binding.field in ^values`
    #[must_use]
    pub fn field_in(binding: usize, field: &str, values: Vec<Value>) -> Self {
        Self {
            expr: Expr::in_(Expr::field(binding, field), Expr::Param(0)),
            params: vec![QueryParam::new(
                Value::List(values),
                Some(FieldRef::new(binding, field)),
            )],
        }
    }

    /// `&left.left_field == &right.right_field`
    #[must_use]
    pub fn fields_eq(left: usize, left_field: &str, right: usize, right_field: &str) -> Self {
        Self::new(Expr::eq(
            Expr::field(left, left_field),
            Expr::field(right, right_field),
        ))
    }

    /// Every binding index referenced by the expression or parameter casts.
    #[must_use]
    pub fn bindings(&self) -> Vec<usize> {
        let mut out = self.expr.bindings();
        out.extend(
            self.params
                .iter()
                .filter_map(|param| param.cast.as_ref().map(|cast| cast.binding)),
        );
        out.sort_unstable();
        out.dedup();

        out
    }
}
