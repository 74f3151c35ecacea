//! Filter and sort expression trees.

use crate::entity::FieldValue;
use std::fmt;

/// Comparison operator in a filter expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// A literal value on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Floating point literal.
    Float(f64),
    /// Double-quoted string literal.
    Str(String),
}

impl Literal {
    /// Converts the literal into a comparable field value.
    #[must_use]
    pub fn to_field_value(&self) -> FieldValue {
        match self {
            Self::Null => FieldValue::Null,
            Self::Bool(b) => FieldValue::Bool(*b),
            Self::Int(i) => FieldValue::Int(*i),
            Self::Float(f) => FieldValue::Float(*f),
            Self::Str(s) => FieldValue::Str(s.clone()),
        }
    }
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// `field op literal`
    Compare {
        /// Field name.
        field: String,
        /// Character offset of the field name in the source expression.
        offset: usize,
        /// Comparison operator.
        op: CmpOp,
        /// Right-hand side literal.
        value: Literal,
    },
    /// `a && b`
    And(Box<FilterExpr>, Box<FilterExpr>),
    /// `a || b`
    Or(Box<FilterExpr>, Box<FilterExpr>),
    /// `!a`
    Not(Box<FilterExpr>),
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    /// Ascending (the default).
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// One key of a sort spec.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    /// Field name.
    pub field: String,
    /// Character offset of the field name in the source expression.
    pub offset: usize,
    /// Direction for this key.
    pub dir: SortDir,
}

/// A parsed sort spec: one or more keys, applied left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct SortExpr {
    /// Sort keys in priority order.
    pub keys: Vec<SortKey>,
}
