//! Compilation of parsed expressions against a field-accessor map.
//!
//! Field names are resolved to accessor fn pointers exactly once, here.
//! Evaluating a compiled expression per row is lookup-free.

use crate::entity::{Entity, FieldMap, FieldValue};
use crate::error::{CoreError, CoreResult};
use crate::query::ast::{CmpOp, FilterExpr, SortDir, SortExpr};
use std::cmp::Ordering;
use std::fmt;

enum Node<T> {
    Cmp {
        get: fn(&T) -> FieldValue,
        op: CmpOp,
        value: FieldValue,
    },
    And(Box<Node<T>>, Box<Node<T>>),
    Or(Box<Node<T>>, Box<Node<T>>),
    Not(Box<Node<T>>),
}

/// A filter expression bound to entity type `T`.
pub struct CompiledFilter<T> {
    root: Node<T>,
}

impl<T: Entity> CompiledFilter<T> {
    /// Binds a parsed filter to the entity's field map.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Parse`] naming any field the entity type does
    /// not publish.
    pub fn compile(expr: &FilterExpr, map: &FieldMap<T>) -> CoreResult<Self> {
        Ok(Self {
            root: compile_node(expr, map)?,
        })
    }

    /// Evaluates the filter against one entity.
    #[must_use]
    pub fn matches(&self, entity: &T) -> bool {
        eval(&self.root, entity)
    }
}

impl<T> fmt::Debug for CompiledFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFilter").finish_non_exhaustive()
    }
}

fn compile_node<T: Entity>(expr: &FilterExpr, map: &FieldMap<T>) -> CoreResult<Node<T>> {
    match expr {
        FilterExpr::Compare {
            field,
            offset,
            op,
            value,
        } => {
            let get = map
                .get(field)
                .ok_or_else(|| CoreError::parse(field.clone(), *offset, "unknown field"))?;
            Ok(Node::Cmp {
                get,
                op: *op,
                value: value.to_field_value(),
            })
        }
        FilterExpr::And(a, b) => Ok(Node::And(
            Box::new(compile_node(a, map)?),
            Box::new(compile_node(b, map)?),
        )),
        FilterExpr::Or(a, b) => Ok(Node::Or(
            Box::new(compile_node(a, map)?),
            Box::new(compile_node(b, map)?),
        )),
        FilterExpr::Not(inner) => Ok(Node::Not(Box::new(compile_node(inner, map)?))),
    }
}

fn eval<T>(node: &Node<T>, entity: &T) -> bool {
    match node {
        Node::Cmp { get, op, value } => {
            let actual = get(entity);
            match op {
                CmpOp::Eq => actual.equals(value),
                CmpOp::Ne => !actual.equals(value),
                CmpOp::Lt => actual.compare(value) == Some(Ordering::Less),
                CmpOp::Le => matches!(
                    actual.compare(value),
                    Some(Ordering::Less | Ordering::Equal)
                ),
                CmpOp::Gt => actual.compare(value) == Some(Ordering::Greater),
                CmpOp::Ge => matches!(
                    actual.compare(value),
                    Some(Ordering::Greater | Ordering::Equal)
                ),
            }
        }
        Node::And(a, b) => eval(a, entity) && eval(b, entity),
        Node::Or(a, b) => eval(a, entity) || eval(b, entity),
        Node::Not(inner) => !eval(inner, entity),
    }
}

/// A sort spec bound to entity type `T`.
pub struct CompiledSort<T> {
    keys: Vec<(fn(&T) -> FieldValue, SortDir)>,
}

impl<T: Entity> CompiledSort<T> {
    /// Binds a parsed sort spec to the entity's field map.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Parse`] naming any field the entity type does
    /// not publish.
    pub fn compile(expr: &SortExpr, map: &FieldMap<T>) -> CoreResult<Self> {
        let keys = expr
            .keys
            .iter()
            .map(|key| {
                map.get(&key.field)
                    .map(|get| (get, key.dir))
                    .ok_or_else(|| CoreError::parse(key.field.clone(), key.offset, "unknown field"))
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self { keys })
    }

    /// Compares two entities under this sort spec.
    ///
    /// Incomparable values (mismatched kinds, nulls) are treated as equal,
    /// which leaves their relative store order intact under a stable sort.
    #[must_use]
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        for (get, dir) in &self.keys {
            let ordering = get(a).compare(&get(b)).unwrap_or(Ordering::Equal);
            let ordering = match dir {
                SortDir::Asc => ordering,
                SortDir::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl<T> fmt::Debug for CompiledSort<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSort")
            .field("keys", &self.keys.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::FieldSpec;
    use crate::query::parser::{parse_filter, parse_sort};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        age: i64,
        active: bool,
    }

    impl Entity for Sample {
        const SET: &'static str = "samples";

        fn fields() -> &'static [FieldSpec<Self>] {
            const FIELDS: &[FieldSpec<Sample>] = &[
                FieldSpec::new("name", |s| FieldValue::Str(s.name.clone())),
                FieldSpec::new("age", |s| FieldValue::Int(s.age)),
                FieldSpec::new("active", |s| FieldValue::Bool(s.active)),
            ];
            FIELDS
        }
    }

    fn sample(name: &str, age: i64, active: bool) -> Sample {
        Sample {
            name: name.into(),
            age,
            active,
        }
    }

    fn compile(input: &str) -> CompiledFilter<Sample> {
        CompiledFilter::compile(&parse_filter(input).unwrap(), &FieldMap::of()).unwrap()
    }

    #[test]
    fn comparison_operators_evaluate() {
        let adult = compile("age >= 18");
        assert!(adult.matches(&sample("a", 18, true)));
        assert!(!adult.matches(&sample("b", 17, true)));

        let not_bob = compile("name != \"bob\"");
        assert!(not_bob.matches(&sample("alice", 1, true)));
        assert!(!not_bob.matches(&sample("bob", 1, true)));
    }

    #[test]
    fn boolean_operators_evaluate() {
        let filter = compile("age >= 18 && age < 30 || active == true");
        assert!(filter.matches(&sample("a", 25, false)));
        assert!(filter.matches(&sample("b", 99, true)));
        assert!(!filter.matches(&sample("c", 99, false)));

        let negated = compile("!(active == true)");
        assert!(negated.matches(&sample("d", 1, false)));
    }

    #[test]
    fn unknown_field_fails_compile_with_its_name() {
        let expr = parse_filter("salary > 10").unwrap();
        let err = CompiledFilter::<Sample>::compile(&expr, &FieldMap::of()).unwrap_err();
        match err {
            CoreError::Parse { fragment, .. } => assert_eq!(fragment, "salary"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn sort_orders_by_keys_and_direction() {
        let sort =
            CompiledSort::<Sample>::compile(&parse_sort("age desc, name asc").unwrap(), &FieldMap::of())
                .unwrap();

        let mut items = vec![
            sample("carol", 30, true),
            sample("alice", 40, true),
            sample("bob", 30, true),
        ];
        items.sort_by(|a, b| sort.compare(a, b));

        let names: Vec<_> = items.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["alice", "bob", "carol"]);
    }
}
