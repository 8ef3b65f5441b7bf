use std::cmp::Ordering;

use serde_json::Value;

use crate::entity::{EntityKey, StoredEntity};

/// Comparison applied by a [`Filter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    /// Field equals the value. For array fields, any element equal to the
    /// value matches (multi-valued property semantics).
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

/// A predicate on one top-level document field.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn matches(&self, entity: &StoredEntity) -> bool {
        let Some(actual) = entity.field(&self.field) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => match actual {
                Value::Array(items) => items.contains(&self.value),
                other => other == &self.value,
            },
            FilterOp::Gt => compare(actual, &self.value) == Some(Ordering::Greater),
            FilterOp::Ge => matches!(
                compare(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::Lt => compare(actual, &self.value) == Some(Ordering::Less),
            FilterOp::Le => matches!(
                compare(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

/// A query over entities of one kind.
///
/// Results are ordered by the `order` clauses in sequence, with the entity
/// key as the final tie-breaker so that results are deterministic.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub kind: String,
    pub ancestor: Option<EntityKey>,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ancestor: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Restrict results to children of `parent`.
    pub fn ancestor(mut self, parent: EntityKey) -> Self {
        self.ancestor = Some(parent);
        self
    }

    pub fn filter(
        mut self,
        field: impl Into<String>,
        op: FilterOp,
        value: impl Into<Value>,
    ) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Shorthand for an equality filter.
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order.push(Order {
            field: field.into(),
            direction: Direction::Ascending,
        });
        self
    }

    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.order.push(Order {
            field: field.into(),
            direction: Direction::Descending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `entity` satisfies the kind, ancestor and filter clauses.
    pub fn matches(&self, entity: &StoredEntity) -> bool {
        if entity.key.kind != self.kind {
            return false;
        }
        if let Some(ancestor) = &self.ancestor {
            if entity.parent.as_ref() != Some(ancestor) {
                return false;
            }
        }
        self.filters.iter().all(|f| f.matches(entity))
    }

    /// Order and truncate a set of matching entities in place.
    pub fn finish(&self, results: &mut Vec<StoredEntity>) {
        results.sort_by(|a, b| {
            for clause in &self.order {
                let ordering = compare_optional(a.field(&clause.field), b.field(&clause.field));
                let ordering = match clause.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.key.cmp(&b.key)
        });
        if let Some(limit) = self.limit {
            results.truncate(limit);
        }
    }
}

/// Missing fields sort before present ones.
fn compare_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare(a, b).unwrap_or(Ordering::Equal),
    }
}

/// Compare two scalar JSON values of the same type.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                Some(x.cmp(&y))
            } else {
                x.as_f64()?.partial_cmp(&y.as_f64()?)
            }
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stored(id: &str, parent: Option<&str>, data: Value) -> StoredEntity {
        StoredEntity {
            key: EntityKey::new("Conference", id),
            parent: parent.map(|p| EntityKey::new("Group", p)),
            version: 1,
            data,
        }
    }

    #[test]
    fn eq_matches_scalars_and_array_members() {
        let entity = stored("a", None, json!({"city": "London", "topics": ["Rust", "Go"]}));
        assert!(Query::new("Conference").eq("city", "London").matches(&entity));
        assert!(!Query::new("Conference").eq("city", "Paris").matches(&entity));
        assert!(Query::new("Conference").eq("topics", "Go").matches(&entity));
        assert!(!Query::new("Conference").eq("topics", "Java").matches(&entity));
    }

    #[test]
    fn range_filters_compare_numbers() {
        let entity = stored("a", None, json!({"max_attendees": 50}));
        let gt = |n: i64| Query::new("Conference").filter("max_attendees", FilterOp::Gt, n);
        assert!(gt(49).matches(&entity));
        assert!(!gt(50).matches(&entity));
        assert!(Query::new("Conference")
            .filter("max_attendees", FilterOp::Ge, 50)
            .matches(&entity));
        assert!(Query::new("Conference")
            .filter("max_attendees", FilterOp::Lt, 50.5)
            .matches(&entity));
    }

    #[test]
    fn missing_field_never_matches() {
        let entity = stored("a", None, json!({}));
        assert!(!Query::new("Conference").eq("city", "London").matches(&entity));
        assert!(!Query::new("Conference")
            .filter("n", FilterOp::Le, 1)
            .matches(&entity));
    }

    #[test]
    fn kind_and_ancestor_are_enforced() {
        let entity = stored("a", Some("g1"), json!({}));
        assert!(!Query::new("Ticket").matches(&entity));
        assert!(Query::new("Conference")
            .ancestor(EntityKey::new("Group", "g1"))
            .matches(&entity));
        assert!(!Query::new("Conference")
            .ancestor(EntityKey::new("Group", "g2"))
            .matches(&entity));
    }

    #[test]
    fn finish_orders_then_limits() {
        let mut results = vec![
            stored("1", None, json!({"name": "b", "n": 2})),
            stored("2", None, json!({"name": "a", "n": 3})),
            stored("3", None, json!({"name": "c", "n": 1})),
        ];
        Query::new("Conference").order_by("name").finish(&mut results);
        let names: Vec<_> = results.iter().map(|e| e.key.id.clone()).collect();
        assert_eq!(names, vec!["2", "1", "3"]);

        Query::new("Conference")
            .order_by_desc("n")
            .limit(2)
            .finish(&mut results);
        let ids: Vec<_> = results.iter().map(|e| e.key.id.clone()).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn ties_break_on_key() {
        let mut results = vec![
            stored("b", None, json!({"n": 1})),
            stored("a", None, json!({"n": 1})),
        ];
        Query::new("Conference").order_by("n").finish(&mut results);
        assert_eq!(results[0].key.id, "a");
    }
}
