//! Query types
//!
//! Constraint encoding follows the Parse REST `where` syntax, so a query
//! built here can be sent to a Parse server as-is.

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sort direction for a sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

/// A single field in the sort order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Field to sort by
    pub field: String,
    /// Direction
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortKey {
    /// Ascending sort on a field
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending sort on a field
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDirection::Ascending => write!(f, "{}", self.field),
            SortDirection::Descending => write!(f, "-{}", self.field),
        }
    }
}

/// A query against one class of records
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Query {
    /// Class (collection) name
    pub class_name: String,
    /// `where` constraints in Parse syntax
    #[serde(rename = "where", default)]
    pub constraints: JsonObject,
    /// Sort keys, most significant first
    #[serde(default)]
    pub order: Vec<SortKey>,
    /// Maximum number of records to return
    #[serde(default)]
    pub limit: Option<usize>,
    /// Number of matching records to skip
    #[serde(default)]
    pub skip: usize,
}

impl Query {
    /// Create an unconstrained query on a class
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Default::default()
        }
    }

    /// Replace all constraints
    #[must_use]
    pub fn with_constraints(mut self, constraints: JsonObject) -> Self {
        self.constraints = constraints;
        self
    }

    // ========================================================================
    // Window
    // ========================================================================

    /// Set the maximum number of results
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the number of results to skip
    #[must_use]
    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    // ========================================================================
    // Ordering
    // ========================================================================

    /// Sort ascending by a field, replacing any existing order
    #[must_use]
    pub fn ascending(mut self, field: impl Into<String>) -> Self {
        self.order = vec![SortKey::ascending(field)];
        self
    }

    /// Sort descending by a field, replacing any existing order
    #[must_use]
    pub fn descending(mut self, field: impl Into<String>) -> Self {
        self.order = vec![SortKey::descending(field)];
        self
    }

    /// Append an ascending sort key
    #[must_use]
    pub fn add_ascending(mut self, field: impl Into<String>) -> Self {
        self.order.push(SortKey::ascending(field));
        self
    }

    /// Append a descending sort key
    #[must_use]
    pub fn add_descending(mut self, field: impl Into<String>) -> Self {
        self.order.push(SortKey::descending(field));
        self
    }

    /// Whether an explicit sort order is set
    pub fn has_order(&self) -> bool {
        !self.order.is_empty()
    }

    /// Sort order in REST form (`"createdAt,-score"`), if any
    pub fn order_param(&self) -> Option<String> {
        if self.order.is_empty() {
            return None;
        }
        Some(
            self.order
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    // ========================================================================
    // Constraints
    // ========================================================================

    /// Match records whose field equals a value
    #[must_use]
    pub fn equal_to(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.constraints.insert(field.into(), value.into());
        self
    }

    /// Match records whose field does not equal a value
    #[must_use]
    pub fn not_equal_to(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.add_condition(field, "$ne", value)
    }

    /// Match records whose field is strictly greater than a value
    #[must_use]
    pub fn greater_than(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.add_condition(field, "$gt", value)
    }

    /// Match records whose field is greater than or equal to a value
    #[must_use]
    pub fn greater_than_or_equal_to(
        self,
        field: impl Into<String>,
        value: impl Into<JsonValue>,
    ) -> Self {
        self.add_condition(field, "$gte", value)
    }

    /// Match records whose field is strictly less than a value
    #[must_use]
    pub fn less_than(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.add_condition(field, "$lt", value)
    }

    /// Match records whose field is less than or equal to a value
    #[must_use]
    pub fn less_than_or_equal_to(
        self,
        field: impl Into<String>,
        value: impl Into<JsonValue>,
    ) -> Self {
        self.add_condition(field, "$lte", value)
    }

    /// Match records whose field is one of the given values
    #[must_use]
    pub fn contained_in<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<JsonValue>,
    {
        let values: Vec<JsonValue> = values.into_iter().map(Into::into).collect();
        self.add_condition(field, "$in", values)
    }

    /// Match records that have the field set
    #[must_use]
    pub fn exists(self, field: impl Into<String>) -> Self {
        self.add_condition(field, "$exists", true)
    }

    /// Match records that do not have the field set
    #[must_use]
    pub fn does_not_exist(self, field: impl Into<String>) -> Self {
        self.add_condition(field, "$exists", false)
    }

    /// Add an operator condition on a field
    ///
    /// Operators on the same field accumulate (`{"$gt": a, "$lt": b}`); an
    /// equality constraint on the field is replaced.
    #[must_use]
    pub fn add_condition(
        mut self,
        field: impl Into<String>,
        operator: &str,
        value: impl Into<JsonValue>,
    ) -> Self {
        let field = field.into();
        let value = value.into();

        match self.constraints.get_mut(&field) {
            Some(JsonValue::Object(ops)) if is_operator_map(ops) => {
                ops.insert(operator.to_string(), value);
            }
            _ => {
                let mut ops = JsonObject::new();
                ops.insert(operator.to_string(), value);
                self.constraints.insert(field, JsonValue::Object(ops));
            }
        }
        self
    }

    /// `where` constraints as a JSON string
    pub fn where_param(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.constraints)?)
    }

    /// Validate the query before it is sent to an engine
    pub fn validate(&self) -> Result<()> {
        if self.class_name.trim().is_empty() {
            return Err(Error::invalid_query("class name is empty"));
        }
        if let Some(key) = self.order.iter().find(|k| k.field.is_empty()) {
            return Err(Error::invalid_query(format!("empty sort field in {key}")));
        }
        Ok(())
    }
}

/// An operator map is a non-empty object whose keys all start with `$`
pub(crate) fn is_operator_map(map: &JsonObject) -> bool {
    !map.is_empty() && map.keys().all(|k| k.starts_with('$'))
}
