//! In-memory query engine
//!
//! Holds classes of records in memory and evaluates the subset of Parse
//! constraints that queries in this crate produce.

use super::types::{FindOptions, MemoryEngineConfig};
use super::QueryEngine;
use crate::error::{Error, Result};
use crate::query::{is_operator_map, Query, SortDirection};
use crate::types::{
    format_date, parse_date, JsonObject, JsonValue, Record, CREATED_AT, OBJECT_ID,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Injected failure for the n-th `find` call
#[derive(Debug, Clone)]
struct FailurePlan {
    call: usize,
    message: String,
}

/// In-memory [`QueryEngine`]
#[derive(Debug)]
pub struct MemoryEngine {
    /// Records per class, in insertion order
    classes: RwLock<HashMap<String, Vec<Record>>>,
    /// Limits
    config: MemoryEngineConfig,
    /// Every query received, in order
    calls: Mutex<Vec<Query>>,
    /// Number of `find` calls so far
    call_count: AtomicUsize,
    /// Sequence used to stamp missing objectId/createdAt
    sequence: AtomicUsize,
    /// Optional injected failure
    failure: Option<FailurePlan>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// Create an empty engine with default limits
    pub fn new() -> Self {
        Self::with_config(MemoryEngineConfig::default())
    }

    /// Create an empty engine with custom limits
    pub fn with_config(config: MemoryEngineConfig) -> Self {
        Self {
            classes: RwLock::new(HashMap::new()),
            config,
            calls: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
            sequence: AtomicUsize::new(0),
            failure: None,
        }
    }

    /// Build an engine from a JSON document of the form
    /// `{"ClassName": [{...}, ...], ...}`
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let classes = value
            .as_object()
            .ok_or_else(|| Error::decode("expected an object of class name to records"))?;

        let mut engine = Self::new();
        for (class_name, records) in classes {
            let records = records.as_array().ok_or_else(|| {
                Error::decode(format!("class '{class_name}' must hold an array of records"))
            })?;
            let records = records
                .iter()
                .cloned()
                .map(|r| {
                    Record::from_value(r).ok_or_else(|| {
                        Error::decode(format!("class '{class_name}' holds a non-object record"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            engine = engine.with_records(class_name.clone(), records);
        }
        Ok(engine)
    }

    /// Add records to a class while building the engine
    #[must_use]
    pub fn with_records(mut self, class_name: impl Into<String>, records: Vec<Record>) -> Self {
        let stamped: Vec<Record> = records.into_iter().map(|r| self.stamp(r)).collect();
        self.classes
            .get_mut()
            .entry(class_name.into())
            .or_default()
            .extend(stamped);
        self
    }

    /// Fail the n-th `find` call (1-based) with a fetch error
    #[must_use]
    pub fn fail_on_call(mut self, call: usize, message: impl Into<String>) -> Self {
        self.failure = Some(FailurePlan {
            call,
            message: message.into(),
        });
        self
    }

    /// Insert a record, stamping `objectId` and `createdAt` when absent
    pub async fn insert(&self, class_name: &str, record: Record) {
        let record = self.stamp(record);
        self.classes
            .write()
            .await
            .entry(class_name.to_string())
            .or_default()
            .push(record);
    }

    /// Insert `count` empty records into a class
    pub async fn insert_empty(&self, class_name: &str, count: usize) {
        let records: Vec<Record> = (0..count).map(|_| self.stamp(Record::default())).collect();
        self.classes
            .write()
            .await
            .entry(class_name.to_string())
            .or_default()
            .extend(records);
    }

    /// Number of records stored in a class
    pub async fn count(&self, class_name: &str) -> usize {
        self.classes
            .read()
            .await
            .get(class_name)
            .map_or(0, Vec::len)
    }

    /// Every query received so far
    pub async fn calls(&self) -> Vec<Query> {
        self.calls.lock().await.clone()
    }

    /// Number of `find` calls so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(AtomicOrdering::SeqCst)
    }

    /// Limits in effect
    pub fn config(&self) -> &MemoryEngineConfig {
        &self.config
    }

    fn stamp(&self, mut record: Record) -> Record {
        let seq = self.sequence.fetch_add(1, AtomicOrdering::SeqCst);
        if record.object_id().is_none() {
            record.set(OBJECT_ID, format!("obj{seq:08}"));
        }
        if record.get(CREATED_AT).is_none() {
            let created_at = stamp_epoch() + Duration::milliseconds(seq as i64);
            record.set(CREATED_AT, format_date(&created_at));
        }
        record
    }
}

#[async_trait]
impl QueryEngine for MemoryEngine {
    async fn find(&self, query: &Query, _options: &FindOptions) -> Result<Vec<Record>> {
        let call = self.call_count.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        self.calls.lock().await.push(query.clone());

        if let Some(failure) = &self.failure {
            if failure.call == call {
                return Err(Error::fetch(failure.message.clone()));
            }
        }

        query.validate()?;

        if let Some(max_skip) = self.config.max_skip {
            if query.skip > max_skip {
                return Err(Error::parse(
                    102,
                    format!("Skip {} exceeds the maximum of {max_skip}", query.skip),
                ));
            }
        }

        let classes = self.classes.read().await;
        let Some(records) = classes.get(&query.class_name) else {
            return Ok(Vec::new());
        };

        let mut matched = Vec::new();
        for record in records {
            if matches_constraints(record, &query.constraints)? {
                matched.push(record);
            }
        }

        if query.has_order() {
            matched.sort_by(|a, b| {
                for key in &query.order {
                    let ord = compare_fields(a.get(&key.field), b.get(&key.field));
                    let ord = match key.direction {
                        SortDirection::Ascending => ord,
                        SortDirection::Descending => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let limit = query
            .limit
            .unwrap_or(self.config.default_limit)
            .min(self.config.max_limit);

        let page: Vec<Record> = matched
            .into_iter()
            .skip(query.skip)
            .take(limit)
            .cloned()
            .collect();

        debug!(
            "find {} skip={} limit={}: {} records",
            query.class_name,
            query.skip,
            limit,
            page.len()
        );

        Ok(page)
    }
}

/// Base timestamp for stamped records
fn stamp_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Check a record against `where` constraints
fn matches_constraints(record: &Record, constraints: &JsonObject) -> Result<bool> {
    for (field, condition) in constraints {
        let value = record.get(field);
        let matched = match condition {
            JsonValue::Object(ops) if is_operator_map(ops) => {
                let mut all = true;
                for (op, operand) in ops {
                    if !matches_operator(value, op, operand)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            _ => value.is_some_and(|v| values_equal(v, condition)),
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_operator(value: Option<&JsonValue>, op: &str, operand: &JsonValue) -> Result<bool> {
    let matched = match op {
        "$exists" => {
            let want = operand
                .as_bool()
                .ok_or_else(|| Error::invalid_query("$exists expects a boolean"))?;
            value.is_some_and(|v| !v.is_null()) == want
        }
        "$ne" => !value.is_some_and(|v| values_equal(v, operand)),
        "$in" => {
            let options = operand
                .as_array()
                .ok_or_else(|| Error::invalid_query("$in expects an array"))?;
            value.is_some_and(|v| options.iter().any(|o| values_equal(v, o)))
        }
        "$gt" | "$gte" | "$lt" | "$lte" => {
            let Some(ord) = value.and_then(|v| compare_values(v, operand)) else {
                return Ok(false);
            };
            match op {
                "$gt" => ord == Ordering::Greater,
                "$gte" => ord != Ordering::Less,
                "$lt" => ord == Ordering::Less,
                _ => ord != Ordering::Greater,
            }
        }
        other => {
            return Err(Error::invalid_query(format!(
                "unsupported operator '{other}'"
            )))
        }
    };
    Ok(matched)
}

fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    compare_values(a, b).map_or(a == b, |ord| ord == Ordering::Equal)
}

/// Compare two values of the same kind; dates compare chronologically
fn compare_values(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    if let (Some(da), Some(db)) = (parse_date(a), parse_date(b)) {
        return Some(da.cmp(&db));
    }
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (JsonValue::String(x), JsonValue::String(y)) => Some(x.cmp(y)),
        (JsonValue::Bool(x), JsonValue::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Sort comparison; missing fields sort first
fn compare_fields(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
    }
}
