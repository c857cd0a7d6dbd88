//! Metadata filter expressions for collection queries.
//!
//! Grammar (JSON):
//! - `{"field": scalar}` is shorthand for `{"field": {"$eq": scalar}}`
//! - `{"field": {"$eq" | "$ne" | "$gt" | "$gte" | "$lt" | "$lte": value}}`
//! - `{"field": {"$in" | "$nin": [scalar, ...]}}`
//! - `{"$and": [expr, ...]}`, `{"$or": [expr, ...]}`
//!
//! Several keys in one object are AND-ed. Range operators take numbers only.
//! A record without the field fails every predicate except `$ne` and `$nin`.

use crate::types::{Metadata, MetadataValue};
use crate::{Error, ErrorContext, Result};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Eq(MetadataValue),
    Ne(MetadataValue),
    Gt(f64),
    Gte(f64),
    Lt(f64),
    Lte(f64),
    In(Vec<MetadataValue>),
    Nin(Vec<MetadataValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    And(Vec<Where>),
    Or(Vec<Where>),
    Field { field: String, cmp: Comparison },
}

fn invalid(msg: impl Into<String>, path: impl Into<String>) -> Error {
    Error::store_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(path)
            .with_source("where_filter"),
    )
}

impl Where {
    /// Parse a filter. An empty object matches everything.
    pub fn parse(value: &Value) -> Result<Self> {
        Self::parse_at(value, "where")
    }

    fn parse_at(value: &Value, path: &str) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| invalid("Filter expression must be an object", path))?;
        let mut clauses = Vec::with_capacity(object.len());
        for (key, inner) in object {
            let child_path = format!("{}.{}", path, key);
            let clause = match key.as_str() {
                "$and" => Where::And(Self::parse_list(inner, &child_path)?),
                "$or" => Where::Or(Self::parse_list(inner, &child_path)?),
                op if op.starts_with('$') => {
                    return Err(invalid(format!("Unknown logical operator '{}'", op), child_path))
                }
                field => Where::Field {
                    field: field.to_string(),
                    cmp: parse_comparison(inner, &child_path)?,
                },
            };
            clauses.push(clause);
        }
        if clauses.len() == 1 {
            Ok(clauses.remove(0))
        } else {
            Ok(Where::And(clauses))
        }
    }

    fn parse_list(value: &Value, path: &str) -> Result<Vec<Where>> {
        let items = value
            .as_array()
            .ok_or_else(|| invalid("Logical operator expects a list of expressions", path))?;
        if items.is_empty() {
            return Err(invalid("Logical operator expects at least one expression", path));
        }
        items
            .iter()
            .enumerate()
            .map(|(i, item)| Self::parse_at(item, &format!("{}[{}]", path, i)))
            .collect()
    }

    /// Evaluate against a record's metadata (`None` behaves like an empty map).
    pub fn matches(&self, metadata: Option<&Metadata>) -> bool {
        match self {
            Where::And(clauses) => clauses.iter().all(|c| c.matches(metadata)),
            Where::Or(clauses) => clauses.iter().any(|c| c.matches(metadata)),
            Where::Field { field, cmp } => {
                let value = metadata.and_then(|m| m.get(field));
                evaluate(value, cmp)
            }
        }
    }
}

fn parse_comparison(value: &Value, path: &str) -> Result<Comparison> {
    let object = match value {
        Value::Object(object) => object,
        scalar => return Ok(Comparison::Eq(parse_scalar(scalar, path)?)),
    };
    if object.len() != 1 {
        return Err(invalid("Field predicate must have exactly one operator", path));
    }
    let (op, operand) = match object.iter().next() {
        Some(entry) => entry,
        None => return Err(invalid("Field predicate must have exactly one operator", path)),
    };
    let op_path = format!("{}.{}", path, op);
    let cmp = match op.as_str() {
        "$eq" => Comparison::Eq(parse_scalar(operand, &op_path)?),
        "$ne" => Comparison::Ne(parse_scalar(operand, &op_path)?),
        "$gt" => Comparison::Gt(parse_number(operand, &op_path)?),
        "$gte" => Comparison::Gte(parse_number(operand, &op_path)?),
        "$lt" => Comparison::Lt(parse_number(operand, &op_path)?),
        "$lte" => Comparison::Lte(parse_number(operand, &op_path)?),
        "$in" => Comparison::In(parse_scalar_list(operand, &op_path)?),
        "$nin" => Comparison::Nin(parse_scalar_list(operand, &op_path)?),
        other => return Err(invalid(format!("Unknown operator '{}'", other), op_path)),
    };
    Ok(cmp)
}

fn parse_scalar(value: &Value, path: &str) -> Result<MetadataValue> {
    MetadataValue::from_json(value)
        .ok_or_else(|| invalid("Expected a string, number or boolean", path))
}

fn parse_number(value: &Value, path: &str) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| invalid("Range operators expect a number", path))
}

fn parse_scalar_list(value: &Value, path: &str) -> Result<Vec<MetadataValue>> {
    let items = value
        .as_array()
        .ok_or_else(|| invalid("Set operators expect a list", path))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_scalar(item, &format!("{}[{}]", path, i)))
        .collect()
}

fn evaluate(value: Option<&MetadataValue>, cmp: &Comparison) -> bool {
    match (cmp, value) {
        (Comparison::Ne(expected), Some(v)) => !scalar_eq(v, expected),
        (Comparison::Ne(_), None) => true,
        (Comparison::Nin(set), Some(v)) => !set.iter().any(|e| scalar_eq(v, e)),
        (Comparison::Nin(_), None) => true,
        (_, None) => false,
        (Comparison::Eq(expected), Some(v)) => scalar_eq(v, expected),
        (Comparison::In(set), Some(v)) => set.iter().any(|e| scalar_eq(v, e)),
        (Comparison::Gt(bound), Some(v)) => v.as_f64().is_some_and(|x| x > *bound),
        (Comparison::Gte(bound), Some(v)) => v.as_f64().is_some_and(|x| x >= *bound),
        (Comparison::Lt(bound), Some(v)) => v.as_f64().is_some_and(|x| x < *bound),
        (Comparison::Lte(bound), Some(v)) => v.as_f64().is_some_and(|x| x <= *bound),
    }
}

/// Equality with integer/float cross-comparison.
fn scalar_eq(a: &MetadataValue, b: &MetadataValue) -> bool {
    match (a, b) {
        (MetadataValue::String(x), MetadataValue::String(y)) => x == y,
        (MetadataValue::Bool(x), MetadataValue::Bool(y)) => x == y,
        (MetadataValue::Integer(x), MetadataValue::Integer(y)) => x == y,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
            _ => false,
        },
    }
}
