//! Endpoint catalogue for the Ledgerline REST API.
//!
//! Each resource module declares its reads as [`QueryEndpoint`]s (with the tags
//! they provide) and its writes as [`MutationEndpoint`]s (with the tags they
//! invalidate). List reads provide the collection tag plus one entity tag per
//! returned row, so invalidating `Account:a1` also refreshes any list that
//! showed `a1`.
//!
//! Writes whose server-side effect fans out (approving a booking, recording a
//! payment, cancelling a sale) invalidate exactly what the matching realtime
//! event would, so the writer sees its own change without waiting for the push.
//!
//! [`QueryEndpoint`]: crate::cache::QueryEndpoint
//! [`MutationEndpoint`]: crate::cache::MutationEndpoint

pub mod accounts;
pub mod auth;
pub mod bookings;
pub mod company;
pub mod invoices;
pub mod products;
pub mod receivables;

use crate::api_client::ApiError;
use ledgerline_core::{EntityId, TagList, TagType};
use serde_json::{Map, Value};

/// Entity id from either a bare id or an object carrying `id`.
pub(crate) fn id_arg(args: &Value) -> Result<EntityId, ApiError> {
    EntityId::from_json(args)
        .or_else(|| args.get("id").and_then(EntityId::from_json))
        .ok_or_else(|| ApiError::invalid_args("an entity id is required"))
}

/// Named id field of an object argument.
pub(crate) fn field_id(args: &Value, field: &str) -> Result<EntityId, ApiError> {
    args.get(field)
        .and_then(EntityId::from_json)
        .ok_or_else(|| ApiError::invalid_args(format!("`{field}` is required")))
}

/// Ids from either a bare array or an object carrying `ids`. Bad elements are
/// skipped; an empty result is an error.
pub(crate) fn ids_arg(args: &Value) -> Result<Vec<EntityId>, ApiError> {
    let items = match args {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("ids") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };
    let ids: Vec<EntityId> = items.iter().filter_map(EntityId::from_json).collect();
    if ids.is_empty() {
        return Err(ApiError::invalid_args("at least one id is required"));
    }
    Ok(ids)
}

/// Lenient variant of [`ids_arg`] for computing tags.
pub(crate) fn ids_or_empty(args: &Value) -> Vec<EntityId> {
    ids_arg(args).unwrap_or_default()
}

/// Request body: the argument object minus routing fields.
pub(crate) fn body_without(args: &Value, routing: &[&str]) -> Value {
    match args {
        Value::Object(map) => {
            let body: Map<String, Value> = map
                .iter()
                .filter(|(key, _)| !routing.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            Value::Object(body)
        }
        other => other.clone(),
    }
}

/// Query-string pairs from an object argument. `null` and nested objects are
/// skipped; arrays are comma-joined.
pub(crate) fn query_params(args: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = args else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(key, value)| scalar_param(value).map(|rendered| (key.clone(), rendered)))
        .collect()
}

fn scalar_param(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_param).collect();
            (!parts.is_empty()).then(|| parts.join(","))
        }
        Value::Null | Value::Object(_) => None,
    }
}

/// Rows of a list response: a bare array, or the array under `data`, `items`
/// or `rows`.
pub(crate) fn rows(result: &Value) -> &[Value] {
    match result {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => ["data", "items", "rows"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

/// Ids of the rows in a list response (`id` or `_id`).
pub(crate) fn row_ids(result: &Value) -> Vec<EntityId> {
    rows(result)
        .iter()
        .filter_map(|row| {
            row.get("id")
                .and_then(EntityId::from_json)
                .or_else(|| row.get("_id").and_then(EntityId::from_json))
        })
        .collect()
}

/// `list:LIST` plus `entity:id` for every row of the result, if any.
pub(crate) fn list_provides(list: TagType, entity: TagType, result: Option<&Value>) -> TagList {
    let mut tags = TagList::new();
    tags.list(list);
    if let Some(result) = result {
        tags.entities(entity, &row_ids(result));
    }
    tags
}

/// `kind:id` for the id argument, or nothing when it is missing.
pub(crate) fn entity_provides(kind: TagType, args: &Value) -> TagList {
    let mut tags = TagList::new();
    tags.entity_opt(kind, id_arg(args).ok().as_ref());
    tags
}

/// Merge the argument object under the result object. Used to feed a mutation
/// outcome through the realtime invalidation table when the server omits ids
/// the caller already knows.
pub(crate) fn merged_outcome(args: &Value, result: &Value) -> Value {
    let mut merged = match args {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    if let Value::Object(map) = result {
        for (key, value) in map {
            if !value.is_null() {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(merged)
}

pub(crate) fn path(base: &str, id: &EntityId) -> String {
    format!("{base}/{id}")
}
