//! Typed event payloads with fail-soft field decoding.
//!
//! Every field is optional on the wire. Ids decode through
//! [`EntityId::from_json`] (falsy or mistyped values become `None`), id arrays
//! keep their valid elements and drop the rest, and flags follow truthiness.

use ledgerline_core::EntityId;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Payload carrying a single entity id: either a bare id or `{"id": ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdPayload {
    pub id: Option<EntityId>,
}

impl IdPayload {
    pub fn from_json(value: &Value) -> Self {
        let id = EntityId::from_json(value).or_else(|| value.get("id").and_then(EntityId::from_json));
        Self { id }
    }
}

/// Payload carrying several ids: either a bare array or `{"ids": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdsPayload {
    pub ids: Vec<EntityId>,
}

impl IdsPayload {
    pub fn from_json(value: &Value) -> Self {
        let ids = match value {
            Value::Array(_) => ids_from_json(value),
            Value::Object(map) => map.get("ids").map(ids_from_json).unwrap_or_default(),
            _ => Vec::new(),
        };
        Self { ids }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BookingApproved {
    #[serde(deserialize_with = "lenient_id")]
    pub booking_id: Option<EntityId>,
    #[serde(deserialize_with = "lenient_ids")]
    pub affected_product_ids: Vec<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BookingRef {
    #[serde(deserialize_with = "lenient_id")]
    pub booking_id: Option<EntityId>,
}

/// A payment recorded against an accounts-receivable entry.
///
/// Overpayments may touch existing pending excesses or create a new one, and
/// the payment may have consumed a credit memo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArPayment {
    #[serde(deserialize_with = "lenient_id")]
    pub accounts_receivable_id: Option<EntityId>,
    #[serde(deserialize_with = "lenient_ids")]
    pub affected_pending_excess_ids: Vec<EntityId>,
    #[serde(deserialize_with = "lenient_flag")]
    pub new_pending_excess_created: bool,
    #[serde(deserialize_with = "lenient_id")]
    pub affected_account_id: Option<EntityId>,
    #[serde(deserialize_with = "lenient_id")]
    pub used_credit_memo_id: Option<EntityId>,
}

/// Cancellation or change of a sale behind an accounts-receivable entry.
///
/// `restocked` is set when the server's restock policy put goods back into
/// inventory; `affected_product_ids` lists the products whose stock moved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArSaleChange {
    #[serde(deserialize_with = "lenient_id")]
    pub accounts_receivable_id: Option<EntityId>,
    #[serde(deserialize_with = "lenient_id")]
    pub sale_id: Option<EntityId>,
    #[serde(deserialize_with = "lenient_id")]
    pub invoice_id: Option<EntityId>,
    #[serde(deserialize_with = "lenient_ids")]
    pub affected_product_ids: Vec<EntityId>,
    #[serde(deserialize_with = "lenient_flag")]
    pub restocked: bool,
    #[serde(deserialize_with = "lenient_ids")]
    pub affected_pending_excess_ids: Vec<EntityId>,
    #[serde(deserialize_with = "lenient_flag")]
    pub new_pending_excess_created: bool,
    #[serde(deserialize_with = "lenient_id")]
    pub affected_account_id: Option<EntityId>,
    #[serde(deserialize_with = "lenient_id")]
    pub used_credit_memo_id: Option<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PendingExcessRefunded {
    #[serde(deserialize_with = "lenient_id")]
    pub pending_excess_id: Option<EntityId>,
    #[serde(deserialize_with = "lenient_id")]
    pub refund_id: Option<EntityId>,
    #[serde(deserialize_with = "lenient_id")]
    pub affected_account_id: Option<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PendingExcessToCreditMemo {
    #[serde(deserialize_with = "lenient_id")]
    pub pending_excess_id: Option<EntityId>,
    #[serde(deserialize_with = "lenient_id")]
    pub credit_memo_id: Option<EntityId>,
    #[serde(deserialize_with = "lenient_id")]
    pub affected_account_id: Option<EntityId>,
}

/// Decode an object payload into `T`, falling back to `T::default()`.
pub(crate) fn from_object<T>(value: &Value) -> T
where
    T: for<'de> Deserialize<'de> + Default,
{
    match value {
        Value::Object(_) => T::deserialize(value).unwrap_or_default(),
        _ => T::default(),
    }
}

fn ids_from_json(value: &Value) -> Vec<EntityId> {
    match value {
        Value::Array(items) => items.iter().filter_map(EntityId::from_json).collect(),
        _ => Vec::new(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<EntityId>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(EntityId::from_json(&value))
}

fn lenient_ids<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<EntityId>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(ids_from_json(&value))
}

fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(truthy(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(raw: &str) -> EntityId {
        EntityId::new(raw).unwrap()
    }

    #[test]
    fn id_payload_accepts_bare_and_wrapped_ids() {
        assert_eq!(IdPayload::from_json(&json!("a1")).id, Some(id("a1")));
        assert_eq!(IdPayload::from_json(&json!({ "id": "a1" })).id, Some(id("a1")));
        assert_eq!(IdPayload::from_json(&json!({ "id": "" })).id, None);
        assert_eq!(IdPayload::from_json(&json!(null)).id, None);
    }

    #[test]
    fn ids_payload_drops_bad_elements() {
        let payload = IdsPayload::from_json(&json!(["a1", null, "", 7, {"x": 1}]));
        assert_eq!(payload.ids, vec![id("a1"), id("7")]);

        let payload = IdsPayload::from_json(&json!({ "ids": ["a2"] }));
        assert_eq!(payload.ids, vec![id("a2")]);

        assert!(IdsPayload::from_json(&json!("a1")).ids.is_empty());
    }

    #[test]
    fn mistyped_fields_decode_as_absent() {
        let payload: ArPayment = from_object(&json!({
            "accountsReceivableId": "ar1",
            "affectedPendingExcessIds": "not-an-array",
            "newPendingExcessCreated": null,
            "affectedAccountId": false,
            "usedCreditMemoId": { "nested": true },
        }));
        assert_eq!(payload.accounts_receivable_id, Some(id("ar1")));
        assert!(payload.affected_pending_excess_ids.is_empty());
        assert!(!payload.new_pending_excess_created);
        assert_eq!(payload.affected_account_id, None);
        assert_eq!(payload.used_credit_memo_id, None);
    }

    #[test]
    fn non_object_payload_uses_default() {
        let payload: BookingApproved = from_object(&json!(["b1", ["p1"]]));
        assert_eq!(payload, BookingApproved::default());
    }

    #[test]
    fn flags_follow_truthiness() {
        for (value, expected) in [
            (json!(true), true),
            (json!(1), true),
            (json!("yes"), true),
            (json!(false), false),
            (json!(0), false),
            (json!(""), false),
            (json!(null), false),
        ] {
            let payload: ArPayment = from_object(&json!({ "newPendingExcessCreated": value }));
            assert_eq!(payload.new_pending_excess_created, expected);
        }
    }
}
