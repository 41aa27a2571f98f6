//! `/accounts-receivable` endpoints.
//!
//! Payments, sale cancellations/changes and pending-excess conversions are
//! reconciled server-side. Each write invalidates through the realtime table
//! using the server's outcome merged over the caller's arguments, so the tags
//! match the push event the server broadcasts for the same change.

use super::{body_without, entity_provides, field_id, id_arg, list_provides, merged_outcome, path, query_params};
use crate::api_client::{ApiError, ApiRequest};
use crate::cache::{MutationEndpoint, QueryEndpoint};
use ledgerline_core::{EntityId, TagType};
use ledgerline_events::tags_for;
use serde_json::{json, Value};

const BASE: &str = "/accounts-receivable";
const PENDING_EXCESS: &str = "/accounts-receivable/pending-excess";

pub const GET_ACCOUNTS_RECEIVABLES: QueryEndpoint = QueryEndpoint {
    name: "getAccountsReceivables",
    request: |args| Ok(ApiRequest::get(BASE).with_query(query_params(args))),
    provides: |_, result| list_provides(TagType::AccountsReceivables, TagType::AccountsReceivable, result),
};

pub const GET_ACCOUNTS_RECEIVABLE: QueryEndpoint = QueryEndpoint {
    name: "getAccountsReceivable",
    request: |args| Ok(ApiRequest::get(path(BASE, &receivable_id(args)?))),
    provides: |args, _| entity_provides(TagType::AccountsReceivable, args),
};

pub const GET_PAYMENTS: QueryEndpoint = QueryEndpoint {
    name: "getPayments",
    request: |args| Ok(ApiRequest::get(format!("{BASE}/payments")).with_query(query_params(args))),
    provides: |_, result| list_provides(TagType::Payments, TagType::Payment, result),
};

pub const GET_PENDING_EXCESSES: QueryEndpoint = QueryEndpoint {
    name: "getPendingExcesses",
    request: |args| Ok(ApiRequest::get(PENDING_EXCESS).with_query(query_params(args))),
    provides: |_, result| list_provides(TagType::PendingExcesses, TagType::PendingExcess, result),
};

pub const GET_CREDIT_MEMOS: QueryEndpoint = QueryEndpoint {
    name: "getCreditMemos",
    request: |args| Ok(ApiRequest::get(format!("{BASE}/credit-memos")).with_query(query_params(args))),
    provides: |_, result| list_provides(TagType::CreditMemos, TagType::CreditMemo, result),
};

pub const GET_REFUNDS: QueryEndpoint = QueryEndpoint {
    name: "getRefunds",
    request: |args| Ok(ApiRequest::get(format!("{BASE}/refunds")).with_query(query_params(args))),
    provides: |_, result| list_provides(TagType::Refunds, TagType::Refund, result),
};

/// `{accountsReceivableId, amount, useCreditMemoId?, ...}`.
pub const RECORD_PAYMENT: MutationEndpoint = MutationEndpoint {
    name: "recordPayment",
    request: |args| {
        positive_amount(args)?;
        receivable_action(args, "payment")
    },
    invalidates: |args, result| tags_for("ar_payment", &receivable_outcome(args, result)),
};

/// `{accountsReceivableId, saleId, restock, ...}`.
pub const CANCEL_SALE: MutationEndpoint = MutationEndpoint {
    name: "cancelSale",
    request: |args| receivable_action(args, "cancel-sale"),
    invalidates: |args, result| tags_for("ar_cancel_sale", &receivable_outcome(args, result)),
};

/// `{accountsReceivableId, saleId, items, restock, ...}`.
pub const CHANGE_SALE: MutationEndpoint = MutationEndpoint {
    name: "changeSale",
    request: |args| receivable_action(args, "change-sale"),
    invalidates: |args, result| tags_for("ar_change_sale", &receivable_outcome(args, result)),
};

pub const REFUND_PENDING_EXCESS: MutationEndpoint = MutationEndpoint {
    name: "refundPendingExcess",
    request: |args| pending_excess_action(args, "refund"),
    invalidates: |args, result| {
        tags_for("pending_excess_refunded", &pending_excess_outcome(args, result))
    },
};

pub const CONVERT_PENDING_EXCESS_TO_CREDIT_MEMO: MutationEndpoint = MutationEndpoint {
    name: "convertPendingExcessToCreditMemo",
    request: |args| pending_excess_action(args, "credit-memo"),
    invalidates: |args, result| {
        tags_for("pending_excess_to_credit_memo", &pending_excess_outcome(args, result))
    },
};

fn receivable_id(args: &Value) -> Result<EntityId, ApiError> {
    field_id(args, "accountsReceivableId").or_else(|_| id_arg(args))
}

fn pending_excess_id(args: &Value) -> Result<EntityId, ApiError> {
    field_id(args, "pendingExcessId").or_else(|_| id_arg(args))
}

fn positive_amount(args: &Value) -> Result<f64, ApiError> {
    args.get("amount")
        .and_then(Value::as_f64)
        .filter(|amount| *amount > 0.0)
        .ok_or_else(|| ApiError::invalid_args("`amount` must be a positive number"))
}

fn receivable_action(args: &Value, action: &str) -> Result<ApiRequest, ApiError> {
    let id = receivable_id(args)?;
    Ok(ApiRequest::post(
        format!("{}/{action}", path(BASE, &id)),
        body_without(args, &["id", "accountsReceivableId"]),
    ))
}

fn pending_excess_action(args: &Value, action: &str) -> Result<ApiRequest, ApiError> {
    let id = pending_excess_id(args)?;
    Ok(ApiRequest::post(
        format!("{}/{action}", path(PENDING_EXCESS, &id)),
        body_without(args, &["id", "pendingExcessId"]),
    ))
}

/// Request fields that name an effect the server reports under another name.
/// They fill in for the reported field when the response leaves it out.
const REQUESTED_EFFECTS: [(&str, &str); 2] = [("restock", "restocked"), ("useCreditMemoId", "usedCreditMemoId")];

fn receivable_outcome(args: &Value, result: &Value) -> Value {
    let mut merged = keyed_outcome(args, result, "accountsReceivableId", receivable_id(args).ok());
    if let Value::Object(map) = &mut merged {
        for (requested, reported) in REQUESTED_EFFECTS {
            let Some(value) = args.get(requested).filter(|value| !value.is_null()) else {
                continue;
            };
            if map.get(reported).map_or(true, Value::is_null) {
                map.insert(reported.to_string(), value.clone());
            }
        }
    }
    merged
}

fn pending_excess_outcome(args: &Value, result: &Value) -> Value {
    keyed_outcome(args, result, "pendingExcessId", pending_excess_id(args).ok())
}

fn keyed_outcome(args: &Value, result: &Value, field: &str, id: Option<EntityId>) -> Value {
    let mut merged = merged_outcome(args, result);
    if let (Value::Object(map), Some(id)) = (&mut merged, id) {
        map.entry(field).or_insert_with(|| json!(id));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(tags: ledgerline_core::TagList) -> Vec<String> {
        tags.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn payment_request_validates_amount() {
        assert!((RECORD_PAYMENT.request)(&json!({ "accountsReceivableId": "r1", "amount": 0 })).is_err());
        let request = (RECORD_PAYMENT.request)(&json!({ "accountsReceivableId": "r1", "amount": 50 })).unwrap();
        assert_eq!(request.path, "/accounts-receivable/r1/payment");
        assert_eq!(request.body, Some(json!({ "amount": 50 })));
    }

    #[test]
    fn payment_invalidation_follows_outcome() {
        let args = json!({ "accountsReceivableId": "r1", "amount": 50 });
        let result = json!({
            "affectedPendingExcessIds": [],
            "newPendingExcessCreated": true,
            "affectedAccountId": "a1",
            "usedCreditMemoId": null
        });
        let tags = (RECORD_PAYMENT.invalidates)(&args, &result);
        assert_eq!(
            rendered(tags),
            [
                "AccountsReceivables:LIST",
                "AccountsReceivable:r1",
                "Payments:LIST",
                "AccountMetrics:a1",
                "AccountDetails:a1",
                "PendingExcesses:LIST",
            ]
        );
    }

    #[test]
    fn pending_excess_refund_keys_outcome() {
        let request = (REFUND_PENDING_EXCESS.request)(&json!("pe1")).unwrap();
        assert_eq!(request.path, "/accounts-receivable/pending-excess/pe1/refund");

        let tags = (REFUND_PENDING_EXCESS.invalidates)(&json!("pe1"), &json!({ "refundId": "rf1" }));
        assert_eq!(
            rendered(tags),
            ["PendingExcesses:LIST", "Refunds:LIST", "PendingExcess:pe1", "Refund:rf1"]
        );
    }

    #[test]
    fn cancel_sale_matches_push_event() {
        let args = json!({ "accountsReceivableId": "r1", "saleId": "s1", "restock": true });
        let result = json!({ "invoiceId": "i1", "affectedProductIds": ["p1"], "restocked": true });
        let tags = (CANCEL_SALE.invalidates)(&args, &result);
        let pushed = tags_for("ar_cancel_sale", &merged_outcome(&args, &result));
        assert_eq!(tags, pushed);
        assert!(rendered(tags).contains(&"StockHistoryList:p1".to_string()));
    }

    #[test]
    fn bare_ack_keeps_requested_restock() {
        let args = json!({ "accountsReceivableId": "r1", "saleId": "s1", "restock": true });
        let tags = rendered((CANCEL_SALE.invalidates)(&args, &json!({ "ok": true })));
        assert_eq!(
            tags,
            [
                "AccountsReceivables:LIST",
                "AccountsReceivable:r1",
                "Sales:LIST",
                "Sale:s1",
                "Invoices:LIST",
                "Payments:LIST",
                "Products:LIST",
                "ProductsToRestock:LIST",
            ]
        );

        let reported = rendered((CANCEL_SALE.invalidates)(&args, &json!({ "restocked": false })));
        assert!(!reported.contains(&"Products:LIST".to_string()));
    }

    #[test]
    fn bare_ack_keeps_requested_credit_memo() {
        let args = json!({ "accountsReceivableId": "r1", "amount": 50, "useCreditMemoId": "cm1" });
        let tags = rendered((RECORD_PAYMENT.invalidates)(&args, &json!({ "ok": true })));
        assert!(tags.contains(&"CreditMemos:LIST".to_string()));
        assert!(tags.contains(&"CreditMemo:cm1".to_string()));
    }
}
