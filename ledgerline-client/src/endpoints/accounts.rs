//! `/account` endpoints.

use super::{body_without, entity_provides, id_arg, ids_arg, ids_or_empty, list_provides, path, query_params};
use crate::api_client::{ApiError, ApiRequest};
use crate::cache::{MutationEndpoint, QueryEndpoint};
use ledgerline_core::{TagList, TagType};
use serde_json::{json, Value};

const BASE: &str = "/account";

pub const GET_ACCOUNTS: QueryEndpoint = QueryEndpoint {
    name: "getAccounts",
    request: |args| Ok(ApiRequest::get(BASE).with_query(query_params(args))),
    provides: |_, result| list_provides(TagType::Accounts, TagType::Account, result),
};

pub const GET_ACCOUNT: QueryEndpoint = QueryEndpoint {
    name: "getAccount",
    request: |args| Ok(ApiRequest::get(path(BASE, &id_arg(args)?))),
    provides: |args, _| entity_provides(TagType::Account, args),
};

/// Balance, credit and aging figures for one account.
pub const GET_ACCOUNT_METRICS: QueryEndpoint = QueryEndpoint {
    name: "getAccountMetrics",
    request: |args| Ok(ApiRequest::get(format!("{}/metrics", path(BASE, &id_arg(args)?)))),
    provides: |args, _| entity_provides(TagType::AccountMetrics, args),
};

/// Ledger view of one account: receivables, pending excess, credit memos.
pub const GET_ACCOUNT_DETAILS: QueryEndpoint = QueryEndpoint {
    name: "getAccountDetails",
    request: |args| Ok(ApiRequest::get(format!("{}/details", path(BASE, &id_arg(args)?)))),
    provides: |args, _| entity_provides(TagType::AccountDetails, args),
};

pub const CREATE_ACCOUNT: MutationEndpoint = MutationEndpoint {
    name: "createAccount",
    request: create_request,
    invalidates: |_, _| lists_only(),
};

/// Bulk import; takes `{accounts: [...]}` or a bare array.
pub const CREATE_ACCOUNTS: MutationEndpoint = MutationEndpoint {
    name: "createAccounts",
    request: create_many_request,
    invalidates: |_, _| lists_only(),
};

pub const UPDATE_ACCOUNT: MutationEndpoint = MutationEndpoint {
    name: "updateAccount",
    request: update_request,
    invalidates: update_invalidates,
};

pub const DELETE_ACCOUNTS: MutationEndpoint = MutationEndpoint {
    name: "deleteAccounts",
    request: delete_request,
    invalidates: delete_invalidates,
};

fn create_request(args: &Value) -> Result<ApiRequest, ApiError> {
    if !args.is_object() {
        return Err(ApiError::invalid_args("account payload must be an object"));
    }
    Ok(ApiRequest::post(BASE, args.clone()))
}

fn create_many_request(args: &Value) -> Result<ApiRequest, ApiError> {
    let accounts = match args {
        Value::Array(_) => args.clone(),
        Value::Object(map) => map.get("accounts").cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    };
    if !accounts.is_array() {
        return Err(ApiError::invalid_args("`accounts` must be an array"));
    }
    Ok(ApiRequest::post(format!("{BASE}/bulk"), json!({ "accounts": accounts })))
}

fn update_request(args: &Value) -> Result<ApiRequest, ApiError> {
    let id = id_arg(args)?;
    Ok(ApiRequest::patch(path(BASE, &id), body_without(args, &["id"])))
}

fn update_invalidates(args: &Value, _result: &Value) -> TagList {
    let mut tags = TagList::new();
    tags.list(TagType::Accounts);
    if let Ok(id) = id_arg(args) {
        tags.entity(TagType::Account, &id)
            .entity(TagType::AccountDetails, &id)
            .entity(TagType::AccountMetrics, &id);
    }
    tags
}

fn delete_request(args: &Value) -> Result<ApiRequest, ApiError> {
    let ids = ids_arg(args)?;
    Ok(ApiRequest::delete(BASE).with_body(json!({ "ids": ids })))
}

fn delete_invalidates(args: &Value, _result: &Value) -> TagList {
    let mut tags = TagList::new();
    tags.list(TagType::Accounts)
        .entities(TagType::Account, &ids_or_empty(args));
    tags
}

fn lists_only() -> TagList {
    let mut tags = TagList::new();
    tags.list(TagType::Accounts);
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::Method;

    fn rendered(tags: TagList) -> Vec<String> {
        tags.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn account_reads_build_paths() {
        let request = (GET_ACCOUNT.request)(&json!("a1")).unwrap();
        assert_eq!(request.path, "/account/a1");

        let request = (GET_ACCOUNT_METRICS.request)(&json!({ "id": "a1" })).unwrap();
        assert_eq!(request.path, "/account/a1/metrics");

        let request = (GET_ACCOUNTS.request)(&json!({ "search": "acme" })).unwrap();
        assert_eq!(request.query, vec![("search".to_string(), "acme".to_string())]);

        assert!((GET_ACCOUNT.request)(&Value::Null).is_err());
    }

    #[test]
    fn update_invalidates_entity_views() {
        let request = (UPDATE_ACCOUNT.request)(&json!({ "id": "a1", "name": "Acme" })).unwrap();
        assert_eq!(request.method, Method::Patch);
        assert_eq!(request.body, Some(json!({ "name": "Acme" })));

        let tags = (UPDATE_ACCOUNT.invalidates)(&json!({ "id": "a1" }), &Value::Null);
        assert_eq!(
            rendered(tags),
            ["Accounts:LIST", "Account:a1", "AccountDetails:a1", "AccountMetrics:a1"]
        );
    }

    #[test]
    fn delete_matches_realtime_event() {
        let args = json!({ "ids": ["a1", "a2"] });
        let request = (DELETE_ACCOUNTS.request)(&args).unwrap();
        assert_eq!(request.body, Some(json!({ "ids": ["a1", "a2"] })));

        let tags = (DELETE_ACCOUNTS.invalidates)(&args, &Value::Null);
        assert_eq!(tags, ledgerline_events::tags_for("accounts_deleted", &args));
    }

    #[test]
    fn bulk_create_requires_array() {
        assert!((CREATE_ACCOUNTS.request)(&json!({ "accounts": {} })).is_err());
        let request = (CREATE_ACCOUNTS.request)(&json!([{ "name": "a" }])).unwrap();
        assert_eq!(request.path, "/account/bulk");
    }
}
