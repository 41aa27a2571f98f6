//! `/auth` endpoints. Login and logout are driven through
//! [`LedgerClient`](crate::LedgerClient), which also manages the session.

use super::entity_provides;
use crate::api_client::{ApiError, ApiRequest};
use crate::cache::{invalidates_nothing, MutationEndpoint, QueryEndpoint};
use ledgerline_core::{TagList, TagType};
use serde_json::{json, Value};

pub const LOGIN: MutationEndpoint = MutationEndpoint {
    name: "login",
    request: login_request,
    invalidates: invalidates_nothing,
};

pub const LOGOUT: MutationEndpoint = MutationEndpoint {
    name: "logout",
    request: |_| Ok(ApiRequest::post("/auth/logout", Value::Null)),
    invalidates: invalidates_nothing,
};

/// The user behind the current token.
pub const GET_ME: QueryEndpoint = QueryEndpoint {
    name: "getMe",
    request: |_| Ok(ApiRequest::get("/auth/me")),
    provides: |_, result| match result {
        Some(user) => entity_provides(TagType::User, user),
        None => TagList::new(),
    },
};

fn login_request(args: &Value) -> Result<ApiRequest, ApiError> {
    let email = required_str(args, "email")?;
    let password = required_str(args, "password")?;
    Ok(ApiRequest::post(
        "/auth/login",
        json!({ "email": email, "password": password }),
    ))
}

fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str, ApiError> {
    args.get(name)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::invalid_args(format!("`{name}` is required")))
}
