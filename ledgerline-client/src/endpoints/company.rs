//! Tenant endpoints: the current company, its users, its dashboard, and the
//! super-admin company registry.

use super::{body_without, entity_provides, id_arg, list_provides, path, query_params};
use crate::api_client::{ApiError, ApiRequest};
use crate::cache::{MutationEndpoint, QueryEndpoint};
use ledgerline_core::{TagList, TagType};
use ledgerline_events::tags_for;
use serde_json::Value;

const COMPANY: &str = "/company";
const SUPER_ADMIN: &str = "/super-admin";

pub const GET_COMPANY: QueryEndpoint = QueryEndpoint {
    name: "getCompany",
    request: |args| Ok(ApiRequest::get(path(COMPANY, &id_arg(args)?))),
    provides: |args, _| entity_provides(TagType::Company, args),
};

pub const UPDATE_COMPANY: MutationEndpoint = MutationEndpoint {
    name: "updateCompany",
    request: |args| Ok(ApiRequest::patch(path(COMPANY, &id_arg(args)?), body_without(args, &["id"]))),
    invalidates: |args, _| tags_for("company_update_info", args),
};

pub const GET_USERS: QueryEndpoint = QueryEndpoint {
    name: "getUsers",
    request: |args| Ok(ApiRequest::get(format!("{COMPANY}/users")).with_query(query_params(args))),
    provides: |_, result| list_provides(TagType::Users, TagType::User, result),
};

pub const GET_USER: QueryEndpoint = QueryEndpoint {
    name: "getUser",
    request: |args| Ok(ApiRequest::get(format!("{COMPANY}/users/{}", id_arg(args)?))),
    provides: |args, _| entity_provides(TagType::User, args),
};

pub const CREATE_USER: MutationEndpoint = MutationEndpoint {
    name: "createUser",
    request: |args| {
        if args.get("email").and_then(Value::as_str).map_or(true, str::is_empty) {
            return Err(ApiError::invalid_args("`email` is required"));
        }
        Ok(ApiRequest::post(format!("{COMPANY}/users"), args.clone()))
    },
    invalidates: |_, _| {
        let mut tags = TagList::new();
        tags.list(TagType::Users);
        tags
    },
};

pub const UPDATE_USER: MutationEndpoint = MutationEndpoint {
    name: "updateUser",
    request: |args| {
        let id = id_arg(args)?;
        Ok(ApiRequest::patch(format!("{COMPANY}/users/{id}"), body_without(args, &["id"])))
    },
    invalidates: |args, _| tags_for("user_update_info", args),
};

/// Dashboard figures for `{range}`. Every realtime change can move them, so
/// they are refreshed by explicit refetch rather than by tag.
pub const GET_DASHBOARD: QueryEndpoint = QueryEndpoint {
    name: "getDashboard",
    request: |args| Ok(ApiRequest::get(format!("{COMPANY}/dashboard")).with_query(query_params(args))),
    provides: |_, _| {
        let mut tags = TagList::new();
        tags.list(TagType::Dashboard);
        tags
    },
};

pub const GET_COMPANIES: QueryEndpoint = QueryEndpoint {
    name: "getCompanies",
    request: |args| Ok(ApiRequest::get(format!("{SUPER_ADMIN}/companies")).with_query(query_params(args))),
    provides: |_, result| list_provides(TagType::Companies, TagType::Company, result),
};

pub const CREATE_COMPANY: MutationEndpoint = MutationEndpoint {
    name: "createCompany",
    request: |args| {
        if args.get("name").and_then(Value::as_str).map_or(true, |name| name.trim().is_empty()) {
            return Err(ApiError::invalid_args("`name` is required"));
        }
        Ok(ApiRequest::post(format!("{SUPER_ADMIN}/companies"), args.clone()))
    },
    invalidates: |_, _| {
        let mut tags = TagList::new();
        tags.list(TagType::Companies);
        tags
    },
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_company_matches_push_event() {
        let args = json!({ "id": "c1", "name": "Acme Trading" });
        let request = (UPDATE_COMPANY.request)(&args).unwrap();
        assert_eq!(request.path, "/company/c1");
        let rendered: Vec<String> = (UPDATE_COMPANY.invalidates)(&args, &Value::Null)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, ["Companies:LIST", "Company:c1"]);
    }

    #[test]
    fn create_user_requires_email() {
        assert!((CREATE_USER.request)(&json!({ "name": "x" })).is_err());
        assert!((CREATE_USER.request)(&json!({ "email": "" })).is_err());
        let request = (CREATE_USER.request)(&json!({ "email": "a@b.c" })).unwrap();
        assert_eq!(request.path, "/company/users");
    }

    #[test]
    fn companies_registry_lives_under_super_admin() {
        let request = (GET_COMPANIES.request)(&json!({})).unwrap();
        assert_eq!(request.path, "/super-admin/companies");
        assert!((CREATE_COMPANY.request)(&json!({ "name": "  " })).is_err());
    }
}
