//! Endpoint descriptors consumed by the query cache.

use crate::api_client::{ApiError, ApiRequest};
use ledgerline_core::TagList;
use serde_json::Value;
use std::fmt;

pub type RequestFn = fn(&Value) -> Result<ApiRequest, ApiError>;
/// Tags provided by a query, given its arguments and (once fulfilled) its result.
pub type ProvidesFn = fn(&Value, Option<&Value>) -> TagList;
/// Tags invalidated by a successful mutation, given its arguments and result.
pub type InvalidatesFn = fn(&Value, &Value) -> TagList;

/// A cached read.
#[derive(Clone, Copy)]
pub struct QueryEndpoint {
    pub name: &'static str,
    pub request: RequestFn,
    pub provides: ProvidesFn,
}

/// A write whose success invalidates tags.
#[derive(Clone, Copy)]
pub struct MutationEndpoint {
    pub name: &'static str,
    pub request: RequestFn,
    pub invalidates: InvalidatesFn,
}

impl fmt::Debug for QueryEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryEndpoint").field("name", &self.name).finish()
    }
}

impl fmt::Debug for MutationEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationEndpoint").field("name", &self.name).finish()
    }
}

/// Provides nothing. For reads that no event can make stale.
pub fn provides_nothing(_args: &Value, _result: Option<&Value>) -> TagList {
    TagList::new()
}

/// Invalidates nothing.
pub fn invalidates_nothing(_args: &Value, _result: &Value) -> TagList {
    TagList::new()
}
