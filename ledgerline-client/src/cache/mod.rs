//! Query/mutation cache keyed by endpoint and arguments, invalidated by tag.

mod endpoint;
mod handle;
mod key;
pub(crate) mod lock;
mod mutation;
mod store;

pub use endpoint::{
    invalidates_nothing, provides_nothing, InvalidatesFn, MutationEndpoint, ProvidesFn,
    QueryEndpoint, RequestFn,
};
pub use handle::{QueryHandle, QueryState, QueryStatus};
pub use key::QueryKey;
pub use mutation::Mutation;
pub use store::{CacheStats, QueryCache};
