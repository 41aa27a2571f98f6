//! Ledgerline Core - Cache Tag Model
//!
//! Pure data types shared by every other Ledgerline crate. A [`Tag`] names a
//! cacheable entity (`Account:a1`) or a whole collection view (`Accounts:LIST`).
//! Queries declare the tags they provide, mutations and realtime events declare
//! the tags they invalidate, and the cache refetches wherever the two meet.
//!
//! This crate contains ONLY data types and the tag-list combinators - no I/O.

pub mod effect;
pub mod error;
pub mod identity;
pub mod tag;

pub use effect::{collection_effect, TagList};
pub use error::TagParseError;
pub use identity::EntityId;
pub use tag::{Tag, TagId, TagType, LIST_SENTINEL};
