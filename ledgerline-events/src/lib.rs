//! Ledgerline Events - Realtime Events and Invalidation Table
//!
//! The server pushes named business events (`account_added`, `booking_approved`,
//! `ar_payment`, ...) over the realtime channel. This crate turns each one into a
//! typed [`RealtimeEvent`] and computes the cache tags it invalidates.
//!
//! # Failure semantics
//!
//! Decoding never fails. Missing or malformed payload fields decode to "absent",
//! and absent ids drop their dependent tags. An unknown event name decodes to
//! [`RealtimeEvent::Unknown`], which invalidates nothing. A single bad event can
//! therefore never break the listener for the events that follow it.
//!
//! ```
//! use ledgerline_events::tags_for;
//! use serde_json::json;
//!
//! let tags = tags_for("accounts_deleted", &json!(["a1", "a2"]));
//! let rendered: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
//! assert_eq!(rendered, ["Accounts:LIST", "Account:a1", "Account:a2"]);
//! ```

mod event;
mod frame;
mod payload;
mod table;

pub use event::{RealtimeEvent, EVENT_NAMES};
pub use frame::{FrameError, RealtimeFrame};
pub use payload::{
    ArPayment, ArSaleChange, BookingApproved, BookingRef, IdPayload, IdsPayload,
    PendingExcessRefunded, PendingExcessToCreditMemo,
};

use ledgerline_core::TagList;
use serde_json::Value;

/// Decode `(name, payload)` and return the tags it invalidates.
pub fn tags_for(name: &str, payload: &Value) -> TagList {
    RealtimeEvent::decode(name, payload).invalidation_tags()
}
