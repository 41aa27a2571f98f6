//! Realtime event types.
//!
//! One variant per named push-channel event. Payload-less events carry no data;
//! the rest carry a typed payload whose fields are all optional.

use crate::payload::{
    from_object, ArPayment, ArSaleChange, BookingApproved, BookingRef, IdPayload, IdsPayload,
    PendingExcessRefunded, PendingExcessToCreditMemo,
};
use serde_json::Value;
use tracing::debug;

/// Every event name the listener subscribes to.
pub const EVENT_NAMES: [&str; 22] = [
    "account_added",
    "accounts_added",
    "accounts_deleted",
    "account_update_info",
    "product_added",
    "products_added",
    "products_deleted",
    "product_update_info",
    "product_add_stocks",
    "product_remove_stocks",
    "booking_added",
    "booking_approved",
    "booking_rejected",
    "booking_cancelled",
    "bookings_deleted",
    "ar_payment",
    "ar_cancel_sale",
    "ar_change_sale",
    "pending_excess_refunded",
    "pending_excess_to_credit_memo",
    "company_update_info",
    "user_update_info",
];

/// A business event pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    // ========================================================================
    // ACCOUNT EVENTS
    // ========================================================================
    AccountAdded,
    AccountsAdded,
    AccountsDeleted(IdsPayload),
    AccountUpdateInfo(IdPayload),

    // ========================================================================
    // PRODUCT / INVENTORY EVENTS
    // ========================================================================
    ProductAdded,
    ProductsAdded,
    ProductsDeleted(IdsPayload),
    ProductUpdateInfo(IdPayload),
    ProductAddStocks(IdPayload),
    ProductRemoveStocks(IdPayload),

    // ========================================================================
    // BOOKING EVENTS
    // ========================================================================
    BookingAdded,
    /// Approval turns a booking into an invoice, a sale and a receivable, and
    /// draws stock from the booked products.
    BookingApproved(BookingApproved),
    BookingRejected(BookingRef),
    BookingCancelled(BookingRef),
    BookingsDeleted(IdsPayload),

    // ========================================================================
    // ACCOUNTS RECEIVABLE EVENTS
    // ========================================================================
    ArPayment(ArPayment),
    ArCancelSale(ArSaleChange),
    ArChangeSale(ArSaleChange),
    PendingExcessRefunded(PendingExcessRefunded),
    PendingExcessToCreditMemo(PendingExcessToCreditMemo),

    // ========================================================================
    // TENANT EVENTS
    // ========================================================================
    CompanyUpdateInfo(IdPayload),
    UserUpdateInfo(IdPayload),

    /// An event name this client does not know. Invalidates nothing.
    Unknown { name: String },
}

impl RealtimeEvent {
    /// Decode an event from its name and JSON payload. Never fails.
    pub fn decode(name: &str, payload: &Value) -> Self {
        match name {
            "account_added" => Self::AccountAdded,
            "accounts_added" => Self::AccountsAdded,
            "accounts_deleted" => Self::AccountsDeleted(IdsPayload::from_json(payload)),
            "account_update_info" => Self::AccountUpdateInfo(IdPayload::from_json(payload)),
            "product_added" => Self::ProductAdded,
            "products_added" => Self::ProductsAdded,
            "products_deleted" => Self::ProductsDeleted(IdsPayload::from_json(payload)),
            "product_update_info" => Self::ProductUpdateInfo(IdPayload::from_json(payload)),
            "product_add_stocks" => Self::ProductAddStocks(IdPayload::from_json(payload)),
            "product_remove_stocks" => Self::ProductRemoveStocks(IdPayload::from_json(payload)),
            "booking_added" => Self::BookingAdded,
            "booking_approved" => Self::BookingApproved(from_object(payload)),
            "booking_rejected" => Self::BookingRejected(from_object(payload)),
            "booking_cancelled" => Self::BookingCancelled(from_object(payload)),
            "bookings_deleted" => Self::BookingsDeleted(IdsPayload::from_json(payload)),
            "ar_payment" => Self::ArPayment(from_object(payload)),
            "ar_cancel_sale" => Self::ArCancelSale(from_object(payload)),
            "ar_change_sale" => Self::ArChangeSale(from_object(payload)),
            "pending_excess_refunded" => Self::PendingExcessRefunded(from_object(payload)),
            "pending_excess_to_credit_memo" => {
                Self::PendingExcessToCreditMemo(from_object(payload))
            }
            "company_update_info" => Self::CompanyUpdateInfo(IdPayload::from_json(payload)),
            "user_update_info" => Self::UserUpdateInfo(IdPayload::from_json(payload)),
            other => {
                debug!(event_name = other, "Unknown realtime event");
                Self::Unknown {
                    name: other.to_string(),
                }
            }
        }
    }

    /// Wire name of the event.
    pub fn name(&self) -> &str {
        match self {
            Self::AccountAdded => "account_added",
            Self::AccountsAdded => "accounts_added",
            Self::AccountsDeleted(_) => "accounts_deleted",
            Self::AccountUpdateInfo(_) => "account_update_info",
            Self::ProductAdded => "product_added",
            Self::ProductsAdded => "products_added",
            Self::ProductsDeleted(_) => "products_deleted",
            Self::ProductUpdateInfo(_) => "product_update_info",
            Self::ProductAddStocks(_) => "product_add_stocks",
            Self::ProductRemoveStocks(_) => "product_remove_stocks",
            Self::BookingAdded => "booking_added",
            Self::BookingApproved(_) => "booking_approved",
            Self::BookingRejected(_) => "booking_rejected",
            Self::BookingCancelled(_) => "booking_cancelled",
            Self::BookingsDeleted(_) => "bookings_deleted",
            Self::ArPayment(_) => "ar_payment",
            Self::ArCancelSale(_) => "ar_cancel_sale",
            Self::ArChangeSale(_) => "ar_change_sale",
            Self::PendingExcessRefunded(_) => "pending_excess_refunded",
            Self::PendingExcessToCreditMemo(_) => "pending_excess_to_credit_memo",
            Self::CompanyUpdateInfo(_) => "company_update_info",
            Self::UserUpdateInfo(_) => "user_update_info",
            Self::Unknown { name } => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_event_name_decodes_to_itself() {
        for name in EVENT_NAMES {
            let event = RealtimeEvent::decode(name, &json!({}));
            assert!(event.is_known(), "{name} should be known");
            assert_eq!(event.name(), name);
        }
    }

    #[test]
    fn unknown_names_are_preserved() {
        let event = RealtimeEvent::decode("warehouse_moved", &json!({ "id": 1 }));
        assert_eq!(
            event,
            RealtimeEvent::Unknown {
                name: "warehouse_moved".to_string()
            }
        );
        assert_eq!(event.name(), "warehouse_moved");
    }
}
