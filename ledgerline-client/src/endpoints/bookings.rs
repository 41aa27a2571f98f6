//! `/booking` endpoints. A booking is a customer order awaiting approval;
//! approving one creates the invoice, sale and receivable server-side.

use super::{body_without, entity_provides, field_id, id_arg, ids_arg, list_provides, merged_outcome, path, query_params};
use crate::api_client::{ApiError, ApiRequest};
use crate::cache::{MutationEndpoint, QueryEndpoint};
use ledgerline_core::{TagList, TagType};
use ledgerline_events::tags_for;
use serde_json::{json, Value};

const BASE: &str = "/booking";

pub const GET_BOOKINGS: QueryEndpoint = QueryEndpoint {
    name: "getBookings",
    request: |args| Ok(ApiRequest::get(BASE).with_query(query_params(args))),
    provides: |_, result| list_provides(TagType::Bookings, TagType::Booking, result),
};

pub const GET_BOOKING: QueryEndpoint = QueryEndpoint {
    name: "getBooking",
    request: |args| Ok(ApiRequest::get(path(BASE, &id_arg(args)?))),
    provides: |args, _| entity_provides(TagType::Booking, args),
};

pub const CREATE_BOOKING: MutationEndpoint = MutationEndpoint {
    name: "createBooking",
    request: create_request,
    invalidates: |_, result| tags_for("booking_added", result),
};

pub const UPDATE_BOOKING: MutationEndpoint = MutationEndpoint {
    name: "updateBooking",
    request: |args| Ok(ApiRequest::patch(path(BASE, &id_arg(args)?), body_without(args, &["id"]))),
    invalidates: |args, _| {
        let mut tags = TagList::new();
        tags.list(TagType::Bookings)
            .entity_opt(TagType::Booking, id_arg(args).ok().as_ref());
        tags
    },
};

/// Approve a booking. The server answers with the products whose stock moved;
/// invalidation then matches the `booking_approved` push.
pub const APPROVE_BOOKING: MutationEndpoint = MutationEndpoint {
    name: "approveBooking",
    request: |args| transition_request(args, "approve"),
    invalidates: |args, result| tags_for("booking_approved", &outcome(args, result)),
};

pub const REJECT_BOOKING: MutationEndpoint = MutationEndpoint {
    name: "rejectBooking",
    request: |args| transition_request(args, "reject"),
    invalidates: |args, result| tags_for("booking_rejected", &outcome(args, result)),
};

pub const CANCEL_BOOKING: MutationEndpoint = MutationEndpoint {
    name: "cancelBooking",
    request: |args| transition_request(args, "cancel"),
    invalidates: |args, result| tags_for("booking_cancelled", &outcome(args, result)),
};

pub const DELETE_BOOKINGS: MutationEndpoint = MutationEndpoint {
    name: "deleteBookings",
    request: |args| Ok(ApiRequest::delete(BASE).with_body(json!({ "ids": ids_arg(args)? }))),
    invalidates: |args, _| tags_for("bookings_deleted", args),
};

fn create_request(args: &Value) -> Result<ApiRequest, ApiError> {
    field_id(args, "accountId")?;
    match args.get("items") {
        Some(Value::Array(items)) if !items.is_empty() => Ok(ApiRequest::post(BASE, args.clone())),
        _ => Err(ApiError::invalid_args("a booking needs at least one item")),
    }
}

fn transition_request(args: &Value, action: &str) -> Result<ApiRequest, ApiError> {
    let id = booking_id(args)?;
    Ok(ApiRequest::patch(
        format!("{}/{action}", path(BASE, &id)),
        body_without(args, &["id", "bookingId"]),
    ))
}

fn booking_id(args: &Value) -> Result<ledgerline_core::EntityId, ApiError> {
    field_id(args, "bookingId").or_else(|_| id_arg(args))
}

/// Outcome keyed the way the booking events expect (`bookingId`).
fn outcome(args: &Value, result: &Value) -> Value {
    let mut merged = merged_outcome(args, result);
    if let (Value::Object(map), Ok(id)) = (&mut merged, booking_id(args)) {
        map.entry("bookingId").or_insert_with(|| json!(id));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(tags: TagList) -> Vec<String> {
        tags.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn approve_uses_result_products() {
        let request = (APPROVE_BOOKING.request)(&json!("b1")).unwrap();
        assert_eq!(request.path, "/booking/b1/approve");

        let tags = (APPROVE_BOOKING.invalidates)(
            &json!("b1"),
            &json!({ "affectedProductIds": ["p1"] }),
        );
        assert_eq!(
            rendered(tags),
            [
                "Bookings:LIST",
                "Booking:b1",
                "Invoices:LIST",
                "Sales:LIST",
                "AccountsReceivables:LIST",
                "Products:LIST",
                "ProductsToRestock:LIST",
                "Product:p1",
            ]
        );
    }

    #[test]
    fn reject_accepts_booking_id_field() {
        let args = json!({ "bookingId": "b2", "reason": "out of stock" });
        let request = (REJECT_BOOKING.request)(&args).unwrap();
        assert_eq!(request.path, "/booking/b2/reject");
        assert_eq!(request.body, Some(json!({ "reason": "out of stock" })));

        let tags = (REJECT_BOOKING.invalidates)(&args, &Value::Null);
        assert_eq!(rendered(tags), ["Bookings:LIST", "Booking:b2"]);
    }

    #[test]
    fn create_requires_account_and_items() {
        assert!((CREATE_BOOKING.request)(&json!({ "items": [{ "productId": "p1" }] })).is_err());
        assert!((CREATE_BOOKING.request)(&json!({ "accountId": "a1", "items": [] })).is_err());
        assert!((CREATE_BOOKING.request)(&json!({ "accountId": "a1", "items": [{ "productId": "p1" }] })).is_ok());

        let tags = (CREATE_BOOKING.invalidates)(&Value::Null, &json!({ "id": "b3" }));
        assert_eq!(rendered(tags), ["Bookings:LIST"]);
    }
}
