//! Event → tag invalidation table.
//!
//! Every arm lists its unconditional tags first, then the conditional ones.
//! Conditional tags hang off an optional id (dropped when absent) or off the
//! collection combinator (`ids non-empty OR created`).

use crate::event::RealtimeEvent;
use crate::payload::{ArPayment, ArSaleChange};
use ledgerline_core::{EntityId, TagList, TagType};

impl RealtimeEvent {
    /// Tags invalidated by this event, in order. Duplicates may occur.
    pub fn invalidation_tags(&self) -> TagList {
        let mut tags = TagList::new();
        match self {
            Self::AccountAdded | Self::AccountsAdded => {
                tags.list(TagType::Accounts);
            }
            Self::AccountsDeleted(payload) => {
                tags.list(TagType::Accounts)
                    .entities(TagType::Account, &payload.ids);
            }
            Self::AccountUpdateInfo(payload) => {
                tags.list(TagType::Accounts)
                    .entity_opt(TagType::Account, payload.id.as_ref());
            }

            Self::ProductAdded | Self::ProductsAdded => {
                tags.lists(&[TagType::Products, TagType::ProductsToRestock]);
            }
            Self::ProductsDeleted(payload) => {
                tags.lists(&[TagType::Products, TagType::ProductsToRestock])
                    .entities(TagType::Product, &payload.ids);
            }
            Self::ProductUpdateInfo(payload) => {
                tags.lists(&[TagType::Products, TagType::ProductsToRestock])
                    .entity_opt(TagType::Product, payload.id.as_ref());
            }
            Self::ProductAddStocks(payload) | Self::ProductRemoveStocks(payload) => {
                tags.lists(&[TagType::Products, TagType::ProductsToRestock])
                    .entity_opt(TagType::Product, payload.id.as_ref())
                    .entity_opt(TagType::StockHistoryList, payload.id.as_ref());
            }

            Self::BookingAdded => {
                tags.list(TagType::Bookings);
            }
            Self::BookingApproved(payload) => {
                tags.list(TagType::Bookings)
                    .entity_opt(TagType::Booking, payload.booking_id.as_ref())
                    .lists(&[
                        TagType::Invoices,
                        TagType::Sales,
                        TagType::AccountsReceivables,
                        TagType::Products,
                        TagType::ProductsToRestock,
                    ])
                    .entities(TagType::Product, &payload.affected_product_ids);
            }
            Self::BookingRejected(payload) | Self::BookingCancelled(payload) => {
                tags.list(TagType::Bookings)
                    .entity_opt(TagType::Booking, payload.booking_id.as_ref());
            }
            Self::BookingsDeleted(payload) => {
                tags.list(TagType::Bookings)
                    .entities(TagType::Booking, &payload.ids);
            }

            Self::ArPayment(payload) => ar_payment_tags(&mut tags, payload),
            Self::ArCancelSale(payload) | Self::ArChangeSale(payload) => {
                ar_sale_change_tags(&mut tags, payload)
            }
            Self::PendingExcessRefunded(payload) => {
                tags.lists(&[TagType::PendingExcesses, TagType::Refunds])
                    .entity_opt(TagType::PendingExcess, payload.pending_excess_id.as_ref())
                    .entity_opt(TagType::Refund, payload.refund_id.as_ref());
                account_effect(&mut tags, payload.affected_account_id.as_ref());
            }
            Self::PendingExcessToCreditMemo(payload) => {
                tags.lists(&[TagType::PendingExcesses, TagType::CreditMemos])
                    .entity_opt(TagType::PendingExcess, payload.pending_excess_id.as_ref())
                    .entity_opt(TagType::CreditMemo, payload.credit_memo_id.as_ref());
                account_effect(&mut tags, payload.affected_account_id.as_ref());
            }

            Self::CompanyUpdateInfo(payload) => {
                tags.list(TagType::Companies)
                    .entity_opt(TagType::Company, payload.id.as_ref());
            }
            Self::UserUpdateInfo(payload) => {
                tags.list(TagType::Users)
                    .entity_opt(TagType::User, payload.id.as_ref());
            }

            Self::Unknown { .. } => {}
        }
        tags
    }
}

fn ar_payment_tags(tags: &mut TagList, payload: &ArPayment) {
    tags.list(TagType::AccountsReceivables)
        .entity_opt(
            TagType::AccountsReceivable,
            payload.accounts_receivable_id.as_ref(),
        )
        .list(TagType::Payments);
    credit_memo_effect(tags, payload.used_credit_memo_id.as_ref());
    account_effect(tags, payload.affected_account_id.as_ref());
    pending_excess_effect(
        tags,
        &payload.affected_pending_excess_ids,
        payload.new_pending_excess_created,
    );
}

fn ar_sale_change_tags(tags: &mut TagList, payload: &ArSaleChange) {
    tags.list(TagType::AccountsReceivables)
        .entity_opt(
            TagType::AccountsReceivable,
            payload.accounts_receivable_id.as_ref(),
        )
        .list(TagType::Sales)
        .entity_opt(TagType::Sale, payload.sale_id.as_ref())
        .list(TagType::Invoices)
        .entity_opt(TagType::Invoice, payload.invoice_id.as_ref())
        .list(TagType::Payments);
    product_effect(tags, &payload.affected_product_ids, payload.restocked);
    credit_memo_effect(tags, payload.used_credit_memo_id.as_ref());
    account_effect(tags, payload.affected_account_id.as_ref());
    pending_excess_effect(
        tags,
        &payload.affected_pending_excess_ids,
        payload.new_pending_excess_created,
    );
}

fn account_effect(tags: &mut TagList, account_id: Option<&EntityId>) {
    tags.entity_opt(TagType::AccountMetrics, account_id)
        .entity_opt(TagType::AccountDetails, account_id);
}

fn credit_memo_effect(tags: &mut TagList, credit_memo_id: Option<&EntityId>) {
    if let Some(id) = credit_memo_id {
        tags.list(TagType::CreditMemos).entity(TagType::CreditMemo, id);
    }
}

fn pending_excess_effect(tags: &mut TagList, ids: &[EntityId], created: bool) {
    tags.entities(TagType::PendingExcess, ids)
        .collection(TagType::PendingExcesses, ids, created);
}

fn product_effect(tags: &mut TagList, ids: &[EntityId], restocked: bool) {
    tags.entities(TagType::Product, ids)
        .entities(TagType::StockHistoryList, ids)
        .collection(TagType::Products, ids, restocked)
        .collection(TagType::ProductsToRestock, ids, restocked);
}
