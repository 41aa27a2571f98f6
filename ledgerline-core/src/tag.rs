//! Cache tags: `(type, id)` keys for entities and collection views.

use crate::error::TagParseError;
use crate::identity::EntityId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Reserved id denoting "the whole collection view" of a tag type.
pub const LIST_SENTINEL: &str = "LIST";

/// Entity category of a cache tag.
///
/// Singular variants (`Account`) are keyed by entity id; plural variants
/// (`Accounts`) are normally used with the [`TagId::List`] sentinel. A few
/// per-entity derived views (`AccountMetrics`, `StockHistoryList`) are keyed by
/// the id of the entity they describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TagType {
    Account,
    Accounts,
    AccountMetrics,
    AccountDetails,
    Product,
    Products,
    ProductsToRestock,
    StockHistoryList,
    Booking,
    Bookings,
    Invoice,
    Invoices,
    Sale,
    Sales,
    AccountsReceivable,
    AccountsReceivables,
    Payment,
    Payments,
    PendingExcess,
    PendingExcesses,
    CreditMemo,
    CreditMemos,
    Refund,
    Refunds,
    Company,
    Companies,
    User,
    Users,
    Dashboard,
}

impl TagType {
    pub const ALL: [TagType; 29] = [
        TagType::Account,
        TagType::Accounts,
        TagType::AccountMetrics,
        TagType::AccountDetails,
        TagType::Product,
        TagType::Products,
        TagType::ProductsToRestock,
        TagType::StockHistoryList,
        TagType::Booking,
        TagType::Bookings,
        TagType::Invoice,
        TagType::Invoices,
        TagType::Sale,
        TagType::Sales,
        TagType::AccountsReceivable,
        TagType::AccountsReceivables,
        TagType::Payment,
        TagType::Payments,
        TagType::PendingExcess,
        TagType::PendingExcesses,
        TagType::CreditMemo,
        TagType::CreditMemos,
        TagType::Refund,
        TagType::Refunds,
        TagType::Company,
        TagType::Companies,
        TagType::User,
        TagType::Users,
        TagType::Dashboard,
    ];

    /// Wire name of the tag type, as used in logs and the `Type:id` form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TagType::Account => "Account",
            TagType::Accounts => "Accounts",
            TagType::AccountMetrics => "AccountMetrics",
            TagType::AccountDetails => "AccountDetails",
            TagType::Product => "Product",
            TagType::Products => "Products",
            TagType::ProductsToRestock => "ProductsToRestock",
            TagType::StockHistoryList => "StockHistoryList",
            TagType::Booking => "Booking",
            TagType::Bookings => "Bookings",
            TagType::Invoice => "Invoice",
            TagType::Invoices => "Invoices",
            TagType::Sale => "Sale",
            TagType::Sales => "Sales",
            TagType::AccountsReceivable => "AccountsReceivable",
            TagType::AccountsReceivables => "AccountsReceivables",
            TagType::Payment => "Payment",
            TagType::Payments => "Payments",
            TagType::PendingExcess => "PendingExcess",
            TagType::PendingExcesses => "PendingExcesses",
            TagType::CreditMemo => "CreditMemo",
            TagType::CreditMemos => "CreditMemos",
            TagType::Refund => "Refund",
            TagType::Refunds => "Refunds",
            TagType::Company => "Company",
            TagType::Companies => "Companies",
            TagType::User => "User",
            TagType::Users => "Users",
            TagType::Dashboard => "Dashboard",
        }
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagType {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TagType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TagParseError::UnknownType {
                name: s.to_string(),
            })
    }
}

/// Second half of a tag: a concrete entity or the collection sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagId {
    /// The `"LIST"` sentinel. Never enumerates members.
    List,
    Id(EntityId),
}

impl TagId {
    pub fn is_list(&self) -> bool {
        matches!(self, TagId::List)
    }

    pub fn as_str(&self) -> &str {
        match self {
            TagId::List => LIST_SENTINEL,
            TagId::Id(id) => id.as_str(),
        }
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagId {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == LIST_SENTINEL {
            return Ok(TagId::List);
        }
        EntityId::new(s).map(TagId::Id).ok_or(TagParseError::EmptyId)
    }
}

impl Serialize for TagId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TagId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A cache tag, serialized as `{"type": "...", "id": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "type")]
    pub kind: TagType,
    pub id: TagId,
}

impl Tag {
    /// Collection tag, e.g. `Accounts:LIST`.
    pub const fn list(kind: TagType) -> Self {
        Self {
            kind,
            id: TagId::List,
        }
    }

    /// Entity tag, e.g. `Account:a1`.
    pub fn entity(kind: TagType, id: EntityId) -> Self {
        Self {
            kind,
            id: TagId::Id(id),
        }
    }

    pub fn is_list(&self) -> bool {
        self.id.is_list()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for Tag {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| TagParseError::MissingSeparator {
                input: s.to_string(),
            })?;
        Ok(Self {
            kind: kind.parse()?,
            id: id.parse()?,
        })
    }
}
