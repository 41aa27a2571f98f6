//! Tag-list construction and the optional-collection combinator.
//!
//! Invalidation sets are built by appending tags in order. Duplicates are kept
//! (refetching is idempotent), but an entry is only ever appended when its id is
//! known: absent correlated ids drop their dependent tags instead of producing a
//! placeholder.

use crate::identity::EntityId;
use crate::tag::{Tag, TagType};

/// Collection tag for a conditionally-created side entity.
///
/// Returns `kind:LIST` iff at least one member was touched (`ids` non-empty) or
/// a new member was created (`created`). With neither, the collection view is
/// unchanged and no tag is produced.
pub fn collection_effect(kind: TagType, ids: &[EntityId], created: bool) -> Option<Tag> {
    (!ids.is_empty() || created).then(|| Tag::list(kind))
}

/// Ordered list of tags; duplicates allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagList(Vec<Tag>);

impl TagList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, tag: Tag) -> &mut Self {
        self.0.push(tag);
        self
    }

    pub fn push_opt(&mut self, tag: Option<Tag>) -> &mut Self {
        if let Some(tag) = tag {
            self.0.push(tag);
        }
        self
    }

    /// Append `kind:LIST`.
    pub fn list(&mut self, kind: TagType) -> &mut Self {
        self.push(Tag::list(kind))
    }

    /// Append `kind:LIST` for each kind, in order.
    pub fn lists(&mut self, kinds: &[TagType]) -> &mut Self {
        for kind in kinds {
            self.list(*kind);
        }
        self
    }

    pub fn entity(&mut self, kind: TagType, id: &EntityId) -> &mut Self {
        self.push(Tag::entity(kind, id.clone()))
    }

    /// Append `kind:id` only when the id is present.
    pub fn entity_opt(&mut self, kind: TagType, id: Option<&EntityId>) -> &mut Self {
        if let Some(id) = id {
            self.entity(kind, id);
        }
        self
    }

    /// Append `kind:id` for every id. An empty slice appends nothing.
    pub fn entities(&mut self, kind: TagType, ids: &[EntityId]) -> &mut Self {
        for id in ids {
            self.entity(kind, id);
        }
        self
    }

    /// Append the [`collection_effect`] of `ids`/`created`, if any.
    pub fn collection(&mut self, kind: TagType, ids: &[EntityId], created: bool) -> &mut Self {
        self.push_opt(collection_effect(kind, ids, created))
    }

    pub fn extend<I: IntoIterator<Item = Tag>>(&mut self, tags: I) -> &mut Self {
        self.0.extend(tags);
        self
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.0.contains(tag)
    }

    /// Number of occurrences of `tag`.
    pub fn count(&self, tag: &Tag) -> usize {
        self.0.iter().filter(|t| *t == tag).count()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Tag] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Tag> {
        self.0
    }
}

impl From<Vec<Tag>> for TagList {
    fn from(tags: Vec<Tag>) -> Self {
        Self(tags)
    }
}

impl FromIterator<Tag> for TagList {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for TagList {
    type Item = Tag;
    type IntoIter = std::vec::IntoIter<Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TagList {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<EntityId> {
        raw.iter().filter_map(|r| EntityId::new(*r)).collect()
    }

    #[test]
    fn collection_effect_requires_members_or_creation() {
        assert_eq!(collection_effect(TagType::PendingExcesses, &[], false), None);
        assert_eq!(
            collection_effect(TagType::PendingExcesses, &[], true),
            Some(Tag::list(TagType::PendingExcesses))
        );
        assert_eq!(
            collection_effect(TagType::PendingExcesses, &ids(&["pe1"]), false),
            Some(Tag::list(TagType::PendingExcesses))
        );
        assert_eq!(
            collection_effect(TagType::PendingExcesses, &ids(&["pe1", "pe2"]), true),
            Some(Tag::list(TagType::PendingExcesses))
        );
    }

    #[test]
    fn entity_opt_skips_absent_ids() {
        let mut tags = TagList::new();
        tags.entity_opt(TagType::AccountMetrics, None)
            .list(TagType::Payments);
        assert_eq!(tags.as_slice(), &[Tag::list(TagType::Payments)]);
    }

    #[test]
    fn builder_preserves_order_and_duplicates() {
        let mut tags = TagList::new();
        tags.list(TagType::Accounts)
            .entities(TagType::Account, &ids(&["a1", "a2"]))
            .list(TagType::Accounts);
        let rendered: Vec<String> = tags.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            ["Accounts:LIST", "Account:a1", "Account:a2", "Accounts:LIST"]
        );
        assert_eq!(tags.count(&Tag::list(TagType::Accounts)), 2);
    }
}
