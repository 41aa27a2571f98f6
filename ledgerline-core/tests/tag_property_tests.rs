//! Property tests for the tag model.

use ledgerline_core::{collection_effect, EntityId, Tag, TagList, TagType};
use proptest::prelude::*;

fn arb_tag_type() -> impl Strategy<Value = TagType> {
    prop::sample::select(TagType::ALL.to_vec())
}

fn arb_entity_id() -> impl Strategy<Value = EntityId> {
    "[a-zA-Z0-9_-]{1,24}".prop_filter_map("valid entity id", |raw| EntityId::new(raw))
}

fn arb_tag() -> impl Strategy<Value = Tag> {
    (arb_tag_type(), prop::option::of(arb_entity_id())).prop_map(|(kind, id)| match id {
        Some(id) => Tag::entity(kind, id),
        None => Tag::list(kind),
    })
}

proptest! {
    #[test]
    fn tag_text_form_round_trips(tag in arb_tag()) {
        let parsed: Tag = tag.to_string().parse().unwrap();
        prop_assert_eq!(parsed, tag);
    }

    #[test]
    fn tag_json_form_round_trips(tag in arb_tag()) {
        let json = serde_json::to_string(&tag).unwrap();
        let parsed: Tag = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(parsed, tag);
    }

    #[test]
    fn collection_effect_law(
        kind in arb_tag_type(),
        ids in prop::collection::vec(arb_entity_id(), 0..5),
        created in any::<bool>(),
    ) {
        let effect = collection_effect(kind, &ids, created);
        prop_assert_eq!(effect.is_some(), !ids.is_empty() || created);
        if let Some(tag) = effect {
            prop_assert_eq!(tag, Tag::list(kind));
        }
    }

    #[test]
    fn parsed_text_tags_keep_their_kind(kind in arb_tag_type(), raw in "LIST|[A-Z]{1,6}") {
        let tag: Tag = format!("{kind}:{raw}").parse().unwrap();
        prop_assert_eq!(tag.is_list(), raw == "LIST");
        prop_assert_eq!(tag.to_string(), format!("{kind}:{raw}"));
    }

    #[test]
    fn entities_adds_one_tag_per_id(
        kind in arb_tag_type(),
        ids in prop::collection::vec(arb_entity_id(), 0..8),
    ) {
        let mut tags = TagList::new();
        tags.entities(kind, &ids);
        prop_assert_eq!(tags.len(), ids.len());
        prop_assert!(tags.iter().all(|t| !t.is_list()));
    }
}
