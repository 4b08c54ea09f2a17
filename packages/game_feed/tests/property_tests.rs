use proptest::prelude::*;

use game_feed::{Appended, BoundedBuffer, Element, PromptRule};

fn line(n: usize) -> Element {
    Element::new("pre").with_text(n.to_string())
}

fn arb_element() -> impl Strategy<Value = Element> {
    prop_oneof![
        3 => (0usize..1000).prop_map(line),
        1 => "[a-z>]{0,3}".prop_map(|t| Element::new("prompt").with_text(t)),
    ]
}

// --- Capacity ---

proptest! {
    #[test]
    fn retains_min_of_n_and_m(n in 0usize..300, m in 1usize..64) {
        let mut buf = BoundedBuffer::new(m, PromptRule::Collapse);
        for i in 0..n {
            buf.append(line(i));
        }
        prop_assert_eq!(buf.len(), n.min(m));

        let kept: Vec<String> = buf.contents().map(Element::text).collect();
        let expected: Vec<String> = (n.saturating_sub(m)..n).map(|i| i.to_string()).collect();
        prop_assert_eq!(kept, expected);
    }

    #[test]
    fn never_exceeds_capacity(
        elements in prop::collection::vec(arb_element(), 0..200),
        m in 1usize..32,
        collapse in any::<bool>(),
    ) {
        let rule = if collapse { PromptRule::Collapse } else { PromptRule::RetainAll };
        let mut buf = BoundedBuffer::new(m, rule);
        for element in elements {
            buf.append(element);
            prop_assert!(buf.len() <= m);
        }
    }
}

// --- Prompt collapse ---

proptest! {
    #[test]
    fn two_prompts_grow_by_at_most_one(
        prefix in prop::collection::vec(arb_element(), 0..50),
        m in 2usize..64,
    ) {
        let mut buf = BoundedBuffer::new(m, PromptRule::Collapse);
        for element in prefix {
            buf.append(element);
        }
        let before = buf.len();

        buf.append(Element::new("prompt").with_text("P1"));
        let second = buf.append(Element::new("prompt").with_text("P2"));

        prop_assert_eq!(second, Appended::ReplacedTail);
        prop_assert!(buf.len() <= before + 1);
        prop_assert_eq!(buf.tail().map(Element::text), Some("P2".to_string()));
    }

    #[test]
    fn collapsing_buffer_never_holds_adjacent_prompts(
        elements in prop::collection::vec(arb_element(), 0..200),
        m in 1usize..32,
    ) {
        let mut buf = BoundedBuffer::new(m, PromptRule::Collapse);
        for element in elements {
            buf.append(element);
        }
        let flags: Vec<bool> = buf.contents().map(Element::is_prompt).collect();
        prop_assert!(flags.windows(2).all(|w| !(w[0] && w[1])));
    }
}
