//! Static tag classification.
//!
//! Every element the decoder can produce maps to exactly one [`Category`].
//! The mapping is a pure function of the tag name and class marker; tag sets
//! are fixed at compile time.

use serde::{Deserialize, Serialize};

use crate::element::Element;

/// Tag name of prompt elements.
pub const PROMPT_TAG: &str = "prompt";
/// Class marker carried by prompts once they reach a feed.
pub const PROMPT_CLASS: &str = "prompt";
/// The decoder's plain renderable unit.
pub const CONTENT_BLOCK_TAG: &str = "pre";
pub const SPEECH_TAG: &str = "speech";
pub const STREAM_TAG: &str = "stream";
pub const MONO_TAG: &str = "mono";

/// Tags whose content is pure game state (compass, inventory, vitals...).
pub const STATUS_TAGS: &[&str] = &[
    "compass",
    "inv",
    "dialogdata",
    "progressbar",
    "indicator",
    "left",
    "right",
    "spell",
    "roundtime",
    "casttime",
    "nav",
];

/// Tags that carry state and also wrap visible prose.
pub const TEXT_AND_METADATA_TAGS: &[&str] = &["component", "compdef", "style"];

/// Decorative or resource tags with nothing to show or store.
pub const IGNORABLE_TAGS: &[&str] = &[
    "resource",
    "image",
    "clearstream",
    "opendialog",
    "closedialog",
    "switchquickbar",
    "exposestream",
    "endsetup",
    "mode",
    "settingsinfo",
    "app",
    "output",
];

/// Inline tags that may still hold unconsumed text after every other pass.
pub const LOOSELY_NESTED_TAGS: &[&str] = &["a", "b", "d", "preset", "pushbold", "popbold"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Prompt,
    SpeechStream,
    ContentBlock,
    Status,
    Stream,
    Mono,
    TextAndMetadata,
    Ignorable,
    LooselyNested,
    Unknown,
}

fn in_set(set: &[&str], tag: &str) -> bool {
    set.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

/// Classify a tag/class pair. Tag comparison is ASCII case-insensitive.
pub fn classify(tag: &str, class: Option<&str>) -> Category {
    if tag.eq_ignore_ascii_case(PROMPT_TAG)
        || class.is_some_and(|c| c.split_whitespace().any(|c| c == PROMPT_CLASS))
    {
        return Category::Prompt;
    }
    if tag.eq_ignore_ascii_case(SPEECH_TAG) {
        Category::SpeechStream
    } else if tag.eq_ignore_ascii_case(CONTENT_BLOCK_TAG) {
        Category::ContentBlock
    } else if tag.eq_ignore_ascii_case(STREAM_TAG) {
        Category::Stream
    } else if tag.eq_ignore_ascii_case(MONO_TAG) {
        Category::Mono
    } else if in_set(STATUS_TAGS, tag) {
        Category::Status
    } else if in_set(TEXT_AND_METADATA_TAGS, tag) {
        Category::TextAndMetadata
    } else if in_set(IGNORABLE_TAGS, tag) {
        Category::Ignorable
    } else if in_set(LOOSELY_NESTED_TAGS, tag) {
        Category::LooselyNested
    } else {
        Category::Unknown
    }
}

impl Element {
    pub fn category(&self) -> Category {
        classify(&self.tag, self.class.as_deref())
    }

    pub fn is_prompt(&self) -> bool {
        self.category() == Category::Prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_by_tag_or_marker() {
        assert_eq!(classify("prompt", None), Category::Prompt);
        assert_eq!(classify("pre", Some("prompt")), Category::Prompt);
        assert_eq!(classify("pre", Some("cli sent")), Category::ContentBlock);
    }

    #[test]
    fn tag_sets_are_disjoint() {
        let sets = [
            STATUS_TAGS,
            TEXT_AND_METADATA_TAGS,
            IGNORABLE_TAGS,
            LOOSELY_NESTED_TAGS,
        ];
        for (i, a) in sets.iter().enumerate() {
            for b in sets.iter().skip(i + 1) {
                for tag in a.iter() {
                    assert!(!b.contains(tag), "{tag} appears in two tag sets");
                }
            }
        }
    }

    #[test]
    fn set_members_classify_to_their_set() {
        for tag in STATUS_TAGS {
            assert_eq!(classify(tag, None), Category::Status);
        }
        for tag in TEXT_AND_METADATA_TAGS {
            assert_eq!(classify(tag, None), Category::TextAndMetadata);
        }
        for tag in IGNORABLE_TAGS {
            assert_eq!(classify(tag, None), Category::Ignorable);
        }
        for tag in LOOSELY_NESTED_TAGS {
            assert_eq!(classify(tag, None), Category::LooselyNested);
        }
    }

    #[test]
    fn case_insensitive_tags() {
        assert_eq!(classify("dialogData", None), Category::Status);
        assert_eq!(classify("progressBar", None), Category::Status);
        assert_eq!(classify("PRE", None), Category::ContentBlock);
        assert_eq!(classify("blink", None), Category::Unknown);
    }
}
