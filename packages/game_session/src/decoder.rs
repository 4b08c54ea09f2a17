//! Turning raw transport bytes into [`Document`]s.
//!
//! Markup tokenizers live outside this crate and plug in through
//! [`Decoder`]. [`PlainTextDecoder`] covers games that speak no markup at all.

use game_feed::{Document, Element};

/// One call per transmission, one document per call.
pub trait Decoder: Send {
    fn decode(&mut self, bytes: &[u8]) -> Document;
}

/// Reassembles game text that arrives in arbitrary socket-sized pieces.
///
/// A multi-byte character cut in half by a read is held back until the rest
/// of it arrives. Bytes that can never form a character become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget a half-received character, e.g. after a reconnect.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Append `bytes` and return all text that is complete so far.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;

        let held_back = loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break 0;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        // Truncated character at the end of the read
                        None => break after.len(),
                        Some(bad) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[bad..];
                        }
                    }
                }
            }
        };

        let keep_from = self.pending.len() - held_back;
        self.pending.drain(..keep_from);
        text
    }
}

/// Decoder for games without markup.
///
/// Each transmission becomes one content block. An unterminated final line
/// ending in `>` is taken to be the game's prompt and becomes a prompt
/// element, so prompt redraws collapse like they do for tagged games.
#[derive(Debug, Default)]
pub struct PlainTextDecoder {
    utf8: Utf8StreamDecoder,
}

impl PlainTextDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for PlainTextDecoder {
    fn decode(&mut self, bytes: &[u8]) -> Document {
        let text = self.utf8.decode(bytes);
        let mut doc = Document::new();

        let (body, tail) = match text.rfind('\n') {
            Some(idx) => text.split_at(idx + 1),
            None => ("", text.as_str()),
        };
        let is_prompt = tail.trim_end().ends_with('>');

        let block = if is_prompt { body } else { text.as_str() };
        if !block.is_empty() {
            doc = doc.with_body(Element::new("pre").with_text(block));
        }
        if is_prompt {
            doc = doc.with_body(Element::new("prompt").with_text(tail));
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_feed::Node;

    // ── Utf8StreamDecoder ──────────────────────────────────────────────

    #[test]
    fn whole_room_description_passes_through() {
        let mut dec = Utf8StreamDecoder::new();
        assert_eq!(dec.decode(b"Obvious exits: north"), "Obvious exits: north");
    }

    #[test]
    fn box_drawing_map_cut_between_reads() {
        let mut dec = Utf8StreamDecoder::new();
        let map = "+─+".as_bytes();

        assert_eq!(dec.decode(&map[..3]), "+");
        assert_eq!(dec.decode(&map[3..]), "─+");
    }

    #[test]
    fn emoji_arriving_one_byte_per_read() {
        let mut dec = Utf8StreamDecoder::new();
        let out: Vec<String> = "🐉".bytes().map(|b| dec.decode(&[b])).collect();
        assert_eq!(out, vec!["", "", "", "🐉"]);
    }

    #[test]
    fn garbage_byte_from_the_server_is_replaced() {
        let mut dec = Utf8StreamDecoder::new();
        assert_eq!(dec.decode(b"gold\xFF coins"), "gold\u{FFFD} coins");
    }

    #[test]
    fn garbage_before_a_cut_character() {
        let mut dec = Utf8StreamDecoder::new();
        let tail = "é".as_bytes();
        let mut first = b"\xFEcaf".to_vec();
        first.push(tail[0]);
        assert_eq!(dec.decode(&first), "\u{FFFD}caf");
        assert_eq!(dec.decode(&tail[1..]), "é");
    }

    #[test]
    fn clear_forgets_half_a_character() {
        let mut dec = Utf8StreamDecoder::new();
        assert_eq!(dec.decode(&"é".as_bytes()[..1]), "");
        dec.clear();
        assert_eq!(dec.decode(b"look"), "look");
    }

    // ── PlainTextDecoder ───────────────────────────────────────────────

    fn tags(doc: &Document) -> Vec<&str> {
        doc.top_level_tags().collect()
    }

    #[test]
    fn trailing_prompt_is_split_off() {
        let mut dec = PlainTextDecoder::new();
        let doc = dec.decode(b"You see a rock.\r\nH> ");
        assert_eq!(tags(&doc), vec!["pre", "prompt"]);
        let texts: Vec<String> = doc
            .body
            .iter()
            .filter_map(Node::as_element)
            .map(Element::text)
            .collect();
        assert_eq!(texts, vec!["You see a rock.\r\n", "H> "]);
    }

    #[test]
    fn bare_prompt_only() {
        let mut dec = PlainTextDecoder::new();
        assert_eq!(tags(&dec.decode(b">")), vec!["prompt"]);
    }

    #[test]
    fn unterminated_prose_stays_content() {
        let mut dec = PlainTextDecoder::new();
        let doc = dec.decode(b"A wolf howls in the dist");
        assert_eq!(tags(&doc), vec!["pre"]);
    }

    #[test]
    fn split_character_yields_empty_document() {
        let mut dec = PlainTextDecoder::new();
        let bytes = "─\n".as_bytes();
        assert!(dec.decode(&bytes[..1]).is_empty());
        assert_eq!(tags(&dec.decode(&bytes[1..])), vec!["pre"]);
    }
}
