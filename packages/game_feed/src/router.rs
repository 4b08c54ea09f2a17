//! Document routing.
//!
//! Tags nest inside one another (a content block inside a speech stream, a
//! metadata tag wrapping prose) and the decoder hands us a tree, so routing
//! runs as a fixed sequence of passes. Each pass removes what it matches,
//! and later passes only see what earlier passes left behind. The sequence
//! goes from the most specific, overlapping categories to the broadest
//! sweeps.

use tracing::{debug, warn};

use crate::category::{
    CONTENT_BLOCK_TAG, Category, IGNORABLE_TAGS, LOOSELY_NESTED_TAGS, PROMPT_CLASS,
    STATUS_TAGS, TEXT_AND_METADATA_TAGS,
};
use crate::element::{Document, Element, Node};
use crate::error::FeedError;
use crate::feed::Feed;
use crate::stream::StreamTable;
use crate::store::StateStore;

/// Everything a routing pass may write to, borrowed from one session.
pub struct Destinations<'a> {
    pub feed: &'a mut Feed,
    pub streams: &'a mut StreamTable,
    pub state: &'a mut dyn StateStore,
}

/// What happened to one document.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RouteReport {
    /// Text-ingestion calls that reached the feed.
    pub ingested: usize,
    /// Elements forwarded to the state store.
    pub stored: usize,
    /// Elements retained by a stream.
    pub streamed: usize,
    /// Whether a prompt was appended.
    pub prompt: bool,
    /// Earlier prompts superseded by a later one in the same document.
    pub stale_prompts: usize,
    /// Ignorable elements dropped.
    pub dropped: usize,
    /// Elements the state store refused. Routing carried on regardless.
    pub rejected: Vec<FeedError>,
    /// Tags nothing claimed.
    pub unrecognized: Vec<String>,
}

/// Route every node of `document` to exactly one destination.
pub fn route(document: Document, dest: &mut Destinations<'_>) -> RouteReport {
    let mut report = RouteReport::default();
    let Document { mut body, mut head } = document;
    let mut roots = [&mut body, &mut head];

    // 1. Only the last prompt is authoritative.
    let mut prompts = take_all(&mut roots, |e| e.category() == Category::Prompt);
    let prompt = prompts.pop();
    report.stale_prompts = prompts.len();

    // 2. Speech before content blocks, or the blocks inside it get taken twice.
    for speech in take_all(&mut roots, |e| e.category() == Category::SpeechStream) {
        store(dest, &speech, &mut report);
        ingest(
            Element::new(CONTENT_BLOCK_TAG)
                .with_class("speech")
                .with_text(speech.text()),
            dest,
            &mut report,
        );
    }

    // 3. Plain content blocks.
    for block in take_all(&mut roots, |e| e.category() == Category::ContentBlock) {
        ingest(block, dest, &mut report);
    }

    // 4. Status tags.
    for status in take_all(&mut roots, |e| in_set(STATUS_TAGS, e)) {
        store(dest, &status, &mut report);
    }

    // 5. Streams go to their buffer when wanted, to the feed otherwise.
    for stream in take_all(&mut roots, |e| e.category() == Category::Stream) {
        let wanted = stream.id.as_deref().is_some_and(|id| dest.streams.wants(id));
        if !wanted {
            ingest(stream, dest, &mut report);
            continue;
        }
        match dest.streams.insert(stream) {
            Ok(()) => report.streamed += 1,
            Err(stream) => ingest(stream, dest, &mut report),
        }
    }

    // 6. Fixed-width content.
    for mono in take_all(&mut roots, |e| e.category() == Category::Mono) {
        ingest(mono, dest, &mut report);
    }

    // 7. State that also carries visible prose.
    for meta in take_all(&mut roots, |e| in_set(TEXT_AND_METADATA_TAGS, e)) {
        store(dest, &meta, &mut report);
        ingest(
            Element::new(CONTENT_BLOCK_TAG).with_text(meta.text()),
            dest,
            &mut report,
        );
    }

    // 8. Loose prose that shared a parent with state tags.
    for root in roots.iter_mut() {
        let text = take_top_level_text(root);
        if !text.trim().is_empty() {
            ingest(Element::new(CONTENT_BLOCK_TAG).with_text(text), dest, &mut report);
        }
    }

    // 9. The prompt goes last so it ends up at the tail.
    if let Some(mut prompt) = prompt {
        store(dest, &prompt, &mut report);
        prompt.class = Some(PROMPT_CLASS.to_string());
        dest.feed.append(prompt);
        report.prompt = true;
    }

    // 10. Decorative tags.
    report.dropped = take_all(&mut roots, |e| in_set(IGNORABLE_TAGS, e)).len();

    // 11. Inline wrappers that may still hold text.
    for inline in take_all(&mut roots, |e| in_set(LOOSELY_NESTED_TAGS, e)) {
        store(dest, &inline, &mut report);
    }

    // 12. Whatever is left was not claimed by anyone.
    for root in roots.iter_mut() {
        for node in root.drain(..) {
            if let Node::Element(element) = node {
                warn!(
                    session = %dest.feed.session(),
                    tag = %element.tag,
                    "unrecognized element"
                );
                report.unrecognized.push(element.tag);
            }
        }
    }

    debug!(
        session = %dest.feed.session(),
        ingested = report.ingested,
        stored = report.stored,
        streamed = report.streamed,
        prompt = report.prompt,
        "document routed"
    );
    report
}

fn in_set(set: &[&str], element: &Element) -> bool {
    set.iter().any(|t| t.eq_ignore_ascii_case(&element.tag))
}

/// Remove every element matching `pred` at any depth, in document order.
/// A matched element's children are taken along with it.
fn take_all<F>(roots: &mut [&mut Vec<Node>; 2], pred: F) -> Vec<Element>
where
    F: Fn(&Element) -> bool,
{
    let mut taken = Vec::new();
    for root in roots.iter_mut() {
        take_where(root, &pred, &mut taken);
    }
    taken
}

fn take_where<F>(nodes: &mut Vec<Node>, pred: &F, out: &mut Vec<Element>)
where
    F: Fn(&Element) -> bool,
{
    for node in std::mem::take(nodes) {
        match node {
            Node::Element(element) if pred(&element) => out.push(element),
            Node::Element(mut element) => {
                take_where(&mut element.children, pred, out);
                nodes.push(Node::Element(element));
            }
            text => nodes.push(text),
        }
    }
}

fn take_top_level_text(nodes: &mut Vec<Node>) -> String {
    let mut text = String::new();
    nodes.retain(|node| match node {
        Node::Text(t) => {
            text.push_str(t);
            false
        }
        Node::Element(_) => true,
    });
    text
}

fn store(dest: &mut Destinations<'_>, element: &Element, report: &mut RouteReport) {
    match dest.state.consume(element) {
        Ok(()) => report.stored += 1,
        Err(err) => {
            warn!(session = %dest.feed.session(), error = %err, "state store rejected element");
            report.rejected.push(err);
        }
    }
}

/// Text ingestion: tidy line breaks and append to the feed. Decoration
/// happens later, on the render tick.
fn ingest(mut element: Element, dest: &mut Destinations<'_>, report: &mut RouteReport) {
    strip_line_breaks(&mut element);
    if element.text().trim().is_empty() {
        return;
    }
    dest.feed.append(element);
    report.ingested += 1;
}

/// Normalise CRLF, collapse runs of newlines and trim the breaks the
/// element starts and ends with.
pub fn strip_line_breaks(element: &mut Element) {
    collapse_breaks(&mut element.children);
    if let Some(first) = first_text_mut(&mut element.children) {
        *first = first.trim_start_matches('\n').to_string();
    }
    if let Some(last) = last_text_mut(&mut element.children) {
        *last = last.trim_end_matches('\n').to_string();
    }
}

fn collapse_breaks(nodes: &mut [Node]) {
    for node in nodes {
        match node {
            Node::Text(text) => {
                let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
                let mut out = String::with_capacity(normalized.len());
                for c in normalized.chars() {
                    if c == '\n' && out.ends_with('\n') {
                        continue;
                    }
                    out.push(c);
                }
                *text = out;
            }
            Node::Element(element) => collapse_breaks(&mut element.children),
        }
    }
}

fn first_text_mut(nodes: &mut [Node]) -> Option<&mut String> {
    for node in nodes {
        match node {
            Node::Text(text) => return Some(text),
            Node::Element(element) => {
                if let Some(text) = first_text_mut(&mut element.children) {
                    return Some(text);
                }
            }
        }
    }
    None
}

fn last_text_mut(nodes: &mut [Node]) -> Option<&mut String> {
    for node in nodes.iter_mut().rev() {
        match node {
            Node::Text(text) => return Some(text),
            Node::Element(element) => {
                if let Some(text) = last_text_mut(&mut element.children) {
                    return Some(text);
                }
            }
        }
    }
    None
}
