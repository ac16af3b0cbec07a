//! Span detection: one forward walk partitioning the stream into typed
//! spans.

use std::collections::HashSet;

use opal_isa::Device;

use crate::stream::KernelStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// Short enough to stay in place (stub region).
    Resident,
    /// Exceeds the displacement threshold; moves to the body region.
    Relocated,
}

/// Half-open word range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
    pub kind: SpanKind,
}

impl Span {
    pub fn words(&self) -> u32 {
        self.end - self.start
    }
}

/// Walks instruction boundaries once and produces an ordered partition of
/// the whole stream into spans.
///
/// A span closes at every flow-control instruction (the instruction itself
/// becomes its own resident span: it must keep its place so its own
/// displacement stays patchable) and at every labeled position (the label
/// starts a new span). A closed span is `Relocated` when its word count
/// exceeds [`Device::min_span_words`], else `Resident`. A truncated
/// trailing word closes the final span at stream end.
pub fn scan_spans(stream: &KernelStream, device: &Device) -> Vec<Span> {
    let len = stream.words.len() as u32;
    let labeled: HashSet<u32> = stream.labels.values().copied().collect();
    let min_words = device.min_span_words();

    let mut spans = Vec::new();
    let mut close = |start: u32, end: u32, kind: Option<SpanKind>, spans: &mut Vec<Span>| {
        if end > start {
            let kind = kind.unwrap_or(if end - start > min_words {
                SpanKind::Relocated
            } else {
                SpanKind::Resident
            });
            spans.push(Span { start, end, kind });
        }
    };

    let mut start = 0u32;
    let mut cur = 0u32;
    while cur < len {
        let word = stream.words[cur as usize];
        let next = (cur + word.word_count()).min(len);
        if word.opcode().is_some_and(|op| op.is_flow_control()) {
            close(start, cur, None, &mut spans);
            close(cur, next, Some(SpanKind::Resident), &mut spans);
            start = next;
        } else if labeled.contains(&cur) {
            close(start, cur, None, &mut spans);
            start = cur;
        }
        cur = next;
    }
    close(start, len, None, &mut spans);

    spans
}
