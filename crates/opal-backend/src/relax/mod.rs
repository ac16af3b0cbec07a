//! Branch relaxation: the block-stub splitter.
//!
//! Hardware branches encode a limited-range relative displacement. After
//! encoding, any branch-free span longer than the device threshold is
//! relocated into a trailing "body" region reached through a fresh
//! unconditional jump left in its place in the leading "stub" region, with
//! a back-jump returning to the stub unless the span ends the stream. The
//! label table, both fixup lists and the debug map are rewritten through a
//! full position remap.
//!
//! The pass is split in two: [`scan_spans`] decides where the splits are,
//! [`run`] materializes them. Any input stream, however short or
//! pathological, produces a valid (possibly unchanged) output.

mod spans;
mod split;

pub use spans::{scan_spans, Span, SpanKind};

use opal_isa::Device;

use crate::stream::KernelStream;

/// Relaxes `stream` in place. Returns whether anything moved.
pub fn run(stream: &mut KernelStream, device: &Device) -> bool {
    let spans = scan_spans(stream, device);
    if !spans.iter().any(|span| span.kind == SpanKind::Relocated) {
        return false;
    }
    split::materialize(stream, device, &spans);
    true
}
