//! Materialization: emit the stub and body streams and rewrite all
//! position bookkeeping.

use opal_isa::{jmpi, nop, Device, InstWord, Label};
use tracing::debug;

use crate::stream::{KernelStream, SrcLoc};

use super::{Span, SpanKind};

/// Rebuilds `stream` as stub-then-body according to `spans`.
///
/// Resident spans keep their relative order in the stub. A relocated span
/// leaves a full-size jump to a fresh entry label in the stub (plus a no-op
/// pair on pre-compaction generations) and moves its words verbatim to the
/// body; unless the span ends the stream, a back-jump to a fresh return
/// label — the stub position right after the inserted jump block — is
/// appended behind it. Every original word position is remapped, and the
/// label table, both fixup lists and the debug map are rewritten through
/// the remap.
pub(super) fn materialize(stream: &mut KernelStream, device: &Device, spans: &[Span]) {
    let old_len = stream.words.len();
    let pad = device.branch_needs_nop_pad();

    let mut stub: Vec<InstWord> = Vec::new();
    let mut body: Vec<InstWord> = Vec::new();
    // Word position -> new position, split by destination region; body
    // entries are offset by the final stub length afterwards.
    let mut stub_pos: Vec<Option<u32>> = vec![None; old_len];
    let mut body_pos: Vec<Option<u32>> = vec![None; old_len];
    // Fresh labels and fixups, region-relative until the stub length is
    // known.
    let mut new_labels_stub: Vec<(Label, u32)> = Vec::new();
    let mut new_labels_body: Vec<(Label, u32)> = Vec::new();
    let mut new_fixups_stub: Vec<(Label, u32)> = Vec::new();
    let mut new_fixups_body: Vec<(Label, u32)> = Vec::new();
    let mut next_label = stream.next_label().0;
    let mut fresh = || {
        let label = Label(next_label);
        next_label += 1;
        label
    };

    let mut relocated = 0u32;
    for span in spans {
        match span.kind {
            SpanKind::Resident => {
                for pos in span.start..span.end {
                    stub_pos[pos as usize] = Some(stub.len() as u32);
                    stub.push(stream.words[pos as usize]);
                }
            }
            SpanKind::Relocated => {
                relocated += 1;
                let stream_final = span.end == old_len as u32;

                let entry = fresh();
                new_labels_body.push((entry, body.len() as u32));

                // The span's old position resolves to the jump that reaches
                // it, so pre-existing labels pointing here stay correct.
                stub_pos[span.start as usize] = Some(stub.len() as u32);
                new_fixups_stub.push((entry, stub.len() as u32));
                stub.extend(jmpi());
                if pad {
                    stub.extend(nop());
                }
                let return_label = if stream_final {
                    None
                } else {
                    let label = fresh();
                    new_labels_stub.push((label, stub.len() as u32));
                    Some(label)
                };

                body.push(stream.words[span.start as usize]);
                for pos in span.start + 1..span.end {
                    body_pos[pos as usize] = Some(body.len() as u32);
                    body.push(stream.words[pos as usize]);
                }
                if let Some(label) = return_label {
                    new_fixups_body.push((label, body.len() as u32));
                    body.extend(jmpi());
                    if pad {
                        body.extend(nop());
                    }
                }
            }
        }
    }

    let stub_len = stub.len() as u32;
    let new_len = stub_len as usize + body.len();
    let remap = |pos: u32| -> u32 {
        if pos as usize >= old_len {
            // Positions at (or past) the old end keep pointing at the end.
            return new_len as u32;
        }
        match stub_pos[pos as usize] {
            Some(new) => new,
            None => {
                // Spans partition the stream, so a word is in exactly one
                // region.
                body_pos[pos as usize].expect("unmapped stream word") + stub_len
            }
        }
    };

    if !stream.debug.is_empty() {
        let mut new_debug = vec![SrcLoc::default(); new_len];
        for pos in 0..old_len as u32 {
            new_debug[remap(pos) as usize] = stream.debug[pos as usize];
        }
        stream.debug = new_debug;
    }

    for pos in stream.labels.values_mut() {
        *pos = remap(*pos);
    }
    for (_, pos) in stream.jmp_fixups.iter_mut() {
        *pos = remap(*pos);
    }
    for (_, pos) in stream.if_fixups.iter_mut() {
        *pos = remap(*pos);
    }

    for (label, pos) in new_labels_stub {
        stream.labels.insert(label, pos);
    }
    for (label, pos) in new_labels_body {
        stream.labels.insert(label, pos + stub_len);
    }
    stream.jmp_fixups.extend(new_fixups_stub);
    stream
        .jmp_fixups
        .extend(new_fixups_body.into_iter().map(|(label, pos)| (label, pos + stub_len)));

    stub.append(&mut body);
    stream.words = stub;

    debug!(
        spans = spans.len(),
        relocated,
        stub_words = stub_len,
        total_words = new_len,
        "relaxed over-long branch-free spans"
    );
}
