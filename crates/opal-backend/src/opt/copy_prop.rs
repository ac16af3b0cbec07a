//! Block-local copy propagation.
//!
//! A single forward scan keeps, per intermediate virtual register, a pending
//! candidate describing a plain MOV whose destination could be replaced by
//! its source at every later read. A candidate that survives to the end of
//! the scan with every recorded read proven equivalent gets all of those
//! reads rewritten to the MOV's source and the MOV unlinked.
//!
//! Correctness rests on exact element-footprint equality plus the mask and
//! predicate compatibility rules in [`can_substitute`]; any shape those
//! rules do not explicitly admit keeps the original instruction sequence.

use std::collections::{HashMap, HashSet};

use opal_isa::{
    footprint, Device, DeviceQuirks, ElementSet, ExecState, Operand, PredCtrl, RegFile, VirtReg,
};
use tracing::{debug, trace};

use crate::sel::{Extra, SelBlock, SelInst, SelOpcode};

/// Retry bound for the scan loop. Each pass collapses one link of a copy
/// chain (`mov a,b; mov c,a; ...`), so the bound caps chain depth, and the
/// loop stops early once a pass replaces nothing.
const MAX_PASSES: usize = 4;

/// Recorded read of a pending candidate's intermediate register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct UseRef {
    inst: usize,
    slot: usize,
}

/// One pending candidate: the defining MOV, snapshots of both sides, the
/// destination footprint at the definition, and every read recorded so far.
#[derive(Debug, Clone)]
struct ReplaceInfo {
    def_inst: usize,
    /// Execution state of the defining MOV, snapshotted at registration.
    def_state: ExecState,
    intermediate: Operand,
    replacement: Operand,
    footprint: ElementSet,
    uses: Vec<UseRef>,
    /// Set once a later instruction writes the replacement register: reads
    /// recorded before that point stay valid, later ones must not be.
    replacement_overwritten: bool,
}

/// Runs copy propagation over one block. Returns the number of MOV
/// instructions eliminated.
pub fn run(block: &mut SelBlock, device: &Device) -> usize {
    let mut eliminated = 0;
    for _ in 0..MAX_PASSES {
        let pass = propagate_once(block, device);
        if pass == 0 {
            break;
        }
        eliminated += pass;
    }
    if eliminated > 0 {
        block.compact();
        debug!(eliminated, "copy propagation removed moves");
    }
    eliminated
}

fn propagate_once(block: &mut SelBlock, device: &Device) -> usize {
    let mut pending: HashMap<VirtReg, ReplaceInfo> = HashMap::new();
    let mut rewritten: HashSet<UseRef> = HashSet::new();
    let mut eliminated = 0;

    for i in 0..block.insts.len() {
        if !block.insts[i].live {
            continue;
        }

        // Reads first: a read either extends the candidate or kills it.
        // Leaving a candidate half-replaced would strand a dangling
        // temporary nothing tracks, so an ineligible read forgets the
        // candidate entirely.
        for slot in 0..block.insts[i].src.len() {
            let var = block.insts[i].src[slot];
            // Only general-purpose operands carry a register identity;
            // immediates and architecture registers hold a default `reg`
            // that must never alias a real candidate.
            if var.file != RegFile::GeneralPurpose {
                continue;
            }
            let eligible = pending
                .get(&var.reg)
                .map(|info| can_substitute(info, &block.insts[i], &var, device));
            match eligible {
                Some(true) => {
                    let info = pending.get_mut(&var.reg).expect("candidate just probed");
                    info.uses.push(UseRef { inst: i, slot });
                }
                Some(false) => {
                    pending.remove(&var.reg);
                }
                None => {}
            }
        }

        // Writes second. Every candidate whose replacement register is
        // written gets flagged before any intermediate collision is
        // resolved; more than one candidate can hold the written register
        // (different sub-register reads), so the whole map is scanned.
        for slot in 0..block.insts[i].dst.len() {
            let var = block.insts[i].dst[slot];
            if var.file != RegFile::GeneralPurpose {
                continue;
            }
            for info in pending.values_mut() {
                if info.replacement.reg == var.reg {
                    info.replacement_overwritten = true;
                }
            }
            if let Some(info) = pending.remove(&var.reg) {
                // Writing the intermediate ends the candidate. If the write
                // fully covers the definition under compatible state, the
                // reads recorded so far are still exact and the MOV can be
                // resolved on the spot; otherwise it stays.
                let exact = info.intermediate.quarter == var.quarter
                    && info.intermediate.subnr == var.subnr
                    && info.intermediate.nr == var.nr;
                let replacement_pending = pending.contains_key(&info.replacement.reg);
                if exact
                    && can_substitute(&info, &block.insts[i], &var, device)
                    && apply_guards_ok(&info, replacement_pending, &rewritten)
                {
                    apply(block, &info, &mut rewritten);
                    eliminated += 1;
                }
            }
        }

        if block.insts[i].opcode == SelOpcode::Mov {
            register_candidate(block, i, &mut pending);
        }
    }

    // Survivors are applied in program order of their defining moves so the
    // fail-safe guards in `apply_guards_ok` see a consistent picture.
    let mut survivors: Vec<ReplaceInfo> = pending.drain().map(|(_, info)| info).collect();
    survivors.sort_by_key(|info| info.def_inst);
    let mut remaining: HashSet<VirtReg> = survivors
        .iter()
        .map(|info| info.intermediate.reg)
        .collect();
    for info in survivors {
        remaining.remove(&info.intermediate.reg);
        let replacement_pending = remaining.contains(&info.replacement.reg);
        if apply_guards_ok(&info, replacement_pending, &rewritten) {
            apply(block, &info, &mut rewritten);
            eliminated += 1;
        }
    }

    eliminated
}

/// Fail-safe application guards. Dropping a candidate here just keeps its
/// MOV; the retry loop picks collapsed chains up on the next pass.
fn apply_guards_ok(info: &ReplaceInfo, replacement_pending: bool, rewritten: &HashSet<UseRef>) -> bool {
    // A pending candidate on the replacement register may later unlink the
    // very MOV that defines it; rewriting reads to it now could leave them
    // dangling.
    if replacement_pending {
        return false;
    }
    // If the defining MOV's own source was rewritten during this pass, the
    // replacement snapshot held here is stale.
    !rewritten.contains(&UseRef {
        inst: info.def_inst,
        slot: 0,
    })
}

/// Rewrites every recorded read to the replacement and unlinks the MOV.
fn apply(block: &mut SelBlock, info: &ReplaceInfo, rewritten: &mut HashSet<UseRef>) {
    for &use_ref in &info.uses {
        let occurrence = block.insts[use_ref.inst].src[use_ref.slot];
        block.insts[use_ref.inst].src[use_ref.slot] = substitute(&occurrence, &info.replacement);
        rewritten.insert(use_ref);
    }
    block.unlink(info.def_inst);
    trace!(
        intermediate = %info.intermediate.reg,
        replacement = %info.replacement.reg,
        uses = info.uses.len(),
        "eliminated move"
    );
}

/// Replacement operand for one read, with the read's own modifiers
/// composed on top of the MOV source's.
fn substitute(occurrence: &Operand, replacement: &Operand) -> Operand {
    let mut out = *replacement;
    if occurrence.abs {
        // |±x| == |x|: the replacement's negate is absorbed.
        out.abs = true;
        out.negate = occurrence.negate;
    } else {
        out.negate = occurrence.negate ^ replacement.negate;
        out.abs = replacement.abs;
    }
    out
}

/// Registers `block.insts[index]` (a MOV) as a new candidate if it has the
/// shape propagation handles.
fn register_candidate(
    block: &SelBlock,
    index: usize,
    pending: &mut HashMap<VirtReg, ReplaceInfo>,
) {
    let inst = &block.insts[index];
    debug_assert!(inst.opcode == SelOpcode::Mov);
    debug_assert!(
        inst.dst.len() == 1 && inst.src.len() == 1,
        "malformed MOV operand counts"
    );
    if inst.dst.len() != 1 || inst.src.len() != 1 {
        return;
    }
    let dst = inst.dst[0];
    let src = inst.src[0];

    if dst.file != RegFile::GeneralPurpose {
        return;
    }
    if src.ty != dst.ty || src.file != dst.file {
        return;
    }
    // A non-broadcast source must traverse its storage the way the
    // destination does, or the per-lane mapping changes under substitution.
    if src.region.hstride != 0 && src.region.hstride != dst.region.hstride {
        return;
    }
    if block.live_out.contains(&dst.reg) {
        return;
    }
    // Shapes outside the footprint model are never propagated.
    if !dst.region.is_normalized() || dst.region.width == 0 {
        return;
    }
    if !src.region.is_normalized() || src.region.width == 0 {
        return;
    }
    let elements = footprint(&dst, inst.state.exec_width);
    if elements.is_empty() {
        return;
    }

    pending.insert(
        dst.reg,
        ReplaceInfo {
            def_inst: index,
            def_state: inst.state,
            intermediate: dst,
            replacement: src,
            footprint: elements,
            uses: Vec::new(),
            replacement_overwritten: false,
        },
    );
}

/// Decides whether `var` (a read of `info`'s intermediate register inside
/// `inst`) may be rewritten to the candidate's replacement.
fn can_substitute(info: &ReplaceInfo, inst: &SelInst, var: &Operand, device: &Device) -> bool {
    // Hardware erratum carve-out.
    if inst.opcode == SelOpcode::Bswap {
        return false;
    }

    let modified = info.replacement.negate || info.replacement.abs;
    if modified {
        match inst.opcode {
            SelOpcode::Math => {
                if let Extra::Math(func) = inst.extra {
                    if func.is_int_div() {
                        return false;
                    }
                }
            }
            SelOpcode::Cbit
            | SelOpcode::Fbh
            | SelOpcode::Fbl
            | SelOpcode::Brc
            | SelOpcode::Brd
            | SelOpcode::Bfrev
            | SelOpcode::Lzd
            | SelOpcode::Hadd
            | SelOpcode::Rhadd => return false,
            _ => {}
        }
    }

    // Send-family ops reference the physical register layout directly and
    // never tolerate aliasing changes.
    if inst.opcode.is_send_read() || inst.opcode.is_send_write() {
        return false;
    }

    if device.quirks.contains(DeviceQuirks::NO_LOGIC_SRC_MODIFIER)
        && modified
        && matches!(
            inst.opcode,
            SelOpcode::And | SelOpcode::Not | SelOpcode::Or | SelOpcode::Xor
        )
    {
        return false;
    }

    if device.quirks.contains(DeviceQuirks::STRICT_QWORD_MOV_REGION)
        && inst.opcode == SelOpcode::Mov
    {
        if let Some(dst) = inst.dst.first() {
            if dst.is_int64() && !info.replacement.is_int64() {
                if !info.replacement.region.is_normalized() || info.replacement.region.width == 0 {
                    return false;
                }
                if info.footprint != footprint(&info.replacement, inst.state.exec_width) {
                    return false;
                }
            }
        }
    }

    if info.replacement_overwritten {
        return false;
    }

    // A move executed under the mask must not feed a mask-bypassing
    // consumer: the broader execution would observe lanes the move never
    // computed.
    if !info.def_state.no_mask && inst.state.no_mask {
        return false;
    }

    // An actively predicated consumer under a different predicate sees an
    // ambiguous partial overwrite. A predicate-free consumer is fine: it
    // will overwrite every lane the definition did.
    if info.def_state.predicate != inst.state.predicate && inst.state.predicate != PredCtrl::None {
        return false;
    }
    if info.def_state.invert_predicate != inst.state.invert_predicate {
        return false;
    }

    // Finally the exact-aliasing proof: same type and base addressing, and
    // the read's footprint under *its* execution width equals the one
    // recorded at the definition.
    if info.intermediate.ty == var.ty
        && info.intermediate.quarter == var.quarter
        && info.intermediate.subnr == var.subnr
        && info.intermediate.nr == var.nr
        && var.region.is_normalized()
        && var.region.width != 0
    {
        let elements = footprint(var, inst.state.exec_width);
        if !elements.is_empty() && elements == info.footprint {
            return true;
        }
    }

    false
}
