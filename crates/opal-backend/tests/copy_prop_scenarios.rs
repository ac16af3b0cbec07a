//! Focused copy-propagation scenarios, one block each.

mod common;

use common::{binop, mov, vop};
use opal_backend::opt::copy_prop;
use opal_backend::sel::{Extra, MathFn, SelBlock, SelInst, SelOpcode};
use opal_isa::{
    Device, DeviceQuirks, ElemType, ExecState, FlagRef, Operand, RegFile, Region, VirtReg, GEN8,
};

fn device() -> Device {
    Device::new(GEN8)
}

fn u32x8(reg: u32) -> Operand {
    vop(reg, ElemType::U32, Region::contiguous(8))
}

fn block(live_out: &[u32]) -> SelBlock {
    SelBlock::new(live_out.iter().map(|&reg| VirtReg(reg)).collect())
}

#[test]
fn mov_feeding_add_is_eliminated() {
    // mov %5, %1
    // add %2, %5, %3     with %5 not live-out
    let mut bb = block(&[2]);
    bb.push(mov(u32x8(5), u32x8(1), ExecState::new(8)));
    bb.push(binop(SelOpcode::Add, u32x8(2), u32x8(5), u32x8(3), ExecState::new(8)));

    assert_eq!(copy_prop::run(&mut bb, &device()), 1);
    assert_eq!(bb.insts.len(), 1);
    let add = &bb.insts[0];
    assert_eq!(add.opcode, SelOpcode::Add);
    assert_eq!(add.src[0].reg, VirtReg(1));
    assert_eq!(add.src[1].reg, VirtReg(3));
}

#[test]
fn live_out_destination_keeps_the_mov() {
    let mut bb = block(&[2, 5]);
    bb.push(mov(u32x8(5), u32x8(1), ExecState::new(8)));
    bb.push(binop(SelOpcode::Add, u32x8(2), u32x8(5), u32x8(3), ExecState::new(8)));

    assert_eq!(copy_prop::run(&mut bb, &device()), 0);
    assert_eq!(bb.live_len(), 2);
    assert_eq!(bb.insts[1].src[0].reg, VirtReg(5));
}

#[test]
fn bswap_reader_keeps_the_mov() {
    let mut bb = block(&[2]);
    bb.push(mov(u32x8(5), u32x8(1), ExecState::new(8)));
    bb.push(SelInst::new(
        SelOpcode::Bswap,
        vec![u32x8(2)],
        vec![u32x8(5)],
        ExecState::new(8),
    ));

    assert_eq!(copy_prop::run(&mut bb, &device()), 0);
    assert_eq!(bb.live_len(), 2);
}

#[test]
fn send_family_reader_keeps_the_mov() {
    let mut bb = block(&[2]);
    bb.push(mov(u32x8(5), u32x8(1), ExecState::new(8)));
    bb.push(SelInst::new(
        SelOpcode::UntypedWrite,
        vec![],
        vec![u32x8(4), u32x8(5)],
        ExecState::new(8),
    ));

    assert_eq!(copy_prop::run(&mut bb, &device()), 0);
    assert_eq!(bb.live_len(), 2);
}

#[test]
fn read_after_replacement_overwrite_keeps_the_mov() {
    // mov %5, %1
    // add %2, %5, %3
    // mov %1, %4         <- replacement overwritten
    // add %6, %5, %3     <- this read kills the candidate entirely
    let mut bb = block(&[1, 2, 6]);
    bb.push(mov(u32x8(5), u32x8(1), ExecState::new(8)));
    bb.push(binop(SelOpcode::Add, u32x8(2), u32x8(5), u32x8(3), ExecState::new(8)));
    bb.push(mov(u32x8(1), u32x8(4), ExecState::new(8)));
    bb.push(binop(SelOpcode::Add, u32x8(6), u32x8(5), u32x8(3), ExecState::new(8)));

    assert_eq!(copy_prop::run(&mut bb, &device()), 0);
    assert_eq!(bb.live_len(), 4);
    assert_eq!(bb.insts[1].src[0].reg, VirtReg(5));
    assert_eq!(bb.insts[3].src[0].reg, VirtReg(5));
}

#[test]
fn reads_before_replacement_overwrite_still_propagate() {
    // Same, but %5 is never read after the overwrite: the use recorded
    // before it stays valid.
    let mut bb = block(&[1, 2]);
    bb.push(mov(u32x8(5), u32x8(1), ExecState::new(8)));
    bb.push(binop(SelOpcode::Add, u32x8(2), u32x8(5), u32x8(3), ExecState::new(8)));
    bb.push(mov(u32x8(1), u32x8(4), ExecState::new(8)));

    assert_eq!(copy_prop::run(&mut bb, &device()), 1);
    assert_eq!(bb.live_len(), 2);
    assert_eq!(bb.insts[0].opcode, SelOpcode::Add);
    assert_eq!(bb.insts[0].src[0].reg, VirtReg(1));
}

#[test]
fn no_mask_consumer_rejects_masked_definition() {
    let mut bb = block(&[2]);
    bb.push(mov(u32x8(5), u32x8(1), ExecState::new(8)));
    bb.push(binop(
        SelOpcode::Add,
        u32x8(2),
        u32x8(5),
        u32x8(3),
        ExecState::new(8).with_no_mask(),
    ));

    assert_eq!(copy_prop::run(&mut bb, &device()), 0);
}

#[test]
fn no_mask_definition_feeds_any_consumer() {
    let mut bb = block(&[2]);
    bb.push(mov(u32x8(5), u32x8(1), ExecState::new(8).with_no_mask()));
    bb.push(binop(SelOpcode::Add, u32x8(2), u32x8(5), u32x8(3), ExecState::new(8)));

    assert_eq!(copy_prop::run(&mut bb, &device()), 1);
}

#[test]
fn predicate_compatibility_gates_substitution() {
    let flag = FlagRef { nr: 0, sub: 0 };

    // Same predicate on both sides: eligible.
    let mut bb = block(&[2]);
    bb.push(mov(
        u32x8(5),
        u32x8(1),
        ExecState::new(8).with_predicate(flag, false),
    ));
    bb.push(binop(
        SelOpcode::Add,
        u32x8(2),
        u32x8(5),
        u32x8(3),
        ExecState::new(8).with_predicate(flag, false),
    ));
    assert_eq!(copy_prop::run(&mut bb, &device()), 1);

    // Inverted-predicate mismatch: always rejected.
    let mut bb = block(&[2]);
    bb.push(mov(
        u32x8(5),
        u32x8(1),
        ExecState::new(8).with_predicate(flag, false),
    ));
    bb.push(binop(
        SelOpcode::Add,
        u32x8(2),
        u32x8(5),
        u32x8(3),
        ExecState::new(8).with_predicate(flag, true),
    ));
    assert_eq!(copy_prop::run(&mut bb, &device()), 0);
}

#[test]
fn footprint_mismatch_rejects_substitution() {
    // Defined 8 wide, read 16 wide: element sets differ.
    let mut bb = block(&[2]);
    bb.push(mov(u32x8(5), u32x8(1), ExecState::new(8)));
    bb.push(binop(
        SelOpcode::Add,
        vop(2, ElemType::U32, Region::contiguous(16)),
        vop(5, ElemType::U32, Region::contiguous(16)),
        vop(3, ElemType::U32, Region::contiguous(16)),
        ExecState::new(16),
    ));

    assert_eq!(copy_prop::run(&mut bb, &device()), 0);
}

#[test]
fn intermediate_overwrite_resolves_then_recollects() {
    // mov %5, %1
    // add %2, %5, %3
    // mov %5, %4         <- full overwrite resolves the first candidate
    // add %6, %5, %3
    let mut bb = block(&[2, 6]);
    bb.push(mov(u32x8(5), u32x8(1), ExecState::new(8)));
    bb.push(binop(SelOpcode::Add, u32x8(2), u32x8(5), u32x8(3), ExecState::new(8)));
    bb.push(mov(u32x8(5), u32x8(4), ExecState::new(8)));
    bb.push(binop(SelOpcode::Add, u32x8(6), u32x8(5), u32x8(3), ExecState::new(8)));

    assert_eq!(copy_prop::run(&mut bb, &device()), 2);
    assert_eq!(bb.insts.len(), 2);
    assert_eq!(bb.insts[0].src[0].reg, VirtReg(1));
    assert_eq!(bb.insts[1].src[0].reg, VirtReg(4));
}

#[test]
fn modifier_rejecting_opcodes_keep_the_mov() {
    // The replacement carries a negate; LZD takes no source modifiers.
    let mut bb = block(&[2]);
    bb.push(mov(u32x8(5), u32x8(1).with_negate(), ExecState::new(8)));
    bb.push(SelInst::new(
        SelOpcode::Lzd,
        vec![u32x8(2)],
        vec![u32x8(5)],
        ExecState::new(8),
    ));
    assert_eq!(copy_prop::run(&mut bb, &device()), 0);

    // Integer divide via MATH is in the same boat.
    let mut bb = block(&[2]);
    bb.push(mov(u32x8(5), u32x8(1).with_negate(), ExecState::new(8)));
    bb.push(
        binop(SelOpcode::Math, u32x8(2), u32x8(5), u32x8(3), ExecState::new(8))
            .with_extra(Extra::Math(MathFn::IntDivQuot)),
    );
    assert_eq!(copy_prop::run(&mut bb, &device()), 0);

    // A plain ADD accepts the modifier.
    let mut bb = block(&[2]);
    bb.push(mov(u32x8(5), u32x8(1).with_negate(), ExecState::new(8)));
    bb.push(binop(SelOpcode::Add, u32x8(2), u32x8(5), u32x8(3), ExecState::new(8)));
    assert_eq!(copy_prop::run(&mut bb, &device()), 1);
    assert!(bb.insts[0].src[0].negate);
}

#[test]
fn logic_src_modifier_quirk_gates_logical_opcodes() {
    let build = || {
        let mut bb = block(&[2]);
        bb.push(mov(u32x8(5), u32x8(1).with_negate(), ExecState::new(8)));
        bb.push(binop(SelOpcode::And, u32x8(2), u32x8(5), u32x8(3), ExecState::new(8)));
        bb
    };

    let mut plain = build();
    assert_eq!(copy_prop::run(&mut plain, &device()), 1);

    let quirky = device().with_quirks(DeviceQuirks::NO_LOGIC_SRC_MODIFIER);
    let mut restricted = build();
    assert_eq!(copy_prop::run(&mut restricted, &quirky), 0);
}

#[test]
fn strict_qword_mov_quirk_rejects_mismatched_widening() {
    // The consuming MOV widens to a 64-bit destination from a 32-bit
    // replacement whose footprint differs from the intermediate's.
    let build = || {
        let mut bb = block(&[2]);
        bb.push(mov(
            u32x8(5),
            u32x8(1).with_offset(0, 16),
            ExecState::new(8),
        ));
        bb.push(mov(
            vop(2, ElemType::U64, Region::contiguous(8)),
            u32x8(5),
            ExecState::new(8),
        ));
        bb
    };

    let mut plain = build();
    assert_eq!(copy_prop::run(&mut plain, &device()), 1);

    let quirky = device().with_quirks(DeviceQuirks::STRICT_QWORD_MOV_REGION);
    let mut restricted = build();
    assert_eq!(copy_prop::run(&mut restricted, &quirky), 0);
}

#[test]
fn immediate_and_null_operands_never_alias_register_zero() {
    // %0 is an ordinary virtual register here, while the immediate and the
    // null destination carry the default register index 0; neither may be
    // taken for a read or write of the candidate.
    // mov %0, %1
    // cmp null, %0, 0x2a
    // add %2, %0, 0x2a
    let mut bb = block(&[2]);
    bb.push(mov(u32x8(0), u32x8(1), ExecState::new(8)));
    bb.push(binop(
        SelOpcode::Cmp,
        Operand::null(),
        u32x8(0),
        Operand::imm_ud(0x2a),
        ExecState::new(8),
    ));
    bb.push(binop(
        SelOpcode::Add,
        u32x8(2),
        u32x8(0),
        Operand::imm_ud(0x2a),
        ExecState::new(8),
    ));

    assert_eq!(copy_prop::run(&mut bb, &device()), 1);
    assert_eq!(bb.insts.len(), 2);
    assert_eq!(bb.insts[0].src[0].reg, VirtReg(1));
    assert_eq!(bb.insts[1].src[0].reg, VirtReg(1));
    assert_eq!(bb.insts[1].src[1].file, RegFile::Immediate);
}

#[test]
fn second_run_is_idempotent() {
    let mut bb = block(&[2]);
    bb.push(mov(u32x8(5), u32x8(1), ExecState::new(8)));
    bb.push(mov(u32x8(6), u32x8(5), ExecState::new(8)));
    bb.push(binop(SelOpcode::Add, u32x8(2), u32x8(6), u32x8(3), ExecState::new(8)));

    assert!(copy_prop::run(&mut bb, &device()) > 0);
    assert_eq!(copy_prop::run(&mut bb, &device()), 0);
}
