//! Shared test helpers: a lane-accurate reference interpreter for the
//! integer selection subset, plus a few operand builders.
//!
//! The interpreter executes one block element-by-element, honoring region
//! addressing, predication and the execution-mask bypass, so a block can be
//! run before and after optimization and compared byte-for-byte on its
//! live-out registers. Float opcodes are deliberately out of scope to keep
//! comparisons bit-exact.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::HashMap;

use opal_backend::sel::{SelBlock, SelInst, SelOpcode};
use opal_isa::{ElemType, ExecState, Operand, PredCtrl, RegFile, Region, VirtReg, REG_BYTES};
use rand::Rng;

/// Backing bytes per virtual register; generous enough for every region the
/// generators produce.
pub const REG_STORAGE: usize = 256;

pub const FLAG_LANES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    pub regs: HashMap<VirtReg, [u8; REG_STORAGE]>,
    /// Flag lanes keyed by (flag nr, sub-flag).
    pub flags: HashMap<(u8, u8), [bool; FLAG_LANES]>,
}

impl Machine {
    pub fn random(rng: &mut impl Rng, regs: &[VirtReg]) -> Machine {
        let mut machine = Machine {
            regs: HashMap::new(),
            flags: HashMap::new(),
        };
        for &reg in regs {
            let mut bytes = [0u8; REG_STORAGE];
            rng.fill(&mut bytes[..]);
            machine.regs.insert(reg, bytes);
        }
        for nr in 0..2 {
            for sub in 0..2 {
                let mut lanes = [false; FLAG_LANES];
                for lane in &mut lanes {
                    *lane = rng.gen_bool(0.5);
                }
                machine.flags.insert((nr, sub), lanes);
            }
        }
        machine
    }

    fn lane_enabled(&self, state: &ExecState, lane: u32) -> bool {
        if state.no_mask {
            return true;
        }
        match state.predicate {
            PredCtrl::None => true,
            PredCtrl::Normal => {
                let lanes = self
                    .flags
                    .get(&(state.flag.nr, state.flag.sub))
                    .copied()
                    .unwrap_or([false; FLAG_LANES]);
                lanes[lane as usize] ^ state.invert_predicate
            }
            other => panic!("reference interpreter does not model {other:?}"),
        }
    }

    fn elem_offset(op: &Operand, lane: u32) -> usize {
        let elem = op.ty.byte_size();
        let row = lane / op.region.width;
        let col = lane % op.region.width;
        (op.nr * REG_BYTES
            + op.subnr
            + row * op.region.vstride * elem
            + col * op.region.hstride * elem) as usize
    }

    /// Loads one lane's element with source modifiers applied, widened to a
    /// 64-bit two's-complement value.
    fn load(&self, op: &Operand, lane: u32) -> u64 {
        let raw = match op.file {
            RegFile::Immediate => match op.imm {
                opal_isa::Imm::Int(v) => v as u64,
                opal_isa::Imm::Uint(v) => v,
                other => panic!("reference interpreter does not model {other:?}"),
            },
            RegFile::GeneralPurpose => {
                let bytes = &self.regs[&op.reg];
                let offset = Self::elem_offset(op, lane);
                let size = op.ty.byte_size() as usize;
                let mut value = 0u64;
                for i in 0..size {
                    value |= (bytes[offset + i] as u64) << (8 * i);
                }
                if op.ty.is_signed() {
                    sign_extend(value, size)
                } else {
                    value
                }
            }
            RegFile::Architecture => panic!("architecture operands not modeled"),
        };

        let mut value = raw;
        if op.abs && op.ty.is_signed() {
            value = (value as i64).wrapping_abs() as u64;
        }
        if op.negate {
            value = value.wrapping_neg();
        }
        value
    }

    fn store(&mut self, op: &Operand, lane: u32, value: u64) {
        let bytes = self.regs.get_mut(&op.reg).expect("dst register seeded");
        let offset = Self::elem_offset(op, lane);
        for i in 0..op.ty.byte_size() as usize {
            bytes[offset + i] = (value >> (8 * i)) as u8;
        }
    }

    /// Executes every live instruction of `block` in program order.
    pub fn execute(&mut self, block: &SelBlock) {
        for inst in block.iter_live() {
            self.execute_inst(inst);
        }
    }

    fn execute_inst(&mut self, inst: &SelInst) {
        let compute = |srcs: &[u64]| -> u64 {
            match inst.opcode {
                SelOpcode::Mov => srcs[0],
                SelOpcode::Not => !srcs[0],
                SelOpcode::Add => srcs[0].wrapping_add(srcs[1]),
                SelOpcode::Mul => srcs[0].wrapping_mul(srcs[1]),
                SelOpcode::And => srcs[0] & srcs[1],
                SelOpcode::Or => srcs[0] | srcs[1],
                SelOpcode::Xor => srcs[0] ^ srcs[1],
                other => panic!("reference interpreter does not model {other:?}"),
            }
        };

        let dst = inst.dst[0];
        // All lanes read before any lane writes.
        let mut writes: Vec<(u32, u64)> = Vec::new();
        for lane in 0..inst.state.exec_width {
            if !self.lane_enabled(&inst.state, lane) {
                continue;
            }
            let srcs: Vec<u64> = inst.src.iter().map(|src| self.load(src, lane)).collect();
            writes.push((lane, compute(&srcs)));
        }
        for (lane, value) in writes {
            self.store(&dst, lane, value);
        }
    }

    pub fn reg_bytes(&self, reg: VirtReg) -> &[u8; REG_STORAGE] {
        &self.regs[&reg]
    }
}

fn sign_extend(value: u64, size: usize) -> u64 {
    let shift = 64 - 8 * size as u32;
    (((value << shift) as i64) >> shift) as u64
}

// ---- builders ---------------------------------------------------------------

pub fn vop(reg: u32, ty: ElemType, region: Region) -> Operand {
    Operand::vreg(VirtReg(reg), ty, region)
}

pub fn mov(dst: Operand, src: Operand, state: ExecState) -> SelInst {
    SelInst::new(SelOpcode::Mov, vec![dst], vec![src], state)
}

pub fn binop(opcode: SelOpcode, dst: Operand, a: Operand, b: Operand, state: ExecState) -> SelInst {
    SelInst::new(opcode, vec![dst], vec![a, b], state)
}
