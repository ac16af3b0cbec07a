//! Machine model for the opal GPU back end.
//!
//! This crate holds the pure, pass-free description of the target ISA:
//! - [`reg`]: register files, element types and region-typed operands.
//! - [`region`]: the footprint calculation over sub-register element slots.
//! - [`state`]: per-instruction execution state (width, predication, masks).
//! - [`device`]: the hardware-generation capability set threaded through the
//!   compiler passes.
//! - [`native`]: encoded instruction words, opcodes and stream labels.
//!
//! Nothing here performs I/O or holds mutable shared state; independent
//! kernels can use these types from separate threads.

pub mod device;
pub mod native;
pub mod reg;
pub mod region;
pub mod state;

pub use device::{Device, DeviceQuirks, GEN7, GEN7_5, GEN8, GEN9};
pub use native::{jmpi, nop, InstWord, Label, Opcode};
pub use reg::{
    ElemType, Imm, Operand, RegFile, VirtReg, ARF_ACCUMULATOR, ARF_FLAG, ARF_NULL, REG_BYTES,
};
pub use region::{footprint, ElementSet, Region};
pub use state::{ExecState, FlagRef, PredCtrl};

const _: () = {
    // The footprint fold (see `region`) relies on the register row size
    // dividing the element-set width.
    assert!(REG_BYTES.is_power_of_two());
    assert!(region::ElementSet::BITS % REG_BYTES == 0);
};
