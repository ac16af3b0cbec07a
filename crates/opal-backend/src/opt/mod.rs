//! Optimizer passes over the selection IR.

pub mod copy_prop;

use opal_isa::Device;

use crate::sel::Selection;

/// Runs the block-local passes over every block of the selection unit.
/// Returns the number of instructions eliminated.
pub fn optimize_selection(selection: &mut Selection, device: &Device) -> usize {
    let mut eliminated = 0;
    for block in &mut selection.blocks {
        eliminated += copy_prop::run(block, device);
    }
    eliminated
}
