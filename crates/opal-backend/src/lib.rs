//! Post-selection machine pipeline of the opal GPU kernel compiler.
//!
//! This crate is split into explicit stages to avoid pipeline ambiguity:
//! - [`sel`]: the selection IR — machine-shaped instructions grouped into
//!   basic blocks, as produced by the instruction selector.
//! - [`opt`]: the per-block copy-propagation optimizer, run on the selection
//!   IR before encoding.
//! - [`stream`]: the encoded kernel stream — instruction words, the label
//!   table, branch fixups and debug metadata, as produced by the encoder.
//! - [`relax`]: the branch relaxer (block-stub splitter), run on the encoded
//!   stream so no branch-free span exceeds the displacement limit.
//!
//! The two passes never call each other; both are synchronous and operate on
//! exclusively owned state, so separate kernels can be compiled on separate
//! threads. No subscriber is installed for the `tracing` events either pass
//! emits; bring your own.

pub mod opt;
pub mod relax;
pub mod sel;
pub mod stream;

pub use sel::{CondFn, Extra, MathFn, SelBlock, SelInst, SelOpcode, Selection};
pub use stream::{KernelStream, LabelPair, SrcLoc, StreamError};
