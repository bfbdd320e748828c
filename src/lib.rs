//! A 16-bit SUBLEQ one-instruction-set computer, fast enough to host a
//! self-hosting Forth image interactively.
//!
//! Naive SUBLEQ expands every primitive operation into many three-word
//! instructions. This crate loads an image, runs a peephole pass that
//! fuses the cross-compiler's idioms into typed extended opcodes, and
//! executes the fused stream through a bounded-stack dispatch loop that
//! preserves exact SUBLEQ semantics on every unclaimed address.

pub mod core;
pub mod image;
pub mod io;
pub mod isa;
pub mod optimizer;
pub mod pattern;
pub mod profiler;
pub mod stats;
pub mod vm;

pub use crate::core::{Address, Memory, VmError, VmResult, HALT_BOUND, IO_PORT, MEMORY_SIZE};
pub use crate::image::{load_image, parse_image};
pub use crate::io::{Buffered, Console, Stdio};
pub use crate::isa::{fallthrough, Insn, Opcode, OPCODE_COUNT};
pub use crate::optimizer::{optimize, raw_program, OptResult, SCAN_DEPTH};
pub use crate::pattern::{MatchIo, PatternMatcher};
pub use crate::profiler::{HotSpot, Profiler, ProfilerSummary, MAX_HOT_SPOTS};
pub use crate::stats::StatsReport;
pub use crate::vm::{RunStatus, Vm};
