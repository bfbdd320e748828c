//! Address types and machine-geometry constants.
//!
//! These are separated out into a leaf module so that every other core
//! module can depend on them without cycles.

/// Memory address (16-bit index into the cell array).
pub type Address = u16;

/// The size of the memory space (2^16 = 65536 cells).
pub const MEMORY_SIZE: usize = 65536;

/// The all-ones operand value that stands for the I/O port inside a raw
/// SUBLEQ instruction: as the subtrahend source it means "read a byte",
/// as the destination it means "write a byte".
pub const IO_PORT: u16 = 0xFFFF;

/// First address of the terminal range. A program counter at or beyond
/// half the cell array stops execution; the eForth image relies on this
/// convention to halt.
pub const HALT_BOUND: Address = (MEMORY_SIZE / 2) as Address;
