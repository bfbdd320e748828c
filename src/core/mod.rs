//! Foundational types: the address space, the cell array, and errors.

pub mod address;
pub mod error;
pub mod memory;

pub use address::{Address, HALT_BOUND, IO_PORT, MEMORY_SIZE};
pub use error::{VmError, VmResult};
pub use memory::Memory;
