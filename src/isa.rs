//! The extended instruction set.
//!
//! Every address of the machine carries one extended instruction. Most
//! addresses hold a raw `Subleq` with its three operands prefetched; the
//! optimizer upgrades addresses where it recognises a cross-compiler
//! idiom. Each opcode advances the program counter by exactly the number
//! of raw SUBLEQ instructions the idiom replaces, so fused and raw
//! execution agree on where control continues.

use crate::core::Address;

/// Number of extended opcodes.
pub const OPCODE_COUNT: usize = 21;

/// Extended opcode. The discriminant order matches the statistics table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Raw subtract-and-branch step on prefetched operands `(src, dst, aux)`.
    Subleq,
    /// Unconditional jump: `m[src] = 0; pc = dst`.
    Jmp,
    /// `m[dst] += m[src]`.
    Add,
    /// `m[dst] -= m[src]`.
    Sub,
    /// `m[dst] = m[src]`.
    Mov,
    /// `m[dst] = 0`.
    Zero,
    /// Write the low byte of `m[src]` to output.
    Put,
    /// Read a byte into `m[dst]`.
    Get,
    /// Stop execution.
    Halt,
    /// Indirect addition: `m[m[dst]] += m[src]`.
    Iadd,
    /// Indirect subtraction: `m[m[dst]] -= m[src]`.
    Isub,
    /// Indirect jump: `pc = m[dst]`.
    Ijmp,
    /// Indirect load: `m[dst] = m[m[src]]`, with an input-negation path
    /// when the pointer holds the I/O sentinel.
    Iload,
    /// Indirect store: `m[m[dst]] = m[src]`.
    Istore,
    /// `m[dst] += 1`.
    Inc,
    /// `m[dst] -= 1`.
    Dec,
    /// `m[dst] = !m[dst]`.
    Inv,
    /// `m[dst] = 0 - m[src]`.
    Neg,
    /// `m[dst] <<= src` (`src` is a shift count, not an address).
    Lshift,
    /// `m[dst] <<= 1`.
    Double,
    /// `Iload`, then `m[src] += 1`.
    Ldinc,
}

impl Opcode {
    /// All opcodes in table order.
    pub const ALL: [Opcode; OPCODE_COUNT] = [
        Opcode::Subleq,
        Opcode::Jmp,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mov,
        Opcode::Zero,
        Opcode::Put,
        Opcode::Get,
        Opcode::Halt,
        Opcode::Iadd,
        Opcode::Isub,
        Opcode::Ijmp,
        Opcode::Iload,
        Opcode::Istore,
        Opcode::Inc,
        Opcode::Dec,
        Opcode::Inv,
        Opcode::Neg,
        Opcode::Lshift,
        Opcode::Double,
        Opcode::Ldinc,
    ];

    /// Index into per-opcode counter arrays.
    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The opcode name as shown in reports.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Subleq => "SUBLEQ",
            Opcode::Jmp => "JMP",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mov => "MOV",
            Opcode::Zero => "ZERO",
            Opcode::Put => "PUT",
            Opcode::Get => "GET",
            Opcode::Halt => "HALT",
            Opcode::Iadd => "IADD",
            Opcode::Isub => "ISUB",
            Opcode::Ijmp => "IJMP",
            Opcode::Iload => "ILOAD",
            Opcode::Istore => "ISTORE",
            Opcode::Inc => "INC",
            Opcode::Dec => "DEC",
            Opcode::Inv => "INV",
            Opcode::Neg => "NEG",
            Opcode::Lshift => "LSHIFT",
            Opcode::Double => "DOUBLE",
            Opcode::Ldinc => "LDINC",
        }
    }

    /// Fixed program-counter advance: the number of raw SUBLEQ words the
    /// fused idiom covers. Opcodes that set the PC directly (`Jmp`,
    /// `Ijmp`, `Halt`, a taken `Subleq` branch) return 0 here and
    /// override it in the dispatcher. `Lshift` advances by this value
    /// times its run length.
    #[inline(always)]
    pub fn advance(self) -> u16 {
        match self {
            Opcode::Subleq => 3,
            Opcode::Jmp => 0,
            Opcode::Add => 9,
            Opcode::Sub => 3,
            Opcode::Mov => 12,
            Opcode::Zero => 3,
            Opcode::Put => 3,
            Opcode::Get => 3,
            Opcode::Halt => 0,
            Opcode::Iadd => 21,
            Opcode::Isub => 15,
            Opcode::Ijmp => 0,
            Opcode::Iload => 24,
            Opcode::Istore => 36,
            Opcode::Inc => 3,
            Opcode::Dec => 3,
            Opcode::Inv => 21,
            Opcode::Neg => 6,
            Opcode::Lshift => 9,
            Opcode::Double => 9,
            Opcode::Ldinc => 27,
        }
    }
}

/// One extended instruction. Field meaning depends on the opcode: an
/// address, a shift count (`Lshift`), a jump target (`Subleq` aux), or
/// unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insn {
    pub opcode: Opcode,
    pub src: u16,
    pub dst: u16,
    pub aux: u16,
}

impl Insn {
    /// A raw SUBLEQ record with its operands prefetched from `pc`,
    /// `pc + 1`, `pc + 2`.
    pub fn subleq(a: u16, b: u16, c: u16) -> Self {
        Self {
            opcode: Opcode::Subleq,
            src: a,
            dst: b,
            aux: c,
        }
    }
}

/// The program-order address after executing the instruction at `pc`,
/// ignoring branches.
#[inline(always)]
pub fn fallthrough(pc: Address, insn: &Insn) -> Address {
    match insn.opcode {
        Opcode::Lshift => pc.wrapping_add(insn.opcode.advance().wrapping_mul(insn.src)),
        _ => pc.wrapping_add(insn.opcode.advance()),
    }
}
