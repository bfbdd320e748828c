//! Peephole superoptimizer.
//!
//! The Forth cross-compiler emits every high-level operation as a fixed
//! sequence of SUBLEQ instructions. This pass scans the loaded image
//! once, recognises those sequences with the pattern DSL, and installs a
//! single extended instruction at the base address of each. Unclaimed
//! addresses keep a raw `Subleq` record with prefetched operands, so the
//! fused stream is a strict refinement of the naive interpreter.
//!
//! Classification is overlapping by design: an address inside an idiom
//! may itself be claimed by a shorter pattern. Only the fixed per-opcode
//! advance decides which classifications execution actually reaches.

use crate::core::{Address, Memory, IO_PORT, MEMORY_SIZE};
use crate::isa::{Insn, Opcode, OPCODE_COUNT};
use crate::pattern::{MatchIo, PatternMatcher};

/// Maximum number of words a single pattern may scan (64 raw
/// instructions).
pub const SCAN_DEPTH: usize = 3 * 64;

/// The ILOAD idiom's internal jump must land on its sixth instruction.
const ILOAD_JUMP_OFFSET: u16 = 15;

/// The IJMP idiom's self-modified jump slot sits at this offset.
const IJMP_JUMP_OFFSET: u16 = 14;

/// Where the pointer-increment tail of a fused LDINC begins.
const LDINC_INCREMENT_OFFSET: u16 = 24;

/// Result of an optimization pass: one instruction per address, plus the
/// per-opcode substitution counts for the statistics table.
pub struct OptResult {
    pub insns: Vec<Insn>,
    pub matches: [u64; OPCODE_COUNT],
}

/// Prefetched raw `Subleq` records for every address. This is the `-O`
/// program, and the starting point of the optimizing pass.
pub fn raw_program(mem: &Memory) -> Vec<Insn> {
    (0..MEMORY_SIZE)
        .map(|i| {
            let pc = i as Address;
            Insn::subleq(
                mem.read(pc),
                mem.read(pc.wrapping_add(1)),
                mem.read(pc.wrapping_add(2)),
            )
        })
        .collect()
}

/// Snapshots of which image cells initially hold 0, 1 and 0xFFFF. The
/// cross-compiler parks those constants at fixed addresses and the
/// INC/DEC/INV idioms are distinguishable only through them. They are
/// not kept in sync with runtime writes; the pass runs before execution.
struct ConstTables {
    #[allow(dead_code)]
    is_zero: Vec<bool>,
    is_one: Vec<bool>,
    is_neg_one: Vec<bool>,
}

impl ConstTables {
    fn build(mem: &Memory, load_size: usize) -> Self {
        let mut is_zero = vec![false; MEMORY_SIZE];
        let mut is_one = vec![false; MEMORY_SIZE];
        let mut is_neg_one = vec![false; MEMORY_SIZE];
        for i in 0..load_size.min(MEMORY_SIZE) {
            let val = mem.read(i as Address);
            is_zero[i] = val == 0;
            is_one[i] = val == 1;
            is_neg_one[i] = val == IO_PORT;
        }
        Self {
            is_zero,
            is_one,
            is_neg_one,
        }
    }
}

/// Run the peephole pass over the loaded image.
pub fn optimize(mem: &Memory, load_size: usize) -> OptResult {
    let tables = ConstTables::build(mem, load_size);
    let mut insns = raw_program(mem);

    classify_all(mem, load_size, &tables, &mut insns);

    // Substitution counts fall out of the finished classification: every
    // scanned address contributes to exactly one opcode's tally.
    let mut matches = [0u64; OPCODE_COUNT];
    for insn in insns.iter().take(load_size) {
        matches[insn.opcode.index()] += 1;
    }

    OptResult { insns, matches }
}

#[cfg(not(feature = "parallel"))]
fn classify_all(mem: &Memory, load_size: usize, tables: &ConstTables, insns: &mut [Insn]) {
    let mut matcher = PatternMatcher::new();
    for i in 0..load_size {
        let depth = SCAN_DEPTH.min(load_size - i);
        if let Some(insn) = classify(mem, i as Address, depth, tables, &mut matcher) {
            insns[i] = insn;
        }
    }
}

#[cfg(feature = "parallel")]
fn classify_all(mem: &Memory, load_size: usize, tables: &ConstTables, insns: &mut [Insn]) {
    use rayon::prelude::*;

    let claimed: Vec<Option<Insn>> = (0..load_size)
        .into_par_iter()
        .map_init(PatternMatcher::new, |matcher, i| {
            let depth = SCAN_DEPTH.min(load_size - i);
            classify(mem, i as Address, depth, tables, matcher)
        })
        .collect();
    for (i, insn) in claimed.into_iter().enumerate() {
        if let Some(insn) = insn {
            insns[i] = insn;
        }
    }
}

/// Try every pattern at `pc` in priority order; first match wins. The
/// window holds `depth` words. Returns `None` when the address stays a
/// raw `Subleq`.
fn classify(
    mem: &Memory,
    pc: Address,
    depth: usize,
    tables: &ConstTables,
    m: &mut PatternMatcher,
) -> Option<Insn> {
    // ISTORE: m[m[D]] = S
    if m.matches(
        mem,
        pc,
        depth,
        "0Z> 11> 22> Z3> Z4> ZZ> 56> 77> Z7> 6Z> ZZ> 66>",
        &mut MatchIo::none(),
    ) {
        return Some(Insn {
            opcode: Opcode::Istore,
            dst: m.var(0),
            src: m.var(5),
            aux: 0,
        });
    }

    // ILOAD: m[D] = m[m[S]], fused with a trailing pointer increment
    // into LDINC when one follows.
    let mut iload_ptr = [0u16; 1];
    if m.matches(
        mem,
        pc,
        depth,
        "00> !Z> Z0> ZZ> 11> ?Z> Z1> ZZ>",
        &mut MatchIo::caps(&mut iload_ptr),
    ) && m.var(0) == pc.wrapping_add(ILOAD_JUMP_OFFSET)
    {
        // The next match attempt invalidates the slots, so read the
        // destination now.
        let dst = m.var(1);
        let src = iload_ptr[0];

        let mut inc = [0u16; 2];
        if depth >= Opcode::Ldinc.advance() as usize
            && m.matches(
                mem,
                pc.wrapping_add(LDINC_INCREMENT_OFFSET),
                depth - LDINC_INCREMENT_OFFSET as usize,
                "!!>",
                &mut MatchIo::caps(&mut inc),
            )
            && inc[0] != inc[1]
            && tables.is_neg_one[inc[0] as usize]
            && inc[1] == src
        {
            return Some(Insn {
                opcode: Opcode::Ldinc,
                dst,
                src,
                aux: 0,
            });
        }
        return Some(Insn {
            opcode: Opcode::Iload,
            dst,
            src,
            aux: 0,
        });
    }

    // LSHIFT: a run of doublings of the same address.
    let mut run: u16 = 0;
    let mut shift_dst: u16 = 0;
    let mut pos: usize = 0;
    while depth - pos >= 9 {
        let mut q = [0u16; 2];
        if m.matches(
            mem,
            pc.wrapping_add(pos as u16),
            depth - pos,
            "!Z> Z!> ZZ>",
            &mut MatchIo::caps(&mut q),
        ) && q[0] == q[1]
        {
            if run == 0 {
                shift_dst = q[0];
            } else if shift_dst != q[0] {
                break;
            }
            run += 1;
            pos += 9;
        } else {
            break;
        }
    }
    if run >= 2 {
        return Some(Insn {
            opcode: Opcode::Lshift,
            dst: shift_dst,
            src: run,
            aux: 0,
        });
    }

    // IADD: m[m[D]] += S
    if m.matches(
        mem,
        pc,
        depth,
        "01> 23> 44> 14> 3Z> 11> 33>",
        &mut MatchIo::none(),
    ) {
        return Some(Insn {
            opcode: Opcode::Iadd,
            dst: m.var(0),
            src: m.var(2),
            aux: 0,
        });
    }

    // INV: bitwise NOT, built out of an increment through a one-cell.
    let mut inv_one = [0u16; 1];
    if m.matches(
        mem,
        pc,
        depth,
        "00> 10> 11> 2Z> Z1> ZZ> !1>",
        &mut MatchIo::caps(&mut inv_one),
    ) && tables.is_one[inv_one[0] as usize]
    {
        return Some(Insn {
            opcode: Opcode::Inv,
            dst: m.var(1),
            src: 0,
            aux: 0,
        });
    }

    // ISUB: m[m[D]] -= S
    if m.matches(mem, pc, depth, "01> 33> 14> 5Z> 11>", &mut MatchIo::none()) {
        return Some(Insn {
            opcode: Opcode::Isub,
            dst: m.var(0),
            src: m.var(5),
            aux: 0,
        });
    }

    // IJMP: the MOV prefix writes the target into the final jump slot.
    let mut ijmp_ptr = [0u16; 1];
    if m.matches(
        mem,
        pc,
        depth,
        "00> !Z> Z0> ZZ> ZZ>",
        &mut MatchIo::caps(&mut ijmp_ptr),
    ) && m.var(0) == pc.wrapping_add(IJMP_JUMP_OFFSET)
    {
        return Some(Insn {
            opcode: Opcode::Ijmp,
            dst: ijmp_ptr[0],
            src: 0,
            aux: 0,
        });
    }

    // MOV: zero the destination, then subtract through the zero cell.
    let mut mov_src = [0u16; 1];
    if m.matches(
        mem,
        pc,
        depth,
        "00> !Z> Z0> ZZ>",
        &mut MatchIo::caps(&mut mov_src),
    ) {
        let dst = m.var(0);
        let src = mov_src[0];
        if dst != src {
            return Some(Insn {
                opcode: Opcode::Mov,
                dst,
                src,
                aux: 0,
            });
        }
    }

    // DOUBLE when both captured addresses coincide, ADD otherwise.
    let mut arith = [0u16; 2];
    if m.matches(mem, pc, depth, "!Z> Z!> ZZ>", &mut MatchIo::caps(&mut arith)) {
        let (src, dst) = (arith[0], arith[1]);
        let opcode = if src == dst { Opcode::Double } else { Opcode::Add };
        return Some(Insn {
            opcode,
            src,
            dst,
            aux: 0,
        });
    }

    // NEG: clear the destination, then subtract the source from it.
    if m.matches(mem, pc, depth, "00> 10>", &mut MatchIo::none()) {
        return Some(Insn {
            opcode: Opcode::Neg,
            dst: m.var(0),
            src: m.var(1),
            aux: 0,
        });
    }

    // ZERO: a cell subtracted from itself.
    if m.matches(mem, pc, depth, "00>", &mut MatchIo::none()) {
        return Some(Insn {
            opcode: Opcode::Zero,
            dst: m.var(0),
            src: 0,
            aux: 0,
        });
    }

    // HALT: an unconditional branch to the all-ones address.
    let mut halt_target = [0u16; 1];
    if m.matches(mem, pc, depth, "ZZ!", &mut MatchIo::caps(&mut halt_target))
        && halt_target[0] == IO_PORT
    {
        return Some(Insn {
            opcode: Opcode::Halt,
            src: 0,
            dst: 0,
            aux: 0,
        });
    }

    // JMP: self-subtraction always branches. A jump to itself can never
    // make progress, so it degrades to HALT.
    let mut jmp_target = [0u16; 1];
    if m.matches(mem, pc, depth, "00!", &mut MatchIo::caps(&mut jmp_target)) {
        if jmp_target[0] == pc {
            return Some(Insn {
                opcode: Opcode::Halt,
                src: 0,
                dst: 0,
                aux: 0,
            });
        }
        return Some(Insn {
            opcode: Opcode::Jmp,
            dst: jmp_target[0],
            // The cell the idiom zeroes on the way out.
            src: m.var(0),
            aux: 0,
        });
    }

    // GET: input straight into a cell.
    let mut get_dst = [0u16; 1];
    if m.matches(mem, pc, depth, "N!>", &mut MatchIo::caps(&mut get_dst)) {
        return Some(Insn {
            opcode: Opcode::Get,
            dst: get_dst[0],
            src: 0,
            aux: 0,
        });
    }

    // PUT: a cell straight to output.
    let mut put_src = [0u16; 1];
    if m.matches(mem, pc, depth, "!N>", &mut MatchIo::caps(&mut put_src)) {
        return Some(Insn {
            opcode: Opcode::Put,
            src: put_src[0],
            dst: 0,
            aux: 0,
        });
    }

    // Any other fall-through subtraction: INC and DEC when the source is
    // one of the compiler's constant cells, plain SUB otherwise.
    let mut sub = [0u16; 2];
    if m.matches(mem, pc, depth, "!!>", &mut MatchIo::caps(&mut sub)) && sub[0] != sub[1] {
        let (src, dst) = (sub[0], sub[1]);
        if tables.is_neg_one[src as usize] {
            return Some(Insn {
                opcode: Opcode::Inc,
                dst,
                src: 0,
                aux: 0,
            });
        }
        if tables.is_one[src as usize] {
            return Some(Insn {
                opcode: Opcode::Dec,
                dst,
                src: 0,
                aux: 0,
            });
        }
        return Some(Insn {
            opcode: Opcode::Sub,
            src,
            dst,
            aux: 0,
        });
    }

    None
}
