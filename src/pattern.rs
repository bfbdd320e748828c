//! Pattern DSL over raw instruction windows.
//!
//! The optimizer describes each cross-compiler idiom as a compact string
//! evaluated against the memory words starting at a base address. Every
//! non-whitespace symbol consumes one word at `pc + offset`:
//!
//! | Symbol | Meaning |
//! |--------|---------|
//! | `0`-`9`| Capture slot. First occurrence binds the word; later occurrences must equal the bound value. |
//! | `Z`    | Word must be 0. |
//! | `N`    | Word must be the I/O sentinel (all bits set). |
//! | `>`    | Word must equal `pc + offset + 1`, a fall-through jump target. |
//! | `%`    | Word must equal the next constant supplied by the caller. |
//! | `!`    | Word is captured into the caller's next output slot. |
//! | `?`    | Wildcard. |
//! | `P`    | Word must be non-zero with the top bit clear. |
//! | `M`    | Word must be a memory address or the I/O sentinel. |
//! | `R`    | Word must equal the capture slot named by the caller's next slot reference. |
//!
//! Slot validity is gated by a version counter: every match attempt bumps
//! the version, so stale bindings are ignored without clearing anything.
//! This runs once per load, so clarity wins over cleverness here.

use crate::core::{Address, Memory, IO_PORT, MEMORY_SIZE};

/// Number of numbered capture slots.
pub const SLOT_COUNT: usize = 10;

/// Caller-supplied side channels for the `%`, `!` and `R` symbols. Each
/// occurrence of one of those symbols consumes the next entry of its
/// queue; a pattern that outruns its queue does not match.
#[derive(Debug, Default)]
pub struct MatchIo<'a> {
    consts: &'a [u16],
    slot_refs: &'a [u8],
    caps: &'a mut [u16],
    const_cursor: usize,
    slot_cursor: usize,
    cap_cursor: usize,
}

impl<'a> MatchIo<'a> {
    /// Side channels for a pattern using none of `%`, `!`, `R`.
    pub fn none() -> MatchIo<'static> {
        MatchIo::default()
    }

    /// Side channels for a pattern using only `!` captures.
    pub fn caps(caps: &'a mut [u16]) -> Self {
        Self {
            caps,
            ..Default::default()
        }
    }

    /// Fully general side channels.
    pub fn new(consts: &'a [u16], slot_refs: &'a [u8], caps: &'a mut [u16]) -> Self {
        Self {
            consts,
            slot_refs,
            caps,
            const_cursor: 0,
            slot_cursor: 0,
            cap_cursor: 0,
        }
    }

    fn next_const(&mut self) -> Option<u16> {
        let val = self.consts.get(self.const_cursor).copied();
        self.const_cursor += 1;
        val
    }

    fn next_slot_ref(&mut self) -> Option<u8> {
        let slot = self.slot_refs.get(self.slot_cursor).copied();
        self.slot_cursor += 1;
        slot
    }

    fn capture(&mut self, val: u16) -> bool {
        if let Some(out) = self.caps.get_mut(self.cap_cursor) {
            *out = val;
            self.cap_cursor += 1;
            true
        } else {
            false
        }
    }
}

/// The matcher: ten capture slots plus the version counter that scopes
/// them to a single attempt.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    vars: [u16; SLOT_COUNT],
    set: [u32; SLOT_COUNT],
    version: u32,
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self {
            vars: [0; SLOT_COUNT],
            set: [0; SLOT_COUNT],
            version: 0,
        }
    }

    /// Value bound to a numbered slot during the most recent successful
    /// attempt, or the sentinel 0xFFFF when the slot was never bound.
    pub fn var(&self, slot: u8) -> u16 {
        let idx = slot as usize;
        if idx < SLOT_COUNT && self.set[idx] == self.version {
            self.vars[idx]
        } else {
            IO_PORT
        }
    }

    /// Match `pattern` against the window of `max_len` words starting at
    /// `pc`. Bindings from previous attempts are invalidated up front;
    /// side-channel cursors in `io` advance even on failure.
    pub fn matches(
        &mut self,
        mem: &Memory,
        pc: Address,
        max_len: usize,
        pattern: &str,
        io: &mut MatchIo<'_>,
    ) -> bool {
        self.version = self.version.wrapping_add(1);
        let mut offset: u16 = 0;

        for sym in pattern.chars() {
            if sym.is_whitespace() {
                continue;
            }
            if usize::from(offset) >= max_len {
                return false;
            }
            let val = mem.read(pc.wrapping_add(offset));

            let ok = match sym {
                '0'..='9' => {
                    let idx = (sym as u8 - b'0') as usize;
                    if self.set[idx] == self.version {
                        self.vars[idx] == val
                    } else {
                        self.set[idx] = self.version;
                        self.vars[idx] = val;
                        true
                    }
                }
                'Z' => val == 0,
                'N' => val == IO_PORT,
                '>' => val == pc.wrapping_add(offset).wrapping_add(1),
                '%' => io.next_const() == Some(val),
                '!' => io.capture(val),
                '?' => true,
                'P' => val != 0 && val & 0x8000 == 0,
                'M' => (val as usize) < MEMORY_SIZE || val == IO_PORT,
                'R' => match io.next_slot_ref() {
                    Some(slot) => {
                        let idx = slot as usize;
                        idx < SLOT_COUNT
                            && self.set[idx] == self.version
                            && self.vars[idx] == val
                    }
                    None => false,
                },
                _ => false,
            };
            if !ok {
                return false;
            }
            offset += 1;
        }
        true
    }
}
