//! Lightweight execution profiler.
//!
//! When enabled, the dispatcher feeds every executed PC into a heat map
//! and counts each cell read and write. On termination the profiler
//! ranks the hottest addresses, prints a summary to the diagnostic
//! stream and writes the full report to a plain-text file.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::{Address, VmError, VmResult, MEMORY_SIZE};
use crate::isa::{Insn, Opcode};

/// Most hot spots tracked in a report.
pub const MAX_HOT_SPOTS: usize = 64;

/// Execution count a PC must exceed to be considered a hot spot.
pub const HOT_SPOT_THRESHOLD: u64 = 100;

/// One hot address in the heat map.
#[derive(Debug, Clone, Copy)]
pub struct HotSpot {
    pub pc: Address,
    pub count: u64,
    pub opcode: Opcode,
}

/// Profiler state. Disabled profilers keep no heat map and their record
/// hooks cost a branch.
#[derive(Debug)]
pub struct Profiler {
    enabled: bool,
    heat_map: Vec<u64>,
    total_instructions: u64,
    memory_accesses: u64,
}

impl Profiler {
    /// A profiler that records nothing.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            heat_map: Vec::new(),
            total_instructions: 0,
            memory_accesses: 0,
        }
    }

    /// A recording profiler with a full-size heat map.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            heat_map: vec![0; MEMORY_SIZE],
            total_instructions: 0,
            memory_accesses: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one dispatched instruction.
    #[inline(always)]
    pub fn record_pc(&mut self, pc: Address) {
        if self.enabled {
            self.total_instructions += 1;
            self.heat_map[pc as usize] += 1;
        }
    }

    /// Record `n` cell reads or writes.
    #[inline(always)]
    pub fn record_accesses(&mut self, n: u64) {
        if self.enabled {
            self.memory_accesses += n;
        }
    }

    pub fn total_instructions(&self) -> u64 {
        self.total_instructions
    }

    pub fn memory_accesses(&self) -> u64 {
        self.memory_accesses
    }

    /// Extract hot spots from the heat map: the first `MAX_HOT_SPOTS`
    /// addresses (in address order) whose count exceeds the threshold,
    /// ranked by descending execution count.
    pub fn hot_spots(&self, insns: &[Insn]) -> Vec<HotSpot> {
        if !self.enabled {
            return Vec::new();
        }
        let mut spots: Vec<HotSpot> = self
            .heat_map
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > HOT_SPOT_THRESHOLD)
            .take(MAX_HOT_SPOTS)
            .map(|(pc, &count)| HotSpot {
                pc: pc as Address,
                count,
                opcode: insns[pc].opcode,
            })
            .collect();
        spots.sort_by(|a, b| b.count.cmp(&a.count));
        spots
    }

    /// Summary for the diagnostic stream.
    pub fn summary<'a>(&'a self, elapsed: f64, spots: &'a [HotSpot]) -> ProfilerSummary<'a> {
        ProfilerSummary {
            profiler: self,
            elapsed,
            spots,
        }
    }

    /// Write the full report: totals, instruction mix, and every tracked
    /// hot spot.
    pub fn write_report(
        &self,
        path: &Path,
        elapsed: f64,
        exec_counts: &[u64],
        spots: &[HotSpot],
    ) -> VmResult<()> {
        let report = |source| VmError::ReportWrite {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(report)?;
        let mut w = BufWriter::new(file);
        self.render_report(&mut w, elapsed, exec_counts, spots)
            .map_err(report)
    }

    fn render_report(
        &self,
        w: &mut impl Write,
        elapsed: f64,
        exec_counts: &[u64],
        spots: &[HotSpot],
    ) -> std::io::Result<()> {
        writeln!(w, "SUBLEQ VM Lightweight Profiler Report")?;
        writeln!(w, "=====================================")?;
        writeln!(w, "Execution time: {:.3} seconds", elapsed)?;
        writeln!(w, "Total instructions: {}", self.total_instructions)?;
        writeln!(w, "Memory accesses: {}", self.memory_accesses)?;
        let per_second = if elapsed > 0.0 {
            self.total_instructions as f64 / elapsed
        } else {
            0.0
        };
        writeln!(w, "Instructions per second: {:.0}", per_second)?;

        let total_ops: u64 = exec_counts.iter().sum();
        writeln!(w, "\nInstruction Mix:")?;
        for op in Opcode::ALL {
            let count = exec_counts[op.index()];
            if count > 0 {
                let pct = if total_ops > 0 {
                    100.0 * count as f64 / total_ops as f64
                } else {
                    0.0
                };
                writeln!(w, "  {:<8}: {:>12} ({:>6.2}%)", op.name(), count, pct)?;
            }
        }

        if !spots.is_empty() {
            writeln!(
                w,
                "\nHot Spots (PC addresses with highest execution counts):"
            )?;
            for spot in spots {
                let pct = if self.total_instructions > 0 {
                    100.0 * spot.count as f64 / self.total_instructions as f64
                } else {
                    0.0
                };
                writeln!(
                    w,
                    "  PC {:>6}: {:>10} executions ({:>5.1}%) [{}]",
                    spot.pc,
                    spot.count,
                    pct,
                    spot.opcode.name()
                )?;
            }
        }
        Ok(())
    }
}

/// Diagnostic-stream rendering of the profiler state.
pub struct ProfilerSummary<'a> {
    profiler: &'a Profiler,
    elapsed: f64,
    spots: &'a [HotSpot],
}

impl fmt::Display for ProfilerSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prof = self.profiler;
        writeln!(f, "\n=== Lightweight Profiler Report ===")?;
        writeln!(
            f,
            "Total instructions executed: {}",
            prof.total_instructions
        )?;
        writeln!(f, "Memory accesses: {}", prof.memory_accesses)?;
        let per_second = if self.elapsed > 0.0 {
            prof.total_instructions as f64 / self.elapsed
        } else {
            0.0
        };
        writeln!(f, "Instructions per second: {:.0}", per_second)?;
        if prof.total_instructions > 0 {
            writeln!(
                f,
                "Memory accesses per instruction: {:.2}",
                prof.memory_accesses as f64 / prof.total_instructions as f64
            )?;
        }

        if !self.spots.is_empty() {
            let shown = self.spots.len().min(10);
            writeln!(f, "\nTop {} Hot Spots:", shown)?;
            writeln!(f, "    PC   | Exec Count |   %   | Opcode")?;
            writeln!(f, "---------|------------|-------|-------")?;
            for spot in &self.spots[..shown] {
                let pct = if prof.total_instructions > 0 {
                    100.0 * spot.count as f64 / prof.total_instructions as f64
                } else {
                    0.0
                };
                writeln!(
                    f,
                    " {:>6}  | {:>10} | {:>5.1} | {:<6}",
                    spot.pc,
                    spot.count,
                    pct,
                    spot.opcode.name()
                )?;
            }
        }
        Ok(())
    }
}
