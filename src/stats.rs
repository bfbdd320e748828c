//! End-of-run statistics table.
//!
//! One row per extended opcode: how many addresses the optimizer claimed
//! for it, how many times it was dispatched, and its share of all
//! dispatched instructions. The SUBLEQ row is always shown; other rows
//! appear only once the opcode was substituted or executed.

use std::fmt;

use crate::isa::{Opcode, OPCODE_COUNT};

const DIVIDER: &str = "+--------+---------------+--------------+----------+";

/// Borrowed view over the substitution and execution counters, rendered
/// as the statistics table.
pub struct StatsReport<'a> {
    matches: &'a [u64; OPCODE_COUNT],
    exec_counts: &'a [u64; OPCODE_COUNT],
    elapsed: f64,
}

impl<'a> StatsReport<'a> {
    pub fn new(
        matches: &'a [u64; OPCODE_COUNT],
        exec_counts: &'a [u64; OPCODE_COUNT],
        elapsed: f64,
    ) -> Self {
        Self {
            matches,
            exec_counts,
            elapsed,
        }
    }

    fn total_ops(&self) -> u64 {
        self.exec_counts.iter().sum()
    }

    /// Substitutions exclude the SUBLEQ fallback rows.
    fn total_substitutions(&self) -> u64 {
        Opcode::ALL
            .iter()
            .filter(|op| **op != Opcode::Subleq)
            .map(|op| self.matches[op.index()])
            .sum()
    }
}

impl fmt::Display for StatsReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_ops = self.total_ops();
        let pct = |count: u64| {
            if total_ops > 0 {
                100.0 * count as f64 / total_ops as f64
            } else {
                0.0
            }
        };

        writeln!(f, "{}", DIVIDER)?;
        writeln!(f, "| Instr. | Substitutions | Instr. count | Instr. % |")?;
        writeln!(f, "{}", DIVIDER)?;
        for op in Opcode::ALL {
            let matches = self.matches[op.index()];
            let execs = self.exec_counts[op.index()];
            if op != Opcode::Subleq && matches == 0 && execs == 0 {
                continue;
            }
            writeln!(
                f,
                "| {:<6} | {:>13} | {:>12} | {:>7.1}% |",
                op.name(),
                matches,
                execs,
                pct(execs)
            )?;
        }
        writeln!(f, "{}", DIVIDER)?;
        writeln!(
            f,
            "| Totals | {:>13} | {:>12} |          |",
            self.total_substitutions(),
            total_ops
        )?;
        writeln!(f, "{}", DIVIDER)?;
        writeln!(
            f,
            "|         Execution time {:.3} seconds             |",
            self.elapsed
        )?;
        writeln!(f, "{}", DIVIDER)
    }
}
