//! Core data structures for gbcds.
//!
//! This module contains the values that flow from the annotation state
//! machine to the record emitters.

use std::fmt;

/// An inclusive, 1-based nucleotide range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinateRange {
    pub start: u64,
    pub end: u64,
}

impl CoordinateRange {
    /// Create a new range. Callers are expected to have checked `start <= end`.
    pub fn new(start: u64, end: u64) -> Self {
        CoordinateRange { start, end }
    }

    /// Get range length (end - start + 1).
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Render the range the way it is persisted (`start;end`).
    pub fn to_record(&self) -> String {
        format!("{};{}", self.start, self.end)
    }
}

impl fmt::Display for CoordinateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A gene resolved by one full recognition cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneAnnotation {
    pub name: String,
    /// One range, or two when the location was a join.
    pub ranges: Vec<CoordinateRange>,
}

impl GeneAnnotation {
    /// Create a new gene annotation.
    pub fn new(name: String, ranges: Vec<CoordinateRange>) -> Self {
        GeneAnnotation { name, ranges }
    }

    /// Whether the gene was assembled from more than one segment.
    pub fn is_joined(&self) -> bool {
        self.ranges.len() > 1
    }

    /// Number of positions attributed to the gene, counting overlaps between
    /// its own segments twice.
    pub fn span(&self) -> u64 {
        self.ranges.iter().map(|r| r.length()).sum()
    }
}

/// Identity of the genome record, emitted once the description is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomeHeader {
    pub accession_id: String,
    pub length: u64,
    pub description: String,
}

impl GenomeHeader {
    /// Create a new header.
    pub fn new(accession_id: String, length: u64, description: String) -> Self {
        GenomeHeader {
            accession_id,
            length,
            description,
        }
    }
}

/// Final coverage totals of one genome record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageSummary {
    pub covered: u64,
    pub length: u64,
}

impl CoverageSummary {
    /// Create a new summary.
    pub fn new(covered: u64, length: u64) -> Self {
        CoverageSummary { covered, length }
    }

    /// Percentage of covered positions.
    pub fn percentage(&self) -> f64 {
        if self.length == 0 {
            return 0.0;
        }
        self.covered as f64 * 100.0 / self.length as f64
    }

    /// Percentage rounded to two decimals, written with at least one
    /// fractional digit and no trailing zeros beyond it (`11.0`, `12.5`,
    /// `33.33`).
    pub fn percentage_display(&self) -> String {
        format_percentage(self.percentage())
    }
}

/// Format a percentage rounded to two decimals in its shortest form.
pub fn format_percentage(value: f64) -> String {
    let mut text = format!("{:.2}", value);
    while text.ends_with('0') && !text.ends_with(".0") {
        text.pop();
    }
    text
}

/// Events handed to a record emitter, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordEvent {
    Header(GenomeHeader),
    Gene(GeneAnnotation),
    Summary(CoverageSummary),
}
