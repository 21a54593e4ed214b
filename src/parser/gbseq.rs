//! Annotation state machine over a `GBSeq` XML record.
//!
//! The record is not parsed as XML. Each line is checked for the single
//! marker expected by the current [`RecognitionState`]; lines that do not
//! carry it are skipped. The states advance in a fixed order:
//!
//! ```text
//! AwaitLocus -> AwaitLength -> AwaitDefinition -> AwaitGeneKey
//!     -> AwaitLocation -> AwaitQualifierName -> AwaitQualifierValue
//!                 ^                                     |
//!                 +-------------------------------------+
//! ```
//!
//! `AwaitQualifierValue -> AwaitGeneKey` is the only back edge, taken after
//! each gene is emitted. The cycle assumes every gene block carries its
//! location followed by a qualifier whose value is the gene name.

use std::io::BufRead;

use crate::config::MarkerSet;
use crate::coverage::CoverageMap;
use crate::error::{CdsError, Result};
use crate::output::RecordEmitter;
use crate::parser::location::parse_location;
use crate::types::{CoordinateRange, CoverageSummary, GeneAnnotation, GenomeHeader};

/// Position of the recognition cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecognitionState {
    AwaitLocus,
    AwaitLength,
    AwaitDefinition,
    AwaitGeneKey,
    AwaitLocation,
    AwaitQualifierName,
    AwaitQualifierValue,
}

impl RecognitionState {
    /// All states in recognition order.
    pub const ALL: [RecognitionState; 7] = [
        RecognitionState::AwaitLocus,
        RecognitionState::AwaitLength,
        RecognitionState::AwaitDefinition,
        RecognitionState::AwaitGeneKey,
        RecognitionState::AwaitLocation,
        RecognitionState::AwaitQualifierName,
        RecognitionState::AwaitQualifierValue,
    ];

    /// Transition taken when the state's marker is found.
    pub fn next(self) -> Self {
        match self {
            RecognitionState::AwaitLocus => RecognitionState::AwaitLength,
            RecognitionState::AwaitLength => RecognitionState::AwaitDefinition,
            RecognitionState::AwaitDefinition => RecognitionState::AwaitGeneKey,
            RecognitionState::AwaitGeneKey => RecognitionState::AwaitLocation,
            RecognitionState::AwaitLocation => RecognitionState::AwaitQualifierName,
            RecognitionState::AwaitQualifierName => RecognitionState::AwaitQualifierValue,
            RecognitionState::AwaitQualifierValue => RecognitionState::AwaitGeneKey,
        }
    }

    /// Ordinal of the state (0 to 6).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Marker that has to be present on a line for this state to fire.
    pub fn marker(self, markers: &MarkerSet) -> &str {
        match self {
            RecognitionState::AwaitLocus => &markers.locus,
            RecognitionState::AwaitLength => &markers.length,
            RecognitionState::AwaitDefinition => &markers.definition,
            RecognitionState::AwaitGeneKey => &markers.gene_key,
            RecognitionState::AwaitLocation => &markers.location,
            RecognitionState::AwaitQualifierName => &markers.qualifier_name,
            RecognitionState::AwaitQualifierValue => &markers.qualifier_value,
        }
    }

    /// Whether the genome length is known once this state is reached.
    pub fn has_length(self) -> bool {
        self > RecognitionState::AwaitLength
    }
}

/// Per-record processing context.
///
/// Owns the cursor, the ranges of the gene being assembled and the coverage
/// map. Built fresh for every record and consumed by [`finish`].
///
/// [`finish`]: AnnotationMachine::finish
pub struct AnnotationMachine<'m> {
    markers: &'m MarkerSet,
    value_close: String,
    state: RecognitionState,
    accession_id: String,
    coverage: Option<CoverageMap>,
    pending: Vec<CoordinateRange>,
    genes: usize,
}

impl<'m> AnnotationMachine<'m> {
    pub fn new(markers: &'m MarkerSet) -> Self {
        AnnotationMachine {
            markers,
            value_close: markers.qualifier_value_close(),
            state: RecognitionState::AwaitLocus,
            accession_id: String::new(),
            coverage: None,
            pending: Vec::new(),
            genes: 0,
        }
    }

    /// Current cursor position.
    pub fn state(&self) -> RecognitionState {
        self.state
    }

    /// Number of genes emitted so far.
    pub fn genes(&self) -> usize {
        self.genes
    }

    /// Ranges collected for the gene currently being assembled.
    pub fn pending(&self) -> &[CoordinateRange] {
        &self.pending
    }

    /// Positions covered so far (0 before the length is known).
    pub fn covered(&self) -> u64 {
        self.coverage.as_ref().map_or(0, |c| c.covered())
    }

    /// Consume one line.
    pub fn feed<E: RecordEmitter + ?Sized>(&mut self, line: &str, emitter: &mut E) -> Result<()> {
        let marker = self.state.marker(self.markers);
        let Some(found) = line.find(marker) else {
            if !self.state.has_length() {
                if line.contains(self.markers.gene_key.as_str()) {
                    return Err(CdsError::MissingLength("the first gene feature"));
                }
                if line.contains(self.markers.location.as_str()) {
                    return Err(CdsError::MissingLength("the first feature location"));
                }
            }
            return Ok(());
        };
        let after = found + marker.len();

        match self.state {
            RecognitionState::AwaitLocus => {
                self.accession_id = tag_text(line, after).to_string();
            }
            RecognitionState::AwaitLength => {
                let text = tag_text(line, after).trim();
                let length: u64 = text
                    .parse()
                    .map_err(|_| CdsError::InvalidLength(text.to_string()))?;
                if length == 0 {
                    return Err(CdsError::InvalidLength(text.to_string()));
                }
                self.coverage = Some(CoverageMap::new(length)?);
            }
            RecognitionState::AwaitDefinition => {
                let description = tag_text(line, after).to_string();
                let length = self.length()?;
                emitter.header(&GenomeHeader::new(
                    self.accession_id.clone(),
                    length,
                    description,
                ))?;
            }
            RecognitionState::AwaitGeneKey => {}
            RecognitionState::AwaitLocation => {
                self.pending.extend(parse_location(line)?);
            }
            RecognitionState::AwaitQualifierName => {}
            RecognitionState::AwaitQualifierValue => {
                let name = match line[after..].find(self.value_close.as_str()) {
                    Some(end) => &line[after..after + end],
                    None => tag_text(line, after),
                };
                self.complete_gene(name.to_string(), emitter)?;
            }
        }

        self.state = self.state.next();
        Ok(())
    }

    fn length(&self) -> Result<u64> {
        self.coverage
            .as_ref()
            .map(|c| c.length())
            .ok_or(CdsError::MissingLength("the genome description"))
    }

    fn complete_gene<E: RecordEmitter + ?Sized>(&mut self, name: String, emitter: &mut E) -> Result<()> {
        let coverage = self
            .coverage
            .as_mut()
            .ok_or(CdsError::MissingLength("a gene name"))?;

        if name.is_empty() {
            log::warn!(
                "{}: gene at {:?} has an empty name",
                self.accession_id,
                self.pending
            );
        }

        for range in &self.pending {
            coverage.mark(range)?;
        }

        let gene = GeneAnnotation::new(name, std::mem::take(&mut self.pending));
        emitter.gene(&gene)?;
        self.genes += 1;
        Ok(())
    }

    /// End of input: emit and return the coverage totals.
    pub fn finish<E: RecordEmitter + ?Sized>(self, emitter: &mut E) -> Result<CoverageSummary> {
        let coverage = self
            .coverage
            .ok_or(CdsError::MissingLength("the end of the record"))?;

        if !self.pending.is_empty() {
            log::debug!(
                "{}: record ended with {} unnamed range(s)",
                self.accession_id,
                self.pending.len()
            );
        }

        let summary = coverage.finalize();
        emitter.summary(&summary)?;
        Ok(summary)
    }
}

/// Text following a marker up to the next tag, or the end of the line.
fn tag_text(line: &str, after: usize) -> &str {
    match line[after..].find('<') {
        Some(offset) => &line[after..after + offset],
        None => &line[after..],
    }
}

/// Run the state machine over every line of a record.
pub fn process_lines<I, S, E>(lines: I, markers: &MarkerSet, emitter: &mut E) -> Result<CoverageSummary>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    E: RecordEmitter + ?Sized,
{
    let mut machine = AnnotationMachine::new(markers);
    for line in lines {
        machine.feed(line.as_ref(), emitter)?;
    }
    machine.finish(emitter)
}

/// Run the state machine over a reader, line by line.
pub fn process_reader<R, E>(reader: R, markers: &MarkerSet, emitter: &mut E) -> Result<CoverageSummary>
where
    R: BufRead,
    E: RecordEmitter + ?Sized,
{
    let mut machine = AnnotationMachine::new(markers);
    for line in reader.lines() {
        machine.feed(&line?, emitter)?;
    }
    machine.finish(emitter)
}
