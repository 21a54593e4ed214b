//! Record emitters.
//!
//! The annotation state machine reports a header, then each gene, then one
//! summary. Emitters decide how those events are rendered: the persisted
//! `.cds` layout, a human-readable progress log, or an in-memory list.

use std::io::{self, Write};

use crate::types::{CoordinateRange, CoverageSummary, GeneAnnotation, GenomeHeader, RecordEvent};

/// Receiver of the events produced for one genome record.
pub trait RecordEmitter {
    fn header(&mut self, header: &GenomeHeader) -> io::Result<()>;
    fn gene(&mut self, gene: &GeneAnnotation) -> io::Result<()>;
    fn summary(&mut self, summary: &CoverageSummary) -> io::Result<()>;
}

/// Writes the `.cds` record layout.
pub struct CdsWriter<W: Write> {
    writer: W,
}

impl<W: Write> CdsWriter<W> {
    pub fn new(writer: W) -> Self {
        CdsWriter { writer }
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> RecordEmitter for CdsWriter<W> {
    fn header(&mut self, header: &GenomeHeader) -> io::Result<()> {
        writeln!(self.writer, "{}", header.description)?;
        writeln!(self.writer, "Genome ID: {}", header.accession_id)?;
        writeln!(self.writer, "Genome size: {}", header.length)?;
        writeln!(self.writer, "Genes:")
    }

    fn gene(&mut self, gene: &GeneAnnotation) -> io::Result<()> {
        for range in &gene.ranges {
            writeln!(self.writer, "{}#{}", range.to_record(), gene.name)?;
        }
        Ok(())
    }

    fn summary(&mut self, summary: &CoverageSummary) -> io::Result<()> {
        writeln!(
            self.writer,
            "Sum of nucleotides in the coding regions (CDS) of the genome: {} of {} nucleotides ({}%)",
            summary.covered,
            summary.length,
            summary.percentage_display()
        )
    }
}

/// Human-readable progress through the `log` facade.
#[derive(Debug, Default)]
pub struct ProgressLog {
    accession: String,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress line for one range, tagged with the record's accession so
    /// lines from concurrent records can be told apart.
    pub fn range_line(&self, range: &CoordinateRange, name: &str) -> String {
        format!("{}\t{}\t{} ({})", self.accession, range.start, range.end, name)
    }
}

impl RecordEmitter for ProgressLog {
    fn header(&mut self, header: &GenomeHeader) -> io::Result<()> {
        self.accession = header.accession_id.clone();
        log::info!("{}", header.description);
        log::info!("Genome ID: {}", header.accession_id);
        log::info!("Genome size: {}", header.length);
        Ok(())
    }

    fn gene(&mut self, gene: &GeneAnnotation) -> io::Result<()> {
        for range in &gene.ranges {
            log::info!("{}", self.range_line(range, &gene.name));
        }
        if gene.is_joined() {
            log::debug!(
                "{}: {} has a joined location, {} nt in total",
                self.accession,
                gene.name,
                gene.span()
            );
        }
        Ok(())
    }

    fn summary(&mut self, summary: &CoverageSummary) -> io::Result<()> {
        log::info!(
            "Sum of nucleotides in the coding regions (CDS) of the genome ID= {}: {} of {} nucleotides ({}%)",
            self.accession,
            summary.covered,
            summary.length,
            summary.percentage_display()
        );
        Ok(())
    }
}

/// Collects events in memory.
impl RecordEmitter for Vec<RecordEvent> {
    fn header(&mut self, header: &GenomeHeader) -> io::Result<()> {
        self.push(RecordEvent::Header(header.clone()));
        Ok(())
    }

    fn gene(&mut self, gene: &GeneAnnotation) -> io::Result<()> {
        self.push(RecordEvent::Gene(gene.clone()));
        Ok(())
    }

    fn summary(&mut self, summary: &CoverageSummary) -> io::Result<()> {
        self.push(RecordEvent::Summary(*summary));
        Ok(())
    }
}

/// Forwards every event to two emitters, first `A` then `B`.
pub struct Tee<A, B> {
    pub first: A,
    pub second: B,
}

impl<A: RecordEmitter, B: RecordEmitter> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Tee { first, second }
    }
}

impl<A: RecordEmitter, B: RecordEmitter> RecordEmitter for Tee<A, B> {
    fn header(&mut self, header: &GenomeHeader) -> io::Result<()> {
        self.first.header(header)?;
        self.second.header(header)
    }

    fn gene(&mut self, gene: &GeneAnnotation) -> io::Result<()> {
        self.first.gene(gene)?;
        self.second.gene(gene)
    }

    fn summary(&mut self, summary: &CoverageSummary) -> io::Result<()> {
        self.first.summary(summary)?;
        self.second.summary(summary)
    }
}
