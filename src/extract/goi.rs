//! Genes of interest from a GFF annotation and its FASTA sequence.
//!
//! Every GFF row with the nine standard columns and a `Name=` attribute is
//! considered; rows whose name starts with one of the genes of interest are
//! cut out of the genome sequence and written as FASTA.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::CdsError;
use crate::extract::write_atomically;

/// Mitochondrial genes extracted when no list is given.
pub const DEFAULT_GENES_OF_INTEREST: [&str; 17] = [
    "rrnL", "rps3", "nad2", "nad3", "atp9", "cox2", "nad4l", "nad5", "cob", "cox1", "nad1",
    "nad4", "atp8", "atp6", "rrnS", "cox3", "nad6",
];

/// A named feature row of a GFF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GffFeature {
    pub name: String,
    pub start: u64,
    pub end: u64,
}

/// Concatenate the sequence lines of a FASTA file, skipping header lines.
pub fn read_fasta_sequence<R: BufRead>(reader: R) -> Result<String> {
    let mut sequence = String::new();
    for line_result in reader.lines() {
        let line = line_result.context("Failed to read FASTA line")?;
        if line.contains('>') {
            continue;
        }
        sequence.push_str(line.trim());
    }
    Ok(sequence)
}

/// Parse the named features of a GFF file.
pub fn parse_gff_features<R: BufRead>(reader: R) -> Result<Vec<GffFeature>> {
    let mut features = Vec::new();

    for line_result in reader.lines() {
        let line = line_result.context("Failed to read GFF line")?;

        if line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 9 {
            continue;
        }

        let (Ok(start), Ok(end)) = (fields[3].parse::<u64>(), fields[4].parse::<u64>()) else {
            log::debug!("Skipping GFF row with unparseable coordinates: {}", line);
            continue;
        };

        let Some(name) = attribute(fields[8], "Name") else {
            continue;
        };

        features.push(GffFeature {
            name: name.to_string(),
            start,
            end,
        });
    }

    Ok(features)
}

/// Value of a `key=value` attribute in a GFF attribute column.
fn attribute<'a>(attributes: &'a str, key: &str) -> Option<&'a str> {
    attributes
        .trim()
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim())
}

/// The 1-based inclusive slice `start..=end` of a sequence.
pub fn slice_sequence(sequence: &str, start: u64, end: u64) -> Result<&str, CdsError> {
    let out_of_bounds = || CdsError::RangeOutOfBounds {
        start,
        end,
        length: sequence.len() as u64,
    };
    if start == 0 || start > end {
        return Err(out_of_bounds());
    }
    sequence
        .get((start - 1) as usize..end as usize)
        .ok_or_else(out_of_bounds)
}

/// Whether a feature name starts with one of the genes of interest.
pub fn is_of_interest(name: &str, genes: &[String]) -> bool {
    genes.iter().any(|gene| name.starts_with(gene.as_str()))
}

/// Write every feature of interest as FASTA. Returns the number written.
pub fn write_genes_of_interest<W: Write + ?Sized>(
    features: &[GffFeature],
    sequence: &str,
    genes: &[String],
    writer: &mut W,
) -> Result<usize> {
    let mut written = 0;
    for feature in features.iter().filter(|f| is_of_interest(&f.name, genes)) {
        let bases = slice_sequence(sequence, feature.start, feature.end)
            .with_context(|| format!("Gene {} does not fit the sequence", feature.name))?;
        writeln!(writer, ">{}\n{}\n", feature.name, bases)?;
        written += 1;
    }
    Ok(written)
}

/// Extract the genes of interest of a GFF/FASTA pair into `output`.
pub fn extract_genes_of_interest(
    gff: &Path,
    fasta: &Path,
    genes: &[String],
    output: &Path,
) -> Result<usize> {
    let fasta_file = File::open(fasta).context("Failed to open FASTA file")?;
    let sequence = read_fasta_sequence(BufReader::new(fasta_file))?;

    let gff_file = File::open(gff).context("Failed to open GFF file")?;
    let features = parse_gff_features(BufReader::new(gff_file))?;
    log::info!(
        "{} named features, genome of {} bp",
        features.len(),
        sequence.len()
    );

    let mut written = 0;
    write_atomically(output, |w| {
        written = write_genes_of_interest(&features, &sequence, genes, w)?;
        Ok(())
    })?;
    Ok(written)
}
