//! Unassigned ORFs (uORFs) from an Mfannot annotation report.
//!
//! The report lists the genes it added in a three-column block; ORF names
//! are picked from there. The sequence of each ORF sits between a
//! `<name> ==> start` line and a `<name> ==> end` line, one numbered
//! sequence chunk per line.

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::extract::write_atomically;

const REPORT_SIGNATURE: &str = "mfannot";
const GENE_LIST_START: &str = "List of genes added";
const GENE_LIST_END: &str = "end mfannot";
const BLOCK_START: &str = " ==> start";
const BLOCK_END: &str = " ==> end";

/// Fixed-width columns of the gene list block.
const NAME_COLUMNS: [(usize, usize); 3] = [(8, 29), (29, 50), (50, 70)];

/// One ORF block of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UorfRecord {
    pub name: String,
    pub start: String,
    pub end: Option<u64>,
    pub sequence: String,
}

impl UorfRecord {
    fn new(name: String) -> Self {
        UorfRecord {
            name,
            start: String::new(),
            end: None,
            sequence: String::new(),
        }
    }

    /// Write the record as `>name`, `+start`, `-end`, `@sequence`.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        let end = self.end.map(|e| e.to_string()).unwrap_or_default();
        writeln!(writer, ">{}", self.name)?;
        writeln!(writer, "+{}", self.start)?;
        writeln!(writer, "-{}", end)?;
        writeln!(writer, "@{}\n", self.sequence)
    }
}

/// Whether the first line identifies an Mfannot report.
pub fn is_mfannot_report(first_line: &str) -> bool {
    first_line.contains(REPORT_SIGNATURE)
}

fn column(line: &str, from: usize, to: usize) -> &str {
    let to = to.min(line.len());
    if from >= to {
        return "";
    }
    line.get(from..to).unwrap_or("").trim_end()
}

/// ORF names listed in the "genes added" block, in report order.
pub fn orf_names<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let mut names = Vec::new();
    let mut in_block = false;

    for line in lines.iter().map(|l| l.as_ref()) {
        if line.contains(GENE_LIST_START) {
            in_block = true;
        }
        if !in_block {
            continue;
        }
        if line.contains(GENE_LIST_END) {
            in_block = false;
            continue;
        }
        for (from, to) in NAME_COLUMNS {
            let name = column(line, from, to);
            if name.contains("orf") {
                names.push(name.to_string());
            }
        }
    }

    names
}

/// Whether `line` contains `-<name>` not followed by another name character.
fn mentions(line: &str, name: &str) -> bool {
    let needle = format!("-{}", name);
    line.match_indices(&needle).any(|(at, _)| {
        line[at + needle.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_ascii_alphanumeric() && c != '_')
    })
}

/// End of the number column: the first double space after column 2.
fn number_column_end(line: &str) -> Option<usize> {
    line.get(2..)?.find("  ").map(|i| i + 2)
}

/// Every block of the report belonging to the ORF `name`.
pub fn extract_uorf<S: AsRef<str>>(lines: &[S], name: &str) -> Vec<UorfRecord> {
    let mut records = Vec::new();
    let mut current: Option<UorfRecord> = None;

    for line in lines.iter().map(|l| l.as_ref()) {
        let named = mentions(line, name);

        if named {
            if let Some(at) = line.find(BLOCK_START) {
                let detailed = line.get(1..at).unwrap_or("").trim();
                current = Some(UorfRecord::new(detailed.to_string()));
                continue;
            }
        }

        let Some(record) = current.as_mut() else {
            continue;
        };
        let split = number_column_end(line);

        if record.start.is_empty() {
            if let Some(at) = split {
                record.start = line[..at].trim().to_string();
            }
        }

        let closes = named && line.contains(BLOCK_END);
        if !closes && !line.contains(';') {
            if let Some(at) = split {
                let chunk = line[at..].trim();
                record.sequence.push_str(chunk);
                if let Ok(position) = line[..at].trim().parse::<u64>() {
                    record.end = Some((position + chunk.len() as u64).saturating_sub(1));
                }
            }
        }

        if closes {
            if let Some(done) = current.take() {
                log::info!("{} {}..{:?}", done.name, done.start, done.end);
                records.push(done);
            }
        }
    }

    records
}

/// Every uORF block of a report, grouped by ORF name in list order.
pub fn extract_uorfs<S: AsRef<str>>(lines: &[S]) -> Vec<UorfRecord> {
    orf_names(lines)
        .iter()
        .flat_map(|name| extract_uorf(lines, name))
        .collect()
}

/// Read an Mfannot report and write its uORFs to `output`.
pub fn extract_uorfs_from_report(input: &Path, output: &Path) -> Result<usize> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read Mfannot report {}", input.display()))?;
    let lines: Vec<&str> = text.lines().collect();

    if !lines.first().is_some_and(|l| is_mfannot_report(l)) {
        bail!("The file is empty or is not a mfannot output file");
    }

    let records = extract_uorfs(&lines);
    write_atomically(output, |w| {
        for record in &records {
            record.write_to(w)?;
        }
        Ok(())
    })?;
    Ok(records.len())
}
