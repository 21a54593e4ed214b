//! Batch driver over a list of accessions.
//!
//! Each accession is retrieved, run through the annotation state machine and
//! persisted as `<accession>.cds` (plus `<accession>.xml` when enabled).
//! Output is staged in temporary files inside the output directory and only
//! renamed into place once the record is complete, so a record that fails
//! half way leaves nothing behind.

use ahash::AHashSet;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::Config;
use crate::error::CdsError;
use crate::extract::write_atomically;
use crate::fetch::{RecordSource, SviewerClient};
use crate::output::{CdsWriter, ProgressLog, Tee};
use crate::parser::AnnotationMachine;
use crate::types::CoverageSummary;

/// What happened to one accession.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Written {
        summary: CoverageSummary,
        genes: usize,
        cds_path: PathBuf,
    },
    /// The source had no data for the accession.
    Empty,
    Failed(String),
}

/// Outcomes of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: IndexMap<String, RecordOutcome>,
}

impl BatchReport {
    pub fn written(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, RecordOutcome::Written { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, RecordOutcome::Failed(_)))
            .count()
    }

    /// Accessions the source returned nothing for.
    pub fn empty_accessions(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| **o == RecordOutcome::Empty)
            .map(|(acc, _)| acc.as_str())
            .collect()
    }
}

/// Read an accession list file.
pub fn read_accessions(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open accession list {}", path.display()))?;
    parse_accessions(BufReader::new(file))
}

/// Parse accessions, one per line. Blank lines and `#` comments are
/// ignored and repeated accessions are kept once, at their first position.
pub fn parse_accessions<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut seen = AHashSet::new();
    let mut accessions = Vec::new();

    for line_result in reader.lines() {
        let line = line_result.context("Failed to read accession list")?;
        let accession = line.trim();

        if accession.is_empty() || accession.starts_with('#') {
            continue;
        }

        if !seen.insert(accession.to_string()) {
            log::warn!("Accession {} listed more than once, processing it once", accession);
            continue;
        }
        accessions.push(accession.to_string());
    }

    Ok(accessions)
}

/// Process one record already retrieved as text and persist its output.
///
/// Returns the coverage totals, the number of genes written and the path
/// of the `.cds` file.
pub fn process_record(
    accession: &str,
    text: &str,
    config: &Config,
) -> std::result::Result<(CoverageSummary, usize, PathBuf), CdsError> {
    let staged = NamedTempFile::new_in(&config.output_dir)?;
    let (summary, genes) = {
        let mut emitter = Tee::new(
            CdsWriter::new(BufWriter::new(staged.as_file())),
            ProgressLog::new(),
        );

        let mut machine = AnnotationMachine::new(&config.markers);
        for line in text.lines() {
            machine.feed(line, &mut emitter)?;
        }
        let genes = machine.genes();
        let summary = machine.finish(&mut emitter)?;
        let Tee { first, .. } = emitter;
        first.into_inner()?;
        (summary, genes)
    };

    let raw = if config.write_xml {
        let mut raw = NamedTempFile::new_in(&config.output_dir)?;
        {
            let mut writer = BufWriter::new(raw.as_file_mut());
            for line in text.lines() {
                writeln!(writer, "{}", line)?;
            }
            writer.flush()?;
        }
        Some(raw)
    } else {
        None
    };

    // Both files are staged; the .cds goes first and is rolled back if the
    // raw copy cannot be put in place.
    let cds_path = config.output_dir.join(format!("{}.cds", accession));
    persist(staged, &cds_path)?;

    if let Some(raw) = raw {
        let xml_path = config.output_dir.join(format!("{}.xml", accession));
        if let Err(e) = persist(raw, &xml_path) {
            let _ = std::fs::remove_file(&cds_path);
            return Err(e.into());
        }
    }
    Ok((summary, genes, cds_path))
}

fn persist(file: NamedTempFile, target: &Path) -> std::io::Result<()> {
    file.persist(target).map(|_| ()).map_err(|e| e.error)
}

/// Retrieve and process one accession, turning every error into an outcome.
pub fn run_record(accession: &str, source: &dyn RecordSource, config: &Config) -> RecordOutcome {
    log::info!("Querying ID: {}", accession);

    let text = match source.fetch(accession) {
        Ok(text) => text,
        Err(e) if e.is_empty_result() => {
            log::warn!("{}: empty result", accession);
            return RecordOutcome::Empty;
        }
        Err(e) => {
            log::error!("{}: {}", accession, e);
            return RecordOutcome::Failed(e.to_string());
        }
    };

    match process_record(accession, &text, config) {
        Ok((summary, genes, cds_path)) => RecordOutcome::Written {
            summary,
            genes,
            cds_path,
        },
        Err(e) => {
            log::error!("{}: {}", accession, e);
            RecordOutcome::Failed(e.to_string())
        }
    }
}

/// Process every accession, in parallel when more than one thread is
/// configured. Failures of single records do not stop the batch.
pub fn run_batch(
    accessions: &[String],
    source: &dyn RecordSource,
    config: &Config,
) -> Result<BatchReport> {
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.resolved_threads())
        .build()
        .context("Failed to build worker pool")?;

    let results: Vec<(String, RecordOutcome)> = pool.install(|| {
        accessions
            .par_iter()
            .map(|acc| (acc.clone(), run_record(acc, source, config)))
            .collect()
    });

    Ok(BatchReport {
        outcomes: results.into_iter().collect(),
    })
}

/// Download the GFF3 and FASTA reports of every accession into
/// `<out>/<accession>/`. Returns the accessions the viewer did not know.
pub fn run_downloads(
    accessions: &[String],
    client: &SviewerClient,
    output_dir: &Path,
) -> Result<Vec<String>> {
    let mut empty = Vec::new();

    for accession in accessions {
        log::info!("Querying ID: {}", accession);

        let reports = client
            .report(accession, "gff3")
            .and_then(|gff| Ok((gff, client.report(accession, "fasta")?)));

        let (gff, fasta) = match reports {
            Ok(reports) => reports,
            Err(e) if e.is_empty_result() => {
                log::warn!("{}: empty result", accession);
                empty.push(accession.clone());
                continue;
            }
            Err(e) => {
                log::error!("{}: {}", accession, e);
                continue;
            }
        };

        let folder = output_dir.join(accession);
        std::fs::create_dir_all(&folder)
            .with_context(|| format!("Failed to create {}", folder.display()))?;
        write_atomically(&folder.join(format!("{}.gff", accession)), |w| {
            w.write_all(gff.as_bytes())?;
            Ok(())
        })?;
        write_atomically(&folder.join(format!("{}.fasta", accession)), |w| {
            w.write_all(fasta.as_bytes())?;
            Ok(())
        })?;
    }

    Ok(empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::LocalXmlSource;

    const RECORD: &str = "<GBSeq_locus>NC_T1</GBSeq_locus>\n\
        <GBSeq_length>100</GBSeq_length>\n\
        <GBSeq_definition>Test genome</GBSeq_definition>\n\
        <GBFeature_key>gene</GBFeature_key>\n\
        <GBFeature_location>10..20</GBFeature_location>\n\
        <GBQualifier_name>gene</GBQualifier_name>\n\
        <GBQualifier_value>nad1</GBQualifier_value>\n";

    #[test]
    fn test_parse_accessions() {
        let list = "NC_1\n\n  NC_2  \n# comment\nNC_1\n";
        let accessions = parse_accessions(list.as_bytes()).unwrap();
        assert_eq!(accessions, vec!["NC_1".to_string(), "NC_2".to_string()]);
    }

    #[test]
    fn test_process_record_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::new();
        config.output_dir = dir.path().to_path_buf();

        let (summary, genes, cds_path) = process_record("NC_T1", RECORD, &config).unwrap();
        assert_eq!(summary, CoverageSummary::new(11, 100));
        assert_eq!(genes, 1);

        let cds = std::fs::read_to_string(cds_path).unwrap();
        assert!(cds.starts_with("Test genome\nGenome ID: NC_T1\n"));
        assert!(cds.contains("10;20#nad1\n"));
        assert!(dir.path().join("NC_T1.xml").exists());
    }

    #[test]
    fn test_process_record_without_xml() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::new();
        config.output_dir = dir.path().to_path_buf();
        config.write_xml = false;

        process_record("NC_T1", RECORD, &config).unwrap();
        assert!(!dir.path().join("NC_T1.xml").exists());
    }

    #[test]
    fn test_failed_record_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::new();
        config.output_dir = dir.path().to_path_buf();

        let bad = RECORD.replace("10..20", "10..200");
        assert!(process_record("NC_T1", &bad, &config).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_blocked_cds_target_leaves_no_xml() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::new();
        config.output_dir = dir.path().to_path_buf();
        std::fs::create_dir(dir.path().join("NC_T1.cds")).unwrap();

        assert!(process_record("NC_T1", RECORD, &config).is_err());
        assert!(!dir.path().join("NC_T1.xml").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_blocked_xml_target_rolls_back_cds() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::new();
        config.output_dir = dir.path().to_path_buf();
        std::fs::create_dir(dir.path().join("NC_T1.xml")).unwrap();

        assert!(process_record("NC_T1", RECORD, &config).is_err());
        assert!(!dir.path().join("NC_T1.cds").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_oversized_record_fails_alone() {
        let input = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("NC_OK.xml"), RECORD).unwrap();
        std::fs::write(
            input.path().join("NC_BIG.xml"),
            RECORD.replace(">100<", ">18446744073709551615<"),
        )
        .unwrap();
        std::fs::write(
            input.path().join("NC_HUGE.xml"),
            RECORD.replace(">100<", ">10000000000000000<"),
        )
        .unwrap();

        let output = tempfile::tempdir().unwrap();
        let mut config = Config::new();
        config.output_dir = output.path().to_path_buf();
        config.threads = 2;

        let accessions = vec![
            "NC_OK".to_string(),
            "NC_BIG".to_string(),
            "NC_HUGE".to_string(),
        ];
        let source = LocalXmlSource::new(input.path());
        let report = run_batch(&accessions, &source, &config).unwrap();

        assert_eq!(report.written(), 1);
        assert_eq!(report.failed(), 2);
        assert!(matches!(
            report.outcomes["NC_BIG"],
            RecordOutcome::Failed(ref msg) if msg.contains("Invalid genome length")
        ));
        assert!(output.path().join("NC_OK.cds").exists());
        assert!(!output.path().join("NC_BIG.cds").exists());
    }

    #[test]
    fn test_run_downloads_layout() {
        use crate::http_stub::{client, serve};

        let server = serve(vec![
            ("report=gff3&id=NC_1", "##gff-version 3\n".to_string()),
            ("report=fasta&id=NC_1", ">NC_1\nACGT\n".to_string()),
            ("id=NC_BAD", "Failed to understand id: NC_BAD".to_string()),
        ]);
        let viewer = SviewerClient::with_client(client(), &format!("{}viewer.cgi", server.base));
        let out = tempfile::tempdir().unwrap();

        let accessions = vec!["NC_1".to_string(), "NC_BAD".to_string()];
        let empty = run_downloads(&accessions, &viewer, out.path()).unwrap();

        assert_eq!(empty, vec!["NC_BAD".to_string()]);
        let folder = out.path().join("NC_1");
        assert_eq!(
            std::fs::read_to_string(folder.join("NC_1.gff")).unwrap(),
            "##gff-version 3\n"
        );
        assert_eq!(
            std::fs::read_to_string(folder.join("NC_1.fasta")).unwrap(),
            ">NC_1\nACGT\n"
        );
        assert!(!out.path().join("NC_BAD").exists());
    }

    #[test]
    fn test_run_batch_collects_outcomes() {
        let input = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("NC_T1.xml"), RECORD).unwrap();
        std::fs::write(
            input.path().join("NC_BAD.xml"),
            RECORD.replace("10..20", "20..10"),
        )
        .unwrap();

        let output = tempfile::tempdir().unwrap();
        let mut config = Config::new();
        config.output_dir = output.path().to_path_buf();
        config.threads = 2;

        let accessions = vec![
            "NC_T1".to_string(),
            "NC_MISSING".to_string(),
            "NC_BAD".to_string(),
        ];
        let source = LocalXmlSource::new(input.path());
        let report = run_batch(&accessions, &source, &config).unwrap();

        assert_eq!(report.written(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.empty_accessions(), vec!["NC_MISSING"]);
        let order: Vec<&str> = report.outcomes.keys().map(|k| k.as_str()).collect();
        assert_eq!(order, vec!["NC_T1", "NC_MISSING", "NC_BAD"]);
        assert!(output.path().join("NC_T1.cds").exists());
        assert!(!output.path().join("NC_BAD.cds").exists());
    }
}
