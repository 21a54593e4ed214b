//! CLI entry point for gbcds.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use gbcds::batch::{read_accessions, run_batch, run_downloads};
use gbcds::config::Config;
use gbcds::extract::derived_output;
use gbcds::extract::goi::{extract_genes_of_interest, DEFAULT_GENES_OF_INTEREST};
use gbcds::extract::mfannot::extract_uorfs_from_report;
use gbcds::fetch::{EutilsClient, LocalXmlSource, RecordSource, SviewerClient};

/// Gene coordinates and coding-region coverage from GenBank records.
#[derive(Parser, Debug)]
#[command(name = "gbcds")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write gene coordinates and CDS coverage for a list of accessions
    Cds {
        /// Accession list, one identifier per line
        #[arg(short = 'i', long = "ids")]
        ids: PathBuf,

        /// Output directory for .cds and .xml files
        #[arg(short = 'o', long = "out", default_value = ".")]
        out: PathBuf,

        /// Read <accession>.xml[.gz] records from this directory instead of NCBI
        #[arg(short = 'l', long = "local")]
        local: Option<PathBuf>,

        /// Worker threads (0 = all cores)
        #[arg(short = 't', long = "threads", default_value = "1")]
        threads: usize,

        /// HTTP timeout in seconds
        #[arg(long = "timeout", default_value = "60")]
        timeout: u64,

        /// Do not keep a copy of the raw XML record
        #[arg(long = "no-xml")]
        no_xml: bool,

        /// E-utilities base URL
        #[arg(long = "eutils-base")]
        eutils_base: Option<String>,
    },

    /// Extract genes of interest from a GFF file and its FASTA sequence
    Goi {
        /// GFF annotation file
        #[arg(short = 'g', long = "gff")]
        gff: PathBuf,

        /// FASTA sequence file
        #[arg(short = 'f', long = "fasta")]
        fasta: PathBuf,

        /// Gene name prefixes (comma-separated)
        #[arg(long = "genes", value_delimiter = ',')]
        genes: Vec<String>,

        /// Output FASTA (default: <gff stem>_GOI.fasta)
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
    },

    /// Extract uORF sequences from an Mfannot report
    Uorfs {
        /// Mfannot report
        #[arg(short = 'i', long = "input")]
        input: PathBuf,

        /// Output file (default: <input stem>.uORFs)
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
    },

    /// Download GFF3 and FASTA files for a list of accessions
    FetchGff {
        /// Accession list, one identifier per line
        #[arg(short = 'i', long = "ids")]
        ids: PathBuf,

        /// Output directory (one folder per accession)
        #[arg(short = 'o', long = "out", default_value = ".")]
        out: PathBuf,

        /// HTTP timeout in seconds
        #[arg(long = "timeout", default_value = "60")]
        timeout: u64,

        /// Sequence viewer URL
        #[arg(long = "sviewer-base")]
        sviewer_base: Option<String>,
    },
}

fn init_logging() {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
}

fn report_empty(empty: &[&str]) {
    if !empty.is_empty() {
        log::warn!(
            "The following IDs returned an empty result:\n{}\nCheck these IDs and try again",
            empty.join("\n")
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Command::Cds {
            ids,
            out,
            local,
            threads,
            timeout,
            no_xml,
            eutils_base,
        } => {
            if !ids.exists() {
                bail!("Accession list not found: {}", ids.display());
            }

            let mut config = Config::new();
            config.output_dir = out;
            config.threads = threads;
            config.timeout_secs = timeout;
            config.write_xml = !no_xml;
            if let Some(base) = eutils_base {
                config.set_eutils_base(&base);
            }

            let accessions = read_accessions(&ids)?;
            log::info!("{} accession(s) to process", accessions.len());

            let source: Box<dyn RecordSource> = match local {
                Some(dir) => {
                    if !dir.is_dir() {
                        bail!("Local record directory not found: {}", dir.display());
                    }
                    Box::new(LocalXmlSource::new(&dir))
                }
                None => Box::new(EutilsClient::new(&config).context("Failed to build HTTP client")?),
            };

            let report = run_batch(&accessions, source.as_ref(), &config)?;
            log::info!(
                "Done: {} written, {} failed, {} empty",
                report.written(),
                report.failed(),
                report.empty_accessions().len()
            );
            report_empty(&report.empty_accessions());

            if report.written() == 0 && report.failed() > 0 {
                bail!("No record could be processed");
            }
        }

        Command::Goi {
            gff,
            fasta,
            genes,
            out,
        } => {
            if !gff.exists() {
                bail!("GFF file not found: {}", gff.display());
            }
            if !fasta.exists() {
                bail!("FASTA file not found: {}", fasta.display());
            }

            let genes = if genes.is_empty() {
                DEFAULT_GENES_OF_INTEREST.iter().map(|g| g.to_string()).collect()
            } else {
                genes
            };
            let output = out.unwrap_or_else(|| derived_output(&gff, "_GOI.fasta"));

            let written = extract_genes_of_interest(&gff, &fasta, &genes, &output)?;
            log::info!("{} gene(s) saved in: {}", written, output.display());
        }

        Command::Uorfs { input, out } => {
            if !input.exists() {
                bail!("Mfannot report not found: {}", input.display());
            }
            let output = out.unwrap_or_else(|| derived_output(&input, ".uORFs"));

            let written = extract_uorfs_from_report(&input, &output)?;
            log::info!("{} uORF(s) saved in: {}", written, output.display());
        }

        Command::FetchGff {
            ids,
            out,
            timeout,
            sviewer_base,
        } => {
            if !ids.exists() {
                bail!("Accession list not found: {}", ids.display());
            }

            let mut config = Config::new();
            config.timeout_secs = timeout;
            if let Some(base) = sviewer_base {
                config.sviewer_base = base;
            }

            let accessions = read_accessions(&ids)?;
            let client = SviewerClient::new(&config).context("Failed to build HTTP client")?;
            let empty = run_downloads(&accessions, &client, &out)?;
            let empty: Vec<&str> = empty.iter().map(|s| s.as_str()).collect();
            report_empty(&empty);
        }
    }

    Ok(())
}
