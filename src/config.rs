//! Run configuration.
//!
//! The CLI builds a [`Config`] with defaults and overrides fields from its
//! arguments before handing it to the batch driver.

use std::path::PathBuf;

/// Default NCBI E-utilities endpoint.
pub const DEFAULT_EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/";

/// Default NCBI sequence viewer endpoint used for GFF3/FASTA downloads.
pub const DEFAULT_SVIEWER_BASE: &str = "https://www.ncbi.nlm.nih.gov/sviewer/viewer.cgi";

/// Literal markers recognised, in order, by the annotation state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSet {
    pub locus: String,
    pub length: String,
    pub definition: String,
    pub gene_key: String,
    pub location: String,
    pub qualifier_name: String,
    pub qualifier_value: String,
}

impl MarkerSet {
    /// Markers of the NCBI `GBSeq` XML export.
    pub fn gbseq() -> Self {
        MarkerSet {
            locus: "<GBSeq_locus>".to_string(),
            length: "<GBSeq_length>".to_string(),
            definition: "<GBSeq_definition>".to_string(),
            gene_key: "<GBFeature_key>gene</GBFeature_key>".to_string(),
            location: "<GBFeature_location>".to_string(),
            qualifier_name: "<GBQualifier_name>".to_string(),
            qualifier_value: "<GBQualifier_value>".to_string(),
        }
    }

    /// Closing tag of the qualifier value marker (`<X>` becomes `</X>`).
    pub fn qualifier_value_close(&self) -> String {
        match self.qualifier_value.strip_prefix('<') {
            Some(rest) => format!("</{}", rest),
            None => self.qualifier_value.clone(),
        }
    }
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self::gbseq()
    }
}

/// Configuration for a CDS coverage run.
#[derive(Debug, Clone)]
pub struct Config {
    pub markers: MarkerSet,
    /// Directory receiving `<accession>.cds` and `<accession>.xml`.
    pub output_dir: PathBuf,
    pub eutils_base: String,
    /// Sequence viewer endpoint used for GFF3/FASTA downloads.
    pub sviewer_base: String,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Worker threads for batch processing (0 = all cores).
    pub threads: usize,
    /// Keep a copy of the raw record next to the `.cds` file.
    pub write_xml: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Config {
            markers: MarkerSet::gbseq(),
            output_dir: PathBuf::from("."),
            eutils_base: DEFAULT_EUTILS_BASE.to_string(),
            sviewer_base: DEFAULT_SVIEWER_BASE.to_string(),
            timeout_secs: 60,
            threads: 1,
            write_xml: true,
        }
    }

    /// Set the E-utilities base URL, making sure it ends with a slash.
    pub fn set_eutils_base(&mut self, base: &str) {
        self.eutils_base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
    }

    /// Number of worker threads to actually use.
    pub fn resolved_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }
}
