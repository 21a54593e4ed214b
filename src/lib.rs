//! gbcds: gene coordinates and coding-region coverage from GenBank records.
//!
//! A `GBSeq` XML record is read line by line by an annotation state machine
//! ([`parser::AnnotationMachine`]) that recovers the genome identity, each
//! gene's coordinate range(s) and name, and marks those ranges in a
//! per-genome [`coverage::CoverageMap`]. Results go to a
//! [`output::RecordEmitter`]; the batch driver in [`batch`] wires retrieval,
//! processing and persistence together for a list of accessions.
//!
//! # Example
//!
//! ```
//! use gbcds::config::MarkerSet;
//! use gbcds::parser::process_lines;
//! use gbcds::types::RecordEvent;
//!
//! let record = "<GBSeq_locus>NC_1</GBSeq_locus>
//! <GBSeq_length>100</GBSeq_length>
//! <GBSeq_definition>Example genome</GBSeq_definition>
//! <GBFeature_key>gene</GBFeature_key>
//! <GBFeature_location>10..20</GBFeature_location>
//! <GBQualifier_name>gene</GBQualifier_name>
//! <GBQualifier_value>nad1</GBQualifier_value>";
//!
//! let mut events: Vec<RecordEvent> = Vec::new();
//! let summary = process_lines(record.lines(), &MarkerSet::gbseq(), &mut events).unwrap();
//! assert_eq!(summary.covered, 11);
//! assert_eq!(summary.percentage_display(), "11.0");
//! ```

pub mod batch;
pub mod config;
pub mod coverage;
pub mod error;
pub mod extract;
pub mod fetch;
#[cfg(test)]
mod http_stub;
pub mod output;
pub mod parser;
pub mod types;

pub use error::CdsError;
