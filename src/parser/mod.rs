//! Parsers for GenBank record text.

pub mod gbseq;
pub mod location;

pub use gbseq::{process_lines, process_reader, AnnotationMachine, RecognitionState};
pub use location::parse_location;
