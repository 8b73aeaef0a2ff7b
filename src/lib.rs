//! DNA sequence analysis and multi-database gene identification.
//!
//! The crate detects open reading frames across all six reading frames,
//! characterizes their translated proteins, and queries protein/nucleotide
//! databases (local BLAST, NCBI, UniProt) to put names on the genes it finds.
//! Long inputs are processed in overlapping windows and merged back together.

pub mod chunker;
pub mod config;
pub mod error;
pub mod orf;
pub mod pipeline;
pub mod protein;
pub mod search;
pub mod sequence;

pub use config::AnalysisConfig;
pub use error::GeneScoutError;
pub use orf::{Orf, OrfFinder};
pub use pipeline::{GeneIdentificationResult, Pipeline, SequenceAnalysis};

pub fn about() -> String {
    format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
