//! All tunable thresholds and limits for the analysis pipeline.
//!
//! Components never read ambient state; callers construct an
//! [`AnalysisConfig`] (or take the default) and pass it down explicitly.

use serde::{Deserialize, Serialize};

pub const SWISSPROT_FASTA_URL: &str =
    "https://ftp.uniprot.org/pub/databases/uniprot/current_release/knowledgebase/complete/uniprot_sprot.fasta.gz";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // ORF detection
    pub min_orf_length: usize,
    /// Start codons recognized in addition to ATG, e.g. ["GTG", "TTG"].
    pub alternative_start_codons: Vec<String>,
    pub max_orfs_to_analyze: usize,
    pub max_orfs_for_database_search: usize,

    // Protein analysis
    pub min_protein_length: usize,
    /// Instability index below this is reported as "Stable".
    pub instability_stable_threshold: f64,
    /// GRAVY above this is reported as "Hydrophobic".
    pub hydrophobic_gravy_threshold: f64,

    // Sequence composition
    pub gc_low_threshold: f64,
    pub gc_high_threshold: f64,

    // Chunking
    pub chunk_size: usize,
    pub overlap_size: usize,
    /// Two ORFs whose start and end positions each differ by at most this
    /// many bases (same strand) are treated as the same ORF when combining
    /// chunk results.
    pub dedup_tolerance_bp: i64,

    // Search
    pub min_query_length: usize,
    pub default_max_results: usize,
    /// How many leading residues of a protein query are sent to keyword-style
    /// database searches (Entrez, UniProt).
    pub search_sequence_prefix: usize,
    pub search_nucleotide_prefix: usize,
    pub confidence_very_high: f64,
    pub confidence_high: f64,
    pub confidence_medium: f64,

    // Networking
    pub rate_limit_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_factor: f64,
    pub max_concurrent_requests: usize,

    // BLAST (shared by local and remote providers)
    pub blast_evalue_threshold: f64,
    pub blast_gap_costs: String,
    pub blast_protein_word_size: u32,
    pub blast_nucleotide_word_size: u32,
    pub blast_score_threshold: u32,
    pub blast_num_threads: u32,
    pub blast_database_dir: String,
    pub blast_database_name: String,
    pub swissprot_fasta_url: String,
    /// NCBI-side cap on remote BLAST hits, independent of the caller's
    /// max_results.
    pub blast_remote_max_results: usize,
    pub blast_poll_delay_secs: u64,
    pub blast_poll_max_attempts: u32,

    // Entrez
    pub ncbi_email: String,
    pub ncbi_api_key: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_orf_length: 300,
            alternative_start_codons: vec![],
            max_orfs_to_analyze: 5,
            max_orfs_for_database_search: 3,

            min_protein_length: 50,
            instability_stable_threshold: 40.0,
            hydrophobic_gravy_threshold: 0.0,

            gc_low_threshold: 40.0,
            gc_high_threshold: 60.0,

            chunk_size: 8000,
            overlap_size: 1000,
            dedup_tolerance_bp: 50,

            min_query_length: 10,
            default_max_results: 10,
            search_sequence_prefix: 50,
            search_nucleotide_prefix: 100,
            confidence_very_high: 1e-50,
            confidence_high: 1e-10,
            confidence_medium: 1e-3,

            rate_limit_delay_ms: 100,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_retries: 3,
            backoff_factor: 0.3,
            max_concurrent_requests: 5,

            blast_evalue_threshold: 10.0,
            blast_gap_costs: "11 1".to_string(),
            blast_protein_word_size: 3,
            blast_nucleotide_word_size: 11,
            blast_score_threshold: 11,
            blast_num_threads: 4,
            blast_database_dir: "blast_databases".to_string(),
            blast_database_name: "swissprot".to_string(),
            swissprot_fasta_url: SWISSPROT_FASTA_URL.to_string(),
            blast_remote_max_results: 19,
            blast_poll_delay_secs: 10,
            blast_poll_max_attempts: 30,

            ncbi_email: String::new(),
            ncbi_api_key: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrip() {
        let config = AnalysisConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: AnalysisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chunk_size, 8000);
        assert_eq!(back.overlap_size, 1000);
        assert_eq!(back.min_orf_length, 300);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AnalysisConfig = serde_json::from_str(r#"{"chunk_size": 4000}"#).unwrap();
        assert_eq!(config.chunk_size, 4000);
        assert_eq!(config.overlap_size, 1000);
    }
}
