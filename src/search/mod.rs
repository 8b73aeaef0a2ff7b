//! Database search providers and the shared plumbing they sit on.
//!
//! Every provider implements [`SearchProvider`]: a one-time `setup` that
//! reports whether the backing service is usable, and a `search` that maps
//! provider-specific responses into standardized [`DatabaseHit`] records.

use crate::config::AnalysisConfig;
use crate::error::GeneScoutError;
use crate::protein::AMINO_ACIDS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod blast_local;
pub mod blast_remote;
pub mod entrez;
pub mod gene_name;
pub mod uniprot;

pub use blast_local::BlastLocalProvider;
pub use blast_remote::BlastRemoteProvider;
pub use entrez::EntrezProvider;
pub use gene_name::GeneNameExtractor;
pub use uniprot::UniprotProvider;

/// Sentinel for unresolved gene name, organism, or description fields.
pub const UNKNOWN: &str = "Unknown";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Protein,
    Nucleotide,
}

/// Which backing database a provider talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseKind {
    NcbiProtein,
    NcbiNucleotide,
    Uniprot,
    SwissprotLocal,
}

impl DatabaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseKind::NcbiProtein => "ncbi_protein",
            DatabaseKind::NcbiNucleotide => "ncbi_nucleotide",
            DatabaseKind::Uniprot => "uniprot",
            DatabaseKind::SwissprotLocal => "swissprot_local",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchQuery {
    pub sequence: String,
    pub search_type: SearchType,
    pub max_results: usize,
}

impl SearchQuery {
    pub fn protein(sequence: impl Into<String>, max_results: usize) -> Self {
        Self {
            sequence: sequence.into(),
            search_type: SearchType::Protein,
            max_results,
        }
    }

    pub fn nucleotide(sequence: impl Into<String>, max_results: usize) -> Self {
        Self {
            sequence: sequence.into(),
            search_type: SearchType::Nucleotide,
            max_results,
        }
    }
}

/// One standardized hit, regardless of which database produced it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DatabaseHit {
    pub database: String,
    pub accession: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Percent identity where the backend reports or we compute one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<f64>,
    /// Alignment length (or subject sequence length for REST backends).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_end: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_end: Option<usize>,
    /// "Unknown" when the backend reports none; never empty after
    /// [`finish_hit`].
    #[serde(default)]
    pub organism: String,
    /// `["Unknown"]` when no symbol could be resolved.
    pub gene_names: Vec<String>,
    pub confidence: String,
    /// UniProt-only annotation extras.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub go_terms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Set by the pipeline: which ORF's translation produced this hit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_orf: Option<String>,
    /// Set during chunk combining: 1-based id of the originating chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_chunk: Option<usize>,
}

/// Outcome of one provider search. `success` with an empty hit list means the
/// query ran and matched nothing; a transport or setup problem is reported as
/// `success: false` with `error` set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub provider: String,
    pub success: bool,
    pub hits: Vec<DatabaseHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutcome {
    pub fn found(provider: &str, hits: Vec<DatabaseHit>) -> Self {
        Self {
            provider: provider.to_string(),
            success: true,
            hits,
            error: None,
        }
    }

    pub fn failed(provider: &str, error: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            success: false,
            hits: vec![],
            error: Some(error.into()),
        }
    }
}

pub trait SearchProvider {
    fn name(&self) -> &'static str;

    fn database(&self) -> DatabaseKind;

    /// Verify the provider can serve queries, preparing local state if
    /// needed. Returns false when the backend is missing or misconfigured.
    fn setup(&mut self) -> Result<bool, GeneScoutError>;

    fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, GeneScoutError>;
}

/// Map an e-value to its reporting band.
pub fn confidence_label(e_value: Option<f64>, config: &AnalysisConfig) -> String {
    let label = match e_value {
        Some(e) if e < config.confidence_very_high => "Very High",
        Some(e) if e < config.confidence_high => "High",
        Some(e) if e < config.confidence_medium => "Medium",
        _ => "Low",
    };
    label.to_string()
}

/// Clean and validate a query sequence for the given alphabet.
pub fn validate_query(query: &SearchQuery, config: &AnalysisConfig) -> Result<String, GeneScoutError> {
    let clean: String = query
        .sequence
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if clean.len() < config.min_query_length {
        return Err(GeneScoutError::InvalidInput(format!(
            "Query shorter than {} residues",
            config.min_query_length
        )));
    }
    let valid = match query.search_type {
        SearchType::Protein => clean
            .chars()
            .all(|c| c == '*' || c == 'X' || AMINO_ACIDS.contains(&c)),
        SearchType::Nucleotide => clean
            .chars()
            .all(|c| matches!(c, 'A' | 'T' | 'C' | 'G' | 'N')),
    };
    if !valid {
        return Err(GeneScoutError::InvalidInput(
            "Query contains characters outside the expected alphabet".to_string(),
        ));
    }
    Ok(clean)
}

/// Fill in derived hit fields: gene names extracted from the description when
/// the backend gave none, the confidence band for the e-value, and the
/// "Unknown" sentinel for unresolved text fields so downstream consumers
/// never see an empty description, organism, or gene name list.
pub(crate) fn finish_hit(
    mut hit: DatabaseHit,
    extractor: &GeneNameExtractor,
    config: &AnalysisConfig,
) -> DatabaseHit {
    if hit.gene_names.is_empty() {
        hit.gene_names = extractor.extract(&hit.description);
    }
    hit.confidence = confidence_label(hit.e_value, config);
    if hit.gene_names.is_empty() {
        hit.gene_names.push(UNKNOWN.to_string());
    }
    if hit.organism.is_empty() {
        hit.organism = UNKNOWN.to_string();
    }
    if hit.description.is_empty() {
        hit.description = UNKNOWN.to_string();
    }
    hit
}

/// Shared blocking HTTP client with the configured timeouts.
pub(crate) fn http_client(config: &AnalysisConfig) -> Result<reqwest::blocking::Client, GeneScoutError> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .user_agent(concat!("genescout/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Serializes network round trips to one backend: every call after the first
/// waits out the configured delay since the previous call.
pub(crate) struct RequestPacer {
    delay: Duration,
    last: std::sync::Mutex<Option<std::time::Instant>>,
}

impl RequestPacer {
    pub(crate) fn new(config: &AnalysisConfig) -> Self {
        Self {
            delay: Duration::from_millis(config.rate_limit_delay_ms),
            last: std::sync::Mutex::new(None),
        }
    }

    pub(crate) fn pace(&self) {
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.delay {
                std::thread::sleep(self.delay - elapsed);
            }
        }
        *last = Some(std::time::Instant::now());
    }
}

/// Run `op` up to `max_retries + 1` times with exponential backoff between
/// attempts.
pub(crate) fn with_retries<T, F>(
    config: &AnalysisConfig,
    mut op: F,
) -> Result<T, GeneScoutError>
where
    F: FnMut() -> Result<T, GeneScoutError>,
{
    let mut last_err = None;
    for attempt in 0..=config.max_retries {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::warn!(attempt, error = %err, "search request failed");
                last_err = Some(err);
                if attempt < config.max_retries {
                    let delay = config.backoff_factor * 2_f64.powi(attempt as i32);
                    std::thread::sleep(Duration::from_secs_f64(delay));
                }
            }
        }
    }
    Err(last_err
        .unwrap_or_else(|| GeneScoutError::Network("retries exhausted".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_bands() {
        let config = AnalysisConfig::default();
        assert_eq!(confidence_label(Some(1e-60), &config), "Very High");
        assert_eq!(confidence_label(Some(1e-20), &config), "High");
        assert_eq!(confidence_label(Some(1e-5), &config), "Medium");
        assert_eq!(confidence_label(Some(0.5), &config), "Low");
        assert_eq!(confidence_label(None, &config), "Low");
    }

    #[test]
    fn test_confidence_band_boundaries_are_exclusive() {
        let config = AnalysisConfig::default();
        assert_eq!(confidence_label(Some(1e-50), &config), "High");
        assert_eq!(confidence_label(Some(1e-10), &config), "Medium");
        assert_eq!(confidence_label(Some(1e-3), &config), "Low");
    }

    #[test]
    fn test_validate_query_length_and_alphabet() {
        let config = AnalysisConfig::default();
        assert!(validate_query(&SearchQuery::protein("MKT", 10), &config).is_err());
        assert!(validate_query(&SearchQuery::protein("MKTAYIAKQR", 10), &config).is_ok());
        assert!(validate_query(&SearchQuery::protein("MKTAYIAKQ1", 10), &config).is_err());
        assert!(validate_query(&SearchQuery::nucleotide("ATGCATGCATGC", 10), &config).is_ok());
        assert!(validate_query(&SearchQuery::nucleotide("MKTAYIAKQR", 10), &config).is_err());
    }

    #[test]
    fn test_validate_query_cleans_whitespace_and_case() {
        let config = AnalysisConfig::default();
        let clean =
            validate_query(&SearchQuery::protein(" mkta yiakqr\n", 10), &config).unwrap();
        assert_eq!(clean, "MKTAYIAKQR");
    }

    #[test]
    fn test_finish_hit_fills_unknown_sentinels() {
        let config = AnalysisConfig::default();
        let extractor = GeneNameExtractor::new();
        let hit = finish_hit(DatabaseHit::default(), &extractor, &config);
        assert_eq!(hit.description, "Unknown");
        assert_eq!(hit.organism, "Unknown");
        assert_eq!(hit.gene_names, vec!["Unknown".to_string()]);
        assert_eq!(hit.confidence, "Low");

        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["organism"], "Unknown");
        assert_eq!(json["gene_names"][0], "Unknown");
    }

    #[test]
    fn test_finish_hit_keeps_resolved_fields() {
        let config = AnalysisConfig::default();
        let extractor = GeneNameExtractor::new();
        let hit = finish_hit(
            DatabaseHit {
                description: "Insulin OS=Homo sapiens GN=INS".to_string(),
                organism: "Homo sapiens".to_string(),
                ..DatabaseHit::default()
            },
            &extractor,
            &config,
        );
        assert_eq!(hit.gene_names, vec!["INS".to_string()]);
        assert_eq!(hit.organism, "Homo sapiens");
    }

    #[test]
    fn test_pacer_spaces_consecutive_calls() {
        let mut config = AnalysisConfig::default();
        config.rate_limit_delay_ms = 30;
        let pacer = RequestPacer::new(&config);
        pacer.pace();
        let before_second = std::time::Instant::now();
        pacer.pace();
        assert!(before_second.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn test_with_retries_recovers() {
        let mut config = AnalysisConfig::default();
        config.backoff_factor = 0.0;
        let mut calls = 0;
        let result: Result<u32, _> = with_retries(&config, || {
            calls += 1;
            if calls < 3 {
                Err(GeneScoutError::Network("transient".to_string()))
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_with_retries_exhausts() {
        let mut config = AnalysisConfig::default();
        config.backoff_factor = 0.0;
        let result: Result<(), _> = with_retries(&config, || {
            Err(GeneScoutError::Network("down".to_string()))
        });
        assert!(result.is_err());
    }
}
