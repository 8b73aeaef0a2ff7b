//! End-to-end analysis: ORF detection, protein characterization, database
//! search, and gene name consolidation.
//!
//! Three entry points build on each other: [`Pipeline::analyze`] stops after
//! protein properties, [`Pipeline::identify`] adds database searches over the
//! top ORFs, and [`Pipeline::identify_chunked`] runs identification per
//! window for sequences too large for a single pass.

use crate::chunker::{ChunkOutcome, CombinedAnalysis, DatabaseHitGroups, SequenceChunker};
use crate::config::AnalysisConfig;
use crate::error::GeneScoutError;
use crate::orf::{Orf, OrfFinder};
use crate::protein::{analyze_protein, translate, ProteinProperties};
use crate::search::{
    DatabaseKind, GeneNameExtractor, SearchProvider, SearchQuery,
};
use crate::sequence::{composition, SequenceComposition};
use serde::{Deserialize, Serialize};

/// Hits requested per ORF per provider.
const ORF_SEARCH_MAX_RESULTS: usize = 3;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyzedOrf {
    pub orf_id: String,
    #[serde(flatten)]
    pub orf: Orf,
    pub protein_properties: ProteinProperties,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SequenceAnalysis {
    pub success: bool,
    pub sequence_composition: SequenceComposition,
    pub total_orfs_found: usize,
    pub analyzed_orfs: Vec<AnalyzedOrf>,
    pub analysis_method: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneIdentificationResult {
    pub success: bool,
    pub sequence_analysis: SequenceAnalysis,
    pub database_results: DatabaseHitGroups,
    pub total_database_matches: usize,
    /// Consolidated, cleaned gene symbols across all hits.
    pub genes_found: Vec<String>,
    pub search_method: String,
}

pub struct Pipeline {
    config: AnalysisConfig,
    finder: OrfFinder,
    chunker: SequenceChunker,
    extractor: GeneNameExtractor,
    providers: Vec<ProviderSlot>,
}

struct ProviderSlot {
    provider: Box<dyn SearchProvider>,
    ready: Option<bool>,
}

impl Pipeline {
    /// Pipeline with the default provider set: local BLAST against
    /// Swiss-Prot, plus UniProt. Entrez joins when an email is configured.
    pub fn new(config: AnalysisConfig) -> Self {
        let mut providers: Vec<Box<dyn SearchProvider>> = vec![
            Box::new(crate::search::BlastLocalProvider::new(config.clone())),
            Box::new(crate::search::UniprotProvider::new(config.clone())),
        ];
        if !config.ncbi_email.is_empty() {
            providers.push(Box::new(crate::search::EntrezProvider::new(config.clone())));
        }
        Self::with_providers(config, providers)
    }

    pub fn with_providers(
        config: AnalysisConfig,
        providers: Vec<Box<dyn SearchProvider>>,
    ) -> Self {
        Self {
            finder: OrfFinder::new(&config),
            chunker: SequenceChunker::new(&config),
            extractor: GeneNameExtractor::new(),
            providers: providers
                .into_iter()
                .map(|provider| ProviderSlot {
                    provider,
                    ready: None,
                })
                .collect(),
            config,
        }
    }

    /// ORF detection and protein characterization, no database traffic.
    pub fn analyze(&self, sequence: &str) -> Result<SequenceAnalysis, GeneScoutError> {
        let sequence_composition = composition(sequence, &self.config)?;
        let orfs = self.finder.find_orfs(sequence);
        let total_orfs_found = orfs.len();
        let analyzed_orfs = self.analyze_top_orfs(orfs);

        tracing::info!(
            total_orfs = total_orfs_found,
            analyzed = analyzed_orfs.len(),
            "sequence analysis complete"
        );

        Ok(SequenceAnalysis {
            success: true,
            sequence_composition,
            total_orfs_found,
            analyzed_orfs,
            analysis_method: "six-frame ORF detection with protein analysis".to_string(),
        })
    }

    fn analyze_top_orfs(&self, orfs: Vec<Orf>) -> Vec<AnalyzedOrf> {
        let mut analyzed = vec![];
        for (index, mut orf) in orfs
            .into_iter()
            .take(self.config.max_orfs_to_analyze)
            .enumerate()
        {
            let protein = translate(&orf.sequence);
            if protein.len() <= self.config.min_protein_length {
                continue;
            }
            match analyze_protein(&protein, &self.config) {
                Ok(protein_properties) => {
                    orf.protein_sequence = Some(protein);
                    analyzed.push(AnalyzedOrf {
                        orf_id: (index + 1).to_string(),
                        orf,
                        protein_properties,
                    });
                }
                Err(err) => {
                    tracing::warn!(orf = index + 1, error = %err, "skipping unanalyzable ORF");
                }
            }
        }
        analyzed
    }

    /// Full identification: analysis plus database searches over the top
    /// ORFs. Provider failures degrade to fewer hits, never to an overall
    /// failure.
    pub fn identify(&mut self, sequence: &str) -> Result<GeneIdentificationResult, GeneScoutError> {
        let sequence_analysis = self.analyze(sequence)?;
        let database_results = self.search_orfs(&sequence_analysis.analyzed_orfs);
        let genes_found = self.collect_gene_names(&database_results);

        Ok(GeneIdentificationResult {
            success: true,
            total_database_matches: database_results.total(),
            database_results,
            genes_found,
            sequence_analysis,
            search_method: "local BLAST against Swiss-Prot + UniProt REST API".to_string(),
        })
    }

    /// Windowed identification for long inputs. Each chunk is identified
    /// independently; results are merged with overlap deduplication.
    pub fn identify_chunked(&mut self, sequence: &str) -> CombinedAnalysis {
        let chunks = self.chunker.chunk(sequence);
        tracing::info!(chunks = chunks.len(), length = sequence.len(), "chunked identification");

        let mut outcomes = vec![];
        for chunk in &chunks {
            let outcome = match self.identify(&chunk.sequence) {
                Ok(result) => ChunkOutcome {
                    chunk_id: chunk.id,
                    chunk_start: chunk.start,
                    chunk_end: chunk.end,
                    success: true,
                    error: None,
                    orfs: result
                        .sequence_analysis
                        .analyzed_orfs
                        .into_iter()
                        .map(|analyzed| analyzed.orf)
                        .collect(),
                    database_hits: result.database_results,
                },
                Err(err) => {
                    tracing::warn!(chunk = chunk.id, error = %err, "chunk analysis failed");
                    ChunkOutcome {
                        chunk_id: chunk.id,
                        chunk_start: chunk.start,
                        chunk_end: chunk.end,
                        success: false,
                        error: Some(err.to_string()),
                        orfs: vec![],
                        database_hits: DatabaseHitGroups::default(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        self.chunker.combine(sequence.len(), outcomes)
    }

    fn search_orfs(&mut self, analyzed_orfs: &[AnalyzedOrf]) -> DatabaseHitGroups {
        let mut groups = DatabaseHitGroups::default();
        let limit = self.config.max_orfs_for_database_search;

        for analyzed in analyzed_orfs.iter().take(limit) {
            let Some(protein) = &analyzed.orf.protein_sequence else {
                continue;
            };
            let query = SearchQuery::protein(
                protein.trim_end_matches('*'),
                ORF_SEARCH_MAX_RESULTS,
            );

            for slot in &mut self.providers {
                let ready = match slot.ready {
                    Some(ready) => ready,
                    None => {
                        let ready = slot.provider.setup().unwrap_or(false);
                        if !ready {
                            tracing::warn!(provider = slot.provider.name(), "provider unavailable");
                        }
                        slot.ready = Some(ready);
                        ready
                    }
                };
                if !ready {
                    continue;
                }

                match slot.provider.search(&query) {
                    Ok(outcome) if outcome.success => {
                        let mut hits = outcome.hits;
                        for hit in &mut hits {
                            hit.source_orf = Some(analyzed.orf.orf_id());
                        }
                        match slot.provider.database() {
                            DatabaseKind::NcbiNucleotide => groups.ncbi_nucleotide.extend(hits),
                            DatabaseKind::Uniprot => groups.uniprot.extend(hits),
                            DatabaseKind::NcbiProtein | DatabaseKind::SwissprotLocal => {
                                groups.ncbi_protein.extend(hits)
                            }
                        }
                    }
                    Ok(outcome) => {
                        tracing::warn!(
                            provider = slot.provider.name(),
                            orf = %analyzed.orf_id,
                            error = outcome.error.as_deref().unwrap_or("unknown"),
                            "search returned an error"
                        );
                    }
                    Err(err) => {
                        tracing::warn!(
                            provider = slot.provider.name(),
                            orf = %analyzed.orf_id,
                            error = %err,
                            "search failed"
                        );
                    }
                }
            }
        }
        groups
    }

    fn collect_gene_names(&self, groups: &DatabaseHitGroups) -> Vec<String> {
        let raw: Vec<String> = groups
            .ncbi_protein
            .iter()
            .chain(&groups.ncbi_nucleotide)
            .chain(&groups.uniprot)
            .filter_map(|hit| hit.gene_names.first().cloned())
            .collect();
        self.extractor.clean_names(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{DatabaseHit, SearchOutcome};

    fn gene_sequence() -> String {
        format!("ATG{}TAA", "TTT".repeat(100))
    }

    struct StubProvider {
        kind: DatabaseKind,
        ready: bool,
        hits: Vec<DatabaseHit>,
    }

    impl StubProvider {
        fn with_hit(gene: &str) -> Self {
            Self {
                kind: DatabaseKind::NcbiProtein,
                ready: true,
                hits: vec![DatabaseHit {
                    database: "ncbi_protein".to_string(),
                    accession: "P99999.1".to_string(),
                    description: format!("test protein GN={gene}"),
                    e_value: Some(1e-60),
                    gene_names: vec![gene.to_string()],
                    confidence: "Very High".to_string(),
                    ..DatabaseHit::default()
                }],
            }
        }
    }

    impl SearchProvider for StubProvider {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn database(&self) -> DatabaseKind {
            self.kind
        }

        fn setup(&mut self) -> Result<bool, GeneScoutError> {
            Ok(self.ready)
        }

        fn search(&self, _query: &SearchQuery) -> Result<SearchOutcome, GeneScoutError> {
            Ok(SearchOutcome::found("stub", self.hits.clone()))
        }
    }

    #[test]
    fn test_analyze_reports_orf_and_protein() {
        let pipeline = Pipeline::with_providers(AnalysisConfig::default(), vec![]);
        let analysis = pipeline.analyze(&gene_sequence()).unwrap();
        assert!(analysis.success);
        assert_eq!(analysis.total_orfs_found, 1);
        assert_eq!(analysis.analyzed_orfs.len(), 1);

        let analyzed = &analysis.analyzed_orfs[0];
        assert_eq!(analyzed.orf_id, "1");
        let protein = analyzed.orf.protein_sequence.as_deref().unwrap();
        assert_eq!(protein.len(), 102);
        assert_eq!(analyzed.protein_properties.length, 101);
    }

    #[test]
    fn test_analyze_rejects_invalid_sequence() {
        let pipeline = Pipeline::with_providers(AnalysisConfig::default(), vec![]);
        assert!(pipeline.analyze("NNNN").is_err());
    }

    #[test]
    fn test_identify_tags_hits_and_collects_genes() {
        let mut pipeline = Pipeline::with_providers(
            AnalysisConfig::default(),
            vec![Box::new(StubProvider::with_hit("BRCA1"))],
        );
        let result = pipeline.identify(&gene_sequence()).unwrap();
        assert!(result.success);
        assert_eq!(result.total_database_matches, 1);
        assert_eq!(
            result.database_results.ncbi_protein[0].source_orf.as_deref(),
            Some("ORF_1_306_+")
        );
        assert_eq!(result.genes_found, vec!["BRCA1".to_string()]);
    }

    #[test]
    fn test_unknown_sentinel_not_collected_as_gene() {
        let mut pipeline = Pipeline::with_providers(
            AnalysisConfig::default(),
            vec![Box::new(StubProvider::with_hit("Unknown"))],
        );
        let result = pipeline.identify(&gene_sequence()).unwrap();
        assert_eq!(result.total_database_matches, 1);
        assert!(result.genes_found.is_empty());
    }

    #[test]
    fn test_identify_with_unavailable_provider() {
        let mut stub = StubProvider::with_hit("BRCA1");
        stub.ready = false;
        let mut pipeline =
            Pipeline::with_providers(AnalysisConfig::default(), vec![Box::new(stub)]);
        let result = pipeline.identify(&gene_sequence()).unwrap();
        assert!(result.success);
        assert_eq!(result.total_database_matches, 0);
        assert!(result.genes_found.is_empty());
    }

    #[test]
    fn test_identify_chunked_short_sequence() {
        let mut pipeline = Pipeline::with_providers(
            AnalysisConfig::default(),
            vec![Box::new(StubProvider::with_hit("INS"))],
        );
        let combined = pipeline.identify_chunked(&gene_sequence());
        assert!(combined.success);
        assert_eq!(combined.stats.total_chunks, 1);
        assert_eq!(combined.orfs.len(), 1);
        assert_eq!(combined.orfs[0].orf.start, 1);
        assert_eq!(combined.database_hits.total(), 1);
    }

    #[test]
    fn test_identify_chunked_failed_chunk_is_not_fatal() {
        let mut pipeline = Pipeline::with_providers(AnalysisConfig::default(), vec![]);
        // All-N input fails composition inside the chunk
        let combined = pipeline.identify_chunked(&"N".repeat(500));
        assert!(combined.success);
        assert_eq!(combined.stats.failed_chunks, 1);
        assert!(combined.orfs.is_empty());
    }
}
