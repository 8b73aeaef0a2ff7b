//! Protein and gene-symbol searches against the UniProtKB REST API.
//!
//! UniProt returns rich JSON entries but no alignment statistics, so
//! similarity is computed client-side: a sliding-window identity for sequence
//! queries and a Ratcliff-Obershelp ratio for gene name queries.

use super::{
    finish_hit, validate_query, DatabaseHit, DatabaseKind, GeneNameExtractor, SearchOutcome,
    SearchProvider, SearchQuery, SearchType,
};
use crate::config::AnalysisConfig;
use crate::error::GeneScoutError;
use crate::sequence::round2;
use serde::Deserialize;

const PROVIDER_NAME: &str = "uniprot";
const UNIPROT_URL: &str = "https://rest.uniprot.org/uniprotkb/search";

const SEQUENCE_FIELDS: &str =
    "accession,protein_name,gene_names,organism_name,sequence,length,keyword,go";
const GENE_FIELDS: &str = "accession,protein_name,gene_names,organism_name,cc_function";

pub struct UniprotProvider {
    config: AnalysisConfig,
    extractor: GeneNameExtractor,
}

impl UniprotProvider {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            extractor: GeneNameExtractor::new(),
        }
    }

    fn request(
        &self,
        query: &str,
        fields: &str,
        size: usize,
    ) -> Result<UniprotResponse, GeneScoutError> {
        let client = super::http_client(&self.config)?;
        let size = size.to_string();
        super::with_retries(&self.config, || {
            Ok(client
                .get(UNIPROT_URL)
                .query(&[
                    ("query", query),
                    ("format", "json"),
                    ("fields", fields),
                    ("size", size.as_str()),
                ])
                .send()?
                .error_for_status()?
                .json()?)
        })
    }

    fn sequence_hits(&self, protein: &str, max_results: usize) -> Result<Vec<DatabaseHit>, GeneScoutError> {
        let prefix: String = protein
            .chars()
            .take(self.config.search_sequence_prefix)
            .collect();
        let response = self.request(&format!("sequence:{prefix}"), SEQUENCE_FIELDS, max_results)?;
        Ok(self.sequence_hits_from(&response, protein))
    }

    fn sequence_hits_from(&self, response: &UniprotResponse, protein: &str) -> Vec<DatabaseHit> {
        response
            .results
            .iter()
            .map(|entry| {
                let hit = DatabaseHit {
                    database: DatabaseKind::Uniprot.as_str().to_string(),
                    accession: entry.primary_accession.clone(),
                    description: entry.protein_name(),
                    identity: entry
                        .sequence
                        .as_ref()
                        .and_then(|seq| sliding_window_identity(protein, &seq.value)),
                    length: entry.sequence.as_ref().map(|seq| seq.value.len()),
                    organism: entry.organism_name().unwrap_or_default(),
                    gene_names: entry.gene_names(),
                    keywords: entry.keyword_names(),
                    go_terms: entry.go_terms(),
                    ..DatabaseHit::default()
                };
                finish_hit(hit, &self.extractor, &self.config)
            })
            .collect()
    }

    fn gene_hits(&self, gene_name: &str, max_results: usize) -> Result<Vec<DatabaseHit>, GeneScoutError> {
        let response = self.request(&format!("gene:{gene_name}"), GENE_FIELDS, max_results)?;
        Ok(self.gene_hits_from(&response, gene_name))
    }

    fn gene_hits_from(&self, response: &UniprotResponse, gene_name: &str) -> Vec<DatabaseHit> {
        response
            .results
            .iter()
            .map(|entry| {
                let names = entry.gene_names();
                let hit = DatabaseHit {
                    database: DatabaseKind::Uniprot.as_str().to_string(),
                    accession: entry.primary_accession.clone(),
                    description: entry.protein_name(),
                    score: gene_name_similarity(gene_name, &names, &entry.protein_name()),
                    organism: entry.organism_name().unwrap_or_default(),
                    gene_names: names,
                    function: entry.function_text(),
                    ..DatabaseHit::default()
                };
                finish_hit(hit, &self.extractor, &self.config)
            })
            .collect()
    }

    /// Look up UniProt entries by gene symbol rather than by sequence.
    pub fn search_gene_name(
        &self,
        gene_name: &str,
        max_results: usize,
    ) -> Result<SearchOutcome, GeneScoutError> {
        match self.gene_hits(gene_name, max_results) {
            Ok(hits) => Ok(SearchOutcome::found(PROVIDER_NAME, hits)),
            Err(err) => {
                tracing::error!(error = %err, gene_name, "UniProt gene search failed");
                Ok(SearchOutcome::failed(PROVIDER_NAME, err.to_string()))
            }
        }
    }
}

impl SearchProvider for UniprotProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn database(&self) -> DatabaseKind {
        DatabaseKind::Uniprot
    }

    fn setup(&mut self) -> Result<bool, GeneScoutError> {
        Ok(true)
    }

    fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, GeneScoutError> {
        let clean = match validate_query(query, &self.config) {
            Ok(clean) => clean,
            Err(err) => return Ok(SearchOutcome::failed(PROVIDER_NAME, err.to_string())),
        };
        if query.search_type != SearchType::Protein {
            return Ok(SearchOutcome::failed(
                PROVIDER_NAME,
                "UniProt search supports protein queries only",
            ));
        }

        match self.sequence_hits(&clean, query.max_results) {
            Ok(hits) => {
                tracing::info!(hits = hits.len(), "UniProt search completed");
                Ok(SearchOutcome::found(PROVIDER_NAME, hits))
            }
            Err(err) => {
                tracing::error!(error = %err, "UniProt search failed");
                Ok(SearchOutcome::failed(PROVIDER_NAME, err.to_string()))
            }
        }
    }
}

/// Best percent identity of the query prefix over all target windows of the
/// shorter length. Stop symbols are ignored on both sides.
fn sliding_window_identity(query: &str, target: &str) -> Option<f64> {
    let query: Vec<u8> = query.bytes().filter(|b| *b != b'*').collect();
    let target: Vec<u8> = target.bytes().filter(|b| *b != b'*').collect();
    if query.is_empty() || target.is_empty() {
        return None;
    }

    let window = query.len().min(target.len());
    let head = &query[..window];
    let mut best = 0;
    for segment in target.windows(window) {
        let matches = head
            .iter()
            .zip(segment)
            .filter(|(a, b)| a == b)
            .count();
        best = best.max(matches);
    }
    Some(round2(best as f64 / window as f64 * 100.0))
}

/// Best Ratcliff-Obershelp similarity (0-100) between the query symbol and
/// any of the entry's gene names or its protein name.
fn gene_name_similarity(query: &str, gene_names: &[String], protein_name: &str) -> Option<f64> {
    let query = query.to_uppercase();
    let best = gene_names
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(protein_name))
        .map(|candidate| sequence_ratio(&query, &candidate.to_uppercase()))
        .fold(0.0_f64, f64::max);
    (best > 0.0).then(|| round2(best * 100.0))
}

/// difflib-style ratio: twice the matched character count over the combined
/// length, where matches come from recursively taken longest common
/// substrings.
fn sequence_ratio(a: &str, b: &str) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    2.0 * matching_chars(a.as_bytes(), b.as_bytes()) as f64 / total as f64
}

fn matching_chars(a: &[u8], b: &[u8]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (a_start, b_start, len) = longest_common_substring(a, b);
    if len == 0 {
        return 0;
    }
    len + matching_chars(&a[..a_start], &b[..b_start])
        + matching_chars(&a[a_start + len..], &b[b_start + len..])
}

fn longest_common_substring(a: &[u8], b: &[u8]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut lengths = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        let mut prev = 0;
        for (j, &cb) in b.iter().enumerate() {
            let current = lengths[j + 1];
            if ca == cb {
                lengths[j + 1] = prev + 1;
                if lengths[j + 1] > best.2 {
                    best = (i + 1 - lengths[j + 1], j + 1 - lengths[j + 1], lengths[j + 1]);
                }
            } else {
                lengths[j + 1] = 0;
            }
            prev = current;
        }
    }
    best
}

#[derive(Debug, Default, Deserialize)]
struct UniprotResponse {
    #[serde(default)]
    results: Vec<UniprotEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UniprotEntry {
    primary_accession: String,
    protein_description: ProteinDescription,
    genes: Vec<UniprotGene>,
    organism: Option<UniprotOrganism>,
    sequence: Option<UniprotSequence>,
    keywords: Vec<UniprotKeyword>,
    #[serde(rename = "uniProtKBCrossReferences")]
    cross_references: Vec<CrossReference>,
    comments: Vec<UniprotComment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ProteinDescription {
    recommended_name: Option<NameBlock>,
    alternative_names: Vec<NameBlock>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct NameBlock {
    full_name: Option<ValueField>,
}

#[derive(Debug, Default, Deserialize)]
struct ValueField {
    #[serde(default)]
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UniprotGene {
    gene_name: Option<ValueField>,
    synonyms: Vec<ValueField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UniprotOrganism {
    scientific_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct UniprotSequence {
    #[serde(default)]
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct UniprotKeyword {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossReference {
    database: String,
    properties: Vec<CrossReferenceProperty>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossReferenceProperty {
    key: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UniprotComment {
    comment_type: String,
    texts: Vec<ValueField>,
}

impl UniprotEntry {
    fn protein_name(&self) -> String {
        if let Some(name) = &self.protein_description.recommended_name {
            if let Some(full) = &name.full_name {
                return full.value.clone();
            }
        }
        self.protein_description
            .alternative_names
            .first()
            .and_then(|name| name.full_name.as_ref())
            .map(|full| full.value.clone())
            .unwrap_or_default()
    }

    fn gene_names(&self) -> Vec<String> {
        let mut names = vec![];
        for gene in &self.genes {
            if let Some(name) = &gene.gene_name {
                if !names.contains(&name.value) {
                    names.push(name.value.clone());
                }
            }
            for synonym in &gene.synonyms {
                if !names.contains(&synonym.value) {
                    names.push(synonym.value.clone());
                }
            }
        }
        names
    }

    fn organism_name(&self) -> Option<String> {
        self.organism
            .as_ref()
            .map(|organism| organism.scientific_name.clone())
    }

    fn keyword_names(&self) -> Vec<String> {
        self.keywords
            .iter()
            .filter(|kw| !kw.name.is_empty())
            .map(|kw| kw.name.clone())
            .collect()
    }

    fn go_terms(&self) -> Vec<String> {
        self.cross_references
            .iter()
            .filter(|dbref| dbref.database == "GO")
            .flat_map(|dbref| &dbref.properties)
            .filter(|prop| prop.key == "GoTerm")
            .map(|prop| prop.value.clone())
            .collect()
    }

    fn function_text(&self) -> Option<String> {
        self.comments
            .iter()
            .find(|comment| comment.comment_type == "FUNCTION")
            .and_then(|comment| comment.texts.first())
            .map(|text| text.value.clone())
    }
}
