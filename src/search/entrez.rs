//! Keyword searches against NCBI Entrez (E-utilities, JSON responses).
//!
//! A search is two round trips: `esearch` turns a term into a UID list, then
//! `esummary` resolves the UIDs into document summaries. NCBI asks clients to
//! identify themselves with an email address and to pace their requests, so
//! setup fails without an email and every round trip after the first waits
//! out the configured rate-limit delay.

use super::{
    finish_hit, validate_query, DatabaseHit, DatabaseKind, GeneNameExtractor, RequestPacer,
    SearchOutcome, SearchProvider, SearchQuery, SearchType,
};
use crate::config::AnalysisConfig;
use crate::error::GeneScoutError;
use serde::Deserialize;

const PROVIDER_NAME: &str = "entrez";
const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const TOOL_NAME: &str = "genescout";

pub struct EntrezProvider {
    config: AnalysisConfig,
    extractor: GeneNameExtractor,
    pacer: RequestPacer,
}

#[derive(Debug, Deserialize)]
struct EsearchResponse {
    esearchresult: EsearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

impl EntrezProvider {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            pacer: RequestPacer::new(&config),
            config,
            extractor: GeneNameExtractor::new(),
        }
    }

    /// Entrez database and search term for a sequence query. Sequences are
    /// truncated to a configured prefix; Entrez keyword search does not cope
    /// with full-length sequences.
    fn build_term(&self, clean: &str, search_type: SearchType) -> (&'static str, String) {
        match search_type {
            SearchType::Protein => {
                let prefix: String = clean
                    .chars()
                    .take(self.config.search_sequence_prefix)
                    .collect();
                ("protein", format!("{prefix}[WORD]"))
            }
            SearchType::Nucleotide => {
                let prefix: String = clean
                    .chars()
                    .take(self.config.search_nucleotide_prefix)
                    .collect();
                ("nucleotide", format!("{prefix}[WORD]"))
            }
        }
    }

    fn identity_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("tool", TOOL_NAME.to_string()),
            ("email", self.config.ncbi_email.clone()),
        ];
        if let Some(key) = &self.config.ncbi_api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    fn esearch(
        &self,
        client: &reqwest::blocking::Client,
        db: &str,
        term: &str,
        retmax: usize,
    ) -> Result<Vec<String>, GeneScoutError> {
        let retmax = retmax.to_string();
        let response: EsearchResponse = super::with_retries(&self.config, || {
            self.pacer.pace();
            Ok(client
                .get(format!("{EUTILS_BASE}/esearch.fcgi"))
                .query(&[
                    ("db", db),
                    ("term", term),
                    ("retmax", retmax.as_str()),
                    ("retmode", "json"),
                ])
                .query(&self.identity_params())
                .send()?
                .error_for_status()?
                .json()?)
        })?;
        Ok(response.esearchresult.idlist)
    }

    fn esummaries(
        &self,
        client: &reqwest::blocking::Client,
        db: &str,
        ids: &[String],
        database_label: &str,
    ) -> Result<Vec<DatabaseHit>, GeneScoutError> {
        let ids = ids.join(",");
        let body: serde_json::Value = super::with_retries(&self.config, || {
            self.pacer.pace();
            Ok(client
                .get(format!("{EUTILS_BASE}/esummary.fcgi"))
                .query(&[
                    ("db", db),
                    ("id", ids.as_str()),
                    ("retmode", "json"),
                ])
                .query(&self.identity_params())
                .send()?
                .error_for_status()?
                .json()?)
        })?;
        Ok(self.summaries_to_hits(&body, database_label))
    }

    /// Convert an esummary JSON body to hits. Entrez reports no alignment
    /// statistics, so these hits carry no e-value and land in the lowest
    /// confidence band.
    fn summaries_to_hits(&self, body: &serde_json::Value, database_label: &str) -> Vec<DatabaseHit> {
        let result = &body["result"];
        let Some(uids) = result["uids"].as_array() else {
            return vec![];
        };

        let mut hits = vec![];
        for uid in uids {
            let Some(uid) = uid.as_str() else { continue };
            let doc = &result[uid];
            let description = doc["title"].as_str().unwrap_or_default().to_string();
            let accession = doc["accessionversion"]
                .as_str()
                .unwrap_or(uid)
                .to_string();
            let hit = DatabaseHit {
                database: database_label.to_string(),
                accession,
                description,
                organism: doc["organism"].as_str().unwrap_or_default().to_string(),
                length: doc["slen"].as_u64().map(|len| len as usize),
                ..DatabaseHit::default()
            };
            hits.push(finish_hit(hit, &self.extractor, &self.config));
        }
        hits
    }

    fn run_search(
        &self,
        db: &str,
        term: &str,
        database_label: &str,
        max_results: usize,
    ) -> Result<Vec<DatabaseHit>, GeneScoutError> {
        let client = super::http_client(&self.config)?;
        let ids = self.esearch(&client, db, term, max_results)?;
        if ids.is_empty() {
            return Ok(vec![]);
        }
        self.esummaries(&client, db, &ids, database_label)
    }

    fn gene_term(gene_name: &str) -> String {
        format!("{gene_name}[Gene Name]")
    }

    /// Look up protein records by gene symbol rather than by sequence.
    pub fn search_gene_name(
        &self,
        gene_name: &str,
        max_results: usize,
    ) -> Result<SearchOutcome, GeneScoutError> {
        let term = Self::gene_term(gene_name);
        match self.run_search("protein", &term, DatabaseKind::NcbiProtein.as_str(), max_results) {
            Ok(hits) => Ok(SearchOutcome::found(PROVIDER_NAME, hits)),
            Err(err) => {
                tracing::error!(error = %err, gene_name, "Entrez gene name search failed");
                Ok(SearchOutcome::failed(PROVIDER_NAME, err.to_string()))
            }
        }
    }
}

impl SearchProvider for EntrezProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn database(&self) -> DatabaseKind {
        DatabaseKind::NcbiProtein
    }

    fn setup(&mut self) -> Result<bool, GeneScoutError> {
        if self.config.ncbi_email.is_empty() {
            tracing::warn!("NCBI email not configured, Entrez searches disabled");
            return Ok(false);
        }
        Ok(true)
    }

    fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, GeneScoutError> {
        let clean = match validate_query(query, &self.config) {
            Ok(clean) => clean,
            Err(err) => return Ok(SearchOutcome::failed(PROVIDER_NAME, err.to_string())),
        };
        let (db, term) = self.build_term(&clean, query.search_type);
        let database_label = match query.search_type {
            SearchType::Protein => DatabaseKind::NcbiProtein.as_str(),
            SearchType::Nucleotide => DatabaseKind::NcbiNucleotide.as_str(),
        };

        match self.run_search(db, &term, database_label, query.max_results) {
            Ok(hits) => {
                tracing::info!(hits = hits.len(), db, "Entrez search completed");
                Ok(SearchOutcome::found(PROVIDER_NAME, hits))
            }
            Err(err) => {
                tracing::error!(error = %err, db, "Entrez search failed");
                Ok(SearchOutcome::failed(PROVIDER_NAME, err.to_string()))
            }
        }
    }
}
