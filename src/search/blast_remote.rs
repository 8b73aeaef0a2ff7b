//! Remote BLAST searches through the NCBI URL API.
//!
//! A search is submitted with `CMD=Put`, which returns a request identifier
//! (RID). The provider then polls `CMD=Get` until NCBI reports the job ready
//! and fetches the full result as XML. NCBI caps hit list sizes on its side,
//! so the requested size is clamped before submission.

use super::{
    finish_hit, validate_query, DatabaseHit, DatabaseKind, GeneNameExtractor, SearchOutcome,
    SearchProvider, SearchQuery, SearchType,
};
use crate::config::AnalysisConfig;
use crate::error::GeneScoutError;
use crate::sequence::round2;
use serde::Deserialize;
use std::time::Duration;

const PROVIDER_NAME: &str = "blast_remote";
const BLAST_URL: &str = "https://blast.ncbi.nlm.nih.gov/Blast.cgi";

pub struct BlastRemoteProvider {
    config: AnalysisConfig,
    extractor: GeneNameExtractor,
}

impl BlastRemoteProvider {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            extractor: GeneNameExtractor::new(),
        }
    }

    fn hitlist_size(&self, max_results: usize) -> usize {
        max_results.min(self.config.blast_remote_max_results)
    }

    fn program_for(&self, search_type: SearchType) -> (&'static str, &'static str, u32) {
        match search_type {
            SearchType::Protein => ("blastp", "nr", self.config.blast_protein_word_size),
            SearchType::Nucleotide => ("blastn", "nt", self.config.blast_nucleotide_word_size),
        }
    }

    fn submit(
        &self,
        client: &reqwest::blocking::Client,
        sequence: &str,
        search_type: SearchType,
        max_results: usize,
    ) -> Result<String, GeneScoutError> {
        let (program, database, word_size) = self.program_for(search_type);
        tracing::info!(program, database, query_len = sequence.len(), "submitting BLAST job");

        let hitlist_size = self.hitlist_size(max_results).to_string();
        let expect = self.config.blast_evalue_threshold.to_string();
        let word_size = word_size.to_string();
        let body = client
            .post(BLAST_URL)
            .form(&[
                ("CMD", "Put"),
                ("PROGRAM", program),
                ("DATABASE", database),
                ("QUERY", sequence),
                ("HITLIST_SIZE", hitlist_size.as_str()),
                ("EXPECT", expect.as_str()),
                ("GAPCOSTS", self.config.blast_gap_costs.as_str()),
                ("WORD_SIZE", word_size.as_str()),
            ])
            .send()?
            .error_for_status()?
            .text()?;

        extract_qblast_field(&body, "RID")
            .ok_or_else(|| GeneScoutError::Network("BLAST submission returned no RID".to_string()))
    }

    fn wait_until_ready(
        &self,
        client: &reqwest::blocking::Client,
        rid: &str,
    ) -> Result<(), GeneScoutError> {
        for attempt in 0..self.config.blast_poll_max_attempts {
            std::thread::sleep(Duration::from_secs(self.config.blast_poll_delay_secs));
            let body = client
                .get(BLAST_URL)
                .query(&[("CMD", "Get"), ("RID", rid), ("FORMAT_OBJECT", "SearchInfo")])
                .send()?
                .error_for_status()?
                .text()?;

            match extract_qblast_field(&body, "Status").as_deref() {
                Some("READY") => {
                    tracing::debug!(rid, attempt, "BLAST job ready");
                    return Ok(());
                }
                Some("WAITING") | None => {
                    tracing::debug!(rid, attempt, "BLAST job still running");
                }
                Some(other) => {
                    return Err(GeneScoutError::Network(format!(
                        "BLAST job {rid} failed with status {other}"
                    )));
                }
            }
        }
        Err(GeneScoutError::Network(format!(
            "BLAST job {rid} did not finish in time"
        )))
    }

    fn fetch_results(
        &self,
        client: &reqwest::blocking::Client,
        rid: &str,
        max_results: usize,
    ) -> Result<Vec<DatabaseHit>, GeneScoutError> {
        let xml = client
            .get(BLAST_URL)
            .query(&[("CMD", "Get"), ("RID", rid), ("FORMAT_TYPE", "XML")])
            .send()?
            .error_for_status()?
            .text()?;
        self.parse_xml(&xml, max_results)
    }

    fn parse_xml(&self, xml: &str, max_results: usize) -> Result<Vec<DatabaseHit>, GeneScoutError> {
        let output: BlastOutput = quick_xml::de::from_str(xml)
            .map_err(|e| GeneScoutError::Network(format!("unparseable BLAST XML: {e}")))?;

        let mut hits = vec![];
        for iteration in output.iterations.iterations {
            let Some(iteration_hits) = iteration.hits else {
                continue;
            };
            for hit in iteration_hits.hits {
                for hsp in &hit.hsps.hsps {
                    let identity = if hsp.align_len > 0.0 {
                        Some(round2(hsp.identity / hsp.align_len * 100.0))
                    } else {
                        None
                    };
                    let standardized = DatabaseHit {
                        database: "ncbi_blast".to_string(),
                        accession: hit.accession.clone(),
                        description: hit.def.clone(),
                        e_value: Some(hsp.evalue),
                        score: Some(hsp.bit_score),
                        identity,
                        length: (hsp.align_len > 0.0).then_some(hsp.align_len as usize),
                        query_start: hsp.query_from,
                        query_end: hsp.query_to,
                        subject_start: hsp.hit_from,
                        subject_end: hsp.hit_to,
                        ..DatabaseHit::default()
                    };
                    hits.push(finish_hit(standardized, &self.extractor, &self.config));
                    if hits.len() >= max_results {
                        return Ok(hits);
                    }
                }
            }
        }
        Ok(hits)
    }
}

impl SearchProvider for BlastRemoteProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn database(&self) -> DatabaseKind {
        DatabaseKind::NcbiProtein
    }

    fn setup(&mut self) -> Result<bool, GeneScoutError> {
        Ok(true)
    }

    fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, GeneScoutError> {
        let clean = match validate_query(query, &self.config) {
            Ok(clean) => clean,
            Err(err) => return Ok(SearchOutcome::failed(PROVIDER_NAME, err.to_string())),
        };

        let run = || -> Result<Vec<DatabaseHit>, GeneScoutError> {
            let client = super::http_client(&self.config)?;
            let rid = self.submit(&client, &clean, query.search_type, query.max_results)?;
            self.wait_until_ready(&client, &rid)?;
            self.fetch_results(&client, &rid, query.max_results)
        };

        match run() {
            Ok(hits) => {
                tracing::info!(hits = hits.len(), "remote BLAST search completed");
                Ok(SearchOutcome::found(PROVIDER_NAME, hits))
            }
            Err(err) => {
                tracing::error!(error = %err, "remote BLAST search failed");
                Ok(SearchOutcome::failed(PROVIDER_NAME, err.to_string()))
            }
        }
    }
}

/// Pull a `Key = Value` field out of the QBlastInfo block NCBI embeds in its
/// HTML responses.
fn extract_qblast_field(body: &str, key: &str) -> Option<String> {
    body.lines().find_map(|line| {
        let trimmed = line.trim();
        let rest = trimmed
            .strip_prefix(key)
            .map(str::trim_start)
            .and_then(|rest| rest.strip_prefix('='))?;
        let value = rest.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

#[derive(Debug, Deserialize)]
struct BlastOutput {
    #[serde(rename = "BlastOutput_iterations")]
    iterations: BlastIterations,
}

#[derive(Debug, Deserialize)]
struct BlastIterations {
    #[serde(rename = "Iteration", default)]
    iterations: Vec<BlastIteration>,
}

#[derive(Debug, Deserialize)]
struct BlastIteration {
    #[serde(rename = "Iteration_hits")]
    hits: Option<BlastIterationHits>,
}

#[derive(Debug, Deserialize)]
struct BlastIterationHits {
    #[serde(rename = "Hit", default)]
    hits: Vec<BlastXmlHit>,
}

#[derive(Debug, Deserialize)]
struct BlastXmlHit {
    #[serde(rename = "Hit_def")]
    def: String,
    #[serde(rename = "Hit_accession")]
    accession: String,
    #[serde(rename = "Hit_hsps")]
    hsps: BlastHsps,
}

#[derive(Debug, Deserialize)]
struct BlastHsps {
    #[serde(rename = "Hsp", default)]
    hsps: Vec<BlastHsp>,
}

#[derive(Debug, Deserialize)]
struct BlastHsp {
    #[serde(rename = "Hsp_bit-score")]
    bit_score: f64,
    #[serde(rename = "Hsp_evalue")]
    evalue: f64,
    #[serde(rename = "Hsp_identity")]
    identity: f64,
    #[serde(rename = "Hsp_align-len")]
    align_len: f64,
    #[serde(rename = "Hsp_query-from", default)]
    query_from: Option<usize>,
    #[serde(rename = "Hsp_query-to", default)]
    query_to: Option<usize>,
    #[serde(rename = "Hsp_hit-from", default)]
    hit_from: Option<usize>,
    #[serde(rename = "Hsp_hit-to", default)]
    hit_to: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_XML: &str = r#"<?xml version="1.0"?>
<BlastOutput>
  <BlastOutput_iterations>
    <Iteration>
      <Iteration_iter-num>1</Iteration_iter-num>
      <Iteration_hits>
        <Hit>
          <Hit_num>1</Hit_num>
          <Hit_id>sp|P01308.1|</Hit_id>
          <Hit_def>Insulin OS=Homo sapiens GN=INS</Hit_def>
          <Hit_accession>P01308</Hit_accession>
          <Hit_len>110</Hit_len>
          <Hit_hsps>
            <Hsp>
              <Hsp_num>1</Hsp_num>
              <Hsp_bit-score>220.0</Hsp_bit-score>
              <Hsp_evalue>1e-75</Hsp_evalue>
              <Hsp_query-from>1</Hsp_query-from>
              <Hsp_query-to>110</Hsp_query-to>
              <Hsp_hit-from>1</Hsp_hit-from>
              <Hsp_hit-to>110</Hsp_hit-to>
              <Hsp_identity>108</Hsp_identity>
              <Hsp_align-len>110</Hsp_align-len>
            </Hsp>
          </Hit_hsps>
        </Hit>
      </Iteration_hits>
    </Iteration>
  </BlastOutput_iterations>
</BlastOutput>"#;

    fn provider() -> BlastRemoteProvider {
        BlastRemoteProvider::new(AnalysisConfig::default())
    }

    #[test]
    fn test_parse_blast_xml() {
        let hits = provider().parse_xml(SAMPLE_XML, 10).unwrap();
        assert_eq!(hits.len(), 1);
        let hit = &hits[0];
        assert_eq!(hit.accession, "P01308");
        assert_eq!(hit.e_value, Some(1e-75));
        assert_eq!(hit.identity, Some(98.18));
        assert_eq!(hit.length, Some(110));
        assert_eq!(hit.query_start, Some(1));
        assert_eq!(hit.subject_end, Some(110));
        assert_eq!(hit.gene_names, vec!["INS".to_string()]);
        assert_eq!(hit.confidence, "Very High");
    }

    #[test]
    fn test_parse_respects_max_results() {
        let hits = provider().parse_xml(SAMPLE_XML, 0).unwrap();
        assert!(hits.is_empty() || hits.len() <= 1);
    }

    #[test]
    fn test_extract_qblast_fields() {
        let body = "<!--QBlastInfoBegin\n    RID = ABC123XYZ\n    RTOE = 25\nQBlastInfoEnd\n-->";
        assert_eq!(
            extract_qblast_field(body, "RID"),
            Some("ABC123XYZ".to_string())
        );
        assert_eq!(extract_qblast_field(body, "RTOE"), Some("25".to_string()));
        assert_eq!(extract_qblast_field(body, "Status"), None);
    }

    #[test]
    fn test_extract_status_field() {
        let body = "  Status=WAITING\n";
        assert_eq!(
            extract_qblast_field(body, "Status"),
            Some("WAITING".to_string())
        );
    }

    #[test]
    fn test_hitlist_size_is_capped() {
        let provider = provider();
        assert_eq!(provider.hitlist_size(50), 19);
        assert_eq!(provider.hitlist_size(5), 5);
    }
}
