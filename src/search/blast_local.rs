//! Protein search against a local Swiss-Prot BLAST database.
//!
//! On first use the provider downloads the Swiss-Prot FASTA release, builds a
//! BLAST database with `makeblastdb`, and from then on reuses the on-disk
//! files. Queries run through the `blastp` binary with tabular output.

use super::{
    finish_hit, validate_query, DatabaseHit, DatabaseKind, GeneNameExtractor, SearchOutcome,
    SearchProvider, SearchQuery, SearchType,
};
use crate::config::AnalysisConfig;
use crate::error::GeneScoutError;
use flate2::read::GzDecoder;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

const PROVIDER_NAME: &str = "blast_local";

/// Tabular output columns requested from blastp.
const OUTFMT: &str = "6 qseqid sseqid pident length mismatch gapopen \
                      qstart qend sstart send evalue bitscore stitle";

pub struct BlastLocalProvider {
    config: AnalysisConfig,
    extractor: GeneNameExtractor,
}

impl BlastLocalProvider {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            extractor: GeneNameExtractor::new(),
        }
    }

    fn database_path(&self) -> PathBuf {
        Path::new(&self.config.blast_database_dir).join(&self.config.blast_database_name)
    }

    fn database_exists(&self) -> bool {
        let base = self.database_path();
        ["phr", "pin", "psq"]
            .iter()
            .all(|ext| base.with_extension(ext).exists())
    }

    /// Download and index Swiss-Prot unless the database files already exist.
    fn ensure_database(&self) -> Result<PathBuf, GeneScoutError> {
        let base = self.database_path();
        if self.database_exists() {
            tracing::debug!(db = %base.display(), "using existing BLAST database");
            return Ok(base);
        }

        tracing::info!("BLAST database not found, downloading Swiss-Prot");
        let db_dir = Path::new(&self.config.blast_database_dir);
        fs::create_dir_all(db_dir)?;

        let fasta_path = base.with_extension("fasta");
        self.download_fasta(&fasta_path)?;
        self.make_blast_db(&fasta_path, &base)?;
        Ok(base)
    }

    fn download_fasta(&self, fasta_path: &Path) -> Result<(), GeneScoutError> {
        let client = super::http_client(&self.config)?;
        let response = client
            .get(&self.config.swissprot_fasta_url)
            .timeout(std::time::Duration::from_secs(600))
            .send()?
            .error_for_status()?;

        let mut decoder = GzDecoder::new(response);
        let mut out = fs::File::create(fasta_path)?;
        std::io::copy(&mut decoder, &mut out)?;

        let size_mb = fs::metadata(fasta_path)?.len() as f64 / 1024.0 / 1024.0;
        tracing::info!(size_mb, "downloaded Swiss-Prot FASTA");
        Ok(())
    }

    fn make_blast_db(&self, fasta_path: &Path, base: &Path) -> Result<(), GeneScoutError> {
        tracing::info!("building BLAST database");
        let output = Command::new("makeblastdb")
            .arg("-in")
            .arg(fasta_path)
            .arg("-dbtype")
            .arg("prot")
            .arg("-out")
            .arg(base)
            .output()?;
        if !output.status.success() {
            return Err(GeneScoutError::Network(format!(
                "makeblastdb failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }

    fn run_blastp(
        &self,
        protein: &str,
        db_path: &Path,
        max_results: usize,
    ) -> Result<Vec<DatabaseHit>, GeneScoutError> {
        let mut query_file = tempfile::Builder::new().suffix(".fasta").tempfile()?;
        writeln!(query_file, ">query\n{protein}")?;

        tracing::info!(residues = protein.len(), "running local BLAST search");
        let output = Command::new("blastp")
            .arg("-query")
            .arg(query_file.path())
            .arg("-db")
            .arg(db_path)
            .arg("-outfmt")
            .arg(OUTFMT)
            .arg("-max_target_seqs")
            .arg(max_results.to_string())
            .arg("-evalue")
            .arg(self.config.blast_evalue_threshold.to_string())
            .arg("-num_threads")
            .arg(self.config.blast_num_threads.to_string())
            .arg("-word_size")
            .arg(self.config.blast_protein_word_size.to_string())
            .arg("-threshold")
            .arg(self.config.blast_score_threshold.to_string())
            .output()?;

        if !output.status.success() {
            return Err(GeneScoutError::Network(format!(
                "blastp failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        self.parse_tabular(&String::from_utf8_lossy(&output.stdout))
    }

    /// Parse blastp `-outfmt 6` tab-separated output into standardized hits.
    fn parse_tabular(&self, output: &str) -> Result<Vec<DatabaseHit>, GeneScoutError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(output.as_bytes());

        let mut hits = vec![];
        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping malformed BLAST line");
                    continue;
                }
            };
            if record.len() < 13 {
                continue;
            }
            let hit = DatabaseHit {
                database: DatabaseKind::SwissprotLocal.as_str().to_string(),
                accession: record[1].to_string(),
                description: record[12].to_string(),
                e_value: record[10].parse().ok(),
                score: record[11].parse().ok(),
                identity: record[2].parse().ok(),
                length: record[3].parse().ok(),
                query_start: record[6].parse().ok(),
                query_end: record[7].parse().ok(),
                subject_start: record[8].parse().ok(),
                subject_end: record[9].parse().ok(),
                ..DatabaseHit::default()
            };
            hits.push(finish_hit(hit, &self.extractor, &self.config));
        }
        Ok(hits)
    }
}

impl SearchProvider for BlastLocalProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn database(&self) -> DatabaseKind {
        DatabaseKind::SwissprotLocal
    }

    fn setup(&mut self) -> Result<bool, GeneScoutError> {
        let available = Command::new("blastp").arg("-version").output().is_ok()
            && Command::new("makeblastdb").arg("-version").output().is_ok();
        if !available {
            tracing::warn!("BLAST+ binaries not found on PATH");
        }
        Ok(available)
    }

    fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, GeneScoutError> {
        let clean = match validate_query(query, &self.config) {
            Ok(clean) => clean,
            Err(err) => return Ok(SearchOutcome::failed(PROVIDER_NAME, err.to_string())),
        };
        if query.search_type != SearchType::Protein {
            return Ok(SearchOutcome::failed(
                PROVIDER_NAME,
                "local BLAST only supports protein search",
            ));
        }

        let result = self
            .ensure_database()
            .and_then(|db_path| self.run_blastp(&clean, &db_path, query.max_results));
        match result {
            Ok(hits) => Ok(SearchOutcome::found(PROVIDER_NAME, hits)),
            Err(err) => {
                tracing::error!(error = %err, "local BLAST search failed");
                Ok(SearchOutcome::failed(PROVIDER_NAME, err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> BlastLocalProvider {
        BlastLocalProvider::new(AnalysisConfig::default())
    }

    #[test]
    fn test_parse_tabular_output() {
        let output = "query\tsp|P01308|INS_HUMAN\t98.5\t110\t1\t0\t1\t110\t1\t110\t\
                      1e-75\t220.0\tInsulin OS=Homo sapiens GN=INS\n";
        let hits = provider().parse_tabular(output).unwrap();
        assert_eq!(hits.len(), 1);
        let hit = &hits[0];
        assert_eq!(hit.accession, "sp|P01308|INS_HUMAN");
        assert_eq!(hit.e_value, Some(1e-75));
        assert_eq!(hit.identity, Some(98.5));
        assert_eq!(hit.length, Some(110));
        assert_eq!(hit.query_start, Some(1));
        assert_eq!(hit.query_end, Some(110));
        assert_eq!(hit.subject_start, Some(1));
        assert_eq!(hit.subject_end, Some(110));
        assert_eq!(hit.gene_names, vec!["INS".to_string()]);
        assert_eq!(hit.confidence, "Very High");
        // Tabular output carries no organism column
        assert_eq!(hit.organism, "Unknown");
    }

    #[test]
    fn test_parse_skips_short_lines() {
        let output = "query\tonly\tthree\n";
        assert!(provider().parse_tabular(output).unwrap().is_empty());
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(provider().parse_tabular("").unwrap().is_empty());
    }

    #[test]
    fn test_nucleotide_query_rejected() {
        let outcome = provider()
            .search(&SearchQuery::nucleotide("ATGCATGCATGC", 5))
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("protein"));
    }

    #[test]
    fn test_database_file_layout() {
        let path = provider().database_path();
        assert_eq!(path, PathBuf::from("blast_databases/swissprot"));
    }
}
