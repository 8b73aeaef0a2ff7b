//! Gene symbol extraction from database hit descriptions.
//!
//! Hit titles come in many shapes (Swiss-Prot `GN=` tags, GenBank
//! `[gene=...]` qualifiers, pipe-delimited FASTA headers, free prose). The
//! extractor tries an ordered chain of patterns and returns the first
//! candidate that survives the validity filter.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Ordered by reliability: explicit gene tags first, prose last.
    static ref NAME_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)GN=([A-Za-z0-9_]+)").unwrap(),
        Regex::new(r"(?i)\[gene=(\w+)\]").unwrap(),
        Regex::new(r"(?i)gene=(\w+)").unwrap(),
        Regex::new(r"(?i)Gene=(\w+)").unwrap(),
        Regex::new(r"(?i)\((\w+)\)").unwrap(),
        Regex::new(r"(?i)(\w+)\s+gene").unwrap(),
        Regex::new(r"(?i)(\w+)\s+protein").unwrap(),
        Regex::new(r"(?i)RecName:\s*Full=([^;\[\]]+)").unwrap(),
        Regex::new(r"(?i)Short=([^;\[\]]+)").unwrap(),
    ];
    static ref CAPITALIZED_WORD: Regex = Regex::new(r"\b[A-Z][A-Za-z0-9]{2,}\b").unwrap();
    /// Accession-style identifiers, e.g. Q5NVH5.2 or P02768.
    static ref ACCESSION: Regex = Regex::new(r"^[A-Z]\d[A-Z0-9]{3,8}(\.\d+)?$").unwrap();
    static ref PRO_ID: Regex = Regex::new(r"^PRO\d+$").unwrap();
    static ref TRAILING_BRACKET: Regex = Regex::new(r"\s*\[[^\]]*\]\s*$").unwrap();
    static ref NAME_PREFIX: Regex =
        Regex::new(r"^(gene_|protein_|hypothetical_|predicted_|putative_)").unwrap();
    static ref NAME_SUFFIX: Regex = Regex::new(r"(_gene|_protein|_predicted|_putative)$").unwrap();
}

/// Descriptive words that are never gene symbols.
const GENERIC_TERMS: &[&str] = &[
    "unknown",
    "protein",
    "putative",
    "uncharacterized",
    "pro",
    "communis",
    "filament-binding",
    "murc",
    "ddl",
    "gvqw1",
    "subunit",
    "cadherin-20",
    "c16orf89",
    "binding",
    "transporter",
    "synthase",
    "ligase",
    "transferase",
    "reductase",
    "oxidase",
    "dehydrogenase",
    "complex",
    "assembly",
    "precursor",
    "flags",
    "recname",
    "short",
    "full",
    "os",
    "pe",
    "sv",
    "tr",
    "sp",
    "mrna",
    "cdna",
    "partial",
    "complete",
];

#[derive(Default)]
pub struct GeneNameExtractor;

impl GeneNameExtractor {
    pub fn new() -> Self {
        Self
    }

    /// First plausible gene symbol in a hit title, or `None`.
    pub fn best_name(&self, title: &str) -> Option<String> {
        if title.is_empty() {
            return None;
        }

        for pattern in NAME_PATTERNS.iter() {
            if let Some(captures) = pattern.captures(title) {
                let candidate = captures[1].trim();
                if self.is_valid(candidate) {
                    return Some(candidate.to_string());
                }
            }
        }

        // Pipe-delimited FASTA headers: sp|P01308|INS_HUMAN
        let pipe_parts: Vec<&str> = title.split('|').collect();
        if pipe_parts.len() >= 3 {
            if let Some(candidate) = pipe_parts[2].split('_').next() {
                if self.is_valid(candidate) {
                    return Some(candidate.to_string());
                }
            }
        }

        for word in CAPITALIZED_WORD.find_iter(title) {
            if self.is_valid(word.as_str()) {
                return Some(word.as_str().to_string());
            }
        }

        None
    }

    /// Gene names from a hit title as a list, for standardized hits.
    pub fn extract(&self, title: &str) -> Vec<String> {
        self.best_name(title).into_iter().collect()
    }

    /// Reject identifiers, generic vocabulary, and number-heavy tokens.
    pub fn is_valid(&self, name: &str) -> bool {
        if name.len() < 3 {
            return false;
        }
        if ACCESSION.is_match(name) {
            return false;
        }
        if GENERIC_TERMS.contains(&name.to_lowercase().as_str()) {
            return false;
        }
        let digits = name.chars().filter(|c| c.is_ascii_digit()).count();
        digits * 2 <= name.len()
    }

    /// Normalize and filter a collected list of candidate names: strip
    /// trailing bracketed qualifiers and boilerplate affixes, uppercase, and
    /// drop anything that no longer looks like a symbol. Order-preserving
    /// dedup.
    pub fn clean_names(&self, names: &[String]) -> Vec<String> {
        let mut cleaned: Vec<String> = vec![];
        for name in names {
            if name.len() < 2 {
                continue;
            }
            let stripped = TRAILING_BRACKET.replace(name, "").to_lowercase();
            let stripped = NAME_PREFIX.replace(&stripped, "");
            let stripped = NAME_SUFFIX.replace(&stripped, "");
            let upper = stripped.trim().to_uppercase();

            if matches!(
                upper.as_str(),
                "HOMO" | "SAPIENS" | "PROTEIN" | "PUTATIVE" | "UNCHARACTERIZED" | "PRO" | "UNKNOWN"
            ) {
                continue;
            }
            if ACCESSION.is_match(&upper) {
                continue;
            }
            if PRO_ID.is_match(&upper) && upper.len() <= 6 {
                continue;
            }
            if upper.len() < 3 {
                continue;
            }
            let digits = upper.chars().filter(|c| c.is_ascii_digit()).count();
            if digits * 2 > upper.len() {
                continue;
            }
            if !cleaned.contains(&upper) {
                cleaned.push(upper);
            }
        }
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swissprot_gn_tag() {
        let extractor = GeneNameExtractor::new();
        let title = "Insulin OS=Homo sapiens OX=9606 GN=INS PE=1 SV=1";
        assert_eq!(extractor.best_name(title), Some("INS".to_string()));
    }

    #[test]
    fn test_genbank_gene_qualifier() {
        let extractor = GeneNameExtractor::new();
        let title = "epidermal growth factor receptor [gene=EGFR] [Homo sapiens]";
        assert_eq!(extractor.best_name(title), Some("EGFR".to_string()));
    }

    #[test]
    fn test_parenthesized_symbol() {
        let extractor = GeneNameExtractor::new();
        assert_eq!(
            extractor.best_name("actin beta (ACTB), mRNA"),
            Some("ACTB".to_string())
        );
    }

    #[test]
    fn test_word_before_gene() {
        let extractor = GeneNameExtractor::new();
        assert_eq!(
            extractor.best_name("Homo sapiens BRCA1 gene, complete cds"),
            Some("BRCA1".to_string())
        );
    }

    #[test]
    fn test_pipe_delimited_header() {
        let extractor = GeneNameExtractor::new();
        assert_eq!(
            extractor.best_name("sp|P01308|INS_HUMAN"),
            Some("INS".to_string())
        );
    }

    #[test]
    fn test_accessions_are_not_gene_names() {
        let extractor = GeneNameExtractor::new();
        assert!(!extractor.is_valid("Q5NVH5.2"));
        assert!(!extractor.is_valid("P02768"));
        assert!(!extractor.is_valid("IN"));
        assert!(!extractor.is_valid("protein"));
        assert!(!extractor.is_valid("A1B2C3"));
        assert!(extractor.is_valid("BRCA1"));
        assert!(extractor.is_valid("TP53"));
    }

    #[test]
    fn test_no_candidate_in_generic_description() {
        let extractor = GeneNameExtractor::new();
        assert_eq!(extractor.best_name(""), None);
    }

    #[test]
    fn test_clean_names_normalizes_and_dedups() {
        let extractor = GeneNameExtractor::new();
        let raw = vec![
            "brca1".to_string(),
            "BRCA1".to_string(),
            "gene_tp53".to_string(),
            "Homo".to_string(),
            "P02768".to_string(),
            "Unknown".to_string(),
            "INS [Homo sapiens]".to_string(),
        ];
        assert_eq!(
            extractor.clean_names(&raw),
            vec!["BRCA1".to_string(), "TP53".to_string(), "INS".to_string()]
        );
    }
}
