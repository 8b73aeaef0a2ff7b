//! Nucleotide sequence cleanup, validation, and composition statistics.

use crate::config::AnalysisConfig;
use crate::error::GeneScoutError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Uppercase, strip whitespace, and validate against the DNA alphabet.
///
/// Returns `None` for empty input or input containing anything outside
/// A/T/C/G; callers treat that as "no analyzable sequence", not as a
/// distinguishable error.
pub fn clean_and_validate(sequence: &str) -> Option<String> {
    if sequence.is_empty() {
        return None;
    }
    let clean: String = sequence
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if clean.is_empty() || !clean.bytes().all(|b| matches!(b, b'A' | b'T' | b'C' | b'G')) {
        return None;
    }
    Some(clean)
}

#[inline(always)]
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        other => other,
    }
}

pub fn reverse_complement(sequence: &str) -> String {
    sequence
        .bytes()
        .rev()
        .map(|b| complement(b) as char)
        .collect()
}

/// Nucleotide composition report for a cleaned sequence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SequenceComposition {
    pub length: usize,
    pub gc_content: f64,
    pub nucleotide_counts: HashMap<char, usize>,
    pub nucleotide_percentages: HashMap<char, f64>,
    pub gc_assessment: String,
}

/// Compute GC content and per-base statistics.
///
/// `N` placeholders are dropped before counting. An input with no countable
/// nucleotides is an invalid-input error.
pub fn composition(
    sequence: &str,
    config: &AnalysisConfig,
) -> Result<SequenceComposition, GeneScoutError> {
    let clean: String = sequence
        .chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| *c != 'N' && !c.is_ascii_whitespace())
        .collect();
    if clean.is_empty() {
        return Err(GeneScoutError::InvalidInput(
            "No valid nucleotides found".to_string(),
        ));
    }

    let mut counts: HashMap<char, usize> = HashMap::new();
    for base in ['A', 'T', 'G', 'C'] {
        counts.insert(base, clean.chars().filter(|c| *c == base).count());
    }

    let total = clean.len();
    let gc = counts[&'G'] + counts[&'C'];
    let gc_content = round2(gc as f64 / total as f64 * 100.0);

    let percentages = counts
        .iter()
        .map(|(base, count)| (*base, round2(*count as f64 / total as f64 * 100.0)))
        .collect();

    let gc_assessment = if gc_content < config.gc_low_threshold {
        "Low GC content"
    } else if gc_content > config.gc_high_threshold {
        "High GC content"
    } else {
        "Optimal GC content"
    };

    Ok(SequenceComposition {
        length: total,
        gc_content,
        nucleotide_counts: counts,
        nucleotide_percentages: percentages,
        gc_assessment: gc_assessment.to_string(),
    })
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_and_validate_noise() {
        assert_eq!(
            clean_and_validate(" atg\ncc t\tGA "),
            Some("ATGCCTGA".to_string())
        );
    }

    #[test]
    fn test_clean_and_validate_rejects_non_dna() {
        assert_eq!(clean_and_validate("ATGNNNTAA"), None);
        assert_eq!(clean_and_validate(""), None);
        assert_eq!(clean_and_validate("   "), None);
        assert_eq!(clean_and_validate("ATGXTAA"), None);
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement("ATGC"), "GCAT");
        assert_eq!(reverse_complement("AAATTT"), "AAATTT");
    }

    #[test]
    fn test_composition_counts() {
        let config = AnalysisConfig::default();
        let comp = composition("ATGCNN", &config).unwrap();
        assert_eq!(comp.length, 4);
        assert_eq!(comp.nucleotide_counts[&'A'], 1);
        assert_eq!(comp.gc_content, 50.0);
        assert_eq!(comp.gc_assessment, "Optimal GC content");
    }

    #[test]
    fn test_composition_gc_assessment_bounds() {
        let config = AnalysisConfig::default();
        let low = composition("ATATATATAT", &config).unwrap();
        assert_eq!(low.gc_assessment, "Low GC content");
        let high = composition("GCGCGCGCGC", &config).unwrap();
        assert_eq!(high.gc_assessment, "High GC content");
    }

    #[test]
    fn test_composition_empty_is_error() {
        let config = AnalysisConfig::default();
        assert!(composition("NNNN", &config).is_err());
    }
}
