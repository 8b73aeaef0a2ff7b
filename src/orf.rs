//! Open reading frame detection across all six reading frames.
//!
//! Scans the forward strand and the reverse complement, three codon offsets
//! each. Each start codon is consumed by at most one ORF: once a start/stop
//! pairing is emitted (or rejected as too short), the scan resumes after the
//! stop codon, so nested and alternative-start ORFs inside an emitted span
//! are deliberately not reported. Downstream chunk-overlap deduplication
//! relies on this one-ORF-per-pairing behavior.

use crate::config::AnalysisConfig;
use crate::sequence::{clean_and_validate, reverse_complement};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub const STOP_CODONS: [&[u8; 3]; 3] = [b"TAA", b"TAG", b"TGA"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Orf {
    /// 1-based genomic start position.
    pub start: usize,
    /// 1-based genomic end position (covers the stop codon).
    pub end: usize,
    /// Span from start codon up to (excluding) the stop codon, in bases.
    pub length: usize,
    pub strand: char,
    /// Reading frame, 1-3.
    pub frame: u8,
    /// Nucleotide text of the ORF, stop codon included.
    pub sequence: String,
    pub start_codon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein_sequence: Option<String>,
}

impl Orf {
    pub fn orf_id(&self) -> String {
        format!("ORF_{}_{}_{}", self.start, self.end, self.strand)
    }
}

pub struct OrfFinder {
    min_length: usize,
    start_codons: Vec<[u8; 3]>,
}

impl OrfFinder {
    pub fn new(config: &AnalysisConfig) -> Self {
        let mut start_codons = vec![*b"ATG"];
        for codon in &config.alternative_start_codons {
            let bytes = codon.as_bytes();
            if bytes.len() == 3 {
                start_codons.push([bytes[0], bytes[1], bytes[2]]);
            }
        }
        Self {
            min_length: config.min_orf_length,
            start_codons,
        }
    }

    pub fn with_min_length(min_length: usize) -> Self {
        Self {
            min_length,
            start_codons: vec![*b"ATG"],
        }
    }

    /// Find all ORFs of at least the configured minimum length, sorted by
    /// descending length. Invalid input yields an empty list.
    pub fn find_orfs(&self, sequence: &str) -> Vec<Orf> {
        let clean = match clean_and_validate(sequence) {
            Some(clean) => clean,
            None => return vec![],
        };
        let revcomp = reverse_complement(&clean);
        let seq_len = clean.len();

        let passes: [(i8, u8); 6] = [(1, 0), (1, 1), (1, 2), (-1, 0), (-1, 1), (-1, 2)];
        let mut orfs: Vec<Orf> = passes
            .par_iter()
            .flat_map(|&(strand, frame)| {
                let text = if strand == 1 { &clean } else { &revcomp };
                self.scan_frame(text.as_bytes(), frame as usize, strand, seq_len)
            })
            .collect();

        orfs.sort_by(|a, b| b.length.cmp(&a.length));
        orfs
    }

    fn is_start_codon(&self, codon: &[u8]) -> bool {
        codon.len() == 3 && self.start_codons.iter().any(|start| start[..] == *codon)
    }

    fn scan_frame(&self, nuc: &[u8], frame: usize, strand: i8, seq_len: usize) -> Vec<Orf> {
        let mut orfs = vec![];
        if frame >= nuc.len() {
            return orfs;
        }
        let frame_seq = &nuc[frame..];
        let n = frame_seq.len();
        if n <= self.min_length {
            return orfs;
        }

        let mut i = 0;
        while i < n - self.min_length {
            if i + 3 <= n && self.is_start_codon(&frame_seq[i..i + 3]) {
                let mut stop_at = None;
                let mut j = i + 3;
                while j + 3 <= n {
                    if is_stop_codon(&frame_seq[j..j + 3]) {
                        stop_at = Some(j);
                        break;
                    }
                    j += 3;
                }
                if let Some(j) = stop_at {
                    if j - i >= self.min_length {
                        orfs.push(build_orf(frame_seq, i, j, frame, strand, seq_len));
                    }
                    i = j + 3;
                    continue;
                }
            }
            i += 3;
        }
        orfs
    }
}

#[inline(always)]
pub fn is_stop_codon(codon: &[u8]) -> bool {
    codon.len() == 3 && STOP_CODONS.iter().any(|stop| stop[..] == *codon)
}

fn build_orf(
    frame_seq: &[u8],
    start_idx: usize,
    stop_idx: usize,
    frame: usize,
    strand: i8,
    seq_len: usize,
) -> Orf {
    let (start, end) = if strand == 1 {
        (start_idx + frame + 1, stop_idx + frame + 3)
    } else {
        (
            seq_len - (stop_idx + frame + 3) + 1,
            seq_len - (start_idx + frame) + 1,
        )
    };

    let span_end = (stop_idx + 3).min(frame_seq.len());
    Orf {
        start,
        end,
        length: stop_idx - start_idx,
        strand: if strand == 1 { '+' } else { '-' },
        frame: frame as u8 + 1,
        sequence: String::from_utf8_lossy(&frame_seq[start_idx..span_end]).into_owned(),
        start_codon: String::from_utf8_lossy(&frame_seq[start_idx..start_idx + 3]).into_owned(),
        protein_sequence: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward_gene() -> String {
        // 306 bp: ATG, 100 phenylalanine codons, TAA
        format!("ATG{}TAA", "TTT".repeat(100))
    }

    #[test]
    fn test_single_forward_orf() {
        let finder = OrfFinder::with_min_length(300);
        let orfs = finder.find_orfs(&forward_gene());
        assert_eq!(orfs.len(), 1);
        let orf = &orfs[0];
        assert_eq!(orf.start, 1);
        assert_eq!(orf.end, 306);
        assert_eq!(orf.length, 303);
        assert_eq!(orf.strand, '+');
        assert_eq!(orf.frame, 1);
        assert_eq!(orf.start_codon, "ATG");
        assert!(orf.sequence.ends_with("TAA"));
    }

    #[test]
    fn test_invalid_characters_yield_empty() {
        let finder = OrfFinder::with_min_length(300);
        let sequence = format!("ATG{}TAA", "NNN".repeat(150));
        assert!(finder.find_orfs(&sequence).is_empty());
    }

    #[test]
    fn test_minimum_length_enforced() {
        let finder = OrfFinder::with_min_length(300);
        // 150 bp ORF, below the minimum
        let sequence = format!("ATG{}TAA", "TTT".repeat(48));
        assert!(finder.find_orfs(&sequence).is_empty());

        let finder = OrfFinder::with_min_length(100);
        let orfs = finder.find_orfs(&sequence);
        assert_eq!(orfs.len(), 1);
        assert!(orfs[0].length >= 100);
    }

    #[test]
    fn test_reverse_strand_orf() {
        let finder = OrfFinder::with_min_length(300);
        let sequence = crate::sequence::reverse_complement(&forward_gene());
        let orfs = finder.find_orfs(&sequence);
        assert_eq!(orfs.len(), 1);
        let orf = &orfs[0];
        assert_eq!(orf.strand, '-');
        assert_eq!(orf.frame, 1);
        assert_eq!(orf.length, 303);
        assert_eq!(orf.start_codon, "ATG");
    }

    #[test]
    fn test_every_orf_has_valid_codons() {
        let finder = OrfFinder::with_min_length(30);
        // Two genes separated by filler, plus frame noise
        let sequence = format!(
            "CC ATG{}TAA GGGG ATG{}TGA",
            "GCT".repeat(20),
            "AAA".repeat(15)
        );
        let orfs = finder.find_orfs(&sequence);
        assert!(!orfs.is_empty());
        for orf in &orfs {
            assert_eq!(orf.start_codon, "ATG");
            let bytes = orf.sequence.as_bytes();
            assert!(is_stop_codon(&bytes[bytes.len() - 3..]));
            assert!(orf.length >= 30);
            assert_eq!(orf.length % 3, 0);
        }
    }

    #[test]
    fn test_nested_start_is_skipped() {
        // Inner ATG at codon 2 would pair with the same stop; only the outer
        // ORF is reported because scanning resumes after the stop codon.
        let sequence = format!("ATGATG{}TAA", "CTG".repeat(40));
        let finder = OrfFinder::with_min_length(60);
        let orfs: Vec<Orf> = finder
            .find_orfs(&sequence)
            .into_iter()
            .filter(|orf| orf.strand == '+' && orf.frame == 1)
            .collect();
        assert_eq!(orfs.len(), 1);
        assert_eq!(orfs[0].start, 1);
    }

    #[test]
    fn test_sorted_by_descending_length() {
        let sequence = format!(
            "ATG{}TAA{}ATG{}TAA",
            "AAA".repeat(12),
            "G",
            "AAA".repeat(30)
        );
        let finder = OrfFinder::with_min_length(30);
        let orfs = finder.find_orfs(&sequence);
        for pair in orfs.windows(2) {
            assert!(pair[0].length >= pair[1].length);
        }
    }
}
