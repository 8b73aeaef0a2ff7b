//! Sliding-window chunking for sequences too large to analyze in one pass,
//! plus the merge step that maps per-chunk results back to global coordinates.

use crate::config::AnalysisConfig;
use crate::orf::Orf;
use crate::search::DatabaseHit;
use serde::{Deserialize, Serialize};

/// A window over the input sequence. `start`/`end` are 0-based half-open
/// offsets into the original sequence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    /// 1-based chunk number.
    pub id: usize,
    pub start: usize,
    pub end: usize,
    pub sequence: String,
    pub total_chunks: usize,
    /// True when the chunk covers the entire input.
    pub complete: bool,
    /// True when the leading region is shared with the previous chunk.
    pub overlap_start: bool,
    /// True when the trailing region is shared with the next chunk.
    pub overlap_end: bool,
}

/// Per-chunk analysis output fed back into [`SequenceChunker::combine`].
/// ORF coordinates are still chunk-local here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkOutcome {
    pub chunk_id: usize,
    pub chunk_start: usize,
    pub chunk_end: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub orfs: Vec<Orf>,
    #[serde(default)]
    pub database_hits: DatabaseHitGroups,
}

/// Hits grouped by the database that produced them.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DatabaseHitGroups {
    pub ncbi_protein: Vec<DatabaseHit>,
    pub ncbi_nucleotide: Vec<DatabaseHit>,
    pub uniprot: Vec<DatabaseHit>,
}

impl DatabaseHitGroups {
    pub fn extend(&mut self, other: DatabaseHitGroups) {
        self.ncbi_protein.extend(other.ncbi_protein);
        self.ncbi_nucleotide.extend(other.ncbi_nucleotide);
        self.uniprot.extend(other.uniprot);
    }

    pub fn total(&self) -> usize {
        self.ncbi_protein.len() + self.ncbi_nucleotide.len() + self.uniprot.len()
    }
}

/// An ORF lifted to global coordinates, tagged with its source chunk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CombinedOrf {
    #[serde(flatten)]
    pub orf: Orf,
    pub source_chunk: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub chunk_id: usize,
    pub start: usize,
    pub end: usize,
    pub success: bool,
    pub orf_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub total_chunks: usize,
    pub successful_chunks: usize,
    pub failed_chunks: usize,
    pub success_rate: String,
}

/// Merge of all chunk outcomes. `success` is always true: individual chunk
/// failures are reported through `stats` and `chunks`, never as an overall
/// failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CombinedAnalysis {
    pub success: bool,
    pub sequence_length: usize,
    pub orfs: Vec<CombinedOrf>,
    pub database_hits: DatabaseHitGroups,
    pub stats: ProcessingStats,
    pub chunks: Vec<ChunkSummary>,
}

pub struct SequenceChunker {
    chunk_size: usize,
    overlap: usize,
    dedup_tolerance: i64,
}

impl SequenceChunker {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.overlap_size,
            dedup_tolerance: config.dedup_tolerance_bp,
        }
    }

    pub fn with_sizes(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
            dedup_tolerance: AnalysisConfig::default().dedup_tolerance_bp,
        }
    }

    /// Split a sequence into overlapping windows. A sequence that fits in a
    /// single window is returned as one complete chunk.
    pub fn chunk(&self, sequence: &str) -> Vec<Chunk> {
        if sequence.is_empty() {
            return vec![];
        }
        let len = sequence.len();
        if len <= self.chunk_size {
            return vec![Chunk {
                id: 1,
                start: 0,
                end: len,
                sequence: sequence.to_string(),
                total_chunks: 1,
                complete: true,
                overlap_start: false,
                overlap_end: false,
            }];
        }

        let step = (self.chunk_size.saturating_sub(self.overlap)).max(1);
        let total = len.saturating_sub(self.overlap).div_ceil(step);

        (0..total)
            .map(|index| {
                let start = index * step;
                let end = (start + self.chunk_size).min(len);
                Chunk {
                    id: index + 1,
                    start,
                    end,
                    sequence: sequence[start..end].to_string(),
                    total_chunks: total,
                    complete: false,
                    overlap_start: start > 0,
                    overlap_end: end < len,
                }
            })
            .collect()
    }

    /// Combine per-chunk outcomes into one report: shift ORFs to global
    /// coordinates, drop duplicates arising from window overlap, and tally
    /// success statistics.
    pub fn combine(&self, sequence_length: usize, outcomes: Vec<ChunkOutcome>) -> CombinedAnalysis {
        let total_chunks = outcomes.len();
        let successful = outcomes.iter().filter(|o| o.success).count();
        let success_rate = if total_chunks == 0 {
            "0.0%".to_string()
        } else {
            format!("{:.1}%", successful as f64 / total_chunks as f64 * 100.0)
        };

        let mut shifted: Vec<CombinedOrf> = vec![];
        let mut database_hits = DatabaseHitGroups::default();
        let mut chunks = vec![];

        for outcome in outcomes {
            chunks.push(ChunkSummary {
                chunk_id: outcome.chunk_id,
                start: outcome.chunk_start,
                end: outcome.chunk_end,
                success: outcome.success,
                orf_count: outcome.orfs.len(),
                error: outcome.error,
            });

            let mut hits = outcome.database_hits;
            for hit in hits
                .ncbi_protein
                .iter_mut()
                .chain(hits.ncbi_nucleotide.iter_mut())
                .chain(hits.uniprot.iter_mut())
            {
                hit.source_chunk = Some(outcome.chunk_id);
            }
            database_hits.extend(hits);

            for mut orf in outcome.orfs {
                orf.start += outcome.chunk_start;
                orf.end += outcome.chunk_start;
                shifted.push(CombinedOrf {
                    orf,
                    source_chunk: outcome.chunk_id,
                });
            }
        }

        // Compare in start order so the kept set does not depend on which
        // chunk reported an ORF first.
        shifted.sort_by_key(|combined| (combined.orf.start, combined.orf.end));
        let mut orfs: Vec<CombinedOrf> = vec![];
        for candidate in shifted {
            if !self.is_duplicate(&orfs, &candidate.orf) {
                orfs.push(candidate);
            }
        }

        orfs.sort_by(|a, b| b.orf.length.cmp(&a.orf.length));

        CombinedAnalysis {
            success: true,
            sequence_length,
            orfs,
            database_hits,
            stats: ProcessingStats {
                total_chunks,
                successful_chunks: successful,
                failed_chunks: total_chunks - successful,
                success_rate,
            },
            chunks,
        }
    }

    fn is_duplicate(&self, kept: &[CombinedOrf], candidate: &Orf) -> bool {
        kept.iter().any(|existing| {
            existing.orf.strand == candidate.strand
                && (existing.orf.start as i64 - candidate.start as i64).abs()
                    <= self.dedup_tolerance
                && (existing.orf.end as i64 - candidate.end as i64).abs() <= self.dedup_tolerance
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_orf(start: usize, end: usize, strand: char) -> Orf {
        Orf {
            start,
            end,
            length: end.saturating_sub(start).saturating_sub(2),
            strand,
            frame: 1,
            sequence: String::new(),
            start_codon: "ATG".to_string(),
            protein_sequence: None,
        }
    }

    fn outcome(chunk: &Chunk, orfs: Vec<Orf>) -> ChunkOutcome {
        ChunkOutcome {
            chunk_id: chunk.id,
            chunk_start: chunk.start,
            chunk_end: chunk.end,
            success: true,
            error: None,
            orfs,
            database_hits: DatabaseHitGroups::default(),
        }
    }

    #[test]
    fn test_short_sequence_single_chunk() {
        let chunker = SequenceChunker::with_sizes(8000, 1000);
        let chunks = chunker.chunk(&"A".repeat(5000));
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].complete);
        assert_eq!(chunks[0].id, 1);
        assert_eq!(chunks[0].total_chunks, 1);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].end, 5000);
        assert!(!chunks[0].overlap_start);
        assert!(!chunks[0].overlap_end);
    }

    #[test]
    fn test_empty_sequence_no_chunks() {
        let chunker = SequenceChunker::with_sizes(8000, 1000);
        assert!(chunker.chunk("").is_empty());
    }

    #[test]
    fn test_chunk_boundaries_and_overlap() {
        let chunker = SequenceChunker::with_sizes(8000, 1000);
        let chunks = chunker.chunk(&"A".repeat(20000));
        let bounds: Vec<(usize, usize)> = chunks.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(bounds, vec![(0, 8000), (7000, 15000), (14000, 20000)]);
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].start, pair[0].end.saturating_sub(1000).max(0));
        }
        assert_eq!(chunks.last().unwrap().end, 20000);

        let ids: Vec<usize> = chunks.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(chunks.iter().all(|c| c.total_chunks == 3));
        let flags: Vec<(bool, bool)> = chunks
            .iter()
            .map(|c| (c.overlap_start, c.overlap_end))
            .collect();
        assert_eq!(flags, vec![(false, true), (true, true), (true, false)]);
    }

    #[test]
    fn test_small_step_still_covers_sequence() {
        let chunker = SequenceChunker::with_sizes(100, 90);
        let chunks = chunker.chunk(&"A".repeat(250));
        assert_eq!(chunks.len(), 16);
        assert_eq!(chunks.last().unwrap().end, 250);
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].start, pair[0].start + 10);
        }
    }

    #[test]
    fn test_step_floor_of_one() {
        // overlap >= chunk_size must not panic or loop
        let chunker = SequenceChunker::with_sizes(100, 100);
        let chunks = chunker.chunk(&"A".repeat(250));
        for pair in chunks.windows(2) {
            assert!(pair[1].start > pair[0].start);
        }
        for chunk in &chunks {
            assert!(chunk.end <= 250);
        }
    }

    #[test]
    fn test_combine_shifts_coordinates() {
        let chunker = SequenceChunker::with_sizes(8000, 1000);
        let chunks = chunker.chunk(&"A".repeat(20000));
        let outcomes = vec![
            outcome(&chunks[0], vec![]),
            outcome(&chunks[1], vec![test_orf(1, 306, '+')]),
            outcome(&chunks[2], vec![]),
        ];
        let combined = chunker.combine(20000, outcomes);
        assert_eq!(combined.orfs.len(), 1);
        assert_eq!(combined.orfs[0].orf.start, 7001);
        assert_eq!(combined.orfs[0].orf.end, 7306);
        assert_eq!(combined.orfs[0].source_chunk, 2);
    }

    #[test]
    fn test_combine_deduplicates_overlap_orfs() {
        let chunker = SequenceChunker::with_sizes(8000, 1000);
        let chunks = chunker.chunk(&"A".repeat(20000));
        // Same ORF seen from both sides of an overlap: global 7101..7406
        let outcomes = vec![
            outcome(&chunks[0], vec![test_orf(7101, 7406, '+')]),
            outcome(&chunks[1], vec![test_orf(101, 406, '+')]),
        ];
        let combined = chunker.combine(20000, outcomes);
        assert_eq!(combined.orfs.len(), 1);
        assert_eq!(combined.orfs[0].source_chunk, 1);
    }

    #[test]
    fn test_dedup_is_order_independent() {
        let chunker = SequenceChunker::with_sizes(8000, 1000);
        // Chain of near-duplicates: b is within tolerance of a, c is within
        // tolerance of b but not of a.
        let a = test_orf(100, 400, '+');
        let b = test_orf(140, 440, '+');
        let c = test_orf(180, 480, '+');

        let starts = |combined: &CombinedAnalysis| {
            let mut starts: Vec<usize> = combined.orfs.iter().map(|o| o.orf.start).collect();
            starts.sort_unstable();
            starts
        };

        let raw = |orfs: Vec<Orf>| ChunkOutcome {
            chunk_id: 1,
            chunk_start: 0,
            chunk_end: 8000,
            success: true,
            error: None,
            orfs,
            database_hits: DatabaseHitGroups::default(),
        };

        let forward = chunker.combine(20000, vec![raw(vec![a.clone(), b.clone(), c.clone()])]);
        let reversed = chunker.combine(20000, vec![raw(vec![b, a, c])]);
        assert_eq!(forward.orfs.len(), 2);
        assert_eq!(starts(&forward), starts(&reversed));
    }

    #[test]
    fn test_combine_tags_hits_with_source_chunk() {
        let chunker = SequenceChunker::with_sizes(8000, 1000);
        let mut groups = DatabaseHitGroups::default();
        groups.uniprot.push(DatabaseHit {
            accession: "P01308".to_string(),
            ..DatabaseHit::default()
        });
        let outcome = ChunkOutcome {
            chunk_id: 2,
            chunk_start: 7000,
            chunk_end: 15000,
            success: true,
            error: None,
            orfs: vec![],
            database_hits: groups,
        };
        let combined = chunker.combine(20000, vec![outcome]);
        assert_eq!(combined.database_hits.uniprot[0].source_chunk, Some(2));
    }

    #[test]
    fn test_dedup_respects_strand_and_tolerance() {
        let chunker = SequenceChunker::with_sizes(8000, 1000);
        let chunks = chunker.chunk(&"A".repeat(20000));
        let outcomes = vec![
            outcome(&chunks[0], vec![test_orf(7101, 7406, '+')]),
            outcome(
                &chunks[1],
                vec![
                    // same coordinates, opposite strand: kept
                    test_orf(101, 406, '-'),
                    // shifted beyond the 50 bp tolerance: kept
                    test_orf(201, 506, '+'),
                ],
            ),
        ];
        let combined = chunker.combine(20000, outcomes);
        assert_eq!(combined.orfs.len(), 3);
    }

    #[test]
    fn test_failed_chunks_reported_not_fatal() {
        let chunker = SequenceChunker::with_sizes(8000, 1000);
        let outcomes = vec![
            ChunkOutcome {
                chunk_id: 1,
                chunk_start: 0,
                chunk_end: 8000,
                success: false,
                error: Some("timeout".to_string()),
                orfs: vec![],
                database_hits: DatabaseHitGroups::default(),
            },
            ChunkOutcome {
                chunk_id: 2,
                chunk_start: 7000,
                chunk_end: 15000,
                success: true,
                error: None,
                orfs: vec![],
                database_hits: DatabaseHitGroups::default(),
            },
        ];
        let combined = chunker.combine(15000, outcomes);
        assert!(combined.success);
        assert_eq!(combined.stats.failed_chunks, 1);
        assert_eq!(combined.stats.success_rate, "50.0%");
        assert_eq!(combined.chunks[0].error.as_deref(), Some("timeout"));
    }
}
