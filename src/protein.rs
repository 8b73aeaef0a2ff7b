//! Codon translation and protein physicochemical property analysis.
//!
//! Property calculations follow the classic ProtParam conventions: average
//! residue masses with one water per peptide bond, Henderson-Hasselbalch
//! bisection for the isoelectric point, the Guruprasad dipeptide weights for
//! the instability index, and Kyte-Doolittle hydropathy for GRAVY.

use crate::config::AnalysisConfig;
use crate::error::GeneScoutError;
use crate::sequence::{clean_and_validate, round2, round3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const AMINO_ACIDS: [char; 20] = [
    'A', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V', 'W',
    'Y',
];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProteinProperties {
    pub length: usize,
    pub molecular_weight: f64,
    pub isoelectric_point: f64,
    pub instability_index: f64,
    pub aromaticity: f64,
    /// Residue -> percentage of the cleaned sequence.
    pub amino_acid_composition: HashMap<char, f64>,
    pub gravy: f64,
    pub secondary_structure: SecondaryStructureFractions,
    pub stability: String,
    pub hydrophobicity: String,
}

/// Fractions of residues favoring each secondary structure class.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SecondaryStructureFractions {
    pub helix: f64,
    pub turn: f64,
    pub sheet: f64,
}

/// Translate a nucleotide sequence using the standard genetic code.
///
/// Stop codons become `*`; an incomplete trailing codon is ignored. Invalid
/// input (empty or non-DNA) yields an empty string rather than an error,
/// mirroring the ORF finder's fail-to-empty policy.
pub fn translate(orf_sequence: &str) -> String {
    let clean = match clean_and_validate(orf_sequence) {
        Some(clean) => clean,
        None => return String::new(),
    };
    clean
        .as_bytes()
        .chunks_exact(3)
        .map(codon_to_amino_acid)
        .collect()
}

/// Compute the full property report for a translated protein.
///
/// The trailing stop symbol is stripped first; anything below the configured
/// minimum length, or containing a non-standard residue, is an explicit
/// invalid-sequence error rather than a degenerate report.
pub fn analyze_protein(
    protein_sequence: &str,
    config: &AnalysisConfig,
) -> Result<ProteinProperties, GeneScoutError> {
    if protein_sequence.len() < config.min_protein_length {
        return Err(GeneScoutError::InvalidInput(
            "Protein sequence too short for analysis".to_string(),
        ));
    }

    let clean: String = protein_sequence.chars().filter(|c| *c != '*').collect();
    if clean.is_empty() {
        return Err(GeneScoutError::InvalidInput(
            "No valid amino acids found".to_string(),
        ));
    }
    if let Some(bad) = clean.chars().find(|c| !AMINO_ACIDS.contains(c)) {
        return Err(GeneScoutError::InvalidInput(format!(
            "Non-standard amino acid '{bad}' in protein sequence"
        )));
    }

    let residues = clean.as_bytes();
    let len = residues.len() as f64;

    let molecular_weight = round2(molecular_weight(residues));
    let isoelectric_point = round2(isoelectric_point(residues));
    let instability_index = round2(instability_index(residues));

    let aromatic = residues
        .iter()
        .filter(|&&aa| matches!(aa, b'F' | b'W' | b'Y'))
        .count();
    let aromaticity = round3(aromatic as f64 / len);

    let gravy_score = round3(
        residues
            .iter()
            .map(|&aa| kyte_doolittle(aa))
            .sum::<f64>()
            / len,
    );

    let mut amino_acid_composition = HashMap::new();
    for aa in AMINO_ACIDS {
        let count = clean.chars().filter(|c| *c == aa).count();
        amino_acid_composition.insert(aa, round2(count as f64 / len * 100.0));
    }

    let stability = if instability_index < config.instability_stable_threshold {
        "Stable"
    } else {
        "Unstable"
    };
    let hydrophobicity = if gravy_score > config.hydrophobic_gravy_threshold {
        "Hydrophobic"
    } else {
        "Hydrophilic"
    };

    Ok(ProteinProperties {
        length: residues.len(),
        molecular_weight,
        isoelectric_point,
        instability_index,
        aromaticity,
        amino_acid_composition,
        gravy: gravy_score,
        secondary_structure: secondary_structure_fractions(residues),
        stability: stability.to_string(),
        hydrophobicity: hydrophobicity.to_string(),
    })
}

fn codon_to_amino_acid(codon: &[u8]) -> char {
    match codon {
        b"TTT" | b"TTC" => 'F',
        b"TTA" | b"TTG" | b"CTT" | b"CTC" | b"CTA" | b"CTG" => 'L',
        b"ATT" | b"ATC" | b"ATA" => 'I',
        b"ATG" => 'M',
        b"GTT" | b"GTC" | b"GTA" | b"GTG" => 'V',
        b"TCT" | b"TCC" | b"TCA" | b"TCG" | b"AGT" | b"AGC" => 'S',
        b"CCT" | b"CCC" | b"CCA" | b"CCG" => 'P',
        b"ACT" | b"ACC" | b"ACA" | b"ACG" => 'T',
        b"GCT" | b"GCC" | b"GCA" | b"GCG" => 'A',
        b"TAT" | b"TAC" => 'Y',
        b"TAA" | b"TAG" | b"TGA" => '*',
        b"CAT" | b"CAC" => 'H',
        b"CAA" | b"CAG" => 'Q',
        b"AAT" | b"AAC" => 'N',
        b"AAA" | b"AAG" => 'K',
        b"GAT" | b"GAC" => 'D',
        b"GAA" | b"GAG" => 'E',
        b"TGT" | b"TGC" => 'C',
        b"TGG" => 'W',
        b"CGT" | b"CGC" | b"CGA" | b"CGG" | b"AGA" | b"AGG" => 'R',
        b"GGT" | b"GGC" | b"GGA" | b"GGG" => 'G',
        _ => 'X',
    }
}

/// Average free amino acid masses (Da); one water is removed per peptide bond.
fn residue_weight(aa: u8) -> f64 {
    match aa {
        b'A' => 89.09,
        b'C' => 121.16,
        b'D' => 133.10,
        b'E' => 147.13,
        b'F' => 165.19,
        b'G' => 75.03,
        b'H' => 155.16,
        b'I' => 131.17,
        b'K' => 146.19,
        b'L' => 131.17,
        b'M' => 149.21,
        b'N' => 132.12,
        b'P' => 115.13,
        b'Q' => 146.15,
        b'R' => 174.20,
        b'S' => 105.09,
        b'T' => 119.12,
        b'V' => 117.15,
        b'W' => 204.23,
        b'Y' => 181.19,
        _ => 0.0,
    }
}

const WATER: f64 = 18.015;

fn molecular_weight(residues: &[u8]) -> f64 {
    let sum: f64 = residues.iter().map(|&aa| residue_weight(aa)).sum();
    sum - (residues.len() as f64 - 1.0) * WATER
}

/// Kyte-Doolittle (1982) hydropathy values.
fn kyte_doolittle(aa: u8) -> f64 {
    match aa {
        b'A' => 1.8,
        b'C' => 2.5,
        b'D' => -3.5,
        b'E' => -3.5,
        b'F' => 2.8,
        b'G' => -0.4,
        b'H' => -3.2,
        b'I' => 4.5,
        b'K' => -3.9,
        b'L' => 3.8,
        b'M' => 1.9,
        b'N' => -3.5,
        b'P' => -1.6,
        b'Q' => -3.5,
        b'R' => -4.5,
        b'S' => -0.8,
        b'T' => -0.7,
        b'V' => 4.2,
        b'W' => -0.9,
        b'Y' => -1.3,
        _ => 0.0,
    }
}

// EMBOSS pKa values for the ionizable groups.
const PKA_NTERM: f64 = 9.69;
const PKA_CTERM: f64 = 2.34;
const PKA_D: f64 = 3.65;
const PKA_E: f64 = 4.25;
const PKA_C: f64 = 8.18;
const PKA_Y: f64 = 10.07;
const PKA_H: f64 = 6.00;
const PKA_K: f64 = 10.53;
const PKA_R: f64 = 12.48;

fn net_charge(residues: &[u8], ph: f64) -> f64 {
    let mut charge = 0.0;
    charge += 1.0 / (1.0 + 10_f64.powf(ph - PKA_NTERM));
    charge -= 1.0 / (1.0 + 10_f64.powf(PKA_CTERM - ph));
    for &aa in residues {
        match aa {
            b'D' => charge -= 1.0 / (1.0 + 10_f64.powf(PKA_D - ph)),
            b'E' => charge -= 1.0 / (1.0 + 10_f64.powf(PKA_E - ph)),
            b'C' => charge -= 1.0 / (1.0 + 10_f64.powf(PKA_C - ph)),
            b'Y' => charge -= 1.0 / (1.0 + 10_f64.powf(PKA_Y - ph)),
            b'H' => charge += 1.0 / (1.0 + 10_f64.powf(ph - PKA_H)),
            b'K' => charge += 1.0 / (1.0 + 10_f64.powf(ph - PKA_K)),
            b'R' => charge += 1.0 / (1.0 + 10_f64.powf(ph - PKA_R)),
            _ => {}
        }
    }
    charge
}

/// Isoelectric point via bisection on the net-charge equation.
fn isoelectric_point(residues: &[u8]) -> f64 {
    let mut lo = 0.0_f64;
    let mut hi = 14.0_f64;
    for _ in 0..100 {
        let mid = (lo + hi) / 2.0;
        let charge = net_charge(residues, mid);
        if charge.abs() < 0.001 {
            return mid;
        }
        if charge > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (lo + hi) / 2.0
}

/// Guruprasad et al. (1990) instability index: 10/L times the sum of
/// dipeptide instability weights over consecutive residue pairs.
fn instability_index(residues: &[u8]) -> f64 {
    if residues.len() < 2 {
        return 0.0;
    }
    let sum: f64 = residues
        .windows(2)
        .map(|pair| dipeptide_weight(pair[0], pair[1]))
        .sum();
    10.0 / residues.len() as f64 * sum
}

/// Dipeptide instability weight values (DIWV). Pairs not listed carry the
/// default weight of 1.0.
fn dipeptide_weight(first: u8, second: u8) -> f64 {
    match (first, second) {
        (b'A', b'C') => 44.94,
        (b'A', b'D') => -7.49,
        (b'A', b'H') => -7.49,
        (b'A', b'P') => 20.26,
        (b'C', b'D') => 20.26,
        (b'C', b'H') => 33.60,
        (b'C', b'L') => 20.26,
        (b'C', b'M') => 33.60,
        (b'C', b'P') => 20.26,
        (b'C', b'Q') => -6.54,
        (b'C', b'T') => 33.60,
        (b'C', b'V') => -6.54,
        (b'C', b'W') => 24.68,
        (b'D', b'F') => -6.54,
        (b'D', b'K') => -7.49,
        (b'D', b'R') => -6.54,
        (b'D', b'S') => 20.26,
        (b'D', b'T') => -14.03,
        (b'E', b'C') => 44.94,
        (b'E', b'D') => 20.26,
        (b'E', b'E') => 33.60,
        (b'E', b'H') => -6.54,
        (b'E', b'I') => 20.26,
        (b'E', b'P') => 20.26,
        (b'E', b'Q') => 20.26,
        (b'E', b'S') => 20.26,
        (b'E', b'W') => -14.03,
        (b'F', b'D') => 13.34,
        (b'F', b'K') => -14.03,
        (b'F', b'P') => 20.26,
        (b'F', b'Y') => 33.60,
        (b'G', b'A') => -7.49,
        (b'G', b'E') => -6.54,
        (b'G', b'G') => 13.34,
        (b'G', b'I') => -7.49,
        (b'G', b'K') => -7.49,
        (b'G', b'N') => -7.49,
        (b'G', b'T') => -7.49,
        (b'G', b'W') => 13.34,
        (b'G', b'Y') => -7.49,
        (b'H', b'F') => -9.37,
        (b'H', b'G') => -9.37,
        (b'H', b'I') => 44.94,
        (b'H', b'K') => 24.68,
        (b'H', b'N') => 24.68,
        (b'H', b'P') => -1.88,
        (b'H', b'T') => -6.54,
        (b'H', b'W') => -1.88,
        (b'H', b'Y') => 44.94,
        (b'I', b'E') => 44.94,
        (b'I', b'H') => 13.34,
        (b'I', b'K') => -7.49,
        (b'I', b'L') => 20.26,
        (b'I', b'P') => -1.88,
        (b'I', b'V') => -7.49,
        (b'K', b'G') => -7.49,
        (b'K', b'I') => -7.49,
        (b'K', b'L') => -7.49,
        (b'K', b'M') => 33.60,
        (b'K', b'P') => -6.54,
        (b'K', b'Q') => 24.64,
        (b'K', b'R') => 33.60,
        (b'K', b'V') => -7.49,
        (b'L', b'K') => -7.49,
        (b'L', b'P') => 20.26,
        (b'L', b'Q') => 33.60,
        (b'L', b'R') => 20.26,
        (b'L', b'W') => 24.68,
        (b'M', b'A') => 13.34,
        (b'M', b'H') => 58.28,
        (b'M', b'M') => -1.88,
        (b'M', b'P') => 44.94,
        (b'M', b'Q') => -6.54,
        (b'M', b'R') => -6.54,
        (b'M', b'S') => 44.94,
        (b'M', b'T') => -1.88,
        (b'M', b'Y') => 24.68,
        (b'N', b'C') => -1.88,
        (b'N', b'F') => -14.03,
        (b'N', b'G') => -14.03,
        (b'N', b'I') => 44.94,
        (b'N', b'K') => 24.68,
        (b'N', b'P') => -1.88,
        (b'N', b'Q') => -6.54,
        (b'N', b'T') => -7.49,
        (b'N', b'W') => -9.37,
        (b'P', b'A') => 20.26,
        (b'P', b'C') => -6.54,
        (b'P', b'D') => -6.54,
        (b'P', b'E') => 18.38,
        (b'P', b'F') => 20.26,
        (b'P', b'M') => -6.54,
        (b'P', b'P') => 20.26,
        (b'P', b'Q') => 20.26,
        (b'P', b'R') => -6.54,
        (b'P', b'S') => 20.26,
        (b'P', b'V') => 20.26,
        (b'P', b'W') => -1.88,
        (b'Q', b'C') => -6.54,
        (b'Q', b'D') => 20.26,
        (b'Q', b'E') => 20.26,
        (b'Q', b'F') => -6.54,
        (b'Q', b'P') => 20.26,
        (b'Q', b'Q') => 20.26,
        (b'Q', b'S') => 44.94,
        (b'Q', b'V') => -6.54,
        (b'Q', b'Y') => -6.54,
        (b'R', b'G') => -7.49,
        (b'R', b'H') => 20.26,
        (b'R', b'N') => 13.34,
        (b'R', b'P') => 20.26,
        (b'R', b'Q') => 20.26,
        (b'R', b'R') => 58.28,
        (b'R', b'S') => 44.94,
        (b'R', b'W') => 58.28,
        (b'R', b'Y') => -6.54,
        (b'S', b'C') => 33.60,
        (b'S', b'E') => 20.26,
        (b'S', b'P') => 44.94,
        (b'S', b'Q') => 20.26,
        (b'S', b'R') => 20.26,
        (b'S', b'S') => 20.26,
        (b'T', b'E') => 20.26,
        (b'T', b'F') => 13.34,
        (b'T', b'G') => -7.49,
        (b'T', b'N') => -14.03,
        (b'T', b'Q') => -6.54,
        (b'T', b'W') => -14.03,
        (b'V', b'D') => -14.03,
        (b'V', b'G') => -7.49,
        (b'V', b'K') => -1.88,
        (b'V', b'P') => 20.26,
        (b'V', b'T') => -7.49,
        (b'V', b'Y') => -6.54,
        (b'W', b'A') => -14.03,
        (b'W', b'G') => -9.37,
        (b'W', b'H') => 24.68,
        (b'W', b'L') => 13.34,
        (b'W', b'M') => 24.68,
        (b'W', b'N') => 13.34,
        (b'W', b'T') => -14.03,
        (b'W', b'V') => -7.49,
        (b'Y', b'A') => 24.68,
        (b'Y', b'D') => 24.68,
        (b'Y', b'E') => -6.54,
        (b'Y', b'G') => -7.49,
        (b'Y', b'H') => 13.34,
        (b'Y', b'M') => 44.94,
        (b'Y', b'P') => 13.34,
        (b'Y', b'R') => -15.91,
        (b'Y', b'T') => -7.49,
        (b'Y', b'W') => -9.37,
        (b'Y', b'Y') => 13.34,
        _ => 1.0,
    }
}

/// ProtParam-style secondary structure fractions: residues favoring helix
/// (V,I,Y,F,W,L), turn (N,P,G,S), and sheet (E,M,A,L).
fn secondary_structure_fractions(residues: &[u8]) -> SecondaryStructureFractions {
    let len = residues.len() as f64;
    let count = |set: &[u8]| residues.iter().filter(|aa| set.contains(aa)).count() as f64;
    SecondaryStructureFractions {
        helix: round3(count(b"VIYFWL") / len),
        turn: round3(count(b"NPGS") / len),
        sheet: round3(count(b"EMAL") / len),
    }
}
