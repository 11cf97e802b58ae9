//! Column profiles of sub-alignments
//!
//! A profile summarizes one alignment snapshot as a sequence of position
//! records: a weighted residue-frequency distribution, an occupancy
//! fraction, and per-column affine gap-open/gap-close scores. Profiles are
//! always rebuilt from the current alignment, never patched, so they can
//! never go stale against the rows they describe.
//!
//! Gap scores start from half the score model's full open penalty (half is
//! charged when a gap run opens, half when it closes), are reduced where
//! rows already open or close gaps (encouraging gap reuse at existing gap
//! sites), are halved again at the terminal columns, and may be tightened
//! by the hydrophobicity post-pass.

use crate::alphabet::{Alphabet, GAP, MAX_SYMS};
use crate::matrix::ScoreModel;
use crate::msa::Msa;

/// Occupancy threshold above which a column can join a hydrophobic run.
const HYDRO_OCC_THRESHOLD: f32 = 0.999;

/// One profile position.
#[derive(Debug, Clone, Copy)]
pub struct ProfPos {
    /// Weighted residue frequencies, normalized to sum to one over the
    /// non-gap weight of the column (all zero for an all-gap column).
    pub counts: [f32; MAX_SYMS],
    /// Fraction of contributing row weight that is non-gap, in [0, 1].
    pub occupancy: f32,
    /// Score charged when a gap run opens at this column (negative).
    pub gap_open: f32,
    /// Score charged when a gap run closes at this column (negative).
    pub gap_close: f32,
}

/// Column-indexed profile of one alignment snapshot.
#[derive(Debug, Clone)]
pub struct Profile {
    pub cols: Vec<ProfPos>,
    pub alphabet: Alphabet,
}

impl Profile {
    pub fn len(&self) -> usize {
        self.cols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cols.is_empty()
    }
}

/// Sequence weighting scheme used when accumulating profile counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeqWeighting {
    /// Uniform weight 1.0 per row.
    None,
    /// Henikoff position-based weights, down-weighting near-duplicates.
    #[default]
    Henikoff,
}

impl std::str::FromStr for SeqWeighting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(SeqWeighting::None),
            "henikoff" => Ok(SeqWeighting::Henikoff),
            _ => Err(format!(
                "Unknown weighting scheme: {}. Use 'none' or 'henikoff'",
                s
            )),
        }
    }
}

/// Per-row weights for an alignment under the given scheme, normalized to
/// mean 1.0.
pub fn seq_weights(msa: &Msa, scheme: SeqWeighting, alphabet: Alphabet) -> Vec<f32> {
    let n = msa.seq_count();
    match scheme {
        SeqWeighting::None => vec![1.0; n],
        SeqWeighting::Henikoff => henikoff_weights(msa, alphabet),
    }
}

/// Henikoff & Henikoff position-based weights: at each column a residue
/// contributes 1 / (distinct residues x copies of this residue) to its
/// row's weight. Near-duplicate rows split their columns' credit and end
/// up down-weighted.
fn henikoff_weights(msa: &Msa, alphabet: Alphabet) -> Vec<f32> {
    let n = msa.seq_count();
    if n == 0 {
        return Vec::new();
    }
    let cols = msa.col_count();
    let mut weights = vec![0.0f64; n];
    let mut counts = [0u32; MAX_SYMS];
    for col in 0..cols {
        counts.fill(0);
        for row in 0..n {
            let c = msa.row(row).residues[col];
            if c != GAP {
                counts[alphabet.encode(c)] += 1;
            }
        }
        let distinct = counts.iter().filter(|&&c| c > 0).count();
        if distinct == 0 {
            continue;
        }
        for row in 0..n {
            let c = msa.row(row).residues[col];
            if c != GAP {
                let copies = counts[alphabet.encode(c)];
                weights[row] += 1.0 / (distinct as f64 * copies as f64);
            }
        }
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return vec![1.0; n];
    }
    let mean = total / n as f64;
    weights.iter().map(|&w| (w / mean) as f32).collect()
}

/// Build the profile of an alignment snapshot. `weights` must have one
/// entry per row; a single raw sequence yields the degenerate profile
/// (one residue per column, occupancy 1.0, no internal gaps).
pub fn build_profile(msa: &Msa, weights: &[f32], sm: &ScoreModel) -> Profile {
    debug_assert_eq!(weights.len(), msa.seq_count());
    let alphabet = sm.alphabet;
    let cols = msa.col_count();
    let n = msa.seq_count();
    let total_weight: f32 = weights.iter().sum();
    let half_open = sm.gap_open / 2.0;

    let mut out = Vec::with_capacity(cols);
    for col in 0..cols {
        let mut counts = [0.0f32; MAX_SYMS];
        let mut nongap_weight = 0.0f32;
        let mut open_weight = 0.0f32;
        let mut close_weight = 0.0f32;
        for row in 0..n {
            let residues = &msa.row(row).residues;
            let w = weights[row];
            let c = residues[col];
            if c == GAP {
                // Weight of rows whose gap run starts / ends here; such
                // columns should stay cheap to gap in the other profile.
                if col == 0 || residues[col - 1] != GAP {
                    open_weight += w;
                }
                if col + 1 == cols || residues[col + 1] != GAP {
                    close_weight += w;
                }
            } else {
                counts[alphabet.encode(c)] += w;
                nongap_weight += w;
            }
        }
        if nongap_weight > 0.0 {
            for c in counts.iter_mut() {
                *c /= nongap_weight;
            }
        }
        let occupancy = if total_weight > 0.0 {
            nongap_weight / total_weight
        } else {
            0.0
        };
        let open_frac = if total_weight > 0.0 {
            open_weight / total_weight
        } else {
            0.0
        };
        let close_frac = if total_weight > 0.0 {
            close_weight / total_weight
        } else {
            0.0
        };
        out.push(ProfPos {
            counts,
            occupancy,
            gap_open: half_open * (1.0 - open_frac),
            gap_close: half_open * (1.0 - close_frac),
        });
    }
    // Terminal gaps are cheaper: half penalty at the profile's ends.
    if let Some(first) = out.first_mut() {
        first.gap_open *= 0.5;
    }
    if let Some(last) = out.last_mut() {
        last.gap_close *= 0.5;
    }
    Profile {
        cols: out,
        alphabet,
    }
}

/// Hydrophobicity post-pass over a finished profile.
///
/// Scans for runs of columns that are nearly fully occupied and carry a
/// hydrophobic-residue majority. Once a run exceeds `run_length` columns,
/// the gap-open and gap-close scores of its columns are tightened by the
/// attenuation `factor` (a factor below 1.0 strengthens the penalties;
/// the run's first columns are scaled retroactively when the run reaches
/// the threshold). `run_length == 0` disables the pass entirely.
pub fn apply_hydro(profile: &mut Profile, run_length: usize, factor: f32) {
    if run_length == 0 || profile.alphabet != Alphabet::Amino {
        return;
    }
    let mut run = 0usize;
    for col in 0..profile.cols.len() {
        let pp = &profile.cols[col];
        let hydro = pp.occupancy > HYDRO_OCC_THRESHOLD && hydrophobic_majority(pp, profile.alphabet);
        if !hydro {
            run = 0;
            continue;
        }
        run += 1;
        if run > run_length {
            tighten(&mut profile.cols[col], factor);
        } else if run == run_length {
            for n in (col + 1 - run_length)..=col {
                tighten(&mut profile.cols[n], factor);
            }
        }
    }
}

fn hydrophobic_majority(pp: &ProfPos, alphabet: Alphabet) -> bool {
    let mut hydro = 0.0f32;
    let mut total = 0.0f32;
    for (sym, &c) in pp.counts.iter().enumerate() {
        total += c;
        if alphabet.is_hydrophobic(sym) {
            hydro += c;
        }
    }
    total > 0.0 && hydro / total > 0.5
}

fn tighten(pp: &mut ProfPos, factor: f32) {
    pp.gap_open /= factor;
    pp.gap_close /= factor;
}
