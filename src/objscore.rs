//! Alignment objective score
//!
//! Weighted sum-of-pairs score used by refinement to decide whether a
//! candidate re-alignment replaces the current one. Each row pair is
//! scored over its pairwise projection (columns where both rows are gap
//! are dropped): substitution scores where both rows hold residues, and
//! an affine charge per maximal single-sided gap run. Terminal gap runs
//! are charged at half cost, matching the profile builder's terminal
//! discount.

use crate::alphabet::GAP;
use crate::matrix::ScoreModel;
use crate::msa::Msa;

/// Affine cost of the gap runs on one side of a projected row pair.
/// `gapped[k]` tells whether this side is gap at projected column `k`.
fn gap_run_score(gapped: &[bool], sm: &ScoreModel) -> f32 {
    let n = gapped.len();
    let mut score = 0.0f32;
    let mut k = 0usize;
    while k < n {
        if !gapped[k] {
            k += 1;
            continue;
        }
        let start = k;
        while k < n && gapped[k] {
            k += 1;
        }
        let len = k - start;
        let mut run = sm.gap_open + sm.gap_extend * (len - 1) as f32;
        if start == 0 || k == n {
            run /= 2.0;
        }
        score += run;
    }
    score
}

/// Score one pair of aligned rows.
fn pair_rows_score(x: &[u8], y: &[u8], sm: &ScoreModel) -> f32 {
    let alphabet = sm.alphabet;
    let mut subs = 0.0f32;
    let mut gx = Vec::with_capacity(x.len());
    let mut gy = Vec::with_capacity(y.len());
    for (&cx, &cy) in x.iter().zip(y.iter()) {
        let xg = cx == GAP;
        let yg = cy == GAP;
        if xg && yg {
            continue;
        }
        gx.push(xg);
        gy.push(yg);
        if !xg && !yg {
            subs += sm.score(alphabet.encode(cx), alphabet.encode(cy));
        }
    }
    subs + gap_run_score(&gx, sm) + gap_run_score(&gy, sm)
}

/// Weighted sum-of-pairs objective of a full alignment.
pub fn sp_score(msa: &Msa, weights: &[f32], sm: &ScoreModel) -> f32 {
    debug_assert_eq!(weights.len(), msa.seq_count());
    let n = msa.seq_count();
    let mut total = 0.0f32;
    for i in 0..n {
        for j in (i + 1)..n {
            total += weights[i]
                * weights[j]
                * pair_rows_score(&msa.row(i).residues, &msa.row(j).residues, sm);
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::msa::AlignedRow;

    fn msa(rows: &[&str]) -> Msa {
        Msa::from_rows(
            rows.iter()
                .enumerate()
                .map(|(i, s)| AlignedRow {
                    id: i as u32,
                    name: format!("seq{}", i),
                    residues: s.as_bytes().to_vec(),
                })
                .collect(),
        )
        .unwrap()
    }

    fn amino_model() -> ScoreModel {
        ScoreModel::for_alphabet(Alphabet::Amino)
    }

    #[test]
    fn test_identical_rows_score_matches_table() {
        let sm = amino_model();
        let m = msa(&["AC", "AC"]);
        let expected = sm.score(0, 0) + sm.score(1, 1);
        assert_eq!(sp_score(&m, &[1.0, 1.0], &sm), expected);
    }

    #[test]
    fn test_internal_gap_costs_more_than_terminal() {
        let sm = amino_model();
        let internal = msa(&["AWCD", "A-CD"]);
        let terminal = msa(&["AWCD", "-WCD"]);
        // Same single-column gap; the terminal one is half price, and the
        // substitution columns differ, so just check both are penalized
        // relative to the gap-free pair.
        let free = msa(&["AWCD", "AWCD"]);
        let w = [1.0, 1.0];
        assert!(sp_score(&internal, &w, &sm) < sp_score(&free, &w, &sm));
        assert!(sp_score(&terminal, &w, &sm) < sp_score(&free, &w, &sm));
    }

    #[test]
    fn test_dual_gap_columns_ignored() {
        let sm = amino_model();
        let a = msa(&["A-CD", "A-CD"]);
        let b = msa(&["ACD", "ACD"]);
        assert_eq!(
            sp_score(&a, &[1.0, 1.0], &sm),
            sp_score(&b, &[1.0, 1.0], &sm)
        );
    }

    #[test]
    fn test_gap_run_charged_once() {
        let sm = amino_model();
        let one_run = msa(&["AWWWD", "A---D"]);
        let two_runs = msa(&["AWDWD", "A-D-D"]);
        let w = [1.0, 1.0];
        // Two separate runs open twice; the extra open charge outweighs
        // the extra matched column.
        assert!(sp_score(&one_run, &w, &sm) > sp_score(&two_runs, &w, &sm));
    }
}
