//! Global profile-profile alignment
//!
//! Affine-gap Needleman-Wunsch over the columns of two profiles. Three
//! running states per cell: `Match` (both profiles contribute a column),
//! `Delete` (a column of A over a gap in B) and `Insert` (a column of B
//! over a gap in A). Gap-open is charged from the per-column score of the
//! profile whose column starts the run, gap-close from the column that
//! ends it, and a constant extend score per additional column.
//!
//! The substitution score of a match cell is the expected pairwise score
//! of the two columns' residue distributions under the run's substitution
//! table, weighted by both occupancies so sparse columns contribute
//! proportionally less.
//!
//! Ties in the recurrence break by fixed state priority (Match, then
//! Delete, then Insert), so repeated invocations yield identical paths.

use anyhow::{bail, Result};

use crate::matrix::ScoreModel;
use crate::profile::{ProfPos, Profile};

const MIN_SCORE: f32 = -1e30;

const ST_M: u8 = 0;
const ST_D: u8 = 1;
const ST_I: u8 = 2;

/// One step of an edit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOp {
    /// Both profiles contribute a column.
    Match,
    /// Column from the left profile, gap in the right.
    Delete,
    /// Gap in the left profile, column from the right.
    Insert,
}

/// Number of DP cells the alignment of two profiles would allocate.
pub fn dp_cells(a_len: usize, b_len: usize) -> usize {
    (a_len + 1).saturating_mul(b_len + 1)
}

/// Expected pairwise score of two profile columns, occupancy-weighted.
#[inline]
pub fn pair_score(a: &ProfPos, b: &ProfPos, sm: &ScoreModel) -> f32 {
    let size = sm.size();
    let mut score = 0.0f32;
    for (x, &fa) in a.counts.iter().enumerate().take(size) {
        if fa == 0.0 {
            continue;
        }
        for (y, &fb) in b.counts.iter().enumerate().take(size) {
            if fb != 0.0 {
                score += fa * fb * sm.score(x, y);
            }
        }
    }
    score * a.occupancy * b.occupancy
}

/// Globally optimal edit path and score for two profiles under the score
/// model. Fails on zero-column input and when the DP matrix would exceed
/// `max_cells`.
pub fn align_profiles(
    a: &Profile,
    b: &Profile,
    sm: &ScoreModel,
    max_cells: usize,
) -> Result<(Vec<PathOp>, f32)> {
    if a.is_empty() || b.is_empty() {
        bail!("cannot align an empty profile");
    }
    let la = a.len();
    let lb = b.len();
    if dp_cells(la, lb) > max_cells {
        bail!(
            "profile DP matrix of {}x{} columns exceeds the configured cell limit ({})",
            la,
            lb,
            max_cells
        );
    }

    let w = lb + 1;
    let cells = (la + 1) * w;
    let mut m = vec![MIN_SCORE; cells];
    let mut d = vec![MIN_SCORE; cells];
    let mut ins = vec![MIN_SCORE; cells];
    // Predecessor state of each cell, per state matrix
    let mut tb_m = vec![ST_M; cells];
    let mut tb_d = vec![ST_M; cells];
    let mut tb_i = vec![ST_M; cells];

    m[0] = 0.0;
    // Leading terminal gap runs
    for i in 1..=la {
        let open = a.cols[0].gap_open;
        d[i * w] = open + (i - 1) as f32 * sm.gap_extend;
        tb_d[i * w] = if i == 1 { ST_M } else { ST_D };
    }
    for j in 1..=lb {
        let open = b.cols[0].gap_open;
        ins[j] = open + (j - 1) as f32 * sm.gap_extend;
        tb_i[j] = if j == 1 { ST_M } else { ST_I };
    }

    for i in 1..=la {
        let pa = &a.cols[i - 1];
        for j in 1..=lb {
            let pb = &b.cols[j - 1];
            let cell = i * w + j;
            let diag = cell - w - 1;
            let up = cell - w;
            let left = cell - 1;

            // Match: close any gap run ending just before this column.
            let from_m = m[diag];
            let from_d = if i >= 2 {
                d[diag] + a.cols[i - 2].gap_close
            } else {
                MIN_SCORE
            };
            let from_i = if j >= 2 {
                ins[diag] + b.cols[j - 2].gap_close
            } else {
                MIN_SCORE
            };
            let (best, state) = if from_m >= from_d && from_m >= from_i {
                (from_m, ST_M)
            } else if from_d >= from_i {
                (from_d, ST_D)
            } else {
                (from_i, ST_I)
            };
            m[cell] = best + pair_score(pa, pb, sm);
            tb_m[cell] = state;

            // Delete: A column i-1 over a gap in B.
            let open = m[up] + pa.gap_open;
            let extend = d[up] + sm.gap_extend;
            if open >= extend {
                d[cell] = open;
                tb_d[cell] = ST_M;
            } else {
                d[cell] = extend;
                tb_d[cell] = ST_D;
            }

            // Insert: B column j-1 over a gap in A.
            let open = m[left] + pb.gap_open;
            let extend = ins[left] + sm.gap_extend;
            if open >= extend {
                ins[cell] = open;
                tb_i[cell] = ST_M;
            } else {
                ins[cell] = extend;
                tb_i[cell] = ST_I;
            }
        }
    }

    // Close a trailing gap run, then pick the final state by priority.
    let last = la * w + lb;
    let final_m = m[last];
    let final_d = d[last] + a.cols[la - 1].gap_close;
    let final_i = ins[last] + b.cols[lb - 1].gap_close;
    let (score, mut state) = if final_m >= final_d && final_m >= final_i {
        (final_m, ST_M)
    } else if final_d >= final_i {
        (final_d, ST_D)
    } else {
        (final_i, ST_I)
    };

    let mut path = Vec::with_capacity(la + lb);
    let mut i = la;
    let mut j = lb;
    while i > 0 || j > 0 {
        let cell = i * w + j;
        match state {
            ST_M => {
                path.push(PathOp::Match);
                state = tb_m[cell];
                i -= 1;
                j -= 1;
            }
            ST_D => {
                path.push(PathOp::Delete);
                state = tb_d[cell];
                i -= 1;
            }
            _ => {
                path.push(PathOp::Insert);
                state = tb_i[cell];
                j -= 1;
            }
        }
    }
    path.reverse();
    Ok((path, score))
}
