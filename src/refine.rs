//! Iterative refinement
//!
//! All three strategies share one step: pick a tree edge, split the
//! alignment's rows into the two groups the edge separates, re-align the
//! two group profiles over some column range and keep the result only if
//! the weighted sum-of-pairs objective strictly improves. Rows outside
//! the range are untouched; the refined slice is concatenated back
//! between the unchanged prefix and suffix.
//!
//! Strategies differ only in which column ranges they touch:
//! tree-dependent refinement always re-aligns the full width, horizontal
//! refinement walks fixed-width column windows, and vertical refinement
//! re-aligns the variable segments between anchor columns while the
//! anchors themselves stay fixed.
//!
//! The iteration budget is spent in full; there is no convergence test.
//! A step whose DP matrix would exceed the configured cell limit is
//! skipped, so the best alignment found so far always survives.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rustc_hash::FxHashSet;

use crate::config::AlignConfig;
use crate::matrix::ScoreModel;
use crate::msa::{merge_given_path, Msa, Sequence};
use crate::nw_profile::{align_profiles, dp_cells};
use crate::objscore::sp_score;
use crate::profile::{build_profile, seq_weights};
use crate::progressive::profile_from_msa;
use crate::tree::GuideTree;

/// Occupancy below which a column cannot anchor (any gap disqualifies).
const ANCHOR_MIN_OCC: f32 = 0.9999;

/// Sequence ids on the child side of each non-root tree edge.
fn edge_partitions(tree: &GuideTree, seqs: &[Sequence]) -> Vec<FxHashSet<u32>> {
    tree.edges()
        .iter()
        .map(|&node| {
            tree.leaves_under(node)
                .iter()
                .map(|&si| seqs[si].id)
                .collect()
        })
        .collect()
}

/// Re-align one column range of `current` across one edge bipartition.
/// Returns `None` when the step is degenerate (a side has no rows or no
/// residues in the range) or would exceed the DP cell limit.
fn bipartition_step(
    current: &Msa,
    start: usize,
    end: usize,
    left_ids: &FxHashSet<u32>,
    sm: &ScoreModel,
    cfg: &AlignConfig,
) -> Result<Option<Msa>> {
    let mut left_rows = Vec::new();
    let mut right_rows = Vec::new();
    for (i, row) in current.rows().iter().enumerate() {
        if left_ids.contains(&row.id) {
            left_rows.push(i);
        } else {
            right_rows.push(i);
        }
    }
    if left_rows.is_empty() || right_rows.is_empty() {
        return Ok(None);
    }

    let mid = current.extract_cols(start, end);
    let left = mid.subset_rows(&left_rows);
    let right = mid.subset_rows(&right_rows);
    if left.col_count() == 0 || right.col_count() == 0 {
        return Ok(None);
    }
    if dp_cells(left.col_count(), right.col_count()) > cfg.max_dp_cells {
        return Ok(None);
    }

    let prof_l = profile_from_msa(&left, sm, cfg);
    let prof_r = profile_from_msa(&right, sm, cfg);
    let (path, _score) = align_profiles(&prof_l, &prof_r, sm, cfg.max_dp_cells)?;
    let merged = merge_given_path(&left, &right, &path);

    let order: Vec<u32> = current.rows().iter().map(|r| r.id).collect();
    let mid_new = merged.reordered(&order)?;
    let prefix = current.extract_cols(0, start);
    let suffix = current.extract_cols(end, current.col_count());
    Ok(Some(Msa::hcat(&[&prefix, &mid_new, &suffix])?))
}

/// Replace `current` with `candidate` only on a strict objective gain.
/// Weights come from the current alignment so both sides are scored on
/// the same footing.
fn accept_if_better(
    current: &mut Msa,
    candidate: Msa,
    sm: &ScoreModel,
    cfg: &AlignConfig,
) -> bool {
    let weights = seq_weights(current, cfg.weighting, sm.alphabet);
    let old = sp_score(current, &weights, sm);
    let new = sp_score(&candidate, &weights, sm);
    if new > old {
        *current = candidate;
        true
    } else {
        false
    }
}

fn progress_bar(len: u64, cfg: &AlignConfig) -> ProgressBar {
    if !cfg.show_progress {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.set_message("refining");
    pb
}

/// Full-width tree-dependent refinement: every iteration visits every
/// edge and re-aligns the whole alignment across it.
pub fn refine_tree_dependent(
    current: &mut Msa,
    seqs: &[Sequence],
    tree: &GuideTree,
    sm: &ScoreModel,
    cfg: &AlignConfig,
    iters: usize,
) -> Result<()> {
    let partitions = edge_partitions(tree, seqs);
    if partitions.is_empty() {
        return Ok(());
    }
    let pb = progress_bar((iters * partitions.len()) as u64, cfg);
    for _ in 0..iters {
        for ids in &partitions {
            let cols = current.col_count();
            if let Some(candidate) = bipartition_step(current, 0, cols, ids, sm, cfg)? {
                accept_if_better(current, candidate, sm, cfg);
            }
            pb.inc(1);
        }
    }
    pb.finish_and_clear();
    Ok(())
}

/// Horizontal refinement: each iteration pairs one edge with a sweep of
/// fixed-width column windows. Edges rotate across iterations so a long
/// budget still covers the whole tree.
pub fn refine_horizontal(
    current: &mut Msa,
    seqs: &[Sequence],
    tree: &GuideTree,
    sm: &ScoreModel,
    cfg: &AlignConfig,
    iters: usize,
) -> Result<()> {
    let partitions = edge_partitions(tree, seqs);
    if partitions.is_empty() || cfg.window_size == 0 {
        return Ok(());
    }
    let pb = progress_bar(iters as u64, cfg);
    for it in 0..iters {
        let ids = &partitions[it % partitions.len()];
        let mut start = 0usize;
        while start < current.col_count() {
            let end = (start + cfg.window_size).min(current.col_count());
            if let Some(candidate) = bipartition_step(current, start, end, ids, sm, cfg)? {
                accept_if_better(current, candidate, sm, cfg);
            }
            // Column count may have changed; step from the old window end.
            start = end;
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(())
}

/// Columns conserved enough to pin during vertical refinement: no gaps
/// and one residue holding at least the configured frequency share.
fn anchor_cols(msa: &Msa, sm: &ScoreModel, cfg: &AlignConfig) -> Vec<usize> {
    let weights = seq_weights(msa, cfg.weighting, sm.alphabet);
    let prof = build_profile(msa, &weights, sm);
    prof.cols
        .iter()
        .enumerate()
        .filter(|(_, col)| {
            col.occupancy >= ANCHOR_MIN_OCC
                && col
                    .counts
                    .iter()
                    .take(sm.size())
                    .any(|&f| f >= cfg.anchor_min_conservation)
        })
        .map(|(i, _)| i)
        .collect()
}

/// Maximal runs of non-anchor columns, as half-open ranges.
fn segments_between(anchors: &[usize], cols: usize) -> Vec<(usize, usize)> {
    let mut segs = Vec::new();
    let mut start = 0usize;
    for &a in anchors {
        if a > start {
            segs.push((start, a));
        }
        start = a + 1;
    }
    if start < cols {
        segs.push((start, cols));
    }
    segs
}

/// Vertical refinement: re-align the segments between anchor columns,
/// one edge per iteration. Anchors are recomputed each iteration since
/// accepted steps move columns around.
pub fn refine_vertical(
    current: &mut Msa,
    seqs: &[Sequence],
    tree: &GuideTree,
    sm: &ScoreModel,
    cfg: &AlignConfig,
    iters: usize,
) -> Result<()> {
    let partitions = edge_partitions(tree, seqs);
    if partitions.is_empty() {
        return Ok(());
    }
    let pb = progress_bar(iters as u64, cfg);
    for it in 0..iters {
        let ids = &partitions[it % partitions.len()];
        let anchors = anchor_cols(current, sm, cfg);
        if anchors.is_empty() {
            // Nothing to pin; fall back to a full-width step.
            let cols = current.col_count();
            if let Some(candidate) = bipartition_step(current, 0, cols, ids, sm, cfg)? {
                accept_if_better(current, candidate, sm, cfg);
            }
            pb.inc(1);
            continue;
        }
        // Walk segments back to front so accepted steps do not shift the
        // column ranges still pending in this iteration.
        let segs = segments_between(&anchors, current.col_count());
        for &(start, end) in segs.iter().rev() {
            if let Some(candidate) = bipartition_step(current, start, end, ids, sm, cfg)? {
                accept_if_better(current, candidate, sm, cfg);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(())
}
