//! Progressive tree-guided alignment
//!
//! Walks the guide tree in post-order. Each leaf holds the degenerate
//! single-sequence alignment; at each internal node the two children's
//! profiles are aligned and the edit path interleaves the children's row
//! sets into a combined alignment whose column count equals the path
//! length. A fresh profile is built from every merged alignment (profiles
//! are rebuilt, never patched), and the root's alignment is the result.

use anyhow::{bail, Result};

use crate::config::AlignConfig;
use crate::matrix::ScoreModel;
use crate::msa::{merge_given_path, Msa, Sequence};
use crate::nw_profile::align_profiles;
use crate::profile::{apply_hydro, build_profile, seq_weights, Profile};
use crate::tree::GuideTree;

/// Profile of an alignment snapshot under the run configuration: sequence
/// weights, count accumulation, then the hydrophobicity post-pass.
pub fn profile_from_msa(msa: &Msa, sm: &ScoreModel, cfg: &AlignConfig) -> Profile {
    let weights = seq_weights(msa, cfg.weighting, sm.alphabet);
    let mut prof = build_profile(msa, &weights, sm);
    apply_hydro(&mut prof, cfg.hydro_run_length, cfg.hydro_factor);
    prof
}

/// Align all sequences along the guide tree. One sequence short-circuits
/// to a trivial single-row alignment without any profile work.
pub fn progressive_align(
    seqs: &[Sequence],
    tree: &GuideTree,
    sm: &ScoreModel,
    cfg: &AlignConfig,
) -> Result<Msa> {
    if seqs.is_empty() {
        bail!("no sequences in input");
    }
    if seqs.len() == 1 {
        return Ok(Msa::from_sequence(&seqs[0]));
    }
    if tree.leaf_count() != seqs.len() {
        bail!(
            "guide tree has {} leaves but input has {} sequences",
            tree.leaf_count(),
            seqs.len()
        );
    }

    let mut node_msa: Vec<Option<Msa>> = vec![None; tree.node_count()];
    for idx in tree.post_order() {
        let node = tree.node(idx);
        if node.is_leaf() {
            let si = match node.seq_index {
                Some(si) => si,
                None => bail!("guide tree leaf is not mapped to a sequence"),
            };
            node_msa[idx] = Some(Msa::from_sequence(&seqs[si]));
            continue;
        }
        let (li, ri) = match (node.left, node.right) {
            (Some(l), Some(r)) => (l, r),
            _ => bail!("internal tree node is missing a child"),
        };
        // Post-order guarantees both children are ready.
        let left = node_msa[li]
            .take()
            .ok_or_else(|| anyhow::anyhow!("child alignment missing in post-order walk"))?;
        let right = node_msa[ri]
            .take()
            .ok_or_else(|| anyhow::anyhow!("child alignment missing in post-order walk"))?;
        let prof_l = profile_from_msa(&left, sm, cfg);
        let prof_r = profile_from_msa(&right, sm, cfg);
        let (path, _score) = align_profiles(&prof_l, &prof_r, sm, cfg.max_dp_cells)?;
        node_msa[idx] = Some(merge_given_path(&left, &right, &path));
    }

    node_msa[tree.root()]
        .take()
        .ok_or_else(|| anyhow::anyhow!("guide tree walk produced no root alignment"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::tree::{tree_from_seqs, Clustering, RootMethod};

    fn run(seqs: &[Sequence]) -> Msa {
        let cfg = AlignConfig::default();
        let sm = ScoreModel::for_alphabet(Alphabet::Amino);
        let tree = tree_from_seqs(seqs, 3, Clustering::Upgma, RootMethod::LastMerge).unwrap();
        progressive_align(seqs, &tree, &sm, &cfg).unwrap()
    }

    #[test]
    fn test_empty_input_fatal() {
        let cfg = AlignConfig::default();
        let sm = ScoreModel::for_alphabet(Alphabet::Amino);
        let seqs: Vec<Sequence> = Vec::new();
        let one = vec![Sequence::new(0, "s", *b"MKV")];
        let tree = tree_from_seqs(&one, 2, Clustering::Upgma, RootMethod::LastMerge).unwrap();
        assert!(progressive_align(&seqs, &tree, &sm, &cfg).is_err());
    }

    #[test]
    fn test_single_sequence_short_circuits() {
        let seqs = vec![Sequence::new(0, "s", *b"MKV")];
        let tree = tree_from_seqs(&seqs, 2, Clustering::Upgma, RootMethod::LastMerge).unwrap();
        let cfg = AlignConfig::default();
        let sm = ScoreModel::for_alphabet(Alphabet::Amino);
        let msa = progressive_align(&seqs, &tree, &sm, &cfg).unwrap();
        assert_eq!(msa.seq_count(), 1);
        assert_eq!(msa.row(0).residues, b"MKV");
    }

    #[test]
    fn test_pairwise_substitution_example() {
        let seqs = vec![
            Sequence::new(0, "a", *b"ACDEFG"),
            Sequence::new(1, "b", *b"ACDFFG"),
        ];
        let msa = run(&seqs);
        assert_eq!(msa.col_count(), 6);
        assert_eq!(msa.row(0).residues, b"ACDEFG");
        assert_eq!(msa.row(1).residues, b"ACDFFG");
    }

    #[test]
    fn test_roundtrip_and_uniform_columns() {
        let seqs = vec![
            Sequence::new(0, "a", *b"MKVLAWGKEQ"),
            Sequence::new(1, "b", *b"MKVLWGKEQ"),
            Sequence::new(2, "c", *b"MKVLAWGKQ"),
            Sequence::new(3, "d", *b"MRVLAWGKEQ"),
        ];
        let msa = run(&seqs);
        assert_eq!(msa.seq_count(), 4);
        let cols = msa.col_count();
        for row in msa.rows() {
            assert_eq!(row.residues.len(), cols);
            let original = &seqs[row.id as usize];
            assert_eq!(row.ungapped(), original.residues, "row {}", row.name);
        }
    }
}
