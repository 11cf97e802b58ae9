//! Alignment engine
//!
//! The full pipeline behind one run: validate the input, resolve the
//! alphabet and score model, build (or accept) a guide tree, run the
//! progressive pass, refit the tree from the first alignment and run the
//! progressive pass again, then spend the remaining iteration budget on
//! refinement. The returned alignment carries its rows in input order.

use anyhow::{bail, Result};
use rustc_hash::FxHashSet;

use crate::alphabet::{Alphabet, GAP};
use crate::config::{AlignConfig, SeqType};
use crate::matrix::ScoreModel;
use crate::msa::{Msa, Sequence};
use crate::progressive::progressive_align;
use crate::refine::{refine_horizontal, refine_tree_dependent, refine_vertical};
use crate::tree::{tree_from_msa, tree_from_seqs, GuideTree};

/// Final alignment plus the guide tree that produced it.
#[derive(Debug)]
pub struct AlignResult {
    pub msa: Msa,
    pub tree: GuideTree,
}

fn resolve_alphabet(seqs: &[Sequence], seq_type: SeqType) -> Alphabet {
    match seq_type {
        SeqType::Auto => Alphabet::guess(seqs.iter().map(|s| s.residues.as_slice())),
        SeqType::Protein => Alphabet::Amino,
        SeqType::Dna => Alphabet::Dna,
        SeqType::Rna => Alphabet::Rna,
    }
}

fn build_score_model(alphabet: Alphabet, cfg: &AlignConfig) -> Result<ScoreModel> {
    let mut sm = match &cfg.custom_matrix {
        Some(table) => ScoreModel::with_table(alphabet, table.clone())?,
        None => ScoreModel::for_alphabet(alphabet),
    };
    if cfg.gap_open.is_some() || cfg.gap_extend.is_some() {
        let open = cfg.gap_open.unwrap_or(sm.gap_open);
        let extend = cfg.gap_extend.unwrap_or(sm.gap_extend);
        sm.set_gap_penalties(open, extend)?;
    }
    Ok(sm)
}

/// Align a set of sequences. `user_tree`, when given, replaces both tree
/// construction passes; it must be rooted, binary and labelled with the
/// input names.
pub fn align(
    seqs: &[Sequence],
    user_tree: Option<GuideTree>,
    cfg: &AlignConfig,
) -> Result<AlignResult> {
    cfg.validate()?;
    if seqs.is_empty() {
        bail!("no sequences in input");
    }
    let mut ids = FxHashSet::default();
    for seq in seqs {
        if !ids.insert(seq.id) {
            bail!("duplicate sequence id {}", seq.id);
        }
        if seq.residues.is_empty() {
            bail!("sequence {} is empty", seq.name);
        }
        // Gap bytes in raw input would survive into the output rows and
        // break gap-stripping reconstruction; ingestion must remove them.
        if seq.residues.contains(&GAP) {
            bail!("sequence {} contains a gap symbol", seq.name);
        }
    }

    let alphabet = resolve_alphabet(seqs, cfg.seq_type);
    let sm = build_score_model(alphabet, cfg)?;
    let input_order: Vec<u32> = seqs.iter().map(|s| s.id).collect();

    if seqs.len() == 1 {
        let tree = tree_from_seqs(seqs, cfg.kmer_size, cfg.cluster1, cfg.rooting)?;
        return Ok(AlignResult {
            msa: Msa::from_sequence(&seqs[0]),
            tree,
        });
    }

    let have_user_tree = user_tree.is_some();
    let mut tree = match user_tree {
        Some(mut t) => {
            t.validate(seqs)?;
            t
        }
        None => tree_from_seqs(seqs, cfg.kmer_size, cfg.cluster1, cfg.rooting)?,
    };

    if cfg.verbose {
        eprintln!("[align] {} sequences ({:?})", seqs.len(), alphabet);
    }
    let mut msa = progressive_align(seqs, &tree, &sm, cfg)?;

    if seqs.len() == 2 || cfg.max_iters <= 1 {
        return Ok(AlignResult {
            msa: msa.reordered(&input_order)?,
            tree,
        });
    }

    // Second pass: refit the tree from alignment identities and realign.
    // A user-supplied tree is authoritative and skips the refit.
    if !have_user_tree {
        if cfg.verbose {
            eprintln!("[tree] refitting guide tree from first-pass identities");
        }
        tree = tree_from_msa(&msa, cfg.distance2, cfg.cluster2, cfg.rooting)?;
        msa = progressive_align(seqs, &tree, &sm, cfg)?;
    }

    let budget = cfg.max_iters.saturating_sub(2);
    if budget > 0 {
        if cfg.verbose {
            eprintln!("[refine] spending {} iterations", budget);
        }
        if cfg.anchors {
            refine_vertical(&mut msa, seqs, &tree, &sm, cfg, budget)?;
        } else if cfg.window_size > 0 {
            refine_horizontal(&mut msa, seqs, &tree, &sm, cfg, budget)?;
        } else {
            refine_tree_dependent(&mut msa, seqs, &tree, &sm, cfg, budget)?;
        }
    }

    Ok(AlignResult {
        msa: msa.reordered(&input_order)?,
        tree,
    })
}
