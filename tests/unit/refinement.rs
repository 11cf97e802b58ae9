//! Refinement acceptance behavior: the objective never regresses and
//! every strategy preserves row content.

use sinew::alphabet::Alphabet;
use sinew::config::AlignConfig;
use sinew::engine::align;
use sinew::matrix::ScoreModel;
use sinew::msa::Sequence;
use sinew::objscore::sp_score;
use sinew::profile::seq_weights;

fn seqs(raw: &[&str]) -> Vec<Sequence> {
    raw.iter()
        .enumerate()
        .map(|(i, s)| Sequence::new(i as u32, format!("seq{}", i), s.as_bytes().to_vec()))
        .collect()
}

fn objective(msa: &sinew::msa::Msa, cfg: &AlignConfig) -> f32 {
    let sm = ScoreModel::for_alphabet(Alphabet::Amino);
    let w = seq_weights(msa, cfg.weighting, sm.alphabet);
    sp_score(msa, &w, &sm)
}

const INPUT: &[&str] = &[
    "MKVLAWGKEQSLV",
    "MKVLWGKEQSLV",
    "MKVLAWGKQSLV",
    "MRVLAWGKEQSV",
];

#[test]
fn refined_objective_at_least_progressive() {
    let input = seqs(INPUT);
    let mut progressive_only = AlignConfig::default();
    progressive_only.max_iters = 2;
    let base = align(&input, None, &progressive_only).unwrap();
    let refined = align(&input, None, &AlignConfig::default()).unwrap();
    let cfg = AlignConfig::default();
    assert!(objective(&refined.msa, &cfg) >= objective(&base.msa, &cfg));
}

#[test]
fn anchored_refinement_preserves_rows() {
    let input = seqs(INPUT);
    let cfg = AlignConfig::default();
    assert!(cfg.anchors);
    let result = align(&input, None, &cfg).unwrap();
    for (row, seq) in result.msa.rows().iter().zip(input.iter()) {
        assert_eq!(row.ungapped(), seq.residues);
    }
}

#[test]
fn windowed_refinement_preserves_rows() {
    let input = seqs(INPUT);
    let mut cfg = AlignConfig::default();
    cfg.anchors = false;
    cfg.window_size = 5;
    let result = align(&input, None, &cfg).unwrap();
    for (row, seq) in result.msa.rows().iter().zip(input.iter()) {
        assert_eq!(row.ungapped(), seq.residues);
    }
}

#[test]
fn full_width_refinement_preserves_rows() {
    let input = seqs(INPUT);
    let mut cfg = AlignConfig::default();
    cfg.anchors = false;
    cfg.window_size = 0;
    let result = align(&input, None, &cfg).unwrap();
    for (row, seq) in result.msa.rows().iter().zip(input.iter()) {
        assert_eq!(row.ungapped(), seq.residues);
    }
}

#[test]
fn tight_dp_limit_still_produces_an_alignment() {
    // The refinement steps all skip under a tiny cell budget, but the
    // progressive pass on short sequences fits and must still succeed.
    let input = seqs(&["MKVLAW", "MKVLW", "MKVAW"]);
    let mut cfg = AlignConfig::default();
    cfg.max_dp_cells = 100;
    let result = align(&input, None, &cfg).unwrap();
    for (row, seq) in result.msa.rows().iter().zip(input.iter()) {
        assert_eq!(row.ungapped(), seq.residues);
    }
}

#[test]
fn dp_limit_below_progressive_need_is_fatal() {
    let input = seqs(&["MKVLAWGKEQ", "MKVLWGKEQ"]);
    let mut cfg = AlignConfig::default();
    cfg.max_dp_cells = 10;
    assert!(align(&input, None, &cfg).is_err());
}
