//! End-to-end alignment behavior through the public engine entry point.

use sinew::config::AlignConfig;
use sinew::engine::align;
use sinew::msa::Sequence;

fn seqs(raw: &[&str]) -> Vec<Sequence> {
    raw.iter()
        .enumerate()
        .map(|(i, s)| Sequence::new(i as u32, format!("seq{}", i), s.as_bytes().to_vec()))
        .collect()
}

#[test]
fn similar_pair_aligns_without_gaps() {
    let input = seqs(&["ACDEFG", "ACDFFG"]);
    let result = align(&input, None, &AlignConfig::default()).unwrap();
    assert_eq!(result.msa.col_count(), 6);
    assert_eq!(result.msa.row(0).residues, b"ACDEFG");
    assert_eq!(result.msa.row(1).residues, b"ACDFFG");
}

#[test]
fn shorter_sequences_get_contiguous_gap_runs() {
    // Two 5-residue sequences against a 7-residue one: both short rows
    // need a 2-column gap run and every row spans 7 columns.
    let input = seqs(&["ACDEF", "ACDEF", "ACWWDEF"]);
    let result = align(&input, None, &AlignConfig::default()).unwrap();
    assert_eq!(result.msa.col_count(), 7);
    for row in result.msa.rows() {
        assert_eq!(row.residues.len(), 7);
        let gaps = row.residues.iter().filter(|&&c| c == b'-').count();
        if row.id == 2 {
            assert_eq!(gaps, 0);
        } else {
            assert_eq!(gaps, 2);
            // Contiguous run, not scattered gaps
            let first = row.residues.iter().position(|&c| c == b'-').unwrap();
            assert_eq!(row.residues[first + 1], b'-');
        }
    }
}

#[test]
fn single_sequence_passes_through() {
    let input = seqs(&["MKV"]);
    let result = align(&input, None, &AlignConfig::default()).unwrap();
    assert_eq!(result.msa.seq_count(), 1);
    assert_eq!(result.msa.col_count(), 3);
    assert_eq!(result.msa.row(0).residues, b"MKV");
}

#[test]
fn every_row_round_trips_to_its_input() {
    let input = seqs(&[
        "MKVLAWGKEQSLV",
        "MKVLWGKEQSLV",
        "MKVLAWGKQSLV",
        "MRVLAWGKEQSV",
        "MKVLAWGEQSLV",
    ]);
    let result = align(&input, None, &AlignConfig::default()).unwrap();
    assert_eq!(result.msa.seq_count(), 5);
    let cols = result.msa.col_count();
    for (row, seq) in result.msa.rows().iter().zip(input.iter()) {
        assert_eq!(row.residues.len(), cols);
        assert_eq!(row.id, seq.id);
        assert_eq!(row.ungapped(), seq.residues);
    }
}

#[test]
fn two_sequences_skip_refinement() {
    // With two sequences the result is fixed by the single profile
    // alignment, so a large iteration budget changes nothing.
    let input = seqs(&["MKVLAWGKEQ", "MKVLWGKQ"]);
    let mut progressive_only = AlignConfig::default();
    progressive_only.max_iters = 1;
    let a = align(&input, None, &progressive_only).unwrap();
    let b = align(&input, None, &AlignConfig::default()).unwrap();
    assert_eq!(a.msa.col_count(), b.msa.col_count());
    for (ra, rb) in a.msa.rows().iter().zip(b.msa.rows()) {
        assert_eq!(ra.residues, rb.residues);
    }
}

#[test]
fn nucleotide_input_is_autodetected_and_aligned() {
    let input = seqs(&["ACGTTACGTGCA", "ACGTACGTGCA", "ACGTTACGTGA"]);
    let result = align(&input, None, &AlignConfig::default()).unwrap();
    for (row, seq) in result.msa.rows().iter().zip(input.iter()) {
        assert_eq!(row.ungapped(), seq.residues);
    }
}

#[test]
fn identical_sequences_align_one_to_one() {
    let input = seqs(&["MKVLAWGKEQ", "MKVLAWGKEQ", "MKVLAWGKEQ"]);
    let result = align(&input, None, &AlignConfig::default()).unwrap();
    assert_eq!(result.msa.col_count(), 10);
    for row in result.msa.rows() {
        assert_eq!(row.residues, b"MKVLAWGKEQ");
    }
}

#[test]
fn empty_input_is_an_error() {
    let err = align(&[], None, &AlignConfig::default()).unwrap_err();
    assert!(err.to_string().contains("no sequences in input"));
}

#[test]
fn empty_sequence_is_an_error() {
    let input = vec![
        Sequence::new(0, "a", *b"MKV"),
        Sequence::new(1, "b", Vec::new()),
    ];
    assert!(align(&input, None, &AlignConfig::default()).is_err());
}

#[test]
fn deterministic_across_runs() {
    let input = seqs(&["MKVLAWGKEQ", "MKVLWGKEQ", "MKVLAWGKQ", "MRVLAWGKEQ"]);
    let cfg = AlignConfig::default();
    let a = align(&input, None, &cfg).unwrap();
    let b = align(&input, None, &cfg).unwrap();
    for (ra, rb) in a.msa.rows().iter().zip(b.msa.rows()) {
        assert_eq!(ra.residues, rb.residues);
    }
}
