//! Pairwise distance estimation
//!
//! Two interchangeable strategies behind the same `DistSource` capability
//! set, so the guide-tree builder is agnostic to which is in use:
//!
//! - `KmerDistance` estimates divergence of raw, unaligned sequences from
//!   the fraction of shared k-mers (pass-1 tree, before any alignment
//!   exists).
//! - `MsaDistance` computes percent identity over the rows of an existing
//!   alignment and maps it through a monotonic transform (Kimura multiple-
//!   substitution correction, or a log transform for distant pairs).
//!
//! The clustering algorithm only ever needs the lower triangle, so for row
//! `i` all distances to `j < i` are produced in one `calc_dist_range` batch.

use std::hash::Hasher;

use rustc_hash::FxHasher;

use crate::msa::{Msa, Sequence};

/// Distance ceiling returned when a transform saturates.
pub const MAX_DIST: f32 = 10.0;

/// Capability set shared by all distance strategies.
pub trait DistSource: Sync {
    /// Number of rows.
    fn count(&self) -> usize;
    /// Stable sequence id of row `i`.
    fn id(&self, i: usize) -> u32;
    /// Display name of row `i`.
    fn name(&self, i: usize) -> &str;
    /// Fill `out[j]` with the distance between rows `i` and `j` for all
    /// `j < i`. `out` has length `i`. Distances are symmetric and
    /// non-negative; `dist(i, i)` is never requested.
    fn calc_dist_range(&self, i: usize, out: &mut [f32]);
}

/// Monotonic transform from percent identity to evolutionary distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceTransform {
    /// Kimura correction for multiple substitutions at a site.
    #[default]
    PctIdKimura,
    /// Log transform tuned for distantly related sequences.
    PctIdLog,
}

impl std::str::FromStr for DistanceTransform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kimura" | "pctid-kimura" => Ok(DistanceTransform::PctIdKimura),
            "log" | "pctid-log" => Ok(DistanceTransform::PctIdLog),
            _ => Err(format!(
                "Unknown distance transform: {}. Use 'kimura' or 'log'",
                s
            )),
        }
    }
}

/// Kimura distance from fractional identity.
/// d = -ln(1 - p - p^2/5) where p is the fraction of differing sites;
/// saturates at `MAX_DIST` for very divergent pairs.
pub fn kimura_dist(pct_id: f64) -> f32 {
    let p = (1.0 - pct_id).clamp(0.0, 1.0);
    let arg = 1.0 - p - p * p / 5.0;
    if arg <= 1e-9 {
        return MAX_DIST;
    }
    (-(arg.ln()) as f32).min(MAX_DIST)
}

/// Log distance from fractional identity, d = -ln(max(id, 0.05)).
pub fn log_dist(pct_id: f64) -> f32 {
    let id = pct_id.max(0.05);
    (-(id.ln()) as f32).min(MAX_DIST)
}

/// k-mer content distance over raw sequences.
///
/// Each sequence is summarized once as a sorted set of distinct k-mer
/// hashes; a pair's distance is one minus the fraction of shared k-mers
/// relative to the smaller set.
pub struct KmerDistance<'a> {
    seqs: &'a [Sequence],
    kmers: Vec<Vec<u64>>,
}

impl<'a> KmerDistance<'a> {
    pub fn new(seqs: &'a [Sequence], k: usize) -> Self {
        let kmers = seqs
            .iter()
            .map(|s| {
                let mut set: Vec<u64> = if s.residues.len() >= k {
                    s.residues
                        .windows(k)
                        .map(|w| {
                            let mut h = FxHasher::default();
                            for &c in w {
                                h.write_u8(c.to_ascii_uppercase());
                            }
                            h.finish()
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                set.sort_unstable();
                set.dedup();
                set
            })
            .collect();
        Self { seqs, kmers }
    }

    fn pair_dist(&self, i: usize, j: usize) -> f32 {
        let a = &self.kmers[i];
        let b = &self.kmers[j];
        let denom = a.len().min(b.len());
        if denom == 0 {
            return 1.0;
        }
        // Sorted-merge intersection count
        let mut shared = 0usize;
        let (mut x, mut y) = (0usize, 0usize);
        while x < a.len() && y < b.len() {
            match a[x].cmp(&b[y]) {
                std::cmp::Ordering::Less => x += 1,
                std::cmp::Ordering::Greater => y += 1,
                std::cmp::Ordering::Equal => {
                    shared += 1;
                    x += 1;
                    y += 1;
                }
            }
        }
        1.0 - shared as f32 / denom as f32
    }
}

impl DistSource for KmerDistance<'_> {
    fn count(&self) -> usize {
        self.seqs.len()
    }

    fn id(&self, i: usize) -> u32 {
        self.seqs[i].id
    }

    fn name(&self, i: usize) -> &str {
        &self.seqs[i].name
    }

    fn calc_dist_range(&self, i: usize, out: &mut [f32]) {
        for (j, slot) in out.iter_mut().enumerate().take(i) {
            *slot = self.pair_dist(i, j);
        }
    }
}

/// Percent-identity distance over the rows of an existing alignment.
pub struct MsaDistance<'a> {
    msa: &'a Msa,
    transform: DistanceTransform,
}

impl<'a> MsaDistance<'a> {
    pub fn new(msa: &'a Msa, transform: DistanceTransform) -> Self {
        Self { msa, transform }
    }
}

impl DistSource for MsaDistance<'_> {
    fn count(&self) -> usize {
        self.msa.seq_count()
    }

    fn id(&self, i: usize) -> u32 {
        self.msa.row(i).id
    }

    fn name(&self, i: usize) -> &str {
        &self.msa.row(i).name
    }

    fn calc_dist_range(&self, i: usize, out: &mut [f32]) {
        for (j, slot) in out.iter_mut().enumerate().take(i) {
            let pct_id = self.msa.pct_identity_pair(i, j);
            *slot = match self.transform {
                DistanceTransform::PctIdKimura => kimura_dist(pct_id),
                DistanceTransform::PctIdLog => log_dist(pct_id),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msa::{AlignedRow, Msa};

    fn seqs() -> Vec<Sequence> {
        vec![
            Sequence::new(0, "a", *b"MKVLQWERTYIPASDF"),
            Sequence::new(1, "b", *b"MKVLQWERTYIPASDF"),
            Sequence::new(2, "c", *b"GGGGGGGGGGGGGGGG"),
        ]
    }

    #[test]
    fn test_kmer_identical_is_zero() {
        let s = seqs();
        let kd = KmerDistance::new(&s, 4);
        let mut out = vec![0.0f32; 1];
        kd.calc_dist_range(1, &mut out);
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn test_kmer_disjoint_is_one() {
        let s = seqs();
        let kd = KmerDistance::new(&s, 4);
        let mut out = vec![0.0f32; 2];
        kd.calc_dist_range(2, &mut out);
        assert_eq!(out[0], 1.0);
        assert_eq!(out[1], 1.0);
    }

    #[test]
    fn test_kmer_symmetric_nonnegative() {
        let s = seqs();
        let kd = KmerDistance::new(&s, 4);
        for i in 0..s.len() {
            for j in 0..i {
                let mut oi = vec![0.0f32; i];
                kd.calc_dist_range(i, &mut oi);
                let mut oj = vec![0.0f32; j.max(1)];
                if j > 0 {
                    kd.calc_dist_range(j, &mut oj);
                }
                assert!(oi[j] >= 0.0);
            }
        }
    }

    #[test]
    fn test_kimura_monotonic() {
        assert_eq!(kimura_dist(1.0), 0.0);
        let mut prev = 0.0;
        for step in 0..=20 {
            let id = 1.0 - step as f64 * 0.05;
            let d = kimura_dist(id);
            assert!(d >= prev, "kimura not monotone at id={}", id);
            prev = d;
        }
        assert_eq!(kimura_dist(0.0), MAX_DIST);
    }

    #[test]
    fn test_log_dist_floor() {
        assert_eq!(log_dist(1.0), 0.0);
        assert!(log_dist(0.0) > 0.0);
        assert!(log_dist(0.0).is_finite());
    }

    #[test]
    fn test_msa_distance_transforms() {
        let msa = Msa::from_rows(vec![
            AlignedRow {
                id: 0,
                name: "a".into(),
                residues: b"ACDEF".to_vec(),
            },
            AlignedRow {
                id: 1,
                name: "b".into(),
                residues: b"ACDFF".to_vec(),
            },
        ])
        .unwrap();
        let md = MsaDistance::new(&msa, DistanceTransform::PctIdKimura);
        let mut out = vec![0.0f32; 1];
        md.calc_dist_range(1, &mut out);
        assert!(out[0] > 0.0 && out[0] < MAX_DIST);
    }

    #[test]
    fn test_transform_selector_rejects_unknown() {
        assert!("kimura".parse::<DistanceTransform>().is_ok());
        assert!("log".parse::<DistanceTransform>().is_ok());
        assert!("banana".parse::<DistanceTransform>().is_err());
    }
}
