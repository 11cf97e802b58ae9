//! In-memory multiple sequence alignment
//!
//! An `Msa` is a set of equal-length rows over residues plus the reserved
//! gap symbol. Rows carry the stable sequence id assigned at ingestion, so
//! the final alignment is addressable by original identity regardless of
//! internal row permutation. Stripping gaps from any row reconstructs the
//! original sequence exactly; every operation here preserves that invariant.

use anyhow::{bail, Result};
use rustc_hash::FxHashMap;

use crate::alphabet::GAP;
use crate::nw_profile::PathOp;

/// An input sequence: stable id, display name, ungapped residues.
#[derive(Debug, Clone)]
pub struct Sequence {
    pub id: u32,
    pub name: String,
    pub residues: Vec<u8>,
}

impl Sequence {
    pub fn new(id: u32, name: impl Into<String>, residues: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            name: name.into(),
            residues: residues.into(),
        }
    }
}

/// One aligned row: the original residues interleaved with gap symbols.
#[derive(Debug, Clone)]
pub struct AlignedRow {
    pub id: u32,
    pub name: String,
    pub residues: Vec<u8>,
}

impl AlignedRow {
    /// The original sequence with all gap symbols removed.
    pub fn ungapped(&self) -> Vec<u8> {
        self.residues.iter().copied().filter(|&c| c != GAP).collect()
    }
}

/// A column-consistent multiple sequence alignment.
#[derive(Debug, Clone, Default)]
pub struct Msa {
    rows: Vec<AlignedRow>,
}

impl Msa {
    /// Trivial single-row alignment from one raw sequence.
    pub fn from_sequence(seq: &Sequence) -> Self {
        Self {
            rows: vec![AlignedRow {
                id: seq.id,
                name: seq.name.clone(),
                residues: seq.residues.clone(),
            }],
        }
    }

    pub fn from_rows(rows: Vec<AlignedRow>) -> Result<Self> {
        if let Some(first) = rows.first() {
            let cols = first.residues.len();
            if rows.iter().any(|r| r.residues.len() != cols) {
                bail!("alignment rows have inconsistent column counts");
            }
        }
        Ok(Self { rows })
    }

    pub fn seq_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.first().map_or(0, |r| r.residues.len())
    }

    pub fn rows(&self) -> &[AlignedRow] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> &AlignedRow {
        &self.rows[i]
    }

    /// Percent identity between two rows, over columns where both are
    /// non-gap. Returns a fraction in [0,1]; 0 when no column is comparable.
    pub fn pct_identity_pair(&self, i: usize, j: usize) -> f64 {
        let a = &self.rows[i].residues;
        let b = &self.rows[j].residues;
        let mut compared = 0u64;
        let mut matched = 0u64;
        for (&x, &y) in a.iter().zip(b.iter()) {
            if x == GAP || y == GAP {
                continue;
            }
            compared += 1;
            if x.to_ascii_uppercase() == y.to_ascii_uppercase() {
                matched += 1;
            }
        }
        if compared == 0 {
            0.0
        } else {
            matched as f64 / compared as f64
        }
    }

    /// New alignment containing the given rows (by index, in the given
    /// order), with columns that became all-gap removed.
    pub fn subset_rows(&self, indices: &[usize]) -> Msa {
        let mut out = Msa {
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        };
        out.delete_all_gap_cols();
        out
    }

    /// New alignment restricted to a column range, all rows kept.
    pub fn extract_cols(&self, start: usize, end: usize) -> Msa {
        Msa {
            rows: self
                .rows
                .iter()
                .map(|r| AlignedRow {
                    id: r.id,
                    name: r.name.clone(),
                    residues: r.residues[start..end].to_vec(),
                })
                .collect(),
        }
    }

    /// Remove columns that are gap in every row.
    pub fn delete_all_gap_cols(&mut self) {
        let cols = self.col_count();
        let keep: Vec<bool> = (0..cols)
            .map(|c| self.rows.iter().any(|r| r.residues[c] != GAP))
            .collect();
        if keep.iter().all(|&k| k) {
            return;
        }
        for row in &mut self.rows {
            let mut col = 0;
            row.residues.retain(|_| {
                let k = keep[col];
                col += 1;
                k
            });
        }
    }

    /// Rows reordered to match a list of sequence ids.
    pub fn reordered(&self, ids: &[u32]) -> Result<Msa> {
        let by_id: FxHashMap<u32, &AlignedRow> =
            self.rows.iter().map(|r| (r.id, r)).collect();
        let mut rows = Vec::with_capacity(ids.len());
        for &id in ids {
            match by_id.get(&id) {
                Some(r) => rows.push((*r).clone()),
                None => bail!("alignment has no row for sequence id {}", id),
            }
        }
        Ok(Msa { rows })
    }

    /// Concatenate alignments column-wise. All pieces must carry the same
    /// rows in the same order.
    pub fn hcat(pieces: &[&Msa]) -> Result<Msa> {
        let first = match pieces.first() {
            Some(m) => *m,
            None => return Ok(Msa::default()),
        };
        let mut rows: Vec<AlignedRow> = first.rows.clone();
        for piece in &pieces[1..] {
            if piece.rows.len() != rows.len() {
                bail!("cannot concatenate alignments with different row counts");
            }
            for (dst, src) in rows.iter_mut().zip(piece.rows.iter()) {
                if dst.id != src.id {
                    bail!("cannot concatenate alignments with mismatched row order");
                }
                dst.residues.extend_from_slice(&src.residues);
            }
        }
        Ok(Msa { rows })
    }

    /// The final id -> aligned-row mapping handed to the output collaborator.
    pub fn into_row_map(self) -> FxHashMap<u32, AlignedRow> {
        self.rows.into_iter().map(|r| (r.id, r)).collect()
    }
}

/// Interleave the rows of two alignments along an edit path. `Match` emits a
/// column from both sides, `Delete` a column from `a` against gaps in `b`'s
/// rows, `Insert` a column from `b` against gaps in `a`'s rows. The merged
/// column count equals the path length.
pub fn merge_given_path(a: &Msa, b: &Msa, path: &[PathOp]) -> Msa {
    let cols = path.len();
    let mut rows: Vec<AlignedRow> = a
        .rows
        .iter()
        .chain(b.rows.iter())
        .map(|r| AlignedRow {
            id: r.id,
            name: r.name.clone(),
            residues: Vec::with_capacity(cols),
        })
        .collect();
    let na = a.rows.len();
    let mut ca = 0usize;
    let mut cb = 0usize;
    for &op in path {
        match op {
            PathOp::Match => {
                for (i, row) in rows.iter_mut().enumerate() {
                    row.residues.push(if i < na {
                        a.rows[i].residues[ca]
                    } else {
                        b.rows[i - na].residues[cb]
                    });
                }
                ca += 1;
                cb += 1;
            }
            PathOp::Delete => {
                for (i, row) in rows.iter_mut().enumerate() {
                    row.residues.push(if i < na { a.rows[i].residues[ca] } else { GAP });
                }
                ca += 1;
            }
            PathOp::Insert => {
                for (i, row) in rows.iter_mut().enumerate() {
                    row.residues.push(if i < na { GAP } else { b.rows[i - na].residues[cb] });
                }
                cb += 1;
            }
        }
    }
    Msa { rows }
}
