//! Substitution score tables and the run score model
//!
//! The amino table is VTML240 in units of hundredths of a bit, laid out in
//! the residue order ACDEFGHIKLMNPQRSTVWY plus a zero-scoring X wildcard
//! (matching `alphabet::Alphabet::encode`). The nucleotide table is a
//! +100/-150 match/mismatch table in the same units, with a zero-scoring N.
//!
//! A `ScoreModel` bundles the resolved alphabet, the substitution table
//! (built-in or caller-supplied) and the affine gap penalties in the same
//! score units. Gap penalties are stored as negative scores.

use anyhow::{bail, Result};

use crate::alphabet::{Alphabet, AMINO_SYMS, NUCL_SYMS};

/// VTML240 substitution scores, 21x21 (ACDEFGHIKLMNPQRSTVWY + X).
/// X scores zero against everything, including itself.
#[rustfmt::skip]
pub static VTML240: [[f32; AMINO_SYMS]; AMINO_SYMS] = [
    //      A     C     D     E     F     G     H     I     K     L     M     N     P     Q     R     S     T     V     W     Y    X
    /*A*/ [ 58.,  23., -12.,  -7., -44.,  10., -23., -14., -14., -27., -17.,  -8.,   1.,  -9., -22.,  23.,  15.,   5., -74., -45., 0.],
    /*C*/ [ 23., 224., -67., -63., -50., -30., -29.,   1., -56., -41.,  -6., -33., -44., -53., -43.,  15.,   2.,  18., -93.,  -6., 0.],
    /*D*/ [-12., -67., 111.,  59.,-104.,  -4.,   4., -84.,   6., -88., -65.,  48., -13.,  18., -29.,   5.,  -7., -63.,-105., -73., 0.],
    /*E*/ [ -7., -63.,  59.,  85., -83., -17.,  -1., -63.,  25., -60., -47.,  15., -12.,  40.,  -8.,   1.,  -7., -47.,-108., -51., 0.],
    /*F*/ [-44., -50.,-104., -83., 144., -93.,   4.,  12., -74.,  36.,  30., -64., -67., -56., -65., -43., -41.,  -3.,  63., 104., 0.],
    /*G*/ [ 10., -30.,  -4., -17., -93., 140., -32., -95., -27., -91., -75.,   4., -36., -29., -32.,   5., -26., -68., -80., -79., 0.],
    /*H*/ [-23., -29.,   4.,  -1.,   4., -32., 137., -50.,   6., -37., -42.,  21., -23.,  27.,  19.,  -4., -12., -44., -13.,  48., 0.],
    /*I*/ [-14.,   1., -84., -63.,  12., -95., -50.,  86., -53.,  53.,  47., -62., -60., -47., -55., -43.,  -8.,  69., -27., -24., 0.],
    /*K*/ [-14., -56.,   6.,  25., -74., -27.,   6., -53.,  75., -48., -30.,  13., -12.,  34.,  68.,  -3.,  -4., -44., -71., -49., 0.],
    /*L*/ [-27., -41., -88., -60.,  36., -91., -37.,  53., -48.,  88.,  62., -63., -48., -36., -48., -47., -25.,  36., -11.,  -4., 0.],
    /*M*/ [-17.,  -6., -65., -47.,  30., -75., -42.,  47., -30.,  62., 103., -45., -54., -21., -31., -35.,  -9.,  31., -46., -20., 0.],
    /*N*/ [ -8., -33.,  48.,  15., -64.,   4.,  21., -62.,  13., -63., -45.,  89., -25.,  12.,   2.,  22.,  10., -51., -79., -29., 0.],
    /*P*/ [  1., -44., -13., -12., -67., -36., -23., -60., -12., -48., -54., -25., 160.,  -6., -20.,   5., -12., -42., -76., -83., 0.],
    /*Q*/ [ -9., -53.,  18.,  40., -56., -29.,  27., -47.,  34., -36., -21.,  12.,  -6.,  75.,  34.,   1.,  -4., -37., -92., -48., 0.],
    /*R*/ [-22., -43., -29.,  -8., -65., -32.,  19., -55.,  68., -48., -31.,   2., -20.,  34., 113., -10., -14., -49., -58., -39., 0.],
    /*S*/ [ 23.,  15.,   5.,   1., -43.,   5.,  -4., -43.,  -3., -47., -35.,  22.,   5.,   1., -10.,  53.,  32., -28., -62., -31., 0.],
    /*T*/ [ 15.,   2.,  -7.,  -7., -41., -26., -12.,  -8.,  -4., -25.,  -9.,  10., -12.,  -4., -14.,  32.,  68.,   0., -87., -40., 0.],
    /*V*/ [  5.,  18., -63., -47.,  -3., -68., -44.,  69., -44.,  36.,  31., -51., -42., -37., -49., -28.,   0.,  74., -61., -32., 0.],
    /*W*/ [-74., -93.,-105.,-108.,  63., -80., -13., -27., -71., -11., -46., -79., -76., -92., -58., -62., -87., -61., 289.,  81., 0.],
    /*Y*/ [-45.,  -6., -73., -51., 104., -79.,  48., -24., -49.,  -4., -20., -29., -83., -48., -39., -31., -40., -32.,  81., 162., 0.],
    /*X*/ [  0.,   0.,   0.,   0.,   0.,   0.,   0.,   0.,   0.,   0.,   0.,   0.,   0.,   0.,   0.,   0.,   0.,   0.,   0.,   0., 0.],
];

/// Nucleotide substitution scores, 5x5 (ACGT/U + N), scaled to roughly the
/// same units as the amino table.
#[rustfmt::skip]
pub static NUCL_MATRIX: [[f32; NUCL_SYMS]; NUCL_SYMS] = [
    //       A      C      G      T     N
    /*A*/ [100., -150., -150., -150., 0.],
    /*C*/ [-150., 100., -150., -150., 0.],
    /*G*/ [-150., -150., 100., -150., 0.],
    /*T*/ [-150., -150., -150., 100., 0.],
    /*N*/ [  0.,    0.,    0.,    0., 0.],
];

/// Default full gap-open penalty for amino alignments (VTML240 units).
pub const AMINO_GAP_OPEN: f32 = -300.0;
/// Default gap-extend penalty per column for amino alignments.
pub const AMINO_GAP_EXTEND: f32 = -30.0;
/// Default full gap-open penalty for nucleotide alignments.
pub const NUCL_GAP_OPEN: f32 = -400.0;
/// Default gap-extend penalty per column for nucleotide alignments.
pub const NUCL_GAP_EXTEND: f32 = -60.0;

/// Substitution table plus affine gap penalties for a resolved alphabet.
#[derive(Debug, Clone)]
pub struct ScoreModel {
    pub alphabet: Alphabet,
    /// Row-major `size x size` substitution scores.
    table: Vec<f32>,
    size: usize,
    /// Full gap-open penalty (negative). Profiles charge half at the open
    /// and half at the close of each gap run.
    pub gap_open: f32,
    /// Gap-extend penalty per additional gap column (negative).
    pub gap_extend: f32,
}

impl ScoreModel {
    /// Built-in table and default gap penalties for an alphabet.
    pub fn for_alphabet(alphabet: Alphabet) -> Self {
        let size = alphabet.size();
        let mut table = vec![0.0; size * size];
        match alphabet {
            Alphabet::Amino => {
                for i in 0..size {
                    for j in 0..size {
                        table[i * size + j] = VTML240[i][j];
                    }
                }
            }
            Alphabet::Dna | Alphabet::Rna => {
                for i in 0..size {
                    for j in 0..size {
                        table[i * size + j] = NUCL_MATRIX[i][j];
                    }
                }
            }
        }
        let (gap_open, gap_extend) = match alphabet {
            Alphabet::Amino => (AMINO_GAP_OPEN, AMINO_GAP_EXTEND),
            Alphabet::Dna | Alphabet::Rna => (NUCL_GAP_OPEN, NUCL_GAP_EXTEND),
        };
        Self {
            alphabet,
            table,
            size,
            gap_open,
            gap_extend,
        }
    }

    /// Score model backed by a caller-supplied substitution table (opaque
    /// data loaded by an external collaborator). The table must be
    /// `size x size` for the given alphabet and symmetric.
    pub fn with_table(alphabet: Alphabet, table: Vec<f32>) -> Result<Self> {
        let size = alphabet.size();
        if table.len() != size * size {
            bail!(
                "substitution table has {} entries, expected {}",
                table.len(),
                size * size
            );
        }
        let (gap_open, gap_extend) = match alphabet {
            Alphabet::Amino => (AMINO_GAP_OPEN, AMINO_GAP_EXTEND),
            Alphabet::Dna | Alphabet::Rna => (NUCL_GAP_OPEN, NUCL_GAP_EXTEND),
        };
        Ok(Self {
            alphabet,
            table,
            size,
            gap_open,
            gap_extend,
        })
    }

    /// Override the default gap penalties. Both must be non-positive.
    pub fn set_gap_penalties(&mut self, gap_open: f32, gap_extend: f32) -> Result<()> {
        if gap_open > 0.0 || gap_extend > 0.0 {
            bail!("gap penalties must be non-positive scores");
        }
        self.gap_open = gap_open;
        self.gap_extend = gap_extend;
        Ok(())
    }

    /// Substitution score for two symbol indices.
    #[inline(always)]
    pub fn score(&self, a: usize, b: usize) -> f32 {
        self.table[a * self.size + b]
    }

    /// Number of symbols covered by the table.
    pub fn size(&self) -> usize {
        self.size
    }
}
