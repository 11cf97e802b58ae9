//! Residue alphabets and symbol encoding
//!
//! Three alphabets are supported (amino acid, DNA, RNA) plus an "auto"
//! pre-resolution state handled in the config layer. Amino residues are
//! indexed 0-19 in the order ACDEFGHIKLMNPQRSTVWY to match the VTML240
//! table layout, with X as index 20. Nucleotides are indexed ACGT(U) = 0-3
//! with N as index 4.
//!
//! The internal unknown marker `X`/`N` is deliberately distinct from the gap
//! symbol `-`; the core never converts one into the other.

/// The single reserved gap symbol used in aligned rows.
pub const GAP: u8 = b'-';

/// Amino alphabet size including the X wildcard.
pub const AMINO_SYMS: usize = 21;

/// Nucleotide alphabet size including the N wildcard.
pub const NUCL_SYMS: usize = 5;

/// Largest alphabet size; profile count vectors are dimensioned by this.
pub const MAX_SYMS: usize = AMINO_SYMS;

/// Index of the amino wildcard X.
pub const AMINO_X: usize = 20;

/// Index of the nucleotide wildcard N.
pub const NUCL_N: usize = 4;

/// Resolved residue alphabet for a run.
///
/// Resolved once per run (explicitly or via [`Alphabet::guess`]) and immutable
/// afterwards; determines the scoring table and gap-penalty defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    Amino,
    Dna,
    Rna,
}

impl Alphabet {
    /// Number of residue symbols, wildcard included.
    pub fn size(&self) -> usize {
        match self {
            Alphabet::Amino => AMINO_SYMS,
            Alphabet::Dna | Alphabet::Rna => NUCL_SYMS,
        }
    }

    /// Index of the wildcard symbol (X or N) for this alphabet.
    pub fn wildcard(&self) -> usize {
        match self {
            Alphabet::Amino => AMINO_X,
            Alphabet::Dna | Alphabet::Rna => NUCL_N,
        }
    }

    /// Encode an ASCII residue to its symbol index. Unrecognized residues
    /// (including ambiguity codes outside the core alphabet) map to the
    /// wildcard. The gap symbol is not a residue and must be filtered out
    /// by the caller.
    pub fn encode(&self, c: u8) -> usize {
        let c = c.to_ascii_uppercase();
        match self {
            Alphabet::Amino => match c {
                b'A' => 0,
                b'C' => 1,
                b'D' => 2,
                b'E' => 3,
                b'F' => 4,
                b'G' => 5,
                b'H' => 6,
                b'I' => 7,
                b'K' => 8,
                b'L' => 9,
                b'M' => 10,
                b'N' => 11,
                b'P' => 12,
                b'Q' => 13,
                b'R' => 14,
                b'S' => 15,
                b'T' => 16,
                b'V' => 17,
                b'W' => 18,
                b'Y' => 19,
                _ => AMINO_X,
            },
            Alphabet::Dna => match c {
                b'A' => 0,
                b'C' => 1,
                b'G' => 2,
                b'T' => 3,
                _ => NUCL_N,
            },
            Alphabet::Rna => match c {
                b'A' => 0,
                b'C' => 1,
                b'G' => 2,
                b'U' => 3,
                _ => NUCL_N,
            },
        }
    }

    /// Decode a symbol index back to its ASCII residue.
    pub fn decode(&self, sym: usize) -> u8 {
        match self {
            Alphabet::Amino => b"ACDEFGHIKLMNPQRSTVWYX"[sym],
            Alphabet::Dna => b"ACGTN"[sym],
            Alphabet::Rna => b"ACGUN"[sym],
        }
    }

    /// Infer the alphabet from residue-symbol statistics over the input
    /// sequences. If at least 95% of residues are nucleotide letters the
    /// alphabet is DNA (or RNA when U outnumbers T), otherwise amino.
    pub fn guess<'a, I>(seqs: I) -> Alphabet
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut total = 0u64;
        let mut nucl = 0u64;
        let mut t = 0u64;
        let mut u = 0u64;
        for seq in seqs {
            for &c in seq {
                let c = c.to_ascii_uppercase();
                if c == GAP {
                    continue;
                }
                total += 1;
                match c {
                    b'A' | b'C' | b'G' | b'N' => nucl += 1,
                    b'T' => {
                        nucl += 1;
                        t += 1;
                    }
                    b'U' => {
                        nucl += 1;
                        u += 1;
                    }
                    _ => {}
                }
            }
        }
        if total > 0 && nucl as f64 / total as f64 >= 0.95 {
            if u > t {
                Alphabet::Rna
            } else {
                Alphabet::Dna
            }
        } else {
            Alphabet::Amino
        }
    }

    /// Whether a symbol index is a hydrophobic amino residue
    /// (A, C, F, I, L, M, V, W). Always false for nucleotide alphabets.
    pub fn is_hydrophobic(&self, sym: usize) -> bool {
        match self {
            Alphabet::Amino => matches!(sym, 0 | 1 | 4 | 7 | 9 | 10 | 17 | 18),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_amino() {
        let a = Alphabet::Amino;
        for (i, &c) in b"ACDEFGHIKLMNPQRSTVWY".iter().enumerate() {
            assert_eq!(a.encode(c), i);
            assert_eq!(a.decode(i), c);
        }
        // Unknowns collapse to X
        assert_eq!(a.encode(b'B'), AMINO_X);
        assert_eq!(a.encode(b'Z'), AMINO_X);
        assert_eq!(a.decode(AMINO_X), b'X');
    }

    #[test]
    fn test_encode_nucleotide_case_insensitive() {
        assert_eq!(Alphabet::Dna.encode(b'a'), 0);
        assert_eq!(Alphabet::Dna.encode(b't'), 3);
        assert_eq!(Alphabet::Rna.encode(b'u'), 3);
        assert_eq!(Alphabet::Rna.encode(b'T'), NUCL_N);
    }

    #[test]
    fn test_guess_alphabet() {
        assert_eq!(Alphabet::guess([b"ACGTACGTACGT".as_slice()]), Alphabet::Dna);
        assert_eq!(Alphabet::guess([b"ACGUACGUACGU".as_slice()]), Alphabet::Rna);
        assert_eq!(
            Alphabet::guess([b"MKVLQWERTYIPSDFHKL".as_slice()]),
            Alphabet::Amino
        );
    }

    #[test]
    fn test_hydrophobic_set() {
        let a = Alphabet::Amino;
        for c in b"ACFILMVW" {
            assert!(a.is_hydrophobic(a.encode(*c)), "{} not hydrophobic", *c as char);
        }
        for c in b"DEKRNQH" {
            assert!(!a.is_hydrophobic(a.encode(*c)));
        }
        assert!(!Alphabet::Dna.is_hydrophobic(0));
    }
}
