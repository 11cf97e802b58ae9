//! Run configuration
//!
//! All run-wide knobs live in one explicit `AlignConfig` value threaded
//! through every component call; there is no process-wide mutable state,
//! so independent runs can coexist in one process.

use anyhow::{bail, Result};

use crate::distance::DistanceTransform;
use crate::profile::SeqWeighting;
use crate::tree::{Clustering, RootMethod};

/// Requested sequence type, resolved to an alphabet once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeqType {
    /// Infer from residue-symbol statistics.
    #[default]
    Auto,
    Protein,
    Dna,
    Rna,
}

impl std::str::FromStr for SeqType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(SeqType::Auto),
            "protein" | "amino" => Ok(SeqType::Protein),
            "dna" => Ok(SeqType::Dna),
            "rna" => Ok(SeqType::Rna),
            _ => Err(format!(
                "Unknown sequence type: {}. Use 'auto', 'protein', 'dna' or 'rna'",
                s
            )),
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone)]
pub struct AlignConfig {
    pub seq_type: SeqType,
    /// Total iteration budget. Iteration 1 is the progressive pass,
    /// iteration 2 the tree refit; the remainder drives refinement.
    /// There is no convergence-based early exit.
    pub max_iters: usize,
    /// Anchor-based (vertical) refinement when set; otherwise horizontal
    /// window refinement (or plain tree-dependent refinement when
    /// `window_size` is zero).
    pub anchors: bool,
    /// Column window width for horizontal refinement (0 disables windows).
    pub window_size: usize,
    /// Minimum dominant-residue frequency for an anchor column.
    pub anchor_min_conservation: f32,
    /// Minimum hydrophobic run length before gap penalties tighten
    /// (0 disables the heuristic).
    pub hydro_run_length: usize,
    /// Attenuation factor in (0, 1]; values below 1.0 tighten gap
    /// penalties inside hydrophobic runs.
    pub hydro_factor: f32,
    pub weighting: SeqWeighting,
    /// Clustering for the pass-1 tree (k-mer distances).
    pub cluster1: Clustering,
    /// Clustering for the pass-2 tree refit (identity distances).
    pub cluster2: Clustering,
    /// Identity-to-distance transform for the pass-2 refit.
    pub distance2: DistanceTransform,
    pub rooting: RootMethod,
    /// k-mer length for pass-1 distances.
    pub kmer_size: usize,
    /// Override the score model's default full gap-open penalty.
    pub gap_open: Option<f32>,
    /// Override the score model's default gap-extend penalty.
    pub gap_extend: Option<f32>,
    /// Caller-supplied substitution table (row-major, alphabet-sized);
    /// replaces the built-in table when present.
    pub custom_matrix: Option<Vec<f32>>,
    /// Upper bound on DP matrix cells. Exceeding it is fatal during the
    /// progressive pass; refinement steps that would exceed it are
    /// skipped so the best alignment so far is preserved.
    pub max_dp_cells: usize,
    pub show_progress: bool,
    pub verbose: bool,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            seq_type: SeqType::Auto,
            max_iters: 16,
            anchors: true,
            window_size: 200,
            anchor_min_conservation: 0.9,
            hydro_run_length: 5,
            hydro_factor: 0.8,
            weighting: SeqWeighting::Henikoff,
            cluster1: Clustering::Upgma,
            cluster2: Clustering::Upgma,
            distance2: DistanceTransform::PctIdKimura,
            rooting: RootMethod::LastMerge,
            kmer_size: 6,
            gap_open: None,
            gap_extend: None,
            custom_matrix: None,
            max_dp_cells: 100_000_000,
            show_progress: false,
            verbose: false,
        }
    }
}

impl AlignConfig {
    /// Defensive checks for values no orchestrator should produce.
    pub fn validate(&self) -> Result<()> {
        if self.hydro_factor <= 0.0 || self.hydro_factor > 1.0 {
            bail!(
                "hydrophobicity factor must be in (0, 1], got {}",
                self.hydro_factor
            );
        }
        if self.kmer_size == 0 {
            bail!("k-mer size must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.anchor_min_conservation) {
            bail!(
                "anchor conservation threshold must be in [0, 1], got {}",
                self.anchor_min_conservation
            );
        }
        if let Some(go) = self.gap_open {
            if go > 0.0 {
                bail!("gap-open override must be a non-positive score");
            }
        }
        if let Some(ge) = self.gap_extend {
            if ge > 0.0 {
                bail!("gap-extend override must be a non-positive score");
            }
        }
        if self.max_dp_cells == 0 {
            bail!("DP cell limit must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(AlignConfig::default().validate().is_ok());
    }

    #[test]
    fn test_hydro_factor_range_checked() {
        let mut cfg = AlignConfig::default();
        cfg.hydro_factor = 0.0;
        assert!(cfg.validate().is_err());
        cfg.hydro_factor = 1.5;
        assert!(cfg.validate().is_err());
        cfg.hydro_factor = 1.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_seq_type_selector() {
        assert_eq!("protein".parse::<SeqType>().unwrap(), SeqType::Protein);
        assert_eq!("AUTO".parse::<SeqType>().unwrap(), SeqType::Auto);
        assert!("peptide".parse::<SeqType>().is_err());
    }

    #[test]
    fn test_positive_gap_override_rejected() {
        let mut cfg = AlignConfig::default();
        cfg.gap_open = Some(5.0);
        assert!(cfg.validate().is_err());
    }
}
