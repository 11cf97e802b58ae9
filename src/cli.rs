//! Command-line front end
//!
//! FASTA in, aligned FASTA out. Method selectors arrive as strings and
//! are parsed into their enums before the engine runs, so a typo fails
//! fast with a usage message instead of mid-run.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use crate::config::AlignConfig;
use crate::engine::align;
use crate::msa::{Msa, Sequence};
use crate::tree::GuideTree;

const FASTA_LINE_WIDTH: usize = 60;

#[derive(Parser, Debug)]
#[command(name = "sinew")]
#[command(version = "0.1.0")]
#[command(about = "Progressive multiple sequence alignment with iterative refinement", long_about = None)]
pub struct Cli {
    /// Input sequences (FASTA)
    #[arg(short, long)]
    pub input: PathBuf,
    /// Output alignment (FASTA); stdout when omitted
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    /// Sequence type: auto, protein, dna or rna
    #[arg(long, default_value = "auto")]
    pub seqtype: String,
    /// Iteration budget (1 = progressive only, 2 adds the tree refit)
    #[arg(long, default_value_t = 16)]
    pub maxiters: usize,
    /// Disable anchor-based refinement in favor of column windows
    #[arg(long, default_value_t = false)]
    pub noanchors: bool,
    /// Column window width for windowed refinement (0 = full width)
    #[arg(long, default_value_t = 200)]
    pub window: usize,
    /// Minimum dominant-residue frequency for an anchor column
    #[arg(long, default_value_t = 0.9)]
    pub anchor_conservation: f32,
    /// Hydrophobic run length that tightens gap penalties (0 disables)
    #[arg(long, default_value_t = 5)]
    pub hydro: usize,
    /// Gap-penalty attenuation inside hydrophobic runs, in (0, 1]
    #[arg(long, default_value_t = 0.8)]
    pub hydro_factor: f32,
    /// Sequence weighting: henikoff or none
    #[arg(long, default_value = "henikoff")]
    pub weighting: String,
    /// Clustering for the first guide tree: upgma, min or max
    #[arg(long, default_value = "upgma")]
    pub cluster1: String,
    /// Clustering for the refitted guide tree
    #[arg(long, default_value = "upgma")]
    pub cluster2: String,
    /// Identity-to-distance transform for the refit: kimura or log
    #[arg(long, default_value = "kimura")]
    pub distance2: String,
    /// Tree rooting: lastmerge or midpoint
    #[arg(long, default_value = "lastmerge")]
    pub root: String,
    /// k-mer length for first-pass distances
    #[arg(long, default_value_t = 6)]
    pub kmer: usize,
    /// Override the gap-open score (non-positive)
    #[arg(long)]
    pub gap_open: Option<f32>,
    /// Override the gap-extend score (non-positive)
    #[arg(long)]
    pub gap_extend: Option<f32>,
    /// Whitespace-separated substitution table replacing the built-in one
    #[arg(long)]
    pub matrix: Option<PathBuf>,
    /// Use this rooted binary Newick tree instead of building one
    #[arg(long)]
    pub usetree: Option<PathBuf>,
    /// Write the guide tree actually used (Newick)
    #[arg(long)]
    pub tree_out: Option<PathBuf>,
    #[arg(short = 'n', long, default_value_t = 0)]
    pub num_threads: usize,
    /// Suppress the progress bar
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,
}

/// Drop gap symbols and stray whitespace so pre-aligned or wrapped input
/// still yields raw residues; the engine rejects gap bytes outright.
fn sanitize_residues(raw: &[u8]) -> Vec<u8> {
    raw.iter()
        .copied()
        .filter(|&c| c != b'-' && c != b'.' && !c.is_ascii_whitespace())
        .collect()
}

fn read_sequences(path: &Path) -> Result<Vec<Sequence>> {
    let reader = bio::io::fasta::Reader::from_file(path)
        .with_context(|| format!("Failed to open input file {}", path.display()))?;
    let mut seqs = Vec::new();
    for record in reader.records() {
        let record = record.context("Failed to parse FASTA record")?;
        let name = match record.desc() {
            Some(desc) => format!("{} {}", record.id(), desc),
            None => record.id().to_string(),
        };
        let residues = sanitize_residues(record.seq());
        seqs.push(Sequence::new(seqs.len() as u32, name, residues));
    }
    Ok(seqs)
}

fn read_matrix(path: &Path) -> Result<Vec<f32>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read matrix file {}", path.display()))?;
    let mut table = Vec::new();
    for token in text.split_whitespace() {
        match token.parse::<f32>() {
            Ok(v) => table.push(v),
            Err(_) => bail!("invalid matrix entry '{}' in {}", token, path.display()),
        }
    }
    Ok(table)
}

fn write_fasta<W: Write>(out: &mut W, msa: &Msa) -> Result<()> {
    for row in msa.rows() {
        writeln!(out, ">{}", row.name)?;
        for chunk in row.residues.chunks(FASTA_LINE_WIDTH) {
            out.write_all(chunk)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn config_from_args(cli: &Cli) -> Result<AlignConfig> {
    let mut cfg = AlignConfig::default();
    cfg.seq_type = cli.seqtype.parse().map_err(anyhow::Error::msg)?;
    cfg.max_iters = cli.maxiters;
    cfg.anchors = !cli.noanchors;
    cfg.window_size = cli.window;
    cfg.anchor_min_conservation = cli.anchor_conservation;
    cfg.hydro_run_length = cli.hydro;
    cfg.hydro_factor = cli.hydro_factor;
    cfg.weighting = cli.weighting.parse().map_err(anyhow::Error::msg)?;
    cfg.cluster1 = cli.cluster1.parse().map_err(anyhow::Error::msg)?;
    cfg.cluster2 = cli.cluster2.parse().map_err(anyhow::Error::msg)?;
    cfg.distance2 = cli.distance2.parse().map_err(anyhow::Error::msg)?;
    cfg.rooting = cli.root.parse().map_err(anyhow::Error::msg)?;
    cfg.kmer_size = cli.kmer;
    cfg.gap_open = cli.gap_open;
    cfg.gap_extend = cli.gap_extend;
    if let Some(path) = &cli.matrix {
        cfg.custom_matrix = Some(read_matrix(path)?);
    }
    cfg.show_progress = !cli.quiet;
    cfg.verbose = cli.verbose;
    Ok(cfg)
}

pub fn run(cli: Cli) -> Result<()> {
    let num_threads = if cli.num_threads == 0 {
        num_cpus::get()
    } else {
        cli.num_threads
    };
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .context("Failed to build thread pool")?;

    let cfg = config_from_args(&cli)?;
    let seqs = read_sequences(&cli.input)?;

    let user_tree = match &cli.usetree {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read tree file {}", path.display()))?;
            Some(GuideTree::from_newick(&text)?)
        }
        None => None,
    };

    let result = align(&seqs, user_tree, &cfg)?;

    if let Some(path) = &cli.tree_out {
        fs::write(path, result.tree.to_newick())
            .with_context(|| format!("Failed to write tree file {}", path.display()))?;
    }

    match &cli.out {
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_fasta(&mut writer, &result.msa)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            write_fasta(&mut writer, &result.msa)?;
            writer.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeqType;

    #[test]
    fn test_defaults_map_to_config() {
        let cli = Cli::parse_from(["sinew", "--input", "in.fa"]);
        let cfg = config_from_args(&cli).unwrap();
        assert_eq!(cfg.seq_type, SeqType::Auto);
        assert_eq!(cfg.max_iters, 16);
        assert!(cfg.anchors);
        assert_eq!(cfg.window_size, 200);
        assert!(cfg.custom_matrix.is_none());
    }

    #[test]
    fn test_bad_selector_rejected() {
        let cli = Cli::parse_from(["sinew", "--input", "in.fa", "--seqtype", "peptide"]);
        assert!(config_from_args(&cli).is_err());
    }

    #[test]
    fn test_noanchors_switches_mode() {
        let cli = Cli::parse_from(["sinew", "--input", "in.fa", "--noanchors"]);
        let cfg = config_from_args(&cli).unwrap();
        assert!(!cfg.anchors);
    }

    #[test]
    fn test_sanitize_strips_gaps_and_whitespace() {
        assert_eq!(sanitize_residues(b"AC-DE"), b"ACDE");
        assert_eq!(sanitize_residues(b"AC.DE\nFG "), b"ACDEFG");
        assert_eq!(sanitize_residues(b"MKV"), b"MKV");
    }

    #[test]
    fn test_fasta_wrapping() {
        let seq = Sequence::new(0, "long", vec![b'A'; 130]);
        let msa = Msa::from_sequence(&seq);
        let mut buf = Vec::new();
        write_fasta(&mut buf, &msa).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ">long");
        assert_eq!(lines[1].len(), 60);
        assert_eq!(lines[2].len(), 60);
        assert_eq!(lines[3].len(), 10);
    }
}
