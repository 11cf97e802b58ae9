//! Guide tree construction and validation
//!
//! A `GuideTree` is a rooted binary tree stored as an arena of nodes
//! addressed by index, with exactly `2N - 1` nodes for `N` leaves and a
//! bijection between leaves and input sequences. Trees are built by
//! agglomerative (UPGMA-style) clustering over a `DistSource`, loaded from
//! Newick text and validated against the input set, or refit from an
//! existing alignment's percent-identity distances for the second pass.

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::distance::{DistSource, DistanceTransform, KmerDistance, MsaDistance};
use crate::msa::{Msa, Sequence};

/// Agglomerative clustering linkage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clustering {
    /// UPGMA with average linkage.
    #[default]
    Upgma,
    /// Single linkage (minimum inter-cluster distance).
    UpgmaMin,
    /// Complete linkage (maximum inter-cluster distance).
    UpgmaMax,
}

impl std::str::FromStr for Clustering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "upgma" | "avg" => Ok(Clustering::Upgma),
            "upgmamin" | "min" => Ok(Clustering::UpgmaMin),
            "upgmamax" | "max" => Ok(Clustering::UpgmaMax),
            _ => Err(format!(
                "Unknown clustering method: {}. Use 'upgma', 'min' or 'max'",
                s
            )),
        }
    }
}

/// Where the root is placed relative to the final merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootMethod {
    /// Root at the last merge event.
    #[default]
    LastMerge,
    /// Root height set midway along the longest leaf-to-leaf path. For
    /// average-linkage UPGMA the tree is ultrametric and this coincides
    /// with the last merge; it differs for min/max linkage.
    Midpoint,
}

impl std::str::FromStr for RootMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lastmerge" | "last" => Ok(RootMethod::LastMerge),
            "midpoint" | "mid" => Ok(RootMethod::Midpoint),
            _ => Err(format!(
                "Unknown rooting method: {}. Use 'lastmerge' or 'midpoint'",
                s
            )),
        }
    }
}

/// One arena node. Leaves carry a sequence row index and name; internal
/// nodes carry two children. `branch_length` is the distance to the parent
/// (zero for the root).
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub parent: Option<usize>,
    pub name: Option<String>,
    pub seq_index: Option<usize>,
    pub branch_length: f32,
}

impl TreeNode {
    fn leaf(name: String, seq_index: Option<usize>) -> Self {
        Self {
            left: None,
            right: None,
            parent: None,
            name: Some(name),
            seq_index,
            branch_length: 0.0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Rooted binary guide tree over the input sequences.
#[derive(Debug, Clone)]
pub struct GuideTree {
    nodes: Vec<TreeNode>,
    root: usize,
}

impl GuideTree {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn node(&self, i: usize) -> &TreeNode {
        &self.nodes[i]
    }

    /// Node indices in post-order (children before parent, root last).
    pub fn post_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        // (node, children_done)
        let mut stack = vec![(self.root, false)];
        while let Some((idx, done)) = stack.pop() {
            if done || self.nodes[idx].is_leaf() {
                order.push(idx);
                continue;
            }
            stack.push((idx, true));
            if let Some(r) = self.nodes[idx].right {
                stack.push((r, false));
            }
            if let Some(l) = self.nodes[idx].left {
                stack.push((l, false));
            }
        }
        order
    }

    /// Sequence row indices of the leaves under a node, in leaf order.
    pub fn leaves_under(&self, node: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(idx) = stack.pop() {
            let n = &self.nodes[idx];
            if let Some(si) = n.seq_index {
                out.push(si);
            }
            if let Some(r) = n.right {
                stack.push(r);
            }
            if let Some(l) = n.left {
                stack.push(l);
            }
        }
        out.sort_unstable();
        out
    }

    /// Every non-root node, i.e. every tree edge (the edge to its parent).
    /// Deterministic ascending order keeps refinement reproducible.
    pub fn edges(&self) -> Vec<usize> {
        (0..self.nodes.len()).filter(|&i| i != self.root).collect()
    }

    /// Build a tree by agglomerative clustering over a distance source.
    ///
    /// Repeatedly merges the two closest clusters into a new internal node
    /// until one remains. Ties on the minimal distance break to the lowest
    /// index pair so runs are reproducible.
    pub fn build<D>(src: &D, clustering: Clustering, rooting: RootMethod) -> Result<GuideTree>
    where
        D: DistSource + ?Sized,
    {
        let n = src.count();
        if n == 0 {
            bail!("cannot build a guide tree over zero sequences");
        }
        if n == 1 {
            let node = TreeNode::leaf(src.name(0).to_string(), Some(0));
            return Ok(GuideTree {
                nodes: vec![node],
                root: 0,
            });
        }

        // Lower-triangle distances; rows are independent, compute in parallel.
        let triangle: Vec<Vec<f32>> = (0..n)
            .into_par_iter()
            .map(|i| {
                let mut row = vec![0.0f32; i];
                src.calc_dist_range(i, &mut row);
                row
            })
            .collect();
        let mut dist = vec![vec![0.0f32; n]; n];
        for i in 0..n {
            for j in 0..i {
                dist[i][j] = triangle[i][j];
                dist[j][i] = triangle[i][j];
            }
        }
        let max_pair_dist = dist
            .iter()
            .flat_map(|r| r.iter().copied())
            .fold(0.0f32, f32::max);

        let mut nodes: Vec<TreeNode> = (0..n)
            .map(|i| TreeNode::leaf(src.name(i).to_string(), Some(i)))
            .collect();
        let mut heights = vec![0.0f32; 2 * n - 1];

        // Active clusters: cluster slot -> (node index, leaf count)
        let mut cluster: Vec<Option<(usize, usize)>> = (0..n).map(|i| Some((i, 1))).collect();
        let mut active = n;

        while active > 1 {
            // Lowest-index pair wins ties (strict < comparison).
            let mut best: Option<(usize, usize, f32)> = None;
            for i in 0..cluster.len() {
                if cluster[i].is_none() {
                    continue;
                }
                for j in (i + 1)..cluster.len() {
                    if cluster[j].is_none() {
                        continue;
                    }
                    let d = dist[i][j];
                    if best.map_or(true, |(_, _, bd)| d < bd) {
                        best = Some((i, j, d));
                    }
                }
            }
            let (i, j, dmin) = match best {
                Some(b) => b,
                None => bail!("clustering ran out of active pairs"),
            };
            let ((node_i, size_i), (node_j, size_j)) = match (cluster[i], cluster[j]) {
                (Some(ci), Some(cj)) => (ci, cj),
                _ => bail!("clustering selected an inactive cluster"),
            };

            let new_idx = nodes.len();
            let height = dmin / 2.0;
            nodes.push(TreeNode {
                left: Some(node_i),
                right: Some(node_j),
                parent: None,
                name: None,
                seq_index: None,
                branch_length: 0.0,
            });
            heights[new_idx] = height;
            nodes[node_i].parent = Some(new_idx);
            nodes[node_i].branch_length = (height - heights[node_i]).max(0.0);
            nodes[node_j].parent = Some(new_idx);
            nodes[node_j].branch_length = (height - heights[node_j]).max(0.0);

            // Merge cluster j into slot i and update distances to the rest.
            for k in 0..cluster.len() {
                if k == i || k == j || cluster[k].is_none() {
                    continue;
                }
                let d = match clustering {
                    Clustering::Upgma => {
                        (size_i as f32 * dist[i][k] + size_j as f32 * dist[j][k])
                            / (size_i + size_j) as f32
                    }
                    Clustering::UpgmaMin => dist[i][k].min(dist[j][k]),
                    Clustering::UpgmaMax => dist[i][k].max(dist[j][k]),
                };
                dist[i][k] = d;
                dist[k][i] = d;
            }
            cluster[i] = Some((new_idx, size_i + size_j));
            cluster[j] = None;
            active -= 1;
        }

        let root = nodes.len() - 1;
        if rooting == RootMethod::Midpoint {
            // Stretch the root height to half the longest leaf-to-leaf
            // distance; only the two root branch lengths change.
            let root_height = heights[root].max(max_pair_dist / 2.0);
            if let (Some(l), Some(r)) = (nodes[root].left, nodes[root].right) {
                nodes[l].branch_length = (root_height - heights[l]).max(0.0);
                nodes[r].branch_length = (root_height - heights[r]).max(0.0);
            }
        }
        Ok(GuideTree { nodes, root })
    }

    /// Parse an externally supplied Newick tree. The result still has no
    /// leaf-to-sequence mapping; callers must run [`GuideTree::validate`].
    pub fn from_newick(text: &str) -> Result<GuideTree> {
        let bytes = text.trim().as_bytes();
        if bytes.is_empty() {
            bail!("empty tree description");
        }
        let mut parser = NewickParser { bytes, pos: 0 };
        let mut nodes = Vec::new();
        let root = parser.parse_node(&mut nodes)?;
        parser.skip_ws();
        if parser.peek() == Some(b';') {
            parser.pos += 1;
        }
        parser.skip_ws();
        if parser.pos != bytes.len() {
            bail!("trailing characters after tree description");
        }
        Ok(GuideTree { nodes, root })
    }

    /// Validate a loaded tree against the input sequence set and assign
    /// leaf-to-sequence mappings. Any failure is fatal for the run.
    pub fn validate(&mut self, seqs: &[Sequence]) -> Result<()> {
        let root = &self.nodes[self.root];
        if root.left.is_none() || root.right.is_none() {
            bail!("user tree must be rooted");
        }
        let leaf_count = self.leaf_count();
        if leaf_count != seqs.len() {
            bail!(
                "user tree has {} leaves but input has {} sequences",
                leaf_count,
                seqs.len()
            );
        }
        if self.nodes.len() != 2 * seqs.len() - 1 {
            bail!("user tree is not binary");
        }
        let mut by_name: FxHashMap<&str, usize> = FxHashMap::default();
        for (i, s) in seqs.iter().enumerate() {
            if by_name.insert(s.name.as_str(), i).is_some() {
                bail!("duplicate sequence name '{}'", s.name);
            }
        }
        let mut seen: FxHashSet<usize> = FxHashSet::default();
        for idx in 0..self.nodes.len() {
            if !self.nodes[idx].is_leaf() {
                continue;
            }
            let name = match &self.nodes[idx].name {
                Some(n) if !n.is_empty() => n.clone(),
                _ => bail!("user tree has an unlabeled leaf"),
            };
            let seq_index = match by_name.get(name.as_str()) {
                Some(&i) => i,
                None => bail!("label {} in tree does not match input sequences", name),
            };
            if !seen.insert(seq_index) {
                bail!("label {} appears more than once in tree", name);
            }
            self.nodes[idx].seq_index = Some(seq_index);
        }
        // leaf_count == seqs.len() and no duplicates, so every sequence is
        // reachable from exactly one leaf.
        Ok(())
    }

    /// Serialize to Newick for the external tree collaborator.
    pub fn to_newick(&self) -> String {
        let mut out = String::new();
        self.write_newick(self.root, &mut out);
        out.push(';');
        out
    }

    fn write_newick(&self, idx: usize, out: &mut String) {
        let node = &self.nodes[idx];
        if let (Some(l), Some(r)) = (node.left, node.right) {
            out.push('(');
            self.write_newick(l, out);
            out.push(',');
            self.write_newick(r, out);
            out.push(')');
        } else if let Some(name) = &node.name {
            out.push_str(name);
        }
        if node.parent.is_some() {
            out.push_str(&format!(":{:.5}", node.branch_length));
        }
    }
}

struct NewickParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl NewickParser<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse_node(&mut self, nodes: &mut Vec<TreeNode>) -> Result<usize> {
        self.skip_ws();
        let idx = if self.peek() == Some(b'(') {
            self.pos += 1;
            let left = self.parse_node(nodes)?;
            self.skip_ws();
            if self.peek() != Some(b',') {
                bail!("expected ',' in tree description at offset {}", self.pos);
            }
            self.pos += 1;
            let right = self.parse_node(nodes)?;
            self.skip_ws();
            match self.peek() {
                Some(b')') => self.pos += 1,
                Some(b',') => bail!("guide tree must be binary"),
                _ => bail!("unbalanced parentheses in tree description"),
            }
            // Optional internal label, ignored
            let _ = self.parse_label();
            let idx = nodes.len();
            nodes.push(TreeNode {
                left: Some(left),
                right: Some(right),
                parent: None,
                name: None,
                seq_index: None,
                branch_length: 0.0,
            });
            nodes[left].parent = Some(idx);
            nodes[right].parent = Some(idx);
            idx
        } else {
            let name = self.parse_label();
            if name.is_empty() {
                bail!("expected leaf label at offset {}", self.pos);
            }
            let idx = nodes.len();
            nodes.push(TreeNode::leaf(name, None));
            idx
        };
        if self.peek() == Some(b':') {
            self.pos += 1;
            let start = self.pos;
            while matches!(self.peek(), Some(c) if !matches!(c, b',' | b')' | b';') && !c.is_ascii_whitespace())
            {
                self.pos += 1;
            }
            let text = std::str::from_utf8(&self.bytes[start..self.pos])?;
            nodes[idx].branch_length = text
                .parse::<f32>()
                .with_context(|| format!("invalid branch length '{}'", text))?;
        }
        Ok(idx)
    }

    fn parse_label(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if !matches!(c, b'(' | b')' | b',' | b':' | b';') && !c.is_ascii_whitespace())
        {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned()
    }
}

/// Pass-1 tree from raw, unaligned sequences via k-mer distances.
pub fn tree_from_seqs(
    seqs: &[Sequence],
    kmer_size: usize,
    clustering: Clustering,
    rooting: RootMethod,
) -> Result<GuideTree> {
    let src = KmerDistance::new(seqs, kmer_size);
    GuideTree::build(&src, clustering, rooting)
}

/// Pass-2 tree refit from an existing alignment's identity distances.
pub fn tree_from_msa(
    msa: &Msa,
    transform: DistanceTransform,
    clustering: Clustering,
    rooting: RootMethod,
) -> Result<GuideTree> {
    let src = MsaDistance::new(msa, transform);
    GuideTree::build(&src, clustering, rooting)
}
