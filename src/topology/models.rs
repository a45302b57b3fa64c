// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Token Flow Simulation Suite - Generative Models

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::{AdjacencyRow, ModelConfig};
use crate::error::{Result, SimError};
use crate::matrix::random_composition;
use crate::types::{Edge, GraphKind};

/// Attempts before random-regular generation gives up.
const REGULAR_MAX_ATTEMPTS: usize = 1000;

// ---------------------------------------------------------------------------
// Generator output
// ---------------------------------------------------------------------------

/// How starting balances are assigned once the edges exist.
#[derive(Debug, Clone, PartialEq)]
pub enum BalancePlan {
    /// Uniform integer draw from the configured range.
    Uniform,
    /// Gaussian around the mean of each node's block.
    PerBlock { block_of: Vec<usize>, means: Vec<f64>, std_dev: f64 },
    /// Given explicitly, one per node.
    Explicit(Vec<f64>),
}

/// A freshly generated edge set over raw node labels, before balances,
/// repair and relabelling.
#[derive(Debug, Clone)]
pub struct RawTopology {
    pub kind: GraphKind,
    pub labels: Vec<String>,
    pub edges: Vec<Edge>,
    pub balances: BalancePlan,
}

impl RawTopology {
    fn indexed(kind: GraphKind, n: usize, edges: Vec<Edge>) -> Self {
        Self {
            kind,
            labels: (0..n).map(|i| i.to_string()).collect(),
            edges,
            balances: BalancePlan::Uniform,
        }
    }

    pub fn directed(&self) -> bool {
        self.kind.is_directed()
    }
}

// ---------------------------------------------------------------------------
// Undirected simple-graph builder
// ---------------------------------------------------------------------------

/// Collects undirected edges without duplicates or self-loops.
struct SimpleGraph {
    adj: Vec<BTreeSet<usize>>,
    edges: Vec<Edge>,
}

impl SimpleGraph {
    fn new(n: usize) -> Self {
        Self { adj: vec![BTreeSet::new(); n], edges: Vec::new() }
    }

    fn add(&mut self, u: usize, v: usize) -> bool {
        if u == v || self.adj[u].contains(&v) {
            return false;
        }
        self.adj[u].insert(v);
        self.adj[v].insert(u);
        self.edges.push(Edge::new(u, v));
        true
    }

    fn degree(&self, u: usize) -> usize {
        self.adj[u].len()
    }
}

// ---------------------------------------------------------------------------
// Model dispatch
// ---------------------------------------------------------------------------

impl ModelConfig {
    pub fn kind(&self) -> GraphKind {
        match self {
            Self::RandomEdge { .. } => GraphKind::RandomEdge,
            Self::SmallWorld { .. } => GraphKind::SmallWorld,
            Self::PreferentialAttachment { .. } => GraphKind::PreferentialAttachment,
            Self::Circulant { .. } => GraphKind::Circulant,
            Self::Lattice { .. } => GraphKind::Lattice,
            Self::Barbell { .. } => GraphKind::Barbell,
            Self::StochasticBlock { .. } => GraphKind::StochasticBlock,
            Self::Custom { .. } => GraphKind::Custom,
            Self::RandomRegular { .. } => GraphKind::RandomRegular,
            Self::RandomMultiDirected { .. } => GraphKind::RandomMultiDirected,
        }
    }

    /// Parameter checks against the node count. Runs before any generation.
    pub fn validate(&self, n: usize) -> Result<()> {
        match self {
            Self::RandomEdge { edge_probability } => {
                check_probability("edge_probability", *edge_probability)
            }
            Self::SmallWorld { k, rewire_probability } => {
                if *k < 2 || *k >= n {
                    return Err(SimError::invalid("k", format!("need 2 <= k < {}, got {}", n, k)));
                }
                if *k % 2 != 0 {
                    return Err(SimError::invalid("k", format!("must be even, got {}", k)));
                }
                check_probability("rewire_probability", *rewire_probability)
            }
            Self::PreferentialAttachment { m } => {
                if *m < 1 || *m >= n {
                    return Err(SimError::invalid("m", format!("need 1 <= m < {}, got {}", n, m)));
                }
                Ok(())
            }
            Self::Circulant { offsets } => {
                if offsets.is_empty() {
                    return Err(SimError::invalid("offsets", "at least one offset is required"));
                }
                if let Some(bad) = offsets.iter().find(|&&o| o == 0 || o >= n) {
                    return Err(SimError::invalid(
                        "offsets",
                        format!("offset {} outside 1..{}", bad, n),
                    ));
                }
                Ok(())
            }
            Self::Lattice { columns } => match columns {
                Some(c) if *c == 0 || *c > n => Err(SimError::invalid(
                    "columns",
                    format!("need 1 <= columns <= {}, got {}", n, c),
                )),
                _ => Ok(()),
            },
            Self::Barbell { bell_size } => {
                let bell = barbell_size(*bell_size, n);
                if bell < 2 || 2 * bell > n {
                    return Err(SimError::invalid(
                        "bell_size",
                        format!("need 2 <= bell_size <= {}, got {}", n / 2, bell),
                    ));
                }
                Ok(())
            }
            Self::StochasticBlock { blocks, intra_probability, inter_probability, block_means, std_dev } => {
                if *blocks == 0 || *blocks > n {
                    return Err(SimError::invalid("blocks", format!("need 1 <= blocks <= {}, got {}", n, blocks)));
                }
                if *blocks > block_means.len() {
                    return Err(SimError::invalid(
                        "block_means",
                        format!("{} blocks but only {} means", blocks, block_means.len()),
                    ));
                }
                check_range("intra_probability", *intra_probability)?;
                check_range("inter_probability", *inter_probability)?;
                if !std_dev.is_finite() || *std_dev < 0.0 {
                    return Err(SimError::invalid("std_dev", format!("must be non-negative, got {}", std_dev)));
                }
                Ok(())
            }
            Self::Custom { adjacency, balances } => {
                if adjacency.len() != n {
                    return Err(SimError::invalid(
                        "node_count",
                        format!("custom adjacency lists {} nodes, config says {}", adjacency.len(), n),
                    ));
                }
                if balances.len() != n {
                    return Err(SimError::BalanceMismatch { expected: n, got: balances.len() });
                }
                if let Some(b) = balances.iter().find(|b| !b.is_finite() || **b < 0.0) {
                    return Err(SimError::invalid("balances", format!("balance {} is not a non-negative number", b)));
                }
                custom_index(adjacency).map(|_| ())
            }
            Self::RandomRegular { degree } => {
                if *degree < 1 || *degree >= n {
                    return Err(SimError::invalid("degree", format!("need 1 <= degree < {}, got {}", n, degree)));
                }
                if (n * degree) % 2 != 0 {
                    return Err(SimError::invalid("degree", format!("n * degree must be even, got {} * {}", n, degree)));
                }
                Ok(())
            }
            Self::RandomMultiDirected { .. } => Ok(()),
        }
    }

    /// Build the raw edge set for `n` nodes.
    pub fn generate<R: Rng>(&self, n: usize, rng: &mut R) -> Result<RawTopology> {
        self.validate(n)?;
        let kind = self.kind();
        let raw = match self {
            Self::RandomEdge { edge_probability } => {
                RawTopology::indexed(kind, n, random_edge(n, *edge_probability, rng))
            }
            Self::SmallWorld { k, rewire_probability } => {
                RawTopology::indexed(kind, n, small_world(n, *k, *rewire_probability, rng))
            }
            Self::PreferentialAttachment { m } => {
                RawTopology::indexed(kind, n, preferential_attachment(n, *m, rng))
            }
            Self::Circulant { offsets } => RawTopology::indexed(kind, n, circulant(n, offsets)),
            Self::Lattice { columns } => {
                let cols = columns.unwrap_or_else(|| (n as f64).sqrt().ceil() as usize);
                RawTopology::indexed(kind, n, triangular_lattice(n, cols))
            }
            Self::Barbell { bell_size } => {
                RawTopology::indexed(kind, n, barbell(n, barbell_size(*bell_size, n)))
            }
            Self::StochasticBlock { blocks, intra_probability, inter_probability, block_means, std_dev } => {
                let (edges, block_of) =
                    stochastic_block(n, *blocks, *intra_probability, *inter_probability, rng)?;
                let mut raw = RawTopology::indexed(kind, n, edges);
                raw.balances = BalancePlan::PerBlock {
                    block_of,
                    means: block_means.clone(),
                    std_dev: *std_dev,
                };
                raw
            }
            Self::Custom { adjacency, balances } => {
                let index = custom_index(adjacency)?;
                let edges = adjacency
                    .iter()
                    .enumerate()
                    .flat_map(|(i, row)| row.targets.iter().map(move |t| (i, t)))
                    .map(|(i, t)| Edge::new(i, index[t.as_str()]))
                    .collect();
                RawTopology {
                    kind,
                    labels: adjacency.iter().map(|r| r.node.clone()).collect(),
                    edges,
                    balances: BalancePlan::Explicit(balances.clone()),
                }
            }
            Self::RandomRegular { degree } => {
                RawTopology::indexed(kind, n, random_regular(n, *degree, rng)?)
            }
            Self::RandomMultiDirected { edge_count } => {
                let m = edge_count.unwrap_or(n + n / 3);
                RawTopology::indexed(kind, n, random_multi_directed(n, m, rng))
            }
        };
        Ok(raw)
    }
}

fn check_probability(name: &'static str, p: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(SimError::invalid(name, format!("probability {} outside [0, 1]", p)));
    }
    Ok(())
}

fn check_range(name: &'static str, range: [f64; 2]) -> Result<()> {
    check_probability(name, range[0])?;
    check_probability(name, range[1])?;
    if range[0] > range[1] {
        return Err(SimError::invalid(name, format!("low {} exceeds high {}", range[0], range[1])));
    }
    Ok(())
}

fn barbell_size(bell_size: Option<usize>, n: usize) -> usize {
    bell_size.unwrap_or_else(|| (n / 3).max(2))
}

/// Node name → index, rejecting duplicates and dangling targets.
fn custom_index(adjacency: &[AdjacencyRow]) -> Result<HashMap<&str, usize>> {
    let mut index = HashMap::with_capacity(adjacency.len());
    for (i, row) in adjacency.iter().enumerate() {
        if index.insert(row.node.as_str(), i).is_some() {
            return Err(SimError::MalformedAdjacency(format!("node {} listed twice", row.node)));
        }
    }
    for row in adjacency {
        if let Some(t) = row.targets.iter().find(|t| !index.contains_key(t.as_str())) {
            return Err(SimError::MalformedAdjacency(format!(
                "node {} points at unknown node {}",
                row.node, t
            )));
        }
    }
    Ok(index)
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// G(n, p): each unordered pair independently with probability `p`.
fn random_edge<R: Rng>(n: usize, p: f64, rng: &mut R) -> Vec<Edge> {
    let mut g = SimpleGraph::new(n);
    for u in 0..n {
        for v in (u + 1)..n {
            if rng.gen_bool(p) {
                g.add(u, v);
            }
        }
    }
    g.edges
}

/// Newman–Watts–Strogatz: a ring lattice plus random shortcuts. Ring edges
/// are never removed.
fn small_world<R: Rng>(n: usize, k: usize, p: f64, rng: &mut R) -> Vec<Edge> {
    let mut g = SimpleGraph::new(n);
    for j in 1..=(k / 2) {
        for i in 0..n {
            g.add(i, (i + j) % n);
        }
    }
    let ring: Vec<(usize, usize)> = g.edges.iter().map(|e| (e.source, e.target)).collect();
    for (u, _) in ring {
        if !rng.gen_bool(p) || g.degree(u) >= n - 1 {
            continue;
        }
        loop {
            let w = rng.gen_range(0..n);
            if g.add(u, w) {
                break;
            }
        }
    }
    g.edges
}

/// Barabási–Albert: a star on `m + 1` nodes, then each new node attaches to
/// `m` distinct existing nodes drawn in proportion to degree.
fn preferential_attachment<R: Rng>(n: usize, m: usize, rng: &mut R) -> Vec<Edge> {
    let mut g = SimpleGraph::new(n);
    let mut repeated: Vec<usize> = Vec::new();
    for leaf in 1..=m {
        g.add(0, leaf);
        repeated.push(0);
        repeated.push(leaf);
    }
    for source in (m + 1)..n {
        let mut targets = BTreeSet::new();
        while targets.len() < m {
            if let Some(&t) = repeated.choose(rng) {
                targets.insert(t);
            }
        }
        for &t in &targets {
            g.add(source, t);
            repeated.push(t);
            repeated.push(source);
        }
    }
    g.edges
}

/// Each node links to the nodes `offset` steps ahead (and so behind) on a ring.
fn circulant(n: usize, offsets: &[usize]) -> Vec<Edge> {
    let mut g = SimpleGraph::new(n);
    for i in 0..n {
        for &o in offsets {
            g.add(i, (i + o) % n);
        }
    }
    g.edges
}

/// Triangular lattice on a row-major grid: right, down and down-right links.
fn triangular_lattice(n: usize, cols: usize) -> Vec<Edge> {
    let mut g = SimpleGraph::new(n);
    for k in 0..n {
        let c = k % cols;
        if c + 1 < cols && k + 1 < n {
            g.add(k, k + 1);
        }
        if k + cols < n {
            g.add(k, k + cols);
        }
        if c + 1 < cols && k + cols + 1 < n {
            g.add(k, k + cols + 1);
        }
    }
    g.edges
}

/// Two cliques of `bell` nodes joined by a path through the remaining nodes.
fn barbell(n: usize, bell: usize) -> Vec<Edge> {
    let mut g = SimpleGraph::new(n);
    let second = n - bell;
    for (lo, hi) in [(0, bell), (second, n)] {
        for u in lo..hi {
            for v in (u + 1)..hi {
                g.add(u, v);
            }
        }
    }
    for k in (bell - 1)..second {
        g.add(k, k + 1);
    }
    g.edges
}

/// Stochastic block model. Block sizes are a random composition of `n`; the
/// symmetric block matrix draws diagonal entries from `intra` and the rest
/// from `inter`, rounded to two decimals.
fn stochastic_block<R: Rng>(
    n: usize,
    blocks: usize,
    intra: [f64; 2],
    inter: [f64; 2],
    rng: &mut R,
) -> Result<(Vec<Edge>, Vec<usize>)> {
    let sizes = random_composition(n, blocks, rng)?;
    let block_of: Vec<usize> = sizes
        .iter()
        .enumerate()
        .flat_map(|(b, &size)| std::iter::repeat(b).take(size))
        .collect();

    let mut probs = vec![vec![0.0; blocks]; blocks];
    for i in 0..blocks {
        for j in i..blocks {
            let [lo, hi] = if i == j { intra } else { inter };
            let p = (rng.gen_range(lo..=hi) * 100.0).round() / 100.0;
            probs[i][j] = p;
            probs[j][i] = p;
        }
    }

    let mut g = SimpleGraph::new(n);
    for u in 0..n {
        for v in (u + 1)..n {
            let p = probs[block_of[u]][block_of[v]].clamp(0.0, 1.0);
            if rng.gen_bool(p) {
                g.add(u, v);
            }
        }
    }
    Ok((g.edges, block_of))
}

/// Random `degree`-regular simple graph by repeated stub pairing; stubs
/// that cannot pair are carried into the next pass.
fn random_regular<R: Rng>(n: usize, degree: usize, rng: &mut R) -> Result<Vec<Edge>> {
    for _ in 0..REGULAR_MAX_ATTEMPTS {
        if let Some(pairs) = try_regular(n, degree, rng) {
            return Ok(pairs.into_iter().map(|(u, v)| Edge::new(u, v)).collect());
        }
    }
    Err(SimError::invalid(
        "degree",
        format!("no {}-regular graph on {} nodes after {} attempts", degree, n, REGULAR_MAX_ATTEMPTS),
    ))
}

fn try_regular<R: Rng>(n: usize, degree: usize, rng: &mut R) -> Option<Vec<(usize, usize)>> {
    let mut edges: BTreeSet<(usize, usize)> = BTreeSet::new();
    let mut stubs: Vec<usize> = (0..n).flat_map(|v| std::iter::repeat(v).take(degree)).collect();
    while !stubs.is_empty() {
        let mut leftover: BTreeMap<usize, usize> = BTreeMap::new();
        stubs.shuffle(rng);
        for pair in stubs.chunks_exact(2) {
            let (s1, s2) = (pair[0].min(pair[1]), pair[0].max(pair[1]));
            if s1 != s2 && !edges.contains(&(s1, s2)) {
                edges.insert((s1, s2));
            } else {
                *leftover.entry(s1).or_insert(0) += 1;
                *leftover.entry(s2).or_insert(0) += 1;
            }
        }
        if !pairing_possible(&edges, &leftover) {
            return None;
        }
        stubs = leftover
            .iter()
            .flat_map(|(&node, &count)| std::iter::repeat(node).take(count))
            .collect();
    }
    Some(edges.into_iter().collect())
}

/// Whether any two distinct leftover nodes are still unlinked.
fn pairing_possible(edges: &BTreeSet<(usize, usize)>, leftover: &BTreeMap<usize, usize>) -> bool {
    if leftover.is_empty() {
        return true;
    }
    let nodes: Vec<usize> = leftover.keys().copied().collect();
    nodes.iter().enumerate().any(|(i, &a)| {
        nodes[i + 1..].iter().any(|&b| !edges.contains(&(a, b)))
    })
}

/// Directed multigraph: `m` edges, both endpoints drawn uniformly with
/// replacement. Parallel edges and self-loops are kept.
fn random_multi_directed<R: Rng>(n: usize, m: usize, rng: &mut R) -> Vec<Edge> {
    (0..m)
        .map(|_| Edge::new(rng.gen_range(0..n), rng.gen_range(0..n)))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn degrees(n: usize, edges: &[Edge]) -> Vec<usize> {
        let mut d = vec![0; n];
        for e in edges {
            d[e.source] += 1;
            d[e.target] += 1;
        }
        d
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_circulant_default_offsets() {
        let edges = circulant(10, &[1, 3]);
        assert_eq!(edges.len(), 20);
        assert!(degrees(10, &edges).iter().all(|&d| d == 4));
    }

    #[test]
    fn test_small_world_keeps_ring() {
        let edges = small_world(12, 2, 0.5, &mut rng());
        for i in 0..12 {
            let j = (i + 1) % 12;
            assert!(edges.iter().any(|e| (e.source == i && e.target == j) || (e.source == j && e.target == i)));
        }
        assert!(edges.iter().all(|e| !e.is_self_loop()));
    }

    #[test]
    fn test_preferential_attachment_edge_count() {
        let edges = preferential_attachment(20, 2, &mut rng());
        // star of m edges, then m per new node
        assert_eq!(edges.len(), 2 + 2 * (20 - 3));
    }

    #[test]
    fn test_lattice_links() {
        let edges = triangular_lattice(9, 3);
        let d = degrees(9, &edges);
        // centre of a 3x3 sheared grid has all six neighbours
        assert_eq!(d[4], 6);
        assert_eq!(d[0], 3);
    }

    #[test]
    fn test_barbell_shape() {
        let edges = barbell(10, 3);
        // two K3 (3 edges each) plus a path 2-3-4-5-6-7
        assert_eq!(edges.len(), 3 + 3 + 5);
        let d = degrees(10, &edges);
        assert_eq!(d[2], 3);
        assert_eq!(d[4], 2);
    }

    #[test]
    fn test_barbell_without_path() {
        let edges = barbell(6, 3);
        assert_eq!(edges.len(), 7);
    }

    #[test]
    fn test_random_regular_degrees() {
        let edges = random_regular(10, 3, &mut rng()).unwrap();
        assert!(degrees(10, &edges).iter().all(|&d| d == 3));
        let unique: BTreeSet<(usize, usize)> = edges.iter().map(|e| (e.source, e.target)).collect();
        assert_eq!(unique.len(), edges.len());
    }

    #[test]
    fn test_stochastic_block_assignment() {
        let (_, block_of) = stochastic_block(12, 4, [0.4, 0.7], [0.01, 0.2], &mut rng()).unwrap();
        assert_eq!(block_of.len(), 12);
        assert!(block_of.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(block_of.iter().copied().collect::<BTreeSet<_>>().len(), 4);
    }

    #[test]
    fn test_random_multi_directed_default_edge_count() {
        let raw = ModelConfig::default().generate(9, &mut rng()).unwrap();
        assert_eq!(raw.edges.len(), 12);
        assert!(raw.directed());
    }

    #[test]
    fn test_custom_resolves_names() {
        let model = ModelConfig::Custom {
            adjacency: vec![
                AdjacencyRow { node: "x".into(), targets: vec!["y".into()] },
                AdjacencyRow { node: "y".into(), targets: vec!["x".into(), "x".into()] },
            ],
            balances: vec![5.0, 1.0],
        };
        let raw = model.generate(2, &mut rng()).unwrap();
        assert_eq!(raw.labels, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(raw.edges.len(), 3);
        assert_eq!(raw.balances, BalancePlan::Explicit(vec![5.0, 1.0]));
    }

    #[test]
    fn test_custom_dangling_target_rejected() {
        let model = ModelConfig::Custom {
            adjacency: vec![
                AdjacencyRow { node: "0".into(), targets: vec!["7".into()] },
                AdjacencyRow { node: "1".into(), targets: vec![] },
            ],
            balances: vec![1.0, 1.0],
        };
        assert!(matches!(model.validate(2), Err(SimError::MalformedAdjacency(_))));
    }

    #[test]
    fn test_custom_balance_count_checked() {
        let model = ModelConfig::Custom {
            adjacency: vec![
                AdjacencyRow { node: "0".into(), targets: vec!["1".into()] },
                AdjacencyRow { node: "1".into(), targets: vec![] },
            ],
            balances: vec![1.0],
        };
        assert!(matches!(model.validate(2), Err(SimError::BalanceMismatch { expected: 2, got: 1 })));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(ModelConfig::RandomEdge { edge_probability: 1.5 }.validate(5).is_err());
        assert!(ModelConfig::SmallWorld { k: 6, rewire_probability: 0.1 }.validate(5).is_err());
        assert!(matches!(
            ModelConfig::SmallWorld { k: 3, rewire_probability: 0.5 }.validate(10),
            Err(SimError::InvalidParameter { name: "k", .. })
        ));
        assert!(ModelConfig::SmallWorld { k: 4, rewire_probability: 0.5 }.validate(10).is_ok());
        assert!(ModelConfig::PreferentialAttachment { m: 5 }.validate(5).is_err());
        assert!(ModelConfig::Circulant { offsets: vec![] }.validate(5).is_err());
        assert!(ModelConfig::Circulant { offsets: vec![5] }.validate(5).is_err());
        assert!(ModelConfig::Barbell { bell_size: Some(3) }.validate(5).is_err());
        assert!(ModelConfig::RandomRegular { degree: 3 }.validate(5).is_err());
        assert!(ModelConfig::Lattice { columns: Some(0) }.validate(5).is_err());
        let too_many_blocks = ModelConfig::StochasticBlock {
            blocks: 6,
            intra_probability: [0.4, 0.7],
            inter_probability: [0.01, 0.2],
            block_means: vec![100.0; 5],
            std_dev: 15.0,
        };
        assert!(too_many_blocks.validate(20).is_err());
    }
}
