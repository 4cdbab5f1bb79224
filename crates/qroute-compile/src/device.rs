//! Target device connectivity.
//!
//! A [`Device`] is an undirected graph over physical qubits. On
//! construction, all-pairs distances and shortest-path predecessors are
//! precomputed with one BFS per qubit, so `distance()` is an O(1) lookup
//! for the router's cost function.

use std::collections::VecDeque;
use std::fmt;
use std::path::Path;

use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use rustc_hash::FxHashSet;
use tracing::debug;

use qroute_ir::PhysicalQubit;

use crate::error::{CompileError, CompileResult};

/// Sentinel for "no path" in the distance and predecessor matrices.
const UNREACHABLE: u32 = u32::MAX;

/// Largest supported device. The distance and predecessor matrices are
/// quadratic in the qubit count.
pub const MAX_QUBITS: u32 = 4096;

/// Physical qubit connectivity graph.
#[derive(Debug, Clone)]
pub struct Device {
    /// Number of physical qubits.
    num_qubits: u32,
    /// Edges as `(low, high)` pairs, in insertion order.
    edges: Vec<(PhysicalQubit, PhysicalQubit)>,
    /// Graph view, node `i` is physical qubit `i`.
    graph: UnGraph<PhysicalQubit, ()>,
    /// Neighbors of each qubit, ascending.
    adjacency: Vec<Vec<PhysicalQubit>>,
    /// `dist_matrix[from][to]` is the hop count, or `UNREACHABLE`.
    dist_matrix: Vec<Vec<u32>>,
    /// `pred_matrix[from][to]` is the hop before `to` on a shortest path.
    pred_matrix: Vec<Vec<u32>>,
}

impl Device {
    /// Build a device from an explicit edge list.
    ///
    /// Duplicate edges (including reversed pairs) are ignored. Self-loops and
    /// endpoints outside `0..num_qubits` are rejected.
    pub fn from_edges(
        num_qubits: u32,
        edges: impl IntoIterator<Item = (u32, u32)>,
    ) -> CompileResult<Self> {
        if num_qubits == 0 {
            return Err(CompileError::EmptyDevice);
        }
        if num_qubits > MAX_QUBITS {
            return Err(CompileError::InvalidConfiguration(format!(
                "device has {num_qubits} qubits; at most {MAX_QUBITS} are supported"
            )));
        }

        let mut seen = FxHashSet::default();
        let mut normalized = vec![];
        for (a, b) in edges {
            if a >= num_qubits || b >= num_qubits {
                return Err(CompileError::InvalidConfiguration(format!(
                    "edge ({a}, {b}) references a qubit outside 0..{num_qubits}"
                )));
            }
            if a == b {
                return Err(CompileError::InvalidConfiguration(format!(
                    "self-loop on qubit {a}"
                )));
            }
            let edge = (a.min(b), a.max(b));
            if seen.insert(edge) {
                normalized.push((PhysicalQubit(edge.0), PhysicalQubit(edge.1)));
            }
        }

        let mut graph = UnGraph::with_capacity(num_qubits as usize, normalized.len());
        for i in 0..num_qubits {
            graph.add_node(PhysicalQubit(i));
        }
        let mut adjacency = vec![vec![]; num_qubits as usize];
        for &(a, b) in &normalized {
            graph.add_edge(NodeIndex::new(a.index()), NodeIndex::new(b.index()), ());
            adjacency[a.index()].push(b);
            adjacency[b.index()].push(a);
        }
        for neighbors in &mut adjacency {
            neighbors.sort_unstable();
        }

        let mut device = Self {
            num_qubits,
            edges: normalized,
            graph,
            adjacency,
            dist_matrix: vec![],
            pred_matrix: vec![],
        };
        device.precompute_distances();
        Ok(device)
    }

    /// Create a path device (0-1-2-...).
    pub fn path(n: u32) -> CompileResult<Self> {
        Self::from_edges(n, (1..n).map(|i| (i - 1, i)))
    }

    /// Create a ring device: a path closed by an edge from the last qubit
    /// back to qubit 0.
    pub fn ring(n: u32) -> CompileResult<Self> {
        let closing = (n > 1).then(|| (n - 1, 0));
        Self::from_edges(n, (1..n).map(|i| (i - 1, i)).chain(closing))
    }

    /// Create a star device with every qubit connected to `center`.
    pub fn star(n: u32, center: u32) -> CompileResult<Self> {
        if n > 0 && center >= n {
            return Err(CompileError::InvalidConfiguration(format!(
                "star center {center} outside 0..{n}"
            )));
        }
        Self::from_edges(n, (0..n).filter(|&i| i != center).map(|i| (center, i)))
    }

    /// Create a `width` x `height` grid, numbered row-major, with edges to
    /// the right and down neighbors.
    pub fn grid(width: u32, height: u32) -> CompileResult<Self> {
        let num_qubits = width
            .checked_mul(height)
            .filter(|&n| n <= MAX_QUBITS)
            .ok_or_else(|| {
                CompileError::InvalidConfiguration(format!(
                    "grid {width}x{height} exceeds {MAX_QUBITS} qubits"
                ))
            })?;

        let mut edges = vec![];
        for row in 0..height {
            for col in 0..width {
                let q = row * width + col;
                if col + 1 < width {
                    edges.push((q, q + 1));
                }
                if row + 1 < height {
                    edges.push((q, q + width));
                }
            }
        }
        Self::from_edges(num_qubits, edges)
    }

    /// Load a device description file.
    pub fn from_file(path: impl AsRef<Path>) -> CompileResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CompileError::DeviceFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&text).map_err(|e| CompileError::DeviceFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Parse a device description.
    ///
    /// ```text
    /// # comment
    /// Number of nodes: 4
    /// Number of edges: 3
    /// 0 1
    /// 1 2
    /// 2 3
    /// ```
    ///
    /// The node count header is required; the edge count header is optional
    /// and checked against the edges listed.
    pub fn parse(text: &str) -> CompileResult<Self> {
        let mut num_nodes: Option<u32> = None;
        let mut num_edges: Option<usize> = None;
        let mut edges = vec![];

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let bad_line = |reason: &str| {
                CompileError::InvalidConfiguration(format!("line {}: {reason}", lineno + 1))
            };

            if let Some((key, value)) = line.split_once(':') {
                let value = value.trim();
                match key.trim().to_ascii_lowercase().as_str() {
                    "number of nodes" => {
                        num_nodes = Some(value.parse().map_err(|_| bad_line("bad node count"))?);
                    }
                    "number of edges" => {
                        num_edges = Some(value.parse().map_err(|_| bad_line("bad edge count"))?);
                    }
                    _ => return Err(bad_line("unknown header")),
                }
                continue;
            }

            let mut fields = line.split_whitespace();
            let (Some(a), Some(b), None) = (fields.next(), fields.next(), fields.next()) else {
                return Err(bad_line("expected an edge 'a b'"));
            };
            let a: u32 = a.parse().map_err(|_| bad_line("bad edge endpoint"))?;
            let b: u32 = b.parse().map_err(|_| bad_line("bad edge endpoint"))?;
            edges.push((a, b));
        }

        let num_nodes = num_nodes.ok_or_else(|| {
            CompileError::InvalidConfiguration("missing 'Number of nodes' header".into())
        })?;
        if let Some(expected) = num_edges {
            if expected != edges.len() {
                return Err(CompileError::InvalidConfiguration(format!(
                    "header declares {expected} edges but {} are listed",
                    edges.len()
                )));
            }
        }

        let device = Self::from_edges(num_nodes, edges)?;
        debug!(
            "Parsed device with {} qubits and {} edges",
            device.num_qubits,
            device.edges.len()
        );
        Ok(device)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn precompute_distances(&mut self) {
        let n = self.num_qubits as usize;
        self.dist_matrix = vec![vec![UNREACHABLE; n]; n];
        self.pred_matrix = vec![vec![UNREACHABLE; n]; n];

        for src in 0..n {
            self.dist_matrix[src][src] = 0;
            let mut queue = VecDeque::new();
            queue.push_back(src);

            while let Some(cur) = queue.pop_front() {
                for &neighbor in &self.adjacency[cur] {
                    let nb = neighbor.index();
                    if self.dist_matrix[src][nb] == UNREACHABLE {
                        self.dist_matrix[src][nb] = self.dist_matrix[src][cur] + 1;
                        self.pred_matrix[src][nb] = cur as u32;
                        queue.push_back(nb);
                    }
                }
            }
        }
    }

    /// Number of physical qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Device edges as `(low, high)` pairs.
    pub fn edges(&self) -> &[(PhysicalQubit, PhysicalQubit)] {
        &self.edges
    }

    /// Neighbors of a qubit in ascending order.
    pub fn neighbors(&self, qubit: PhysicalQubit) -> &[PhysicalQubit] {
        self.adjacency
            .get(qubit.index())
            .map_or(&[], Vec::as_slice)
    }

    /// Whether two qubits share an edge.
    #[inline]
    pub fn are_adjacent(&self, a: PhysicalQubit, b: PhysicalQubit) -> bool {
        self.neighbors(a).binary_search(&b).is_ok()
    }

    /// Shortest-path hop count, or `None` if `b` is unreachable from `a`.
    #[inline]
    pub fn distance(&self, a: PhysicalQubit, b: PhysicalQubit) -> Option<u32> {
        let d = *self.dist_matrix.get(a.index())?.get(b.index())?;
        (d != UNREACHABLE).then_some(d)
    }

    /// A shortest path from `from` to `to`, both endpoints included.
    pub fn shortest_path(&self, from: PhysicalQubit, to: PhysicalQubit) -> Option<Vec<PhysicalQubit>> {
        self.distance(from, to)?;

        let f = from.index();
        let mut path = vec![to];
        let mut current = to;
        while current != from {
            let pred = self.pred_matrix[f][current.index()];
            if pred == UNREACHABLE {
                return None;
            }
            current = PhysicalQubit(pred);
            path.push(current);
        }
        path.reverse();
        Some(path)
    }

    /// Whether every qubit can reach every other.
    pub fn is_connected(&self) -> bool {
        connected_components(&self.graph) == 1
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Device: {} qubits, {} edges", self.num_qubits, self.edges.len())?;
        write!(f, "Edges:")?;
        for (a, b) in &self.edges {
            write!(f, " ({}, {})", a.0, b.0)?;
        }
        writeln!(f)?;
        writeln!(f, "Distances:")?;
        for row in &self.dist_matrix {
            let cells: Vec<String> = row
                .iter()
                .map(|&d| {
                    if d == UNREACHABLE {
                        "-".to_string()
                    } else {
                        d.to_string()
                    }
                })
                .collect();
            writeln!(f, "  {}", cells.join(" "))?;
        }
        Ok(())
    }
}
