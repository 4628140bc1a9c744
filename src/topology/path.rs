//! Loopless k-shortest-path enumeration between a source node and a
//! datacenter node, by hop count (Yen's algorithm over a unit-weight graph).
//!
//! Precomputation is deterministic and never touches the episode RNG: the
//! only nondeterminism a routing policy is allowed is in which of the
//! precomputed paths it picks, not in what the candidate set contains.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet, VecDeque};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use smallvec::SmallVec;

use super::link::LinkId;
use super::node::NodeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub nodes: SmallVec<[NodeId; 8]>,
    pub links: SmallVec<[LinkId; 8]>,
}

impl Path {
    pub fn hop_count(&self) -> usize {
        self.links.len()
    }

    pub fn source(&self) -> &NodeId {
        &self.nodes[0]
    }

    pub fn destination(&self) -> &NodeId {
        self.nodes.last().expect("path has at least one node")
    }
}

struct CandidatePath {
    len: usize,
    path: Vec<NodeIndex>,
}

impl PartialEq for CandidatePath {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
    }
}
impl Eq for CandidatePath {}
impl Ord for CandidatePath {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the shortest candidate out first.
        other.len.cmp(&self.len)
    }
}
impl PartialOrd for CandidatePath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn shortest_path<N, E>(
    graph: &UnGraph<N, E>,
    source: NodeIndex,
    target: NodeIndex,
    banned_nodes: &HashSet<NodeIndex>,
    banned_edges: &HashSet<(NodeIndex, NodeIndex)>,
) -> Option<Vec<NodeIndex>> {
    if banned_nodes.contains(&source) || banned_nodes.contains(&target) {
        return None;
    }
    // Unit edge weights: breadth-first search is a shortest-path search.
    let mut prev = std::collections::HashMap::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(source);
    visited.insert(source);
    while let Some(u) = queue.pop_front() {
        if u == target {
            break;
        }
        for edge in graph.edges(u) {
            let v = edge.target();
            if v == u || banned_nodes.contains(&v) {
                continue;
            }
            let key = (u.min(v), u.max(v));
            if banned_edges.contains(&key) {
                continue;
            }
            if visited.insert(v) {
                prev.insert(v, u);
                queue.push_back(v);
            }
        }
    }
    if !visited.contains(&target) {
        return None;
    }
    let mut path = vec![target];
    let mut cur = target;
    while cur != source {
        cur = *prev.get(&cur)?;
        path.push(cur);
    }
    path.reverse();
    Some(path)
}

/// Up to `k` loopless shortest paths from `source` to `target`, longest-hop
/// last. Fewer than `k` are returned if the graph doesn't have that many
/// distinct loopless paths.
pub fn k_shortest_paths<N, E>(
    graph: &UnGraph<N, E>,
    source: NodeIndex,
    target: NodeIndex,
    k: usize,
) -> Vec<Vec<NodeIndex>> {
    let mut found = Vec::new();
    if k == 0 {
        return found;
    }
    let first = match shortest_path(graph, source, target, &HashSet::new(), &HashSet::new()) {
        Some(p) => p,
        None => return found,
    };
    found.push(first);

    let mut candidates: BinaryHeap<CandidatePath> = BinaryHeap::new();
    while found.len() < k {
        let prev_path = found.last().unwrap().clone();
        for i in 0..prev_path.len().saturating_sub(1) {
            let spur_node = prev_path[i];
            let root_path = &prev_path[..=i];

            let mut banned_edges = HashSet::new();
            for p in &found {
                if p.len() > i && p[..=i] == *root_path {
                    let (u, v) = (p[i], p[i + 1]);
                    banned_edges.insert((u.min(v), u.max(v)));
                }
            }
            let banned_nodes: HashSet<NodeIndex> =
                root_path[..root_path.len() - 1].iter().copied().collect();

            if let Some(spur_path) =
                shortest_path(graph, spur_node, target, &banned_nodes, &banned_edges)
            {
                let mut total_path = root_path[..root_path.len() - 1].to_vec();
                total_path.extend(spur_path);
                let already_found = found.contains(&total_path);
                let already_queued = candidates.iter().any(|c| c.path == total_path);
                if !already_found && !already_queued {
                    candidates.push(CandidatePath {
                        len: total_path.len(),
                        path: total_path,
                    });
                }
            }
        }
        match candidates.pop() {
            Some(c) => found.push(c.path),
            None => break,
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A-B-D directly, and A-C-B-D as a longer detour: exercises that the
    /// shortest path is returned first and a genuinely distinct longer path
    /// is found second.
    fn diamond_graph() -> (UnGraph<&'static str, u32>, NodeIndex, NodeIndex) {
        let mut g: UnGraph<&'static str, u32> = UnGraph::new_undirected();
        let a = g.add_node("A");
        let b = g.add_node("B");
        let c = g.add_node("C");
        let d = g.add_node("D");
        g.add_edge(a, b, 0);
        g.add_edge(a, c, 1);
        g.add_edge(c, b, 2);
        g.add_edge(b, d, 3);
        (g, a, d)
    }

    #[test]
    fn first_path_is_shortest() {
        let (g, a, d) = diamond_graph();
        let paths = k_shortest_paths(&g, a, d, 1);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 3); // A-B-D
    }

    #[test]
    fn additional_paths_are_longer_and_distinct() {
        let (g, a, d) = diamond_graph();
        let paths = k_shortest_paths(&g, a, d, 2);
        assert_eq!(paths.len(), 2);
        assert!(paths[1].len() >= paths[0].len());
        assert_ne!(paths[0], paths[1]);
    }

    #[test]
    fn unreachable_target_yields_no_paths() {
        let mut g: UnGraph<&'static str, u32> = UnGraph::new_undirected();
        let a = g.add_node("A");
        let isolated = g.add_node("B");
        let paths = k_shortest_paths(&g, a, isolated, 3);
        assert!(paths.is_empty());
    }

    #[test]
    fn k_zero_yields_no_paths() {
        let (g, a, d) = diamond_graph();
        assert!(k_shortest_paths(&g, a, d, 0).is_empty());
    }
}
