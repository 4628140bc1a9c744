pub mod link;
pub mod node;
pub mod path;
pub mod xml;

use std::collections::HashMap;
use std::fs;
use std::path::Path as FsPath;
use std::sync::Arc;

use petgraph::graph::{NodeIndex, UnGraph};

use crate::error::{Result, SimError};

pub use link::{Link, LinkId};
pub use node::{Node, NodeId};
pub use path::Path;

/// The static network graph: nodes, links, and which nodes are datacenters.
/// Dynamic per-link state (available capacity, utilization, disaster risk)
/// lives in `Ledger`, not here — `Topology` never changes shape after load.
#[derive(Debug, Clone)]
pub struct Topology {
    graph: UnGraph<NodeId, LinkId>,
    index_of: HashMap<NodeId, NodeIndex>,
    links: Vec<Link>,
    datacenters: Vec<NodeId>,
}

impl Topology {
    pub fn load(path: &FsPath) -> Result<Self> {
        let xml = fs::read_to_string(path)?;
        Self::from_xml_str(&xml)
    }

    pub fn from_xml_str(xml: &str) -> Result<Self> {
        let doc = xml::parse(xml)?;

        let mut graph: UnGraph<NodeId, LinkId> = UnGraph::new_undirected();
        let mut index_of: HashMap<NodeId, NodeIndex> = HashMap::new();
        let mut datacenters = Vec::new();

        for n in &doc.nodes.node {
            let id: NodeId = Arc::from(n.id.as_str());
            let idx = graph.add_node(id.clone());
            index_of.insert(id.clone(), idx);
            if n.datacenter {
                datacenters.push(id);
            }
        }

        let mut links = Vec::with_capacity(doc.links.link.len());
        for (i, l) in doc.links.link.iter().enumerate() {
            let a_id: NodeId = Arc::from(l.node1.as_str());
            let b_id: NodeId = Arc::from(l.node2.as_str());
            let &a_idx = index_of.get(&a_id).ok_or_else(|| {
                SimError::Configuration(format!("link references unknown node {}", l.node1))
            })?;
            let &b_idx = index_of.get(&b_id).ok_or_else(|| {
                SimError::Configuration(format!("link references unknown node {}", l.node2))
            })?;
            let link_id = i as LinkId;
            graph.add_edge(a_idx, b_idx, link_id);
            links.push(Link {
                id: link_id,
                a: a_id,
                b: b_id,
                total_units: l.units,
            });
        }

        if datacenters.is_empty() {
            return Err(SimError::Configuration(
                "topology declares no datacenter nodes".into(),
            ));
        }

        Ok(Self {
            graph,
            index_of,
            links,
            datacenters,
        })
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.index_of.keys()
    }

    pub fn datacenters(&self) -> &[NodeId] {
        &self.datacenters
    }

    pub fn is_datacenter(&self, id: &NodeId) -> bool {
        self.datacenters.iter().any(|d| d == id)
    }

    /// Number of links incident to `id`; 0 for an unknown node. Used to size
    /// a datacenter's capacity as `degree * resource_units_per_link` on
    /// every per-seed ledger reset.
    pub fn degree(&self, id: &NodeId) -> usize {
        self.node_index(id)
            .map(|idx| self.graph.edges(idx).count())
            .unwrap_or(0)
    }

    /// Every node eligible as a service source: all non-datacenter nodes.
    pub fn source_nodes(&self) -> Vec<NodeId> {
        self.index_of
            .keys()
            .filter(|n| !self.is_datacenter(n))
            .cloned()
            .collect()
    }

    /// Overrides whatever the topology file marked as datacenters with the
    /// configured placement policy: either the top `n` nodes by degree, or
    /// an explicit fixed list. Ties in top-degree placement break on node
    /// id, ascending, for reproducibility independent of map iteration
    /// order.
    pub fn apply_dc_placement(&mut self, placement: &crate::config::DcPlacement) -> Result<()> {
        use crate::config::DcPlacement;
        self.datacenters = match placement {
            DcPlacement::TopDegree(n) => {
                let mut nodes: Vec<NodeId> = self.index_of.keys().cloned().collect();
                nodes.sort_by(|a, b| {
                    self.degree(b)
                        .cmp(&self.degree(a))
                        .then_with(|| a.cmp(b))
                });
                nodes.truncate(*n);
                nodes
            }
            DcPlacement::Fixed(names) => {
                let mut datacenters = Vec::with_capacity(names.len());
                for name in names {
                    let id: NodeId = Arc::from(name.as_str());
                    if !self.index_of.contains_key(&id) {
                        return Err(SimError::Configuration(format!(
                            "fixed DC placement names unknown node {name}"
                        )));
                    }
                    datacenters.push(id);
                }
                datacenters
            }
        };
        if self.datacenters.is_empty() {
            return Err(SimError::Configuration(
                "DC placement selected zero datacenters".into(),
            ));
        }
        Ok(())
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id as usize]
    }

    pub fn find_link(&self, a: &NodeId, b: &NodeId) -> Option<LinkId> {
        self.links
            .iter()
            .find(|l| (l.a == *a && l.b == *b) || (l.a == *b && l.b == *a))
            .map(|l| l.id)
    }

    pub fn node_index(&self, id: &NodeId) -> Option<NodeIndex> {
        self.index_of.get(id).copied()
    }

    /// Edge weight (the `LinkId`) between two adjacent node indices.
    fn edge_link(&self, a: NodeIndex, b: NodeIndex) -> LinkId {
        self.graph
            .find_edge(a, b)
            .and_then(|e| self.graph.edge_weight(e).copied())
            .expect("adjacent node indices must share an edge")
    }

    fn path_from_indices(&self, indices: &[NodeIndex]) -> Path {
        let nodes: smallvec::SmallVec<[NodeId; 8]> = indices
            .iter()
            .map(|&idx| self.graph[idx].clone())
            .collect();
        let links = indices
            .windows(2)
            .map(|w| self.edge_link(w[0], w[1]))
            .collect();
        Path { nodes, links }
    }

    /// Up to `k` loopless shortest paths (by hop count) from `source` to
    /// `dc`. Empty if either node is unknown or unreachable.
    pub fn k_shortest_paths(&self, source: &NodeId, dc: &NodeId, k: usize) -> Vec<Path> {
        let (Some(s), Some(t)) = (self.node_index(source), self.node_index(dc)) else {
            return Vec::new();
        };
        path::k_shortest_paths(&self.graph, s, t, k)
            .iter()
            .map(|indices| self.path_from_indices(indices))
            .collect()
    }

    /// Precomputes k-shortest paths from every non-datacenter node to every
    /// datacenter. Done once per topology load, independent of the episode
    /// RNG.
    pub fn build_path_index(&self, k: usize) -> PathIndex {
        let mut entries = HashMap::new();
        let all_nodes: Vec<NodeId> = self.index_of.keys().cloned().collect();
        for source in &all_nodes {
            for dc in &self.datacenters {
                if source == dc {
                    continue;
                }
                let paths = self.k_shortest_paths(source, dc, k);
                entries.insert((source.clone(), dc.clone()), paths);
            }
        }
        PathIndex { entries }
    }
}

/// Precomputed k-shortest paths for every (source, datacenter) pair.
#[derive(Debug, Clone)]
pub struct PathIndex {
    entries: HashMap<(NodeId, NodeId), Vec<Path>>,
}

impl PathIndex {
    pub fn paths(&self, source: &NodeId, dc: &NodeId) -> &[Path] {
        self.entries
            .get(&(source.clone(), dc.clone()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All datacenters a `source` has at least one precomputed path to.
    pub fn reachable_datacenters<'a>(&'a self, source: &'a NodeId) -> impl Iterator<Item = &'a NodeId> {
        self.entries
            .iter()
            .filter(move |((s, _), paths)| s == source && !paths.is_empty())
            .map(|((_, dc), _)| dc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DcPlacement;

    fn star_topology() -> Topology {
        let xml = r#"<topology>
            <nodes>
                <node id="A"/>
                <node id="B"/>
                <node id="C"/>
                <node id="D1" datacenter="true"/>
            </nodes>
            <links>
                <link node1="A" node2="D1" units="5"/>
                <link node1="B" node2="D1" units="5"/>
                <link node1="C" node2="D1" units="5"/>
            </links>
        </topology>"#;
        Topology::from_xml_str(xml).unwrap()
    }

    #[test]
    fn loads_nodes_links_and_datacenters() {
        let topo = star_topology();
        assert_eq!(topo.datacenters(), &[Arc::from("D1")][..]);
        assert_eq!(topo.links().len(), 3);
        assert!(topo.is_datacenter(&Arc::from("D1")));
        assert!(!topo.is_datacenter(&Arc::from("A")));
    }

    #[test]
    fn source_nodes_excludes_datacenters() {
        let topo = star_topology();
        let mut sources: Vec<String> = topo.source_nodes().iter().map(|n| n.to_string()).collect();
        sources.sort();
        assert_eq!(sources, vec!["A".to_string(), "B".to_string(), "C".to_string()]);
    }

    #[test]
    fn rejects_link_to_unknown_node() {
        let xml = r#"<topology>
            <nodes><node id="A"/><node id="D1" datacenter="true"/></nodes>
            <links><link node1="A" node2="Ghost" units="1"/></links>
        </topology>"#;
        let err = Topology::from_xml_str(xml).unwrap_err();
        assert!(matches!(err, SimError::Configuration(_)));
    }

    #[test]
    fn rejects_topology_with_no_datacenters() {
        let xml = r#"<topology>
            <nodes><node id="A"/><node id="B"/></nodes>
            <links><link node1="A" node2="B" units="1"/></links>
        </topology>"#;
        let err = Topology::from_xml_str(xml).unwrap_err();
        assert!(matches!(err, SimError::Configuration(_)));
    }

    #[test]
    fn top_degree_placement_breaks_ties_by_node_id() {
        let mut topo = star_topology();
        // Every non-DC node has degree 1 here; picking top-2 should yield
        // the two lexicographically smallest ids deterministically.
        topo.apply_dc_placement(&DcPlacement::TopDegree(2)).unwrap();
        assert_eq!(topo.datacenters().len(), 2);
        assert_eq!(topo.datacenters()[0].as_ref(), "A");
        assert_eq!(topo.datacenters()[1].as_ref(), "B");
    }

    #[test]
    fn fixed_placement_rejects_unknown_node_names() {
        let mut topo = star_topology();
        let err = topo
            .apply_dc_placement(&DcPlacement::Fixed(vec!["Ghost".to_string()]))
            .unwrap_err();
        assert!(matches!(err, SimError::Configuration(_)));
    }

    #[test]
    fn path_index_covers_every_source_to_every_dc() {
        let topo = star_topology();
        let index = topo.build_path_index(2);
        for source in ["A", "B", "C"] {
            let paths = index.paths(&Arc::from(source), &Arc::from("D1"));
            assert_eq!(paths.len(), 1);
            assert_eq!(paths[0].hop_count(), 1);
        }
    }
}
