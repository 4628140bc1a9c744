//! Resource ledger: the network's dynamic, per-link and per-datacenter
//! state — available capacity, time-weighted utilization, and current
//! disaster risk — kept separate from the static `Topology` graph shape
//! (spec's C2 component).
//!
//! Capacity accounting is exact integer arithmetic throughout; any attempt
//! to over-commit or double-release a link or a datacenter is an invariant
//! violation, never a silent clamp.

use std::collections::HashMap;

use crate::error::{Result, SimError};
use crate::topology::path::Path;
use crate::topology::{LinkId, NodeId, Topology};

#[derive(Debug, Clone)]
struct LinkState {
    total_units: u32,
    available_units: u32,
    utilization: f64,
    last_update: f64,
    current_failure_probability: f64,
    /// Set while the link is down (standalone failure or a fired disaster
    /// tier). A down link admits no new reservations regardless of
    /// `available_units`, but releases against it still return units to the
    /// pool — they become usable again once the link comes back up.
    down: bool,
}

#[derive(Debug, Clone)]
struct NodeState {
    total_units: u32,
    available_units: u32,
    utilization: f64,
    last_update: f64,
    down: bool,
}

/// Capacity accounting for links and datacenter nodes, plus the armed
/// disaster risk attached to each link. One `Ledger` per episode; rebuilt
/// fresh on every seed reset (spec §4.8 "Initialization per seed").
#[derive(Debug, Clone)]
pub struct Ledger {
    links: HashMap<LinkId, LinkState>,
    /// Only datacenter nodes carry an entry; non-DC nodes have no capacity
    /// to reserve (spec §3: `total_units`/`available_units` are zero for
    /// non-DC nodes), so they are simply absent here.
    nodes: HashMap<NodeId, NodeState>,
}

impl Ledger {
    /// `resource_units_per_link` sizes every link uniformly; each
    /// datacenter's capacity is `degree(node) * resource_units_per_link`
    /// (grounded in `core.py`'s per-seed reset of `total_units`/
    /// `available_units`).
    pub fn new(topology: &Topology, resource_units_per_link: u32) -> Self {
        let links = topology
            .links()
            .iter()
            .map(|link| {
                (
                    link.id,
                    LinkState {
                        total_units: resource_units_per_link,
                        available_units: resource_units_per_link,
                        utilization: 0.0,
                        last_update: 0.0,
                        current_failure_probability: 0.0,
                        down: false,
                    },
                )
            })
            .collect();

        let nodes = topology
            .datacenters()
            .iter()
            .map(|dc| {
                let capacity = topology.degree(dc) as u32 * resource_units_per_link;
                (
                    dc.clone(),
                    NodeState {
                        total_units: capacity,
                        available_units: capacity,
                        utilization: 0.0,
                        last_update: 0.0,
                        down: false,
                    },
                )
            })
            .collect();

        Self { links, nodes }
    }

    // -- links ------------------------------------------------------------

    pub fn available_units(&self, link: LinkId) -> u32 {
        self.links[&link].available_units
    }

    pub fn total_units(&self, link: LinkId) -> u32 {
        self.links[&link].total_units
    }

    pub fn current_failure_probability(&self, link: LinkId) -> f64 {
        self.links[&link].current_failure_probability
    }

    pub fn set_failure_probability(&mut self, link: LinkId, p: f64) {
        self.links
            .get_mut(&link)
            .expect("unknown link id")
            .current_failure_probability = p;
    }

    pub fn link_utilization(&self, link: LinkId) -> f64 {
        self.links[&link].utilization
    }

    pub fn is_down(&self, link: LinkId) -> bool {
        self.links[&link].down
    }

    pub fn set_link_down(&mut self, link: LinkId, down: bool) {
        self.links.get_mut(&link).expect("unknown link id").down = down;
    }

    // -- datacenter nodes ---------------------------------------------------

    pub fn node_available_units(&self, node: &NodeId) -> u32 {
        self.nodes[node].available_units
    }

    pub fn node_total_units(&self, node: &NodeId) -> u32 {
        self.nodes[node].total_units
    }

    pub fn node_utilization(&self, node: &NodeId) -> f64 {
        self.nodes[node].utilization
    }

    pub fn is_node_down(&self, node: &NodeId) -> bool {
        self.nodes.get(node).map(|s| s.down).unwrap_or(false)
    }

    pub fn set_node_down(&mut self, node: &NodeId, down: bool) {
        if let Some(s) = self.nodes.get_mut(node) {
            s.down = down;
        }
    }

    /// Time-weighted utilization update, folding in the interval since the
    /// link's last touch before any capacity change at `now` is applied:
    /// `u_new = (u_last * t_last + u_cur * (t_now - t_last)) / t_now`.
    fn touch_link(&mut self, link: LinkId, now: f64) {
        let st = self.links.get_mut(&link).expect("unknown link id");
        if now > 0.0 && st.total_units > 0 {
            let dt = now - st.last_update;
            let cur_util = (st.total_units - st.available_units) as f64 / st.total_units as f64;
            st.utilization = (st.utilization * st.last_update + cur_util * dt) / now;
        }
        st.last_update = now;
    }

    fn touch_node(&mut self, node: &NodeId, now: f64) {
        let st = self.nodes.get_mut(node).expect("unknown datacenter node id");
        if now > 0.0 && st.total_units > 0 {
            let dt = now - st.last_update;
            let cur_util = (st.total_units - st.available_units) as f64 / st.total_units as f64;
            st.utilization = (st.utilization * st.last_update + cur_util * dt) / now;
        }
        st.last_update = now;
    }

    /// The bottleneck link's spare capacity, or 0 if any link on the path is
    /// currently down regardless of its numeric `available_units`.
    pub fn path_available_units(&self, path: &Path) -> u32 {
        path.links
            .iter()
            .map(|&l| {
                let st = &self.links[&l];
                if st.down {
                    0
                } else {
                    st.available_units
                }
            })
            .min()
            .unwrap_or(0)
    }

    pub fn path_has_down_link(&self, path: &Path) -> bool {
        path.links.iter().any(|&l| self.links[&l].down)
    }

    /// A path is viable for a service iff no node or link on it is down and
    /// every link has enough free `network_units` and the destination has
    /// enough free `computing_units` (spec §4.5.1).
    pub fn path_viable(&self, path: &Path, network_units: u32, computing_units: u32) -> bool {
        if self.path_has_down_link(path) {
            return false;
        }
        if self.is_node_down(path.destination()) {
            return false;
        }
        if self.path_available_units(path) < network_units {
            return false;
        }
        self.node_available_units(path.destination()) >= computing_units
    }

    /// Reserves `network_units` on every link of `path` and `computing_units`
    /// at its destination. All-or-nothing: the check pass runs before any
    /// state is touched, so a rejection leaves the ledger untouched
    /// (spec §4.2, §4.6.5 "re-provisioning semantics").
    pub fn provision(
        &mut self,
        path: &Path,
        network_units: u32,
        computing_units: u32,
        now: f64,
    ) -> Result<()> {
        for &link in &path.links {
            let st = &self.links[&link];
            if st.down {
                return Err(SimError::Invariant(format!(
                    "attempted to reserve {network_units} units on down link {link}"
                )));
            }
            if st.available_units < network_units {
                return Err(SimError::Invariant(format!(
                    "reserve of {network_units} units on link {link} exceeds {} available",
                    st.available_units
                )));
            }
        }
        let dest = path.destination();
        let node_st = self
            .nodes
            .get(dest)
            .ok_or_else(|| SimError::Invariant(format!("destination {dest} is not a datacenter")))?;
        if node_st.down {
            return Err(SimError::Invariant(format!(
                "attempted to reserve {computing_units} units on down node {dest}"
            )));
        }
        if node_st.available_units < computing_units {
            return Err(SimError::Invariant(format!(
                "reserve of {computing_units} units at {dest} exceeds {} available",
                node_st.available_units
            )));
        }

        for &link in &path.links {
            self.touch_link(link, now);
            self.links.get_mut(&link).unwrap().available_units -= network_units;
        }
        self.touch_node(dest, now);
        self.nodes.get_mut(dest).unwrap().available_units -= computing_units;
        Ok(())
    }

    /// Releases `network_units` previously reserved along `path` and
    /// `computing_units` at its destination. A release that would push
    /// `available_units` past `total_units` means something was released
    /// twice and is an invariant violation, not a clamp.
    pub fn release(
        &mut self,
        path: &Path,
        network_units: u32,
        computing_units: u32,
        now: f64,
    ) -> Result<()> {
        for &link in &path.links {
            self.touch_link(link, now);
            let st = self.links.get_mut(&link).unwrap();
            let new_avail = st.available_units + network_units;
            if new_avail > st.total_units {
                return Err(SimError::Invariant(format!(
                    "release of {network_units} units on link {link} exceeds total capacity {}",
                    st.total_units
                )));
            }
            st.available_units = new_avail;
        }
        let dest = path.destination();
        self.touch_node(dest, now);
        let node_st = self
            .nodes
            .get_mut(dest)
            .ok_or_else(|| SimError::Invariant(format!("destination {dest} is not a datacenter")))?;
        let new_avail = node_st.available_units + computing_units;
        if new_avail > node_st.total_units {
            return Err(SimError::Invariant(format!(
                "release of {computing_units} units at {dest} exceeds total capacity {}",
                node_st.total_units
            )));
        }
        node_st.available_units = new_avail;
        Ok(())
    }

    /// Sum over a path's links of `current_failure_probability * total_units`
    /// (spec §4.5.2).
    pub fn path_risk(&self, path: &Path) -> f64 {
        path.links
            .iter()
            .map(|&l| {
                let st = &self.links[&l];
                st.current_failure_probability * st.total_units as f64
            })
            .sum()
    }

    pub fn path_max_failure_probability(&self, path: &Path) -> f64 {
        path.links
            .iter()
            .map(|&l| self.links[&l].current_failure_probability)
            .fold(0.0, f64::max)
    }

    /// Mean utilization across every link, used for the per-episode network
    /// utilization metric.
    pub fn network_link_utilization(&self) -> f64 {
        if self.links.is_empty() {
            return 0.0;
        }
        self.links.values().map(|s| s.utilization).sum::<f64>() / self.links.len() as f64
    }

    /// Mean utilization across datacenter nodes only.
    pub fn network_dc_utilization(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        self.nodes.values().map(|s| s.utilization).sum::<f64>() / self.nodes.len() as f64
    }

    pub fn link_ids(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.links.keys().copied()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// `(total_units, available_units, utilization)`, used for the result
    /// record's per-link utilization breakdown.
    pub fn link_snapshot(&self, link: LinkId) -> (u32, u32, f64) {
        let st = &self.links[&link];
        (st.total_units, st.available_units, st.utilization)
    }

    pub fn node_snapshot(&self, node: &NodeId) -> (u32, u32, f64) {
        let st = &self.nodes[node];
        (st.total_units, st.available_units, st.utilization)
    }
}
