//! Topology descriptor format: nodes, links, and per-zone cascade regions.
//!
//! Parsed with `quick-xml`'s serde integration. Attributes are marked with
//! the `@` prefix quick-xml's serde bridge expects.

use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Deserialize)]
#[serde(rename = "topology")]
pub struct TopologyDoc {
    pub nodes: NodesDoc,
    pub links: LinksDoc,
    #[serde(default)]
    pub zones: Option<ZonesDoc>,
}

#[derive(Debug, Deserialize)]
pub struct NodesDoc {
    #[serde(rename = "node", default)]
    pub node: Vec<NodeDoc>,
}

#[derive(Debug, Deserialize)]
pub struct NodeDoc {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@datacenter", default)]
    pub datacenter: bool,
}

#[derive(Debug, Deserialize)]
pub struct LinksDoc {
    #[serde(rename = "link", default)]
    pub link: Vec<LinkDoc>,
}

#[derive(Debug, Deserialize)]
pub struct LinkDoc {
    #[serde(rename = "@node1")]
    pub node1: String,
    #[serde(rename = "@node2")]
    pub node2: String,
    #[serde(rename = "@units")]
    pub units: u32,
}

#[derive(Debug, Deserialize)]
pub struct ZonesDoc {
    #[serde(rename = "zone", default)]
    pub zone: Vec<ZoneDoc>,
}

#[derive(Debug, Deserialize)]
pub struct ZoneDoc {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "region", default)]
    pub region: Vec<RegionDoc>,
}

/// `tier` is one of `epicenter`, `t73`, `t15`, `t5`, in that order within a
/// zone's `region` list.
#[derive(Debug, Deserialize)]
pub struct RegionDoc {
    #[serde(rename = "@tier")]
    pub tier: String,
    #[serde(rename = "disaster_link", default)]
    pub disaster_link: Vec<DisasterLinkDoc>,
}

#[derive(Debug, Deserialize)]
pub struct DisasterLinkDoc {
    #[serde(rename = "@node1")]
    pub node1: String,
    #[serde(rename = "@node2")]
    pub node2: String,
    /// Percentage points, 1..=100, compared against a `<=` roll.
    #[serde(rename = "@probability")]
    pub probability: u32,
}

pub fn parse(xml: &str) -> Result<TopologyDoc> {
    Ok(quick_xml::de::from_str(xml)?)
}
