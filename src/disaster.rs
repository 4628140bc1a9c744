//! Disaster zones and the cascading-failure schedule.
//!
//! A zone is four ordered regions — epicenter, then the 73/15/5-percent
//! cascade tiers — each naming the links at risk within it and their
//! individual trigger probability. Activating a zone arms every listed
//! link's `current_failure_probability` for the rest of the episode, then
//! rolls each tier as an independent Bernoulli trial: the epicenter always
//! fires, each cascade tier fires (or not) on its own roll, and a tier's
//! *nominal* time (epicenter time + 3600/7200/10800s) is fixed regardless
//! of whether the earlier tiers actually fired.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Result, SimError};
use crate::failure::{DisasterFailure, DisasterId, DisasterTier};
use crate::rng::EpisodeRng;
use crate::topology::xml::ZoneDoc;
use crate::topology::{LinkId, Topology};

#[derive(Debug, Clone)]
pub struct Region {
    pub tier: DisasterTier,
    /// (link, probability in 1..=100, rolled against a `<=` threshold)
    pub links: Vec<(LinkId, u32)>,
}

#[derive(Debug, Clone)]
pub struct DisasterZone {
    pub id: Arc<str>,
    /// Always exactly four entries, one per `DisasterTier` variant.
    pub regions: Vec<Region>,
}

impl DisasterZone {
    pub fn from_doc(doc: &ZoneDoc, topology: &Topology) -> Result<Self> {
        if doc.region.len() != 4 {
            return Err(SimError::Configuration(format!(
                "zone {} must declare exactly 4 regions, found {}",
                doc.id,
                doc.region.len()
            )));
        }
        let mut regions = Vec::with_capacity(4);
        let mut seen = [false; 4];
        for region_doc in &doc.region {
            let tier = match region_doc.tier.as_str() {
                "epicenter" => DisasterTier::Epicenter,
                "t73" => DisasterTier::T73,
                "t15" => DisasterTier::T15,
                "t5" => DisasterTier::T5,
                other => {
                    return Err(SimError::Configuration(format!(
                        "zone {}: unknown region tier {other}",
                        doc.id
                    )))
                }
            };
            let slot = tier as usize;
            if seen[slot] {
                return Err(SimError::Configuration(format!(
                    "zone {}: tier {:?} declared more than once",
                    doc.id, tier
                )));
            }
            seen[slot] = true;

            let mut links = Vec::with_capacity(region_doc.disaster_link.len());
            for dl in &region_doc.disaster_link {
                let a: Arc<str> = Arc::from(dl.node1.as_str());
                let b: Arc<str> = Arc::from(dl.node2.as_str());
                let link = topology.find_link(&a, &b).ok_or_else(|| {
                    SimError::Configuration(format!(
                        "zone {}: disaster_link {}-{} is not a topology link",
                        doc.id, dl.node1, dl.node2
                    ))
                })?;
                if dl.probability == 0 || dl.probability > 100 {
                    return Err(SimError::Configuration(format!(
                        "zone {}: probability {} out of range 1..=100",
                        doc.id, dl.probability
                    )));
                }
                links.push((link, dl.probability));
            }
            regions.push(Region { tier, links });
        }
        regions.sort_by_key(|r| r.tier as usize);

        Ok(Self {
            id: Arc::from(doc.id.as_str()),
            regions,
        })
    }

    fn region(&self, tier: DisasterTier) -> &Region {
        &self.regions[tier as usize]
    }
}

/// One tier's firing within a zone activation: which links it took down and
/// when. Built only for tiers that actually fired — the epicenter always,
/// the cascade tiers when their Bernoulli roll lands.
#[derive(Debug, Clone)]
pub struct TierEvent {
    pub episode_id: DisasterId,
    pub zone_id: Arc<str>,
    pub tier: DisasterTier,
    pub links: Vec<LinkId>,
    pub arrival_time: f64,
    pub duration: f64,
}

impl TierEvent {
    pub fn into_failure(self) -> DisasterFailure {
        DisasterFailure {
            id: self.episode_id,
            zone_id: self.zone_id,
            tier: self.tier,
            links: self.links,
            nodes: Vec::new(),
            arrival_time: self.arrival_time,
            duration: self.duration,
        }
    }
}

/// Per-tier fired/not-fired outcome of one zone activation, used to drive
/// the `cascade_happened_{73,15,5}` counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct TierOutcome {
    pub t73: bool,
    pub t15: bool,
    pub t5: bool,
}

/// The result of activating one zone: the links to arm for the episode, the
/// fired tier events to schedule (arrival only; each schedules its own
/// departure when processed, mirroring the standalone-link-failure
/// handler), and the time at which every armed link's
/// `current_failure_probability` should be reset to zero once the zone is
/// fully consumed.
#[derive(Debug, Clone)]
pub struct ZoneActivation {
    pub armed_links: Vec<(LinkId, u32)>,
    pub tier_events: Vec<TierEvent>,
    pub clear_time: f64,
    pub outcome: TierOutcome,
}

/// Parses every `<zone>` out of a topology descriptor. Reparses the
/// document independently of `Topology::load` rather than threading a
/// zones field through `Topology` itself, keeping the static graph shape
/// free of disaster-specific concerns.
pub fn load_zones(xml: &str, topology: &Topology) -> Result<Vec<DisasterZone>> {
    let doc = crate::topology::xml::parse(xml)?;
    let zones = doc.zones.map(|z| z.zone).unwrap_or_default();
    zones
        .iter()
        .map(|z| DisasterZone::from_doc(z, topology))
        .collect()
}

/// Nominal gap between successive cascade tiers, in seconds.
const CASCADE_GAP_SECONDS: f64 = 3600.0;

/// Cycles zones in document order and tracks the run-wide activation
/// budget. Zone selection is deterministic (round-robin); only the cascade
/// rolls and inter-arrival/duration draws consume the episode RNG.
pub struct DisasterScheduler {
    zones: Vec<DisasterZone>,
    cursor: usize,
    occurrences_remaining: u32,
}

impl DisasterScheduler {
    pub fn new(zones: Vec<DisasterZone>, occurrences: u32) -> Self {
        Self {
            zones,
            cursor: 0,
            occurrences_remaining: occurrences,
        }
    }

    pub fn has_more(&self) -> bool {
        self.occurrences_remaining > 0 && !self.zones.is_empty()
    }

    /// `next_disaster_arrival = disaster_interval * (k + 1)`,
    /// `disaster_interval = floor(num_arrivals / (number_of_zones + 0.5))`.
    /// `zones_begun` is the count of zones already activated this episode
    /// (the `k` in the formula).
    pub fn next_disaster_arrival_count(&self, num_arrivals: u64, zones_begun: u32) -> u64 {
        if self.zones.is_empty() {
            return u64::MAX;
        }
        let interval = (num_arrivals as f64 / (self.zones.len() as f64 + 0.5)).floor() as u64;
        interval * (zones_begun as u64 + 1)
    }

    /// Activates the next zone in round-robin order: arms its links, rolls
    /// each cascade tier, and computes every fired tier's absolute time.
    pub fn activate_next_zone(
        &mut self,
        now: f64,
        mean_failure_inter_arrival_time: f64,
        mean_failure_duration: f64,
        rng: &mut EpisodeRng,
    ) -> ZoneActivation {
        let zone = &self.zones[self.cursor];
        self.cursor = (self.cursor + 1) % self.zones.len();
        self.occurrences_remaining = self.occurrences_remaining.saturating_sub(1);

        let armed_links: Vec<(LinkId, u32)> = zone
            .regions
            .iter()
            .flat_map(|r| r.links.iter().copied())
            .collect();

        let episode_id: DisasterId = Uuid::new_v4();
        let epi_time = now + rng.exponential("disaster.epicenter.interarrival", mean_failure_inter_arrival_time);
        let epi_duration = rng.exponential("disaster.epicenter.duration", mean_failure_duration);

        let mut tier_events = Vec::with_capacity(4);
        let mut latest_departure = epi_time + epi_duration;
        tier_events.push(TierEvent {
            episode_id,
            zone_id: zone.id.clone(),
            tier: DisasterTier::Epicenter,
            links: zone.region(DisasterTier::Epicenter).links.iter().map(|&(l, _)| l).collect(),
            arrival_time: epi_time,
            duration: epi_duration,
        });

        let mut outcome = TierOutcome::default();

        let t73_time = epi_time + CASCADE_GAP_SECONDS;
        if rng.bernoulli_roll("disaster.cascade.t73", 73) {
            outcome.t73 = true;
            let duration = rng.exponential("disaster.t73.duration", mean_failure_duration);
            latest_departure = latest_departure.max(t73_time + duration);
            tier_events.push(TierEvent {
                episode_id,
                zone_id: zone.id.clone(),
                tier: DisasterTier::T73,
                links: zone.region(DisasterTier::T73).links.iter().map(|&(l, _)| l).collect(),
                arrival_time: t73_time,
                duration,
            });
        }

        let t15_time = t73_time + CASCADE_GAP_SECONDS;
        if rng.bernoulli_roll("disaster.cascade.t15", 15) {
            outcome.t15 = true;
            let duration = rng.exponential("disaster.t15.duration", mean_failure_duration);
            latest_departure = latest_departure.max(t15_time + duration);
            tier_events.push(TierEvent {
                episode_id,
                zone_id: zone.id.clone(),
                tier: DisasterTier::T15,
                links: zone.region(DisasterTier::T15).links.iter().map(|&(l, _)| l).collect(),
                arrival_time: t15_time,
                duration,
            });
        }

        let t5_time = t15_time + CASCADE_GAP_SECONDS;
        if rng.bernoulli_roll("disaster.cascade.t5", 5) {
            outcome.t5 = true;
            let duration = rng.exponential("disaster.t5.duration", mean_failure_duration);
            latest_departure = latest_departure.max(t5_time + duration);
            tier_events.push(TierEvent {
                episode_id,
                zone_id: zone.id.clone(),
                tier: DisasterTier::T5,
                links: zone.region(DisasterTier::T5).links.iter().map(|&(l, _)| l).collect(),
                arrival_time: t5_time,
                duration,
            });
        }

        ZoneActivation {
            armed_links,
            tier_events,
            clear_time: latest_departure,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::xml;

    fn zone_fixture() -> DisasterZone {
        let xml = r#"<zone id="Z1">
            <region tier="epicenter"><disaster_link node1="A" node2="B" probability="100"/></region>
            <region tier="t73"><disaster_link node1="B" node2="C" probability="73"/></region>
            <region tier="t15"><disaster_link node1="C" node2="D" probability="15"/></region>
            <region tier="t5"><disaster_link node1="D" node2="E" probability="5"/></region>
        </zone>"#;
        let doc: xml::ZoneDoc = quick_xml::de::from_str(xml).unwrap();
        let topo_xml = r#"<topology>
            <nodes><node id="A"/><node id="B"/><node id="C"/><node id="D"/><node id="E"/><node id="DC" datacenter="true"/></nodes>
            <links>
                <link node1="A" node2="B" units="1"/>
                <link node1="B" node2="C" units="1"/>
                <link node1="C" node2="D" units="1"/>
                <link node1="D" node2="E" units="1"/>
                <link node1="E" node2="DC" units="1"/>
            </links>
        </topology>"#;
        let topo = Topology::from_xml_str(topo_xml).unwrap();
        DisasterZone::from_doc(&doc, &topo).unwrap()
    }

    #[test]
    fn epicenter_always_fires_cascade_tiers_are_independent() {
        let zone = zone_fixture();
        let mut scheduler = DisasterScheduler::new(vec![zone], 10);
        let mut rng = EpisodeRng::from_seed(7);
        let activation = scheduler.activate_next_zone(0.0, 100.0, 50.0, &mut rng);
        assert!(!activation.tier_events.is_empty());
        assert_eq!(activation.tier_events[0].tier, DisasterTier::Epicenter);
        assert_eq!(activation.armed_links.len(), 4);
    }

    #[test]
    fn next_disaster_arrival_count_matches_formula() {
        let zone = zone_fixture();
        let scheduler = DisasterScheduler::new(vec![zone.clone(), zone], 2);
        // floor(1000 / 2.5) = 400; k=0 -> 400, k=1 -> 800
        assert_eq!(scheduler.next_disaster_arrival_count(1000, 0), 400);
        assert_eq!(scheduler.next_disaster_arrival_count(1000, 1), 800);
    }
}
