//! The Environment (C8): composes every other component and drives the
//! discrete-event main loop for one (routing policy, restoration policy,
//! load, seed) episode. One `Environment` is built fresh per episode —
//! nothing here survives across seeds.

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::disaster::{DisasterScheduler, DisasterZone};
use crate::error::Result;
use crate::event::{Event, EventQueue};
use crate::failure::{DisasterEventId, DisasterFailure, DisasterId, DisasterTier, FailureId, LinkFailure};
use crate::ledger::Ledger;
use crate::restoration::{apply_outcome, RestorationPolicy, RestoreOps, RestoreOutcome};
use crate::rng::EpisodeRng;
use crate::routing::{RouteContext, RoutingPolicy};
use crate::service::{PriorityClass, Service, ServiceId};
use crate::stats::{StatsAggregator, StatsSnapshot};
use crate::topology::{LinkId, NodeId, PathIndex, Topology};

/// Final output of one episode: the result record, plus the mid-run
/// progress snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct SeedRecord {
    pub seed: u64,
    pub routing_policy: &'static str,
    pub restoration_policy: &'static str,
    pub load: u32,
    pub final_stats: StatsSnapshot,
    pub progress: Vec<StatsSnapshot>,
    pub wall_clock_seconds: f64,
}

pub struct Environment<'a> {
    topology: &'a Topology,
    path_index: &'a PathIndex,
    config: &'a EngineConfig,
    load: u32,
    seed: u64,

    ledger: Ledger,
    events: EventQueue,
    rng: EpisodeRng,
    routing_policy: &'a dyn RoutingPolicy,
    restoration_policy: &'a dyn RestorationPolicy,
    disaster_scheduler: DisasterScheduler,
    stats: StatsAggregator,
    progress: Vec<StatsSnapshot>,

    source_nodes: Vec<NodeId>,

    services: HashMap<ServiceId, Service>,
    next_service_id: ServiceId,

    pending_link_failures: HashMap<FailureId, LinkFailure>,
    next_failure_id: FailureId,

    pending_disaster_events: HashMap<DisasterEventId, DisasterFailure>,
    /// Links armed by one zone activation, keyed by that activation's
    /// `ZoneClear` event id, so the clear handler knows which links' risk to
    /// reset once the zone is fully consumed.
    zone_clear_links: HashMap<DisasterEventId, Vec<(LinkId, u32)>>,
    next_disaster_event_id: DisasterEventId,

    arrival_index: u64,
    processed_arrivals: u64,
    zones_begun: u32,
    next_disaster_trigger: u64,
}

impl<'a> Environment<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        topology: &'a Topology,
        path_index: &'a PathIndex,
        config: &'a EngineConfig,
        load: u32,
        seed: u64,
        routing_policy: &'a dyn RoutingPolicy,
        restoration_policy: &'a dyn RestorationPolicy,
        zones: Vec<DisasterZone>,
    ) -> Self {
        let ledger = Ledger::new(topology, config.resource_units_per_link);
        let disaster_scheduler = DisasterScheduler::new(zones, config.disaster_occurrences);
        let next_disaster_trigger =
            disaster_scheduler.next_disaster_arrival_count(config.num_arrivals, 0);

        Self {
            topology,
            path_index,
            config,
            load,
            seed,
            ledger,
            events: EventQueue::new(),
            rng: EpisodeRng::from_seed(seed),
            routing_policy,
            restoration_policy,
            disaster_scheduler,
            stats: StatsAggregator::new(),
            progress: Vec::new(),
            source_nodes: topology.source_nodes(),
            services: HashMap::new(),
            next_service_id: 0,
            pending_link_failures: HashMap::new(),
            next_failure_id: 0,
            pending_disaster_events: HashMap::new(),
            zone_clear_links: HashMap::new(),
            next_disaster_event_id: 0,
            arrival_index: 0,
            processed_arrivals: 0,
            zones_begun: 0,
            next_disaster_trigger,
        }
    }

    /// Drains the event queue in time order until empty, then produces the
    /// episode's result record.
    pub fn run(mut self) -> Result<SeedRecord> {
        let started = Instant::now();
        let span = tracing::info_span!(
            "episode",
            routing = self.routing_policy.name(),
            restoration = self.restoration_policy.name(),
            load = self.load,
            seed = self.seed,
        );
        let _guard = span.enter();

        self.schedule_next_arrival(0.0);
        self.schedule_next_link_failure(0.0);

        while let Some((now, event)) = self.events.pop() {
            match event {
                Event::Arrival => self.handle_arrival(now)?,
                Event::Departure(sid) => self.handle_departure(now, sid)?,
                Event::LinkFailureArrival(fid) => self.handle_link_failure_arrival(now, fid)?,
                Event::LinkFailureDeparture(fid) => self.handle_link_failure_departure(fid),
                Event::DisasterArrival(did) => self.handle_disaster_arrival(now, did)?,
                Event::DisasterDeparture(did) => self.handle_disaster_departure(did),
                Event::ZoneClear(cid) => self.handle_zone_clear(cid),
            }
        }

        let final_stats = self.stats.snapshot(self.topology, &self.ledger);
        Ok(SeedRecord {
            seed: self.seed,
            routing_policy: self.routing_policy.name(),
            restoration_policy: self.restoration_policy.name(),
            load: self.load,
            final_stats,
            progress: self.progress,
            wall_clock_seconds: started.elapsed().as_secs_f64(),
        })
    }

    // -- arrival ------------------------------------------------------------

    fn handle_arrival(&mut self, now: f64) -> Result<()> {
        self.processed_arrivals += 1;
        self.stats.record_arrival_processed();

        let service_id = self.next_service_id;
        self.next_service_id += 1;

        let source_idx = self.rng.uniform_index("arrival.source", self.source_nodes.len());
        let source = self.source_nodes[source_idx].clone();
        let computing_units = self.rng.uniform_index("arrival.computing_units", 5) as u32 + 1;
        let network_units = 1;
        let holding_time = self
            .rng
            .exponential("arrival.holding_time", self.config.mean_service_holding_time);
        let priority_class = self.draw_priority_class();

        let datacenters = self.topology.datacenters();
        let decision = self.routing_policy.route(RouteContext {
            source: &source,
            network_units,
            computing_units,
            datacenters,
            path_index: self.path_index,
            ledger: &self.ledger,
            rng: &mut self.rng,
        });

        match decision {
            Some(decision) => {
                self.ledger
                    .provision(&decision.path, network_units, computing_units, now)?;
                let expected_risk = self.ledger.path_risk(&decision.path);
                let departure_event = self
                    .events
                    .schedule(now + holding_time, Event::Departure(service_id));
                let service = Service {
                    id: service_id,
                    source,
                    arrival_time: now,
                    holding_time,
                    computing_units,
                    network_units,
                    priority_class,
                    path: decision.path,
                    departure_event,
                    provisioned: true,
                    failed: false,
                    failed_before: false,
                    relocated: false,
                    expected_risk,
                    service_disaster_id: None,
                    service_time: None,
                    availability: None,
                };
                self.services.insert(service_id, service);
            }
            None => {
                tracing::debug!(service_id, %source, "arrival rejected: no viable path");
                self.stats.record_rejection();
            }
        }

        if self.processed_arrivals % self.config.track_stats_every == 0 {
            self.progress.push(self.stats.snapshot(self.topology, &self.ledger));
        }

        self.schedule_next_arrival(now);
        Ok(())
    }

    /// A `1..=10` roll where `>3` is priority 3 (~70%), `>1` is priority 2
    /// (~20%), else priority 1 (~10%).
    fn draw_priority_class(&mut self) -> PriorityClass {
        let roll = self.rng.uniform_index("arrival.priority_roll", 10) + 1;
        let priority = if roll > 3 {
            3
        } else if roll > 1 {
            2
        } else {
            1
        };
        PriorityClass::for_priority(priority)
    }

    /// `at = now + Exp(1/mean_service_inter_arrival_time)`; schedules the
    /// next `Arrival` and, when the arrival counter hits the scheduler's
    /// trigger, activates the next disaster zone. A `load` of 0 yields an
    /// infinite inter-arrival time, so no further arrivals are ever
    /// scheduled.
    fn schedule_next_arrival(&mut self, now: f64) {
        if self.arrival_index >= self.config.num_arrivals {
            return;
        }
        let inter = self.config.mean_service_inter_arrival_time(self.load);
        if !inter.is_finite() {
            return;
        }
        let at = now + self.rng.exponential("arrival.interarrival", inter);
        self.arrival_index += 1;
        self.events.schedule(at, Event::Arrival);

        if self.disaster_scheduler.has_more() && self.arrival_index == self.next_disaster_trigger {
            self.activate_zone(at);
        }
    }

    // -- departure ------------------------------------------------------------

    fn handle_departure(&mut self, now: f64, sid: ServiceId) -> Result<()> {
        let mut service = self.services.remove(&sid).ok_or_else(|| {
            crate::error::SimError::Invariant(format!(
                "departure event fired for service {sid} no longer tracked"
            ))
        })?;
        self.ledger
            .release(&service.path, service.network_units, service.computing_units, now)?;
        service.seal(now);
        self.stats
            .record_departure(service.service_time.unwrap(), service.holding_time);
        Ok(())
    }

    // -- standalone (non-disaster) link failures -----------------------------

    /// Self-perpetuating process, independent of the disaster schedule:
    /// draws the next inter-arrival time, picks one link uniformly, draws
    /// its duration, and reschedules itself — bounded by the same arrival
    /// budget as the rest of the episode.
    fn schedule_next_link_failure(&mut self, now: f64) {
        if self.processed_arrivals >= self.config.num_arrivals {
            return;
        }
        let at = now
            + self
                .rng
                .exponential("link_failure.interarrival", self.config.mean_failure_inter_arrival_time);
        let links = self.topology.links();
        let idx = self.rng.uniform_index("link_failure.pick", links.len());
        let link = links[idx].id;
        let duration = self
            .rng
            .exponential("link_failure.duration", self.config.mean_failure_duration);

        let id = self.next_failure_id;
        self.next_failure_id += 1;
        self.pending_link_failures.insert(
            id,
            LinkFailure {
                id,
                link,
                arrival_time: at,
                duration,
            },
        );
        self.events.schedule(at, Event::LinkFailureArrival(id));
    }

    fn handle_link_failure_arrival(&mut self, now: f64, fid: FailureId) -> Result<()> {
        let failure = self.pending_link_failures.get(&fid).cloned().ok_or_else(|| {
            crate::error::SimError::Invariant(format!(
                "link failure arrival fired for untracked failure id {fid}"
            ))
        })?;
        tracing::info!(link = failure.link, "standalone link failure");
        self.ledger.set_link_down(failure.link, true);

        let disrupted = self.disrupted_service_ids(&[failure.link], &[]);
        self.disrupt_and_restore(now, disrupted, None, None)?;

        self.events
            .schedule(now + failure.duration, Event::LinkFailureDeparture(fid));
        self.schedule_next_link_failure(now);
        Ok(())
    }

    fn handle_link_failure_departure(&mut self, fid: FailureId) {
        if let Some(failure) = self.pending_link_failures.remove(&fid) {
            self.ledger.set_link_down(failure.link, false);
        }
    }

    // -- disasters ------------------------------------------------------------

    fn activate_zone(&mut self, now: f64) {
        let activation = self.disaster_scheduler.activate_next_zone(
            now,
            self.config.mean_failure_inter_arrival_time,
            self.config.mean_failure_duration,
            &mut self.rng,
        );
        tracing::info!(
            armed_links = activation.armed_links.len(),
            t73 = activation.outcome.t73,
            t15 = activation.outcome.t15,
            t5 = activation.outcome.t5,
            "disaster zone activated"
        );

        for &(link, probability) in &activation.armed_links {
            self.ledger.set_failure_probability(link, probability as f64 / 100.0);
        }

        for tier_event in activation.tier_events {
            let id = self.next_disaster_event_id;
            self.next_disaster_event_id += 1;
            let arrival_time = tier_event.arrival_time;
            self.pending_disaster_events.insert(id, tier_event.into_failure());
            self.events.schedule(arrival_time, Event::DisasterArrival(id));
        }

        let clear_id = self.next_disaster_event_id;
        self.next_disaster_event_id += 1;
        self.zone_clear_links.insert(clear_id, activation.armed_links);
        self.events.schedule(activation.clear_time, Event::ZoneClear(clear_id));

        self.stats.record_cascade_outcome(activation.outcome);
        self.zones_begun += 1;
        self.next_disaster_trigger = self
            .disaster_scheduler
            .next_disaster_arrival_count(self.config.num_arrivals, self.zones_begun);
    }

    fn handle_disaster_arrival(&mut self, now: f64, id: DisasterEventId) -> Result<()> {
        let failure = self.pending_disaster_events.get(&id).cloned().ok_or_else(|| {
            crate::error::SimError::Invariant(format!(
                "disaster arrival fired for untracked event id {id}"
            ))
        })?;

        for &link in &failure.links {
            self.ledger.set_link_down(link, true);
        }
        for node in &failure.nodes {
            self.ledger.set_node_down(node, true);
        }

        let disrupted = self.disrupted_service_ids(&failure.links, &failure.nodes);
        self.disrupt_and_restore(now, disrupted, Some(failure.tier), Some(failure.id))?;

        self.events
            .schedule(now + failure.duration, Event::DisasterDeparture(id));
        Ok(())
    }

    fn handle_disaster_departure(&mut self, id: DisasterEventId) {
        if let Some(failure) = self.pending_disaster_events.remove(&id) {
            for &link in &failure.links {
                self.ledger.set_link_down(link, false);
            }
            for node in &failure.nodes {
                self.ledger.set_node_down(node, false);
            }
        }
    }

    fn handle_zone_clear(&mut self, id: DisasterEventId) {
        if let Some(links) = self.zone_clear_links.remove(&id) {
            for (link, _) in links {
                self.ledger.set_failure_probability(link, 0.0);
            }
        }
    }

    // -- shared disruption handling -------------------------------------------

    /// Every currently-provisioned service whose route touches any of
    /// `links` or whose destination is any of `nodes`; a service touching
    /// several failed edges still appears once.
    fn disrupted_service_ids(&self, links: &[LinkId], nodes: &[NodeId]) -> Vec<ServiceId> {
        self.services
            .values()
            .filter(|s| {
                links.iter().any(|l| s.path.links.contains(l))
                    || nodes.iter().any(|n| s.destination() == n)
            })
            .map(|s| s.id)
            .collect()
    }

    /// Releases, cancels, and re-provisions (or seals) every service in
    /// `service_ids`, in priority order: ascending `priority_class.priority`,
    /// then ascending remaining time, with a stable tiebreak on
    /// `service_id`. `tier` is `None` for a standalone link failure.
    fn disrupt_and_restore(
        &mut self,
        now: f64,
        mut service_ids: Vec<ServiceId>,
        tier: Option<DisasterTier>,
        disaster_episode: Option<DisasterId>,
    ) -> Result<()> {
        service_ids.sort_by(|a, b| {
            let sa = &self.services[a];
            let sb = &self.services[b];
            sa.priority_class
                .priority
                .cmp(&sb.priority_class.priority)
                .then_with(|| {
                    sa.remaining_time(now)
                        .partial_cmp(&sb.remaining_time(now))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.cmp(b))
        });

        for sid in service_ids {
            let Some(mut service) = self.services.remove(&sid) else {
                continue;
            };

            let expected_capacity_loss = self.ledger.path_risk(&service.path);
            self.ledger
                .release(&service.path, service.network_units, service.computing_units, now)?;
            if !self.events.cancel(service.departure_event) {
                return Err(crate::error::SimError::Invariant(format!(
                    "attempted cancel of departure event {} for service {sid} that was not live",
                    service.departure_event
                )));
            }

            let re_disrupted = service.failed_before;
            service.failed = true;
            service.relocated = false;
            service.failed_before = true;
            service.service_disaster_id = disaster_episode.or(service.service_disaster_id);

            let outcome = self.restoration_policy.restore(
                &service,
                RestoreOps {
                    topology: self.topology,
                    path_index: self.path_index,
                    ledger: &self.ledger,
                    routing_policy: self.routing_policy,
                    rng: &mut self.rng,
                    now,
                },
            );
            if matches!(outcome, RestoreOutcome::NotRestored) {
                tracing::debug!(service_id = sid, "restoration found no viable path");
            }
            let restored = matches!(outcome, RestoreOutcome::Restored { .. });
            let relocated_flag =
                matches!(&outcome, RestoreOutcome::Restored { relocated, .. } if *relocated);

            let new_departure = apply_outcome(&mut service, outcome, &mut self.ledger, now)?;

            let loss_cost = service.priority_class.loss_cost;
            let expected_loss_cost = service.priority_class.expected_loss_cost;
            let holding_time = service.holding_time;
            let service_time_if_sealed = service.service_time;

            if let Some(dep_time) = new_departure {
                let event_id = self.events.schedule(dep_time, Event::Departure(service.id));
                service.departure_event = event_id;
                self.services.insert(service.id, service);
            }

            self.stats.record_disruption(
                tier,
                restored,
                relocated_flag,
                re_disrupted,
                loss_cost,
                expected_loss_cost,
                expected_capacity_loss,
                service_time_if_sealed,
                holding_time,
            );
        }
        Ok(())
    }
}
