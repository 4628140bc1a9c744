//! Per-episode statistics aggregation.
//!
//! One `StatsAggregator` per episode, fed by the engine's event handlers as
//! services arrive, depart, get disrupted, and get restored. `snapshot()`
//! produces a `StatsSnapshot` both as a mid-run progress point and as the
//! final per-seed record.

use serde::Serialize;

use crate::disaster::TierOutcome;
use crate::failure::DisasterTier;
use crate::ledger::Ledger;
use crate::topology::{NodeId, Topology};

#[derive(Debug, Default, Clone)]
struct ServiceTotals {
    total_service_time: f64,
    total_holding_time: f64,
}

#[derive(Debug, Default, Clone)]
struct TierCounters {
    disrupted: u64,
    restored: u64,
}

/// Running per-episode counters; `snapshot()` turns these into the
/// publishable, division-safe `StatsSnapshot` record.
#[derive(Debug, Default, Clone)]
pub struct StatsAggregator {
    processed_arrivals: u64,
    rejected_services: u64,

    disrupted_services: u64,
    restored_services: u64,
    relocated_services: u64,
    re_disrupted_services: u64,

    sum_loss_cost: f64,
    sum_expected_loss_cost: f64,
    sum_expected_capacity_loss: f64,

    per_tier: [TierCounters; 4],

    cascade_happened_73: u32,
    cascade_happened_15: u32,
    cascade_happened_5: u32,

    totals: ServiceTotals,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_arrival_processed(&mut self) {
        self.processed_arrivals += 1;
    }

    pub fn record_rejection(&mut self) {
        self.rejected_services += 1;
    }

    pub fn record_departure(&mut self, service_time: f64, holding_time: f64) {
        self.totals.total_service_time += service_time;
        self.totals.total_holding_time += holding_time;
    }

    /// Call once per service in a disrupted set, with its eventual outcome.
    /// `tier` is `None` for a standalone (non-disaster) link failure, which
    /// counts toward the aggregate disrupted/restored totals but not the
    /// per-tier disaster counters.
    #[allow(clippy::too_many_arguments)]
    pub fn record_disruption(
        &mut self,
        tier: Option<DisasterTier>,
        restored: bool,
        relocated: bool,
        re_disrupted: bool,
        loss_cost: f64,
        expected_loss_cost: f64,
        expected_capacity_loss: f64,
        service_time: Option<f64>,
        holding_time: f64,
    ) {
        self.disrupted_services += 1;
        if let Some(tier) = tier {
            self.per_tier[tier as usize].disrupted += 1;
        }
        if restored {
            self.restored_services += 1;
            if let Some(tier) = tier {
                self.per_tier[tier as usize].restored += 1;
            }
        } else if let Some(service_time) = service_time {
            self.totals.total_service_time += service_time;
            self.totals.total_holding_time += holding_time;
        }
        if relocated {
            self.relocated_services += 1;
        }
        if re_disrupted {
            self.re_disrupted_services += 1;
        }
        self.sum_loss_cost += loss_cost;
        self.sum_expected_loss_cost += expected_loss_cost;
        self.sum_expected_capacity_loss += expected_capacity_loss;
    }

    pub fn record_cascade_outcome(&mut self, outcome: TierOutcome) {
        if outcome.t73 {
            self.cascade_happened_73 += 1;
        }
        if outcome.t15 {
            self.cascade_happened_15 += 1;
        }
        if outcome.t5 {
            self.cascade_happened_5 += 1;
        }
    }

    pub fn request_blocking_ratio(&self) -> f64 {
        let total = self.processed_arrivals;
        if total == 0 {
            0.0
        } else {
            self.rejected_services as f64 / total as f64
        }
    }

    pub fn restorability(&self) -> f64 {
        if self.disrupted_services == 0 {
            1.0
        } else {
            self.restored_services as f64 / self.disrupted_services as f64
        }
    }

    pub fn relocation_ratio(&self) -> f64 {
        if self.disrupted_services == 0 {
            0.0
        } else {
            self.relocated_services as f64 / self.disrupted_services as f64
        }
    }

    pub fn average_availability(&self) -> f64 {
        if self.totals.total_holding_time == 0.0 {
            0.0
        } else {
            self.totals.total_service_time / self.totals.total_holding_time
        }
    }

    fn mean_over_disrupted(&self, sum: f64) -> f64 {
        if self.disrupted_services == 0 {
            0.0
        } else {
            sum / self.disrupted_services as f64
        }
    }

    /// Builds a full snapshot, pulling link/DC utilization breakdowns from
    /// the ledger at the moment of the call.
    pub fn snapshot(&self, topology: &Topology, ledger: &Ledger) -> StatsSnapshot {
        let link_utilization: Vec<(u32, f64)> = ledger
            .link_ids()
            .map(|id| (id, ledger.link_utilization(id)))
            .collect();
        let dc_utilization: Vec<(NodeId, f64)> = topology
            .datacenters()
            .iter()
            .map(|dc| (dc.clone(), ledger.node_utilization(dc)))
            .collect();

        StatsSnapshot {
            processed_arrivals: self.processed_arrivals,
            rejected_services: self.rejected_services,
            request_blocking_ratio: self.request_blocking_ratio(),
            average_link_utilization: ledger.network_link_utilization(),
            average_dc_utilization: ledger.network_dc_utilization(),
            average_availability: self.average_availability(),
            restorability: self.restorability(),
            relocation_ratio: self.relocation_ratio(),
            disrupted_services: self.disrupted_services,
            restored_services: self.restored_services,
            re_disrupted_services: self.re_disrupted_services,
            average_loss_cost: self.mean_over_disrupted(self.sum_loss_cost),
            average_expected_loss_cost: self.mean_over_disrupted(self.sum_expected_loss_cost),
            average_expected_capacity_loss: self.mean_over_disrupted(self.sum_expected_capacity_loss),
            disrupted_epicenter: self.per_tier[DisasterTier::Epicenter as usize].disrupted,
            disrupted_t73: self.per_tier[DisasterTier::T73 as usize].disrupted,
            disrupted_t15: self.per_tier[DisasterTier::T15 as usize].disrupted,
            disrupted_t5: self.per_tier[DisasterTier::T5 as usize].disrupted,
            restored_epicenter: self.per_tier[DisasterTier::Epicenter as usize].restored,
            restored_t73: self.per_tier[DisasterTier::T73 as usize].restored,
            restored_t15: self.per_tier[DisasterTier::T15 as usize].restored,
            restored_t5: self.per_tier[DisasterTier::T5 as usize].restored,
            cascade_happened_73: self.cascade_happened_73,
            cascade_happened_15: self.cascade_happened_15,
            cascade_happened_5: self.cascade_happened_5,
            link_utilization,
            dc_utilization,
        }
    }
}

/// A fixed-key metrics record: one per seed in the final output, or one
/// progress point mid-episode.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub processed_arrivals: u64,
    pub rejected_services: u64,
    pub request_blocking_ratio: f64,
    pub average_link_utilization: f64,
    pub average_dc_utilization: f64,
    pub average_availability: f64,
    pub restorability: f64,
    pub relocation_ratio: f64,
    pub disrupted_services: u64,
    pub restored_services: u64,
    pub re_disrupted_services: u64,
    pub average_loss_cost: f64,
    pub average_expected_loss_cost: f64,
    pub average_expected_capacity_loss: f64,
    pub disrupted_epicenter: u64,
    pub disrupted_t73: u64,
    pub disrupted_t15: u64,
    pub disrupted_t5: u64,
    pub restored_epicenter: u64,
    pub restored_t73: u64,
    pub restored_t15: u64,
    pub restored_t5: u64,
    pub cascade_happened_73: u32,
    pub cascade_happened_15: u32,
    pub cascade_happened_5: u32,
    pub link_utilization: Vec<(u32, f64)>,
    pub dc_utilization: Vec<(NodeId, f64)>,
}
