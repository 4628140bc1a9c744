//! End-to-end scenarios from the specification's testable-properties section:
//! a single abundant-capacity arrival routed to the closest datacenter, the
//! `resource_units_per_link = 0` and `load = 0` boundary behaviors, and the
//! path-restoration / path-restoration-with-relocation decisions a disrupted
//! service is handed.

use std::path::PathBuf;
use std::sync::Arc;

use smallvec::smallvec;

use anycast_cascade_sim::config::{DcPlacement, EngineConfig};
use anycast_cascade_sim::disaster::{DisasterScheduler, DisasterZone};
use anycast_cascade_sim::engine::Environment;
use anycast_cascade_sim::failure::DisasterTier;
use anycast_cascade_sim::ledger::Ledger;
use anycast_cascade_sim::restoration::{
    PathRestoration, PathRestorationWithRelocation, RestorationPolicy, RestoreOps, RestoreOutcome,
};
use anycast_cascade_sim::routing::{self, RouteContext, RoutingPolicy};
use anycast_cascade_sim::rng::EpisodeRng;
use anycast_cascade_sim::service::{PriorityClass, Service};
use anycast_cascade_sim::stats::StatsAggregator;
use anycast_cascade_sim::topology::{Path, Topology};

fn base_config() -> EngineConfig {
    EngineConfig {
        topology_file: PathBuf::from("unused.xml"),
        num_arrivals: 1,
        k_paths: 3,
        dc_placement: DcPlacement::TopDegree(1),
        threads: 1,
        loads: vec![600],
        base_seed: 7,
        num_seeds: 1,
        output_folder: PathBuf::from("out"),
        track_stats_every: 1,
        disaster_occurrences: 0,
        mean_failure_duration: 10.0,
        // Large enough that the self-perpetuating standalone-failure process
        // (SPEC_FULL B.5) never fires before this short episode's one
        // arrival has already departed.
        mean_failure_inter_arrival_time: 1.0e9,
        mean_service_holding_time: 100.0,
        resource_units_per_link: 10,
        routing_policies: vec!["CADC".to_string()],
        restoration_policies: vec!["PR".to_string()],
    }
}

/// A-X-D1 (2 hops) and A-X-Y-D2 (3 hops), abundant capacity everywhere.
fn branching_topology() -> Topology {
    let xml = r#"<topology>
        <nodes>
            <node id="A"/>
            <node id="X"/>
            <node id="Y"/>
            <node id="D1" datacenter="true"/>
            <node id="D2" datacenter="true"/>
        </nodes>
        <links>
            <link node1="A" node2="X" units="10"/>
            <link node1="X" node2="D1" units="10"/>
            <link node1="X" node2="Y" units="10"/>
            <link node1="Y" node2="D2" units="10"/>
        </links>
    </topology>"#;
    Topology::from_xml_str(xml).unwrap()
}

#[test]
fn single_arrival_with_abundant_capacity_departs_with_full_availability() {
    let topology = branching_topology();
    let path_index = topology.build_path_index(3);
    let config = base_config();

    let routing_policy = routing::by_name("CADC", config.k_paths).unwrap();
    let restoration_policy = anycast_cascade_sim::restoration::by_name("PR").unwrap();

    let env = Environment::new(
        &topology,
        &path_index,
        &config,
        600,
        config.base_seed,
        routing_policy.as_ref(),
        restoration_policy.as_ref(),
        Vec::new(),
    );
    let record = env.run().unwrap();

    assert_eq!(record.final_stats.processed_arrivals, 1);
    assert_eq!(record.final_stats.request_blocking_ratio, 0.0);
    assert_eq!(record.final_stats.restorability, 1.0);
    // service_time == holding_time for an undisrupted departure; computed via
    // floating subtraction/addition so compare with a tolerance rather than
    // bit-for-bit equality.
    assert!((record.final_stats.average_availability - 1.0).abs() < 1e-9);
}

#[test]
fn zero_resource_units_per_link_rejects_every_arrival() {
    let topology = branching_topology();
    let path_index = topology.build_path_index(3);
    let mut config = base_config();
    config.num_arrivals = 5;
    config.resource_units_per_link = 0;

    let routing_policy = routing::by_name("CADC", config.k_paths).unwrap();
    let restoration_policy = anycast_cascade_sim::restoration::by_name("PR").unwrap();

    let env = Environment::new(
        &topology,
        &path_index,
        &config,
        600,
        config.base_seed,
        routing_policy.as_ref(),
        restoration_policy.as_ref(),
        Vec::new(),
    );
    let record = env.run().unwrap();

    assert_eq!(record.final_stats.processed_arrivals, 5);
    assert_eq!(record.final_stats.rejected_services, 5);
    assert_eq!(record.final_stats.request_blocking_ratio, 1.0);
    assert_eq!(record.final_stats.disrupted_services, 0);
}

/// Scenario 2 (spec §8): both datacenters hang off the same bottleneck link
/// `A-X`. Exhausting it by hand (rather than through arrivals, whose timing
/// is RNG-driven) deterministically reproduces "every path's available units
/// fall below the requested network units", and the routing policy must
/// return no decision for the next request regardless of destination.
#[test]
fn deterministic_block_rejects_the_next_request_on_every_path() {
    let topology = branching_topology();
    let path_index = topology.build_path_index(3);
    let mut ledger = Ledger::new(&topology, 1);

    let a_x = topology.find_link(&Arc::from("A"), &Arc::from("X")).unwrap();
    let x_d1 = topology.find_link(&Arc::from("X"), &Arc::from("D1")).unwrap();
    let bottleneck_path = Path {
        nodes: smallvec![Arc::from("A"), Arc::from("X"), Arc::from("D1")],
        links: smallvec![a_x, x_d1],
    };
    ledger.provision(&bottleneck_path, 1, 1, 0.0).unwrap();

    let routing_policy = routing::by_name("CADC", 3).unwrap();
    let mut rng = EpisodeRng::from_seed(1);
    let source: anycast_cascade_sim::topology::NodeId = Arc::from("A");
    let decision = routing_policy.route(RouteContext {
        source: &source,
        network_units: 1,
        computing_units: 1,
        datacenters: topology.datacenters(),
        path_index: &path_index,
        ledger: &ledger,
        rng: &mut rng,
    });
    assert!(
        decision.is_none(),
        "both D1 and D2 cross the exhausted A-X link, so no path should remain viable"
    );

    // blocking_ratio = 1 / processed_so_far, where processed_so_far counts
    // the rejected request itself.
    let mut stats = StatsAggregator::new();
    for _ in 0..5 {
        stats.record_arrival_processed();
    }
    stats.record_rejection();
    assert_eq!(stats.request_blocking_ratio(), 1.0 / 5.0);
}

#[test]
fn zero_load_processes_no_arrivals_and_reports_neutral_defaults() {
    let topology = branching_topology();
    let path_index = topology.build_path_index(3);
    let mut config = base_config();
    config.num_arrivals = 50;

    let routing_policy = routing::by_name("CADC", config.k_paths).unwrap();
    let restoration_policy = anycast_cascade_sim::restoration::by_name("PR").unwrap();

    let env = Environment::new(
        &topology,
        &path_index,
        &config,
        0,
        config.base_seed,
        routing_policy.as_ref(),
        restoration_policy.as_ref(),
        Vec::new(),
    );
    let record = env.run().unwrap();

    assert_eq!(record.final_stats.processed_arrivals, 0);
    assert_eq!(record.final_stats.request_blocking_ratio, 0.0);
    assert_eq!(record.final_stats.restorability, 1.0);
    assert_eq!(record.final_stats.average_availability, 0.0);
}

fn stub_service(source: &str, path: Path, network_units: u32, computing_units: u32) -> Service {
    Service {
        id: 1,
        source: Arc::from(source),
        arrival_time: 0.0,
        holding_time: 1000.0,
        computing_units,
        network_units,
        priority_class: PriorityClass::for_priority(3),
        path,
        departure_event: 0,
        provisioned: true,
        failed: true,
        failed_before: false,
        relocated: false,
        expected_risk: 0.0,
        service_disaster_id: None,
        service_time: None,
        availability: None,
    }
}

/// Scenario 3 (spec §8): a service on `A-X-D1` whose only link to `D1` just
/// failed has no alternate path to the same datacenter, so Path-Restoration
/// must seal it rather than restore it.
#[test]
fn path_restoration_seals_a_service_with_no_same_dc_alternative() {
    let topology = branching_topology();
    let path_index = topology.build_path_index(3);
    let mut ledger = anycast_cascade_sim::ledger::Ledger::new(&topology, 10);

    let path = Path {
        nodes: smallvec![Arc::from("A"), Arc::from("X"), Arc::from("D1")],
        links: smallvec![0, 1],
    };
    ledger.set_link_down(0, true); // A-X just failed

    let service = stub_service("A", path, 1, 1);
    let routing_policy = routing::by_name("CADC", 3).unwrap();
    let mut rng = EpisodeRng::from_seed(1);

    let outcome = PathRestoration.restore(
        &service,
        RestoreOps {
            topology: &topology,
            path_index: &path_index,
            ledger: &ledger,
            routing_policy: routing_policy.as_ref(),
            rng: &mut rng,
            now: 10.0,
        },
    );

    assert!(matches!(outcome, RestoreOutcome::NotRestored));
}

/// Scenario 4 (spec §8): the same disruption, but Path-Restoration-with-
/// Relocation falls back to the routing policy and finds `D2` reachable via
/// `A-X-Y-D2` (the failed link `A-X` is shared, so route via a surviving
/// link to `D2` through a topology where `D1` and `D2` don't share the
/// failing edge).
#[test]
fn path_restoration_with_relocation_relocates_to_a_reachable_dc() {
    let xml = r#"<topology>
        <nodes>
            <node id="A"/>
            <node id="X"/>
            <node id="Y"/>
            <node id="D1" datacenter="true"/>
            <node id="D2" datacenter="true"/>
        </nodes>
        <links>
            <link node1="A" node2="X" units="10"/>
            <link node1="X" node2="D1" units="10"/>
            <link node1="A" node2="Y" units="10"/>
            <link node1="Y" node2="D2" units="10"/>
        </links>
    </topology>"#;
    let topology = Topology::from_xml_str(xml).unwrap();
    let path_index = topology.build_path_index(3);
    let mut ledger = anycast_cascade_sim::ledger::Ledger::new(&topology, 10);

    let a_x = topology.find_link(&Arc::from("A"), &Arc::from("X")).unwrap();
    ledger.set_link_down(a_x, true);

    let path = Path {
        nodes: smallvec![Arc::from("A"), Arc::from("X"), Arc::from("D1")],
        links: smallvec![a_x, topology.find_link(&Arc::from("X"), &Arc::from("D1")).unwrap()],
    };
    let service = stub_service("A", path, 1, 1);

    let routing_policy = routing::by_name("CADC", 3).unwrap();
    let mut rng = EpisodeRng::from_seed(1);

    let outcome = PathRestorationWithRelocation.restore(
        &service,
        RestoreOps {
            topology: &topology,
            path_index: &path_index,
            ledger: &ledger,
            routing_policy: routing_policy.as_ref(),
            rng: &mut rng,
            now: 10.0,
        },
    );

    match outcome {
        RestoreOutcome::Restored { path, relocated } => {
            assert!(relocated);
            assert_eq!(path.destination().as_ref(), "D2");
        }
        RestoreOutcome::NotRestored => panic!("expected relocation to D2"),
    }
}

fn cascade_zone() -> DisasterZone {
    let xml = r#"<topology>
        <nodes>
            <node id="A"/><node id="B"/><node id="C"/><node id="D"/><node id="E"/>
            <node id="DC" datacenter="true"/>
        </nodes>
        <links>
            <link node1="A" node2="B" units="1"/>
            <link node1="B" node2="C" units="1"/>
            <link node1="C" node2="D" units="1"/>
            <link node1="D" node2="E" units="1"/>
            <link node1="E" node2="DC" units="1"/>
        </links>
        <zones>
            <zone id="Z1">
                <region tier="epicenter"><disaster_link node1="A" node2="B" probability="100"/></region>
                <region tier="t73"><disaster_link node1="B" node2="C" probability="73"/></region>
                <region tier="t15"><disaster_link node1="C" node2="D" probability="15"/></region>
                <region tier="t5"><disaster_link node1="D" node2="E" probability="5"/></region>
            </zone>
        </zones>
    </topology>"#;
    let topology = Topology::from_xml_str(xml).unwrap();
    anycast_cascade_sim::disaster::load_zones(xml, &topology).unwrap().remove(0)
}

/// Scenario 5 (spec §8): the epicenter always fires, and whichever cascade
/// tiers (T73/T15/T5) fire are scheduled at the fixed nominal offsets
/// (+3600s each) from the epicenter regardless of which earlier tiers
/// actually fired. The exact fire/no-fire pattern is a coin flip over the
/// episode RNG stream and isn't asserted here; what's deterministic (and
/// tested) is that every tier that *does* fire lands at its nominal time,
/// and that `TierOutcome` faithfully counts through `record_cascade_outcome`.
#[test]
fn cascade_tier_events_land_on_their_nominal_offsets() {
    let zone = cascade_zone();
    let mut scheduler = DisasterScheduler::new(vec![zone], 1);
    let mut rng = EpisodeRng::from_seed(7);
    let activation = scheduler.activate_next_zone(0.0, 100.0, 50.0, &mut rng);

    assert_eq!(activation.tier_events[0].tier, DisasterTier::Epicenter);
    let epi_time = activation.tier_events[0].arrival_time;

    for event in &activation.tier_events {
        let expected_offset = match event.tier {
            DisasterTier::Epicenter => 0.0,
            DisasterTier::T73 => 3600.0,
            DisasterTier::T15 => 7200.0,
            DisasterTier::T5 => 10800.0,
        };
        assert!((event.arrival_time - (epi_time + expected_offset)).abs() < 1e-9);
    }

    // The set of fired tiers in `outcome` matches exactly the tiers actually
    // scheduled (beyond the always-firing epicenter).
    let fired: std::collections::HashSet<DisasterTier> =
        activation.tier_events.iter().map(|e| e.tier).collect();
    assert_eq!(fired.contains(&DisasterTier::T73), activation.outcome.t73);
    assert_eq!(fired.contains(&DisasterTier::T15), activation.outcome.t15);
    assert_eq!(fired.contains(&DisasterTier::T5), activation.outcome.t5);
}

/// Scenario 5 (spec §8), stats half: the exact pattern the spec names
/// (T73 fires, T15 doesn't, T5 fires) must flow through
/// `record_cascade_outcome` into the right counters and no others.
#[test]
fn cascade_outcome_counters_match_the_fired_tiers() {
    let mut stats = StatsAggregator::new();
    stats.record_cascade_outcome(anycast_cascade_sim::disaster::TierOutcome {
        t73: true,
        t15: false,
        t5: true,
    });
    let snapshot = stats.snapshot(&branching_topology(), &Ledger::new(&branching_topology(), 10));
    assert_eq!(snapshot.cascade_happened_73, 1);
    assert_eq!(snapshot.cascade_happened_15, 0);
    assert_eq!(snapshot.cascade_happened_5, 1);
}

/// Scenario 6 (spec §8): a service disrupted by two successive disasters is
/// counted once in `disrupted_services` per disruption event (so twice
/// cumulatively across the run), but only the second counts as a
/// re-disruption — `re_disrupted` is true only once `failed_before` was
/// already set from the first disruption.
#[test]
fn re_disruption_is_counted_once_per_disaster_but_cumulatively_across_disasters() {
    let mut stats = StatsAggregator::new();

    // First disaster: service has never failed before.
    stats.record_disruption(
        Some(DisasterTier::Epicenter),
        true,
        false,
        false,
        1.0,
        1.0,
        1.0,
        None,
        0.0,
    );
    // Second disaster: the same service, now with failed_before == true,
    // is disrupted again.
    stats.record_disruption(
        Some(DisasterTier::Epicenter),
        true,
        false,
        true,
        1.0,
        1.0,
        1.0,
        None,
        0.0,
    );

    let snapshot = stats.snapshot(&branching_topology(), &Ledger::new(&branching_topology(), 10));
    assert_eq!(snapshot.disrupted_services, 2);
    assert_eq!(snapshot.re_disrupted_services, 1);
    assert_eq!(snapshot.disrupted_epicenter, 2);
}
