mod support;

use std::collections::BTreeSet;

use crowd_sim::config::{PolicyKind, SimConfig};
use crowd_sim::geometry::{DistanceMetric, Point};
use crowd_sim::synthetic::{BoundingBox, SyntheticConfig, SyntheticStream};
use support::{run_checked, simulation};

fn busy_stream(seed: u64) -> SyntheticConfig {
    SyntheticConfig::default()
        .with_seed(seed)
        .with_workers(15)
        .with_tasks(120)
        .with_task_release_window(60)
        .with_task_lifetime(3, 20)
}

fn policies() -> [PolicyKind; 3] {
    [PolicyKind::Greedy, PolicyKind::composite(), PolicyKind::Hungarian]
}

#[test]
fn every_policy_keeps_bindings_one_to_one_and_conserves_tasks() {
    for policy in policies() {
        let label = policy.label();
        let mut sim = simulation(
            SimConfig::default().with_max_pickup_radius(3.0).with_policy(policy),
            SyntheticStream::new(&busy_stream(11)),
        );
        let (summary, trace) = run_checked(&mut sim);

        assert_eq!(summary.tasks_admitted, 120, "{label}");
        assert_eq!(summary.tasks_open, 0, "{label} left tasks open");
        assert!(summary.tasks_completed > 0, "{label} completed nothing");
        assert_eq!(trace.records.len() as u64, summary.ticks);

        // No task was served by two workers.
        let served: BTreeSet<_> = sim.metrics().completed_tasks().iter().map(|r| r.task).collect();
        assert_eq!(served.len(), sim.metrics().completed_tasks().len(), "{label}");
    }
}

#[test]
fn completed_tasks_were_assigned_inside_their_window() {
    for policy in policies() {
        let mut sim = simulation(
            SimConfig::default().with_policy(policy),
            SyntheticStream::new(&busy_stream(5)),
        );
        let (_, trace) = run_checked(&mut sim);

        for binding in trace.bindings.values() {
            assert!(binding.release_time <= binding.assigned_at);
            assert!(binding.assigned_at < binding.expiry_time);
        }
        for record in sim.metrics().completed_tasks() {
            assert!(record.release_time <= record.assigned_at);
            assert!(record.assigned_at < record.expiry_time);
            assert!(record.picked_up_at < record.expiry_time, "{record:?}");
            assert!(record.assigned_at <= record.picked_up_at);
            assert!(record.picked_up_at < record.completed_at);
        }
    }
}

#[test]
fn identical_inputs_produce_identical_runs() {
    for policy in policies() {
        let run = || {
            let mut sim = simulation(
                SimConfig::default().with_policy(policy.clone()),
                SyntheticStream::new(&busy_stream(99)),
            );
            let (summary, trace) = run_checked(&mut sim);
            (summary, trace.records, sim.metrics().completed_tasks().to_vec())
        };
        assert_eq!(run(), run(), "{} is not deterministic", policy.label());
    }
}

#[test]
fn hard_horizon_leaves_the_remainder_open() {
    let mut sim = simulation(
        SimConfig::default().with_tick_limit(20),
        SyntheticStream::new(&busy_stream(3)),
    );
    let (summary, trace) = run_checked(&mut sim);

    assert_eq!(summary.ticks, 20);
    assert_eq!(trace.records.last().map(|r| r.tick), Some(19));
    assert!(summary.tasks_open > 0);
    assert!(summary.tasks_admitted < 120);
}

#[test]
fn geographic_run_uses_h3_buckets() {
    let area = BoundingBox::new(Point::new(37.74, -122.46), Point::new(37.80, -122.40));
    let stream = SyntheticConfig::default()
        .with_seed(17)
        .with_area(area)
        .with_workers(10)
        .with_tasks(40)
        .with_task_lifetime(5, 30);
    let config = SimConfig::default()
        .with_distance_metric(DistanceMetric::Haversine)
        .with_h3_resolution(8)
        .with_speed(0.4)
        .with_max_pickup_radius(2.0);

    let mut sim = simulation(config, SyntheticStream::new(&stream));
    let (summary, _) = run_checked(&mut sim);
    assert_eq!(summary.data_errors, 0);
    assert!(summary.tasks_completed > 0);
    for record in sim.metrics().completed_tasks() {
        assert!(record.pickup_distance <= 2.0 + 1e-9);
    }
}
