//! BDD step definitions for the scheduler

use std::collections::HashMap;

use chrono::Duration;
use cucumber::{then, when};

use crate::world::HealthdeckWorld;

#[when("the scheduler ticks")]
async fn scheduler_ticks(world: &mut HealthdeckWorld) {
    world.tick().await;
}

#[when("the scheduler ticks a minute later")]
async fn scheduler_ticks_later(world: &mut HealthdeckWorld) {
    world.clock.advance(Duration::seconds(60));
    world.tick().await;
}

#[when(expr = "the clock moves {int} minutes forward")]
fn clock_moves(world: &mut HealthdeckWorld, minutes: i64) {
    world.clock.advance(Duration::minutes(minutes));
}

#[then(expr = "target {int} was not probed")]
fn not_probed(world: &mut HealthdeckWorld, id: u64) {
    let url = HealthdeckWorld::http_url(id);
    assert!(!world.http.get_calls().contains(&url));
}

#[then(expr = "target {int} was probed {int} times")]
async fn probed_times(world: &mut HealthdeckWorld, id: u64, times: usize) {
    assert_eq!(world.store.outcomes(id).await.len(), times);
}

#[then(expr = "the last tick resumed {int} targets")]
fn last_tick_resumed(world: &mut HealthdeckWorld, count: usize) {
    let report = world.last_tick.expect("no tick ran");
    assert_eq!(report.resumed, count);
}

#[then(expr = "the last tick probed {int} targets in {int} batches")]
fn last_tick_probed(world: &mut HealthdeckWorld, probed: usize, batches: usize) {
    let report = world.last_tick.expect("no tick ran");
    assert_eq!(report.probed, probed);
    assert_eq!(report.batches, batches);
}

#[then(expr = "the last tick found {int} due targets")]
fn last_tick_due(world: &mut HealthdeckWorld, due: usize) {
    let report = world.last_tick.expect("no tick ran");
    assert_eq!(report.due, due);
}

#[then("every target was probed exactly once")]
fn probed_exactly_once(world: &mut HealthdeckWorld) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for url in world.http.get_calls() {
        *counts.entry(url).or_default() += 1;
    }
    assert!(!counts.is_empty());
    assert!(counts.values().all(|c| *c == 1), "probe counts: {counts:?}");
}

#[then("the scheduler status shows a tick without error")]
async fn status_without_error(world: &mut HealthdeckWorld) {
    let scheduler = world.services().scheduler.clone();
    let status = scheduler.status().await;
    assert!(status.last_tick_at.is_some());
    assert!(status.last_tick_duration_ms.is_some());
    assert!(status.last_tick_error.is_none());
}
