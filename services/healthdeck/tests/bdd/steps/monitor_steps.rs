//! BDD step definitions for HTTP monitoring

use cucumber::{given, then, when};

use healthdeck::target::{Status, Target, TargetId, TargetKind};

use crate::world::{parse_label, HealthdeckWorld};

fn http_target(id: TargetId, name: &str) -> Target {
    Target::new(
        id,
        name,
        TargetKind::Http {
            url: HealthdeckWorld::http_url(id),
            expected_status: 200,
            timeout_ms: 1000,
            headers: Default::default(),
        },
    )
}

#[given(expr = "an HTTP target {int} named {string} alerting {string}")]
async fn http_target_alerting(world: &mut HealthdeckWorld, id: u64, name: String, email: String) {
    let mut target = http_target(id, &name);
    target.notification_email = Some(email);
    world.store.insert_target(target).await;
}

#[given(expr = "{int} HTTP targets")]
async fn many_http_targets(world: &mut HealthdeckWorld, count: u64) {
    for id in 1..=count {
        world
            .store
            .insert_target(http_target(id, &format!("service-{id}")))
            .await;
    }
}

#[given(expr = "target {int} currently has status {string}")]
async fn target_has_current_status(world: &mut HealthdeckWorld, id: u64, status: String) {
    let mut target = world.target(id).await;
    target.state.status = parse_label::<Status>(&status);
    world.store.insert_target(target).await;
}

#[given(expr = "target {int} responds with status {int}")]
fn target_responds(world: &mut HealthdeckWorld, id: u64, status: u16) {
    world.http.respond(&HealthdeckWorld::http_url(id), status);
}

#[given(expr = "target {int} is unreachable")]
fn target_unreachable(world: &mut HealthdeckWorld, id: u64) {
    world.http.make_unreachable(&HealthdeckWorld::http_url(id));
}

#[given(expr = "the failure threshold is {int}")]
fn failure_threshold(world: &mut HealthdeckWorld, threshold: u32) {
    assert!(
        world.services.is_none(),
        "threshold must be set before the engine is built"
    );
    world.config.failure_threshold = threshold;
}

#[when(expr = "target {int} is checked manually {int} times")]
async fn checked_manually(world: &mut HealthdeckWorld, id: u64, times: usize) {
    let engine = world.services().engine.clone();
    for _ in 0..times {
        engine.run_now(id).await.expect("manual check failed");
    }
    engine.settle_notifications().await;
}

#[then(expr = "target {int} has status {string}")]
async fn target_status_is(world: &mut HealthdeckWorld, id: u64, status: String) {
    let target = world.target(id).await;
    assert_eq!(target.status(), parse_label::<Status>(&status));
}

#[then(expr = "target {int} has {int} recorded outcomes")]
async fn recorded_outcomes(world: &mut HealthdeckWorld, id: u64, count: usize) {
    assert_eq!(world.store.outcomes(id).await.len(), count);
}

#[then(expr = "the latest outcome for target {int} has error {string}")]
async fn latest_outcome_error(world: &mut HealthdeckWorld, id: u64, error: String) {
    let outcomes = world.store.outcomes(id).await;
    let latest = outcomes.last().expect("no outcomes recorded");
    assert!(!latest.success);
    assert_eq!(latest.error.as_deref(), Some(error.as_str()));
}
