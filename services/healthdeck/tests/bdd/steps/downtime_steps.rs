//! BDD step definitions for downtime

use chrono::Duration;
use cucumber::{then, when};

use healthdeck::clock::Clock;

use crate::world::HealthdeckWorld;

#[when(expr = "downtime of {int} seconds is scheduled for target {int}")]
async fn schedule_downtime(world: &mut HealthdeckWorld, seconds: u64, id: u64) {
    let downtime = world.services().downtime.clone();
    world.last_error = downtime
        .schedule_downtime(id, seconds)
        .await
        .err()
        .map(|e| e.to_string());
}

#[when(expr = "target {int} is resumed")]
async fn resume(world: &mut HealthdeckWorld, id: u64) {
    let downtime = world.services().downtime.clone();
    downtime.resume(id).await.expect("resume failed");
}

#[then(expr = "target {int} is suspended until {int} seconds from now")]
async fn suspended_until(world: &mut HealthdeckWorld, id: u64, seconds: i64) {
    let target = world.target(id).await;
    assert!(!target.active);
    assert_eq!(
        target.suspended_until,
        Some(world.clock.now() + Duration::seconds(seconds))
    );
}

#[then(expr = "target {int} is suspended indefinitely")]
async fn suspended_indefinitely(world: &mut HealthdeckWorld, id: u64) {
    let target = world.target(id).await;
    assert!(!target.active);
    assert_eq!(target.suspended_until, None);
}

#[then(expr = "target {int} is active")]
async fn is_active(world: &mut HealthdeckWorld, id: u64) {
    let target = world.target(id).await;
    assert!(target.active);
    assert_eq!(target.suspended_until, None);
}

#[then(expr = "the request fails with {string}")]
fn request_fails(world: &mut HealthdeckWorld, message: String) {
    assert_eq!(world.last_error.as_deref(), Some(message.as_str()));
}
