//! BDD step definitions for alert delivery

use cucumber::{given, then};

use healthdeck::outcome::{AlertKind, NotificationPreferences, TaskPriority};
use healthdeck::store::Store;

use crate::world::{parse_label, HealthdeckWorld};

#[given(expr = "{string} has disabled monitor alerts")]
async fn disabled_monitor_alerts(world: &mut HealthdeckWorld, email: String) {
    let preferences = NotificationPreferences {
        monitor_alerts: false,
        ..NotificationPreferences::default()
    };
    world.store.set_preferences(&email, preferences).await;
}

#[given("the mailer is refusing messages")]
fn mailer_refusing(world: &mut HealthdeckWorld) {
    world.mailer.set_failing(true);
}

#[given(expr = "target {int} has no notification address")]
async fn no_notification_address(world: &mut HealthdeckWorld, id: u64) {
    let mut target = world.target(id).await;
    target.notification_email = None;
    world.store.insert_target(target).await;
}

#[then(expr = "{int} {string} notification is recorded for target {int}")]
async fn notification_recorded(world: &mut HealthdeckWorld, count: usize, alert: String, id: u64) {
    let alert = parse_label::<AlertKind>(&alert);
    let recorded = world
        .store
        .notifications(id)
        .await
        .unwrap()
        .into_iter()
        .filter(|n| n.alert == alert)
        .count();
    assert_eq!(recorded, count);
}

#[then(expr = "no notifications are recorded for target {int}")]
async fn no_notifications(world: &mut HealthdeckWorld, id: u64) {
    let recorded = world.store.notifications(id).await.unwrap();
    assert!(recorded.is_empty(), "unexpected notifications: {recorded:?}");
}

#[then(expr = "{int} e-mails were sent")]
fn emails_sent(world: &mut HealthdeckWorld, count: usize) {
    assert_eq!(world.mailer.sent().len(), count);
}

#[then(expr = "{int} follow-up task exists with priority {string}")]
async fn task_with_priority(world: &mut HealthdeckWorld, count: usize, priority: String) {
    let priority = parse_label::<TaskPriority>(&priority);
    let tasks = world.store.tasks().await;
    assert_eq!(tasks.len(), count);
    assert!(tasks.iter().all(|t| t.priority == priority));
}

#[then(expr = "{int} follow-up tasks exist")]
async fn tasks_exist(world: &mut HealthdeckWorld, count: usize) {
    assert_eq!(world.store.tasks().await.len(), count);
}
