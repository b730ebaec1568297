//! BDD step definitions for remote data checks

use cucumber::given;
use serde_json::json;

use healthdeck::evaluator::CheckKind;
use healthdeck::target::{Severity, Target, TargetKind};

use crate::world::{parse_label, HealthdeckWorld};

#[given(expr = "a remote client at {string}")]
fn remote_client(world: &mut HealthdeckWorld, base: String) {
    world.remote_base = Some(base);
}

#[given(
    expr = "a {string} data check {int} {string} on that client expecting between {int} and {int} alerting {string}"
)]
async fn data_check(
    world: &mut HealthdeckWorld,
    severity: String,
    id: u64,
    code: String,
    min: i64,
    max: i64,
    email: String,
) {
    let base = world.remote_base.clone().expect("no remote client");
    let mut target = Target::new(
        id,
        code.clone(),
        TargetKind::DataCheck {
            client_base: base,
            code,
            check: CheckKind::Range {
                min: Some(min as f64),
                max: Some(max as f64),
            },
            severity: parse_label::<Severity>(&severity),
        },
    );
    target.notification_email = Some(email);
    world.store.insert_target(target).await;
}

#[given(expr = "the client reports {string} with value {int}")]
fn client_reports_value(world: &mut HealthdeckWorld, code: String, value: i64) {
    world.remote_results.push(json!({
        "code": code,
        "success": true,
        "actualValue": value,
        "executionTimeMs": 12,
    }));
    world.publish_remote_results();
}

#[given(expr = "the client reports {string} failing with {string}")]
fn client_reports_failure(world: &mut HealthdeckWorld, code: String, message: String) {
    world.remote_results.push(json!({
        "code": code,
        "success": false,
        "errorMessage": message,
    }));
    world.publish_remote_results();
}

#[given("the remote client is unreachable")]
fn remote_unreachable(world: &mut HealthdeckWorld) {
    let base = world.remote_base.as_deref().expect("no remote client");
    world.http.forget_post(&format!("{}/api/execute-all", base));
}
