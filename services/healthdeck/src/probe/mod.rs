//! Probes: one evaluation attempt against one target

pub mod http;
pub mod remote;

pub use http::{HttpProbe, HttpProbeResult};
pub use remote::{CheckDescriptor, RemoteCheckClient, RemoteResult};

use std::collections::BTreeMap;

use crate::target::{Target, TargetKind};

/// Unit of work the scheduler fans out
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeJob {
    /// One HTTP reachability probe
    Http(Target),
    /// One `execute-all` round trip covering every due check on a client
    RemoteClient { base: String, targets: Vec<Target> },
}

impl ProbeJob {
    /// Number of targets this job evaluates
    pub fn target_count(&self) -> usize {
        match self {
            ProbeJob::Http(_) => 1,
            ProbeJob::RemoteClient { targets, .. } => targets.len(),
        }
    }
}

/// Turn a due set into jobs: each HTTP target stands alone, data checks are
/// grouped per remote client in order of first appearance.
///
/// The scheduler's batch size bounds jobs in flight, not targets. A batch of
/// ten HTTP targets is ten outbound requests, while every due check on one
/// remote client travels in a single `execute-all` call and so occupies one
/// slot however many checks it covers. `TickReport::batches` counts batches
/// of jobs.
pub fn plan_jobs(due: Vec<Target>) -> Vec<ProbeJob> {
    let mut jobs = Vec::new();
    let mut clients: BTreeMap<String, usize> = BTreeMap::new();

    for target in due {
        match &target.kind {
            TargetKind::Http { .. } => jobs.push(ProbeJob::Http(target)),
            TargetKind::DataCheck { client_base, .. } => {
                let base = client_base.trim_end_matches('/').to_string();
                match clients.get(&base) {
                    Some(&index) => {
                        if let ProbeJob::RemoteClient { targets, .. } = &mut jobs[index] {
                            targets.push(target);
                        }
                    }
                    None => {
                        clients.insert(base.clone(), jobs.len());
                        jobs.push(ProbeJob::RemoteClient {
                            base,
                            targets: vec![target],
                        });
                    }
                }
            }
        }
    }

    jobs
}
