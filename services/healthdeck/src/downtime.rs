//! Downtime Manager: operator-initiated suspension of probing

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::store::Store;
use crate::target::TargetId;
use crate::HealthdeckError;

/// Durations an operator may pick; `0` suspends until resumed by hand
pub const ALLOWED_DOWNTIME_SECONDS: [u64; 8] = [900, 1800, 3600, 7200, 14400, 28800, 86400, 0];

pub struct DowntimeManager {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl DowntimeManager {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Suspend a target. Returns the resume time, `None` for an indefinite
    /// suspension.
    pub async fn schedule_downtime(
        &self,
        id: TargetId,
        duration_seconds: u64,
    ) -> crate::Result<Option<DateTime<Utc>>> {
        if !ALLOWED_DOWNTIME_SECONDS.contains(&duration_seconds) {
            return Err(HealthdeckError::InvalidDowntime(duration_seconds));
        }
        if self.store.target(id).await?.is_none() {
            return Err(HealthdeckError::NotFound(id));
        }

        let until = match duration_seconds {
            0 => None,
            secs => Some(self.clock.now() + Duration::seconds(secs as i64)),
        };
        self.store.set_suspension(id, false, until).await?;

        match until {
            Some(until) => tracing::info!("Target {} suspended until {}", id, until),
            None => tracing::info!("Target {} suspended indefinitely", id),
        }
        Ok(until)
    }

    /// Reactivate a target immediately
    pub async fn resume(&self, id: TargetId) -> crate::Result<()> {
        if self.store.target(id).await?.is_none() {
            return Err(HealthdeckError::NotFound(id));
        }
        self.store.set_suspension(id, true, None).await?;
        tracing::info!("Target {} resumed", id);
        Ok(())
    }

    /// Reactivate every timed suspension that has run out
    pub async fn resume_expired(&self) -> crate::Result<Vec<TargetId>> {
        let resumed = self
            .store
            .resume_expired_suspensions(self.clock.now())
            .await?;
        for id in &resumed {
            tracing::info!("Downtime for target {} expired, resuming probes", id);
        }
        Ok(resumed)
    }
}
