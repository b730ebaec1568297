//! In-memory alert throttle for the data-check path

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::outcome::AlertKind;
use crate::target::TargetId;

/// Remembers when each `(target, alert)` pair last fired and refuses repeats
/// inside the window
#[derive(Debug)]
pub struct NotificationThrottle {
    clock: Arc<dyn Clock>,
    window: Duration,
    last_sent: Mutex<HashMap<(TargetId, AlertKind), DateTime<Utc>>>,
}

impl NotificationThrottle {
    pub fn new(clock: Arc<dyn Clock>, window: Duration) -> Self {
        Self {
            clock,
            window,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether an alert may fire now
    pub fn allows(&self, id: TargetId, alert: AlertKind) -> bool {
        let now = self.clock.now();
        let last_sent = self.last_sent.lock().unwrap_or_else(|e| e.into_inner());
        match last_sent.get(&(id, alert)) {
            Some(sent_at) => now - *sent_at >= self.window,
            None => true,
        }
    }

    /// Stamp the pair as fired now
    pub fn record(&self, id: TargetId, alert: AlertKind) {
        let now = self.clock.now();
        self.last_sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((id, alert), now);
    }
}
