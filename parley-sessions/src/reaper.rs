//! Periodic eviction of idle sessions

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::registry::SessionRegistry;

/// Background task that purges sessions idle for longer than a TTL.
///
/// Nothing is evicted unless a reaper is started; the registry on its own
/// keeps sessions until they are deleted.
pub struct SessionReaper {
    registry: Arc<SessionRegistry>,
    ttl: Duration,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionReaper {
    pub fn new(registry: Arc<SessionRegistry>, ttl: Duration, interval: Duration) -> Self {
        Self {
            registry,
            ttl,
            interval,
            task: Mutex::new(None),
        }
    }

    /// Start sweeping on the current tokio runtime
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            debug!("Session reaper already running");
            return;
        }

        let registry = Arc::clone(&self.registry);
        let ttl = self.ttl;
        let period = self.interval.max(Duration::from_millis(1));
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                registry.purge_idle(ttl);
            }
        }));

        info!(
            "Session reaper started (ttl {}s, every {}s)",
            ttl.as_secs(),
            period.as_secs()
        );
    }

    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            info!("Session reaper stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Run one sweep now
    pub fn sweep(&self) -> usize {
        self.registry.purge_idle(self.ttl)
    }
}

impl Drop for SessionReaper {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client, ScriptedProvider};

    #[tokio::test]
    async fn test_start_stop() {
        let registry = Arc::new(SessionRegistry::new());
        let reaper = SessionReaper::new(
            registry,
            Duration::from_secs(3600),
            Duration::from_secs(3600),
        );

        assert!(!reaper.is_running());
        reaper.start();
        assert!(reaper.is_running());
        reaper.start();
        reaper.stop();
        assert!(!reaper.is_running());
    }

    #[tokio::test]
    async fn test_reaper_evicts_idle_sessions() {
        let registry = Arc::new(SessionRegistry::new());
        let client = client(Arc::new(ScriptedProvider::new()));
        registry.create(&client).unwrap();
        registry.create(&client).unwrap();

        let reaper = SessionReaper::new(
            Arc::clone(&registry),
            Duration::from_millis(10),
            Duration::from_millis(10),
        );
        reaper.start();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(registry.is_empty());
        reaper.stop();
    }

    #[tokio::test]
    async fn test_sweep_now() {
        let registry = Arc::new(SessionRegistry::new());
        let client = client(Arc::new(ScriptedProvider::new()));
        registry.create(&client).unwrap();

        let reaper = SessionReaper::new(
            Arc::clone(&registry),
            Duration::from_millis(500),
            Duration::from_secs(3600),
        );
        assert_eq!(reaper.sweep(), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(reaper.sweep(), 1);
        assert!(registry.is_empty());
    }
}
