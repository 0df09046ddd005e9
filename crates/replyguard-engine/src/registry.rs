use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use replyguard_core::SourceReader;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::monitor::{
    monitor_key, run_monitor, GenerationTable, MonitorContext, MonitorSpec, MonitorStatus,
};
use crate::policy::MonitorSettings;
use crate::workflow::Workflow;

struct MonitorHandle {
    generation: u64,
    token: CancellationToken,
    task: JoinHandle<()>,
    status: Arc<Mutex<MonitorStatus>>,
}

impl MonitorHandle {
    fn snapshot(&self) -> MonitorStatus {
        let mut status = self
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        status.running = status.running && !self.task.is_finished();
        status
    }
}

/// Owns the running monitor loops, at most one per tracked term.
pub struct MonitorRegistry {
    workflow: Arc<Workflow>,
    source: Arc<dyn SourceReader>,
    settings: MonitorSettings,
    next_generation: AtomicU64,
    generations: Arc<GenerationTable>,
    monitors: tokio::sync::Mutex<HashMap<String, MonitorHandle>>,
}

impl MonitorRegistry {
    #[must_use]
    pub fn new(
        workflow: Arc<Workflow>,
        source: Arc<dyn SourceReader>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            workflow,
            source,
            settings,
            next_generation: AtomicU64::new(0),
            generations: Arc::new(GenerationTable::default()),
            monitors: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn workflow(&self) -> &Arc<Workflow> {
        &self.workflow
    }

    /// Start monitoring `spec.term`, replacing any loop already running for
    /// it. Returns the new generation id.
    ///
    /// The replaced loop is superseded and cancelled before the new one is
    /// spawned, and joined after the registry lock is released.
    pub async fn start(&self, spec: MonitorSpec) -> u64 {
        let key = spec.key();
        let term = spec.term.clone();
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let previous = {
            let mut monitors = self.monitors.lock().await;
            // Supersede first so the old loop stops at its next check even if
            // its join times out.
            self.generations.set(&key, generation);
            let previous = monitors.remove(&key);
            if let Some(previous) = &previous {
                tracing::info!(
                    term = %term,
                    previous_generation = previous.generation,
                    generation,
                    "replacing running monitor"
                );
                previous.token.cancel();
            }

            let token = CancellationToken::new();
            let status = Arc::new(Mutex::new(MonitorStatus::new(&spec, generation)));
            let ctx = MonitorContext {
                key: key.clone(),
                generation,
                workflow: Arc::clone(&self.workflow),
                source: Arc::clone(&self.source),
                settings: self.settings.clone(),
                token: token.clone(),
                generations: Arc::clone(&self.generations),
                status: Arc::clone(&status),
                spec,
            };
            let task = tokio::spawn(run_monitor(ctx));

            monitors.insert(
                key,
                MonitorHandle {
                    generation,
                    token,
                    task,
                    status,
                },
            );
            previous
        };

        if let Some(previous) = previous {
            self.shutdown(&term, previous).await;
        }
        generation
    }

    /// Stop the loop for `term`. Returns whether one was registered.
    pub async fn stop(&self, term: &str) -> bool {
        let key = monitor_key(term);
        let Some(handle) = self.monitors.lock().await.remove(&key) else {
            return false;
        };
        self.generations.clear_if(&key, handle.generation);
        self.shutdown(term, handle).await;
        true
    }

    pub async fn stop_all(&self) {
        let handles: Vec<(String, MonitorHandle)> = self.monitors.lock().await.drain().collect();
        for (key, handle) in &handles {
            self.generations.clear_if(key, handle.generation);
            handle.token.cancel();
        }
        for (key, handle) in handles {
            self.shutdown(&key, handle).await;
        }
    }

    pub async fn status(&self, term: &str) -> Option<MonitorStatus> {
        let monitors = self.monitors.lock().await;
        monitors.get(&monitor_key(term)).map(MonitorHandle::snapshot)
    }

    /// All registered monitors, sorted by term.
    pub async fn list(&self) -> Vec<MonitorStatus> {
        let monitors = self.monitors.lock().await;
        let mut statuses: Vec<MonitorStatus> =
            monitors.values().map(MonitorHandle::snapshot).collect();
        statuses.sort_by(|a, b| a.term.to_lowercase().cmp(&b.term.to_lowercase()));
        statuses
    }

    async fn shutdown(&self, term: &str, mut handle: MonitorHandle) {
        handle.token.cancel();
        match tokio::time::timeout(self.settings.stop_timeout, &mut handle.task).await {
            Ok(Ok(())) => {
                tracing::info!(term, generation = handle.generation, "monitor joined");
            }
            Ok(Err(e)) => {
                tracing::error!(term, generation = handle.generation, error = %e, "monitor task failed");
            }
            Err(_) => {
                // Left detached; it exits at its next generation check.
                tracing::warn!(
                    term,
                    generation = handle.generation,
                    timeout_secs = self.settings.stop_timeout.as_secs(),
                    "monitor did not stop within timeout"
                );
            }
        }
    }
}
