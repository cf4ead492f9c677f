//! Observed background work — persistence and extraction run as spawned
//! tasks whose outcomes are logged and kept for inspection.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::conversation::SessionId;
use crate::error::Error;

/// How many finished reports are retained between drains.
const MAX_RETAINED_REPORTS: usize = 512;

/// Kind of background work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    SaveLead,
    SaveTranscript,
    ExtractPreferences,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SaveLead => "save_lead",
            Self::SaveTranscript => "save_transcript",
            Self::ExtractPreferences => "extract_preferences",
        };
        write!(f, "{s}")
    }
}

/// Outcome of one background task.
#[derive(Debug)]
pub struct TaskReport {
    pub kind: TaskKind,
    pub session_id: SessionId,
    pub result: Result<(), Error>,
}

impl TaskReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Default)]
struct Inner {
    running: JoinSet<TaskReport>,
    finished: VecDeque<TaskReport>,
}

impl Inner {
    /// Move already-finished tasks into the retained report buffer.
    fn reap(&mut self) {
        while let Some(joined) = self.running.try_join_next() {
            match joined {
                Ok(report) => self.retain(report),
                Err(e) => warn!(error = %e, "Background task panicked or was cancelled"),
            }
        }
    }

    fn retain(&mut self, report: TaskReport) {
        if self.finished.len() == MAX_RETAINED_REPORTS {
            self.finished.pop_front();
        }
        self.finished.push_back(report);
    }
}

/// Fire-and-forget task set. Failures stay inside each task's report and
/// never reach the caller that spawned it.
#[derive(Default)]
pub struct BackgroundTasks {
    inner: Mutex<Inner>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `work` on the runtime. Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, kind: TaskKind, session_id: SessionId, work: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.reap();
        inner.running.spawn(async move {
            let result = work.await;
            match &result {
                Ok(()) => debug!(task = %kind, session_id = %session_id, "Background task finished"),
                Err(e) => warn!(task = %kind, session_id = %session_id, error = %e, "Background task failed"),
            }
            TaskReport {
                kind,
                session_id,
                result,
            }
        });
    }

    /// Number of tasks not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .running
            .len()
    }

    /// Wait for every spawned task (including ones spawned while waiting) and
    /// return all reports collected since the last drain, in completion order.
    pub async fn drain(&self) -> Vec<TaskReport> {
        let mut reports = Vec::new();
        loop {
            let (mut running, finished) = {
                let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
                (
                    std::mem::take(&mut inner.running),
                    std::mem::take(&mut inner.finished),
                )
            };
            reports.extend(finished);
            if running.is_empty() {
                return reports;
            }
            while let Some(joined) = running.join_next().await {
                match joined {
                    Ok(report) => reports.push(report),
                    Err(e) => warn!(error = %e, "Background task panicked or was cancelled"),
                }
            }
        }
    }
}
