// src/services/progress.rs
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

pub const DEFAULT_STAGES: [&str; 7] = [
    "Uploading Image",
    "Analyzing Content",
    "Extracting Metadata",
    "Face Recognition",
    "Reverse Image Search",
    "Geolocation Analysis",
    "Generating Report",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Idle,
    Running,
    Complete,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    pub stage_index: usize,
    pub stages: Arc<[String]>,
    pub status: ProgressStatus,
}

impl ProgressState {
    fn idle(stages: Arc<[String]>) -> Self {
        Self {
            stage_index: 0,
            stages,
            status: ProgressStatus::Idle,
        }
    }

    pub fn current_stage(&self) -> Option<&str> {
        self.stages.get(self.stage_index).map(String::as_str)
    }

    pub fn last_index(&self) -> usize {
        self.stages.len().saturating_sub(1)
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.status, ProgressStatus::Complete | ProgressStatus::Failed)
    }

    pub fn percent(&self) -> f64 {
        if self.status == ProgressStatus::Complete {
            return 100.0;
        }
        match self.last_index() {
            0 => 0.0,
            last => self.stage_index as f64 / last as f64 * 100.0,
        }
    }

    /// `Step 3 of 7: Extracting Metadata`
    pub fn caption(&self) -> String {
        format!(
            "Step {} of {}: {}",
            self.stage_index + 1,
            self.stages.len(),
            self.current_stage().unwrap_or("")
        )
    }
}

/// Timer-driven stage animation shown while a submission is in flight.
///
/// Stages advance on a fixed interval whether or not the real work is done,
/// then hold on the last stage. The submission result decides the end state.
#[derive(Debug)]
pub struct ProgressTracker {
    stages: Arc<[String]>,
    interval: Duration,
    tx: watch::Sender<ProgressState>,
}

impl ProgressTracker {
    pub fn new<I, S>(stages: I, interval: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stages: Arc<[String]> = stages.into_iter().map(Into::into).collect();
        let (tx, _) = watch::channel(ProgressState::idle(stages.clone()));
        Self {
            stages,
            interval,
            tx,
        }
    }

    pub fn with_default_stages(interval: Duration) -> Self {
        Self::new(DEFAULT_STAGES, interval)
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> ProgressState {
        self.tx.borrow().clone()
    }

    /// Begins a run at stage 0. Every submission gets a fresh run.
    pub fn start(&self) -> ProgressRun<'_> {
        let started = Instant::now();
        self.tx.send_replace(ProgressState {
            stage_index: 0,
            stages: self.stages.clone(),
            status: ProgressStatus::Running,
        });
        debug!("Progress: {}", self.state().caption());
        ProgressRun {
            tracker: self,
            started,
            next_index: 1,
            settled: false,
        }
    }

    /// Drives a run alongside `work` and settles it from `work`'s result.
    ///
    /// Both are polled from this task; `work` is polled first, so a result that
    /// is ready never loses to a pending tick.
    pub async fn track<F, T, E>(&self, work: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let mut run = self.start();
        tokio::pin!(work);

        let outcome = loop {
            tokio::select! {
                biased;
                outcome = &mut work => break outcome,
                _ = run.tick() => {}
            }
        };

        if outcome.is_ok() {
            run.complete();
        } else {
            run.fail();
        }
        outcome
    }
}

/// One in-flight animation. Dropping it unsettled puts the tracker back to idle.
#[derive(Debug)]
pub struct ProgressRun<'a> {
    tracker: &'a ProgressTracker,
    started: Instant,
    next_index: usize,
    settled: bool,
}

impl ProgressRun<'_> {
    /// Waits for the next scheduled stage and publishes it. Never resolves once
    /// the last stage is reached.
    pub async fn tick(&mut self) {
        if self.next_index >= self.tracker.stages.len() {
            std::future::pending::<()>().await;
        }

        let deadline = self.started + self.tracker.interval * self.next_index as u32;
        sleep_until(deadline).await;

        let index = self.next_index;
        self.tracker.tx.send_modify(|state| {
            if state.status == ProgressStatus::Running && index > state.stage_index {
                state.stage_index = index;
            }
        });
        self.next_index += 1;
        debug!("Progress: {}", self.tracker.state().caption());
    }

    /// Snap to the finished presentation.
    pub fn complete(mut self) -> ProgressState {
        self.settle(ProgressStatus::Complete)
    }

    pub fn fail(mut self) -> ProgressState {
        self.settle(ProgressStatus::Failed)
    }

    fn settle(&mut self, status: ProgressStatus) -> ProgressState {
        self.settled = true;
        self.tracker.tx.send_modify(|state| {
            state.status = status;
            if status == ProgressStatus::Complete {
                state.stage_index = state.last_index();
            }
        });
        self.tracker.state()
    }
}

impl Drop for ProgressRun<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let stages = self.tracker.stages.clone();
            self.tracker.tx.send_replace(ProgressState::idle(stages));
        }
    }
}
