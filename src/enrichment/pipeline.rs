//! Background tempo enrichment.
//!
//! Works through a queue of tracks one at a time, skipping anything the
//! feature cache already knows (including "not found" tombstones), and
//! writes one [`FeatureRecord`] per resolved lookup.
//!
//! # States
//!
//! ```text
//! Idle ──start──▶ Running ──pause──▶ Paused
//!   ▲               │  ▲               │
//!   └──queue empty──┘  └────resume─────┘
//!                   │
//!      cancel / fatal error
//!                   ▼
//!                Stopped ──resume (queue retained)──▶ Running
//! ```
//!
//! Pause and cancel take effect between lookups, never mid-request. The
//! pending queue survives both, so a stopped run can be resumed.
//!
//! # Usage
//!
//! ```ignore
//! let pipeline = EnrichmentPipeline::new(Arc::new(client), cache, PipelineConfig::default());
//! pipeline.start(missing);
//! let status = pipeline.status(); // never blocks the worker
//! pipeline.wait().await;
//! ```

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

use super::domain::{LookupError, LookupQuery};
use super::matching::find_best_match;
use super::traits::FeatureLookup;
use crate::cache::FeatureCache;
use crate::config::EnrichmentConfig;
use crate::model::{FeatureRecord, TrackEntry};

/// Pacing for the lookup loop.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pause between consecutive lookups (default: 200ms)
    pub request_delay: Duration,
    /// Pause after a 429 before retrying the same track (default: 5s)
    pub rate_limit_backoff: Duration,
    /// 429 retries per track before it counts as a failure (default: 5)
    pub max_rate_limit_retries: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&EnrichmentConfig::default())
    }
}

impl From<&EnrichmentConfig> for PipelineConfig {
    fn from(config: &EnrichmentConfig) -> Self {
        Self {
            request_delay: config.request_delay(),
            rate_limit_backoff: config.rate_limit_backoff(),
            max_rate_limit_retries: config.max_rate_limit_retries,
        }
    }
}

/// Lifecycle state of the pipeline (not of any single track).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PipelineState {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
}

/// A condition that halted the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalCondition {
    /// The lookup service rejected the credential
    InvalidCredential(String),
    /// The feature cache could not be read or written
    Storage(String),
}

impl std::fmt::Display for FatalCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredential(msg) => write!(f, "invalid lookup credential: {msg}"),
            Self::Storage(msg) => write!(f, "feature cache unavailable: {msg}"),
        }
    }
}

/// Point-in-time view of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentStatus {
    pub state: PipelineState,
    /// Tracks finished in this run (hits, misses, failures and skips)
    pub current: usize,
    /// Tracks queued when the run started
    pub total: usize,
    /// Name of the track being looked up
    pub current_track: Option<String>,
    /// Tracks still queued
    pub pending: usize,
    pub hits: usize,
    pub misses: usize,
    pub failures: usize,
    pub skipped: usize,
    pub fatal: Option<FatalCondition>,
}

/// Progress notifications, sent without ever blocking the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentEvent {
    /// A lookup produced a record (a hit or a tombstone)
    TrackResolved { id: String, record: FeatureRecord },
    /// One more track finished
    Progress { current: usize, total: usize },
    /// The queue ran dry
    Finished { hits: usize, misses: usize, failures: usize },
    /// A fatal condition stopped the run
    Halted(FatalCondition),
}

struct Control {
    state: PipelineState,
    pending: VecDeque<TrackEntry>,
    /// True while a worker task is running its loop
    worker_alive: bool,
    /// Bumped by every `start`; outcomes tagged with an older run are dropped
    run: u64,
    handle: Option<JoinHandle<()>>,
}

struct Shared {
    lookup: Arc<dyn FeatureLookup>,
    cache: FeatureCache,
    config: PipelineConfig,
    control: Mutex<Control>,
    status: RwLock<EnrichmentStatus>,
    wake: Notify,
    events: Mutex<Option<mpsc::Sender<EnrichmentEvent>>>,
}

/// How one track ended.
enum Outcome {
    Hit(FeatureRecord),
    Miss(FeatureRecord),
    Skipped,
    Failed,
    /// Put back on the queue because the run was paused or cancelled
    Requeued,
}

/// Handle to the enrichment worker. Cheap to clone; all clones share one run.
#[derive(Clone)]
pub struct EnrichmentPipeline {
    shared: Arc<Shared>,
}

impl EnrichmentPipeline {
    pub fn new(lookup: Arc<dyn FeatureLookup>, cache: FeatureCache, config: PipelineConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                lookup,
                cache,
                config,
                control: Mutex::new(Control {
                    state: PipelineState::Idle,
                    pending: VecDeque::new(),
                    worker_alive: false,
                    run: 0,
                    handle: None,
                }),
                status: RwLock::new(EnrichmentStatus::default()),
                wake: Notify::new(),
                events: Mutex::new(None),
            }),
        }
    }

    /// Set the event sender for receiving updates.
    pub fn set_event_sender(&self, tx: mpsc::Sender<EnrichmentEvent>) {
        *self.shared.events.lock() = Some(tx);
    }

    /// Queue `tracks` and start working through them.
    ///
    /// Duplicate ids are queued once. Returns `false` (and changes nothing)
    /// if a run is already Running or Paused. Must be called from within a
    /// tokio runtime.
    pub fn start(&self, tracks: Vec<TrackEntry>) -> bool {
        let mut control = self.shared.control.lock();
        if matches!(control.state, PipelineState::Running | PipelineState::Paused) {
            tracing::debug!("Start ignored, a run is already active");
            return false;
        }

        let mut seen = HashSet::new();
        control.pending = tracks.into_iter().filter(|t| seen.insert(t.id.clone())).collect();
        control.state = PipelineState::Running;
        control.run += 1;

        *self.shared.status.write() = EnrichmentStatus {
            total: control.pending.len(),
            ..Default::default()
        };

        tracing::info!("Starting enrichment of {} tracks", control.pending.len());
        self.ensure_worker(&mut control);
        true
    }

    /// Suspend after the in-flight lookup completes.
    pub fn pause(&self) -> bool {
        let mut control = self.shared.control.lock();
        if control.state != PipelineState::Running {
            return false;
        }
        control.state = PipelineState::Paused;
        tracing::debug!("Paused with {} pending", control.pending.len());
        true
    }

    /// Continue a paused run, or restart a stopped/idle one whose queue is non-empty.
    pub fn resume(&self) -> bool {
        let mut control = self.shared.control.lock();
        match control.state {
            PipelineState::Running => false,
            PipelineState::Paused => {
                control.state = PipelineState::Running;
                self.shared.wake.notify_one();
                tracing::debug!("Resumed");
                true
            }
            PipelineState::Idle | PipelineState::Stopped => {
                if control.pending.is_empty() {
                    return false;
                }
                control.state = PipelineState::Running;
                self.shared.status.write().fatal = None;
                tracing::info!("Restarting with {} pending", control.pending.len());
                self.ensure_worker(&mut control);
                true
            }
        }
    }

    /// Stop at the next checkpoint. The pending queue is kept for [`resume`](Self::resume).
    pub fn cancel(&self) {
        let mut control = self.shared.control.lock();
        control.state = PipelineState::Stopped;
        self.shared.wake.notify_one();
        tracing::info!("Cancelled with {} pending", control.pending.len());
    }

    /// Current status. Never waits on the worker.
    pub fn status(&self) -> EnrichmentStatus {
        let (state, pending) = {
            let control = self.shared.control.lock();
            (control.state, control.pending.len())
        };
        let mut status = self.shared.status.read().clone();
        status.state = state;
        status.pending = pending;
        status
    }

    /// Wait for the worker task to exit and return the final status.
    ///
    /// A paused run keeps its worker alive, so this only returns once the
    /// run is resumed to completion, cancelled or halted.
    pub async fn wait(&self) -> EnrichmentStatus {
        loop {
            let handle = self.shared.control.lock().handle.take();
            let Some(handle) = handle else { break };
            if let Err(e) = handle.await {
                tracing::error!("Enrichment worker failed: {}", e);
            }
        }
        self.status()
    }

    fn ensure_worker(&self, control: &mut Control) {
        if control.worker_alive {
            // The live worker picks the new state up at its next checkpoint
            self.shared.wake.notify_one();
            return;
        }
        control.worker_alive = true;
        let shared = Arc::clone(&self.shared);
        control.handle = Some(tokio::spawn(async move { shared.run().await }));
    }
}

impl Shared {
    async fn run(&self) {
        tracing::debug!("Worker started");

        while let Some((track, run)) = self.next_track().await {
            let looked_up = match self.process(&track, run).await {
                Ok(Outcome::Requeued) => continue,
                Ok(outcome) => {
                    let looked_up = !matches!(outcome, Outcome::Skipped);
                    self.record(outcome, &track, run);
                    looked_up
                }
                Err(fatal) => {
                    if self.halt(track, fatal, run) {
                        return;
                    }
                    true
                }
            };

            if looked_up && self.has_pending() {
                self.nap(self.config.request_delay).await;
            }
        }

        tracing::debug!("Worker exited");
    }

    /// Next queued track, waiting out pauses. `None` once stopped or drained;
    /// the worker is marked dead in the same critical section.
    async fn next_track(&self) -> Option<(TrackEntry, u64)> {
        loop {
            let notified = self.wake.notified();
            {
                let mut control = self.control.lock();
                match control.state {
                    PipelineState::Running => {
                        if let Some(track) = control.pending.pop_front() {
                            return Some((track, control.run));
                        }
                        control.state = PipelineState::Idle;
                        control.worker_alive = false;
                        drop(control);
                        self.finish();
                        return None;
                    }
                    PipelineState::Paused => {}
                    PipelineState::Idle | PipelineState::Stopped => {
                        control.worker_alive = false;
                        return None;
                    }
                }
            }
            notified.await;
        }
    }

    async fn process(&self, track: &TrackEntry, run: u64) -> Result<Outcome, FatalCondition> {
        self.status.write().current_track = Some(track.name.clone());

        match self.cache.get(&track.id).await {
            Ok(Some(_)) => return Ok(Outcome::Skipped),
            Ok(None) => {}
            Err(e) => return Err(FatalCondition::Storage(e.to_string())),
        }

        let query = LookupQuery::for_track(track);
        let mut limited = 0;
        let result = loop {
            match self.lookup.search(&query).await {
                Err(LookupError::RateLimited) if limited < self.config.max_rate_limit_retries => {
                    limited += 1;
                    tracing::warn!(
                        "Rate limited on '{}', retrying in {:?}",
                        track.name,
                        self.config.rate_limit_backoff
                    );
                    self.nap(self.config.rate_limit_backoff).await;
                    if !self.is_running() {
                        let mut control = self.control.lock();
                        if control.run == run {
                            control.pending.push_front(track.clone());
                        }
                        return Ok(Outcome::Requeued);
                    }
                }
                other => break other,
            }
        };

        let candidates = match result {
            Ok(candidates) => candidates,
            Err(e) if e.is_fatal() => return Err(FatalCondition::InvalidCredential(e.to_string())),
            Err(e) => {
                // No tombstone: the track stays eligible for the next pass
                tracing::warn!("Lookup failed for '{}': {}", track.name, e);
                return Ok(Outcome::Failed);
            }
        };

        let now = Utc::now();
        let (record, hit) = match find_best_match(&candidates, &track.name, track.primary_artist()) {
            Some(candidate) => (candidate.to_feature_record(&track.id, now), true),
            None => (FeatureRecord::not_found(&track.id, now), false),
        };

        self.cache
            .put(&record)
            .await
            .map_err(|e| FatalCondition::Storage(e.to_string()))?;

        tracing::trace!(
            "'{}' by '{}': {}",
            track.name,
            track.primary_artist(),
            record.tempo.map_or("not found".to_string(), |t| format!("{t} BPM"))
        );

        Ok(if hit { Outcome::Hit(record) } else { Outcome::Miss(record) })
    }

    fn record(&self, outcome: Outcome, track: &TrackEntry, run: u64) {
        let (current, total) = {
            let control = self.control.lock();
            if control.run != run {
                tracing::debug!("Dropping outcome for '{}' from a superseded run", track.name);
                return;
            }
            let mut status = self.status.write();
            match &outcome {
                Outcome::Hit(_) => status.hits += 1,
                Outcome::Miss(_) => status.misses += 1,
                Outcome::Failed => status.failures += 1,
                Outcome::Skipped => status.skipped += 1,
                Outcome::Requeued => return,
            }
            status.current += 1;
            status.current_track = None;
            (status.current, status.total)
        };

        if let Outcome::Hit(record) | Outcome::Miss(record) = outcome {
            self.emit(EnrichmentEvent::TrackResolved {
                id: track.id.clone(),
                record,
            });
        }
        self.emit(EnrichmentEvent::Progress { current, total });
    }

    /// Stop the run on a fatal condition. Returns `false` (and changes
    /// nothing) if the failing track belonged to a superseded run.
    fn halt(&self, track: TrackEntry, fatal: FatalCondition, run: u64) -> bool {
        {
            let mut control = self.control.lock();
            if control.run != run {
                tracing::debug!("Ignoring '{}' from a superseded run: {}", track.name, fatal);
                return false;
            }
            tracing::error!("Enrichment halted: {}", fatal);
            control.pending.push_front(track);
            control.state = PipelineState::Stopped;
            control.worker_alive = false;
        }
        {
            let mut status = self.status.write();
            status.fatal = Some(fatal.clone());
            status.current_track = None;
        }
        self.emit(EnrichmentEvent::Halted(fatal));
        true
    }

    fn finish(&self) {
        let (hits, misses, failures) = {
            let status = self.status.read();
            (status.hits, status.misses, status.failures)
        };
        tracing::info!(
            "Enrichment finished: {} found, {} not found, {} failed",
            hits,
            misses,
            failures
        );
        self.emit(EnrichmentEvent::Finished { hits, misses, failures });
    }

    fn emit(&self, event: EnrichmentEvent) {
        if let Some(tx) = self.events.lock().as_ref()
            && tx.try_send(event).is_err()
        {
            tracing::trace!("Event dropped, receiver full or gone");
        }
    }

    /// Sleep for `duration`, cut short only once the run is no longer Running.
    ///
    /// A wakeup alone (e.g. a stored permit from pause + resume) does not end
    /// the nap.
    async fn nap(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        let deadline = tokio::time::Instant::now() + duration;
        loop {
            let notified = self.wake.notified();
            if !self.is_running() {
                return;
            }
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return,
                _ = notified => {}
            }
        }
    }

    fn is_running(&self) -> bool {
        self.control.lock().state == PipelineState::Running
    }

    fn has_pending(&self) -> bool {
        !self.control.lock().pending.is_empty()
    }
}
