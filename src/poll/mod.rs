//! # Poll Cycle
//!
//! The orchestrator that drives the pipeline once per tick:
//!
//! 1. fetch a batch from the [`SampleFeed`]
//! 2. replace the cycle's [`SampleStore`]
//! 3. aggregate every chart family
//! 4. rank the process table
//! 5. evaluate alert rules against the freshly merged series
//! 6. publish a [`CycleOutput`] and hand fire events to the configured sinks
//!
//! Cycles never overlap. When a cycle runs past the interval the next tick is deferred
//! rather than queued. Cancellation can interrupt a pending fetch, but once a batch has
//! arrived the cycle runs to completion, so the alert state is never left half updated.
//!
//! A failed fetch does not blank the display: the last good output is republished with
//! `stale` set.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use systempulse::config::Config;
//! use systempulse::feed::FileFeed;
//! use systempulse::poll::PollCycle;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> systempulse::Result<()> {
//!     let cycle = PollCycle::new(Config::new(8), FileFeed::new("metrics.json"))?;
//!     let mut handle = cycle.spawn(CancellationToken::new());
//!
//!     let output = handle.next_update().await?;
//!     println!("{} processes, {} alerts", output.processes.len(), output.alerts.len());
//!
//!     handle.stop().await
//! }
//! ```


use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::aggregate::{SeriesSet, TimeSeriesAggregator};
use crate::alert::{AlertEngine, AlertEvent, AlertSink, AlertState};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::feed::{FeedBatch, SampleFeed};
use crate::process::{ProcessRanker, ProcessSample};
use crate::store::SampleStore;
use crate::system::SystemUptime;

/// Buffered outputs between the poll task and its consumer
const UPDATE_BUFFER: usize = 10;

/// Extra time `next_update` waits beyond one poll interval
const UPDATE_GRACE: Duration = Duration::from_secs(10);

/// Time `stop` waits for the poll task to finish its current cycle
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything one cycle produced for the rendering and alerting side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleOutput {
    /// Merged records per chart family
    pub series: SeriesSet,
    /// Top processes by normalized CPU
    pub processes: Vec<ProcessSample>,
    /// Fire events of this cycle; empty on a quiet system
    pub alerts: Vec<AlertEvent>,
    /// Host uptime, when the batch carried it
    pub uptime: Option<SystemUptime>,
    /// Malformed records discarded from the batch
    pub dropped: usize,
    /// When the batch behind this output was fetched
    pub fetched_at: DateTime<Utc>,
    /// Set when this is a republished earlier output after a failed fetch
    pub stale: bool,
}

/// One ingest, aggregate, rank and alert pipeline
pub struct PollCycle {
    config: Config,
    feed: Box<dyn SampleFeed>,
    aggregator: TimeSeriesAggregator,
    ranker: ProcessRanker,
    engine: Arc<RwLock<AlertEngine>>,
    sinks: Vec<Box<dyn AlertSink>>,
    store: Option<SampleStore>,
    last_good: Option<CycleOutput>,
    observed: BTreeSet<(String, String)>,
}

impl PollCycle {
    /// Builds a pipeline from a configuration and a feed
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] when the configuration does not validate.
    /// Rules that watch a field the aggregator never emits are only logged.
    pub fn new(config: Config, feed: impl SampleFeed + 'static) -> Result<Self> {
        config.validate()?;

        for unknown in config.unknown_fields() {
            warn!(error = %unknown, "alert rule references an unknown field");
        }

        let aggregator = TimeSeriesAggregator::with_label(config.bucket_label);
        let ranker = ProcessRanker::new(config.cores(), config.limit())?;
        let engine = AlertEngine::new(config.alert_rules())?;

        Ok(Self {
            config,
            feed: Box::new(feed),
            aggregator,
            ranker,
            engine: Arc::new(RwLock::new(engine)),
            sinks: Vec::new(),
            store: None,
            last_good: None,
            observed: BTreeSet::new(),
        })
    }

    /// Adds a destination for fire events
    pub fn with_sink(mut self, sink: impl AlertSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The batch of the last successful cycle
    pub fn store(&self) -> Option<&SampleStore> {
        self.store.as_ref()
    }

    /// Shared handle to the alert engine, for observability readers
    pub fn engine(&self) -> Arc<RwLock<AlertEngine>> {
        Arc::clone(&self.engine)
    }

    /// Current state of every alert rule
    ///
    /// Takes the read lock, so it never observes an evaluation in progress.
    pub fn alert_snapshot(&self) -> HashMap<String, AlertState> {
        self.engine.read().snapshot()
    }

    /// Rules whose selector has not appeared in any batch so far
    pub fn unobserved_rules(&self) -> Vec<Error> {
        let observed = &self.observed;
        self.engine.read().validate_fields(|measurement, field| {
            observed.contains(&(measurement.to_string(), field.to_string()))
        })
    }

    /// Runs a single cycle
    ///
    /// # Arguments
    ///
    /// * `now` - Instant the alert cooldowns are measured against
    ///
    /// # Returns
    ///
    /// * `Ok(Some(output))` - Fresh output, or the previous output marked stale when the
    ///   fetch failed recoverably
    /// * `Ok(None)` - The fetch failed before any cycle had succeeded
    /// * `Err` - The feed reported an unrecoverable error
    #[instrument(skip(self))]
    pub async fn run_once(&mut self, now: DateTime<Utc>) -> Result<Option<CycleOutput>> {
        let fetched = self.feed.fetch().await;
        self.complete(fetched, now).await
    }

    /// Everything after the fetch; runs to the end once started
    async fn complete(&mut self, fetched: Result<FeedBatch>, now: DateTime<Utc>) -> Result<Option<CycleOutput>> {
        let batch = match fetched {
            Ok(batch) => batch,
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "fetch failed, keeping last good output");
                return Ok(self.last_good.as_ref().map(|output| CycleOutput { stale: true, ..output.clone() }));
            },
            Err(e) => return Err(e),
        };

        let store = SampleStore::from_batch(batch, now);
        if store.dropped() > 0 {
            debug!(dropped = store.dropped(), "discarded malformed records");
        }

        let series = self.aggregator.aggregate_all(store.points());
        let processes = self.ranker.rank(store.points());
        let uptime = SystemUptime::from_store(&store);
        self.record_observed(&store, &series);

        let alerts = {
            let mut engine = self.engine.write();
            let latest = engine.latest_values(&series);
            engine.evaluate(&latest, now)
        };

        for event in &alerts {
            for sink in &self.sinks {
                if let Err(e) = sink.deliver(event).await {
                    warn!(rule = %event.rule_id, error = %e, "alert delivery failed");
                }
            }
        }

        let output = CycleOutput {
            series,
            processes,
            alerts,
            uptime,
            dropped: store.dropped(),
            fetched_at: store.fetched_at(),
            stale: false,
        };
        debug!(points = store.len(), processes = output.processes.len(), alerts = output.alerts.len(), "cycle complete");

        self.store = Some(store);
        self.last_good = Some(output.clone());
        Ok(Some(output))
    }

    fn record_observed(&mut self, store: &SampleStore, series: &SeriesSet) {
        self.observed.extend(store.observed_fields());
        for family in series.families() {
            for record in series.get(family) {
                self.observed.extend(record.fields.keys().map(|field| (family.to_string(), field.clone())));
            }
        }
    }

    /// Moves the pipeline onto a background task that runs one cycle per poll interval
    ///
    /// The task stops when `cancel` (or the returned handle) is cancelled, when the
    /// handle is dropped, or when the feed reports an unrecoverable error.
    pub fn spawn(mut self, cancel: CancellationToken) -> PollHandle {
        let period = self.config.poll_interval();
        let token = cancel.child_token();
        let task_token = token.clone();
        let engine = self.engine();
        let (update_tx, update_rx) = mpsc::channel(UPDATE_BUFFER);

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_ms = period.as_millis() as u64, "poll loop started");

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {},
                }

                // The fetch is the only step that may be abandoned on cancellation.
                let fetched = tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    fetched = self.feed.fetch() => fetched,
                };

                let output = match self.complete(fetched, Utc::now()).await {
                    Ok(Some(output)) => output,
                    Ok(None) => continue,
                    Err(e) => {
                        error!(error = %e, "poll loop aborted");
                        break;
                    },
                };

                tokio::select! {
                    sent = update_tx.send(output) => {
                        if sent.is_err() {
                            debug!("update receiver dropped");
                            break;
                        }
                    },
                    _ = task_token.cancelled() => break,
                }
            }

            info!("poll loop stopped");
        });

        PollHandle { period, cancel: token, engine, task: Some(task), update_rx }
    }
}

/// Handle to a spawned poll loop
///
/// Dropping the handle cancels the loop; a cycle past its fetch still completes.
pub struct PollHandle {
    period: Duration,
    cancel: CancellationToken,
    engine: Arc<RwLock<AlertEngine>>,
    task: Option<JoinHandle<()>>,
    update_rx: mpsc::Receiver<CycleOutput>,
}

impl PollHandle {
    /// Waits for the next published output
    ///
    /// # Returns
    ///
    /// * `Ok(CycleOutput)` - The next output, fresh or stale
    /// * `Err` - No output within one interval plus a grace period, or the loop has stopped
    pub async fn next_update(&mut self) -> Result<CycleOutput> {
        tokio::time::timeout(self.period + UPDATE_GRACE, self.update_rx.recv())
            .await
            .map_err(|_| Error::poll_task("no update received within timeout"))?
            .ok_or_else(|| Error::poll_task("poll loop has stopped"))
    }

    /// Current state of every alert rule
    pub fn alert_snapshot(&self) -> HashMap<String, AlertState> {
        self.engine.read().snapshot()
    }

    /// Token that cancels this loop
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Turns the handle into a stream of outputs that ends when the loop stops
    pub fn into_stream(self) -> impl Stream<Item = CycleOutput> {
        stream::unfold(self, |mut handle| async move {
            let output = handle.update_rx.recv().await?;
            Some((output, handle))
        })
    }

    /// Cancels the loop and waits for the in-flight cycle to finish
    ///
    /// A pending fetch is abandoned. If the task still has not finished after a few
    /// seconds it is aborted and an error is returned.
    pub async fn stop(&mut self) -> Result<()> {
        self.cancel.cancel();

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(STOP_TIMEOUT, &mut task).await {
                Ok(result) => result.map_err(|e| Error::poll_task(format!("poll task panicked: {e}")))?,
                Err(_) => {
                    task.abort();
                    return Err(Error::poll_task("timed out waiting for poll task to stop"));
                },
            }
        }

        Ok(())
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
