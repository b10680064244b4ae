//! Request throttler: paced FIFO dispatch with a bounded queue.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::sync::lock;
use crate::throttle::config::BACKPRESSURE_POLL_INTERVAL;
use crate::throttle::stats::ResponseTimes;
use crate::throttle::{ThrottleConfig, ThrottleError, ThrottleRejection, ThrottleStats};

// == Queued Work ==
type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Hands the caller its result once stats are recorded.
type Deliver = Box<dyn FnOnce() + Send>;

/// What the dispatch loop decided for a queued item.
enum Dispatch {
    Run,
    Reject(ThrottleRejection),
}

/// Type-erased queued work. `Run` yields the future to drive; `Reject`
/// settles the caller immediately.
type Work = Box<dyn FnOnce(Dispatch) -> Option<BoxFuture<(bool, Deliver)>> + Send>;

struct QueuedRequest {
    id: String,
    enqueued_at: Instant,
    work: Work,
}

// == Shared State ==
#[derive(Default)]
struct ThrottleState {
    queue: VecDeque<QueuedRequest>,
    /// A dispatch loop is running for the current generation
    processing: bool,
    pump: Option<JoinHandle<()>>,
    /// Bumped by `stop`; stale loops and backpressure waiters bail out
    generation: u64,
    last_dispatch: Option<Instant>,
    request_counter: u64,
    active_requests: usize,
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    dropped_requests: u64,
    response_times: ResponseTimes,
}

impl ThrottleState {
    fn snapshot(&self) -> ThrottleStats {
        ThrottleStats {
            current_queue_size: self.queue.len(),
            active_requests: self.active_requests,
            total_requests: self.total_requests,
            successful_requests: self.successful_requests,
            failed_requests: self.failed_requests,
            dropped_requests: self.dropped_requests,
            average_response_time: self.response_times.mean_ms(),
        }
    }
}

struct Shared {
    config: ThrottleConfig,
    interval: Duration,
    state: Mutex<ThrottleState>,
}

// == Request Throttler ==
/// Rate-limits async work to `max_requests_per_second` dispatch starts.
///
/// Items are dispatched strictly in enqueue order, each start at least
/// `1000 / max_requests_per_second` ms after the previous one. Dispatched
/// work runs concurrently with the pacing of later items, so completion
/// order is not guaranteed.
pub struct RequestThrottler {
    shared: Arc<Shared>,
}

impl RequestThrottler {
    pub fn new(config: ThrottleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let interval = config.dispatch_interval();
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                interval,
                state: Mutex::new(ThrottleState::default()),
            }),
        })
    }

    /// Queues `execute` and resolves with its result once it has run.
    ///
    /// When the queue is full the call is rejected with
    /// [`ThrottleRejection::QueueFull`], or with backpressure enabled it
    /// waits up to `request_timeout` for headroom.
    pub async fn throttle<F, Fut, T, E>(&self, execute: F) -> Result<T, ThrottleError<E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (tx, rx) = oneshot::channel::<Result<T, ThrottleError<E>>>();
        let work: Work = Box::new(move |dispatch| match dispatch {
            Dispatch::Run => {
                let fut: BoxFuture<(bool, Deliver)> = Box::pin(async move {
                    let result = execute().await;
                    let succeeded = result.is_ok();
                    let deliver: Deliver = Box::new(move || {
                        let _ = tx.send(result.map_err(ThrottleError::Operation));
                    });
                    (succeeded, deliver)
                });
                Some(fut)
            }
            Dispatch::Reject(rejection) => {
                let _ = tx.send(Err(rejection.into()));
                None
            }
        });

        let waiting = {
            let mut state = lock(&self.shared.state);
            state.total_requests += 1;

            if state.queue.len() < self.shared.config.max_queue_size {
                enqueue(&self.shared, &mut state, work);
                None
            } else if !self.shared.config.enable_backpressure {
                state.dropped_requests += 1;
                let stats = state.snapshot();
                warn!(queued = stats.current_queue_size, "Request queue full, dropping request");
                return Err(ThrottleRejection::QueueFull(stats).into());
            } else {
                Some((state.generation, work))
            }
        };

        if let Some((generation, work)) = waiting {
            self.wait_for_space(generation, work).await?;
        }

        rx.await
            .unwrap_or_else(|_| Err(ThrottleRejection::Stopped.into()))
    }

    /// Polls for queue headroom, then enqueues `work`.
    async fn wait_for_space(&self, generation: u64, work: Work) -> Result<(), ThrottleRejection> {
        let deadline = Instant::now() + self.shared.config.request_timeout;
        debug!("Request queue full, waiting for space");

        loop {
            {
                let mut state = lock(&self.shared.state);
                if state.generation != generation {
                    return Err(ThrottleRejection::Stopped);
                }
                if state.queue.len() < self.shared.config.max_queue_size {
                    enqueue(&self.shared, &mut state, work);
                    return Ok(());
                }
                if Instant::now() >= deadline {
                    state.dropped_requests += 1;
                    warn!("Timed out waiting for queue space");
                    return Err(ThrottleRejection::QueueTimeout(state.snapshot()));
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            sleep(remaining.min(BACKPRESSURE_POLL_INTERVAL)).await;
        }
    }

    pub fn stats(&self) -> ThrottleStats {
        lock(&self.shared.state).snapshot()
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.shared.config
    }

    /// Rejects every queued item with `QueueCleared`; the loop keeps running.
    pub fn clear_queue(&self) {
        let drained = drain_queue(&mut lock(&self.shared.state));
        reject_drained(drained);
    }

    /// Halts the dispatch loop and rejects everything still queued.
    ///
    /// Already dispatched work is left to settle. Callers waiting for
    /// queue space fail with `Stopped` at their next poll. The throttler
    /// accepts new work afterwards.
    pub fn stop(&self) {
        let drained = {
            let mut state = lock(&self.shared.state);
            state.generation += 1;
            state.processing = false;
            if let Some(pump) = state.pump.take() {
                pump.abort();
            }
            drain_queue(&mut state)
        };
        reject_drained(drained);
        debug!("Request throttler stopped");
    }

    pub fn is_processing(&self) -> bool {
        lock(&self.shared.state).processing
    }

    /// Zeroes counters and response-time samples; queue and in-flight work are kept.
    pub fn reset_stats(&self) {
        let mut state = lock(&self.shared.state);
        state.total_requests = 0;
        state.successful_requests = 0;
        state.failed_requests = 0;
        state.dropped_requests = 0;
        state.response_times.clear();
    }
}

impl Drop for RequestThrottler {
    fn drop(&mut self) {
        self.stop();
    }
}

// == Dispatch ==
/// Dispatches `work` at once when idle with a free pacing slot, otherwise
/// appends it and starts a dispatch loop if none is running.
fn enqueue(shared: &Arc<Shared>, state: &mut ThrottleState, work: Work) {
    state.request_counter += 1;
    let now = Instant::now();
    let request = QueuedRequest {
        id: format!("req_{}", state.request_counter),
        enqueued_at: now,
        work,
    };

    let slot_free = state
        .last_dispatch
        .map_or(true, |last| now >= last + shared.interval);
    if !state.processing && state.queue.is_empty() && slot_free {
        dispatch(shared, state, request, now);
        return;
    }

    state.queue.push_back(request);
    if !state.processing {
        state.processing = true;
        state.pump = Some(tokio::spawn(pump(shared.clone(), state.generation)));
    }
}

/// Marks the pacing slot taken and launches `request` in its own task.
fn dispatch(shared: &Arc<Shared>, state: &mut ThrottleState, request: QueuedRequest, now: Instant) {
    state.last_dispatch = Some(now);
    state.active_requests += 1;

    debug!(id = %request.id, "Dispatching request");
    if let Some(fut) = (request.work)(Dispatch::Run) {
        tokio::spawn(run_in_flight(shared.clone(), fut));
    }
}

fn drain_queue(state: &mut ThrottleState) -> Option<(Vec<QueuedRequest>, ThrottleStats)> {
    if state.queue.is_empty() {
        return None;
    }
    let drained: Vec<QueuedRequest> = state.queue.drain(..).collect();
    state.dropped_requests += drained.len() as u64;
    Some((drained, state.snapshot()))
}

fn reject_drained(drained: Option<(Vec<QueuedRequest>, ThrottleStats)>) {
    let Some((requests, stats)) = drained else {
        return;
    };
    info!(count = requests.len(), "Cleared throttle queue");
    for request in requests {
        debug!(id = %request.id, "Rejecting queued request");
        (request.work)(Dispatch::Reject(ThrottleRejection::QueueCleared(stats.clone())));
    }
}

/// Dispatch loop: paces, pops and launches queued work until the queue drains.
async fn pump(shared: Arc<Shared>, generation: u64) {
    loop {
        let next_slot = {
            let mut state = lock(&shared.state);
            if state.generation != generation {
                return;
            }
            if state.queue.is_empty() {
                state.processing = false;
                state.pump = None;
                return;
            }
            state.last_dispatch.map(|last| last + shared.interval)
        };

        if let Some(slot) = next_slot {
            if Instant::now() < slot {
                sleep_until(slot).await;
                continue;
            }
        }

        let now = Instant::now();
        let mut state = lock(&shared.state);
        if state.generation != generation {
            return;
        }
        let Some(request) = state.queue.pop_front() else {
            continue;
        };

        if now.duration_since(request.enqueued_at) > shared.config.request_timeout {
            state.failed_requests += 1;
            let stats = state.snapshot();
            drop(state);
            debug!(id = %request.id, "Queued request timed out before dispatch");
            (request.work)(Dispatch::Reject(ThrottleRejection::RequestTimeout(stats)));
            continue;
        }

        dispatch(&shared, &mut state, request, now);
    }
}

// == In-Flight Settlement ==
/// Settles one dispatched item's stats, even if its future panics.
struct InFlight {
    shared: Arc<Shared>,
    started: Instant,
    finished: bool,
}

impl InFlight {
    fn finish(&mut self, succeeded: bool) {
        self.finished = true;
        record_settlement(&self.shared, succeeded, self.started.elapsed());
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.finished {
            record_settlement(&self.shared, false, self.started.elapsed());
        }
    }
}

fn record_settlement(shared: &Shared, succeeded: bool, elapsed: Duration) {
    let mut state = lock(&shared.state);
    state.active_requests = state.active_requests.saturating_sub(1);
    if succeeded {
        state.successful_requests += 1;
    } else {
        state.failed_requests += 1;
    }
    state.response_times.record(elapsed);
}

async fn run_in_flight(shared: Arc<Shared>, work: BoxFuture<(bool, Deliver)>) {
    let mut flight = InFlight {
        shared,
        started: Instant::now(),
        finished: false,
    };
    let (succeeded, deliver) = work.await;
    flight.finish(succeeded);
    deliver();
}
