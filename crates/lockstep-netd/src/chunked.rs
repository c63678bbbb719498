//! Chunked transfer engine.
//!
//! One worker drains a FIFO of large payloads (save data, code lists). Each
//! job is announced with `ChunkedDataStart`, streamed in fixed-size units on
//! the bulk channel, closed with `ChunkedDataEnd`, and then held until every
//! destination that is still connected has acknowledged it with
//! `ChunkedDataComplete`. Abort drops the queued jobs at once and closes the
//! in-flight job with `ChunkedDataAbort` instead of `End`. Jobs queued after an
//! abort are unaffected by it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use lockstep_netproto::PlayerId;
use lockstep_netproto::channel::ChannelKind;
use lockstep_netproto::messages::Message;
use lockstep_netproto::messages::chunked::{
    ChunkedDataAbort, ChunkedDataEnd, ChunkedDataPayload, ChunkedDataStart,
};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::async_queue::{AsyncQueue, Target};
use crate::config::ChunkConfig;

/// Who is connected right now. Consulted while a job is in flight.
pub trait Roster: Send + Sync {
    fn connected(&self) -> Vec<PlayerId>;

    fn is_connected(&self, pid: PlayerId) -> bool {
        self.connected().contains(&pid)
    }
}

/// A payload waiting to be streamed.
#[derive(Debug, Clone)]
pub struct ChunkJob {
    pub title: String,
    pub payload: Bytes,
    pub target: Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobOutcome {
    Completed,
    Aborted,
    /// The only destination went away mid-stream.
    Orphaned,
    Shutdown,
}

pub struct ChunkEngine {
    config: ChunkConfig,
    jobs: Mutex<VecDeque<ChunkJob>>,
    /// Acknowledgments per in-flight job id. Only the worker inserts or removes.
    acks: Mutex<HashMap<u32, HashSet<PlayerId>>>,
    /// Bumped by every abort. A job is cancelled once this moves past the
    /// value read when the job was dequeued.
    abort_epoch: AtomicU64,
    wake: Notify,
    complete: Notify,
}

impl ChunkEngine {
    pub fn new(config: ChunkConfig) -> Self {
        Self {
            config,
            jobs: Mutex::new(VecDeque::new()),
            acks: Mutex::new(HashMap::new()),
            abort_epoch: AtomicU64::new(0),
            wake: Notify::new(),
            complete: Notify::new(),
        }
    }

    pub fn enqueue(&self, job: ChunkJob) {
        debug!(title = %job.title, len = job.payload.len(), target = ?job.target, "Queued chunked transfer");
        self.jobs.lock().push_back(job);
        self.wake.notify_one();
    }

    /// Number of jobs not yet started.
    pub fn queued(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Cancel everything queued or in flight. Safe to call when idle.
    pub fn abort(&self) {
        let dropped = {
            let mut jobs = self.jobs.lock();
            let n = jobs.len();
            jobs.clear();
            self.abort_epoch.fetch_add(1, Ordering::SeqCst);
            n
        };
        if dropped > 0 {
            info!(dropped, "Discarded queued chunked transfers");
        }
        self.complete.notify_one();
    }

    fn aborted_since(&self, epoch: u64) -> bool {
        self.abort_epoch.load(Ordering::SeqCst) != epoch
    }

    /// Record `pid`'s acknowledgment of job `id`. Unknown ids are ignored.
    pub fn complete(&self, id: u32, pid: PlayerId) -> bool {
        let known = match self.acks.lock().get_mut(&id) {
            Some(acked) => {
                acked.insert(pid);
                true
            }
            None => false,
        };
        if known {
            self.complete.notify_one();
        }
        known
    }

    /// Wake the worker so it re-checks who it is still waiting for.
    pub fn on_player_left(&self) {
        self.complete.notify_one();
    }

    /// Worker loop. Returns when `shutdown` fires.
    pub async fn run(&self, roster: &dyn Roster, queue: &AsyncQueue, shutdown: &CancellationToken) {
        info!("Chunked transfer worker started");
        let mut next_id: u32 = 0;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.wake.notified() => {}
            }

            loop {
                let Some((job, epoch)) = self.next_job() else {
                    break;
                };

                let id = next_id;
                next_id = next_id.wrapping_add(1);
                let outcome = self.transfer(id, epoch, &job, roster, queue, shutdown).await;
                self.acks.lock().remove(&id);
                debug!(id, ?outcome, "Chunked transfer finished");
                if outcome == JobOutcome::Shutdown {
                    info!("Chunked transfer worker stopped");
                    return;
                }
            }
        }
        info!("Chunked transfer worker stopped");
    }

    /// Pop the next job together with the abort epoch it belongs to.
    fn next_job(&self) -> Option<(ChunkJob, u64)> {
        let mut jobs = self.jobs.lock();
        let job = jobs.pop_front()?;
        Some((job, self.abort_epoch.load(Ordering::SeqCst)))
    }

    async fn transfer(
        &self,
        id: u32,
        epoch: u64,
        job: &ChunkJob,
        roster: &dyn Roster,
        queue: &AsyncQueue,
        shutdown: &CancellationToken,
    ) -> JobOutcome {
        let destinations: Vec<PlayerId> = match job.target {
            Target::Only(pid) => vec![pid],
            Target::AllExcept(skip) => roster
                .connected()
                .into_iter()
                .filter(|pid| *pid != skip)
                .collect(),
        };
        self.acks.lock().insert(id, HashSet::new());

        info!(id, title = %job.title, ?destinations, len = job.payload.len(), "Chunked transfer start");
        send_bulk(
            queue,
            &ChunkedDataStart {
                id,
                title: job.title.clone(),
                total_len: job.payload.len() as u64,
            },
            job.target,
        );

        let unit = self.config.unit_size.max(1);
        let interval = self.config.rate_limit_kbps.map(|kbps| {
            let bytes_per_sec = (kbps.max(1) as f64 / 8.0) * 1024.0;
            Duration::from_secs_f64(unit as f64 / bytes_per_sec)
        });

        let mut offset = 0;
        while offset < job.payload.len() {
            if shutdown.is_cancelled() {
                return JobOutcome::Shutdown;
            }
            if self.aborted_since(epoch) {
                return self.send_abort(id, job, queue);
            }
            if let Target::Only(pid) = job.target
                && !roster.is_connected(pid)
            {
                info!(id, pid, "Chunked transfer destination left");
                return JobOutcome::Orphaned;
            }

            let started = Instant::now();
            let end = (offset + unit).min(job.payload.len());
            send_bulk(
                queue,
                &ChunkedDataPayload {
                    id,
                    data: job.payload.slice(offset..end).to_vec(),
                },
                job.target,
            );
            offset = end;

            if let Some(interval) = interval {
                let pause = interval.saturating_sub(started.elapsed());
                tokio::select! {
                    _ = shutdown.cancelled() => return JobOutcome::Shutdown,
                    _ = tokio::time::sleep(pause) => {}
                }
            }
        }

        if self.aborted_since(epoch) {
            return self.send_abort(id, job, queue);
        }
        send_bulk(queue, &ChunkedDataEnd { id }, job.target);

        loop {
            // Copy the acks out; the roster takes the registry lock.
            let acked = self.acks.lock().get(&id).cloned().unwrap_or_default();
            let waiting = destinations
                .iter()
                .filter(|pid| !acked.contains(pid) && roster.is_connected(**pid))
                .count();
            if waiting == 0 {
                return JobOutcome::Completed;
            }
            if self.aborted_since(epoch) {
                return JobOutcome::Aborted;
            }
            tokio::select! {
                _ = shutdown.cancelled() => return JobOutcome::Shutdown,
                _ = self.complete.notified() => {}
            }
        }
    }

    fn send_abort(&self, id: u32, job: &ChunkJob, queue: &AsyncQueue) -> JobOutcome {
        info!(id, title = %job.title, "Chunked transfer aborted");
        send_bulk(queue, &ChunkedDataAbort { id }, job.target);
        JobOutcome::Aborted
    }
}

fn send_bulk<T: Message>(queue: &AsyncQueue, msg: &T, target: Target) {
    if let Err(e) = queue.send_on(msg, target, ChannelKind::Bulk) {
        warn!(msg_id = ?T::msg_id(), error = %e, "Failed to encode chunked transfer message");
    }
}
