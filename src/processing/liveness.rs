/*! Worker liveness

Workers register the chunk they are processing and get a [Heartbeat] guard back.
A monitor thread polls the registry at a fixed interval, logs progress,
and reports chunks that have been in flight for longer than the stall threshold.
!*/
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::{self, RecvTimeoutError},
        Arc, Mutex, MutexGuard,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{info, warn};

use crate::io::reader::ByteRange;

#[derive(Debug, Default)]
struct Registry {
    active: Mutex<BTreeMap<usize, (ByteRange, Instant)>>,
    done: AtomicUsize,
    records: AtomicUsize,
}

impl Registry {
    fn active(&self) -> MutexGuard<'_, BTreeMap<usize, (ByteRange, Instant)>> {
        // may be poisoned by a panicking worker
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Shared registry of in-flight chunks.
#[derive(Debug, Clone, Default)]
pub struct Liveness {
    inner: Arc<Registry>,
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `range` as being processed.
    pub fn track(&self, range: &ByteRange) -> Heartbeat {
        self.inner
            .active()
            .insert(range.index, (*range, Instant::now()));
        Heartbeat {
            registry: self.inner.clone(),
            index: range.index,
        }
    }

    /// Number of chunks done.
    pub fn done(&self) -> usize {
        self.inner.done.load(Ordering::Relaxed)
    }

    /// Number of records processed by finished chunks.
    pub fn records(&self) -> usize {
        self.inner.records.load(Ordering::Relaxed)
    }

    /// Number of chunks being processed.
    pub fn in_flight(&self) -> usize {
        self.inner.active().len()
    }

    /// Chunks in flight for longer than `threshold`, with their age.
    pub fn stalled(&self, threshold: Duration) -> Vec<(ByteRange, Duration)> {
        let now = Instant::now();
        self.inner
            .active()
            .values()
            .map(|(range, since)| (*range, now.duration_since(*since)))
            .filter(|(_, age)| *age > threshold)
            .collect()
    }

    /// Spawn a thread that polls and logs liveness every `interval`.
    pub fn monitor(&self, interval: Duration, stall_after: Duration) -> Monitor {
        let (stop, rx) = mpsc::channel::<()>();
        let liveness = self.clone();
        let handle = thread::spawn(move || loop {
            match rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => liveness.poll(stall_after),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        Monitor {
            stop,
            handle: Some(handle),
        }
    }

    fn poll(&self, stall_after: Duration) {
        info!(
            "{} chunks done ({} records), {} in flight",
            self.done(),
            self.records(),
            self.in_flight()
        );
        for (range, age) in self.stalled(stall_after) {
            warn!(
                "chunk {} (bytes {}..{}) in flight for {:.1}s",
                range.index,
                range.start,
                range.end,
                age.as_secs_f64()
            );
        }
    }
}

/// Unregisters its chunk when dropped.
#[derive(Debug)]
pub struct Heartbeat {
    registry: Arc<Registry>,
    index: usize,
}

impl Heartbeat {
    /// Mark the chunk as successfully processed.
    pub fn finish(self, records: usize) {
        self.registry.done.fetch_add(1, Ordering::Relaxed);
        self.registry.records.fetch_add(records, Ordering::Relaxed);
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.registry.active().remove(&self.index);
    }
}

/// Handle on the monitoring thread. Stops the thread when dropped.
#[derive(Debug)]
pub struct Monitor {
    stop: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Monitor {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("liveness monitor panicked");
            }
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_and_finish() {
        let l = Liveness::new();
        let hb = l.track(&ByteRange::new(0, 0, 10));
        let hb2 = l.track(&ByteRange::new(1, 10, 20));
        assert_eq!(l.in_flight(), 2);
        hb.finish(12);
        assert_eq!(l.in_flight(), 1);
        assert_eq!(l.done(), 1);
        assert_eq!(l.records(), 12);

        // dropped without finishing: not counted as done
        drop(hb2);
        assert_eq!(l.in_flight(), 0);
        assert_eq!(l.done(), 1);
    }

    #[test]
    fn stalled() {
        let l = Liveness::new();
        let _hb = l.track(&ByteRange::new(4, 0, 10));
        assert!(l.stalled(Duration::from_secs(3600)).is_empty());
        thread::sleep(Duration::from_millis(20));
        let stalled = l.stalled(Duration::from_millis(1));
        assert_eq!(stalled.len(), 1);
        assert_eq!(stalled[0].0.index, 4);
    }

    #[test]
    fn monitor_stops() {
        let l = Liveness::new();
        let m = l.monitor(Duration::from_millis(5), Duration::from_millis(1));
        let _hb = l.track(&ByteRange::new(0, 0, 10));
        thread::sleep(Duration::from_millis(20));
        m.stop();
    }
}
