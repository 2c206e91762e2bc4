//! Adapter for backends that produce rows from their own thread.
//!
//! Each query spawns the producer on a worker thread connected to the
//! consumer by a rendezvous channel, so at most one row is in flight and the
//! producer never reads ahead of the aggregator. Dropping the row stream
//! disconnects the channel; the producer's next `send` fails and it must
//! return, which releases the backend promptly after cancellation.
//!
//! A producer that panics ends the stream with `StoreUnavailable`.

use super::{CandidateRow, CandidateRows, SpatialStore};
use crate::cancel::CancelToken;
use crate::error::{EngineError, Result};
use crate::region::QueryRegion;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error};

/// Capacity 0 makes every send wait for the matching receive.
const ROWS_IN_FLIGHT: usize = 0;

/// How often a blocked pull re-checks its cancel token.
const CANCEL_POLL: Duration = Duration::from_millis(10);

/// Producer side of a per-query row channel.
pub struct RowSender {
    tx: Sender<Result<CandidateRow>>,
    sent: usize,
}

impl RowSender {
    /// Hand one row to the consumer, blocking until it is taken.
    ///
    /// Fails with `Cancelled` once the consumer has dropped the stream; the
    /// producer should propagate it with `?` and stop.
    pub fn send(&mut self, row: CandidateRow) -> Result<()> {
        self.push(Ok(row))
    }

    /// Report a row the backend could not decode. The query continues.
    pub fn send_malformed(&mut self, line: usize, reason: impl Into<String>) -> Result<()> {
        self.push(Err(EngineError::MalformedRow {
            line,
            reason: reason.into(),
        }))
    }

    /// Rows handed over so far.
    pub fn sent(&self) -> usize {
        self.sent
    }

    fn push(&mut self, item: Result<CandidateRow>) -> Result<()> {
        self.tx.send(item).map_err(|_| EngineError::Cancelled {
            rows_consumed: self.sent,
        })?;
        self.sent += 1;
        Ok(())
    }
}

type Producer = dyn Fn(&QueryRegion, &mut RowSender) -> Result<()> + Send + Sync;

/// Store backed by a producer function run once per query.
///
/// The producer must emit only rows overlapping the region. Returning an
/// error other than `Cancelled` ends the query with `StoreUnavailable`.
#[derive(Clone)]
pub struct ChannelStore {
    producer: Arc<Producer>,
    pushdown: bool,
}

impl ChannelStore {
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn(&QueryRegion, &mut RowSender) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            producer: Arc::new(producer),
            pushdown: false,
        }
    }

    /// Declare that the producer honours `region.filter()`.
    pub fn with_filter_pushdown(mut self, pushdown: bool) -> Self {
        self.pushdown = pushdown;
        self
    }

    fn spawn(&self, region: &QueryRegion, cancel: Option<CancelToken>) -> Result<ChannelRows> {
        let (tx, rx) = bounded(ROWS_IN_FLIGHT);
        let producer = Arc::clone(&self.producer);
        let region = region.clone();

        let handle = thread::Builder::new()
            .name("store-producer".to_string())
            .spawn(move || {
                let mut sender = RowSender { tx, sent: 0 };
                match producer(&region, &mut sender) {
                    Ok(()) => {}
                    Err(EngineError::Cancelled { rows_consumed }) => {
                        debug!(%region, rows_consumed, "consumer dropped row stream");
                    }
                    Err(err) => {
                        let err = match err {
                            EngineError::StoreUnavailable { .. } => err,
                            other => EngineError::StoreUnavailable {
                                reason: other.to_string(),
                                rows_consumed: sender.sent,
                            },
                        };
                        // Consumer may already be gone; nothing left to tell it then.
                        let _ = sender.tx.send(Err(err));
                    }
                }
            })
            .map_err(|e| EngineError::unavailable(format!("cannot spawn producer: {}", e)))?;

        Ok(ChannelRows {
            rx,
            producer: Some(handle),
            cancel,
            received: 0,
            done: false,
        })
    }
}

impl SpatialStore for ChannelStore {
    fn range_query(&self, region: &QueryRegion) -> Result<CandidateRows<'_>> {
        Ok(Box::new(self.spawn(region, None)?))
    }

    fn range_query_with_cancel(
        &self,
        region: &QueryRegion,
        cancel: &CancelToken,
    ) -> Result<CandidateRows<'_>> {
        Ok(Box::new(self.spawn(region, Some(cancel.clone()))?))
    }

    fn pushes_down_filters(&self) -> bool {
        self.pushdown
    }
}

/// Consumer side of one query's row channel.
///
/// When the channel closes, the producer thread is joined so that a panic
/// surfaces as `StoreUnavailable` instead of looking like a finished stream.
/// With a cancel token, a pull waiting on a slow producer gives up with
/// `Cancelled` within one poll interval of the token firing.
pub struct ChannelRows {
    rx: Receiver<Result<CandidateRow>>,
    producer: Option<JoinHandle<()>>,
    cancel: Option<CancelToken>,
    received: usize,
    done: bool,
}

impl ChannelRows {
    /// Block for the next item; `None` once the producer has hung up.
    fn recv(&mut self) -> Option<Result<CandidateRow>> {
        let Some(cancel) = &self.cancel else {
            return self.rx.recv().ok();
        };
        loop {
            if cancel.is_cancelled() {
                return Some(Err(EngineError::Cancelled {
                    rows_consumed: self.received,
                }));
            }
            match self.rx.recv_timeout(CANCEL_POLL) {
                Ok(item) => return Some(item),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Join the finished producer, reporting a panic as a lost backend.
    fn producer_exit(&mut self) -> Option<Result<CandidateRow>> {
        let handle = self.producer.take()?;
        let payload = handle.join().err()?;
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!(rows = self.received, %message, "store producer panicked");
        Some(Err(EngineError::StoreUnavailable {
            reason: format!("producer panicked: {}", message),
            rows_consumed: self.received,
        }))
    }
}

impl Iterator for ChannelRows {
    type Item = Result<CandidateRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.recv() {
            Some(Err(err @ EngineError::Cancelled { .. })) => {
                self.done = true;
                Some(Err(err))
            }
            Some(item) => {
                self.received += 1;
                Some(item)
            }
            None => {
                self.done = true;
                self.producer_exit()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::GenomicInterval;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn row(track: &str, start: u64, end: u64) -> CandidateRow {
        CandidateRow::new(track, "chr1", GenomicInterval::new(start, end).unwrap())
    }

    #[test]
    fn test_rows_flow_through() {
        let store = ChannelStore::new(|_region, tx| {
            tx.send(row("A", 100, 200))?;
            tx.send_malformed(2, "start >= end")?;
            tx.send(row("B", 150, 160))?;
            Ok(())
        });
        let region = QueryRegion::new("chr1", 0, 1000).unwrap();
        let items: Vec<_> = store.range_query(&region).unwrap().collect();

        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(EngineError::MalformedRow { line: 2, .. })));
        assert_eq!(items[2].as_ref().unwrap().track_id, "B");
    }

    #[test]
    fn test_producer_error_becomes_unavailable() {
        let store = ChannelStore::new(|_region, tx| {
            tx.send(row("A", 100, 200))?;
            Err(EngineError::Io(std::io::Error::other("connection reset")))
        });
        let region = QueryRegion::new("chr1", 0, 1000).unwrap();
        let items: Vec<_> = store.range_query(&region).unwrap().collect();

        assert_eq!(items.len(), 2);
        assert!(matches!(
            items[1],
            Err(EngineError::StoreUnavailable {
                rows_consumed: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_producer_panic_becomes_unavailable() {
        let store = ChannelStore::new(|_region, tx| {
            tx.send(row("A", 10, 20))?;
            panic!("index handle poisoned");
        });
        let region = QueryRegion::new("chr1", 0, 100).unwrap();
        let items: Vec<_> = store.range_query(&region).unwrap().collect();

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        match &items[1] {
            Err(EngineError::StoreUnavailable {
                reason,
                rows_consumed,
            }) => {
                assert_eq!(*rows_consumed, 1);
                assert!(reason.contains("index handle poisoned"));
            }
            other => panic!("unexpected item: {:?}", other),
        }
    }

    #[test]
    fn test_cancel_interrupts_blocked_pull() {
        let store = ChannelStore::new(|_region, tx| {
            thread::sleep(Duration::from_millis(2000));
            tx.send(row("A", 10, 20))
        });
        let region = QueryRegion::new("chr1", 0, 100).unwrap();
        let cancel = CancelToken::with_timeout(Duration::from_millis(100));

        let started = Instant::now();
        let mut rows = store.range_query_with_cancel(&region, &cancel).unwrap();
        let first = rows.next();
        let elapsed = started.elapsed();

        assert!(matches!(
            first,
            Some(Err(EngineError::Cancelled { rows_consumed: 0 }))
        ));
        assert!(rows.next().is_none());
        assert!(elapsed < Duration::from_millis(1000), "took {:?}", elapsed);
    }

    #[test]
    fn test_explicit_cancel_interrupts_blocked_pull() {
        let store = ChannelStore::new(|_region, tx| {
            thread::sleep(Duration::from_millis(2000));
            tx.send(row("A", 10, 20))
        });
        let region = QueryRegion::new("chr1", 0, 100).unwrap();
        let cancel = CancelToken::new();

        let canceller = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });

        let started = Instant::now();
        let mut rows = store.range_query_with_cancel(&region, &cancel).unwrap();
        assert!(matches!(
            rows.next(),
            Some(Err(EngineError::Cancelled { .. }))
        ));
        assert!(started.elapsed() < Duration::from_millis(1000));
        handle.join().unwrap();
    }

    #[test]
    fn test_producer_stops_when_stream_dropped() {
        let produced = Arc::new(AtomicUsize::new(0));
        let (done_tx, done_rx) = bounded::<usize>(1);

        let counter = Arc::clone(&produced);
        let store = ChannelStore::new(move |_region, tx| {
            let result = (0..).try_for_each(|i| {
                counter.fetch_add(1, Ordering::SeqCst);
                tx.send(row("A", i, i + 1))
            });
            let _ = done_tx.send(tx.sent());
            result
        });

        let region = QueryRegion::new("chr1", 0, 1000).unwrap();
        let mut rows = store.range_query(&region).unwrap();
        for _ in 0..3 {
            assert!(rows.next().unwrap().is_ok());
        }
        drop(rows);

        let sent = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("producer should stop after the stream is dropped");
        assert_eq!(sent, 3);
        // Rendezvous channel: at most one attempted send beyond what was taken
        assert!(produced.load(Ordering::SeqCst) <= 4);
    }
}
