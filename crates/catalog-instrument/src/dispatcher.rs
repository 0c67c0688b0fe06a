//! Background audit dispatch: one bounded queue, one worker appending to the sink.

use catalog_types::{AuditRecord, AuditSink};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

/// Records that may wait for the worker before new ones are dropped.
pub const DEFAULT_AUDIT_QUEUE: usize = 1024;

enum Command {
    Append(AuditRecord),
    Flush(oneshot::Sender<()>),
}

/// Handle to the audit worker. Cheap to clone; the worker stops when every handle is dropped.
///
/// Sink failures and queue overflow are logged and the record is dropped; callers never
/// observe them and never wait on a stalled sink.
#[derive(Clone)]
pub struct AuditDispatcher {
    tx: mpsc::Sender<Command>,
    dropped: Arc<AtomicU64>,
}

impl AuditDispatcher {
    /// Spawn the worker on the current tokio runtime with [`DEFAULT_AUDIT_QUEUE`] slots.
    pub fn spawn(sink: Arc<dyn AuditSink + Send + Sync>) -> Self {
        Self::with_capacity(sink, DEFAULT_AUDIT_QUEUE)
    }

    /// `capacity` is clamped to at least one slot.
    pub fn with_capacity(sink: Arc<dyn AuditSink + Send + Sync>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Command>(capacity.max(1));
        tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                match cmd {
                    Command::Append(record) => {
                        let action = record.action;
                        if let Err(e) = sink.append(record).await {
                            tracing::warn!(error = %e, action = %action, "audit record dropped");
                        }
                    }
                    Command::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
            tracing::debug!("audit dispatcher stopped");
        });
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queue a record without waiting for the sink.
    pub fn dispatch(&self, record: AuditRecord) {
        let (reason, record) = match self.tx.try_send(Command::Append(record)) {
            Ok(()) => return,
            Err(TrySendError::Full(cmd)) => ("audit queue full", cmd),
            Err(TrySendError::Closed(cmd)) => ("audit worker gone", cmd),
        };
        self.dropped.fetch_add(1, Ordering::Relaxed);
        if let Command::Append(record) = record {
            tracing::warn!(action = %record.action, reason, "audit record dropped");
        }
    }

    /// Records refused because the queue was full or the worker had stopped.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Wait until every record queued before this call has been handed to the sink.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(ack_tx)).await.is_err() {
            return;
        }
        let _ = ack_rx.await;
    }
}
