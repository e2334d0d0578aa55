//! Background persistence of interaction snapshots.
//!
//! Replies never wait on the patient-record collaborator: snapshots are
//! queued and written by a spawned task, which logs failures and moves on.

use std::sync::Arc;

use imre_core::{with_timeout, InteractionSnapshot, PatientRecordStore};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Snapshots that may wait in the queue before new ones are dropped.
const QUEUE_CAPACITY: usize = 1024;

enum Job {
    Record {
        patient_id: String,
        snapshot: InteractionSnapshot,
    },
    Flush(oneshot::Sender<()>),
}

pub struct PersistenceWorker {
    tx: mpsc::Sender<Job>,
    handle: JoinHandle<()>,
}

impl PersistenceWorker {
    /// Spawn the writer task. Must be called inside a Tokio runtime.
    pub fn spawn(records: Arc<dyn PatientRecordStore>, timeout_ms: u64) -> Self {
        let (tx, mut rx) = mpsc::channel::<Job>(QUEUE_CAPACITY);
        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    Job::Record {
                        patient_id,
                        snapshot,
                    } => {
                        let write = records.record_interaction(&patient_id, snapshot);
                        match with_timeout("patient records", timeout_ms, write).await {
                            Ok(()) => debug!(patient_id = %patient_id, "Interaction persisted"),
                            Err(e) => warn!(
                                patient_id = %patient_id,
                                error = %e,
                                "Failed to persist interaction"
                            ),
                        }
                    }
                    Job::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("Persistence worker stopped");
        });
        Self { tx, handle }
    }

    /// Queue a snapshot without waiting. A full or closed queue drops it.
    pub fn enqueue(&self, patient_id: &str, snapshot: InteractionSnapshot) {
        let job = Job::Record {
            patient_id: patient_id.to_string(),
            snapshot,
        };
        if let Err(e) = self.tx.try_send(job) {
            warn!(patient_id = %patient_id, error = %e, "Interaction snapshot dropped");
        }
    }

    /// Wait until every snapshot queued before this call has been handled.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Job::Flush(done_tx)).await.is_err() {
            error!("Persistence worker is not running");
            return;
        }
        let _ = done_rx.await;
    }

    /// Drain the queue and stop the task.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.handle.await {
            error!(error = %e, "Persistence worker panicked");
        }
    }
}
