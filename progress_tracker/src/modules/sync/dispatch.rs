use crate::modules::students::StudentStore;
use crate::modules::sync::{SyncError, SyncService};
use crate::types::tables::Student;
use progress_tracker_libs::codeforces::client::CodeforcesApi;
use progress_tracker_libs::mail::Mailer;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Why a background sync was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Created,
    HandleChanged,
}

/// Completion record of one background sync task.
#[derive(Debug)]
pub struct SyncOutcome {
    pub student_id: i64,
    pub handle: String,
    pub trigger: SyncTrigger,
    pub result: Result<(), SyncError>,
}

/// Submits fire-and-forget syncs and publishes their outcomes.
///
/// The caller stays decoupled from the request/response cycle while every
/// completion or failure still reaches whoever listens on the channel.
pub struct SyncDispatcher<A, S, M> {
    service: Arc<SyncService<A, S, M>>,
    tx: UnboundedSender<SyncOutcome>,
}

impl<A, S, M> Clone for SyncDispatcher<A, S, M> {
    fn clone(&self) -> Self {
        SyncDispatcher {
            service: Arc::clone(&self.service),
            tx: self.tx.clone(),
        }
    }
}

impl<A, S, M> SyncDispatcher<A, S, M>
where
    A: CodeforcesApi + Send + Sync + 'static,
    S: StudentStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    pub fn new(service: Arc<SyncService<A, S, M>>) -> (Self, UnboundedReceiver<SyncOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SyncDispatcher { service, tx }, rx)
    }

    /// Submits a sync for the record without blocking the caller.
    pub fn dispatch(&self, student: Student, trigger: SyncTrigger) {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let result = service.sync_one(&student).await.map(|_| ());
            let outcome = SyncOutcome {
                student_id: student.id,
                handle: student.handle,
                trigger,
                result,
            };
            if tx.send(outcome).is_err() {
                tracing::warn!("sync outcome listener is gone");
            }
        });
    }
}

/// Drains sync outcomes into the log until every dispatcher is dropped.
pub fn spawn_outcome_logger(mut rx: UnboundedReceiver<SyncOutcome>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(outcome) = rx.recv().await {
            match &outcome.result {
                Ok(()) => tracing::info!(
                    "{:?} sync finished for {}",
                    outcome.trigger,
                    outcome.handle
                ),
                Err(e) => tracing::error!(
                    "{:?} sync failed for {}: {}",
                    outcome.trigger,
                    outcome.handle,
                    e
                ),
            }
        }
    })
}
