pub mod dispatch;
pub mod inactivity;
pub mod reconcile;
pub mod scheduler;

use crate::modules::students::{StoreError, StudentStore};
use crate::modules::sync::inactivity::ReminderDecision;
use crate::types::tables::Student;
use chrono::Utc;
use progress_tracker_libs::codeforces::client::{CodeforcesApi, CodeforcesError};
use progress_tracker_libs::mail::Mailer;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to fetch codeforces data: {0}")]
    Fetch(#[from] CodeforcesError),
    #[error("failed to persist the student record: {0}")]
    Persistence(#[from] StoreError),
}

/// Outcome of one full-population sync pass.
#[derive(Debug, Default)]
pub struct PassReport {
    pub total: usize,
    pub synced: usize,
    pub reminders_sent: usize,
    pub failures: Vec<PassFailure>,
}

/// One student the pass could not bring up to date.
#[derive(Debug)]
pub struct PassFailure {
    pub student_id: i64,
    pub handle: String,
    pub error: SyncError,
}

/// Drives fetch, reconciliation and the reminder step over the record store.
pub struct SyncService<A, S, M> {
    api: A,
    store: S,
    mailer: M,
}

impl<A, S, M> SyncService<A, S, M>
where
    A: CodeforcesApi + Send + Sync,
    S: StudentStore + Send + Sync,
    M: Mailer + Send + Sync,
{
    pub fn new(api: A, store: S, mailer: M) -> Self {
        SyncService { api, store, mailer }
    }

    /// Fetches the remote profile and reconciles it into the stored record.
    ///
    /// Either every sync-derived field updates together or none of them do;
    /// a failed fetch leaves the record exactly as it was.
    pub async fn sync_one(&self, student: &Student) -> Result<Student, SyncError> {
        tracing::info!("syncing data for {}", student.handle);

        let profile = self.api.fetch_profile(&student.handle).await?;
        let update = reconcile::build_update(profile, Utc::now());
        let updated = self.store.apply_sync(student.id, &update).await?;

        tracing::info!(
            "successfully synced data for {}: rating {} ({} contests, {} submissions)",
            updated.handle,
            updated.current_rating,
            updated.contests.len(),
            updated.submissions.len(),
        );

        Ok(updated)
    }

    /// Sends an inactivity reminder when one is due.
    ///
    /// Bookkeeping is written only after confirmed delivery; a failed
    /// delivery is logged and retried naturally on the next pass. Returns
    /// whether a reminder went out.
    pub async fn remind_if_inactive(&self, student: &Student) -> Result<bool, SyncError> {
        let now = Utc::now();
        if inactivity::decide(student, now) != ReminderDecision::Send {
            return Ok(false);
        }

        tracing::info!("{} is inactive, sending a reminder", student.handle);
        let body = reminder_body(&student.name);
        if let Err(e) = self
            .mailer
            .send(&student.email, REMINDER_SUBJECT, &body)
            .await
        {
            tracing::error!("failed to send a reminder to {}: {}", student.email, e);
            return Ok(false);
        }

        self.store.record_reminder(student.id, now).await?;
        Ok(true)
    }

    /// Runs one full-population pass.
    ///
    /// One student's failure never aborts the pass; every failure lands in
    /// the returned report instead.
    pub async fn run_pass(&self) -> Result<PassReport, SyncError> {
        tracing::info!("starting full sync pass");
        let students = self.store.find_all().await?;

        let mut report = PassReport {
            total: students.len(),
            ..Default::default()
        };

        for student in &students {
            match self.process_record(student).await {
                Ok(reminded) => {
                    report.synced += 1;
                    if reminded {
                        report.reminders_sent += 1;
                    }
                }
                Err(e) => {
                    tracing::error!("failed to process student {}: {}", student.handle, e);
                    report.failures.push(PassFailure {
                        student_id: student.id,
                        handle: student.handle.clone(),
                        error: e,
                    });
                }
            }
        }

        tracing::info!(
            "full sync pass finished: {} synced, {} failed out of {}",
            report.synced,
            report.failures.len(),
            report.total,
        );

        Ok(report)
    }

    async fn process_record(&self, student: &Student) -> Result<bool, SyncError> {
        let updated = self.sync_one(student).await?;
        self.remind_if_inactive(&updated).await
    }
}

const REMINDER_SUBJECT: &str = "Friendly Reminder: Let's Get Back to Coding!";

fn reminder_body(name: &str) -> String {
    format!(
        "<p>Hi {},</p>\
         <p>We noticed you haven't made any submissions on Codeforces in the last 7 days.</p>\
         <p>Consistency is key to improvement. Why not try solving a problem today?</p>\
         <p>Keep up the great work!</p>",
        name
    )
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use sqlx::types::Json;

    #[tokio::test]
    async fn one_failing_student_does_not_abort_the_pass() {
        let store = MemoryStore::with_students(vec![
            student(1, "alice"),
            student(2, "bob"),
            student(3, "carol"),
        ]);
        let service = SyncService::new(
            ScriptedApi::failing_for("bob"),
            store.clone(),
            RecordingMailer::default(),
        );

        let report = service.run_pass().await.unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.synced, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].handle, "bob");
        assert!(matches!(report.failures[0].error, SyncError::Fetch(_)));

        assert!(store.get(1).unwrap().last_synced_at.is_some());
        assert!(store.get(2).unwrap().last_synced_at.is_none());
        assert!(store.get(3).unwrap().last_synced_at.is_some());
    }

    #[tokio::test]
    async fn a_partially_failing_fetch_persists_nothing() {
        let store = MemoryStore::with_students(vec![student(1, "alice")]);
        let api = ScriptedApi {
            fail_rating: std::collections::HashSet::from([String::from("alice")]),
            last_submission_age_days: 1,
            ..Default::default()
        };
        let service = SyncService::new(api, store.clone(), RecordingMailer::default());

        let result = service.sync_one(&store.get(1).unwrap()).await;
        assert!(matches!(result, Err(SyncError::Fetch(_))));

        // user.info succeeded but nothing may land without the other two.
        let untouched = store.get(1).unwrap();
        assert_eq!(untouched.current_rating, 0);
        assert!(untouched.contests.is_empty());
        assert!(untouched.submissions.is_empty());
        assert!(untouched.last_synced_at.is_none());
    }

    #[tokio::test]
    async fn a_successful_sync_updates_every_derived_field_together() {
        let store = MemoryStore::with_students(vec![student(1, "alice")]);
        let service = SyncService::new(
            ScriptedApi::succeeding(),
            store.clone(),
            RecordingMailer::default(),
        );

        let updated = service.sync_one(&store.get(1).unwrap()).await.unwrap();

        assert_eq!(updated.current_rating, 1500);
        assert_eq!(updated.max_rating, 1600);
        assert_eq!(updated.contests.len(), 1);
        assert_eq!(updated.submissions.len(), 1);
        assert!(updated.last_synced_at.is_some());
    }

    #[tokio::test]
    async fn a_confirmed_delivery_updates_the_bookkeeping() {
        let mut inactive = student(1, "alice");
        inactive.submissions = Json(vec![submission_aged(10)]);
        let store = MemoryStore::with_students(vec![inactive.clone()]);
        let mailer = RecordingMailer::default();
        let service = SyncService::new(ScriptedApi::succeeding(), store.clone(), mailer.clone());

        let reminded = service.remind_if_inactive(&inactive).await.unwrap();
        assert!(reminded);

        let after = store.get(1).unwrap();
        assert_eq!(after.reminder_count, 1);
        assert!(after.last_reminder_sent_at.is_some());
        assert_eq!(
            mailer.sent.lock().unwrap().as_slice(),
            ["alice@example.com"]
        );
    }

    #[tokio::test]
    async fn a_failed_delivery_leaves_the_bookkeeping_untouched() {
        let mut inactive = student(1, "alice");
        inactive.submissions = Json(vec![submission_aged(10)]);
        let store = MemoryStore::with_students(vec![inactive.clone()]);
        let service = SyncService::new(
            ScriptedApi::succeeding(),
            store.clone(),
            RecordingMailer::refusing(),
        );

        let reminded = service.remind_if_inactive(&inactive).await.unwrap();
        assert!(!reminded);

        let after = store.get(1).unwrap();
        assert_eq!(after.reminder_count, 0);
        assert!(after.last_reminder_sent_at.is_none());
    }

    #[tokio::test]
    async fn the_pass_reminds_students_the_fresh_data_shows_as_inactive() {
        let store = MemoryStore::with_students(vec![student(1, "alice"), student(2, "bob")]);
        let api = ScriptedApi {
            last_submission_age_days: 10,
            ..Default::default()
        };
        let mailer = RecordingMailer::default();
        let service = SyncService::new(api, store.clone(), mailer.clone());

        let report = service.run_pass().await.unwrap();

        assert_eq!(report.synced, 2);
        assert_eq!(report.reminders_sent, 2);
        assert_eq!(store.get(1).unwrap().reminder_count, 1);
        assert_eq!(store.get(2).unwrap().reminder_count, 1);
        assert_eq!(mailer.sent.lock().unwrap().len(), 2);
    }
}
