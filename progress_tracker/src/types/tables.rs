use chrono::{DateTime, Utc};
use progress_tracker_libs::codeforces::model::{RatingChange, Submission};
use serde::Serialize;
use sqlx::{types::Json, FromRow};

/// A tracked student together with everything synced from Codeforces.
///
/// Identity and profile fields are owned by the CRUD layer; the rating
/// snapshot, history columns, `last_synced_at` and the reminder bookkeeping
/// are written only by the sync subsystem.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub handle: String,
    pub current_rating: i32,
    pub max_rating: i32,
    pub contests: Json<Vec<RatingChange>>,
    pub submissions: Json<Vec<Submission>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub email_reminders_enabled: bool,
    pub reminder_count: i32,
    pub last_reminder_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub handle: String,
}

/// Partial update of the fields owned by the CRUD layer.
#[derive(Debug, Clone)]
pub struct StudentChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub handle: Option<String>,
    pub email_reminders_enabled: Option<bool>,
}

/// The field set one reconciliation writes in a single atomic update.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncUpdate {
    pub current_rating: i32,
    pub max_rating: i32,
    pub contests: Vec<RatingChange>,
    pub submissions: Vec<Submission>,
    pub last_synced_at: DateTime<Utc>,
}
