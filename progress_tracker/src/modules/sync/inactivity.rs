use crate::types::tables::Student;
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Days without a submission before a student counts as inactive.
const INACTIVITY_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderDecision {
    Send,
    Skip,
}

/// Decides whether an inactivity reminder is due for an up-to-date record.
///
/// The most recent submission is taken by creation time; the upstream feed
/// usually orders newest-first but that ordering is not relied on.
pub fn decide(student: &Student, now: DateTime<Utc>) -> ReminderDecision {
    if !student.email_reminders_enabled {
        return ReminderDecision::Skip;
    }

    let Some(latest) = student
        .submissions
        .iter()
        .map(|submission| submission.creation_time_seconds)
        .max()
    else {
        return ReminderDecision::Skip;
    };

    let Some(last_submitted_at) = Utc.timestamp_opt(latest, 0).single() else {
        return ReminderDecision::Skip;
    };

    if now - last_submitted_at > Duration::days(INACTIVITY_DAYS) {
        ReminderDecision::Send
    } else {
        ReminderDecision::Skip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progress_tracker_libs::codeforces::model::{Problem, Submission};
    use sqlx::types::Json;

    fn submitted_at(at: DateTime<Utc>) -> Submission {
        Submission {
            id: Some(1),
            contest_id: Some(4),
            creation_time_seconds: at.timestamp(),
            verdict: Some(String::from("OK")),
            problem: Problem {
                contest_id: Some(4),
                index: Some(String::from("A")),
                name: Some(String::from("Watermelon")),
                rating: Some(800),
                tags: vec![],
            },
        }
    }

    fn student_with(submissions: Vec<Submission>, reminders_enabled: bool) -> Student {
        let now = Utc::now();
        Student {
            id: 1,
            name: String::from("Alice"),
            email: String::from("alice@example.com"),
            phone: String::from("9999999999"),
            handle: String::from("alice_cf"),
            current_rating: 1400,
            max_rating: 1500,
            contests: Json(vec![]),
            submissions: Json(submissions),
            last_synced_at: Some(now),
            email_reminders_enabled: reminders_enabled,
            reminder_count: 0,
            last_reminder_sent_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn eight_days_of_silence_triggers_a_reminder() {
        let now = Utc::now();
        let student = student_with(vec![submitted_at(now - Duration::days(8))], true);

        assert_eq!(decide(&student, now), ReminderDecision::Send);
    }

    #[test]
    fn six_days_of_silence_is_still_active() {
        let now = Utc::now();
        let student = student_with(vec![submitted_at(now - Duration::days(6))], true);

        assert_eq!(decide(&student, now), ReminderDecision::Skip);
    }

    #[test]
    fn disabled_reminders_always_skip() {
        let now = Utc::now();
        let student = student_with(vec![submitted_at(now - Duration::days(30))], false);

        assert_eq!(decide(&student, now), ReminderDecision::Skip);
    }

    #[test]
    fn a_record_without_submissions_skips() {
        let now = Utc::now();
        let student = student_with(vec![], true);

        assert_eq!(decide(&student, now), ReminderDecision::Skip);
    }

    #[test]
    fn the_latest_submission_wins_even_when_the_feed_is_unordered() {
        let now = Utc::now();
        let student = student_with(
            vec![
                submitted_at(now - Duration::days(15)),
                submitted_at(now - Duration::days(2)),
            ],
            true,
        );

        assert_eq!(decide(&student, now), ReminderDecision::Skip);
    }
}
