use crate::types::tables::SyncUpdate;
use chrono::{DateTime, Utc};
use progress_tracker_libs::codeforces::model::{RatingChange, Submission, UserProfile};
use std::collections::HashMap;

/// Computes the stored field set for a freshly fetched profile.
///
/// Pure: the same profile and clock reading always yield the same update,
/// so repeating a sync is a no-op apart from the timestamp.
pub fn build_update(profile: UserProfile, now: DateTime<Utc>) -> SyncUpdate {
    SyncUpdate {
        current_rating: profile.info.rating.unwrap_or(0),
        max_rating: profile.info.max_rating.unwrap_or(0),
        contests: dedup_contests(profile.rating_history),
        submissions: filter_submissions(profile.submission_history),
        last_synced_at: now,
    }
}

/// Collapses the rating history to one entry per contest id.
///
/// The feed may report the same contest twice with refined data; the last
/// occurrence wins, at the position the id was first seen.
pub fn dedup_contests(history: Vec<RatingChange>) -> Vec<RatingChange> {
    let mut deduped: Vec<RatingChange> = Vec::with_capacity(history.len());
    let mut seen: HashMap<i64, usize> = HashMap::with_capacity(history.len());

    for contest in history {
        match seen.get(&contest.contest_id) {
            Some(&at) => deduped[at] = contest,
            None => {
                seen.insert(contest.contest_id, deduped.len());
                deduped.push(contest);
            }
        }
    }

    deduped
}

/// Drops submissions the feed returned without an id, keeping the rest in
/// feed order.
pub fn filter_submissions(submissions: Vec<Submission>) -> Vec<Submission> {
    submissions
        .into_iter()
        .filter(|submission| submission.id.is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use progress_tracker_libs::codeforces::model::{Problem, UserInfo};

    fn contest(contest_id: i64, new_rating: i32) -> RatingChange {
        RatingChange {
            contest_id,
            contest_name: format!("Round #{}", contest_id),
            handle: String::from("tourist"),
            rank: 1,
            rating_update_time_seconds: 1_700_000_000 + contest_id,
            old_rating: 1400,
            new_rating,
        }
    }

    fn submission(id: Option<i64>, creation_time_seconds: i64) -> Submission {
        Submission {
            id,
            contest_id: Some(4),
            creation_time_seconds,
            verdict: Some(String::from("OK")),
            problem: Problem {
                contest_id: Some(4),
                index: Some(String::from("A")),
                name: Some(String::from("Watermelon")),
                rating: Some(800),
                tags: vec![String::from("math")],
            },
        }
    }

    #[test]
    fn duplicated_contests_collapse_to_the_last_occurrence() {
        let history = vec![contest(1, 1400), contest(2, 1500), contest(1, 1420)];

        let deduped = dedup_contests(history);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].contest_id, 1);
        assert_eq!(deduped[0].new_rating, 1420);
        assert_eq!(deduped[1].contest_id, 2);
        assert_eq!(deduped[1].new_rating, 1500);
    }

    #[test]
    fn submissions_without_an_id_are_dropped_in_place() {
        let submissions = vec![
            submission(Some(5), 100),
            submission(None, 90),
            submission(Some(7), 80),
        ];

        let kept = filter_submissions(submissions);

        assert_eq!(
            kept.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![Some(5), Some(7)]
        );
    }

    #[test]
    fn absent_ratings_default_to_zero() {
        let profile = UserProfile {
            info: UserInfo {
                handle: String::from("newbie"),
                rating: None,
                max_rating: None,
            },
            rating_history: vec![],
            submission_history: vec![],
        };

        let update = build_update(profile, Utc::now());

        assert_eq!(update.current_rating, 0);
        assert_eq!(update.max_rating, 0);
        assert!(update.contests.is_empty());
        assert!(update.submissions.is_empty());
    }

    #[test]
    fn rebuilding_from_the_same_profile_yields_the_same_update() {
        let profile = UserProfile {
            info: UserInfo {
                handle: String::from("tourist"),
                rating: Some(3800),
                max_rating: Some(4000),
            },
            rating_history: vec![contest(1, 1400), contest(2, 1500), contest(1, 1420)],
            submission_history: vec![submission(Some(5), 100), submission(None, 90)],
        };
        let now = Utc::now();

        assert_eq!(build_update(profile.clone(), now), build_update(profile, now));
    }
}
