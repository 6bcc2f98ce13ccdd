use serde::{Deserialize, Serialize};

/// Response envelope shared by every Codeforces API endpoint.
///
/// `status` is `"OK"` on success; otherwise `result` is absent and `comment`
/// carries the reason reported by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// The subset of `user.info` consumed by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub handle: String,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub max_rating: Option<i32>,
}

/// One rated participation from `user.rating`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingChange {
    pub contest_id: i64,
    pub contest_name: String,
    pub handle: String,
    pub rank: i32,
    pub rating_update_time_seconds: i64,
    pub old_rating: i32,
    pub new_rating: i32,
}

/// One entry from `user.status`.
///
/// The feed occasionally returns malformed entries without an id; `id` stays
/// optional so they survive deserialization and can be filtered downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub contest_id: Option<i64>,
    pub creation_time_seconds: i64,
    pub problem: Problem,
    #[serde(default)]
    pub verdict: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    #[serde(default)]
    pub contest_id: Option<i64>,
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The three datasets a full profile fetch yields for one handle.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub info: UserInfo,
    pub rating_history: Vec<RatingChange>,
    pub submission_history: Vec<Submission>,
}
