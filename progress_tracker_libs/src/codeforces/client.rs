use crate::codeforces::model::{ApiResponse, RatingChange, Submission, UserInfo, UserProfile};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::time::Duration;

type Result<T> = std::result::Result<T, CodeforcesError>;

pub const DEFAULT_API_URL: &str = "https://codeforces.com/api";

// Bound on each individual request so a hung endpoint fails the profile
// fetch instead of stalling the caller indefinitely.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum CodeforcesError {
    #[error("failed to request to codeforces api")]
    RequestError(#[from] reqwest::Error),
    #[error("codeforces api refused the request: {0}")]
    ApiError(String),
    #[error("codeforces api returned no result for handle [{0}]")]
    EmptyResult(String),
    #[error("invalid codeforces api url given")]
    InvalidUrlError(#[from] url::ParseError),
}

/// Read-only access to the user endpoints of the Codeforces API.
#[async_trait]
pub trait CodeforcesApi {
    async fn fetch_user_info(&self, handle: &str) -> Result<UserInfo>;
    async fn fetch_rating_history(&self, handle: &str) -> Result<Vec<RatingChange>>;
    async fn fetch_submission_history(&self, handle: &str) -> Result<Vec<Submission>>;

    /// Fetches all three datasets for a handle concurrently.
    ///
    /// Partial results are never returned: if any endpoint fails, the whole
    /// fetch fails, so callers can't reconcile from an incomplete profile.
    async fn fetch_profile(&self, handle: &str) -> Result<UserProfile> {
        let (info, rating_history, submission_history) = tokio::try_join!(
            self.fetch_user_info(handle),
            self.fetch_rating_history(handle),
            self.fetch_submission_history(handle),
        )?;

        Ok(UserProfile {
            info,
            rating_history,
            submission_history,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CodeforcesClient {
    user_info_url: Url,
    user_rating_url: Url,
    user_status_url: Url,
    client: Client,
}

impl CodeforcesClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_API_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        let user_info_url = base_url.join("user.info")?;
        let user_rating_url = base_url.join("user.rating")?;
        let user_status_url = base_url.join("user.status")?;

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(CodeforcesClient {
            user_info_url,
            user_rating_url,
            user_status_url,
            client,
        })
    }

    async fn get<T>(&self, url: &Url, query: &[(&str, &str)], handle: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let res = self.client.get(url.clone()).query(query).send().await?;
        res.error_for_status_ref()?;

        let body: ApiResponse<T> = res.json().await?;
        if body.status != "OK" {
            let comment = body.comment.unwrap_or_default();
            tracing::warn!("codeforces api refused {} for [{}]: {}", url, handle, comment);
            return Err(CodeforcesError::ApiError(comment));
        }

        body.result
            .ok_or_else(|| CodeforcesError::EmptyResult(String::from(handle)))
    }
}

#[async_trait]
impl CodeforcesApi for CodeforcesClient {
    async fn fetch_user_info(&self, handle: &str) -> Result<UserInfo> {
        let users: Vec<UserInfo> = self
            .get(&self.user_info_url, &[("handles", handle)], handle)
            .await?;

        users
            .into_iter()
            .next()
            .ok_or_else(|| CodeforcesError::EmptyResult(String::from(handle)))
    }

    async fn fetch_rating_history(&self, handle: &str) -> Result<Vec<RatingChange>> {
        self.get(&self.user_rating_url, &[("handle", handle)], handle)
            .await
    }

    async fn fetch_submission_history(&self, handle: &str) -> Result<Vec<Submission>> {
        self.get(&self.user_status_url, &[("handle", handle)], handle)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_urls_share_the_api_base() {
        let client = CodeforcesClient::with_base_url("https://codeforces.com/api").unwrap();
        assert_eq!(
            client.user_info_url.as_str(),
            "https://codeforces.com/api/user.info"
        );
        assert_eq!(
            client.user_rating_url.as_str(),
            "https://codeforces.com/api/user.rating"
        );
        assert_eq!(
            client.user_status_url.as_str(),
            "https://codeforces.com/api/user.status"
        );
    }

    #[test]
    fn a_trailing_slash_on_the_base_is_tolerated() {
        let client = CodeforcesClient::with_base_url("http://localhost:8983/api/").unwrap();
        assert_eq!(
            client.user_status_url.as_str(),
            "http://localhost:8983/api/user.status"
        );
    }
}
