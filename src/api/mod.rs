pub(crate) mod types;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

use crate::http::{HttpClient, HttpError, HttpRequest, HttpResponse, Method};

use self::types::{
    CalendarDay, CollectionPayload, Paged, SearchRequest, Subject, User, UserCollection,
    UserEpisode,
};

#[derive(Debug, Error)]
pub(crate) enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("request failed: {0}")]
    Http(HttpError),
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("could not encode request: {0}")]
    Encode(String),
}

impl From<HttpError> for ApiError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Status { status: 404, .. } => Self::NotFound,
            other => Self::Http(other),
        }
    }
}

/// The `api.bgm.tv` endpoints, one call per function.
#[derive(Debug, Clone)]
pub(crate) struct BangumiApi {
    http: HttpClient,
    base_url: String,
}

impl BangumiApi {
    pub(crate) fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn fetch<T: DeserializeOwned>(&self, request: HttpRequest<'_>) -> Result<T, ApiError> {
        let response = self.http.send(request).inspect_err(log_failure)?;
        Ok(serde_json::from_str(&response.body)?)
    }

    pub(crate) fn me(&self, token: &str) -> Result<User, ApiError> {
        self.fetch(HttpRequest::new(Method::Get, self.url("/v0/me")).bearer(token))
    }

    pub(crate) fn subject(&self, subject_id: u64) -> Result<Subject, ApiError> {
        self.fetch(HttpRequest::new(
            Method::Get,
            self.url(&format!("/v0/subjects/{subject_id}")),
        ))
    }

    /// Private collections are only visible with the owner's token.
    pub(crate) fn user_collection(
        &self,
        token: &str,
        username: &str,
        subject_id: u64,
    ) -> Result<UserCollection, ApiError> {
        self.fetch(
            HttpRequest::new(
                Method::Get,
                self.url(&format!("/v0/users/{username}/collections/{subject_id}")),
            )
            .bearer(token),
        )
    }

    pub(crate) fn user_collections(
        &self,
        token: &str,
        username: &str,
        subject_type: u8,
        collection_type: u8,
        limit: u32,
        offset: u32,
    ) -> Result<Paged<UserCollection>, ApiError> {
        self.fetch(
            HttpRequest::new(
                Method::Get,
                self.url(&format!("/v0/users/{username}/collections")),
            )
            .bearer(token)
            .query("subject_type", subject_type)
            .query("type", collection_type)
            .query("limit", limit)
            .query("offset", offset),
        )
    }

    pub(crate) fn user_episodes(
        &self,
        token: &str,
        subject_id: u64,
        limit: u32,
        offset: u32,
    ) -> Result<Paged<UserEpisode>, ApiError> {
        self.fetch(
            HttpRequest::new(
                Method::Get,
                self.url(&format!("/v0/users/-/collections/{subject_id}/episodes")),
            )
            .bearer(token)
            .query("limit", limit)
            .query("offset", offset),
        )
    }

    /// Marks one episode watched (status 2) or clears it (status 0).
    pub(crate) fn set_episode_watched(
        &self,
        token: &str,
        episode_id: u64,
        watched: bool,
    ) -> Result<(), ApiError> {
        let status = if watched { 2 } else { 0 };
        let response = self
            .http
            .send(
                HttpRequest::new(
                    Method::Put,
                    self.url(&format!("/v0/users/-/collections/-/episodes/{episode_id}")),
                )
                .bearer(token)
                .json(serde_json::json!({ "type": status })),
            )
            .inspect_err(log_failure)?;
        expect_status(&response, 204)
    }

    pub(crate) fn calendar(&self) -> Result<Vec<CalendarDay>, ApiError> {
        self.fetch(HttpRequest::new(Method::Get, self.url("/calendar")))
    }

    pub(crate) fn search_subjects(
        &self,
        request: &SearchRequest,
        limit: u32,
        offset: u32,
    ) -> Result<Paged<Subject>, ApiError> {
        let body =
            serde_json::to_value(request).map_err(|err| ApiError::Encode(err.to_string()))?;
        self.fetch(
            HttpRequest::new(Method::Post, self.url("/v0/search/subjects"))
                .query("limit", limit)
                .query("offset", offset)
                .json(body),
        )
    }

    pub(crate) fn create_collection(
        &self,
        token: &str,
        subject_id: u64,
        payload: &CollectionPayload,
    ) -> Result<(), ApiError> {
        self.write_collection(Method::Post, token, subject_id, payload)
    }

    pub(crate) fn update_collection(
        &self,
        token: &str,
        subject_id: u64,
        payload: &CollectionPayload,
    ) -> Result<(), ApiError> {
        self.write_collection(Method::Patch, token, subject_id, payload)
    }

    fn write_collection(
        &self,
        method: Method,
        token: &str,
        subject_id: u64,
        payload: &CollectionPayload,
    ) -> Result<(), ApiError> {
        let body =
            serde_json::to_value(payload).map_err(|err| ApiError::Encode(err.to_string()))?;
        self.http
            .send(
                HttpRequest::new(
                    method,
                    self.url(&format!("/v0/users/-/collections/{subject_id}")),
                )
                .bearer(token)
                .json(body),
            )
            .inspect_err(log_failure)?;
        Ok(())
    }
}

fn expect_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        Ok(())
    } else {
        Err(ApiError::UnexpectedStatus(response.status))
    }
}

fn log_failure(err: &HttpError) {
    warn!("bangumi api call failed: {err}");
}
