use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use crate::api::types::{
    CalendarDay, CollectionPayload, CollectionType, Paged, SearchFilter, SearchRequest, Subject,
    SubjectType, User, UserCollection, UserEpisode,
};
use crate::api::{ApiError, BangumiApi};
use crate::auth::{AuthError, AuthStatus, Credential, OAuth, load_credential, store_credential};
use crate::config::Settings;
use crate::http::HttpClient;

use super::episode::{EpisodeRecord, select_last_watched, select_next_to_watch};

const EPISODE_PAGE_SIZE: u32 = 100;
const COLLECTION_PAGE_SIZE: u32 = 100;
const SEARCH_PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone)]
pub(crate) struct SearchQuery {
    pub(crate) keywords: Option<String>,
    pub(crate) page: u32,
    pub(crate) subject_type: SubjectType,
    pub(crate) tags: Vec<String>,
    pub(crate) min_score: i64,
    pub(crate) max_rank: u32,
}

impl SearchQuery {
    pub(crate) fn offset(&self) -> u32 {
        self.page.max(1).saturating_sub(1).saturating_mul(SEARCH_PAGE_SIZE)
    }

    pub(crate) fn to_request(&self) -> SearchRequest {
        SearchRequest {
            keyword: self.keywords.clone().unwrap_or_default(),
            sort: "rank".to_string(),
            filter: SearchFilter {
                subject_types: vec![self.subject_type.code()],
                tag: self.tags.clone(),
                rating: vec![format!(">={}", self.min_score.clamp(0, 10))],
                rank: vec![format!("<={}", self.max_rank)],
                nsfw: false,
            },
        }
    }
}

/// Everything the commands need from bgm.tv. Public endpoints work without a
/// credential; the rest fail with a login hint.
pub(crate) struct Client {
    api: BangumiApi,
    oauth: OAuth,
    credential_path: PathBuf,
    credential: Option<Credential>,
    user: Option<User>,
}

impl Client {
    pub(crate) fn new(settings: &Settings, credential_path: PathBuf) -> Self {
        let http = HttpClient::new(
            &Settings::user_agent(),
            settings.connect_timeout,
            settings.read_timeout,
        );
        Self {
            api: BangumiApi::new(http.clone(), &settings.api_base),
            oauth: OAuth::new(http, settings),
            credential_path,
            credential: None,
            user: None,
        }
    }

    /// Loads the stored credential and refreshes it when expired. `None` means
    /// the user has to log in again.
    pub(crate) fn restore(settings: &Settings, credential_path: PathBuf) -> Option<Self> {
        let mut client = Self::new(settings, credential_path);
        let credential = match load_credential(&client.credential_path) {
            Ok(credential) => credential,
            Err(AuthError::MissingCredential(path)) => {
                info!(%path, "no stored credential");
                return None;
            }
            Err(err) => {
                warn!("ignoring unreadable credential: {err}");
                return None;
            }
        };
        client.credential = Some(credential);

        if client.auth_status() == AuthStatus::Expired
            && let Err(err) = client.refresh_token()
        {
            warn!("token refresh failed: {err:#}");
            return None;
        }
        Some(client)
    }

    fn token(&self) -> Result<&str> {
        self.credential
            .as_ref()
            .map(|credential| credential.access_token.as_str())
            .ok_or_else(|| anyhow!("login required: run `bgm login`"))
    }

    /// Exchanges an authorization code and stores the new credential.
    pub(crate) fn authorize(&mut self, code: &str) -> Result<()> {
        let credential = self
            .oauth
            .exchange_code(code)
            .context("failed to exchange authorization code")?;
        store_credential(&self.credential_path, &credential)?;
        self.credential = Some(credential);
        self.user = None;
        Ok(())
    }

    pub(crate) fn refresh_token(&mut self) -> Result<()> {
        let credential = self
            .credential
            .as_mut()
            .ok_or_else(|| anyhow!("no credential to refresh"))?;
        let refreshed = self
            .oauth
            .refresh(&credential.refresh_token)
            .context("failed to refresh access token")?;
        credential.merge(refreshed);
        store_credential(&self.credential_path, credential)?;
        info!("access token refreshed");
        Ok(())
    }

    pub(crate) fn auth_status(&self) -> AuthStatus {
        match &self.credential {
            Some(credential) => self.oauth.status(&credential.access_token),
            None => AuthStatus::Expired,
        }
    }

    pub(crate) fn me(&mut self) -> Result<&User> {
        if self.user.is_none() {
            let user = self
                .api
                .me(self.token()?)
                .context("failed to fetch current user")?;
            info!(username = %user.username, "fetched current user");
            self.user = Some(user);
        }
        self.user
            .as_ref()
            .ok_or_else(|| anyhow!("current user is unavailable"))
    }

    fn username(&mut self) -> Result<String> {
        Ok(self.me()?.username.clone())
    }

    pub(crate) fn collections(
        &mut self,
        collection_type: CollectionType,
        subject_type: SubjectType,
    ) -> Result<Vec<UserCollection>> {
        self.collections_paged(collection_type, subject_type, COLLECTION_PAGE_SIZE)
    }

    fn collections_paged(
        &mut self,
        collection_type: CollectionType,
        subject_type: SubjectType,
        page_size: u32,
    ) -> Result<Vec<UserCollection>> {
        let username = self.username()?;
        let token = self.token()?;
        let mut collections = Vec::new();
        loop {
            let offset = u32::try_from(collections.len()).unwrap_or(u32::MAX);
            let page = self
                .api
                .user_collections(
                    token,
                    &username,
                    subject_type.code(),
                    collection_type.code(),
                    page_size,
                    offset,
                )
                .with_context(|| format!("failed to list {collection_type} collections"))?;
            let fetched = page.data.len();
            collections.extend(page.data);
            if fetched == 0 || collections.len() as u64 >= page.total {
                break;
            }
        }
        Ok(collections)
    }

    /// `None` when the subject is not in the user's collections.
    pub(crate) fn user_collection(&mut self, subject_id: u64) -> Result<Option<UserCollection>> {
        let username = self.username()?;
        match self
            .api
            .user_collection(self.token()?, &username, subject_id)
        {
            Ok(collection) => Ok(Some(collection)),
            Err(ApiError::NotFound) => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("failed to load collection for {subject_id}"))
            }
        }
    }

    pub(crate) fn subject(&self, subject_id: u64) -> Result<Subject> {
        self.api
            .subject(subject_id)
            .with_context(|| format!("failed to load subject {subject_id}"))
    }

    /// Airing calendar ordered Monday first.
    pub(crate) fn calendar(&self) -> Result<Vec<CalendarDay>> {
        let mut days = self.api.calendar().context("failed to load calendar")?;
        days.sort_by_key(|day| day.weekday.id);
        Ok(days)
    }

    pub(crate) fn search(&self, query: &SearchQuery) -> Result<Paged<Subject>> {
        self.api
            .search_subjects(&query.to_request(), SEARCH_PAGE_SIZE, query.offset())
            .context("search failed")
    }

    /// The user's full episode listing for a subject, all pages.
    pub(crate) fn episode_listing(&self, subject_id: u64) -> Result<Vec<UserEpisode>> {
        self.episode_listing_paged(subject_id, EPISODE_PAGE_SIZE)
    }

    fn episode_listing_paged(&self, subject_id: u64, page_size: u32) -> Result<Vec<UserEpisode>> {
        let token = self.token()?;
        let mut listing = Vec::new();
        loop {
            let offset = u32::try_from(listing.len()).unwrap_or(u32::MAX);
            let page = self
                .api
                .user_episodes(token, subject_id, page_size, offset)
                .with_context(|| format!("failed to load episodes of {subject_id}"))?;
            let fetched = page.data.len();
            listing.extend(page.data);
            if fetched == 0 || listing.len() as u64 >= page.total {
                break;
            }
        }
        Ok(listing)
    }

    /// Marks the next unwatched normal episode as watched. `None` when the
    /// subject is already fully watched.
    pub(crate) fn watch_next_episode(&self, subject_id: u64) -> Result<Option<EpisodeRecord>> {
        let listing = self.episode_listing(subject_id)?;
        let picked = select_next_to_watch(&listing)
            .with_context(|| format!("episode listing of {subject_id} is malformed"))?;
        self.set_watched(subject_id, picked, true)
    }

    /// Clears the last watched normal episode. `None` when nothing is watched.
    pub(crate) fn unwatch_last_episode(&self, subject_id: u64) -> Result<Option<EpisodeRecord>> {
        let listing = self.episode_listing(subject_id)?;
        let picked = select_last_watched(&listing)
            .with_context(|| format!("episode listing of {subject_id} is malformed"))?;
        self.set_watched(subject_id, picked, false)
    }

    fn set_watched(
        &self,
        subject_id: u64,
        picked: Option<EpisodeRecord>,
        watched: bool,
    ) -> Result<Option<EpisodeRecord>> {
        let Some(record) = picked else {
            return Ok(None);
        };
        self.api
            .set_episode_watched(self.token()?, record.id, watched)
            .with_context(|| format!("failed to update episode {}", record.id))?;
        info!(subject_id, episode_id = record.id, watched, "episode updated");
        Ok(Some(record))
    }

    pub(crate) fn add_collection(
        &self,
        subject_id: u64,
        collection_type: CollectionType,
    ) -> Result<()> {
        let payload = CollectionPayload {
            collection_type: collection_type.code(),
            rate: None,
            comment: None,
            private: false,
            tags: Vec::new(),
        };
        self.api
            .create_collection(self.token()?, subject_id, &payload)
            .with_context(|| format!("failed to add {subject_id} to collections"))
    }

    pub(crate) fn edit_collection(&self, subject_id: u64, payload: &CollectionPayload) -> Result<()> {
        self.api
            .update_collection(self.token()?, subject_id, payload)
            .with_context(|| format!("failed to update collection {subject_id}"))
    }
}
