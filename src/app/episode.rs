//! Episode classification, ordering and next/last selection.
//!
//! Everything here is pure: listings are borrowed, records are built fresh on
//! every call and nothing is written back to the remote service.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::api::types::UserEpisode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub(crate) enum EpisodeError {
    #[error("unknown episode kind code {0}")]
    UnknownEpisodeKind(i64),
    #[error("unknown watch status code {0}")]
    UnknownWatchStatus(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EpisodeKind {
    Normal,
    Special,
    Opening,
    Ending,
}

impl EpisodeKind {
    pub(crate) fn from_code(code: i64) -> Result<Self, EpisodeError> {
        match code {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Special),
            2 => Ok(Self::Opening),
            3 => Ok(Self::Ending),
            other => Err(EpisodeError::UnknownEpisodeKind(other)),
        }
    }

    /// Normal episodes rank first; the rest follow in code order.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Special => 1,
            Self::Opening => 2,
            Self::Ending => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WatchStatus {
    Empty,
    Todo,
    Done,
    Dropped,
}

impl WatchStatus {
    pub(crate) fn from_code(code: i64) -> Result<Self, EpisodeError> {
        match code {
            0 => Ok(Self::Empty),
            1 => Ok(Self::Todo),
            2 => Ok(Self::Done),
            3 => Ok(Self::Dropped),
            other => Err(EpisodeError::UnknownWatchStatus(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EpisodeRecord {
    pub(crate) id: u64,
    pub(crate) kind: EpisodeKind,
    /// Position within the subject. The service may send fractional values
    /// (e.g. 12.5 for a recap), so this is not assumed integral.
    pub(crate) sequence: f64,
    pub(crate) status: WatchStatus,
    pub(crate) ep: Option<f64>,
    pub(crate) name: String,
}

impl EpisodeRecord {
    pub(crate) fn from_user_episode(item: &UserEpisode) -> Result<Self, EpisodeError> {
        let episode = &item.episode;
        let name = if episode.name_cn.is_empty() {
            episode.name.clone()
        } else {
            episode.name_cn.clone()
        };
        Ok(Self {
            id: episode.id,
            kind: EpisodeKind::from_code(episode.kind)?,
            sequence: episode.sort,
            status: WatchStatus::from_code(item.status)?,
            ep: episode.ep,
            name,
        })
    }

    /// Episode number shown to the user, falling back to the sort position.
    pub(crate) fn number_label(&self) -> String {
        format_number(self.ep.unwrap_or(self.sequence))
    }
}

impl fmt::Display for EpisodeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "ep.{}", self.number_label())
        } else {
            write!(f, "ep.{} {}", self.number_label(), self.name)
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Kind rank first, then sequence. Two levels instead of a weighted single
/// key, so no bound on the sequence number is needed.
pub(crate) fn compare_episodes(a: &EpisodeRecord, b: &EpisodeRecord) -> Ordering {
    a.kind
        .rank()
        .cmp(&b.kind.rank())
        .then_with(|| a.sequence.total_cmp(&b.sequence))
}

/// Classifies the whole listing, keeps normal episodes and sorts them.
///
/// Classification is fail-fast: one malformed record rejects the listing.
pub(crate) fn normal_episodes_in_order(
    listing: &[UserEpisode],
) -> Result<Vec<EpisodeRecord>, EpisodeError> {
    let records = listing
        .iter()
        .map(EpisodeRecord::from_user_episode)
        .collect::<Result<Vec<_>, _>>()?;

    let mut normal: Vec<EpisodeRecord> = records
        .into_iter()
        .filter(|record| record.kind == EpisodeKind::Normal)
        .collect();
    // `sort_by` is stable.
    normal.sort_by(compare_episodes);
    Ok(normal)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Selection {
    /// First normal episode not yet done. Dropped episodes are eligible so a
    /// drop can be resumed.
    NextToWatch,
    /// Last normal episode marked done.
    LastWatched,
}

pub(crate) fn select(
    listing: &[UserEpisode],
    selection: Selection,
) -> Result<Option<EpisodeRecord>, EpisodeError> {
    let ordered = normal_episodes_in_order(listing)?;
    let picked = match selection {
        Selection::NextToWatch => ordered
            .into_iter()
            .find(|record| record.status != WatchStatus::Done),
        Selection::LastWatched => ordered
            .into_iter()
            .rev()
            .find(|record| record.status == WatchStatus::Done),
    };
    debug!(
        ?selection,
        listing_len = listing.len(),
        picked = picked.as_ref().map(|record| record.id),
        "episode selection"
    );
    Ok(picked)
}

pub(crate) fn select_next_to_watch(
    listing: &[UserEpisode],
) -> Result<Option<EpisodeRecord>, EpisodeError> {
    select(listing, Selection::NextToWatch)
}

pub(crate) fn select_last_watched(
    listing: &[UserEpisode],
) -> Result<Option<EpisodeRecord>, EpisodeError> {
    select(listing, Selection::LastWatched)
}
