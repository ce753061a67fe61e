use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct User {
    pub(crate) id: u64,
    #[serde(default)]
    pub(crate) username: String,
    #[serde(default)]
    pub(crate) nickname: String,
}

impl User {
    pub(crate) fn profile_url(&self) -> String {
        if self.username.is_empty() {
            format!("https://bgm.tv/user/{}", self.id)
        } else {
            format!("https://bgm.tv/user/{}", self.username)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Tag {
    pub(crate) name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Rating {
    #[serde(default)]
    pub(crate) rank: u32,
    #[serde(default)]
    pub(crate) total: u32,
    #[serde(default)]
    pub(crate) score: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SubjectCollectionStats {
    #[serde(default)]
    pub(crate) doing: u32,
}

/// Subject as returned by the detail, search and collection endpoints.
///
/// The endpoints return different subsets of fields, so everything beyond the
/// id and names is optional.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Subject {
    pub(crate) id: u64,
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) name_cn: String,
    #[serde(default)]
    pub(crate) date: Option<String>,
    #[serde(default)]
    pub(crate) summary: String,
    #[serde(default)]
    pub(crate) tags: Vec<Tag>,
    #[serde(default)]
    pub(crate) eps: u32,
    #[serde(default)]
    pub(crate) score: Option<f64>,
    #[serde(default)]
    pub(crate) rank: Option<u32>,
    #[serde(default)]
    pub(crate) rating: Option<Rating>,
    #[serde(default)]
    pub(crate) collection: Option<SubjectCollectionStats>,
}

impl Subject {
    pub(crate) fn display_name(&self) -> &str {
        if self.name_cn.is_empty() {
            &self.name
        } else {
            &self.name_cn
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserCollection {
    pub(crate) subject_id: u64,
    pub(crate) subject: Subject,
    #[serde(default)]
    pub(crate) comment: Option<String>,
    #[serde(default)]
    pub(crate) tags: Vec<String>,
    #[serde(default)]
    pub(crate) ep_status: u32,
    #[serde(default)]
    pub(crate) rate: u8,
    #[serde(default)]
    pub(crate) private: bool,
}

impl UserCollection {
    pub(crate) fn progress_label(&self) -> String {
        format!("[{}/{}] {}", self.ep_status, self.subject.eps, self.picker_name())
    }

    fn picker_name(&self) -> String {
        if self.subject.name_cn.is_empty() {
            self.subject.name.clone()
        } else {
            format!("{} ({})", self.subject.name_cn, self.subject.name)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Paged<T> {
    pub(crate) total: u64,
    pub(crate) data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Episode {
    pub(crate) id: u64,
    /// Raw episode kind code; see `EpisodeKind`.
    #[serde(rename = "type")]
    pub(crate) kind: i64,
    pub(crate) sort: f64,
    #[serde(default)]
    pub(crate) ep: Option<f64>,
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) name_cn: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserEpisode {
    pub(crate) episode: Episode,
    /// Raw watch status code; see `WatchStatus`.
    #[serde(rename = "type")]
    pub(crate) status: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Weekday {
    pub(crate) id: u8,
    #[serde(default)]
    pub(crate) en: String,
    #[serde(default)]
    pub(crate) cn: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CalendarItem {
    pub(crate) id: u64,
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) name_cn: String,
    #[serde(default)]
    pub(crate) air_date: String,
    #[serde(default)]
    pub(crate) rank: Option<u32>,
    #[serde(default)]
    pub(crate) rating: Option<Rating>,
    #[serde(default)]
    pub(crate) collection: Option<SubjectCollectionStats>,
}

impl CalendarItem {
    pub(crate) fn display_name(&self) -> &str {
        if self.name_cn.is_empty() {
            &self.name
        } else {
            &self.name_cn
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CalendarDay {
    pub(crate) weekday: Weekday,
    #[serde(default)]
    pub(crate) items: Vec<CalendarItem>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SearchFilter {
    #[serde(rename = "type")]
    pub(crate) subject_types: Vec<u8>,
    pub(crate) tag: Vec<String>,
    pub(crate) rating: Vec<String>,
    pub(crate) rank: Vec<String>,
    pub(crate) nsfw: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SearchRequest {
    pub(crate) keyword: String,
    pub(crate) sort: String,
    pub(crate) filter: SearchFilter,
}

/// Body of collection create/update calls. `None` leaves a field out, which
/// keeps the stored value; updates that clear a field send `Some` instead.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CollectionPayload {
    #[serde(rename = "type")]
    pub(crate) collection_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) rate: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) comment: Option<String>,
    pub(crate) private: bool,
    pub(crate) tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum CollectionType {
    Wish,
    Done,
    Watch,
    Stash,
    Drop,
}

impl CollectionType {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Wish => 1,
            Self::Done => 2,
            Self::Watch => 3,
            Self::Stash => 4,
            Self::Drop => 5,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Wish => "wish",
            Self::Done => "done",
            Self::Watch => "watch",
            Self::Stash => "stash",
            Self::Drop => "drop",
        }
    }
}

impl fmt::Display for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SubjectType {
    Book,
    Anime,
    Music,
    Game,
    Real,
}

impl SubjectType {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Book => 1,
            Self::Anime => 2,
            Self::Music => 3,
            Self::Game => 4,
            Self::Real => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_payload_omits_missing_rate_and_comment() {
        let payload = CollectionPayload {
            collection_type: CollectionType::Watch.code(),
            rate: None,
            comment: None,
            private: false,
            tags: Vec::new(),
        };
        let value = serde_json::to_value(&payload).expect("payload should serialize");
        assert_eq!(value["type"], 3);
        assert!(value.get("rate").is_none());
        assert!(value.get("comment").is_none());
    }

    #[test]
    fn user_collection_tolerates_sparse_subject() {
        let raw = r#"{
            "subject_id": 328609,
            "subject": {"id": 328609, "name": "Original", "name_cn": "", "eps": 13},
            "ep_status": 11,
            "type": 3,
            "rate": 0,
            "tags": [],
            "private": false
        }"#;
        let collection: UserCollection = serde_json::from_str(raw).expect("should parse");
        assert_eq!(collection.progress_label(), "[11/13] Original");
        assert_eq!(collection.subject.display_name(), "Original");
    }

    #[test]
    fn subject_type_codes_skip_five() {
        assert_eq!(SubjectType::Game.code(), 4);
        assert_eq!(SubjectType::Real.code(), 6);
    }
}
