//! Series and episode domain entities
//!
//! An episode is the purchasable unit of a series. Price 0 means the
//! episode is free and always readable.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesId(pub i64);

impl std::fmt::Display for SeriesId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodeId(pub i64);

impl From<i64> for EpisodeId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Manga,
    Novel,
}

impl std::fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesKind::Manga => write!(f, "manga"),
            SeriesKind::Novel => write!(f, "novel"),
        }
    }
}

impl std::str::FromStr for SeriesKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manga" | "cartoon" => Ok(SeriesKind::Manga),
            "novel" => Ok(SeriesKind::Novel),
            _ => Err(format!("Unknown series kind: {}", s)),
        }
    }
}

/// A manga or novel series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub id: SeriesId,
    pub uuid: Uuid,
    pub title: String,
    pub kind: SeriesKind,
}

/// A purchasable episode of a series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub uuid: Uuid,
    pub series_id: SeriesId,
    /// Sequence number within the series (epNo), starts at 1
    pub ep_no: i32,
    pub name: String,
    pub price: i64,
}

impl Episode {
    pub fn is_free(&self) -> bool {
        self.price == 0
    }
}

/// One image (page) of an episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeImage {
    pub position: i32,
    pub url: String,
}

/// Short description of an episode, used in navigation and lock prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeSummary {
    pub id: EpisodeId,
    pub uuid: Uuid,
    pub ep_no: i32,
    pub name: String,
    pub price: i64,
}

impl From<&Episode> for EpisodeSummary {
    fn from(episode: &Episode) -> Self {
        Self {
            id: episode.id,
            uuid: episode.uuid,
            ep_no: episode.ep_no,
            name: episode.name.clone(),
            price: episode.price,
        }
    }
}

/// Previous / next episodes within the same series
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    pub prev: Option<EpisodeSummary>,
    pub next: Option<EpisodeSummary>,
}
