use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Track shown in the music widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MusicTrack {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub url: String,
    pub cover: String,
    pub enabled: bool,
    pub display_order: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MusicInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl MusicInput {
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty() && !self.url.trim().is_empty()
    }
}
