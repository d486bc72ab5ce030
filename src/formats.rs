use serde::{Deserialize, Serialize};

/// Canonical book record normalized from a catalog lookup result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
}

impl BookRecord {
    /// Authors joined for prompts and playlist descriptions.
    pub fn authors_joined(&self) -> String {
        self.authors.join(", ")
    }
}

/// Stage file written by `lookup` (`book.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupRecord {
    pub retrieved_at: String,
    pub book: BookRecord,
}

/// One weighted catalog search request derived from profile terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub terms: String,
    pub limit: usize,
}

/// Normalized music catalog item. Identity is `id`; two tracks with the
/// same id are the same track regardless of the other fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub uri: String,
    pub popularity: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_image_url: Option<String>,
}

/// Stage file written by `tracks` (`tracks.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackListRecord {
    pub retrieved_at: String,
    pub max_tracks: usize,
    pub tracks: Vec<Track>,
}
