//! API types for mood search.

use serde::{Deserialize, Serialize};

use crate::parse::{Recommendation, SongFields};

/// Body of `POST /api/search`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text mood; missing is treated like empty
    #[serde(default)]
    pub mood: Option<String>,
}

/// An indexed track that matched the mood embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedSong {
    /// Index entry identifier (track URI)
    pub id: String,
    /// Similarity score, higher is closer. `0.0` is a real score.
    pub score: f32,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub popularity: i64,
    pub preview_url: Option<String>,
    pub uri: Option<String>,
    /// Genre tags from the structured payload
    #[serde(default)]
    pub genres: Vec<String>,
}

impl MatchedSong {
    pub fn new(id: impl Into<String>, score: f32, fields: SongFields, genres: Vec<String>) -> Self {
        Self {
            id: id.into(),
            score,
            name: fields.name,
            artist: fields.artist,
            album: fields.album,
            popularity: fields.popularity,
            preview_url: fields.preview_url,
            uri: fields.uri,
            genres,
        }
    }

    /// Similarity as a percentage with one decimal, e.g. `"87.3"`
    pub fn similarity_percent(&self) -> String {
        format!("{:.1}", self.score * 100.0)
    }
}

/// Song as rendered by the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    pub metadata: SongMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongMetadata {
    pub track_name: String,
    pub artist_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
}

impl From<&MatchedSong> for Song {
    fn from(song: &MatchedSong) -> Self {
        Self {
            id: song.id.clone(),
            score: Some(song.score),
            metadata: SongMetadata {
                track_name: song.name.clone(),
                artist_name: song.artist.clone(),
                album: Some(song.album.clone()),
                popularity: Some(song.popularity),
                preview_url: song.preview_url.clone(),
                genres: Some(song.genres.clone()),
            },
        }
    }
}

impl From<Recommendation> for Song {
    fn from(rec: Recommendation) -> Self {
        Self {
            id: rec.id,
            score: None,
            metadata: SongMetadata {
                track_name: rec.track_name,
                artist_name: rec.artist_name,
                album: None,
                popularity: None,
                preview_url: None,
                genres: Some(rec.genres),
            },
        }
    }
}

/// Body of a successful `POST /api/search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Recommendations in `recommend` mode, otherwise the matched songs
    pub matches: Vec<Song>,
    /// Indexed tracks the answer was derived from
    #[serde(rename = "sourceSongs")]
    pub source_songs: Vec<MatchedSong>,
    /// Model explanation of why the matches fit the mood
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
}
